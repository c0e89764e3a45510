// ==========================================
// 砂石运输调度系统 - 配送单数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 说明: status_history / notifications 以 JSON 列存储,
//       slot_key 为写入时刻派生列(时间窗优先,其次小时位),
//       供时段冲突唯一索引与排序使用
// ==========================================

use crate::domain::delivery::{Delivery, NotificationFlags, StatusHistoryEntry};
use crate::domain::types::{DeliverySource, DeliveryStatus};
use chrono::NaiveDate;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// DeliveryFilter - 组合查询条件
// ==========================================
// 条件之间为 AND;statuses 集合内部为 OR
#[derive(Debug, Clone, Default)]
pub struct DeliveryFilter {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub statuses: Option<Vec<DeliveryStatus>>,
    pub truck_id: Option<String>,
    pub driver_id: Option<String>,
    pub source: Option<DeliverySource>,
}

// ==========================================
// DailyUsageRow - 单日排期聚合行
// ==========================================
// 供运力聚合引擎使用,只统计非取消配送单
#[derive(Debug, Clone)]
pub struct DailyUsageRow {
    pub date: NaiveDate,
    pub scheduled_t: f64,
    pub delivery_count: i64,
    pub trucks_used: i64,
}

// ==========================================
// DeliveryRepository - 配送单仓储
// ==========================================
pub struct DeliveryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DeliveryRepository {
    /// 从共享连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>, super::error::RepositoryError> {
        self.conn
            .lock()
            .map_err(|e| super::error::RepositoryError::LockError(e.to_string()))
    }

    const SELECT_COLS: &'static str = r#"
        SELECT delivery_id, source, customer_name, customer_phone, customer_email,
               address_line, city, district, material_id, material_name, quantity_t,
               delivery_date, time_window, hour_slot,
               truck_id, truck_number, driver_id, driver_name, stop_order,
               status, scheduled_at, en_route_at, delivered_at, cancelled_at,
               photo_url, inventory_depleted, schedule_confirmed,
               notifications_json, status_history_json, created_at, updated_at
        FROM delivery
    "#;

    /// 行映射(含 JSON 列反序列化与状态归一化)
    fn map_row(row: &Row<'_>) -> rusqlite::Result<Delivery> {
        let source_raw: String = row.get("source")?;
        let source = DeliverySource::parse(&source_raw).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                1,
                rusqlite::types::Type::Text,
                format!("未知订单来源: {}", source_raw).into(),
            )
        })?;

        let status_raw: String = row.get("status")?;
        let status = DeliveryStatus::parse(&status_raw).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                19,
                rusqlite::types::Type::Text,
                format!("未知配送状态: {}", status_raw).into(),
            )
        })?;

        let notifications_json: String = row.get("notifications_json")?;
        let notifications: NotificationFlags =
            serde_json::from_str(&notifications_json).unwrap_or_default();

        let history_json: String = row.get("status_history_json")?;
        let status_history: Vec<StatusHistoryEntry> =
            serde_json::from_str(&history_json).unwrap_or_default();

        Ok(Delivery {
            delivery_id: row.get("delivery_id")?,
            source,
            customer_name: row.get("customer_name")?,
            customer_phone: row.get("customer_phone")?,
            customer_email: row.get("customer_email")?,
            address_line: row.get("address_line")?,
            city: row.get("city")?,
            district: row.get("district")?,
            material_id: row.get("material_id")?,
            material_name: row.get("material_name")?,
            quantity_t: row.get("quantity_t")?,
            delivery_date: row.get("delivery_date")?,
            time_window: row.get("time_window")?,
            hour_slot: row.get("hour_slot")?,
            truck_id: row.get("truck_id")?,
            truck_number: row.get("truck_number")?,
            driver_id: row.get("driver_id")?,
            driver_name: row.get("driver_name")?,
            stop_order: row.get("stop_order")?,
            status,
            scheduled_at: row.get("scheduled_at")?,
            en_route_at: row.get("en_route_at")?,
            delivered_at: row.get("delivered_at")?,
            cancelled_at: row.get("cancelled_at")?,
            photo_url: row.get("photo_url")?,
            inventory_depleted: row.get::<_, i64>("inventory_depleted")? != 0,
            schedule_confirmed: row.get::<_, i64>("schedule_confirmed")? != 0,
            notifications,
            status_history,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// 插入配送单
    pub fn insert(&self, delivery: &Delivery) -> super::error::RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO delivery (
                delivery_id, source, customer_name, customer_phone, customer_email,
                address_line, city, district, material_id, material_name, quantity_t,
                delivery_date, time_window, hour_slot, slot_key,
                truck_id, truck_number, driver_id, driver_name, stop_order,
                status, scheduled_at, en_route_at, delivered_at, cancelled_at,
                photo_url, inventory_depleted, schedule_confirmed,
                notifications_json, status_history_json, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11,
                ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20,
                ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29, ?30, ?31, ?32
            )
            "#,
            params![
                delivery.delivery_id,
                delivery.source.as_str(),
                delivery.customer_name,
                delivery.customer_phone,
                delivery.customer_email,
                delivery.address_line,
                delivery.city,
                delivery.district,
                delivery.material_id,
                delivery.material_name,
                delivery.quantity_t,
                delivery.delivery_date,
                delivery.time_window,
                delivery.hour_slot,
                delivery.slot_key(),
                delivery.truck_id,
                delivery.truck_number,
                delivery.driver_id,
                delivery.driver_name,
                delivery.stop_order,
                delivery.status.as_str(),
                delivery.scheduled_at,
                delivery.en_route_at,
                delivery.delivered_at,
                delivery.cancelled_at,
                delivery.photo_url,
                delivery.inventory_depleted as i64,
                delivery.schedule_confirmed as i64,
                serde_json::to_string(&delivery.notifications)?,
                serde_json::to_string(&delivery.status_history)?,
                delivery.created_at,
                delivery.updated_at,
            ],
        )?;
        Ok(())
    }

    /// 按ID查询
    pub fn find_by_id(&self, delivery_id: &str) -> super::error::RepositoryResult<Option<Delivery>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE delivery_id = ?1", Self::SELECT_COLS);
        let delivery = conn
            .query_row(&sql, params![delivery_id], Self::map_row)
            .optional()?;
        Ok(delivery)
    }

    /// 全字段更新(单文档原子写,slot_key 同步重算)
    pub fn update(&self, delivery: &Delivery) -> super::error::RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE delivery SET
                source = ?2, customer_name = ?3, customer_phone = ?4, customer_email = ?5,
                address_line = ?6, city = ?7, district = ?8,
                material_id = ?9, material_name = ?10, quantity_t = ?11,
                delivery_date = ?12, time_window = ?13, hour_slot = ?14, slot_key = ?15,
                truck_id = ?16, truck_number = ?17, driver_id = ?18, driver_name = ?19,
                stop_order = ?20, status = ?21,
                scheduled_at = ?22, en_route_at = ?23, delivered_at = ?24, cancelled_at = ?25,
                photo_url = ?26, inventory_depleted = ?27, schedule_confirmed = ?28,
                notifications_json = ?29, status_history_json = ?30, updated_at = ?31
            WHERE delivery_id = ?1
            "#,
            params![
                delivery.delivery_id,
                delivery.source.as_str(),
                delivery.customer_name,
                delivery.customer_phone,
                delivery.customer_email,
                delivery.address_line,
                delivery.city,
                delivery.district,
                delivery.material_id,
                delivery.material_name,
                delivery.quantity_t,
                delivery.delivery_date,
                delivery.time_window,
                delivery.hour_slot,
                delivery.slot_key(),
                delivery.truck_id,
                delivery.truck_number,
                delivery.driver_id,
                delivery.driver_name,
                delivery.stop_order,
                delivery.status.as_str(),
                delivery.scheduled_at,
                delivery.en_route_at,
                delivery.delivered_at,
                delivery.cancelled_at,
                delivery.photo_url,
                delivery.inventory_depleted as i64,
                delivery.schedule_confirmed as i64,
                serde_json::to_string(&delivery.notifications)?,
                serde_json::to_string(&delivery.status_history)?,
                delivery.updated_at,
            ],
        )?;

        if affected == 0 {
            return Err(super::error::RepositoryError::NotFound {
                entity: "Delivery".to_string(),
                id: delivery.delivery_id.clone(),
            });
        }
        Ok(())
    }

    /// 组合条件查询
    ///
    /// 排序: (配送日期, 时段键, 装车顺序);无时段的单排在当日末尾
    pub fn find(&self, filter: &DeliveryFilter) -> super::error::RepositoryResult<Vec<Delivery>> {
        let mut sql = format!("{} WHERE 1=1", Self::SELECT_COLS);
        let mut values: Vec<String> = Vec::new();

        if let Some(from) = filter.date_from {
            values.push(from.format("%Y-%m-%d").to_string());
            sql.push_str(&format!(" AND delivery_date >= ?{}", values.len()));
        }
        if let Some(to) = filter.date_to {
            values.push(to.format("%Y-%m-%d").to_string());
            sql.push_str(&format!(" AND delivery_date <= ?{}", values.len()));
        }
        if let Some(statuses) = &filter.statuses {
            if !statuses.is_empty() {
                let mut placeholders = Vec::new();
                for s in statuses {
                    values.push(s.as_str().to_string());
                    placeholders.push(format!("?{}", values.len()));
                }
                sql.push_str(&format!(" AND status IN ({})", placeholders.join(", ")));
            }
        }
        if let Some(truck_id) = &filter.truck_id {
            values.push(truck_id.clone());
            sql.push_str(&format!(" AND truck_id = ?{}", values.len()));
        }
        if let Some(driver_id) = &filter.driver_id {
            values.push(driver_id.clone());
            sql.push_str(&format!(" AND driver_id = ?{}", values.len()));
        }
        if let Some(source) = filter.source {
            values.push(source.as_str().to_string());
            sql.push_str(&format!(" AND source = ?{}", values.len()));
        }

        sql.push_str(
            " ORDER BY delivery_date, \
             CASE WHEN slot_key IS NULL THEN 1 ELSE 0 END, slot_key, \
             CASE WHEN stop_order IS NULL THEN 1 ELSE 0 END, stop_order, \
             created_at",
        );

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), Self::map_row)?;

        let mut deliveries = Vec::new();
        for row in rows {
            deliveries.push(row?);
        }
        Ok(deliveries)
    }

    /// 时段冲突探测
    ///
    /// 判定: 同车辆、同日期、时段键完全相等的非取消配送单
    /// exclude_delivery_id: 移单/改单时排除自身
    pub fn exists_slot_booking(
        &self,
        truck_id: &str,
        date: NaiveDate,
        slot_key: &str,
        exclude_delivery_id: Option<&str>,
    ) -> super::error::RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            r#"
            SELECT COUNT(*) FROM delivery
            WHERE truck_id = ?1
              AND delivery_date = ?2
              AND slot_key = ?3
              AND status != 'CANCELLED'
              AND (?4 IS NULL OR delivery_id != ?4)
            "#,
            params![truck_id, date, slot_key, exclude_delivery_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// 日期范围内的排期聚合(按日分组,只统计非取消单)
    ///
    /// trucks_used 按 truck_id 去重,未派车单不计入
    pub fn daily_usage(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> super::error::RepositoryResult<Vec<DailyUsageRow>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT delivery_date,
                   COALESCE(SUM(quantity_t), 0),
                   COUNT(*),
                   COUNT(DISTINCT truck_id)
            FROM delivery
            WHERE status != 'CANCELLED'
              AND delivery_date >= ?1
              AND delivery_date <= ?2
            GROUP BY delivery_date
            "#,
        )?;

        let rows = stmt.query_map(params![from, to], |row| {
            Ok(DailyUsageRow {
                date: row.get(0)?,
                scheduled_t: row.get(1)?,
                delivery_count: row.get(2)?,
                trucks_used: row.get(3)?,
            })
        })?;

        let mut usage = Vec::new();
        for row in rows {
            usage.push(row?);
        }
        Ok(usage)
    }
}
