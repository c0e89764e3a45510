// ==========================================
// 砂石运输调度系统 - 车辆数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 红线: 车辆不做物理删除,仅软停用
// ==========================================

use crate::domain::truck::{DriverRef, Truck};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// TruckRepository - 车辆仓储
// ==========================================

/// 车辆仓储
/// 职责: 管理 truck 表的CRUD操作
pub struct TruckRepository {
    conn: Arc<Mutex<Connection>>,
}

impl TruckRepository {
    /// 从共享连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 行映射
    fn map_row(row: &Row<'_>) -> rusqlite::Result<Truck> {
        let driver_id: Option<String> = row.get("driver_id")?;
        let default_driver = match driver_id {
            Some(id) => Some(DriverRef {
                driver_id: id,
                driver_name: row.get::<_, Option<String>>("driver_name")?.unwrap_or_default(),
                driver_phone: row.get("driver_phone")?,
            }),
            None => None,
        };

        Ok(Truck {
            truck_id: row.get("truck_id")?,
            truck_number: row.get("truck_number")?,
            truck_type: row.get("truck_type")?,
            capacity_t: row.get("capacity_t")?,
            is_active: row.get::<_, i64>("is_active")? != 0,
            default_driver,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    const SELECT_COLS: &'static str = r#"
        SELECT truck_id, truck_number, truck_type, capacity_t, is_active,
               driver_id, driver_name, driver_phone, created_at, updated_at
        FROM truck
    "#;

    /// 插入车辆
    ///
    /// 活跃车牌重复时由 idx_truck_number_active 唯一索引拦截,
    /// 上抛 UniqueConstraintViolation
    pub fn insert(&self, truck: &Truck) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let (driver_id, driver_name, driver_phone) = match &truck.default_driver {
            Some(d) => (
                Some(d.driver_id.clone()),
                Some(d.driver_name.clone()),
                d.driver_phone.clone(),
            ),
            None => (None, None, None),
        };

        conn.execute(
            r#"
            INSERT INTO truck (
                truck_id, truck_number, truck_type, capacity_t, is_active,
                driver_id, driver_name, driver_phone, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                truck.truck_id,
                truck.truck_number,
                truck.truck_type,
                truck.capacity_t,
                truck.is_active as i64,
                driver_id,
                driver_name,
                driver_phone,
                truck.created_at,
                truck.updated_at,
            ],
        )?;
        Ok(())
    }

    /// 按ID查询车辆
    pub fn find_by_id(&self, truck_id: &str) -> RepositoryResult<Option<Truck>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE truck_id = ?1", Self::SELECT_COLS);
        let truck = conn
            .query_row(&sql, params![truck_id], Self::map_row)
            .optional()?;
        Ok(truck)
    }

    /// 按车牌查询活跃车辆(大小写不敏感,去首尾空白)
    pub fn find_active_by_number(&self, truck_number: &str) -> RepositoryResult<Option<Truck>> {
        let conn = self.get_conn()?;
        let key = Truck::number_key(truck_number);
        let sql = format!(
            "{} WHERE lower(trim(truck_number)) = ?1 AND is_active = 1",
            Self::SELECT_COLS
        );
        let truck = conn.query_row(&sql, params![key], Self::map_row).optional()?;
        Ok(truck)
    }

    /// 查询全部活跃车辆,按车牌排序(大小写不敏感)
    pub fn list_active(&self) -> RepositoryResult<Vec<Truck>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE is_active = 1 ORDER BY lower(trim(truck_number))",
            Self::SELECT_COLS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], Self::map_row)?;

        let mut trucks = Vec::new();
        for row in rows {
            trucks.push(row?);
        }
        Ok(trucks)
    }

    /// 全字段更新(读-改-写模式,由 API 层先行校验)
    pub fn update(&self, truck: &Truck) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let (driver_id, driver_name, driver_phone) = match &truck.default_driver {
            Some(d) => (
                Some(d.driver_id.clone()),
                Some(d.driver_name.clone()),
                d.driver_phone.clone(),
            ),
            None => (None, None, None),
        };

        let affected = conn.execute(
            r#"
            UPDATE truck SET
                truck_number = ?2, truck_type = ?3, capacity_t = ?4, is_active = ?5,
                driver_id = ?6, driver_name = ?7, driver_phone = ?8, updated_at = ?9
            WHERE truck_id = ?1
            "#,
            params![
                truck.truck_id,
                truck.truck_number,
                truck.truck_type,
                truck.capacity_t,
                truck.is_active as i64,
                driver_id,
                driver_name,
                driver_phone,
                truck.updated_at,
            ],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Truck".to_string(),
                id: truck.truck_id.clone(),
            });
        }
        Ok(())
    }

    /// 软停用(幂等: 重复停用不报错)
    pub fn deactivate(&self, truck_id: &str, updated_at: chrono::NaiveDateTime) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE truck SET is_active = 0, updated_at = ?2 WHERE truck_id = ?1",
            params![truck_id, updated_at],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Truck".to_string(),
                id: truck_id.to_string(),
            });
        }
        Ok(())
    }
}
