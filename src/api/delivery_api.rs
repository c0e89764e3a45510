// ==========================================
// 砂石运输调度系统 - 配送单 API
// ==========================================
// 职责: 配送单创建、组合查询、取消
// 说明: 创建时状态派生——带 truck_id 即 SCHEDULED,否则 UNASSIGNED;
//       车辆/司机字段为写入时刻快照,不做关联查询
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::delivery::{is_valid_hour_slot, Delivery};
use crate::domain::types::{DeliverySource, DeliveryStatus};
use crate::engine::lifecycle::LifecycleEngine;
use crate::repository::delivery_repo::{DeliveryFilter, DeliveryRepository};
use crate::repository::truck_repo::TruckRepository;
use chrono::{Local, NaiveDate};
use std::sync::Arc;
use uuid::Uuid;

// ==========================================
// NewDelivery - 创建载荷
// ==========================================
#[derive(Debug, Clone)]
pub struct NewDelivery {
    pub source: DeliverySource,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub address_line: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub material_id: Option<String>,
    pub material_name: Option<String>,
    pub quantity_t: f64,
    pub delivery_date: NaiveDate,
    pub time_window: Option<String>,
    pub hour_slot: Option<i64>,
    /// 创建即派车(可选);状态据此派生
    pub truck_id: Option<String>,
    pub stop_order: Option<i64>,
}

// ==========================================
// DeliveryApi - 配送单 API
// ==========================================
pub struct DeliveryApi {
    delivery_repo: Arc<DeliveryRepository>,
    truck_repo: Arc<TruckRepository>,
    lifecycle: Arc<LifecycleEngine>,
}

impl DeliveryApi {
    pub fn new(
        delivery_repo: Arc<DeliveryRepository>,
        truck_repo: Arc<TruckRepository>,
        lifecycle: Arc<LifecycleEngine>,
    ) -> Self {
        Self {
            delivery_repo,
            truck_repo,
            lifecycle,
        }
    }

    /// 创建配送单
    ///
    /// 状态派生: 提供 truck_id 则为 SCHEDULED,否则 UNASSIGNED;
    /// 历史初始化为恰好一条与当前状态一致的条目(不变量1);
    /// 时段占用由存储层唯一索引兜底,冲突上抛 SlotConflict
    pub fn create_delivery(&self, new: &NewDelivery, actor: &str) -> ApiResult<Delivery> {
        if new.quantity_t < 0.0 {
            return Err(ApiError::ValidationError(format!(
                "吨位不可为负: {}",
                new.quantity_t
            )));
        }
        if let Some(h) = new.hour_slot {
            if !is_valid_hour_slot(h) {
                return Err(ApiError::ValidationError(format!(
                    "小时位越界(0-23): {}",
                    h
                )));
            }
        }

        let now = Local::now().naive_local();

        // 创建即派车: 解析活跃车辆并拷贝快照字段
        let (status, truck, scheduled_at) = match &new.truck_id {
            Some(truck_id) => {
                let truck = self
                    .truck_repo
                    .find_by_id(truck_id)?
                    .ok_or_else(|| ApiError::NotFound(format!("Truck(id={})不存在", truck_id)))?;
                if !truck.is_active {
                    return Err(ApiError::BusinessRuleViolation(format!(
                        "车辆已停用,不可派车: {}",
                        truck.truck_number
                    )));
                }
                (DeliveryStatus::Scheduled, Some(truck), Some(now))
            }
            None => (DeliveryStatus::Unassigned, None, None),
        };

        let mut delivery = Delivery {
            delivery_id: Uuid::new_v4().to_string(),
            source: new.source,
            customer_name: new.customer_name.clone(),
            customer_phone: new.customer_phone.clone(),
            customer_email: new.customer_email.clone(),
            address_line: new.address_line.clone(),
            city: new.city.clone(),
            district: new.district.clone(),
            material_id: new.material_id.clone(),
            material_name: new.material_name.clone(),
            quantity_t: new.quantity_t,
            delivery_date: new.delivery_date,
            time_window: new.time_window.clone(),
            hour_slot: new.hour_slot,
            truck_id: truck.as_ref().map(|t| t.truck_id.clone()),
            truck_number: truck.as_ref().map(|t| t.truck_number.clone()),
            driver_id: truck
                .as_ref()
                .and_then(|t| t.default_driver.as_ref())
                .map(|d| d.driver_id.clone()),
            driver_name: truck
                .as_ref()
                .and_then(|t| t.default_driver.as_ref())
                .map(|d| d.driver_name.clone()),
            stop_order: new.stop_order,
            status,
            scheduled_at,
            en_route_at: None,
            delivered_at: None,
            cancelled_at: None,
            photo_url: None,
            inventory_depleted: false,
            schedule_confirmed: false,
            notifications: Default::default(),
            status_history: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        delivery.push_history(status, now, actor, Some("创建配送单".to_string()));

        self.delivery_repo.insert(&delivery)?;
        tracing::info!(
            "配送单创建: delivery_id={}, date={}, status={}",
            delivery.delivery_id,
            delivery.delivery_date,
            delivery.status
        );
        Ok(delivery)
    }

    /// 组合条件查询
    ///
    /// 条件之间 AND;状态集合内部 OR;
    /// 排序: (配送日期, 时段, 装车顺序)
    pub fn find_deliveries(&self, filter: &DeliveryFilter) -> ApiResult<Vec<Delivery>> {
        Ok(self.delivery_repo.find(filter)?)
    }

    /// 按ID查询
    pub fn get_delivery(&self, delivery_id: &str) -> ApiResult<Delivery> {
        self.delivery_repo
            .find_by_id(delivery_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Delivery(id={})不存在", delivery_id)))
    }

    /// 取消配送单
    ///
    /// 任意非终态可取消;对终态单的重复取消为幂等空操作
    /// (容忍重复提交的取消请求),两次都返回成功
    pub fn cancel_delivery(
        &self,
        delivery_id: &str,
        reason: &str,
        actor: &str,
    ) -> ApiResult<Delivery> {
        Ok(self.lifecycle.cancel(delivery_id, reason, actor)?)
    }
}
