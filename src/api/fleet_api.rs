// ==========================================
// 砂石运输调度系统 - 车队登记 API
// ==========================================
// 职责: 车辆注册、更新、软停用、查询
// 红线: 活跃车辆车牌唯一(大小写不敏感,去首尾空白);
//       API 层先行查重,存储层唯一索引兜底
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::truck::{DriverRef, Truck, TruckUpdate};
use crate::repository::truck_repo::TruckRepository;
use chrono::Local;
use std::sync::Arc;
use uuid::Uuid;

// ==========================================
// FleetApi - 车队登记 API
// ==========================================
pub struct FleetApi {
    truck_repo: Arc<TruckRepository>,
}

impl FleetApi {
    pub fn new(truck_repo: Arc<TruckRepository>) -> Self {
        Self { truck_repo }
    }

    /// 注册车辆
    ///
    /// # 参数
    /// - truck_number: 车牌/编号(入库前去首尾空白)
    /// - truck_type: 车型
    /// - capacity_t: 载重(吨,必须为正)
    /// - default_driver: 默认司机(可选)
    ///
    /// # 错误
    /// - InvalidInput: 车牌为空或载重非正
    /// - DuplicateTruckNumber: 已存在同号活跃车辆
    pub fn register_truck(
        &self,
        truck_number: &str,
        truck_type: &str,
        capacity_t: f64,
        default_driver: Option<DriverRef>,
    ) -> ApiResult<Truck> {
        let truck_number = truck_number.trim();
        if truck_number.is_empty() {
            return Err(ApiError::InvalidInput("车牌不能为空".to_string()));
        }
        if capacity_t <= 0.0 {
            return Err(ApiError::InvalidInput(format!(
                "载重必须为正数: {}",
                capacity_t
            )));
        }

        // 活跃车辆查重(存储层 idx_truck_number_active 兜底)
        if let Some(existing) = self.truck_repo.find_active_by_number(truck_number)? {
            return Err(ApiError::DuplicateTruckNumber(format!(
                "已存在同号活跃车辆: {} (id={})",
                existing.truck_number, existing.truck_id
            )));
        }

        let now = Local::now().naive_local();
        let truck = Truck {
            truck_id: Uuid::new_v4().to_string(),
            truck_number: truck_number.to_string(),
            truck_type: truck_type.trim().to_string(),
            capacity_t,
            is_active: true,
            default_driver,
            created_at: now,
            updated_at: now,
        };

        self.truck_repo.insert(&truck)?;
        tracing::info!(
            "车辆注册: truck_id={}, number={}, capacity={}t",
            truck.truck_id,
            truck.truck_number,
            truck.capacity_t
        );
        Ok(truck)
    }

    /// 部分更新车辆
    ///
    /// None 字段不修改;载重若提供必须为正;
    /// 改车牌时对活跃车辆重新查重
    pub fn update_truck(&self, truck_id: &str, update: &TruckUpdate) -> ApiResult<Truck> {
        if update.is_empty() {
            return Err(ApiError::InvalidInput("更新载荷为空".to_string()));
        }

        let mut truck = self.get_truck(truck_id)?;

        if let Some(capacity_t) = update.capacity_t {
            if capacity_t <= 0.0 {
                return Err(ApiError::InvalidInput(format!(
                    "载重必须为正数: {}",
                    capacity_t
                )));
            }
            truck.capacity_t = capacity_t;
        }
        if let Some(number) = &update.truck_number {
            let number = number.trim();
            if number.is_empty() {
                return Err(ApiError::InvalidInput("车牌不能为空".to_string()));
            }
            if Truck::number_key(number) != Truck::number_key(&truck.truck_number) {
                if let Some(existing) = self.truck_repo.find_active_by_number(number)? {
                    return Err(ApiError::DuplicateTruckNumber(format!(
                        "已存在同号活跃车辆: {} (id={})",
                        existing.truck_number, existing.truck_id
                    )));
                }
            }
            truck.truck_number = number.to_string();
        }
        if let Some(truck_type) = &update.truck_type {
            truck.truck_type = truck_type.trim().to_string();
        }
        if let Some(driver) = &update.default_driver {
            truck.default_driver = driver.clone();
        }

        truck.updated_at = Local::now().naive_local();
        self.truck_repo.update(&truck)?;
        Ok(truck)
    }

    /// 软停用车辆(幂等: 重复停用不报错)
    ///
    /// 停用后不参与运力统计与新派车,历史配送单引用保持不变
    pub fn deactivate_truck(&self, truck_id: &str) -> ApiResult<()> {
        self.truck_repo
            .deactivate(truck_id, Local::now().naive_local())?;
        tracing::info!("车辆停用: truck_id={}", truck_id);
        Ok(())
    }

    /// 查询全部活跃车辆,按车牌排序
    pub fn list_active_trucks(&self) -> ApiResult<Vec<Truck>> {
        Ok(self.truck_repo.list_active()?)
    }

    /// 按ID查询车辆
    pub fn get_truck(&self, truck_id: &str) -> ApiResult<Truck> {
        self.truck_repo
            .find_by_id(truck_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Truck(id={})不存在", truck_id)))
    }
}
