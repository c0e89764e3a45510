// ==========================================
// 砂石运输调度系统 - 时段冲突检查引擎
// ==========================================
// 判定规则: 同车辆、同日期、时段键完全相等的非取消配送单
//           即构成冲突;无时段键的单不参与冲突
// 说明: "先查后写"不具备原子性,存储层另有
//       idx_delivery_truck_slot 唯一索引兜底(见 db.rs)
// ==========================================

use crate::domain::delivery;
use crate::repository::delivery_repo::DeliveryRepository;
use crate::repository::error::RepositoryResult;
use chrono::NaiveDate;
use std::sync::Arc;

// ==========================================
// DeliverySlot - 待检时段
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct DeliverySlot {
    pub time_window: Option<String>,
    pub hour_slot: Option<i64>,
}

impl DeliverySlot {
    /// 时段键(时间窗优先,其次小时位)
    pub fn key(&self) -> Option<String> {
        delivery::slot_key(self.time_window.as_deref(), self.hour_slot)
    }
}

// ==========================================
// SlotConflictChecker - 时段冲突检查器
// ==========================================
pub struct SlotConflictChecker {
    delivery_repo: Arc<DeliveryRepository>,
}

impl SlotConflictChecker {
    pub fn new(delivery_repo: Arc<DeliveryRepository>) -> Self {
        Self { delivery_repo }
    }

    /// 检查拟派时段是否与既有预订冲突
    ///
    /// # 参数
    /// - truck_id: 拟派车辆
    /// - date: 拟派日期
    /// - slot: 拟派时段
    /// - exclude_delivery_id: 移单/改单时排除自身
    ///
    /// # 返回
    /// - Ok(true): 存在冲突,调用方必须以 SlotConflict 拒绝,不得覆盖
    /// - Ok(false): 无冲突
    pub fn check_conflict(
        &self,
        truck_id: &str,
        date: NaiveDate,
        slot: &DeliverySlot,
        exclude_delivery_id: Option<&str>,
    ) -> RepositoryResult<bool> {
        let key = match slot.key() {
            Some(k) => k,
            // 无时段的派车不占用具体时段,不构成冲突
            None => return Ok(false),
        };

        self.delivery_repo
            .exists_slot_booking(truck_id, date, &key, exclude_delivery_id)
    }
}
