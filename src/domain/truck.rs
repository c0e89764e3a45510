// ==========================================
// 砂石运输调度系统 - 车辆领域模型
// ==========================================
// 红线: 车辆只做软停用(is_active=false),不做物理删除
// 说明: 历史配送单仍引用已停用车辆,停用不级联
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// DriverRef - 默认司机信息
// ==========================================
// 配送单派车时拷贝为快照字段,车辆后续变更不回溯
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverRef {
    pub driver_id: String,
    pub driver_name: String,
    pub driver_phone: Option<String>,
}

// ==========================================
// Truck - 车辆主数据
// ==========================================
// 对齐: truck 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Truck {
    pub truck_id: String,           // 车辆ID (UUID)
    pub truck_number: String,       // 车牌/编号 (活跃车辆内大小写不敏感唯一)
    pub truck_type: String,         // 车型 (如 "DUMP_10T" / "DUMP_20T")
    pub capacity_t: f64,            // 载重 (吨, 必须为正)
    pub is_active: bool,            // 活跃标志 (停用后不参与运力与新派车)
    pub default_driver: Option<DriverRef>, // 默认司机 (可选)
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Truck {
    /// 车牌规范化键: 去首尾空白 + 小写
    ///
    /// 活跃车辆唯一性按此键判定
    pub fn number_key(number: &str) -> String {
        number.trim().to_lowercase()
    }
}

// ==========================================
// TruckUpdate - 部分更新载荷
// ==========================================
// None 表示不修改该字段
#[derive(Debug, Clone, Default)]
pub struct TruckUpdate {
    pub truck_number: Option<String>,
    pub truck_type: Option<String>,
    pub capacity_t: Option<f64>,
    pub default_driver: Option<Option<DriverRef>>, // Some(None) 表示清除司机
}

impl TruckUpdate {
    pub fn is_empty(&self) -> bool {
        self.truck_number.is_none()
            && self.truck_type.is_none()
            && self.capacity_t.is_none()
            && self.default_driver.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_key_normalization() {
        assert_eq!(Truck::number_key("  皖A-1122 "), "皖a-1122");
        assert_eq!(Truck::number_key("T01"), Truck::number_key("t01 "));
    }

    #[test]
    fn test_update_is_empty() {
        assert!(TruckUpdate::default().is_empty());
        let u = TruckUpdate {
            capacity_t: Some(24.0),
            ..Default::default()
        };
        assert!(!u.is_empty());
    }
}
