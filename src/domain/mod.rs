// ==========================================
// 砂石运输调度系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、业务规则接口
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod capacity;
pub mod delivery;
pub mod truck;
pub mod types;

// 重导出核心类型
pub use capacity::DayCapacity;
pub use delivery::{
    is_valid_hour_slot, slot_key, Delivery, NotificationFlags, StatusHistoryEntry,
};
pub use truck::{DriverRef, Truck, TruckUpdate};
pub use types::{
    DayStatus, DeliverySource, DeliveryStatus, LifecycleEvent, NotificationChannel,
};
