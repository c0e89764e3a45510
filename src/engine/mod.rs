// ==========================================
// 砂石运输调度系统 - 引擎层
// ==========================================
// 职责: 业务规则——冲突判定、运力聚合、生命周期转换、方案落地
// 红线: 引擎不直接依赖任何外部渠道,通过 trait 依赖倒置
// ==========================================

pub mod assignment;
pub mod capacity;
pub mod collaborators;
pub mod conflict;
pub mod events;
pub mod lifecycle;

// 重导出核心类型
pub use assignment::{AssignmentCommitter, AssignmentItem, AssignmentItemError, AssignmentOutcome};
pub use capacity::CapacityAggregator;
pub use collaborators::{EtaProvider, InventoryStore};
pub use conflict::{DeliverySlot, SlotConflictChecker};
pub use events::{
    DispatchEvent, DispatchEventPublisher, NoOpEventPublisher, OptionalEventPublisher,
};
pub use lifecycle::{LifecycleEngine, SetTruckRequest};
