// ==========================================
// 砂石运输调度系统 - API 层
// ==========================================
// 职责: 面向调用方(调度台/司机端/外部规划方)的业务接口
// 红线: 入参校验在此层完成,引擎假定入参已清洗
// ==========================================

pub mod capacity_api;
pub mod delivery_api;
pub mod dispatch_api;
pub mod error;
pub mod fleet_api;

// 重导出核心类型
pub use capacity_api::CapacityApi;
pub use delivery_api::{DeliveryApi, NewDelivery};
pub use dispatch_api::{DispatchApi, PLANNER_ACTOR};
pub use error::{ApiError, ApiResult};
pub use fleet_api::FleetApi;
