// ==========================================
// 砂石运输调度系统 - 数据仓储层
// ==========================================
// 职责: SQLite 数据访问
// 红线: Repository 不含业务逻辑
// ==========================================

pub mod delivery_repo;
pub mod error;
pub mod truck_repo;

// 重导出核心类型
pub use delivery_repo::{DailyUsageRow, DeliveryFilter, DeliveryRepository};
pub use error::{RepositoryError, RepositoryResult};
pub use truck_repo::TruckRepository;
