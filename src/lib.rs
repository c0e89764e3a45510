// ==========================================
// 砂石运输调度系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 配送派车核心——生命周期状态机、时段冲突判定、
//           运力日历聚合(人工保留最终控制权)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施(连接初始化/PRAGMA 统一)
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    DayStatus, DeliverySource, DeliveryStatus, LifecycleEvent, NotificationChannel,
};

// 领域实体
pub use domain::{DayCapacity, Delivery, DriverRef, NotificationFlags, StatusHistoryEntry, Truck};

// 引擎
pub use engine::{
    AssignmentCommitter, AssignmentItem, AssignmentOutcome, CapacityAggregator, DeliverySlot,
    DispatchEvent, DispatchEventPublisher, EtaProvider, InventoryStore, LifecycleEngine,
    OptionalEventPublisher, SetTruckRequest, SlotConflictChecker,
};

// API
pub use api::{ApiError, ApiResult, CapacityApi, DeliveryApi, DispatchApi, FleetApi, NewDelivery};

// 应用装配
pub use app::{AppCollaborators, AppState};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "砂石运输调度系统";
