// ==========================================
// 砂石运输调度系统 - 配置层
// ==========================================
// 职责: 系统配置管理
// 存储: config_kv 表
// ==========================================

pub mod config_manager;

// 重导出核心配置管理器
pub use config_manager::{
    config_keys, DispatchConfigManager, DEFAULT_CLOSED_WEEKDAY, DEFAULT_DELIVERIES_PER_TRUCK,
    DEFAULT_ETA_MINUTES, DEFAULT_SAME_DAY_CUTOFF_HOUR,
};
