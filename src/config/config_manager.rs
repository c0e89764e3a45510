// ==========================================
// 砂石运输调度系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value)
// 说明: 未配置的键回落到内置默认值
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::Weekday;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    /// 单车单日趟次上限 K
    pub const DELIVERIES_PER_TRUCK: &str = "capacity/deliveries_per_truck";
    /// 当日加单截单时点(本地小时)
    pub const SAME_DAY_CUTOFF_HOUR: &str = "capacity/same_day_cutoff_hour";
    /// 每周固定休息日
    pub const CLOSED_WEEKDAY: &str = "capacity/closed_weekday";
    /// ETA 服务缺失/失败时的兜底分钟数
    pub const DEFAULT_ETA_MINUTES: &str = "dispatch/default_eta_minutes";
    /// 料场发货地址(ETA 估算起点)
    pub const DEPOT_ADDRESS: &str = "dispatch/depot_address";
}

/// 单车单日趟次上限默认值
pub const DEFAULT_DELIVERIES_PER_TRUCK: i64 = 5;
/// 截单时点默认值(正午)
pub const DEFAULT_SAME_DAY_CUTOFF_HOUR: u32 = 12;
/// 休息日默认值
pub const DEFAULT_CLOSED_WEEKDAY: Weekday = Weekday::Sun;
/// ETA 兜底分钟数默认值
pub const DEFAULT_ETA_MINUTES: u32 = 30;

// ==========================================
// DispatchConfigManager - 配置管理器
// ==========================================
pub struct DispatchConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl DispatchConfigManager {
    /// 从共享连接创建配置管理器
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 从 config_kv 表读取配置值
    fn get_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 写入配置值(覆盖)
    pub fn set_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        conn.execute(
            r#"
            INSERT INTO config_kv (key, value, updated_at)
            VALUES (?1, ?2, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    // ==========================================
    // 类型化读取接口
    // ==========================================

    /// 单车单日趟次上限 K(默认 5)
    pub fn deliveries_per_truck(&self) -> RepositoryResult<i64> {
        let raw = self.get_config_value(config_keys::DELIVERIES_PER_TRUCK)?;
        match raw {
            Some(v) => v.trim().parse::<i64>().map_err(|_| {
                RepositoryError::FieldValueError {
                    field: config_keys::DELIVERIES_PER_TRUCK.to_string(),
                    message: format!("非法整数值: {}", v),
                }
            }),
            None => Ok(DEFAULT_DELIVERIES_PER_TRUCK),
        }
    }

    /// 当日加单截单时点(本地小时,默认 12)
    pub fn same_day_cutoff_hour(&self) -> RepositoryResult<u32> {
        let raw = self.get_config_value(config_keys::SAME_DAY_CUTOFF_HOUR)?;
        match raw {
            Some(v) => v.trim().parse::<u32>().map_err(|_| {
                RepositoryError::FieldValueError {
                    field: config_keys::SAME_DAY_CUTOFF_HOUR.to_string(),
                    message: format!("非法小时值: {}", v),
                }
            }),
            None => Ok(DEFAULT_SAME_DAY_CUTOFF_HOUR),
        }
    }

    /// 每周固定休息日(默认周日)
    pub fn closed_weekday(&self) -> RepositoryResult<Weekday> {
        let raw = self.get_config_value(config_keys::CLOSED_WEEKDAY)?;
        match raw {
            Some(v) => match v.trim().to_ascii_uppercase().as_str() {
                "MONDAY" | "MON" => Ok(Weekday::Mon),
                "TUESDAY" | "TUE" => Ok(Weekday::Tue),
                "WEDNESDAY" | "WED" => Ok(Weekday::Wed),
                "THURSDAY" | "THU" => Ok(Weekday::Thu),
                "FRIDAY" | "FRI" => Ok(Weekday::Fri),
                "SATURDAY" | "SAT" => Ok(Weekday::Sat),
                "SUNDAY" | "SUN" => Ok(Weekday::Sun),
                other => Err(RepositoryError::FieldValueError {
                    field: config_keys::CLOSED_WEEKDAY.to_string(),
                    message: format!("非法星期值: {}", other),
                }),
            },
            None => Ok(DEFAULT_CLOSED_WEEKDAY),
        }
    }

    /// ETA 兜底分钟数(默认 30)
    pub fn default_eta_minutes(&self) -> RepositoryResult<u32> {
        let raw = self.get_config_value(config_keys::DEFAULT_ETA_MINUTES)?;
        match raw {
            Some(v) => v.trim().parse::<u32>().map_err(|_| {
                RepositoryError::FieldValueError {
                    field: config_keys::DEFAULT_ETA_MINUTES.to_string(),
                    message: format!("非法分钟值: {}", v),
                }
            }),
            None => Ok(DEFAULT_ETA_MINUTES),
        }
    }

    /// 料场发货地址(未配置时为 None)
    pub fn depot_address(&self) -> RepositoryResult<Option<String>> {
        self.get_config_value(config_keys::DEPOT_ADDRESS)
    }
}
