// ==========================================
// 砂石运输调度系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型,转换Repository错误为用户友好的错误消息
// 错误分级:
//   ValidationError / InvalidInput —— 入参问题,调用方修正后重试
//   NotFound                      —— 未知ID,不可重试
//   SlotConflict                  —— 业务冲突,换时段后可重试
//   InvalidStateTransition        —— 状态机违规,不可直接重试
//   DependencyFailure             —— 外部依赖故障,状态转换不回滚
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("车牌重复: {0}")]
    DuplicateTruckNumber(String),

    #[error("时段冲突: {0}")]
    SlotConflict(String),

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    // ==========================================
    // 数据质量错误
    // ==========================================
    #[error("数据验证失败: {0}")]
    ValidationError(String),

    // ==========================================
    // 外部依赖错误
    // ==========================================
    /// 外部协作方(通知/ETA/库存)故障;携带该错误时,
    /// 核心自身的状态变更已经完成,不会回滚
    #[error("外部依赖故障: {0}")]
    DependencyFailure(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// 目的: 将Repository层的技术错误转换为用户友好的业务错误
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            // 数据库错误
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                // 唯一索引违反按索引归类为业务错误;
                // 普通列索引的 SQLite 报错只含列名,表达式索引含索引名
                if msg.contains("idx_delivery_truck_slot") || msg.contains("delivery.slot_key") {
                    ApiError::SlotConflict(msg)
                } else if msg.contains("idx_truck_number_active") {
                    ApiError::DuplicateTruckNumber(msg)
                } else {
                    ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
                }
            }

            // 业务规则错误
            RepositoryError::BusinessRuleViolation(msg) => {
                if msg.contains("时段冲突") {
                    ApiError::SlotConflict(msg)
                } else {
                    ApiError::BusinessRuleViolation(msg)
                }
            }
            RepositoryError::InvalidStateTransition { from, to } => {
                ApiError::InvalidStateTransition { from, to }
            }

            // 数据质量错误
            RepositoryError::ValidationError(msg) => ApiError::ValidationError(msg),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }

            // 通用错误
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
