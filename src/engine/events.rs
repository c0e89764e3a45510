// ==========================================
// 砂石运输调度系统 - 引擎层事件发布
// ==========================================
// 职责: 定义派车事件发布 trait,实现依赖倒置
// 说明: Engine 层定义 trait,通知适配层(短信/邮件网关)实现
// 红线: 事件发布失败只记日志,绝不回滚已完成的状态转换
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

// ==========================================
// 派车事件类型
// ==========================================

/// 派车事件
///
/// Engine 层发布的事件,携带通知适配层所需的标识信息;
/// 原始图片、消息正文等均不经过本核心
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DispatchEvent {
    /// 配送单已排班
    Scheduled {
        delivery_id: String,
        truck_id: Option<String>,
        delivery_date: NaiveDate,
    },
    /// 司机已发车
    EnRoute {
        delivery_id: String,
        driver_id: Option<String>,
        eta_minutes: u32,
    },
    /// 已送达
    Delivered {
        delivery_id: String,
        photo_url: Option<String>,
    },
    /// 当日排班已定稿
    ScheduleFinalized {
        date: NaiveDate,
        delivery_ids: Vec<String>,
    },
}

impl DispatchEvent {
    /// 事件类型标识(日志用)
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchEvent::Scheduled { .. } => "Scheduled",
            DispatchEvent::EnRoute { .. } => "EnRoute",
            DispatchEvent::Delivered { .. } => "Delivered",
            DispatchEvent::ScheduleFinalized { .. } => "ScheduleFinalized",
        }
    }
}

// ==========================================
// 事件发布 Trait
// ==========================================

/// 派车事件发布者 Trait
///
/// Engine 层定义,外部通知适配层实现
/// 通过 trait 实现依赖倒置,核心不依赖任何通知渠道
pub trait DispatchEventPublisher: Send + Sync {
    /// 发布派车事件
    fn publish(&self, event: DispatchEvent) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// 空操作事件发布者
///
/// 用于不需要事件发布的场景(如单元测试)
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl DispatchEventPublisher for NoOpEventPublisher {
    fn publish(&self, event: DispatchEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::debug!("NoOpEventPublisher: 跳过事件发布 - kind={}", event.kind());
        Ok(())
    }
}

/// 可选的事件发布者包装
///
/// 简化 Option<Arc<dyn DispatchEventPublisher>> 的使用;
/// publish_lossy 吞掉发布错误,保证状态转换不受通知侧故障影响
pub struct OptionalEventPublisher {
    inner: Option<Arc<dyn DispatchEventPublisher>>,
}

impl OptionalEventPublisher {
    /// 创建带发布者的实例
    pub fn with_publisher(publisher: Arc<dyn DispatchEventPublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    /// 创建空实例(不发布事件)
    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 发布事件;失败仅告警
    ///
    /// 依赖故障不得中断状态转换,错误在此处收口
    pub fn publish_lossy(&self, event: DispatchEvent) {
        let kind = event.kind();
        match &self.inner {
            Some(publisher) => {
                if let Err(e) = publisher.publish(event) {
                    tracing::warn!("事件发布失败(不影响状态转换): kind={}, error={}", kind, e);
                }
            }
            None => {
                tracing::debug!("OptionalEventPublisher: 未配置发布者,跳过事件 - kind={}", kind);
            }
        }
    }

    /// 检查是否配置了发布者
    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl Default for OptionalEventPublisher {
    fn default() -> Self {
        Self::none()
    }
}
