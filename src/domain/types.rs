// ==========================================
// 砂石运输调度系统 - 领域类型定义
// ==========================================
// 红线: 状态为封闭枚举,统一大写下划线格式
// 说明: 历史数据存在混合大小写("scheduled"/"SCHEDULED"),
//       入库前统一经 parse 归一化
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 配送状态 (Delivery Status)
// ==========================================
// 状态机: UNASSIGNED -> SCHEDULED -> EN_ROUTE -> DELIVERED
//         非终态 -> CANCELLED
// 终态: DELIVERED / CANCELLED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Unassigned, // 未派车
    Scheduled,  // 已排班
    EnRoute,    // 在途
    Delivered,  // 已送达
    Cancelled,  // 已取消
}

impl DeliveryStatus {
    /// 转换为数据库存储格式
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Unassigned => "UNASSIGNED",
            DeliveryStatus::Scheduled => "SCHEDULED",
            DeliveryStatus::EnRoute => "EN_ROUTE",
            DeliveryStatus::Delivered => "DELIVERED",
            DeliveryStatus::Cancelled => "CANCELLED",
        }
    }

    /// 解析状态字符串(兼容历史混合大小写数据)
    ///
    /// 兼容格式: "scheduled" / "SCHEDULED" / "en-route" / "enRoute"
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_uppercase();
        match normalized.as_str() {
            "UNASSIGNED" => Some(DeliveryStatus::Unassigned),
            "SCHEDULED" => Some(DeliveryStatus::Scheduled),
            "ENROUTE" => Some(DeliveryStatus::EnRoute),
            "DELIVERED" => Some(DeliveryStatus::Delivered),
            "CANCELLED" | "CANCELED" => Some(DeliveryStatus::Cancelled),
            _ => None,
        }
    }

    /// 是否为终态(终态不允许任何状态转换,取消除外——视为幂等空操作)
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeliveryStatus::Delivered | DeliveryStatus::Cancelled)
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 订单来源 (Delivery Source)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliverySource {
    StorefrontOrder, // 门店下单
    WalkIn,          // 到场散售
    Wholesale,       // 批发大宗
}

impl DeliverySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliverySource::StorefrontOrder => "STOREFRONT_ORDER",
            DeliverySource::WalkIn => "WALK_IN",
            DeliverySource::Wholesale => "WHOLESALE",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "STOREFRONT_ORDER" => Some(DeliverySource::StorefrontOrder),
            "WALK_IN" => Some(DeliverySource::WalkIn),
            "WHOLESALE" => Some(DeliverySource::Wholesale),
            _ => None,
        }
    }
}

impl fmt::Display for DeliverySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 单日运力状态 (Day Status)
// ==========================================
// 分级依据: 剩余运力占比 r = available_t / total_capacity_t
//   r > 0.30         -> AVAILABLE
//   0.10 < r <= 0.30 -> LIMITED
//   其余             -> FULL
// 休息日固定为 CLOSED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayStatus {
    Available, // 运力充足
    Limited,   // 运力紧张
    Full,      // 运力饱和
    Closed,    // 休息日
}

impl DayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayStatus::Available => "available",
            DayStatus::Limited => "limited",
            DayStatus::Full => "full",
            DayStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for DayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 通知渠道 (Notification Channel)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationChannel {
    Sms,   // 短信
    Email, // 邮件
}

// ==========================================
// 生命周期事件 (Lifecycle Event)
// ==========================================
// 用途: 通知标志位按 (事件 x 渠道) 维度记录
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleEvent {
    Scheduled, // 排班确认
    EnRoute,   // 发车在途
    Delivered, // 送达完成
}
