// ==========================================
// 砂石运输调度系统 - 配送单领域模型
// ==========================================
// 不变量1: status 必须等于 status_history 末项的 status
// 不变量2: quantity_t >= 0
// 不变量3: DELIVERED 单必须有 delivered_at;
//          关联物料的库存扣减至多执行一次(inventory_depleted 守卫)
// 说明: truck_number/driver_name 为派车时刻的快照字段,不做关联查询
// ==========================================

use crate::domain::types::{DeliverySource, DeliveryStatus, LifecycleEvent, NotificationChannel};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// StatusHistoryEntry - 状态历史条目
// ==========================================
// 红线: 历史仅追加,不改写不删除
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub status: DeliveryStatus,
    pub ts: NaiveDateTime,
    pub actor: String,
    pub note: Option<String>,
}

// ==========================================
// NotificationFlags - 通知标志位
// ==========================================
// 语义: 标志位取自通知渠道的即时调用结果,只代表
//       "渠道已受理",不代表"客户已收到"(无回执确认)
// 红线: 标志位只置位不复位(幂等守卫,防止重复发送)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationFlags {
    #[serde(default)]
    pub scheduled_sms: bool,
    #[serde(default)]
    pub scheduled_email: bool,
    #[serde(default)]
    pub en_route_sms: bool,
    #[serde(default)]
    pub en_route_email: bool,
    #[serde(default)]
    pub delivered_sms: bool,
    #[serde(default)]
    pub delivered_email: bool,
}

impl NotificationFlags {
    /// 置位 (只置不清)
    pub fn mark(&mut self, event: LifecycleEvent, channel: NotificationChannel) {
        *self.slot_mut(event, channel) = true;
    }

    pub fn is_set(&self, event: LifecycleEvent, channel: NotificationChannel) -> bool {
        match (event, channel) {
            (LifecycleEvent::Scheduled, NotificationChannel::Sms) => self.scheduled_sms,
            (LifecycleEvent::Scheduled, NotificationChannel::Email) => self.scheduled_email,
            (LifecycleEvent::EnRoute, NotificationChannel::Sms) => self.en_route_sms,
            (LifecycleEvent::EnRoute, NotificationChannel::Email) => self.en_route_email,
            (LifecycleEvent::Delivered, NotificationChannel::Sms) => self.delivered_sms,
            (LifecycleEvent::Delivered, NotificationChannel::Email) => self.delivered_email,
        }
    }

    fn slot_mut(&mut self, event: LifecycleEvent, channel: NotificationChannel) -> &mut bool {
        match (event, channel) {
            (LifecycleEvent::Scheduled, NotificationChannel::Sms) => &mut self.scheduled_sms,
            (LifecycleEvent::Scheduled, NotificationChannel::Email) => &mut self.scheduled_email,
            (LifecycleEvent::EnRoute, NotificationChannel::Sms) => &mut self.en_route_sms,
            (LifecycleEvent::EnRoute, NotificationChannel::Email) => &mut self.en_route_email,
            (LifecycleEvent::Delivered, NotificationChannel::Sms) => &mut self.delivered_sms,
            (LifecycleEvent::Delivered, NotificationChannel::Email) => &mut self.delivered_email,
        }
    }
}

// ==========================================
// 时段键 (slot key)
// ==========================================

/// 计算时段键: 优先取时间窗字符串,否则取小时位(补零)
///
/// 冲突判定与排序均按该键进行;无时段的配送单不参与冲突
pub fn slot_key(time_window: Option<&str>, hour_slot: Option<i64>) -> Option<String> {
    if let Some(w) = time_window {
        let w = w.trim();
        if !w.is_empty() {
            return Some(w.to_string());
        }
    }
    hour_slot.map(|h| format!("{:02}", h))
}

/// 小时位合法范围: 0-23
///
/// 入口层(创建/派车/方案落地)据此拒绝越界小时位,
/// 保证 slot_key 的两位补零形式不被破坏
pub fn is_valid_hour_slot(hour_slot: i64) -> bool {
    (0..=23).contains(&hour_slot)
}

// ==========================================
// Delivery - 配送单
// ==========================================
// 对齐: delivery 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delivery {
    // ===== 主键与来源 =====
    pub delivery_id: String,
    pub source: DeliverySource,

    // ===== 客户联系方式 (任意子集可缺省) =====
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,

    // ===== 收货地址 =====
    pub address_line: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,

    // ===== 物料与数量 =====
    pub material_id: Option<String>,
    pub material_name: Option<String>, // 下单时刻快照
    pub quantity_t: f64,               // 吨, >= 0

    // ===== 排期 =====
    pub delivery_date: NaiveDate,
    pub time_window: Option<String>, // 如 "08:00-10:00"
    pub hour_slot: Option<i64>,      // 数字小时位 (与时间窗二选一或并存)

    // ===== 派车字段 (派车前全部为 None) =====
    pub truck_id: Option<String>,
    pub truck_number: Option<String>, // 派车时刻快照
    pub driver_id: Option<String>,
    pub driver_name: Option<String>,
    pub stop_order: Option<i64>, // 当日装车顺序

    // ===== 状态与转换时间戳 =====
    pub status: DeliveryStatus,
    pub scheduled_at: Option<NaiveDateTime>,
    pub en_route_at: Option<NaiveDateTime>,
    pub delivered_at: Option<NaiveDateTime>,
    pub cancelled_at: Option<NaiveDateTime>,

    // ===== 送达凭证 =====
    pub photo_url: Option<String>, // 仅在 DELIVERED 时写入

    // ===== 幂等守卫 =====
    pub inventory_depleted: bool,  // 库存扣减已执行
    pub schedule_confirmed: bool,  // 排班确认已定稿 (finalize)
    pub notifications: NotificationFlags,

    // ===== 审计 =====
    pub status_history: Vec<StatusHistoryEntry>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Delivery {
    /// 当前时段键
    pub fn slot_key(&self) -> Option<String> {
        slot_key(self.time_window.as_deref(), self.hour_slot)
    }

    /// 追加历史条目并同步 status 字段(维持不变量1)
    pub fn push_history(
        &mut self,
        status: DeliveryStatus,
        ts: NaiveDateTime,
        actor: &str,
        note: Option<String>,
    ) {
        self.status_history.push(StatusHistoryEntry {
            status,
            ts,
            actor: actor.to_string(),
            note,
        });
        self.status = status;
    }

    /// 历史末项状态 (用于不变量校验)
    pub fn last_history_status(&self) -> Option<DeliveryStatus> {
        self.status_history.last().map(|e| e.status)
    }
}
