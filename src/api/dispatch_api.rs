// ==========================================
// 砂石运输调度系统 - 派车调度 API
// ==========================================
// 职责: 生命周期转换(派车/发车/送达/定稿)与方案批量落地
// 调用方: 调度台、司机端、外部规划方(AI 排车)
// ==========================================

use crate::api::error::ApiResult;
use crate::domain::delivery::Delivery;
use crate::domain::types::{LifecycleEvent, NotificationChannel};
use crate::engine::assignment::{AssignmentCommitter, AssignmentItem, AssignmentOutcome};
use crate::engine::lifecycle::{LifecycleEngine, SetTruckRequest};
use chrono::NaiveDate;
use std::sync::Arc;

/// 外部规划方的默认署名(记入状态历史)
pub const PLANNER_ACTOR: &str = "AI_PLANNER";

// ==========================================
// DispatchApi - 派车调度 API
// ==========================================
pub struct DispatchApi {
    lifecycle: Arc<LifecycleEngine>,
    committer: Arc<AssignmentCommitter>,
}

impl DispatchApi {
    pub fn new(lifecycle: Arc<LifecycleEngine>, committer: Arc<AssignmentCommitter>) -> Self {
        Self {
            lifecycle,
            committer,
        }
    }

    /// 派车/改派/撤销派车
    ///
    /// 冲突时上抛 SlotConflict 且不产生任何写入
    pub fn set_truck(
        &self,
        delivery_id: &str,
        req: &SetTruckRequest,
        actor: &str,
    ) -> ApiResult<Delivery> {
        Ok(self.lifecycle.set_truck(delivery_id, req, actor)?)
    }

    /// 司机发车
    pub fn mark_en_route(&self, delivery_id: &str, actor: &str) -> ApiResult<Delivery> {
        Ok(self.lifecycle.mark_en_route(delivery_id, actor)?)
    }

    /// 司机确认送达
    ///
    /// photo_url 为外部图片存储返回的地址;原始图片字节不经过本核心
    pub fn mark_delivered(
        &self,
        delivery_id: &str,
        photo_url: Option<String>,
        note: Option<String>,
        actor: &str,
    ) -> ApiResult<Delivery> {
        Ok(self
            .lifecycle
            .mark_delivered(delivery_id, photo_url, note, actor)?)
    }

    /// 批量套用外部规划方案(逐项隔离,单项失败不中断整批)
    pub fn apply_assignments(
        &self,
        date: NaiveDate,
        items: &[AssignmentItem],
        actor: Option<&str>,
    ) -> ApiResult<AssignmentOutcome> {
        Ok(self
            .committer
            .apply_assignments(date, items, actor.unwrap_or(PLANNER_ACTOR))?)
    }

    /// 当日排班定稿;返回待通知配送单集合,不自行发送通知
    pub fn finalize_schedule(&self, date: NaiveDate, actor: &str) -> ApiResult<Vec<Delivery>> {
        Ok(self.lifecycle.finalize_schedule(date, actor)?)
    }

    /// 通知方回写"渠道已受理"标志位(只置不清)
    pub fn mark_notified(
        &self,
        delivery_id: &str,
        event: LifecycleEvent,
        channel: NotificationChannel,
    ) -> ApiResult<Delivery> {
        Ok(self.lifecycle.mark_notified(delivery_id, event, channel)?)
    }
}
