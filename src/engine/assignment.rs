// ==========================================
// 砂石运输调度系统 - 派车方案落地引擎
// ==========================================
// 职责: 将外部规划方(如 AI 排车建议)产出的派车方案批量
//       套用到配送单,逐单置 SCHEDULED
// 红线: 逐项隔离——单项失败记入 per-item 错误,绝不中断整批,
//       避免一个坏ID废掉整份方案
// 说明: 本引擎不做运力可行性校验,信任调用方方案,
//       仅拒绝物理上不可能的引用(未知配送单ID);
//       各项之间无顺序依赖,施加顺序不影响结果
// ==========================================

use crate::domain::delivery::{is_valid_hour_slot, Delivery};
use crate::domain::types::DeliveryStatus;
use crate::repository::delivery_repo::DeliveryRepository;
use crate::repository::error::RepositoryResult;
use crate::repository::truck_repo::TruckRepository;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

// ==========================================
// AssignmentItem - 单项派车建议
// ==========================================
// 外部规划方产出,视为未受信数据,与人工提交同等校验
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentItem {
    pub delivery_id: String,
    pub truck_id: Option<String>,
    pub truck_number: Option<String>,
    pub driver_id: Option<String>,
    pub driver_name: Option<String>,
    pub stop_order: Option<i64>,
    pub time_window: Option<String>,
    pub hour_slot: Option<i64>,
}

// ==========================================
// AssignmentOutcome - 批量落地结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentOutcome {
    pub applied_count: usize,
    pub total_count: usize,
    pub errors: Vec<AssignmentItemError>,
}

/// 单项失败记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentItemError {
    pub delivery_id: String,
    pub message: String,
}

// ==========================================
// AssignmentCommitter - 方案落地引擎
// ==========================================
pub struct AssignmentCommitter {
    delivery_repo: Arc<DeliveryRepository>,
    truck_repo: Arc<TruckRepository>,
}

impl AssignmentCommitter {
    pub fn new(delivery_repo: Arc<DeliveryRepository>, truck_repo: Arc<TruckRepository>) -> Self {
        Self {
            delivery_repo,
            truck_repo,
        }
    }

    /// 批量套用派车方案
    ///
    /// # 参数
    /// - date: 方案对应的配送日期
    /// - items: 派车建议列表
    /// - actor: 记入历史的规划来源(如 "AI_PLANNER")
    ///
    /// # 返回
    /// 成功数/总数/逐项错误;任何单项失败都不影响其余项
    #[instrument(skip(self, items), fields(date = %date, total = items.len()))]
    pub fn apply_assignments(
        &self,
        date: NaiveDate,
        items: &[AssignmentItem],
        actor: &str,
    ) -> RepositoryResult<AssignmentOutcome> {
        let mut outcome = AssignmentOutcome {
            applied_count: 0,
            total_count: items.len(),
            errors: Vec::new(),
        };

        for item in items {
            match self.apply_one(date, item, actor) {
                Ok(()) => outcome.applied_count += 1,
                Err(message) => {
                    tracing::warn!(
                        "派车方案单项失败: delivery_id={}, error={}",
                        item.delivery_id,
                        message
                    );
                    outcome.errors.push(AssignmentItemError {
                        delivery_id: item.delivery_id.clone(),
                        message,
                    });
                }
            }
        }

        tracing::info!(
            "派车方案落地完成: date={}, applied={}/{}",
            date,
            outcome.applied_count,
            outcome.total_count
        );
        Ok(outcome)
    }

    /// 套用单项;错误以字符串返回,由上层记入 per-item 错误列表
    fn apply_one(&self, date: NaiveDate, item: &AssignmentItem, actor: &str) -> Result<(), String> {
        let mut delivery = self
            .delivery_repo
            .find_by_id(&item.delivery_id)
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("配送单不存在: {}", item.delivery_id))?;

        // 终态单不可改派
        if delivery.status.is_terminal() {
            return Err(format!(
                "配送单已处于终态 {},不可套用方案",
                delivery.status
            ));
        }

        if let Some(h) = item.hour_slot {
            if !is_valid_hour_slot(h) {
                return Err(format!("小时位越界(0-23): {}", h));
            }
        }

        self.fill_assignment(&mut delivery, date, item);

        let now = Local::now().naive_local();
        delivery.scheduled_at = Some(now);
        delivery.updated_at = now;
        delivery.push_history(
            DeliveryStatus::Scheduled,
            now,
            actor,
            Some(format!(
                "方案派车: {}",
                delivery.truck_number.clone().unwrap_or_default()
            )),
        );

        self.delivery_repo.update(&delivery).map_err(|e| e.to_string())
    }

    /// 写入派车字段;truck_number 缺省时向车队登记处做尽力补齐
    fn fill_assignment(&self, delivery: &mut Delivery, date: NaiveDate, item: &AssignmentItem) {
        delivery.delivery_date = date;
        if let Some(truck_id) = &item.truck_id {
            delivery.truck_id = Some(truck_id.clone());
            delivery.truck_number = item.truck_number.clone().or_else(|| {
                self.truck_repo
                    .find_by_id(truck_id)
                    .ok()
                    .flatten()
                    .map(|t| t.truck_number)
            });
        } else if item.truck_number.is_some() {
            delivery.truck_number = item.truck_number.clone();
        }
        if item.driver_id.is_some() {
            delivery.driver_id = item.driver_id.clone();
        }
        if item.driver_name.is_some() {
            delivery.driver_name = item.driver_name.clone();
        }
        if item.stop_order.is_some() {
            delivery.stop_order = item.stop_order;
        }
        if item.time_window.is_some() {
            delivery.time_window = item.time_window.clone();
        }
        if item.hour_slot.is_some() {
            delivery.hour_slot = item.hour_slot;
        }
    }
}
