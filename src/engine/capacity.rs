// ==========================================
// 砂石运输调度系统 - 运力聚合引擎
// ==========================================
// 职责: 按日汇总车队运力与排期占用,输出运力日历
// 输入: 活跃车辆 + 日期范围内非取消配送单聚合
// 输出: DayCapacity 列表,[from, to] 闭区间逐日一行
// 只读引擎,不产生任何写入
// ==========================================

use crate::config::DispatchConfigManager;
use crate::domain::capacity::DayCapacity;
use crate::domain::types::DayStatus;
use crate::repository::delivery_repo::{DailyUsageRow, DeliveryRepository};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::truck_repo::TruckRepository;
use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, Timelike};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;

/// 吨位输出精度: 一位小数
///
/// 中间求和保留全精度,只在出参处四舍五入
fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

// ==========================================
// CapacityAggregator - 运力聚合引擎
// ==========================================
pub struct CapacityAggregator {
    truck_repo: Arc<TruckRepository>,
    delivery_repo: Arc<DeliveryRepository>,
    config: Arc<DispatchConfigManager>,
}

impl CapacityAggregator {
    pub fn new(
        truck_repo: Arc<TruckRepository>,
        delivery_repo: Arc<DeliveryRepository>,
        config: Arc<DispatchConfigManager>,
    ) -> Self {
        Self {
            truck_repo,
            delivery_repo,
            config,
        }
    }

    /// 计算运力日历(以调用方本地时间为"现在")
    pub fn compute_calendar(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RepositoryResult<Vec<DayCapacity>> {
        self.compute_calendar_at(from, to, Local::now().naive_local())
    }

    /// 计算运力日历(显式传入"现在",便于测试与跨时区调用方)
    ///
    /// 分级规则: r = available_t / total_capacity_t (总运力为0时 r=0)
    ///   r > 0.30 -> available; 0.10 < r <= 0.30 -> limited; 其余 -> full
    /// 休息日输出 closed 行,不做其余计算
    #[instrument(skip(self), fields(from = %from, to = %to))]
    pub fn compute_calendar_at(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        now: NaiveDateTime,
    ) -> RepositoryResult<Vec<DayCapacity>> {
        if from > to {
            return Err(RepositoryError::ValidationError(format!(
                "日期范围非法: from={} 晚于 to={}",
                from, to
            )));
        }

        let closed_weekday = self.config.closed_weekday()?;
        let deliveries_per_truck = self.config.deliveries_per_truck()?;
        let cutoff_hour = self.config.same_day_cutoff_hour()?;

        // 车队侧: 活跃车辆与载重合计(整个范围内视为恒定)
        let active_trucks = self.truck_repo.list_active()?;
        let total_trucks = active_trucks.len() as i64;
        let total_capacity_t: f64 = active_trucks.iter().map(|t| t.capacity_t).sum();
        let max_deliveries = total_trucks * deliveries_per_truck;

        // 排期侧: 一次 SQL 聚合,按日取用
        let usage: HashMap<NaiveDate, DailyUsageRow> = self
            .delivery_repo
            .daily_usage(from, to)?
            .into_iter()
            .map(|row| (row.date, row))
            .collect();

        let today = now.date();
        let mut calendar = Vec::new();
        let mut date = from;
        while date <= to {
            if date.weekday() == closed_weekday {
                calendar.push(DayCapacity::closed(date));
                date += Duration::days(1);
                continue;
            }

            let (scheduled_t, delivery_count, trucks_used) = match usage.get(&date) {
                Some(row) => (row.scheduled_t, row.delivery_count, row.trucks_used),
                None => (0.0, 0, 0),
            };

            let available_t = (total_capacity_t - scheduled_t).max(0.0);
            let available_slots = (max_deliveries - delivery_count).max(0);

            let ratio = if total_capacity_t > 0.0 {
                available_t / total_capacity_t
            } else {
                0.0
            };
            let status = if ratio > 0.30 {
                DayStatus::Available
            } else if ratio > 0.10 {
                DayStatus::Limited
            } else {
                DayStatus::Full
            };

            // 当日加单: 仅限今天、未过截单时点、仍有剩余趟次
            let same_day_available =
                date == today && now.hour() < cutoff_hour && available_slots > 0;

            calendar.push(DayCapacity {
                date,
                status,
                total_trucks,
                total_capacity_t: round1(total_capacity_t),
                scheduled_t: round1(scheduled_t),
                available_t: round1(available_t),
                trucks_used,
                delivery_count,
                max_deliveries,
                available_slots,
                same_day_available,
            });

            date += Duration::days(1);
        }

        tracing::debug!("运力日历计算完成: {} 天", calendar.len());
        Ok(calendar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round1() {
        assert_eq!(round1(67.96), 68.0);
        assert_eq!(round1(6.04), 6.0);
        assert_eq!(round1(12.0), 12.0);
    }
}
