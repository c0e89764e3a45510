// ==========================================
// 砂石运输调度系统 - 运力日历 API
// ==========================================
// 职责: 对外暴露按日运力汇总(只读,展示用)
// ==========================================

use crate::api::error::ApiResult;
use crate::domain::capacity::DayCapacity;
use crate::engine::capacity::CapacityAggregator;
use chrono::{NaiveDate, NaiveDateTime};
use std::sync::Arc;

// ==========================================
// CapacityApi - 运力日历 API
// ==========================================
pub struct CapacityApi {
    aggregator: Arc<CapacityAggregator>,
}

impl CapacityApi {
    pub fn new(aggregator: Arc<CapacityAggregator>) -> Self {
        Self { aggregator }
    }

    /// 查询运力日历([from, to] 闭区间逐日一行)
    pub fn get_capacity_calendar(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ApiResult<Vec<DayCapacity>> {
        Ok(self.aggregator.compute_calendar(from, to)?)
    }

    /// 查询运力日历(显式传入"现在",供测试与跨时区调用方)
    pub fn get_capacity_calendar_at(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        now: NaiveDateTime,
    ) -> ApiResult<Vec<DayCapacity>> {
        Ok(self.aggregator.compute_calendar_at(from, to, now)?)
    }
}
