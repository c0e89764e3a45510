// ==========================================
// 砂石运输调度系统 - 运力日历领域模型
// ==========================================
// 用途: Capacity Aggregator 的输出行,按日展示车队运力
// 说明: 吨位字段输出时四舍五入到一位小数,中间计算保留全精度
// ==========================================

use crate::domain::types::DayStatus;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// DayCapacity - 单日运力汇总
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayCapacity {
    pub date: NaiveDate,
    pub status: DayStatus,

    // ===== 车队侧 =====
    pub total_trucks: i64,      // 活跃车辆数
    pub total_capacity_t: f64,  // 活跃车辆载重合计 (吨)

    // ===== 排期侧 (非取消配送单) =====
    pub scheduled_t: f64,       // 已排吨位
    pub available_t: f64,       // 剩余吨位 = max(0, total - scheduled)
    pub trucks_used: i64,       // 已占用车辆数 (去重 truck_id)
    pub delivery_count: i64,    // 配送单数

    // ===== 趟次侧 =====
    pub max_deliveries: i64,    // 趟次上限 = total_trucks * K
    pub available_slots: i64,   // 剩余趟次 = max(0, max_deliveries - count)

    // ===== 当日加单 =====
    pub same_day_available: bool, // 当天且未过截单时点且有剩余趟次
}

impl DayCapacity {
    /// 休息日条目: 运力字段全部置零
    pub fn closed(date: NaiveDate) -> Self {
        Self {
            date,
            status: DayStatus::Closed,
            total_trucks: 0,
            total_capacity_t: 0.0,
            scheduled_t: 0.0,
            available_t: 0.0,
            trucks_used: 0,
            delivery_count: 0,
            max_deliveries: 0,
            available_slots: 0,
            same_day_available: false,
        }
    }
}
