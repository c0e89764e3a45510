// ==========================================
// 运力聚合引擎集成测试
// ==========================================
// 测试目标: 日历逐日汇总、分级规则、休息日、
//           当日截单、守恒律与空车队退化
// ==========================================


use chrono::{NaiveDate, NaiveDateTime};
use haul_dispatch::api::ApiError;
use haul_dispatch::app::AppState;
use haul_dispatch::config::config_keys;
use haul_dispatch::domain::types::DayStatus;

fn at(date: NaiveDate, hour: u32) -> NaiveDateTime {
    date.and_hms_opt(hour, 0, 0).unwrap()
}

/// 注册三辆车: 24t + 24t + 20t = 68t,趟次上限 3*5=15
fn register_fleet(app: &AppState) {
    for (number, capacity) in [("A-01", 24.0), ("B-02", 24.0), ("C-03", 20.0)] {
        app.fleet_api
            .register_truck(number, "DUMP", capacity, None)
            .unwrap();
    }
}

#[test]
fn test_empty_day_fully_available() {
    let (_tmp, db_path) = test_helpers::create_test_db().unwrap();
    let app = test_helpers::create_test_app(&db_path);
    register_fleet(&app);
    let date = test_helpers::test_date();

    let calendar = app
        .capacity_api
        .get_capacity_calendar_at(date, date, at(date, 9))
        .unwrap();
    assert_eq!(calendar.len(), 1);
    let day = &calendar[0];

    assert_eq!(day.total_trucks, 3);
    assert_eq!(day.total_capacity_t, 68.0);
    assert_eq!(day.scheduled_t, 0.0);
    assert_eq!(day.available_t, 68.0);
    assert_eq!(day.delivery_count, 0);
    assert_eq!(day.trucks_used, 0);
    assert_eq!(day.max_deliveries, 15);
    assert_eq!(day.available_slots, 15);
    assert_eq!(day.status, DayStatus::Available);
    // 上午9点未过默认12点截单
    assert!(day.same_day_available);
}

#[test]
fn test_heavy_booking_drops_to_full() {
    let (_tmp, db_path) = test_helpers::create_test_db().unwrap();
    let app = test_helpers::create_test_app(&db_path);
    register_fleet(&app);
    let date = test_helpers::test_date();

    // 合计62t在册 -> 剩余6t,比例 6/68 ≈ 0.088 <= 0.10
    for quantity in [24.0, 24.0, 14.0] {
        app.delivery_api
            .create_delivery(&test_helpers::new_delivery(date, quantity), "tester")
            .unwrap();
    }

    let calendar = app
        .capacity_api
        .get_capacity_calendar_at(date, date, at(date, 9))
        .unwrap();
    let day = &calendar[0];

    assert_eq!(day.scheduled_t, 62.0);
    assert_eq!(day.available_t, 6.0);
    assert_eq!(day.delivery_count, 3);
    assert_eq!(day.available_slots, 12);
    assert_eq!(day.status, DayStatus::Full);
    // 剩余趟次>0 且未过截单: 当日加单仍开放
    assert!(day.same_day_available);
}

#[test]
fn test_limited_band_and_conservation_law() {
    let (_tmp, db_path) = test_helpers::create_test_db().unwrap();
    let app = test_helpers::create_test_app(&db_path);
    register_fleet(&app);
    let date = test_helpers::test_date();

    // 剩余 13.6t,比例 0.2 -> limited
    app.delivery_api
        .create_delivery(&test_helpers::new_delivery(date, 54.4), "tester")
        .unwrap();

    let calendar = app
        .capacity_api
        .get_capacity_calendar_at(date, date, at(date, 9))
        .unwrap();
    let day = &calendar[0];
    assert_eq!(day.status, DayStatus::Limited);
    // 守恒律: scheduled + available == total (未超排时)
    assert_eq!(day.scheduled_t + day.available_t, day.total_capacity_t);
}

#[test]
fn test_overbooked_day_clamps_to_zero() {
    let (_tmp, db_path) = test_helpers::create_test_db().unwrap();
    let app = test_helpers::create_test_app(&db_path);
    register_fleet(&app);
    let date = test_helpers::test_date();

    // 超排: 80t > 68t
    app.delivery_api
        .create_delivery(&test_helpers::new_delivery(date, 80.0), "tester")
        .unwrap();

    let calendar = app
        .capacity_api
        .get_capacity_calendar_at(date, date, at(date, 9))
        .unwrap();
    let day = &calendar[0];
    assert_eq!(day.available_t, 0.0);
    assert_eq!(day.status, DayStatus::Full);
}

#[test]
fn test_cancelled_deliveries_excluded() {
    let (_tmp, db_path) = test_helpers::create_test_db().unwrap();
    let app = test_helpers::create_test_app(&db_path);
    register_fleet(&app);
    let date = test_helpers::test_date();

    let d = app
        .delivery_api
        .create_delivery(&test_helpers::new_delivery(date, 50.0), "tester")
        .unwrap();
    app.delivery_api
        .cancel_delivery(&d.delivery_id, "客户取消", "tester")
        .unwrap();

    let calendar = app
        .capacity_api
        .get_capacity_calendar_at(date, date, at(date, 9))
        .unwrap();
    assert_eq!(calendar[0].scheduled_t, 0.0);
    assert_eq!(calendar[0].delivery_count, 0);
}

#[test]
fn test_closed_weekday_row() {
    let (_tmp, db_path) = test_helpers::create_test_db().unwrap();
    let app = test_helpers::create_test_app(&db_path);
    register_fleet(&app);

    // 2026-02-16 (周一) 至 2026-02-22 (周日),默认周日休息
    let from = NaiveDate::from_ymd_opt(2026, 2, 16).unwrap();
    let to = NaiveDate::from_ymd_opt(2026, 2, 22).unwrap();
    let sunday = to;

    // 休息日上已有在册单也不影响 closed 行的全零输出
    app.delivery_api
        .create_delivery(&test_helpers::new_delivery(sunday, 10.0), "tester")
        .unwrap();

    let calendar = app
        .capacity_api
        .get_capacity_calendar_at(from, to, at(from, 9))
        .unwrap();
    assert_eq!(calendar.len(), 7);
    let last = &calendar[6];
    assert_eq!(last.date, sunday);
    assert_eq!(last.status, DayStatus::Closed);
    assert_eq!(last.total_capacity_t, 0.0);
    assert_eq!(last.scheduled_t, 0.0);
    assert!(!last.same_day_available);
    // 其余六天正常计算
    assert_eq!(calendar[0].total_capacity_t, 68.0);
}

#[test]
fn test_closed_weekday_configurable() {
    let (_tmp, db_path) = test_helpers::create_test_db().unwrap();
    let app = test_helpers::create_test_app(&db_path);
    register_fleet(&app);

    // 改休息日为周三
    app.config
        .set_config_value(config_keys::CLOSED_WEEKDAY, "Wed")
        .unwrap();

    let wednesday = test_helpers::test_date();
    let calendar = app
        .capacity_api
        .get_capacity_calendar_at(wednesday, wednesday, at(wednesday, 9))
        .unwrap();
    assert_eq!(calendar[0].status, DayStatus::Closed);
}

#[test]
fn test_same_day_cutoff() {
    let (_tmp, db_path) = test_helpers::create_test_db().unwrap();
    let app = test_helpers::create_test_app(&db_path);
    register_fleet(&app);
    let date = test_helpers::test_date();

    // 12:00 整点已到截单时点
    let calendar = app
        .capacity_api
        .get_capacity_calendar_at(date, date, at(date, 12))
        .unwrap();
    assert!(!calendar[0].same_day_available);

    // 非当天(明天视角回看)同样关闭
    let tomorrow = date.succ_opt().unwrap();
    let calendar = app
        .capacity_api
        .get_capacity_calendar_at(date, date, at(tomorrow, 9))
        .unwrap();
    assert!(!calendar[0].same_day_available);

    // 未来日期即便未过截单时点也不算"当日"
    let calendar = app
        .capacity_api
        .get_capacity_calendar_at(tomorrow, tomorrow, at(date, 9))
        .unwrap();
    assert!(!calendar[0].same_day_available);
}

#[test]
fn test_zero_fleet_degenerates() {
    let (_tmp, db_path) = test_helpers::create_test_db().unwrap();
    let app = test_helpers::create_test_app(&db_path);
    let date = test_helpers::test_date();

    let calendar = app
        .capacity_api
        .get_capacity_calendar_at(date, date, at(date, 9))
        .unwrap();
    let day = &calendar[0];
    // 总运力为0: 比例按0处理 -> full,无趟次
    assert_eq!(day.total_capacity_t, 0.0);
    assert_eq!(day.status, DayStatus::Full);
    assert_eq!(day.available_slots, 0);
    assert!(!day.same_day_available);
}

#[test]
fn test_deactivated_truck_leaves_fleet_keeps_usage() {
    let (_tmp, db_path) = test_helpers::create_test_db().unwrap();
    let app = test_helpers::create_test_app(&db_path);
    register_fleet(&app);
    let date = test_helpers::test_date();

    app.delivery_api
        .create_delivery(&test_helpers::new_delivery(date, 30.0), "tester")
        .unwrap();

    let truck = app.fleet_api.list_active_trucks().unwrap()[0].clone();
    app.fleet_api.deactivate_truck(&truck.truck_id).unwrap();

    let calendar = app
        .capacity_api
        .get_capacity_calendar_at(date, date, at(date, 9))
        .unwrap();
    let day = &calendar[0];
    // 车队侧即时缩水,排期侧保持不变
    assert_eq!(day.total_trucks, 2);
    assert_eq!(day.scheduled_t, 30.0);
}

#[test]
fn test_invalid_range_rejected() {
    let (_tmp, db_path) = test_helpers::create_test_db().unwrap();
    let app = test_helpers::create_test_app(&db_path);
    let date = test_helpers::test_date();

    let err = app
        .capacity_api
        .get_capacity_calendar_at(date, date.pred_opt().unwrap(), at(date, 9))
        .unwrap_err();
    assert!(matches!(err, ApiError::ValidationError(_)));
}
