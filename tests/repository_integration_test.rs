// ==========================================
// Repository 层集成测试
// ==========================================
// 测试目标: 车辆/配送单仓储的CRUD、组合过滤、排序
//           与 JSON 列(历史/通知标志)持久化
// ==========================================


use chrono::{NaiveDate, NaiveDateTime};
use haul_dispatch::db;
use haul_dispatch::domain::delivery::Delivery;
use haul_dispatch::domain::truck::{DriverRef, Truck};
use haul_dispatch::domain::types::{DeliverySource, DeliveryStatus};
use haul_dispatch::repository::{DeliveryFilter, DeliveryRepository, TruckRepository};
use std::sync::{Arc, Mutex};

fn ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn setup() -> (tempfile::NamedTempFile, Arc<Mutex<rusqlite::Connection>>) {
    let (temp_file, db_path) = test_helpers::create_test_db().unwrap();
    let conn = db::open_shared_connection(&db_path).unwrap();
    db::init_schema(&conn.lock().unwrap()).unwrap();
    (temp_file, conn)
}

fn mk_truck(id: &str, number: &str, capacity_t: f64) -> Truck {
    Truck {
        truck_id: id.to_string(),
        truck_number: number.to_string(),
        truck_type: "DUMP_10T".to_string(),
        capacity_t,
        is_active: true,
        default_driver: Some(DriverRef {
            driver_id: format!("DRV-{}", id),
            driver_name: "李师傅".to_string(),
            driver_phone: Some("13800000000".to_string()),
        }),
        created_at: ts("2026-02-01 08:00:00"),
        updated_at: ts("2026-02-01 08:00:00"),
    }
}

fn mk_delivery(id: &str, d: &str, status: DeliveryStatus) -> Delivery {
    let mut delivery = Delivery {
        delivery_id: id.to_string(),
        source: DeliverySource::StorefrontOrder,
        customer_name: Some("王老板".to_string()),
        customer_phone: None,
        customer_email: None,
        address_line: None,
        city: None,
        district: None,
        material_id: Some("MAT-GRAVEL".to_string()),
        material_name: Some("碎石05".to_string()),
        quantity_t: 10.0,
        delivery_date: date(d),
        time_window: None,
        hour_slot: None,
        truck_id: None,
        truck_number: None,
        driver_id: None,
        driver_name: None,
        stop_order: None,
        status,
        scheduled_at: None,
        en_route_at: None,
        delivered_at: None,
        cancelled_at: None,
        photo_url: None,
        inventory_depleted: false,
        schedule_confirmed: false,
        notifications: Default::default(),
        status_history: Vec::new(),
        created_at: ts("2026-02-01 08:00:00"),
        updated_at: ts("2026-02-01 08:00:00"),
    };
    delivery.push_history(status, ts("2026-02-01 08:00:00"), "tester", None);
    delivery
}

// ==========================================
// 车辆仓储
// ==========================================

#[test]
fn test_truck_insert_and_find() {
    let (_tmp, conn) = setup();
    let repo = TruckRepository::from_connection(conn);

    let truck = mk_truck("T1", "皖A-1001", 24.0);
    repo.insert(&truck).unwrap();

    let found = repo.find_by_id("T1").unwrap().unwrap();
    assert_eq!(found.truck_number, "皖A-1001");
    assert_eq!(found.capacity_t, 24.0);
    assert!(found.is_active);
    let driver = found.default_driver.unwrap();
    assert_eq!(driver.driver_name, "李师傅");

    assert!(repo.find_by_id("NOPE").unwrap().is_none());
}

#[test]
fn test_truck_active_number_lookup_case_insensitive() {
    let (_tmp, conn) = setup();
    let repo = TruckRepository::from_connection(conn);

    repo.insert(&mk_truck("T1", "A-01", 10.0)).unwrap();

    assert!(repo.find_active_by_number(" a-01 ").unwrap().is_some());
    repo.deactivate("T1", ts("2026-02-02 08:00:00")).unwrap();
    // 停用后不再命中活跃查询
    assert!(repo.find_active_by_number("A-01").unwrap().is_none());
    // 但记录仍然存在(软停用)
    let t = repo.find_by_id("T1").unwrap().unwrap();
    assert!(!t.is_active);
}

#[test]
fn test_truck_list_active_sorted_by_number() {
    let (_tmp, conn) = setup();
    let repo = TruckRepository::from_connection(conn);

    repo.insert(&mk_truck("T1", "C-03", 10.0)).unwrap();
    repo.insert(&mk_truck("T2", "a-01", 10.0)).unwrap();
    repo.insert(&mk_truck("T3", "B-02", 10.0)).unwrap();
    repo.deactivate("T1", ts("2026-02-02 08:00:00")).unwrap();

    let active = repo.list_active().unwrap();
    let numbers: Vec<&str> = active.iter().map(|t| t.truck_number.as_str()).collect();
    assert_eq!(numbers, vec!["a-01", "B-02"]);
}

// ==========================================
// 配送单仓储
// ==========================================

#[test]
fn test_delivery_roundtrip_with_history_json() {
    let (_tmp, conn) = setup();
    let repo = DeliveryRepository::from_connection(conn);

    let mut delivery = mk_delivery("D1", "2026-02-18", DeliveryStatus::Unassigned);
    delivery.time_window = Some("08:00-10:00".to_string());
    delivery.push_history(
        DeliveryStatus::Scheduled,
        ts("2026-02-02 09:00:00"),
        "dispatcher",
        Some("派车: A-01".to_string()),
    );
    repo.insert(&delivery).unwrap();

    let found = repo.find_by_id("D1").unwrap().unwrap();
    assert_eq!(found.status, DeliveryStatus::Scheduled);
    assert_eq!(found.status_history.len(), 2);
    assert_eq!(found.last_history_status(), Some(DeliveryStatus::Scheduled));
    assert_eq!(found.status_history[1].note.as_deref(), Some("派车: A-01"));
    // 不变量: status == 历史末项状态
    assert_eq!(found.status, found.last_history_status().unwrap());
}

#[test]
fn test_delivery_filter_semantics() {
    let (_tmp, conn) = setup();
    let repo = DeliveryRepository::from_connection(conn);

    let mut d1 = mk_delivery("D1", "2026-02-18", DeliveryStatus::Scheduled);
    d1.truck_id = Some("T1".to_string());
    repo.insert(&d1).unwrap();

    let mut d2 = mk_delivery("D2", "2026-02-18", DeliveryStatus::Cancelled);
    d2.truck_id = Some("T1".to_string());
    repo.insert(&d2).unwrap();

    let d3 = mk_delivery("D3", "2026-02-19", DeliveryStatus::Unassigned);
    repo.insert(&d3).unwrap();

    // 日期 AND 车辆
    let filter = DeliveryFilter {
        date_from: Some(date("2026-02-18")),
        date_to: Some(date("2026-02-18")),
        truck_id: Some("T1".to_string()),
        ..Default::default()
    };
    assert_eq!(repo.find(&filter).unwrap().len(), 2);

    // 状态集合内部 OR
    let filter = DeliveryFilter {
        statuses: Some(vec![DeliveryStatus::Scheduled, DeliveryStatus::Unassigned]),
        ..Default::default()
    };
    let found = repo.find(&filter).unwrap();
    let ids: Vec<&str> = found.iter().map(|d| d.delivery_id.as_str()).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&"D1"));
    assert!(ids.contains(&"D3"));

    // 来源过滤
    let filter = DeliveryFilter {
        source: Some(DeliverySource::Wholesale),
        ..Default::default()
    };
    assert!(repo.find(&filter).unwrap().is_empty());
}

#[test]
fn test_delivery_ordering_date_slot_stop_order() {
    let (_tmp, conn) = setup();
    let repo = DeliveryRepository::from_connection(conn);

    let mut a = mk_delivery("A", "2026-02-19", DeliveryStatus::Unassigned);
    a.hour_slot = Some(8);
    repo.insert(&a).unwrap();

    let mut b = mk_delivery("B", "2026-02-18", DeliveryStatus::Unassigned);
    b.time_window = Some("14:00-16:00".to_string());
    repo.insert(&b).unwrap();

    let mut c = mk_delivery("C", "2026-02-18", DeliveryStatus::Unassigned);
    c.time_window = Some("08:00-10:00".to_string());
    c.stop_order = Some(2);
    repo.insert(&c).unwrap();

    let mut d = mk_delivery("D", "2026-02-18", DeliveryStatus::Unassigned);
    d.time_window = Some("08:00-10:00".to_string());
    d.stop_order = Some(1);
    repo.insert(&d).unwrap();

    let found = repo.find(&DeliveryFilter::default()).unwrap();
    let ids: Vec<&str> = found.iter().map(|x| x.delivery_id.as_str()).collect();
    // 日期优先,同日按时段,同时段按装车顺序
    assert_eq!(ids, vec!["D", "C", "B", "A"]);
}

#[test]
fn test_slot_booking_detection() {
    let (_tmp, conn) = setup();
    let repo = DeliveryRepository::from_connection(conn);

    let mut d1 = mk_delivery("D1", "2026-02-18", DeliveryStatus::Scheduled);
    d1.truck_id = Some("T1".to_string());
    d1.hour_slot = Some(8);
    repo.insert(&d1).unwrap();

    let d = date("2026-02-18");
    assert!(repo.exists_slot_booking("T1", d, "08", None).unwrap());
    assert!(!repo.exists_slot_booking("T1", d, "09", None).unwrap());
    assert!(!repo.exists_slot_booking("T2", d, "08", None).unwrap());
    // 排除自身
    assert!(!repo.exists_slot_booking("T1", d, "08", Some("D1")).unwrap());
}

#[test]
fn test_daily_usage_excludes_cancelled() {
    let (_tmp, conn) = setup();
    let repo = DeliveryRepository::from_connection(conn);

    let mut d1 = mk_delivery("D1", "2026-02-18", DeliveryStatus::Scheduled);
    d1.truck_id = Some("T1".to_string());
    d1.quantity_t = 24.0;
    repo.insert(&d1).unwrap();

    let mut d2 = mk_delivery("D2", "2026-02-18", DeliveryStatus::Delivered);
    d2.truck_id = Some("T1".to_string());
    d2.hour_slot = Some(14);
    d2.quantity_t = 10.0;
    repo.insert(&d2).unwrap();

    let mut d3 = mk_delivery("D3", "2026-02-18", DeliveryStatus::Cancelled);
    d3.quantity_t = 99.0;
    repo.insert(&d3).unwrap();

    let usage = repo
        .daily_usage(date("2026-02-18"), date("2026-02-18"))
        .unwrap();
    assert_eq!(usage.len(), 1);
    let row = &usage[0];
    assert_eq!(row.scheduled_t, 34.0);
    assert_eq!(row.delivery_count, 2);
    // 同一车辆去重
    assert_eq!(row.trucks_used, 1);
}
