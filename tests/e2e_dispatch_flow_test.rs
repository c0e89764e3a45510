// ==========================================
// 调度全流程 E2E 测试
// ==========================================
// 场景: 建店面订单 -> 外部方案批量派车 -> 人工改派 ->
//       排班定稿 -> 发车 -> 送达 -> 运力日历全程对账
// ==========================================


use haul_dispatch::api::NewDelivery;
use haul_dispatch::app::AppCollaborators;
use haul_dispatch::domain::types::{DayStatus, DeliverySource, DeliveryStatus};
use haul_dispatch::engine::{AssignmentItem, DispatchEvent, DispatchEventPublisher, SetTruckRequest};
use haul_dispatch::repository::DeliveryFilter;
use std::error::Error;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct CollectingPublisher {
    events: Mutex<Vec<DispatchEvent>>,
}

impl DispatchEventPublisher for CollectingPublisher {
    fn publish(&self, event: DispatchEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

#[test]
fn test_full_dispatch_day() {
    let (_tmp, db_path) = test_helpers::create_test_db().unwrap();
    let publisher = Arc::new(CollectingPublisher::default());
    let app = test_helpers::create_test_app_with(
        &db_path,
        AppCollaborators {
            event_publisher: Some(publisher.clone()),
            ..Default::default()
        },
    );
    let date = test_helpers::test_date();
    let at = |h: u32| date.and_hms_opt(h, 0, 0).unwrap();

    // ---- 建车队: 两辆自卸车 ----
    let t1 = app
        .fleet_api
        .register_truck("皖A-1001", "DUMP_24T", 24.0, None)
        .unwrap();
    let t2 = app
        .fleet_api
        .register_truck("皖A-1002", "DUMP_20T", 20.0, None)
        .unwrap();

    // ---- 进单: 两张店面订单 + 一张上门自提转配送 ----
    let mut o1 = test_helpers::new_delivery(date, 18.0);
    o1.hour_slot = Some(8);
    let o1 = app.delivery_api.create_delivery(&o1, "storefront").unwrap();

    let mut o2 = test_helpers::new_delivery(date, 12.0);
    o2.hour_slot = Some(8);
    let o2 = app.delivery_api.create_delivery(&o2, "storefront").unwrap();

    let o3 = app
        .delivery_api
        .create_delivery(
            &NewDelivery {
                source: DeliverySource::WalkIn,
                customer_name: Some("散客".to_string()),
                customer_phone: None,
                customer_email: None,
                address_line: Some("工地北门".to_string()),
                city: None,
                district: None,
                material_id: Some("MAT-GRAVEL".to_string()),
                material_name: Some("碎石05".to_string()),
                quantity_t: 6.0,
                delivery_date: date,
                time_window: None,
                hour_slot: Some(10),
                truck_id: None,
                stop_order: None,
            },
            "storefront",
        )
        .unwrap();

    // 进单后的运力日历: 36t 在册 / 44t 总量
    let day = &app
        .capacity_api
        .get_capacity_calendar_at(date, date, at(9))
        .unwrap()[0];
    assert_eq!(day.total_capacity_t, 44.0);
    assert_eq!(day.scheduled_t, 36.0);
    assert_eq!(day.delivery_count, 3);
    assert_eq!(day.status, DayStatus::Limited);

    // ---- 外部规划方案批量派车 ----
    let items = vec![
        AssignmentItem {
            delivery_id: o1.delivery_id.clone(),
            truck_id: Some(t1.truck_id.clone()),
            truck_number: None,
            driver_id: Some("DRV-1".to_string()),
            driver_name: Some("李师傅".to_string()),
            stop_order: Some(1),
            time_window: None,
            hour_slot: Some(8),
        },
        AssignmentItem {
            delivery_id: o2.delivery_id.clone(),
            truck_id: Some(t2.truck_id.clone()),
            truck_number: None,
            driver_id: Some("DRV-2".to_string()),
            driver_name: Some("周师傅".to_string()),
            stop_order: Some(1),
            time_window: None,
            hour_slot: Some(8),
        },
        AssignmentItem {
            delivery_id: o3.delivery_id.clone(),
            truck_id: Some(t1.truck_id.clone()),
            truck_number: None,
            driver_id: Some("DRV-1".to_string()),
            driver_name: Some("李师傅".to_string()),
            stop_order: Some(2),
            time_window: None,
            hour_slot: Some(10),
        },
    ];
    let outcome = app.dispatch_api.apply_assignments(date, &items, None).unwrap();
    assert_eq!(outcome.applied_count, 3);
    assert!(outcome.errors.is_empty());

    // 两辆车均已占用
    let day = &app
        .capacity_api
        .get_capacity_calendar_at(date, date, at(9))
        .unwrap()[0];
    assert_eq!(day.trucks_used, 2);

    // ---- 人工改派: o3 换到 2 号车 10 点段 ----
    let o3 = app
        .dispatch_api
        .set_truck(
            &o3.delivery_id,
            &SetTruckRequest {
                truck_id: Some(t2.truck_id.clone()),
                driver: None,
                time_window: None,
                hour_slot: Some(10),
                stop_order: Some(2),
                target_unassigned: false,
            },
            "dispatcher",
        )
        .unwrap();
    assert_eq!(o3.truck_number.as_deref(), Some("皖A-1002"));

    // ---- 排班定稿 ----
    let to_notify = app.dispatch_api.finalize_schedule(date, "dispatcher").unwrap();
    assert_eq!(to_notify.len(), 3);
    // 返回的单携带联系方式,供外部通知方使用
    assert!(to_notify
        .iter()
        .any(|d| d.customer_phone.as_deref() == Some("13900000001")));

    // ---- 发车与送达 ----
    app.dispatch_api.mark_en_route(&o1.delivery_id, "DRV-1").unwrap();
    app.dispatch_api
        .mark_delivered(
            &o1.delivery_id,
            Some("https://img.example/o1.jpg".to_string()),
            None,
            "DRV-1",
        )
        .unwrap();

    // o2 当天取消
    app.delivery_api
        .cancel_delivery(&o2.delivery_id, "客户改期", "dispatcher")
        .unwrap();

    // o3 跳过发车直接送达
    app.dispatch_api
        .mark_delivered(&o3.delivery_id, None, None, "DRV-2")
        .unwrap();

    // ---- 终态对账 ----
    let all = app
        .delivery_api
        .find_deliveries(&DeliveryFilter {
            date_from: Some(date),
            date_to: Some(date),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(all.len(), 3);
    let status_of = |id: &str| {
        all.iter()
            .find(|d| d.delivery_id == id)
            .map(|d| d.status)
            .unwrap()
    };
    assert_eq!(status_of(&o1.delivery_id), DeliveryStatus::Delivered);
    assert_eq!(status_of(&o2.delivery_id), DeliveryStatus::Cancelled);
    assert_eq!(status_of(&o3.delivery_id), DeliveryStatus::Delivered);

    // 取消单让出运力(36t -> 24t 在册)
    let day = &app
        .capacity_api
        .get_capacity_calendar_at(date, date, at(14))
        .unwrap()[0];
    assert_eq!(day.scheduled_t, 24.0);
    assert_eq!(day.delivery_count, 2);
    // 过截单时点,当日加单关闭
    assert!(!day.same_day_available);

    // ---- 事件流对账 ----
    let kinds: Vec<&'static str> = publisher
        .events
        .lock()
        .unwrap()
        .iter()
        .map(|e| e.kind())
        .collect();
    // 改派发一次 Scheduled,定稿一次,o1 在途+送达,o3 送达
    assert_eq!(
        kinds,
        vec![
            "Scheduled",
            "ScheduleFinalized",
            "EnRoute",
            "Delivered",
            "Delivered",
        ]
    );
    let events = publisher.events.lock().unwrap();
    match &events[1] {
        DispatchEvent::ScheduleFinalized { delivery_ids, .. } => {
            assert_eq!(delivery_ids.len(), 3)
        }
        other => panic!("预期 ScheduleFinalized 事件,实际: {}", other.kind()),
    }
}
