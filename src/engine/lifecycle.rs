// ==========================================
// 砂石运输调度系统 - 配送生命周期引擎
// ==========================================
// 状态机:
//   UNASSIGNED --(派车)--> SCHEDULED
//   SCHEDULED  --(发车)--> EN_ROUTE
//   EN_ROUTE   --(确认送达+凭证)--> DELIVERED
//   {UNASSIGNED, SCHEDULED, EN_ROUTE} --(取消)--> CANCELLED
//   SCHEDULED  --(撤销派车)--> UNASSIGNED
// 终态: DELIVERED / CANCELLED,终态上的任何转换失败,
//       取消除外(幂等空操作)
// 红线: 依赖故障(通知/ETA/库存)不得回滚已完成的状态转换
// ==========================================

use crate::config::DispatchConfigManager;
use crate::domain::delivery::{is_valid_hour_slot, Delivery};
use crate::domain::truck::DriverRef;
use crate::domain::types::{DeliveryStatus, LifecycleEvent, NotificationChannel};
use crate::engine::collaborators::{EtaProvider, InventoryStore};
use crate::engine::conflict::{DeliverySlot, SlotConflictChecker};
use crate::engine::events::{DispatchEvent, OptionalEventPublisher};
use crate::repository::delivery_repo::{DeliveryFilter, DeliveryRepository};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::truck_repo::TruckRepository;
use chrono::{Local, NaiveDate, NaiveDateTime};
use std::sync::Arc;

// ==========================================
// SetTruckRequest - 派车/撤销派车请求
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct SetTruckRequest {
    /// 拟派车辆;target_unassigned=false 时必填
    pub truck_id: Option<String>,
    /// 司机覆写;缺省时取车辆默认司机
    pub driver: Option<DriverRef>,
    /// 时间窗覆写;缺省时沿用配送单现值
    pub time_window: Option<String>,
    /// 小时位覆写
    pub hour_slot: Option<i64>,
    /// 装车顺序
    pub stop_order: Option<i64>,
    /// 显式要求撤销派车(SCHEDULED -> UNASSIGNED)
    pub target_unassigned: bool,
}

// ==========================================
// LifecycleEngine - 生命周期引擎
// ==========================================
pub struct LifecycleEngine {
    delivery_repo: Arc<DeliveryRepository>,
    truck_repo: Arc<TruckRepository>,
    conflict_checker: SlotConflictChecker,
    config: Arc<DispatchConfigManager>,
    event_publisher: OptionalEventPublisher,
    inventory: Option<Arc<dyn InventoryStore>>,
    eta_provider: Option<Arc<dyn EtaProvider>>,
}

impl LifecycleEngine {
    pub fn new(
        delivery_repo: Arc<DeliveryRepository>,
        truck_repo: Arc<TruckRepository>,
        config: Arc<DispatchConfigManager>,
        event_publisher: OptionalEventPublisher,
        inventory: Option<Arc<dyn InventoryStore>>,
        eta_provider: Option<Arc<dyn EtaProvider>>,
    ) -> Self {
        let conflict_checker = SlotConflictChecker::new(delivery_repo.clone());
        Self {
            delivery_repo,
            truck_repo,
            conflict_checker,
            config,
            event_publisher,
            inventory,
            eta_provider,
        }
    }

    fn now() -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn load(&self, delivery_id: &str) -> RepositoryResult<Delivery> {
        self.delivery_repo
            .find_by_id(delivery_id)?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "Delivery".to_string(),
                id: delivery_id.to_string(),
            })
    }

    // ==========================================
    // 派车 / 撤销派车
    // ==========================================

    /// 派车或改派
    ///
    /// 先经时段冲突检查,冲突即拒绝且不产生任何写入;
    /// 成功后写入车辆/司机快照字段,置 SCHEDULED 并记 scheduled_at
    /// (除非显式要求 UNASSIGNED),追加历史条目
    pub fn set_truck(
        &self,
        delivery_id: &str,
        req: &SetTruckRequest,
        actor: &str,
    ) -> RepositoryResult<Delivery> {
        let mut delivery = self.load(delivery_id)?;

        if req.target_unassigned {
            return self.unassign(delivery, actor);
        }

        let truck_id = req.truck_id.as_deref().ok_or_else(|| {
            RepositoryError::ValidationError("派车请求缺少 truck_id".to_string())
        })?;

        if let Some(h) = req.hour_slot {
            if !is_valid_hour_slot(h) {
                return Err(RepositoryError::ValidationError(format!(
                    "小时位越界(0-23): {}",
                    h
                )));
            }
        }

        // 仅允许从 UNASSIGNED / SCHEDULED 进入派车
        if !matches!(
            delivery.status,
            DeliveryStatus::Unassigned | DeliveryStatus::Scheduled
        ) {
            return Err(RepositoryError::InvalidStateTransition {
                from: delivery.status.to_string(),
                to: DeliveryStatus::Scheduled.to_string(),
            });
        }

        // 车辆必须存在且活跃
        let truck = self
            .truck_repo
            .find_by_id(truck_id)?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "Truck".to_string(),
                id: truck_id.to_string(),
            })?;
        if !truck.is_active {
            return Err(RepositoryError::BusinessRuleViolation(format!(
                "车辆已停用,不可派车: {}",
                truck.truck_number
            )));
        }

        // 冲突检查使用覆写后的生效时段
        let slot = DeliverySlot {
            time_window: req
                .time_window
                .clone()
                .or_else(|| delivery.time_window.clone()),
            hour_slot: req.hour_slot.or(delivery.hour_slot),
        };
        if self.conflict_checker.check_conflict(
            truck_id,
            delivery.delivery_date,
            &slot,
            Some(delivery_id),
        )? {
            return Err(RepositoryError::BusinessRuleViolation(format!(
                "时段冲突: truck={}, date={}, slot={}",
                truck.truck_number,
                delivery.delivery_date,
                slot.key().unwrap_or_default()
            )));
        }

        let now = Self::now();
        let driver = req.driver.clone().or_else(|| truck.default_driver.clone());

        delivery.truck_id = Some(truck.truck_id.clone());
        delivery.truck_number = Some(truck.truck_number.clone());
        delivery.driver_id = driver.as_ref().map(|d| d.driver_id.clone());
        delivery.driver_name = driver.as_ref().map(|d| d.driver_name.clone());
        if let Some(w) = &req.time_window {
            delivery.time_window = Some(w.clone());
        }
        if let Some(h) = req.hour_slot {
            delivery.hour_slot = Some(h);
        }
        if let Some(o) = req.stop_order {
            delivery.stop_order = Some(o);
        }
        delivery.scheduled_at = Some(now);
        delivery.updated_at = now;
        delivery.push_history(
            DeliveryStatus::Scheduled,
            now,
            actor,
            Some(format!("派车: {}", truck.truck_number)),
        );

        self.delivery_repo.update(&delivery)?;
        tracing::info!(
            "派车完成: delivery_id={}, truck={}",
            delivery.delivery_id,
            truck.truck_number
        );

        self.event_publisher.publish_lossy(DispatchEvent::Scheduled {
            delivery_id: delivery.delivery_id.clone(),
            truck_id: delivery.truck_id.clone(),
            delivery_date: delivery.delivery_date,
        });

        Ok(delivery)
    }

    /// 撤销派车(SCHEDULED -> UNASSIGNED,允许重新排班的回退路径)
    fn unassign(&self, mut delivery: Delivery, actor: &str) -> RepositoryResult<Delivery> {
        match delivery.status {
            // 本就未派车: 幂等返回
            DeliveryStatus::Unassigned => return Ok(delivery),
            DeliveryStatus::Scheduled => {}
            other => {
                return Err(RepositoryError::InvalidStateTransition {
                    from: other.to_string(),
                    to: DeliveryStatus::Unassigned.to_string(),
                });
            }
        }

        let now = Self::now();
        let prev_truck = delivery.truck_number.take();
        delivery.truck_id = None;
        delivery.driver_id = None;
        delivery.driver_name = None;
        delivery.stop_order = None;
        delivery.updated_at = now;
        delivery.push_history(
            DeliveryStatus::Unassigned,
            now,
            actor,
            prev_truck.map(|n| format!("撤销派车: {}", n)),
        );

        self.delivery_repo.update(&delivery)?;
        tracing::info!("撤销派车: delivery_id={}", delivery.delivery_id);
        Ok(delivery)
    }

    // ==========================================
    // 发车在途
    // ==========================================

    /// 标记发车
    ///
    /// 要求当前状态为 SCHEDULED;发布携带 ETA 的在途事件,
    /// ETA 服务缺失或失败时回落到配置兜底值
    pub fn mark_en_route(&self, delivery_id: &str, actor: &str) -> RepositoryResult<Delivery> {
        let mut delivery = self.load(delivery_id)?;

        if delivery.status != DeliveryStatus::Scheduled {
            return Err(RepositoryError::InvalidStateTransition {
                from: delivery.status.to_string(),
                to: DeliveryStatus::EnRoute.to_string(),
            });
        }

        let now = Self::now();
        delivery.en_route_at = Some(now);
        delivery.updated_at = now;
        delivery.push_history(DeliveryStatus::EnRoute, now, actor, None);

        self.delivery_repo.update(&delivery)?;

        let eta_minutes = self.estimate_eta(&delivery)?;
        tracing::info!(
            "发车: delivery_id={}, eta_minutes={}",
            delivery.delivery_id,
            eta_minutes
        );

        self.event_publisher.publish_lossy(DispatchEvent::EnRoute {
            delivery_id: delivery.delivery_id.clone(),
            driver_id: delivery.driver_id.clone(),
            eta_minutes,
        });

        Ok(delivery)
    }

    /// ETA 估算;依赖缺失或失败时降级为配置兜底分钟数
    fn estimate_eta(&self, delivery: &Delivery) -> RepositoryResult<u32> {
        let fallback = self.config.default_eta_minutes()?;
        let provider = match &self.eta_provider {
            Some(p) => p,
            None => return Ok(fallback),
        };

        let origin = self.config.depot_address()?.unwrap_or_default();
        let destination = [
            delivery.address_line.as_deref(),
            delivery.district.as_deref(),
            delivery.city.as_deref(),
        ]
        .iter()
        .flatten()
        .copied()
        .collect::<Vec<_>>()
        .join(", ");

        match provider.estimate_travel_minutes(&origin, &destination) {
            Ok(minutes) => Ok(minutes),
            Err(e) => {
                tracing::warn!(
                    "ETA 估算失败,回落兜底值 {} 分钟: delivery_id={}, error={}",
                    fallback,
                    delivery.delivery_id,
                    e
                );
                Ok(fallback)
            }
        }
    }

    // ==========================================
    // 确认送达
    // ==========================================

    /// 标记送达
    ///
    /// 要求当前状态为 EN_ROUTE 或 SCHEDULED(司机可跳过发车标记);
    /// 库存扣减由 inventory_depleted 守卫位保证恰好一次,
    /// 重复的送达尝试不会二次扣减;扣减失败只告警,不回滚转换
    pub fn mark_delivered(
        &self,
        delivery_id: &str,
        photo_url: Option<String>,
        note: Option<String>,
        actor: &str,
    ) -> RepositoryResult<Delivery> {
        let mut delivery = self.load(delivery_id)?;

        if !matches!(
            delivery.status,
            DeliveryStatus::EnRoute | DeliveryStatus::Scheduled
        ) {
            return Err(RepositoryError::InvalidStateTransition {
                from: delivery.status.to_string(),
                to: DeliveryStatus::Delivered.to_string(),
            });
        }

        let now = Self::now();
        delivery.delivered_at = Some(now);
        if photo_url.is_some() {
            delivery.photo_url = photo_url;
        }
        delivery.updated_at = now;
        delivery.push_history(DeliveryStatus::Delivered, now, actor, note);

        // 库存扣减: 守卫位保证至多一次
        if let (Some(material_id), false) = (&delivery.material_id, delivery.inventory_depleted) {
            if let Some(inventory) = &self.inventory {
                match inventory.decrement(material_id, delivery.quantity_t) {
                    Ok(()) => {
                        delivery.inventory_depleted = true;
                    }
                    Err(e) => {
                        // 依赖故障单独上报,状态转换照常落库
                        tracing::warn!(
                            "库存扣减失败(转换不回滚): delivery_id={}, material_id={}, error={}",
                            delivery.delivery_id,
                            material_id,
                            e
                        );
                    }
                }
            }
        }

        self.delivery_repo.update(&delivery)?;
        tracing::info!("送达确认: delivery_id={}", delivery.delivery_id);

        self.event_publisher.publish_lossy(DispatchEvent::Delivered {
            delivery_id: delivery.delivery_id.clone(),
            photo_url: delivery.photo_url.clone(),
        });

        Ok(delivery)
    }

    // ==========================================
    // 取消
    // ==========================================

    /// 取消配送单
    ///
    /// 任意非终态可取消;对 DELIVERED / CANCELLED 的重复取消
    /// 为幂等空操作(容忍重复提交),不追加历史条目
    pub fn cancel(
        &self,
        delivery_id: &str,
        reason: &str,
        actor: &str,
    ) -> RepositoryResult<Delivery> {
        let mut delivery = self.load(delivery_id)?;

        if delivery.status.is_terminal() {
            tracing::debug!(
                "取消命中终态,按幂等空操作处理: delivery_id={}, status={}",
                delivery.delivery_id,
                delivery.status
            );
            return Ok(delivery);
        }

        let now = Self::now();
        delivery.cancelled_at = Some(now);
        delivery.updated_at = now;
        delivery.push_history(
            DeliveryStatus::Cancelled,
            now,
            actor,
            Some(reason.to_string()),
        );

        self.delivery_repo.update(&delivery)?;
        tracing::info!(
            "取消配送单: delivery_id={}, reason={}",
            delivery.delivery_id,
            reason
        );
        Ok(delivery)
    }

    // ==========================================
    // 排班定稿
    // ==========================================

    /// 当日排班定稿
    ///
    /// 对指定日期所有未定稿的 SCHEDULED 单置 schedule_confirmed
    /// 并追加 FINALIZED 历史条目;返回受影响配送单(含联系方式)
    /// 供外部通知方发送消息——本操作自身不发送任何通知
    pub fn finalize_schedule(
        &self,
        date: NaiveDate,
        actor: &str,
    ) -> RepositoryResult<Vec<Delivery>> {
        let filter = DeliveryFilter {
            date_from: Some(date),
            date_to: Some(date),
            statuses: Some(vec![DeliveryStatus::Scheduled]),
            ..Default::default()
        };

        let now = Self::now();
        let mut affected = Vec::new();
        for mut delivery in self.delivery_repo.find(&filter)? {
            if delivery.schedule_confirmed {
                continue;
            }
            delivery.schedule_confirmed = true;
            delivery.updated_at = now;
            delivery.push_history(
                DeliveryStatus::Scheduled,
                now,
                actor,
                Some("FINALIZED".to_string()),
            );
            self.delivery_repo.update(&delivery)?;
            affected.push(delivery);
        }

        tracing::info!("排班定稿: date={}, affected={}", date, affected.len());

        if !affected.is_empty() {
            self.event_publisher
                .publish_lossy(DispatchEvent::ScheduleFinalized {
                    date,
                    delivery_ids: affected.iter().map(|d| d.delivery_id.clone()).collect(),
                });
        }

        Ok(affected)
    }

    // ==========================================
    // 通知标志位
    // ==========================================

    /// 记录"渠道已受理"标志位(只置不清)
    ///
    /// 由外部通知方在渠道受理后回写;true 不代表客户已收到
    pub fn mark_notified(
        &self,
        delivery_id: &str,
        event: LifecycleEvent,
        channel: NotificationChannel,
    ) -> RepositoryResult<Delivery> {
        let mut delivery = self.load(delivery_id)?;
        delivery.notifications.mark(event, channel);
        delivery.updated_at = Self::now();
        self.delivery_repo.update(&delivery)?;
        Ok(delivery)
    }
}
