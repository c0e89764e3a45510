// ==========================================
// 砂石运输调度系统 - 应用状态
// ==========================================
// 职责: 装配共享连接、Repository、Engine 与 API 实例
// 说明: 数据库连接建立开销大,进程内复用同一个共享连接,
//       由本层显式注入各组件,不使用环境全局变量
// ==========================================

use std::sync::Arc;

use crate::api::{CapacityApi, DeliveryApi, DispatchApi, FleetApi};
use crate::config::DispatchConfigManager;
use crate::db;
use crate::engine::{
    AssignmentCommitter, CapacityAggregator, DispatchEventPublisher, EtaProvider, InventoryStore,
    LifecycleEngine, OptionalEventPublisher,
};
use crate::repository::{DeliveryRepository, TruckRepository};

// ==========================================
// AppCollaborators - 外部协作方注入点
// ==========================================
// 全部可选;缺省时通知事件静默跳过、库存不扣减、ETA 用兜底值
#[derive(Default)]
pub struct AppCollaborators {
    pub event_publisher: Option<Arc<dyn DispatchEventPublisher>>,
    pub inventory: Option<Arc<dyn InventoryStore>>,
    pub eta_provider: Option<Arc<dyn EtaProvider>>,
}

// ==========================================
// AppState - 应用状态
// ==========================================

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 车队登记API
    pub fleet_api: Arc<FleetApi>,

    /// 配送单API
    pub delivery_api: Arc<DeliveryApi>,

    /// 派车调度API
    pub dispatch_api: Arc<DispatchApi>,

    /// 运力日历API
    pub capacity_api: Arc<CapacityApi>,

    /// 配置管理器
    pub config: Arc<DispatchConfigManager>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// 该方法会:
    /// 1. 打开共享数据库连接并初始化 schema
    /// 2. 初始化所有Repository
    /// 3. 初始化所有Engine
    /// 4. 创建所有API实例
    pub fn new(db_path: String, collaborators: AppCollaborators) -> Result<Self, String> {
        tracing::info!("初始化AppState,数据库路径: {}", db_path);

        // 共享数据库连接
        let conn = db::open_shared_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        {
            let guard = conn.lock().map_err(|e| format!("数据库锁获取失败: {}", e))?;
            db::init_schema(&guard).map_err(|e| format!("schema 初始化失败: {}", e))?;
        }

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let truck_repo = Arc::new(TruckRepository::from_connection(conn.clone()));
        let delivery_repo = Arc::new(DeliveryRepository::from_connection(conn.clone()));

        // ==========================================
        // 初始化Engine层
        // ==========================================
        let config = Arc::new(DispatchConfigManager::from_connection(conn.clone()));

        let event_publisher = match collaborators.event_publisher {
            Some(p) => OptionalEventPublisher::with_publisher(p),
            None => OptionalEventPublisher::none(),
        };

        let lifecycle = Arc::new(LifecycleEngine::new(
            delivery_repo.clone(),
            truck_repo.clone(),
            config.clone(),
            event_publisher,
            collaborators.inventory,
            collaborators.eta_provider,
        ));
        let committer = Arc::new(AssignmentCommitter::new(
            delivery_repo.clone(),
            truck_repo.clone(),
        ));
        let aggregator = Arc::new(CapacityAggregator::new(
            truck_repo.clone(),
            delivery_repo.clone(),
            config.clone(),
        ));

        // ==========================================
        // 初始化API层
        // ==========================================
        let fleet_api = Arc::new(FleetApi::new(truck_repo.clone()));
        let delivery_api = Arc::new(DeliveryApi::new(
            delivery_repo.clone(),
            truck_repo.clone(),
            lifecycle.clone(),
        ));
        let dispatch_api = Arc::new(DispatchApi::new(lifecycle, committer));
        let capacity_api = Arc::new(CapacityApi::new(aggregator));

        tracing::info!("AppState初始化成功");
        Ok(Self {
            db_path,
            fleet_api,
            delivery_api,
            dispatch_api,
            capacity_api,
            config,
        })
    }
}

// ==========================================
// 默认数据库路径
// ==========================================

/// 获取默认数据库路径
///
/// 优先级: 环境变量 HAUL_DISPATCH_DB_PATH > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    // 允许通过环境变量显式指定 DB 路径(便于调试/测试/CI)
    if let Ok(path) = std::env::var("HAUL_DISPATCH_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    // 先给一个默认回退值,后续如果能拿到 data_dir 再覆盖
    let mut path = PathBuf::from("./haul_dispatch.db");

    if let Some(data_dir) = dirs::data_dir() {
        // 开发环境使用独立目录,避免污染生产数据
        #[cfg(debug_assertions)]
        {
            path = data_dir.join("haul-dispatch-dev");
        }
        #[cfg(not(debug_assertions))]
        {
            path = data_dir.join("haul-dispatch");
        }

        if let Err(e) = std::fs::create_dir_all(&path) {
            tracing::warn!("无法创建数据目录 {:?}: {},回退当前目录", path, e);
            path = PathBuf::from(".");
        }
        path = path.join("haul_dispatch.db");
    }

    path.to_string_lossy().to_string()
}
