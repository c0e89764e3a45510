// ==========================================
// 砂石运输调度系统 - 外部协作方接口
// ==========================================
// 职责: 定义库存扣减与 ETA 估算的窄接口
// 说明: 实现方为外部服务适配层,本核心视其为可失败、
//       可能缓慢、由调用方自行重试的依赖
// ==========================================

use std::error::Error;

// ==========================================
// InventoryStore - 库存扣减接口
// ==========================================

/// 库存服务接口
///
/// decrement 在每张含物料引用的送达单上"恰好调用一次"
/// (由配送单上的 inventory_depleted 守卫位保证)
pub trait InventoryStore: Send + Sync {
    /// 扣减物料库存
    fn decrement(&self, material_id: &str, quantity_t: f64)
        -> Result<(), Box<dyn Error + Send + Sync>>;
}

// ==========================================
// EtaProvider - 行程时长估算接口
// ==========================================

/// 行程时长估算接口
///
/// 缺失或调用失败时,调用侧回落到配置的兜底分钟数,
/// 绝不因 ETA 不可用而阻断发车转换
pub trait EtaProvider: Send + Sync {
    /// 估算行程分钟数
    fn estimate_travel_minutes(
        &self,
        origin: &str,
        destination: &str,
    ) -> Result<u32, Box<dyn Error + Send + Sync>>;
}
