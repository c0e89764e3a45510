// ==========================================
// 砂石运输调度系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为,避免"部分模块外键开启/部分不开启"
// - 统一 busy_timeout,减少并发写入时的偶发 busy 错误
// - 连接建立开销大,进程内共享同一个 Arc<Mutex<Connection>>,
//   由 AppState 注入各仓储,不使用环境全局变量
// ==========================================

use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 默认 busy_timeout(毫秒)
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema 版本
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明:
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 打开共享连接(供 AppState 注入各仓储)
pub fn open_shared_connection(db_path: &str) -> rusqlite::Result<Arc<Mutex<Connection>>> {
    Ok(Arc::new(Mutex::new(open_sqlite_connection(db_path)?)))
}

/// 初始化数据库 schema(幂等)
///
/// 约束设计:
/// - idx_truck_number_active: 活跃车辆车牌唯一(小写去空白),存储层兜底
/// - idx_delivery_truck_slot: 同车/同日/同时段的非取消配送单唯一,
///   将"先查后写"的时段冲突竞态收敛到存储层约束
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS truck (
            truck_id TEXT PRIMARY KEY,
            truck_number TEXT NOT NULL,
            truck_type TEXT NOT NULL,
            capacity_t REAL NOT NULL CHECK (capacity_t > 0),
            is_active INTEGER NOT NULL DEFAULT 1,
            driver_id TEXT,
            driver_name TEXT,
            driver_phone TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_truck_number_active
            ON truck (lower(trim(truck_number)))
            WHERE is_active = 1;

        CREATE TABLE IF NOT EXISTS delivery (
            delivery_id TEXT PRIMARY KEY,
            source TEXT NOT NULL,
            customer_name TEXT,
            customer_phone TEXT,
            customer_email TEXT,
            address_line TEXT,
            city TEXT,
            district TEXT,
            material_id TEXT,
            material_name TEXT,
            quantity_t REAL NOT NULL DEFAULT 0 CHECK (quantity_t >= 0),
            delivery_date TEXT NOT NULL,
            time_window TEXT,
            hour_slot INTEGER,
            slot_key TEXT,
            truck_id TEXT,
            truck_number TEXT,
            driver_id TEXT,
            driver_name TEXT,
            stop_order INTEGER,
            status TEXT NOT NULL,
            scheduled_at TEXT,
            en_route_at TEXT,
            delivered_at TEXT,
            cancelled_at TEXT,
            photo_url TEXT,
            inventory_depleted INTEGER NOT NULL DEFAULT 0,
            schedule_confirmed INTEGER NOT NULL DEFAULT 0,
            notifications_json TEXT NOT NULL DEFAULT '{}',
            status_history_json TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_delivery_truck_slot
            ON delivery (truck_id, delivery_date, slot_key)
            WHERE status != 'CANCELLED'
              AND truck_id IS NOT NULL
              AND slot_key IS NOT NULL;

        CREATE INDEX IF NOT EXISTS idx_delivery_date ON delivery (delivery_date);
        CREATE INDEX IF NOT EXISTS idx_delivery_truck ON delivery (truck_id);
        CREATE INDEX IF NOT EXISTS idx_delivery_status ON delivery (status);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    Ok(())
}

/// 读取 schema_version(若表不存在则返回 None)
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    use rusqlite::OptionalExtension;

    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}
