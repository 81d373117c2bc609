//! Loyalty Server - 会员积分/集章账本引擎
//!
//! # 架构概述
//!
//! - **账本引擎** (`loyalty`): 集章卡循环、奖励解锁/兑换/过期、会员等级
//! - **数据库** (`db`): SQLite (WAL) 存储与仓储函数
//! - **核心** (`core`): 配置与后台任务
//! - **工具** (`utils`): 错误类型、日志
//!
//! # 模块结构
//!
//! ```text
//! loyalty-server/src/
//! ├── core/          # 配置、后台任务
//! ├── db/            # 连接池、迁移、仓储
//! ├── loyalty/       # 账本引擎与 LoyaltyService
//! └── utils/         # 错误、日志
//! ```

pub mod core;
pub mod db;
pub mod loyalty;
pub mod utils;

// Re-export 公共类型
pub use core::{BackgroundTasks, Config, TaskKind};
pub use db::DbService;
pub use loyalty::{ExpirySweeper, LedgerError, LedgerResult, LoyaltyService};
pub use utils::{AppError, AppResult};

// Re-export unified error types from shared
pub use shared::error::{ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{cleanup_old_logs, init_logger, init_logger_with_file};

/// Prepare the work directory and logging (call after `dotenv`).
pub fn setup_environment(config: &Config) -> anyhow::Result<()> {
    let work_dir = std::path::Path::new(&config.work_dir);
    if work_dir.exists() && !work_dir.is_dir() {
        return Err(AppError::Config(format!(
            "WORK_DIR {} is not a directory",
            config.work_dir
        ))
        .into());
    }
    std::fs::create_dir_all(work_dir).map_err(AppError::from)?;

    let log_dir = config.log_dir();
    let log_dir_str = log_dir.to_string_lossy();
    init_logger_with_file(&config.log_level, config.log_json, Some(log_dir_str.as_ref()))?;

    match cleanup_old_logs(&log_dir, config.log_retention_days) {
        Ok(0) => {}
        Ok(deleted) => tracing::info!(deleted, "Old log files removed"),
        Err(e) => tracing::warn!(error = %e, "Log cleanup failed"),
    }
    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
    __                  ____
   / /   ____  __  __ _/ / /___  __
  / /   / __ \/ / / / __/ __/ / / /
 / /___/ /_/ / /_/ / /_/ /_/ /_/ /
/_____/\____/\__, /\__/\__/\__, /
            /____/        /____/   ledger
    "#
    );
}
