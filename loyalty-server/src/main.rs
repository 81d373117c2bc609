use anyhow::Context;
use loyalty_server::{
    BackgroundTasks, Config, DbService, ExpirySweeper, TaskKind, cleanup_old_logs, print_banner,
    setup_environment,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 环境 (dotenv, 配置, 工作目录, 日志)
    dotenv::dotenv().ok();
    let config = Config::from_env();
    setup_environment(&config)?;

    print_banner();
    tracing::info!(
        environment = %config.environment,
        database = %config.database_path,
        "Loyalty ledger starting"
    );

    // 2. 数据库
    let db = DbService::new(&config.database_path)
        .await
        .context("failed to open ledger database")?;

    // 3. 后台任务
    let mut tasks = BackgroundTasks::new();
    let sweeper = ExpirySweeper::new(
        db.pool.clone(),
        config.expiry_sweep_interval(),
        tasks.shutdown_token(),
    );
    tasks.spawn("expiry_sweeper", TaskKind::Periodic, sweeper.run());

    let log_dir = config.log_dir();
    let retention_days = config.log_retention_days;
    let shutdown = tasks.shutdown_token();
    tasks.spawn("log_cleanup", TaskKind::Periodic, async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(24 * 60 * 60));
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = cleanup_old_logs(&log_dir, retention_days) {
                        tracing::warn!(error = %e, "Log cleanup failed");
                    }
                }
            }
        }
    });
    tasks.log_summary();

    // 4. 等待退出信号
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("Shutdown signal received");

    tasks.shutdown(config.shutdown_timeout()).await;
    db.pool.close().await;
    tracing::info!("Loyalty ledger stopped");
    Ok(())
}
