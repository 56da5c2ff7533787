//! 论坛权限服务主入口

use forum_authz::{
    auth::JwtService,
    config::AppConfig,
    db,
    handlers::health,
    middleware::AppState,
    repository::{EntityRepository, RoleRepository},
    routes,
    services::{ActionPolicy, PermissionService},
    telemetry,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 {
        match args[1].as_str() {
            "--version" => {
                println!("forum-authz {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" => {
                print_help();
                return Ok(());
            }
            _ => {
                eprintln!("未知参数: {}", args[1]);
                print_help();
                std::process::exit(1);
            }
        }
    }

    // 加载 .env 文件（开发环境），优先级：.env.local > .env.development > .env
    dotenv::from_filename(".env.local").ok();
    dotenv::from_filename(".env.development").ok();
    dotenv::dotenv().ok();

    health::set_start_time();

    // 1. 加载配置
    let config = AppConfig::from_env()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    // 2. 初始化日志
    telemetry::init_telemetry(&config.logging);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Forum authz starting...");

    // 3. 权限策略，声明非法时启动失败
    let policy = ActionPolicy::forum_defaults()?;
    tracing::info!(actions = policy.len(), "Action policy registered");

    // 4. 数据库连接池 + 迁移
    let db_pool = db::connect(&config.database).await?;

    // 5. 构建应用状态
    let role_repo = Arc::new(RoleRepository::new(db_pool.clone()));
    let permission_service = Arc::new(PermissionService::new(
        role_repo.clone(),
        Arc::new(EntityRepository::new(db_pool.clone())),
    ));

    let app_state = Arc::new(AppState {
        jwt_service: Arc::new(JwtService::from_config(&config.security)?),
        config: config.clone(),
        db: db_pool,
        permission_service,
        policy: Arc::new(policy),
        role_repo,
    });

    // 6. 构建路由
    let app = routes::create_router(app_state)?;

    // 7. 启动服务器
    let listener = TcpListener::bind(&config.server.addr).await?;
    tracing::info!(addr = %config.server.addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.graceful_shutdown_timeout_secs))
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// 优雅关闭信号处理
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Ctrl+C received, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Terminate signal received, starting graceful shutdown");
        },
    }

    // 超时后强制退出
    let timeout = std::time::Duration::from_secs(timeout_secs);
    tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        tracing::warn!("Graceful shutdown timeout reached, forcing exit");
        std::process::exit(1);
    });
}

fn print_help() {
    println!("forum-authz {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("用法: forum-authz [选项]");
    println!();
    println!("选项:");
    println!("  --version     打印版本信息并退出");
    println!("  --help        打印此帮助信息并退出");
    println!();
    println!("环境变量:");
    println!("  所有配置通过 FORUM_ 前缀的环境变量完成");
    println!("  例如 FORUM_DATABASE__URL, FORUM_SECURITY__JWT_SECRET");
}
