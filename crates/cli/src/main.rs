use std::{path::PathBuf, sync::Arc, time::Duration};

use {
    clap::{Parser, Subcommand},
    sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    tracing::{info, warn},
    tracing_subscriber::EnvFilter,
};

use {
    zapcrm_agents::ProviderResolver,
    zapcrm_config::ZapcrmConfig,
    zapcrm_gateway::{AppState, db, serve},
};

#[derive(Parser)]
#[command(name = "zapcrm", about = "zapcrm — WhatsApp lead CRM gateway")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Address to bind to (overrides config value).
    #[arg(long, global = true)]
    bind: Option<String>,

    /// Port to listen on (overrides config value).
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Config file path (overrides discovery).
    #[arg(long, global = true, env = "ZAPCRM_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server (default when no subcommand is provided).
    Gateway,
    /// Database management.
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

#[derive(Subcommand)]
enum DbAction {
    /// Create the schema (idempotent).
    Init,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    if cli.json_logs {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = match &cli.config {
        Some(path) => zapcrm_config::load_config(path)?,
        None => zapcrm_config::discover_and_load(),
    };

    match cli.command {
        None | Some(Commands::Gateway) => run_gateway(&cli, config).await,
        Some(Commands::Db {
            action: DbAction::Init,
        }) => {
            let pool = open_pool(&config).await?;
            db::init_schema(&pool).await?;
            info!(path = %config.database.path, "database initialized");
            Ok(())
        },
    }
}

async fn open_pool(config: &ZapcrmConfig) -> anyhow::Result<sqlx::SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(&config.database.path)
        .create_if_missing(true);
    Ok(SqlitePoolOptions::new().connect_with(options).await?)
}

async fn run_gateway(cli: &Cli, config: ZapcrmConfig) -> anyhow::Result<()> {
    let pool = open_pool(&config).await?;
    db::init_schema(&pool).await?;

    let resolver = Arc::new(ProviderResolver::new(Duration::from_secs(
        config.classifier.timeout_secs,
    )));
    let state = AppState::build(
        pool,
        resolver,
        Duration::from_secs(config.session.reconnect_delay_secs),
    );

    // Transport plugins are linked in by the integration build; sessions
    // declared in config start against whatever is registered.
    for session in &config.transport.sessions {
        match state
            .supervisor
            .start_session(&session.plugin, &session.tenant_id, session.config.clone())
            .await
        {
            Ok(()) => info!(
                tenant_id = %session.tenant_id,
                plugin = %session.plugin,
                "transport session started"
            ),
            Err(e) => warn!(
                tenant_id = %session.tenant_id,
                plugin = %session.plugin,
                error = %e,
                "transport session not started"
            ),
        }
    }

    let bind = cli.bind.clone().unwrap_or(config.gateway.bind);
    let port = cli.port.unwrap_or(config.gateway.port);
    serve(state, &bind, port).await
}
