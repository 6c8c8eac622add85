// crates/jd-server/src/main.rs
//
// Binary entrypoint for the JD app server.
//
// Loads `.env`, validates the environment (exiting on any configuration
// error), initializes tracing, builds the application router around the
// identity provider and serves it at `/api/trpc`.

mod config;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use config::ServerConfig;

use jd_core::ServerEnv;
use jd_rpc::{app_router, AuthJsProvider, JdRpcServer, RpcConfig};

/// JD app server: typed, batched RPC over HTTP.
#[derive(Parser, Debug)]
#[command(name = "jd-server", version, about = "JD app RPC server")]
struct Args {
    /// Path to the TOML listen configuration.
    #[arg(long, default_value = "jd.toml")]
    config: String,

    /// Override the configured port.
    #[arg(long)]
    port: Option<u16>,

    /// Skip loading `.env` from the working directory.
    #[arg(long)]
    no_dotenv: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if !args.no_dotenv {
        // A missing .env file is fine; the environment may be set directly.
        let _ = dotenvy::dotenv();
    }

    // Load configuration from TOML file, falling back to defaults if the file
    // is not found. Logging is not up yet, so remember the outcome.
    let (mut server_config, config_note) = match ServerConfig::load(&args.config) {
        Ok(cfg) => (cfg, format!("Loaded configuration from {}", args.config)),
        Err(e) => (
            ServerConfig::default(),
            format!("Could not load config from {}: {}. Using defaults.", args.config, e),
        ),
    };
    if let Some(port) = args.port {
        server_config.port = port;
    }

    // Initialize tracing subscriber for structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&server_config.log_level)),
        )
        .init();
    tracing::info!("{}", config_note);

    match run(server_config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(server_config: ServerConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Fail fast: nothing starts with a missing or malformed variable.
    let env = ServerEnv::from_env()?;

    tracing::info!("JD app server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Mode: {}", env.node_env);
    tracing::info!("Base URL: {}", env.base_url);
    tracing::info!("Identity provider: {}", env.auth_base_url());
    if env.trust_host() {
        tracing::info!("Trusting forwarded host headers");
    }
    if env.vc_build_enabled() {
        tracing::debug!("ENABLE_VC_BUILD={}", env.enable_vc_build);
    }

    let provider = Arc::new(AuthJsProvider::from_env(&env));
    let router = app_router(provider)?;
    tracing::info!(
        "Router ready: {}",
        router.paths().collect::<Vec<_>>().join(", ")
    );

    let rpc_config = RpcConfig {
        host: server_config.host,
        port: server_config.port,
    };
    JdRpcServer::new(rpc_config, router).start().await
}
