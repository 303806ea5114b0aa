// # fcddnsd - fcddns Daemon
//
// A THIN integration layer over `fcddns-core`:
// 1. Reading configuration from environment variables
// 2. Initializing tracing and the runtime
// 3. Registering providers and routing domains to them
// 4. Serving the HTTP boundary until SIGTERM/SIGINT
//
// All reconciliation logic lives in `fcddns-core`.
//
// ## Configuration
//
// - `FCDDNS_JWT_SECRET`: Credential signing secret (required)
// - `FCDDNS_PROVIDER_TYPE`: `cloudflare` (default), `aliyun` or `memory`
// - `FCDDNS_CLOUDFLARE_API_TOKEN`: API token (required for cloudflare)
// - `FCDDNS_CLOUDFLARE_API_BASE`: API base URL override
// - `FCDDNS_ALIYUN_ACCESS_KEY_ID` / `FCDDNS_ALIYUN_ACCESS_KEY_SECRET`: Alidns key pair
// - `FCDDNS_ALIYUN_ENDPOINT`: Alidns endpoint override
// - `FCDDNS_ALIYUN_DOMAINS`: Domains served by Aliyun next to another provider
// - `FCDDNS_DOMAINS`: Comma-separated managed domains (default `*`)
// - `FCDDNS_BIND_ADDR`: Listen address (default `0.0.0.0:8080`)
// - `FCDDNS_CLIENT_IP_HEADER`: Header carrying the client address behind a proxy
// - `FCDDNS_REQUEST_TIMEOUT_SECS`: Per-request timeout (default 30)
// - `FCDDNS_CREDENTIAL_EXPIRY`: `never` (default) or `enforce`
// - `FCDDNS_DUPLICATE_SLOT_POLICY`: `first-match` (default) or `fail-closed`
// - `FCDDNS_LOG_LEVEL`: trace, debug, info, warn, error
// - `FCDDNS_MODE`: `dry-run` to log provider mutations instead of sending them
//
// ## Example
//
// ```bash
// export FCDDNS_JWT_SECRET=change-me-to-something-long
// export FCDDNS_CLOUDFLARE_API_TOKEN=your_cloudflare_token
// export FCDDNS_CLIENT_IP_HEADER=cf-connecting-ip
//
// fcddnsd token sign --domain example.com --host home
// fcddnsd
// ```

mod cli;
mod config;
mod server;
mod token;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use config::Config;
use fcddns_core::{ProviderRegistry, ProviderRoutes, RequestHandler};
use server::AppState;
use std::future::Future;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
pub(crate) enum FcddnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<FcddnsExitCode> for ExitCode {
    fn from(code: FcddnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => run_serve(),
        Command::Token { command } => token::run(command),
    }
}

fn run_serve() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return FcddnsExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return FcddnsExitCode::ConfigError.into();
    }

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::new(config.log_level.to_lowercase()))
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return FcddnsExitCode::ConfigError.into();
    }

    info!("Starting fcddnsd");

    let state = match build_state(&config) {
        Ok(state) => state,
        Err(e) => {
            error!("Startup error: {:#}", e);
            return FcddnsExitCode::ConfigError.into();
        }
    };

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return FcddnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(&config, state).await {
            error!("Daemon error: {:#}", e);
            FcddnsExitCode::RuntimeError
        } else {
            FcddnsExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Build the provider routes and request handler from configuration
fn build_state(config: &Config) -> Result<AppState> {
    let registry = ProviderRegistry::with_builtin();

    #[cfg(feature = "cloudflare")]
    {
        info!("Registering Cloudflare provider");
        fcddns_provider_cloudflare::register(&registry);
    }

    #[cfg(feature = "aliyun")]
    {
        info!("Registering Aliyun provider");
        fcddns_provider_aliyun::register(&registry);
    }

    let core_config = config.fcddns_config()?;
    for binding in core_config.bindings() {
        if !registry.has_provider(binding.provider.type_name()) {
            anyhow::bail!(
                "Provider '{}' is not available in this build. Available: {}",
                binding.provider.type_name(),
                registry.list_providers().join(", ")
            );
        }
    }

    if config.provider_type == "memory" {
        warn!("Memory provider holds no zones; every request will fail with zone not found");
    }

    let routes = ProviderRoutes::from_config(&registry, &core_config)?;
    for binding in core_config.bindings() {
        for domain in &binding.domains {
            info!("Managing domain: {} via {}", domain, binding.provider.type_name());
        }
    }
    info!(
        "Credential expiry: {:?}, duplicate slots: {:?}",
        core_config.credential.expiry, core_config.reconcile.duplicate_slot_policy
    );

    let handler = RequestHandler::from_config(&core_config, routes)?;
    Ok(AppState {
        handler: Arc::new(handler),
        client_ip_header: config.client_ip_header()?,
    })
}

/// Run the daemon
async fn run_daemon(config: &Config, state: AppState) -> Result<()> {
    let shutdown = shutdown_signal()?;
    let router = server::router(state, config.request_timeout());

    server::serve(config.bind_addr()?, router, shutdown).await?;

    info!("Shutting down daemon");
    Ok(())
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// Handlers are installed before the future is returned, so a signal that
/// arrives during startup is not lost.
#[cfg(unix)]
fn shutdown_signal() -> Result<impl Future<Output = &'static str> + Send + 'static> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        }
    })
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl Future<Output = &'static str> + Send + 'static> {
    Ok(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to wait for CTRL-C: {}", e);
        }
        "SIGINT"
    })
}
