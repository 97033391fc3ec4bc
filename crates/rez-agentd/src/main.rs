// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use ra_cancel::CancellationToken;
use ra_catalog::Catalog;
use ra_config::load_config;
use ra_handlers::{HandlerRegistry, WEATHER_API_HOST};
use ra_http::{Allowlist, HttpClient};
use ra_jsonrpc::Dispatcher;
use ra_mcp::McpServer;
use ra_oauth::OAuthClient;
use ra_pubsub::InMemoryBus;
use ra_retry::RetryPolicy;
use ra_secrets::SecretsCache;
use ra_store::MemoryStore;
use ra_telemetry::{init_tracing, LogFormat, MetricsCollector};
use ra_worker::{Worker, WorkerConfig};
use rez_agentd::secrets::EnvSecretStore;
use rez_agentd::{build_app, AppState};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "rez-agentd", version, about = "Directive ingress API, MCP tool server, and web-action worker")]
struct Args {
    /// Bind address for the HTTP/MCP surface.
    #[arg(long, default_value = "127.0.0.1:8089")]
    bind: String,

    /// Optional TOML configuration file (spec §6); `REZ_AGENT_*` env vars
    /// override whatever it sets.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Course catalog TOML (spec §2.5); its hosts seed the HTTP allowlist.
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Worker concurrency: max envelopes processed at once in this process.
    #[arg(long, default_value_t = 10)]
    concurrency: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref()).context("loading configuration")?;
    let warnings = ra_config::validate_config(&config).context("validating configuration")?;

    init_tracing(&config.log_level, LogFormat::from_env());
    for warning in &warnings {
        tracing::warn!(%warning, "configuration warning");
    }

    let stage: ra_core::stage::Stage = config.stage.parse().context("parsing configured stage")?;

    let catalog = Arc::new(match &args.catalog {
        Some(path) => Catalog::load(path).with_context(|| format!("loading course catalog {}", path.display()))?,
        None => Catalog::from_courses(Vec::new()).context("building empty course catalog")?,
    });

    let mut allowlist = Allowlist::with_hosts(catalog.allowlist_hosts()).allow_host(WEATHER_API_HOST);
    if let Some(notifier_url) = &config.notifier_url {
        if let Some(host) = url::Url::parse(notifier_url).ok().and_then(|u| u.host_str().map(str::to_string)) {
            allowlist = allowlist.allow_host(host);
        }
    }

    let retry_policy = RetryPolicy::builder()
        .max_retries(config.http_max_retries.saturating_sub(1))
        .build();
    let http = Arc::new(HttpClient::new(allowlist, retry_policy).context("building http client")?);

    let secrets = Arc::new(SecretsCache::with_ttl(
        Arc::new(EnvSecretStore),
        Duration::from_secs(config.secrets_cache_ttl_minutes * 60),
    ));
    let oauth = Arc::new(OAuthClient::new(http.clone(), secrets));

    let store = Arc::new(MemoryStore::new());
    let (directives, results) = ra_store::repositories(store, config.directives_table.clone(), config.results_table.clone());
    let directives = Arc::new(directives);
    let results = Arc::new(results);

    let bus = Arc::new(InMemoryBus::new());

    let mut handlers = HandlerRegistry::new();
    handlers.register("weather", ra_handlers::WeatherHandler);
    handlers.register("golf", ra_handlers::GolfHandler);
    handlers.register("notify", ra_handlers::NotifyHandler);
    let handlers = Arc::new(handlers);

    let metrics = Arc::new(MetricsCollector::new());
    let shutdown = CancellationToken::new();

    let worker = Arc::new(Worker::new(
        directives.clone(),
        results.clone(),
        handlers.clone(),
        bus.clone(),
        http.clone(),
        oauth.clone(),
        catalog.clone(),
        stage,
        WorkerConfig { concurrency: args.concurrency },
        shutdown.clone(),
        metrics,
    ));

    let worker_handle = {
        let worker = worker.clone();
        let bus = bus.clone();
        let queue = config.web_actions_queue.clone();
        tokio::spawn(async move {
            if let Err(err) = worker.run(bus, &queue).await {
                tracing::error!(error = %err, "web-action worker exited with an error");
            }
        })
    };

    let mcp_server = Arc::new(McpServer::new(
        handlers,
        http.clone(),
        oauth,
        catalog,
        stage,
        config.notifier_url.clone().unwrap_or_default(),
        "rez-agent-mcp",
        env!("CARGO_PKG_VERSION"),
    ));
    let mut dispatcher = Dispatcher::new();
    mcp_server.register_methods(&mut dispatcher);

    let state = Arc::new(AppState {
        directives,
        results,
        publisher: bus.clone(),
        consumer: bus,
        dispatcher: Arc::new(dispatcher),
        stage,
        web_actions_queue: config.web_actions_queue.clone(),
    });

    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(&args.bind).await.with_context(|| format!("bind {}", args.bind))?;
    info!(bind = %args.bind, stage = %stage, "rez-agentd listening");

    tokio::select! {
        result = axum::serve(listener, app) => {
            result.context("serve")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    shutdown.cancel();
    let _ = worker_handle.await;
    Ok(())
}
