// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `acmed`: the ACME endpoint agent daemon. Wires the Agent Registry &
//! Controller (§4.3) and the Telemetry Engine (§4.5) to their externally
//! facing adapters (§4.1, §4.5), runs the STARTUP trigger once, then
//! drives the scheduler sweep loop (§4.3) until asked to shut down.

use std::sync::Arc;

use acme_adapters::{CredentialError, Credentials, EnvStateProbe, StaticCredentialSource};
use acme_core::{Event, ManifestPluginSource, PluginRegistry, StateProbe, TriggerKind};
use acme_daemon::telemetry::{HttpsRouterBuilder, Router, RouterBuildError, RouterBuilder, TelemetryEngine};
use acme_daemon::{env, lifecycle, registry::Controller};
use acme_engine::{MutexRegistry, TokioBackend};
use acme_storage::AgentStateStore;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Stands in for a configured [`RouterBuilder`] when no telemetry
/// endpoint is set (§4.5 state machine: the engine is expected to stay
/// `UNCONFIGURED` in that deployment, not crash-loop trying to reach
/// nothing).
struct UnconfiguredRouterBuilder;

#[async_trait]
impl RouterBuilder for UnconfiguredRouterBuilder {
    async fn build(&self) -> Result<Router, RouterBuildError> {
        Err(RouterBuildError::Credentials(CredentialError::Unavailable(
            "no telemetry endpoint configured".to_string(),
        )))
    }
}

fn telemetry_credentials() -> Credentials {
    Credentials {
        access_key: std::env::var("ACME_TELEMETRY_ACCESS_KEY").unwrap_or_default(),
        secret: std::env::var("ACME_TELEMETRY_SECRET").unwrap_or_default(),
        session_token: std::env::var("ACME_TELEMETRY_SESSION_TOKEN").unwrap_or_default(),
        signing_key_pem: std::env::var("ACME_TELEMETRY_SIGNING_KEY_PEM").ok(),
    }
}

fn init_logging(state_dir: &std::path::Path, level: &str) -> tracing_appender::non_blocking::WorkerGuard {
    let appender = tracing_appender::rolling::daily(state_dir.join("logs"), "acmed.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = tracing_subscriber::EnvFilter::try_new(level).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_writer(writer).with_env_filter(filter).with_ansi(false).init();
    guard
}

/// Reads a manifest of plugin directory entries, if one exists. An
/// absent or empty manifest is not an error: this workspace ships no
/// statically-linked plugin constructors of its own (compliance and
/// browser-extension agents are plugins of the core, not the core,
/// per `spec.md` §1), so a fresh install simply registers zero Agents.
fn load_plugin_source(plugin_dir: &std::path::Path) -> ManifestPluginSource {
    let registry = Arc::new(PluginRegistry::new());
    let manifest_path = plugin_dir.join("manifest.json");
    match std::fs::read_to_string(&manifest_path) {
        Ok(raw) => match ManifestPluginSource::from_manifest_str(&raw, registry.clone(), env!("CARGO_PKG_VERSION")) {
            Ok(source) => source,
            Err(err) => {
                warn!(path = %manifest_path.display(), error = %err, "malformed plugin manifest, starting with no plugins");
                ManifestPluginSource::new(Vec::new(), registry, env!("CARGO_PKG_VERSION"))
            }
        },
        Err(_) => ManifestPluginSource::new(Vec::new(), registry, env!("CARGO_PKG_VERSION")),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = lifecycle::Config::load()?;
    std::fs::create_dir_all(config.state_dir.join("logs"))?;
    let _log_guard = init_logging(&config.state_dir, &env::log_level());
    let daemon_state = lifecycle::startup(config.clone())?;

    let state_store = Arc::new(AgentStateStore::new(config.agent_state_dir.clone(), config.manifest_dir.clone()));
    let state_probe: Arc<dyn StateProbe> = Arc::new(EnvStateProbe::new());
    let mutexes = Arc::new(MutexRegistry::new());
    let backend = Arc::new(TokioBackend);
    let (telemetry_tx, mut telemetry_rx) = mpsc::channel::<Event>(1024);

    let controller = Arc::new(Controller::new(
        backend,
        mutexes,
        state_store,
        state_probe,
        telemetry_tx,
        config.max_executors,
        config.execution_sla,
        config.requeue_threshold,
        config.host_source.clone(),
    ));

    let router_builder: Arc<dyn RouterBuilder> = match &config.telemetry_endpoint {
        Some(endpoint) => {
            let credentials = Arc::new(StaticCredentialSource::new(telemetry_credentials()));
            Arc::new(HttpsRouterBuilder::new(endpoint.clone(), credentials))
        }
        None => Arc::new(UnconfiguredRouterBuilder),
    };
    let telemetry = TelemetryEngine::new(router_builder, config.telemetry_queue_path.clone(), acme_core::DEFAULT_RECORD_SIZE_LIMIT);
    if let Err(err) = telemetry.load() {
        warn!(error = %err, "failed to reload persisted telemetry queue");
    }
    telemetry.start();

    // Proxies events the Controller commits (plugin-load metrics,
    // heartbeats, etc.) into the Telemetry Engine's durable queue — the
    // same shape as §4.3's "Proxied logging and telemetry", minus the
    // forked-process hop this workspace's tokio-task backend doesn't need.
    // Ends on its own once `controller` (the channel's only sender) is
    // dropped below.
    let forward_engine = telemetry.clone();
    let forward_telemetry = tokio::spawn(async move {
        while let Some(event) = telemetry_rx.recv().await {
            forward_engine.commit_event(event);
        }
    });

    let plugin_source = load_plugin_source(&config.plugin_dir);
    match controller.load_plugins(&plugin_source).await {
        Ok(loaded) => info!(succeeded = loaded.succeeded, failed = loaded.failed, "plugin discovery complete"),
        Err(err) => warn!(error = %err, "plugin discovery failed"),
    }

    let mut rng = rand::thread_rng();
    controller
        .execute_trigger(TriggerKind::STARTUP, serde_json::Value::Null, Utc::now(), &mut rng)
        .await;

    let mut sweep_interval = tokio::time::interval(config.sweep_interval);
    loop {
        tokio::select! {
            _ = sweep_interval.tick() => {
                controller.sweep(Utc::now(), &mut rng).await;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    controller
        .execute_trigger(TriggerKind::SHUTDOWN, serde_json::Value::Null, Utc::now(), &mut rng)
        .await;
    controller.begin_shutdown();
    for _ in 0..20 {
        controller.sweep(Utc::now(), &mut rng).await;
        if controller.pool_worker_count() == 0 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }

    // Dropping the last `Controller` reference drops its telemetry
    // sender, which closes the channel `forward_telemetry` is draining
    // and lets that task end on its own rather than being aborted
    // mid-forward.
    drop(controller);
    let _ = tokio::time::timeout(std::time::Duration::from_secs(1), forward_telemetry).await;

    telemetry.stop().await;
    if let Err(err) = telemetry.save() {
        warn!(error = %err, "failed to persist telemetry queue on shutdown");
    }

    lifecycle::shutdown(&daemon_state);
    Ok(())
}
