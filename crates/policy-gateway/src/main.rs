mod cli;
mod config;
mod server;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use audit_log::{AuditEntry, AuditEventType, AuditSink, AuditSource};
use policy_engine::{loader, PolicyConfig, PolicyGateway, PresidioDetector, ToolAllowlist};

use crate::cli::Cli;
use crate::server::AppState;

const COMPONENT: &str = "policy-gateway";

/// Fold CLI flags and environment knobs into the loaded policy.
fn apply_overrides(policy: &mut PolicyConfig, cli: &Cli) {
    if let Some(enabled) = cli.filter_enabled {
        policy.filter.enabled = enabled;
    }
    if let Some(ref list) = cli.filter_patterns {
        policy.filter.patterns = policy_engine::parse_comma_separated(list);
    }
    if let Some(ref list) = cli.allowed_tools {
        policy.tools.allowed = ToolAllowlist::from_comma_separated(list).list_tools();
    }
    if let Some(threshold) = cli.pii_threshold {
        policy.pii.score_threshold = threshold;
    }
}

/// Resolves on ctrl-c or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(%err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(%err, "failed to register SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT (ctrl-c)"),
        _ = terminate => info!("received SIGTERM"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load .env (if any), then parse CLI args so env-backed flags see it.
    let dotenv = dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // 2. Load config, then merge CLI overrides.
    let mut cfg = config::load(&cli.config)?;

    if let Some(ref policy) = cli.policy {
        cfg.policy_file = policy.clone();
    }
    if let Some(ref listen) = cli.listen {
        cfg.server.listen_addr = listen.clone();
    }
    if let Some(ref url) = cli.detector_url {
        cfg.detector.url = url.clone();
    }

    // 3. Init tracing-subscriber with JSON format.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.logging.level));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!(
        config_file = %cli.config.display(),
        policy_file = %cfg.policy_file.display(),
        listen = %cfg.server.listen_addr,
        detector = %cfg.detector.url,
        dotenv = ?dotenv,
        "policy-gateway starting"
    );

    // 4. Start audit logger.
    let (audit, audit_handle) = match cfg.logging.audit_log_path {
        Some(ref path) => {
            let (sink, handle) = AuditSink::start(path)
                .await
                .context("failed to start audit logger")?;
            (sink, Some(handle))
        }
        None => {
            info!("audit log disabled");
            (AuditSink::disabled(), None)
        }
    };

    audit
        .log(AuditEntry::new(
            AuditEventType::ProcessStarted,
            AuditSource::new(COMPONENT),
            serde_json::json!({
                "version": env!("CARGO_PKG_VERSION"),
                "config_file": cli.config.display().to_string(),
                "policy_file": cfg.policy_file.display().to_string(),
            }),
        ))
        .await;

    // 5. Load policy, apply overrides, re-validate.
    let mut policy = loader::load_policy(&cfg.policy_file).context("failed to load policy file")?;
    apply_overrides(&mut policy, &cli);
    loader::validate(&policy).context("policy invalid after applying overrides")?;

    // 6. Build the detector client and the gateway.
    let detector = PresidioDetector::new(
        &cfg.detector.url,
        cfg.detector.timeout(),
        Some(policy.pii.score_threshold),
    )
    .context("failed to create detector client")?;

    let gateway = PolicyGateway::new(&policy, Arc::new(detector), cfg.detector.timeout())
        .context("failed to initialize policy gateway")?;

    info!(?gateway, audit = audit.is_enabled(), "policy gateway ready");

    // 7. Bind and serve until a shutdown signal arrives.
    let app = server::router(AppState {
        gateway: Arc::new(gateway),
        audit: audit.clone(),
    });

    let listener = tokio::net::TcpListener::bind(&cfg.server.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", cfg.server.listen_addr))?;

    info!(listen = %cfg.server.listen_addr, "HTTP server listening");

    let serve_result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    // 8. Log shutdown and drain the audit writer.
    info!("policy-gateway shutting down");

    audit
        .log(AuditEntry::new(
            AuditEventType::ProcessStopped,
            AuditSource::new(COMPONENT),
            serde_json::json!({ "serve_result": format!("{:?}", serve_result) }),
        ))
        .await;

    drop(audit);
    if let Some(handle) = audit_handle {
        if let Err(err) = handle.await {
            warn!(%err, "audit writer task ended abnormally");
        }
    }

    serve_result.context("HTTP server failed")?;

    Ok(())
}
