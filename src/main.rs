//! FraudShield Gate - Main Entry Point
//!
//! Wires the security gateway (rate limiting, token auth, RBAC, anomaly
//! detection) over the configured event backend and drives a simulated
//! client workload through it. Supports parallel request handling.

use anyhow::Result;
use fraudshield_gate::{
    config::AppConfig,
    auth::StaticCredentialStore,
    clock::SystemClock,
    metrics::{GatewayMetrics, MetricsReporter},
    pipeline::{Access, GateRequest, Route, SecurityGateway},
    store::EventStore,
};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fraudshield_gate=info".parse()?),
        )
        .init();

    info!("Starting FraudShield Gate");

    // Load configuration
    let config = AppConfig::load()?;
    info!("Configuration loaded successfully");
    info!(
        "Rate limits: login {}/{}s, detect {}/{}s, admin {}/{}s",
        config.limits.login.max_requests,
        config.limits.login.window_secs,
        config.limits.detect.max_requests,
        config.limits.detect.window_secs,
        config.limits.admin.max_requests,
        config.limits.admin.window_secs,
    );

    let clock = Arc::new(SystemClock);
    let metrics = Arc::new(GatewayMetrics::new());

    // Select the event backend once at startup; falls back to the
    // in-process store with a warning if redis is unreachable
    let events = Arc::new(EventStore::connect(&config.redis, &config.detection, clock.clone()).await);
    info!(backend = %events.backend_kind(), "event store ready");

    let gateway = Arc::new(SecurityGateway::new(
        &config,
        Arc::new(StaticCredentialStore::seeded()),
        events,
        clock,
        metrics.clone(),
    ));

    // Start metrics reporter (prints summary every 30 seconds)
    let metrics_clone = metrics.clone();
    tokio::spawn(async move {
        let reporter = MetricsReporter::new(metrics_clone, 30);
        reporter.start().await;
    });

    let detect_route = Arc::new(Route::new(
        "detect",
        config.limits.detect,
        Access::AnyRole(vec!["admin".to_string(), "fraud_analyst".to_string()]),
    ));
    let admin_route = Arc::new(Route::new(
        "admin_data",
        config.limits.admin,
        Access::AnyRole(vec!["admin".to_string()]),
    ));

    // Simulated client workload standing in for the HTTP surface:
    // an analyst scoring transactions, an attacker guessing passwords,
    // and an analyst token probing an admin route
    info!("Starting simulated client workload with 8 parallel workers");
    let semaphore = Arc::new(Semaphore::new(8));
    let mut handles = Vec::new();

    let analyst_token = match gateway.login("10.0.0.10", "analyst", "analyst123").await {
        Ok(issued) => issued.access_token,
        Err(err) => {
            error!(error = %err, "seed login failed");
            return Ok(());
        }
    };
    let analyst_token = Arc::new(analyst_token);

    for i in 0..40 {
        let permit = semaphore.clone().acquire_owned().await?;
        let gateway = gateway.clone();
        let token = analyst_token.clone();
        let route = detect_route.clone();

        handles.push(tokio::spawn(async move {
            let _permit = permit;
            let request = GateRequest {
                client_addr: "10.0.0.10",
                bearer_token: Some(&token),
                method: "POST",
                path: "/detect/",
            };
            let result = gateway
                .handle(request, &route, |caller| async move {
                    info!(subject = %caller.subject, batch = i, "scoring transaction batch");
                    Ok(())
                })
                .await;
            if let Err(err) = result {
                warn!(batch = i, error = %err, "detect request denied");
            }
        }));
    }

    // Brute-force attempts; the fifth failure should raise an alert and
    // further attempts hit the login rate limit
    for _ in 0..7 {
        if let Err(err) = gateway.login("203.0.113.9", "centralbank", "letmein").await {
            warn!(error = %err, "login attempt rejected");
        }
    }

    // Analyst probing an admin-only route
    let probe = GateRequest {
        client_addr: "10.0.0.10",
        bearer_token: Some(&analyst_token),
        method: "GET",
        path: "/admin/data",
    };
    if let Err(err) = gateway
        .handle(probe, &admin_route, |_| async { Ok(()) })
        .await
    {
        warn!(error = %err, "admin probe denied");
    }

    for handle in handles {
        handle.await?;
    }

    info!("Workload complete");
    metrics.print_summary();

    Ok(())
}
