// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use std::sync::Arc;

use anyhow::{Context, Result};
use kube::Client;
use tracing::{info, warn};

use offloader::config::Config;
use offloader::constants::reflection::CHANNEL_BUFFER;
use offloader::kubernetes::{wait_for_namespace_map_crd, ForeignClusterResolver, RemoteClientRegistry};
use offloader::mapping::RemoteNamespaceEnforcer;
use offloader::reconcilers::NamespaceMapReconciler;
use offloader::reflection::{
    reflection_channels, LoggingReflectionConsumer, NamespaceNatCache, ReflectionLifecycleSignaler,
};

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    match log_format.to_lowercase().as_str() {
        "json" => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init(),
        _ => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .compact()
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    info!("Starting namespace offloading operator");

    let config = Config::from_env()?;
    info!(
        "Configuration loaded: local_cluster_id={}, remote_cluster_id={:?}",
        config.local_cluster_id, config.remote_cluster_id
    );

    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    info!("Waiting for NamespaceMap CRD to become available...");
    wait_for_namespace_map_crd(&client).await?;

    let registry = Arc::new(RemoteClientRegistry::new(Arc::new(
        ForeignClusterResolver::new(client.clone(), config.clone()),
    )));
    let enforcer = Arc::new(RemoteNamespaceEnforcer::new(
        registry,
        config.local_cluster_id.clone(),
    ));
    let reconciler =
        NamespaceMapReconciler::new(client.clone(), enforcer, config.watch_namespace.clone());

    match &config.remote_cluster_id {
        Some(remote_cluster_id) => {
            let tenant_namespace = config
                .tenant_namespace
                .as_deref()
                .context("TENANT_NAMESPACE is required when REMOTE_CLUSTER_ID is set")?;

            let (signals, receivers) = reflection_channels(CHANNEL_BUFFER);
            let signaler = ReflectionLifecycleSignaler::new(
                remote_cluster_id.clone(),
                NamespaceNatCache::new(),
                signals,
            );
            let consumer = LoggingReflectionConsumer::new(receivers, signaler.translator());

            info!("Starting namespace map reconciler and reflection signaler...");
            tokio::try_join!(
                reconciler.run(),
                signaler.run(client.clone(), tenant_namespace),
                consumer.run()
            )?;
        }
        None => {
            info!("Starting namespace map reconciler...");
            reconciler.run().await?;
        }
    }

    // Controllers run until the process is terminated
    warn!("All controllers stopped unexpectedly");
    Ok(())
}
