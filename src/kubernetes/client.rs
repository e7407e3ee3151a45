// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Remote cluster client creation and kubeconfig utilities

use crate::config::Config;
use crate::constants::KUBECONFIG_SECRET_KEY;
use crate::error::{OffloadError, Result};
use crate::types::foreign_cluster::ForeignCluster;
use k8s_openapi::api::core::v1::Secret;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config as KConfig};
use tracing::{debug, info, instrument};

/// Create a Kubernetes client for a peered remote cluster
#[instrument(skip(local_client, cluster, config), fields(cluster_id = %cluster.cluster_id()))]
pub async fn create_remote_client(
    local_client: &Client,
    cluster: &ForeignCluster,
    config: &Config,
) -> Result<Client> {
    if config.testing_mode {
        create_testing_client(cluster).await
    } else {
        let kubeconfig = get_cluster_kubeconfig(local_client, cluster).await?;
        create_client_from_kubeconfig(&kubeconfig).await
    }
}

/// Create a client for testing mode from the context of the local kubeconfig
/// named after the remote cluster
async fn create_testing_client(cluster: &ForeignCluster) -> Result<Client> {
    let kubeconfig = Kubeconfig::read()
        .map_err(|e| OffloadError::KubeconfigError(format!("Failed to read kubeconfig: {}", e)))?;
    let context = cluster.cluster_name();
    debug!("Testing mode: using kubeconfig context {}", context);

    let client_config = context_config(kubeconfig, &context).await?;
    Client::try_from(client_config)
        .map_err(|e| OffloadError::KubeconfigError(format!("Failed to create client: {}", e)))
}

async fn context_config(kubeconfig: Kubeconfig, context: &str) -> Result<KConfig> {
    let options = KubeConfigOptions {
        context: Some(context.to_string()),
        ..Default::default()
    };
    KConfig::from_custom_kubeconfig(kubeconfig, &options)
        .await
        .map_err(|e| {
            OffloadError::KubeconfigError(format!("No usable kubeconfig context {}: {}", context, e))
        })
}

/// Get the kubeconfig secret referenced by a ForeignCluster
#[instrument(skip(client, cluster), fields(cluster_id = %cluster.cluster_id()))]
async fn get_cluster_kubeconfig(client: &Client, cluster: &ForeignCluster) -> Result<String> {
    let cluster_id = cluster.cluster_id();
    let Some((namespace, secret_name)) = cluster.kubeconfig_secret() else {
        return Err(OffloadError::KubeconfigError(format!(
            "ForeignCluster {} has no kubeconfig secret reference and no tenant namespace",
            cluster_id
        )));
    };
    let secrets: Api<Secret> = Api::namespaced(client.clone(), &namespace);

    info!(
        "Getting kubeconfig secret '{}/{}' for cluster '{}'...",
        namespace, secret_name, cluster_id
    );

    let secret = secrets.get(&secret_name).await.map_err(|e| {
        OffloadError::KubeconfigError(format!(
            "Failed to get kubeconfig secret for cluster {}: {}",
            cluster_id, e
        ))
    })?;

    kubeconfig_from_secret(&secret, cluster_id)
}

fn kubeconfig_from_secret(secret: &Secret, cluster_id: &str) -> Result<String> {
    let Some(data) = secret.data.as_ref() else {
        return Err(OffloadError::KubeconfigError(format!(
            "Kubeconfig secret for cluster {} has no data",
            cluster_id
        )));
    };

    let Some(kubeconfig_data) = data.get(KUBECONFIG_SECRET_KEY) else {
        return Err(OffloadError::KubeconfigError(format!(
            "Kubeconfig secret for cluster {} does not contain '{}' key",
            cluster_id, KUBECONFIG_SECRET_KEY
        )));
    };

    String::from_utf8(kubeconfig_data.0.clone()).map_err(|e| {
        OffloadError::KubeconfigError(format!(
            "Failed to decode kubeconfig for cluster {}: {}",
            cluster_id, e
        ))
    })
}

/// Create a Kubernetes client from a kubeconfig string
async fn create_client_from_kubeconfig(kubeconfig: &str) -> Result<Client> {
    let kubeconfig_parsed: Kubeconfig = serde_yaml::from_str(kubeconfig)
        .map_err(|e| OffloadError::KubeconfigError(format!("Failed to parse kubeconfig: {}", e)))?;

    let client_config =
        KConfig::from_custom_kubeconfig(kubeconfig_parsed, &KubeConfigOptions::default())
            .await
            .map_err(|e| {
                OffloadError::KubeconfigError(format!("Failed to create config: {}", e))
            })?;

    Client::try_from(client_config)
        .map_err(|e| OffloadError::KubeconfigError(format!("Failed to create client: {}", e)))
}
