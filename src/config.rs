// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{bail, Context, Result};
use std::env;

/// Operator configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Identity of this cluster, written into remote namespace ownership annotations
    pub local_cluster_id: String,
    /// Namespace to watch for NamespaceMaps; all namespaces when unset
    pub watch_namespace: Option<String>,
    /// Remote cluster whose reflection lifecycle this process drives
    pub remote_cluster_id: Option<String>,
    /// Namespace holding the NamespaceMap for `remote_cluster_id`
    pub tenant_namespace: Option<String>,
    /// Build remote clients from local kubeconfig contexts instead of secrets
    pub testing_mode: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let local_cluster_id = lookup("LOCAL_CLUSTER_ID")
            .filter(|v| !v.is_empty())
            .context("LOCAL_CLUSTER_ID environment variable not set")?;
        let watch_namespace = lookup("NAMESPACEMAP_NAMESPACE").filter(|v| !v.is_empty());
        let remote_cluster_id = lookup("REMOTE_CLUSTER_ID").filter(|v| !v.is_empty());
        let tenant_namespace = lookup("TENANT_NAMESPACE").filter(|v| !v.is_empty());
        // Remote clients come from the local kubeconfig context named after each peer instead of secrets
        let testing_mode: bool = lookup("TESTING_MODE")
            .unwrap_or("false".to_string())
            .parse()
            .unwrap_or(false);

        if remote_cluster_id.is_some() && tenant_namespace.is_none() {
            bail!("TENANT_NAMESPACE must be set when REMOTE_CLUSTER_ID is set");
        }

        Ok(Config {
            local_cluster_id,
            watch_namespace,
            remote_cluster_id,
            tenant_namespace,
            testing_mode,
        })
    }
}
