// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OffloadError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Failed to build remote client: {0}")]
    KubeconfigError(String),

    #[error("No ForeignCluster found for cluster ID {0}")]
    ForeignClusterNotFound(String),

    #[error("Found {count} ForeignClusters for cluster ID {cluster_id}, expected exactly one")]
    AmbiguousForeignCluster { cluster_id: String, count: usize },

    #[error("Missing label {label} on {object}")]
    MissingLabel { label: String, object: String },

    #[error("Deletion of NamespaceMap {name} in progress, {remaining} remote namespaces left")]
    DeletionInProgress { name: String, remaining: usize },

    #[error("NamespaceMap {name} not converged: {failures} failed, {terminating} terminating")]
    MappingIncomplete {
        name: String,
        failures: usize,
        terminating: usize,
    },

    #[error("Reflection channel closed: {0}")]
    ChannelClosed(String),
}

impl OffloadError {
    /// True when the only thing outstanding is a remote namespace still being deleted.
    pub fn is_terminating(&self) -> bool {
        matches!(
            self,
            OffloadError::DeletionInProgress { .. }
                | OffloadError::MappingIncomplete { failures: 0, .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, OffloadError>;
