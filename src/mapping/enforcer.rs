// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Creation and removal of single namespaces in remote clusters.

use crate::constants::{annotations, labels, rbac::REQUIRED_ROLE_BINDINGS, OPERATOR_NAME};
use crate::error::{OffloadError, Result};
use crate::kubernetes::RemoteClientRegistry;
use crate::types::MappingPhase;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::api::rbac::v1::RoleBinding;
use kube::{
    api::{DeleteParams, ListParams, ObjectMeta, PostParams},
    Api, ResourceExt,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Result of asking for a remote namespace to go away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// Nothing left that belongs to us
    Absent,
    /// Deletion was requested or is underway, check again later
    Terminating,
}

#[async_trait]
pub trait NamespaceEnforcer: Send + Sync {
    /// Make sure `remote_name` exists in the remote cluster and report whether it can be used
    async fn ensure_present(&self, remote_cluster_id: &str, remote_name: &str) -> Result<MappingPhase>;

    /// Request removal of `remote_name` without waiting for it to disappear
    async fn ensure_absent(&self, remote_cluster_id: &str, remote_name: &str) -> Result<Removal>;
}

/// Enforces namespaces in remote clusters through their API servers
pub struct RemoteNamespaceEnforcer {
    registry: Arc<RemoteClientRegistry>,
    local_cluster_id: String,
}

impl RemoteNamespaceEnforcer {
    pub fn new(registry: Arc<RemoteClientRegistry>, local_cluster_id: impl Into<String>) -> Self {
        Self {
            registry,
            local_cluster_id: local_cluster_id.into(),
        }
    }

    async fn present(&self, remote_cluster_id: &str, remote_name: &str) -> Result<MappingPhase> {
        let client = self.registry.get_client(remote_cluster_id).await?;
        let namespaces: Api<Namespace> = Api::all(client.clone());
        let pp = PostParams {
            field_manager: Some(OPERATOR_NAME.to_string()),
            ..Default::default()
        };

        match namespaces
            .create(&pp, &owned_namespace(&self.local_cluster_id, remote_name))
            .await
        {
            Ok(_) => info!("Created remote namespace {}", remote_name),
            Err(kube::Error::Api(err)) if err.code == 409 => {
                debug!("Remote namespace {} already exists", remote_name)
            }
            Err(e) => return Err(e.into()),
        }

        // Read back whatever is there now, ours or not
        let namespace = namespaces.get(remote_name).await?;
        if !is_owned(&self.local_cluster_id, &namespace) {
            warn!(
                "Remote namespace {} exists but was not created by cluster {}",
                remote_name, self.local_cluster_id
            );
            return Ok(MappingPhase::CreationLoopBackOff);
        }
        if namespace.metadata.deletion_timestamp.is_some() {
            info!("Remote namespace {} is still terminating", remote_name);
            return Ok(MappingPhase::CreationLoopBackOff);
        }

        let bindings: Api<RoleBinding> = Api::namespaced(client, remote_name);
        let lp = ListParams::default().labels(&format!(
            "{}={}",
            labels::TENANT,
            labels::tenant_value(&self.local_cluster_id)
        ));
        let granted = bindings.list(&lp).await?.items.len();
        if granted < REQUIRED_ROLE_BINDINGS {
            info!(
                "Remote namespace {} has {} of {} tenant role bindings",
                remote_name, granted, REQUIRED_ROLE_BINDINGS
            );
            return Ok(MappingPhase::CreationLoopBackOff);
        }

        Ok(MappingPhase::Accepted)
    }

    async fn absent(&self, remote_cluster_id: &str, remote_name: &str) -> Result<Removal> {
        let client = self.registry.get_client(remote_cluster_id).await?;
        let namespaces: Api<Namespace> = Api::all(client);

        let Some(namespace) = namespaces.get_opt(remote_name).await? else {
            debug!("Remote namespace {} is gone", remote_name);
            return Ok(Removal::Absent);
        };

        if !is_owned(&self.local_cluster_id, &namespace) {
            debug!(
                "Remote namespace {} is not owned by cluster {}, leaving it alone",
                remote_name, self.local_cluster_id
            );
            return Ok(Removal::Absent);
        }

        if namespace.metadata.deletion_timestamp.is_none() {
            match namespaces.delete(remote_name, &DeleteParams::default()).await {
                Ok(_) => info!("Requested deletion of remote namespace {}", remote_name),
                Err(kube::Error::Api(err)) if err.code == 404 => return Ok(Removal::Absent),
                Err(e) => return Err(e.into()),
            }
        }

        Ok(Removal::Terminating)
    }

    /// Evict the cached client once the remote cluster rejects its credentials,
    /// so the next attempt rebuilds it from a possibly rotated kubeconfig
    fn check_credentials<T>(&self, remote_cluster_id: &str, result: Result<T>) -> Result<T> {
        if let Err(OffloadError::KubeError(kube::Error::Api(err))) = &result {
            if err.code == 401 && self.registry.forget(remote_cluster_id) {
                warn!(
                    "Remote cluster {} rejected our credentials, dropping its client",
                    remote_cluster_id
                );
            }
        }
        result
    }
}

/// Namespace object tagged as created by `local_cluster_id`
fn owned_namespace(local_cluster_id: &str, remote_name: &str) -> Namespace {
    Namespace {
        metadata: ObjectMeta {
            name: Some(remote_name.to_string()),
            annotations: Some(BTreeMap::from([(
                annotations::remote_namespace_owner(local_cluster_id),
                annotations::OWNERSHIP_SENTINEL.to_string(),
            )])),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn is_owned(local_cluster_id: &str, namespace: &Namespace) -> bool {
    namespace
        .annotations()
        .get(&annotations::remote_namespace_owner(local_cluster_id))
        .is_some_and(|v| v == annotations::OWNERSHIP_SENTINEL)
}

#[async_trait]
impl NamespaceEnforcer for RemoteNamespaceEnforcer {
    #[instrument(skip(self))]
    async fn ensure_present(&self, remote_cluster_id: &str, remote_name: &str) -> Result<MappingPhase> {
        let result = self.present(remote_cluster_id, remote_name).await;
        self.check_credentials(remote_cluster_id, result)
    }

    #[instrument(skip(self))]
    async fn ensure_absent(&self, remote_cluster_id: &str, remote_name: &str) -> Result<Removal> {
        let result = self.absent(remote_cluster_id, remote_name).await;
        self.check_credentials(remote_cluster_id, result)
    }
}
