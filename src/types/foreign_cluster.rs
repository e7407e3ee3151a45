// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use kube::{CustomResource, ResourceExt};
use serde::{Deserialize, Serialize};

/// A peered cluster, as discovered by the federation layer
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, schemars::JsonSchema)]
#[kube(
    group = "discovery.federation.io",
    version = "v1alpha1",
    kind = "ForeignCluster"
)]
#[kube(status = "ForeignClusterStatus")]
#[serde(rename_all = "camelCase")]
pub struct ForeignClusterSpec {
    pub cluster_identity: ClusterIdentity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubeconfig_secret_ref: Option<SecretReference>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterIdentity {
    #[serde(rename = "clusterID")]
    pub cluster_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_name: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretReference {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ForeignClusterStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_namespace: Option<TenantNamespace>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TenantNamespace {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
}

impl ForeignCluster {
    pub fn cluster_id(&self) -> &str {
        &self.spec.cluster_identity.cluster_id
    }

    /// Human readable name of the cluster, falling back to the object name
    pub fn cluster_name(&self) -> String {
        self.spec
            .cluster_identity
            .cluster_name
            .clone()
            .unwrap_or_else(|| self.name_any())
    }

    /// Local tenant namespace created for this peer, if any
    pub fn local_tenant_namespace(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|s| s.tenant_namespace.as_ref())
            .and_then(|t| t.local.as_deref())
    }

    /// Namespace and name of the secret holding the kubeconfig for this cluster.
    ///
    /// Unset fields of the reference default to `<cluster-id>-kubeconfig` in the
    /// local tenant namespace. Returns `None` when no namespace can be determined.
    pub fn kubeconfig_secret(&self) -> Option<(String, String)> {
        let reference = self.spec.kubeconfig_secret_ref.clone().unwrap_or_default();
        let name = reference
            .name
            .unwrap_or_else(|| format!("{}-kubeconfig", self.cluster_id()));
        let namespace = reference
            .namespace
            .or_else(|| self.local_tenant_namespace().map(str::to_string))?;
        Some((namespace, name))
    }
}
