// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::{labels, NAMESPACE_MAP_FINALIZER};
use kube::{CustomResource, ResourceExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Mapping from local namespace name to the state of its remote counterpart
pub type CurrentMapping = BTreeMap<String, RemoteNamespaceStatus>;

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[kube(
    group = "offloading.federation.io",
    version = "v1alpha1",
    kind = "NamespaceMap"
)]
#[kube(namespaced)]
#[kube(status = "NamespaceMapStatus")]
#[serde(rename_all = "camelCase")]
pub struct NamespaceMapSpec {
    /// Local namespace name to requested remote namespace name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub desired_mapping: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceMapStatus {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub current_mapping: CurrentMapping,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoteNamespaceStatus {
    pub remote_namespace: String,
    pub phase: MappingPhase,
}

impl RemoteNamespaceStatus {
    pub fn new(remote_namespace: impl Into<String>, phase: MappingPhase) -> Self {
        Self {
            remote_namespace: remote_namespace.into(),
            phase,
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.phase == MappingPhase::Accepted
    }
}

/// Acceptance state of one remote namespace
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, schemars::JsonSchema)]
pub enum MappingPhase {
    Accepted,
    CreationLoopBackOff,
    Terminating,
}

impl fmt::Display for MappingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MappingPhase::Accepted => "Accepted",
            MappingPhase::CreationLoopBackOff => "CreationLoopBackOff",
            MappingPhase::Terminating => "Terminating",
        };
        f.write_str(s)
    }
}

impl NamespaceMap {
    /// The remote cluster this map refers to, from its label
    pub fn remote_cluster_id(&self) -> Option<&str> {
        self.labels()
            .get(labels::REMOTE_CLUSTER_ID)
            .map(String::as_str)
            .filter(|id| !id.is_empty())
    }

    pub fn is_deleting(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    pub fn has_finalizer(&self) -> bool {
        self.finalizers().iter().any(|f| f == NAMESPACE_MAP_FINALIZER)
    }

    pub fn desired_mapping(&self) -> &BTreeMap<String, String> {
        &self.spec.desired_mapping
    }

    /// Current mapping, empty when the status has never been written
    pub fn current_mapping(&self) -> CurrentMapping {
        self.status
            .as_ref()
            .map(|s| s.current_mapping.clone())
            .unwrap_or_default()
    }
}
