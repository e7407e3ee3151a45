// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Label keys used to select federation resources
pub mod labels {
    /// Identifies the remote cluster a NamespaceMap refers to
    pub const REMOTE_CLUSTER_ID: &str = "offloading.federation.io/remote-cluster-id";
    /// Identifies the cluster a ForeignCluster record describes
    pub const FOREIGN_CLUSTER_ID: &str = "discovery.federation.io/cluster-id";
    /// Set on the RoleBindings granted to a peer's workload identity
    pub const TENANT: &str = "offloading.federation.io/tenant";

    /// Value of the tenant label for the RoleBindings granted to `cluster_id`
    pub fn tenant_value(cluster_id: &str) -> String {
        format!("tenant-{}", cluster_id)
    }
}

/// Annotation keys placed on remote namespaces
pub mod annotations {
    pub const REMOTE_NAMESPACE_PREFIX: &str = "offloading.federation.io/remote-namespace-";
    pub const OWNERSHIP_SENTINEL: &str = "true";

    /// Ownership annotation key written by the cluster `local_cluster_id`
    pub fn remote_namespace_owner(local_cluster_id: &str) -> String {
        format!("{}{}", REMOTE_NAMESPACE_PREFIX, local_cluster_id)
    }
}

/// Finalizer blocking NamespaceMap removal until its remote namespaces are gone
pub const NAMESPACE_MAP_FINALIZER: &str = "offloading.federation.io/namespacemap-controller";

/// Field manager recorded on the objects this operator creates and patches
pub const OPERATOR_NAME: &str = "namespacemap-controller";

/// Key of the kubeconfig entry in a remote cluster credentials secret
pub const KUBECONFIG_SECRET_KEY: &str = "kubeconfig";

pub mod rbac {
    /// Minimum number of tenant RoleBindings before a remote namespace is accepted
    pub const REQUIRED_ROLE_BINDINGS: usize = 2;
}

/// CRD polling configuration
pub mod crd {
    pub const GROUP: &str = "offloading.federation.io";
    pub const VERSION: &str = "v1alpha1";
    pub const KIND: &str = "NamespaceMap";
    /// Initial polling interval in seconds when waiting for CRD
    pub const POLL_INTERVAL_SECS: u64 = 10;
    /// Maximum polling interval in seconds (exponential backoff cap)
    pub const POLL_MAX_INTERVAL_SECS: u64 = 60;
}

pub mod requeue {
    /// Periodic resync of converged NamespaceMaps
    pub const RESYNC_SECS: u64 = 300;
    /// Retry delay while remote namespaces are terminating
    pub const TERMINATING_SECS: u64 = 5;
    /// Retry delay after any other reconcile error
    pub const ERROR_SECS: u64 = 30;
}

pub mod reflection {
    /// Slots in each reflection signal channel
    pub const CHANNEL_BUFFER: usize = 16;
}
