// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Cache of API clients for peered remote clusters.

use crate::config::Config;
use crate::constants::labels;
use crate::error::{OffloadError, Result};
use crate::kubernetes::client::create_remote_client;
use crate::types::foreign_cluster::ForeignCluster;
use async_trait::async_trait;
use kube::{api::ListParams, Api, Client, ResourceExt};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

/// Turns a remote cluster ID into a client for that cluster
#[async_trait]
pub trait RemoteClusterResolver: Send + Sync {
    async fn resolve(&self, remote_cluster_id: &str) -> Result<Client>;
}

/// Resolves remote clusters through their ForeignCluster record on the local cluster
pub struct ForeignClusterResolver {
    local_client: Client,
    config: Config,
}

impl ForeignClusterResolver {
    pub fn new(local_client: Client, config: Config) -> Self {
        Self {
            local_client,
            config,
        }
    }
}

#[async_trait]
impl RemoteClusterResolver for ForeignClusterResolver {
    #[instrument(skip(self))]
    async fn resolve(&self, remote_cluster_id: &str) -> Result<Client> {
        let clusters: Api<ForeignCluster> = Api::all(self.local_client.clone());
        let lp = ListParams::default().labels(&format!(
            "{}={}",
            labels::FOREIGN_CLUSTER_ID,
            remote_cluster_id
        ));
        let found = clusters.list(&lp).await?.items;
        let cluster = single_foreign_cluster(found, remote_cluster_id)?;

        debug!("Resolved cluster {} to ForeignCluster {}", remote_cluster_id, cluster.name_any());
        create_remote_client(&self.local_client, &cluster, &self.config).await
    }
}

/// Exactly one ForeignCluster must describe a cluster ID
fn single_foreign_cluster(
    mut found: Vec<ForeignCluster>,
    remote_cluster_id: &str,
) -> Result<ForeignCluster> {
    match found.len() {
        0 => Err(OffloadError::ForeignClusterNotFound(
            remote_cluster_id.to_string(),
        )),
        1 => Ok(found.remove(0)),
        count => Err(OffloadError::AmbiguousForeignCluster {
            cluster_id: remote_cluster_id.to_string(),
            count,
        }),
    }
}

/// Lazily creates and caches one client per remote cluster.
///
/// Each cluster has its own once-cell, so concurrent callers never build two
/// clients for the same cluster and a slow resolution only blocks callers
/// waiting on that cluster. The map lock is never held across an await.
pub struct RemoteClientRegistry {
    resolver: Arc<dyn RemoteClusterResolver>,
    clients: Mutex<HashMap<String, Arc<OnceCell<Client>>>>,
}

impl RemoteClientRegistry {
    pub fn new(resolver: Arc<dyn RemoteClusterResolver>) -> Self {
        Self {
            resolver,
            clients: Mutex::new(HashMap::new()),
        }
    }

    fn slot(&self, remote_cluster_id: &str) -> Arc<OnceCell<Client>> {
        self.clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(remote_cluster_id.to_string())
            .or_default()
            .clone()
    }

    /// Return the client for `remote_cluster_id`, creating it on first use
    pub async fn get_client(&self, remote_cluster_id: &str) -> Result<Client> {
        let slot = self.slot(remote_cluster_id);
        let client = slot
            .get_or_try_init(|| async {
                let client = self.resolver.resolve(remote_cluster_id).await?;
                info!("Created client for remote cluster {}", remote_cluster_id);
                Ok::<_, OffloadError>(client)
            })
            .await?;
        Ok(client.clone())
    }

    /// Drop the cached client, forcing the next call to resolve it again
    pub fn forget(&self, remote_cluster_id: &str) -> bool {
        let removed = self
            .clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(remote_cluster_id);
        removed.is_some_and(|slot| slot.initialized())
    }

    /// Number of clusters with a ready client
    pub fn len(&self) -> usize {
        self.clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockService;
    use crate::types::foreign_cluster::{ClusterIdentity, ForeignClusterSpec};
    use kube::api::ObjectMeta;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingResolver {
        calls: AtomicUsize,
        fail_for: Option<String>,
    }

    impl CountingResolver {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_for: None,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RemoteClusterResolver for CountingResolver {
        async fn resolve(&self, remote_cluster_id: &str) -> Result<Client> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            // Widen the window in which concurrent callers could race
            tokio::time::sleep(Duration::from_millis(10)).await;
            if self.fail_for.as_deref() == Some(remote_cluster_id) {
                return Err(OffloadError::ForeignClusterNotFound(
                    remote_cluster_id.to_string(),
                ));
            }
            Ok(MockService::new().into_client())
        }
    }

    fn make_cluster(name: &str) -> ForeignCluster {
        ForeignCluster {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            spec: ForeignClusterSpec {
                cluster_identity: ClusterIdentity {
                    cluster_id: "cluster-b".to_string(),
                    cluster_name: None,
                },
                kubeconfig_secret_ref: None,
            },
            status: None,
        }
    }

    #[tokio::test]
    async fn test_get_client_caches() {
        let resolver = Arc::new(CountingResolver::new());
        let registry = RemoteClientRegistry::new(resolver.clone());

        registry.get_client("cluster-b").await.unwrap();
        registry.get_client("cluster-b").await.unwrap();

        assert_eq!(resolver.calls(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_get_client_resolves_once() {
        let resolver = Arc::new(CountingResolver::new());
        let registry = Arc::new(RemoteClientRegistry::new(resolver.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move { registry.get_client("cluster-b").await.is_ok() })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap());
        }

        assert_eq!(resolver.calls(), 1);
    }

    #[tokio::test]
    async fn test_distinct_clusters_get_distinct_clients() {
        let resolver = Arc::new(CountingResolver::new());
        let registry = Arc::new(RemoteClientRegistry::new(resolver.clone()));

        let (b, c) = tokio::join!(registry.get_client("cluster-b"), registry.get_client("cluster-c"));
        assert!(b.is_ok() && c.is_ok());

        assert_eq!(resolver.calls(), 2);
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_resolution_is_not_cached() {
        let resolver = Arc::new(CountingResolver {
            calls: AtomicUsize::new(0),
            fail_for: Some("cluster-x".to_string()),
        });
        let registry = RemoteClientRegistry::new(resolver.clone());

        assert!(registry.get_client("cluster-x").await.is_err());
        assert!(registry.get_client("cluster-x").await.is_err());

        assert_eq!(resolver.calls(), 2);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_forget_forces_new_resolution() {
        let resolver = Arc::new(CountingResolver::new());
        let registry = RemoteClientRegistry::new(resolver.clone());

        registry.get_client("cluster-b").await.unwrap();
        assert!(registry.forget("cluster-b"));
        assert!(!registry.forget("cluster-b"));
        registry.get_client("cluster-b").await.unwrap();

        assert_eq!(resolver.calls(), 2);
    }

    /// Never finishes resolving one cluster, serves every other one at once
    struct StuckResolver {
        stuck: String,
    }

    #[async_trait]
    impl RemoteClusterResolver for StuckResolver {
        async fn resolve(&self, remote_cluster_id: &str) -> Result<Client> {
            if remote_cluster_id == self.stuck {
                std::future::pending::<()>().await;
            }
            Ok(MockService::new().into_client())
        }
    }

    #[tokio::test]
    async fn test_slow_cluster_does_not_block_others() {
        let registry = Arc::new(RemoteClientRegistry::new(Arc::new(StuckResolver {
            stuck: "cluster-slow".to_string(),
        })));
        registry.get_client("cluster-fast").await.unwrap();

        let slow = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.get_client("cluster-slow").await.is_ok() })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let cached = tokio::time::timeout(Duration::from_millis(200), registry.get_client("cluster-fast")).await;
        assert!(matches!(cached, Ok(Ok(_))));
        let fresh = tokio::time::timeout(Duration::from_millis(200), registry.get_client("cluster-other")).await;
        assert!(matches!(fresh, Ok(Ok(_))));

        assert!(!slow.is_finished());
        assert_eq!(registry.len(), 2);
        slow.abort();
    }

    #[test]
    fn test_single_foreign_cluster_none() {
        let err = single_foreign_cluster(vec![], "cluster-b").unwrap_err();
        assert!(matches!(err, OffloadError::ForeignClusterNotFound(id) if id == "cluster-b"));
    }

    #[test]
    fn test_single_foreign_cluster_one() {
        let cluster = single_foreign_cluster(vec![make_cluster("peer")], "cluster-b").unwrap();
        assert_eq!(cluster.name_any(), "peer");
    }

    #[test]
    fn test_single_foreign_cluster_many() {
        let err = single_foreign_cluster(
            vec![make_cluster("peer"), make_cluster("peer-copy")],
            "cluster-b",
        )
        .unwrap_err();
        assert!(matches!(err, OffloadError::AmbiguousForeignCluster { count: 2, .. }));
    }

    #[tokio::test]
    async fn test_foreign_cluster_resolver_requires_a_match() {
        let mock = MockService::new().on_get(
            "/apis/discovery.federation.io/v1alpha1/foreignclusters",
            200,
            r#"{"apiVersion":"discovery.federation.io/v1alpha1","kind":"ForeignClusterList","metadata":{},"items":[]}"#,
        );
        let config = Config {
            local_cluster_id: "cluster-a".to_string(),
            watch_namespace: None,
            remote_cluster_id: None,
            tenant_namespace: None,
            testing_mode: false,
        };
        let resolver = ForeignClusterResolver::new(mock.clone().into_client(), config);

        let result = resolver.resolve("cluster-b").await;
        assert!(matches!(result, Err(OffloadError::ForeignClusterNotFound(_))));

        let requests = mock.requests_for("GET");
        assert_eq!(requests.len(), 1);
        let query = requests[0].query.clone().unwrap_or_default();
        assert!(query.contains("labelSelector=discovery.federation.io%2Fcluster-id%3Dcluster-b"));
    }
}
