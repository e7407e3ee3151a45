// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Drives remote namespaces towards the desired mapping of a NamespaceMap.
//!
//! These functions only compute the next `currentMapping`; persisting it and
//! managing the finalizer is left to the controller in
//! [`crate::reconcilers::namespace_map`].

use crate::mapping::enforcer::{NamespaceEnforcer, Removal};
use crate::types::{CurrentMapping, MappingPhase, NamespaceMap, RemoteNamespaceStatus};
use tracing::{debug, error, warn};

/// The mapping after one enforcement pass and what is still outstanding
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingOutcome {
    pub current: CurrentMapping,
    /// Entries that failed or are not accepted yet
    pub failures: usize,
    /// Entries waiting for their remote namespace to disappear
    pub terminating: usize,
}

impl MappingOutcome {
    fn new(current: CurrentMapping) -> Self {
        Self {
            current,
            ..Default::default()
        }
    }

    pub fn is_converged(&self) -> bool {
        self.failures == 0 && self.terminating == 0
    }

    /// Retire the entry for `local`: drop it once its remote namespace is gone,
    /// otherwise keep it as Terminating.
    async fn retire<E>(&mut self, enforcer: &E, remote_cluster_id: &str, local: &str, remote: &str)
    where
        E: NamespaceEnforcer + ?Sized,
    {
        match enforcer.ensure_absent(remote_cluster_id, remote).await {
            Ok(Removal::Absent) => {
                debug!("Remote namespace {} for {} removed", remote, local);
                self.current.remove(local);
            }
            Ok(Removal::Terminating) => {
                self.terminating += 1;
                self.current.insert(
                    local.to_string(),
                    RemoteNamespaceStatus::new(remote, MappingPhase::Terminating),
                );
            }
            Err(e) => {
                error!("Failed to remove remote namespace {} for {}: {}", remote, local, e);
                self.failures += 1;
                self.current.insert(
                    local.to_string(),
                    RemoteNamespaceStatus::new(remote, MappingPhase::Terminating),
                );
            }
        }
    }
}

/// Enforce the desired mapping of a live NamespaceMap.
///
/// Every entry is attempted even when earlier ones fail.
pub async fn reconcile_mapping<E>(map: &NamespaceMap, remote_cluster_id: &str, enforcer: &E) -> MappingOutcome
where
    E: NamespaceEnforcer + ?Sized,
{
    let desired = map.desired_mapping();
    let mut outcome = MappingOutcome::new(map.current_mapping());

    for (local, remote) in desired {
        // A remote name change first retires the namespace created under the old name
        if let Some(previous) = outcome.current.get(local).cloned() {
            if previous.remote_namespace != *remote {
                warn!(
                    "Remote namespace for {} changed from {} to {}",
                    local, previous.remote_namespace, remote
                );
                outcome
                    .retire(enforcer, remote_cluster_id, local, &previous.remote_namespace)
                    .await;
                if outcome.current.contains_key(local) {
                    continue;
                }
            }
        }

        let phase = match enforcer.ensure_present(remote_cluster_id, remote).await {
            Ok(phase) => phase,
            Err(e) => {
                error!("Failed to enforce remote namespace {} for {}: {}", remote, local, e);
                outcome.failures += 1;
                // Keep the last known state instead of flapping on a transient error
                if outcome.current.contains_key(local) {
                    continue;
                }
                outcome.current.insert(
                    local.clone(),
                    RemoteNamespaceStatus::new(remote.as_str(), MappingPhase::CreationLoopBackOff),
                );
                continue;
            }
        };

        if phase != MappingPhase::Accepted {
            outcome.failures += 1;
        }
        outcome
            .current
            .insert(local.clone(), RemoteNamespaceStatus::new(remote.as_str(), phase));
    }

    let stale: Vec<(String, String)> = outcome
        .current
        .iter()
        .filter(|(local, _)| !desired.contains_key(*local))
        .map(|(local, status)| (local.clone(), status.remote_namespace.clone()))
        .collect();
    for (local, remote) in stale {
        outcome.retire(enforcer, remote_cluster_id, &local, &remote).await;
    }

    outcome
}

/// Tear down every remote namespace of a NamespaceMap that is being deleted,
/// whatever its desired mapping says.
pub async fn drain_mapping<E>(map: &NamespaceMap, remote_cluster_id: &str, enforcer: &E) -> MappingOutcome
where
    E: NamespaceEnforcer + ?Sized,
{
    let mut outcome = MappingOutcome::new(map.current_mapping());
    let entries: Vec<(String, String)> = outcome
        .current
        .iter()
        .map(|(local, status)| (local.clone(), status.remote_namespace.clone()))
        .collect();

    for (local, remote) in entries {
        outcome.retire(enforcer, remote_cluster_id, &local, &remote).await;
    }

    outcome
}
