// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! NamespaceMap reconciler - keeps remote namespaces in line with each map's
//! desired mapping and records their state in the map's status.

use crate::constants::{labels, requeue, NAMESPACE_MAP_FINALIZER, OPERATOR_NAME};
use crate::error::{OffloadError, Result};
use crate::mapping::{drain_mapping, reconcile_mapping, NamespaceEnforcer};
use crate::types::{CurrentMapping, NamespaceMap};
use futures::StreamExt;
use kube::{
    api::{Patch, PatchParams},
    runtime::{controller::Action, watcher, Controller},
    Api, Client, ResourceExt,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

pub struct NamespaceMapReconciler {
    client: Client,
    enforcer: Arc<dyn NamespaceEnforcer>,
    watch_namespace: Option<String>,
}

impl NamespaceMapReconciler {
    pub fn new(
        client: Client,
        enforcer: Arc<dyn NamespaceEnforcer>,
        watch_namespace: Option<String>,
    ) -> Self {
        Self {
            client,
            enforcer,
            watch_namespace,
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let maps: Api<NamespaceMap> = match &self.watch_namespace {
            Some(namespace) => Api::namespaced(self.client.clone(), namespace),
            None => Api::all(self.client.clone()),
        };
        let context = Arc::new(self);

        Controller::new(maps, watcher::Config::default())
            .run(reconcile, error_policy, context)
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled namespace map: {:?}", o),
                    Err(e) => warn!("Reconciliation error: {:?}", e),
                }
            })
            .await;

        Ok(())
    }
}

#[instrument(skip(map, ctx), fields(namespace_map = %map.name_any()))]
async fn reconcile(map: Arc<NamespaceMap>, ctx: Arc<NamespaceMapReconciler>) -> Result<Action> {
    let name = map.name_any();
    let namespace = map.namespace().unwrap_or_default();
    let api: Api<NamespaceMap> = Api::namespaced(ctx.client.clone(), &namespace);

    let Some(remote_cluster_id) = map.remote_cluster_id().map(str::to_string) else {
        if map.is_deleting() {
            if map.current_mapping().is_empty() {
                remove_finalizer(&api, &map).await?;
            } else if map.has_finalizer() {
                // Nothing to drain against until the label comes back
                error!(
                    "NamespaceMap {}/{} is being deleted without label {}, its remote namespaces \
                     cannot be removed; restore the label or remove finalizer {} by hand",
                    namespace,
                    name,
                    labels::REMOTE_CLUSTER_ID,
                    NAMESPACE_MAP_FINALIZER
                );
            }
            return Ok(Action::await_change());
        }
        return Err(OffloadError::MissingLabel {
            label: labels::REMOTE_CLUSTER_ID.to_string(),
            object: format!("{}/{}", namespace, name),
        });
    };

    if map.is_deleting() {
        if !map.has_finalizer() {
            return Ok(Action::await_change());
        }

        debug!("Draining namespace map for cluster {}", remote_cluster_id);
        let outcome = drain_mapping(&map, &remote_cluster_id, ctx.enforcer.as_ref()).await;
        let map = patch_status(&api, &map, &outcome.current).await?;
        if !outcome.current.is_empty() {
            return Err(OffloadError::DeletionInProgress {
                name,
                remaining: outcome.current.len(),
            });
        }

        remove_finalizer(&api, &map).await?;
        info!("All remote namespaces of {} removed", name);
        return Ok(Action::await_change());
    }

    let map = ensure_finalizer(&api, &map).await?;
    let outcome = reconcile_mapping(&map, &remote_cluster_id, ctx.enforcer.as_ref()).await;
    patch_status(&api, &map, &outcome.current).await?;

    if !outcome.is_converged() {
        return Err(OffloadError::MappingIncomplete {
            name,
            failures: outcome.failures,
            terminating: outcome.terminating,
        });
    }

    Ok(Action::requeue(Duration::from_secs(requeue::RESYNC_SECS)))
}

fn error_policy(map: Arc<NamespaceMap>, error: &OffloadError, _ctx: Arc<NamespaceMapReconciler>) -> Action {
    if error.is_terminating() {
        info!("Namespace map {} waiting: {}", map.name_any(), error);
    } else {
        error!("Reconciliation error: {}", error);
    }
    Action::requeue(requeue_after(error))
}

fn requeue_after(error: &OffloadError) -> Duration {
    if error.is_terminating() {
        Duration::from_secs(requeue::TERMINATING_SECS)
    } else {
        Duration::from_secs(requeue::ERROR_SECS)
    }
}

/// Write the new current mapping to the status subresource, if it changed.
///
/// Returns the map as stored after the write.
async fn patch_status(api: &Api<NamespaceMap>, map: &NamespaceMap, current: &CurrentMapping) -> Result<NamespaceMap> {
    let Some(patch) = status_patch(map, current) else {
        return Ok(map.clone());
    };
    let patched = api
        .patch_status(&map.name_any(), &patch_params(), &Patch::Merge(&patch))
        .await?;
    Ok(patched)
}

/// Merge patch turning the map's current mapping into `current`.
///
/// Only changed keys are sent, removed keys are set to null, and the
/// observed resourceVersion makes the write fail on a concurrent update.
fn status_patch(map: &NamespaceMap, current: &CurrentMapping) -> Option<Value> {
    let before = map.current_mapping();
    let mut changes = serde_json::Map::new();

    for (local, status) in current {
        if before.get(local) != Some(status) {
            changes.insert(local.clone(), json!(status));
        }
    }
    for local in before.keys() {
        if !current.contains_key(local) {
            changes.insert(local.clone(), Value::Null);
        }
    }

    if changes.is_empty() {
        return None;
    }
    Some(with_resource_version(
        json!({ "status": { "currentMapping": changes } }),
        map,
    ))
}

fn patch_params() -> PatchParams {
    PatchParams {
        field_manager: Some(OPERATOR_NAME.to_string()),
        ..Default::default()
    }
}

fn finalizer_patch(map: &NamespaceMap, finalizers: Vec<String>) -> Value {
    with_resource_version(json!({ "metadata": { "finalizers": finalizers } }), map)
}

fn with_resource_version(mut patch: Value, map: &NamespaceMap) -> Value {
    if let Some(rv) = map.resource_version() {
        patch["metadata"]["resourceVersion"] = Value::String(rv);
    }
    patch
}

async fn ensure_finalizer(api: &Api<NamespaceMap>, map: &NamespaceMap) -> Result<NamespaceMap> {
    if map.has_finalizer() {
        return Ok(map.clone());
    }

    info!("Adding finalizer {} to {}", NAMESPACE_MAP_FINALIZER, map.name_any());
    let mut finalizers = map.finalizers().to_vec();
    finalizers.push(NAMESPACE_MAP_FINALIZER.to_string());
    let patched = api
        .patch(
            &map.name_any(),
            &patch_params(),
            &Patch::Merge(&finalizer_patch(map, finalizers)),
        )
        .await?;
    Ok(patched)
}

async fn remove_finalizer(api: &Api<NamespaceMap>, map: &NamespaceMap) -> Result<()> {
    if !map.has_finalizer() {
        return Ok(());
    }

    info!("Removing finalizer {} from {}", NAMESPACE_MAP_FINALIZER, map.name_any());
    let finalizers: Vec<String> = map
        .finalizers()
        .iter()
        .filter(|f| *f != NAMESPACE_MAP_FINALIZER)
        .cloned()
        .collect();
    api.patch(
        &map.name_any(),
        &patch_params(),
        &Patch::Merge(&finalizer_patch(map, finalizers)),
    )
    .await?;
    Ok(())
}
