// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Reflection lifecycle signaler - watches the NamespaceMap of one remote
//! cluster, keeps the namespace translation cache up to date and tells the
//! reflection workers which namespaces to start and stop.

use crate::constants::labels;
use crate::error::Result;
use crate::reflection::cache::{NamespaceNatCache, NamespaceTranslator};
use crate::reflection::channels::ReflectionSignals;
use crate::types::{CurrentMapping, NamespaceMap};
use futures::StreamExt;
use kube::{Api, Client, ResourceExt};
use kube_runtime::watcher::{watcher, Config as WatcherConfig, Event};
use kube_runtime::WatchStreamExt;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info, instrument, warn};

/// A change in the reflection state of one local namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Start { local: String, remote: String },
    Stop { local: String },
}

/// Compare the accepted entries of two snapshots of a current mapping.
///
/// `old` is `None` for a newly created map and `new` is `None` for a deleted one.
pub fn diff_mappings(old: Option<&CurrentMapping>, new: Option<&CurrentMapping>) -> Vec<Transition> {
    let accepted = |mapping: Option<&CurrentMapping>, local: &str| {
        mapping
            .and_then(|m| m.get(local))
            .filter(|status| status.is_accepted())
            .map(|status| status.remote_namespace.clone())
    };

    let keys: BTreeSet<&String> = old
        .into_iter()
        .chain(new)
        .flat_map(|m| m.keys())
        .collect();

    let mut transitions = Vec::new();
    for local in keys {
        match (accepted(old, local.as_str()), accepted(new, local.as_str())) {
            (Some(before), Some(after)) if before == after => {}
            (Some(_), Some(remote)) => {
                transitions.push(Transition::Stop {
                    local: local.clone(),
                });
                transitions.push(Transition::Start {
                    local: local.clone(),
                    remote,
                });
            }
            (Some(_), None) => transitions.push(Transition::Stop {
                local: local.clone(),
            }),
            (None, Some(remote)) => transitions.push(Transition::Start {
                local: local.clone(),
                remote,
            }),
            (None, None) => {}
        }
    }
    transitions
}

/// Processes NamespaceMap events for one remote cluster, one at a time.
///
/// Only one NamespaceMap may describe a remote cluster. While more than one
/// exists their updates are ignored; the generation of the map that was
/// being followed is still torn down when that map goes away.
pub struct ReflectionLifecycleSignaler {
    remote_cluster_id: String,
    cache: NamespaceNatCache,
    signals: ReflectionSignals,
    /// Latest current mapping of every matching NamespaceMap believed to exist
    live: BTreeMap<String, CurrentMapping>,
    /// Last current mapping acted upon, per NamespaceMap
    processed: HashMap<String, CurrentMapping>,
    /// Objects buffered while the watch re-lists
    relist: Option<Vec<NamespaceMap>>,
}

impl ReflectionLifecycleSignaler {
    pub fn new(
        remote_cluster_id: impl Into<String>,
        cache: NamespaceNatCache,
        signals: ReflectionSignals,
    ) -> Self {
        Self {
            remote_cluster_id: remote_cluster_id.into(),
            cache,
            signals,
            live: BTreeMap::new(),
            processed: HashMap::new(),
            relist: None,
        }
    }

    pub fn translator(&self) -> NamespaceTranslator {
        NamespaceTranslator::new(self.cache.clone())
    }

    /// Watch the NamespaceMaps of this remote cluster in `namespace` until the watch ends
    pub async fn run(mut self, client: Client, namespace: &str) -> anyhow::Result<()> {
        let maps: Api<NamespaceMap> = Api::namespaced(client, namespace);
        let config = WatcherConfig::default().labels(&format!(
            "{}={}",
            labels::REMOTE_CLUSTER_ID,
            self.remote_cluster_id
        ));

        info!(
            "Watching NamespaceMaps for remote cluster {} in {}",
            self.remote_cluster_id, namespace
        );
        let mut events = watcher(maps, config).default_backoff().boxed();
        while let Some(event) = events.next().await {
            match event {
                Ok(event) => self.handle_event(event).await?,
                Err(e) => warn!("NamespaceMap watch error: {}", e),
            }
        }

        Ok(())
    }

    #[instrument(skip(self, event), fields(remote_cluster_id = %self.remote_cluster_id))]
    pub async fn handle_event(&mut self, event: Event<NamespaceMap>) -> Result<()> {
        match event {
            Event::Apply(map) => self.on_apply(&map).await,
            Event::Delete(map) => self.on_delete(&map.name_any()).await,
            Event::Init => {
                self.relist = Some(Vec::new());
                Ok(())
            }
            Event::InitApply(map) => match self.relist.as_mut() {
                Some(listed) => {
                    listed.push(map);
                    Ok(())
                }
                None => self.on_apply(&map).await,
            },
            Event::InitDone => self.finish_relist().await,
        }
    }

    /// Objects missing from a re-list were deleted while the watch was down
    async fn finish_relist(&mut self) -> Result<()> {
        let listed = self.relist.take().unwrap_or_default();
        let names: BTreeSet<String> = listed.iter().map(|m| m.name_any()).collect();
        let vanished: Vec<String> = self
            .live
            .keys()
            .filter(|name| !names.contains(*name))
            .cloned()
            .collect();

        for map in &listed {
            self.live.insert(map.name_any(), map.current_mapping());
        }
        for name in vanished {
            debug!("NamespaceMap {} disappeared during re-list", name);
            self.on_delete(&name).await?;
        }
        self.sync_single().await
    }

    async fn on_apply(&mut self, map: &NamespaceMap) -> Result<()> {
        let name = map.name_any();
        self.live.insert(name.clone(), map.current_mapping());
        if self.live.len() > 1 {
            warn!(
                "Found {} NamespaceMaps for remote cluster {}, ignoring event for {}",
                self.live.len(),
                self.remote_cluster_id,
                name
            );
            return Ok(());
        }
        self.sync_single().await
    }

    async fn on_delete(&mut self, name: &str) -> Result<()> {
        self.live.remove(name);

        match self.processed.remove(name) {
            Some(previous) => {
                self.apply(diff_mappings(Some(&previous), None)).await?;
                self.cache.clear();

                info!("NamespaceMap {} deleted, stopping namespace mapper", name);
                self.signals.stop_mapper().await?;
                info!("Namespace mapper restart acknowledged");
            }
            None => debug!("NamespaceMap {} deleted before it was processed", name),
        }

        if self.live.len() > 1 {
            warn!(
                "Still {} NamespaceMaps for remote cluster {}, waiting for a single one",
                self.live.len(),
                self.remote_cluster_id
            );
            return Ok(());
        }
        self.sync_single().await
    }

    /// Act on the only live map, starting a generation for it if needed
    async fn sync_single(&mut self) -> Result<()> {
        if self.live.len() != 1 {
            return Ok(());
        }
        let Some((name, current)) = self.live.iter().next().map(|(n, c)| (n.clone(), c.clone()))
        else {
            return Ok(());
        };

        let previous = self.processed.get(&name);
        if previous.is_none() {
            info!("NamespaceMap {} created, starting namespace mapper", name);
            self.signals.start_mapper().await?;
        }

        let transitions = diff_mappings(previous, Some(&current));
        self.apply(transitions).await?;
        self.processed.insert(name, current);
        Ok(())
    }

    async fn apply(&self, transitions: Vec<Transition>) -> Result<()> {
        for transition in transitions {
            match transition {
                Transition::Start { local, remote } => {
                    self.cache.write(&local, &remote);
                    info!("Starting reflection of {} into {}", local, remote);
                    self.signals.start(&local).await?;
                }
                Transition::Stop { local } => {
                    info!("Stopping reflection of {}", local);
                    self.signals.stop(&local).await?;
                }
            }
        }
        Ok(())
    }
}
