// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Signals sent to the reflection workers of one remote cluster.

use crate::error::{OffloadError, Result};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// Commands about the lifecycle of the namespace mapper itself
#[derive(Debug)]
pub enum MapperCommand {
    /// A NamespaceMap appeared, a new mapper generation starts
    Start,
    /// The NamespaceMap is gone. The receiver tears its generation down and
    /// answers on `restart_ready` once a replacement may begin.
    Stop { restart_ready: oneshot::Sender<()> },
}

/// Sending half, owned by the lifecycle signaler.
///
/// All channels are bounded: when workers stop draining them, sends wait.
#[derive(Clone)]
pub struct ReflectionSignals {
    start_outgoing: mpsc::Sender<String>,
    stop_outgoing: mpsc::Sender<String>,
    start_incoming: mpsc::Sender<String>,
    stop_incoming: mpsc::Sender<String>,
    mapper: mpsc::Sender<MapperCommand>,
}

/// Receiving half, owned by whoever manages the reflection workers
pub struct ReflectionReceivers {
    pub start_outgoing: mpsc::Receiver<String>,
    pub stop_outgoing: mpsc::Receiver<String>,
    pub start_incoming: mpsc::Receiver<String>,
    pub stop_incoming: mpsc::Receiver<String>,
    pub mapper: mpsc::Receiver<MapperCommand>,
}

/// Create the signal channels, each with `buffer` slots
pub fn reflection_channels(buffer: usize) -> (ReflectionSignals, ReflectionReceivers) {
    let (start_outgoing_tx, start_outgoing_rx) = mpsc::channel(buffer);
    let (stop_outgoing_tx, stop_outgoing_rx) = mpsc::channel(buffer);
    let (start_incoming_tx, start_incoming_rx) = mpsc::channel(buffer);
    let (stop_incoming_tx, stop_incoming_rx) = mpsc::channel(buffer);
    let (mapper_tx, mapper_rx) = mpsc::channel(buffer);

    let signals = ReflectionSignals {
        start_outgoing: start_outgoing_tx,
        stop_outgoing: stop_outgoing_tx,
        start_incoming: start_incoming_tx,
        stop_incoming: stop_incoming_tx,
        mapper: mapper_tx,
    };
    let receivers = ReflectionReceivers {
        start_outgoing: start_outgoing_rx,
        stop_outgoing: stop_outgoing_rx,
        start_incoming: start_incoming_rx,
        stop_incoming: stop_incoming_rx,
        mapper: mapper_rx,
    };
    (signals, receivers)
}

async fn send<T>(tx: &mpsc::Sender<T>, value: T, channel: &str) -> Result<()> {
    tx.send(value)
        .await
        .map_err(|_| OffloadError::ChannelClosed(channel.to_string()))
}

impl ReflectionSignals {
    /// Start reflection in both directions for `local`
    pub async fn start(&self, local: &str) -> Result<()> {
        send(&self.start_outgoing, local.to_string(), "start-outgoing").await?;
        send(&self.start_incoming, local.to_string(), "start-incoming").await
    }

    /// Stop reflection in both directions for `local`
    pub async fn stop(&self, local: &str) -> Result<()> {
        send(&self.stop_outgoing, local.to_string(), "stop-outgoing").await?;
        send(&self.stop_incoming, local.to_string(), "stop-incoming").await
    }

    pub async fn start_mapper(&self) -> Result<()> {
        send(&self.mapper, MapperCommand::Start, "mapper").await
    }

    /// Announce the end of this mapper generation and wait until the
    /// receiver clears a replacement to start.
    pub async fn stop_mapper(&self) -> Result<()> {
        let (restart_ready, ready) = oneshot::channel();
        send(&self.mapper, MapperCommand::Stop { restart_ready }, "mapper").await?;
        if ready.await.is_err() {
            // Nobody left to wait for
            debug!("Mapper stop acknowledgement dropped");
        }
        Ok(())
    }
}
