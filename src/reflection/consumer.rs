// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Reflection consumer that only logs what it is told.
//!
//! Stands in for the reflection workers when none are plugged in, keeping the
//! signal channels drained and acknowledging mapper restarts.

use crate::reflection::cache::NamespaceTranslator;
use crate::reflection::channels::{MapperCommand, ReflectionReceivers};
use tracing::{debug, info};

pub struct LoggingReflectionConsumer {
    receivers: ReflectionReceivers,
    translator: NamespaceTranslator,
}

impl LoggingReflectionConsumer {
    pub fn new(receivers: ReflectionReceivers, translator: NamespaceTranslator) -> Self {
        Self {
            receivers,
            translator,
        }
    }

    /// Consume signals until every sender is gone
    pub async fn run(mut self) -> anyhow::Result<()> {
        let r = &mut self.receivers;
        loop {
            tokio::select! {
                Some(local) = r.start_outgoing.recv() => {
                    let remote = self
                        .translator
                        .home_to_foreign(&local)
                        .unwrap_or_else(|e| e.to_string());
                    info!("Start outgoing reflection {} -> {}", local, remote);
                }
                Some(local) = r.start_incoming.recv() => {
                    info!("Start incoming reflection for {}", local);
                }
                Some(local) = r.stop_outgoing.recv() => {
                    info!("Stop outgoing reflection for {}", local);
                }
                Some(local) = r.stop_incoming.recv() => {
                    info!("Stop incoming reflection for {}", local);
                }
                Some(command) = r.mapper.recv() => match command {
                    MapperCommand::Start => info!("Namespace mapper started"),
                    MapperCommand::Stop { restart_ready } => {
                        info!("Namespace mapper stopped, ready for restart");
                        if restart_ready.send(()).is_err() {
                            debug!("Mapper stop no longer awaited");
                        }
                    }
                },
                else => break,
            }
        }

        Ok(())
    }
}
