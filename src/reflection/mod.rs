// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Data plane: namespace name translation and reflection start/stop signaling.

pub mod cache;
pub mod channels;
pub mod consumer;
pub mod signaler;

pub use cache::{NamespaceNatCache, NamespaceNotAvailable, NamespaceTranslator};
pub use channels::{reflection_channels, MapperCommand, ReflectionReceivers, ReflectionSignals};
pub use consumer::LoggingReflectionConsumer;
pub use signaler::ReflectionLifecycleSignaler;
