// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Remote namespace enforcement and the mapping diff built on top of it.

pub mod enforcer;
pub mod reconcile;

pub use enforcer::{NamespaceEnforcer, Removal, RemoteNamespaceEnforcer};
pub use reconcile::{drain_mapping, reconcile_mapping, MappingOutcome};
