// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Custom resources read and written by the offloading controllers.

pub mod foreign_cluster;
pub mod namespace_map;

pub use foreign_cluster::ForeignCluster;
pub use namespace_map::{
    CurrentMapping, MappingPhase, NamespaceMap, NamespaceMapSpec, NamespaceMapStatus,
    RemoteNamespaceStatus,
};
