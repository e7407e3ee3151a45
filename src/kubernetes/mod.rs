// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes utilities for CRD discovery, remote client creation and caching.

pub mod client;
pub mod crd;
pub mod registry;

pub use client::create_remote_client;
pub use crd::wait_for_namespace_map_crd;
pub use registry::{ForeignClusterResolver, RemoteClientRegistry, RemoteClusterResolver};
