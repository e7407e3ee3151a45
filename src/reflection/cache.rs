// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Local to remote namespace name translation table.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;

/// The namespace has no accepted remote counterpart (yet)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("namespace {0} is not available")]
pub struct NamespaceNotAvailable(pub String);

/// Shared, thread-safe table of accepted `local -> remote` namespace names.
///
/// Clones share the same table.
#[derive(Clone, Default, Debug)]
pub struct NamespaceNatCache {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl NamespaceNatCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&self, local: &str, remote: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(local.to_string(), remote.to_string());
    }

    pub fn read_forward(&self, local: &str) -> Result<String, NamespaceNotAvailable> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(local)
            .cloned()
            .ok_or_else(|| NamespaceNotAvailable(local.to_string()))
    }

    /// Reverse lookup; scans all entries
    pub fn read_backward(&self, remote: &str) -> Result<String, NamespaceNotAvailable> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|(_, r)| r.as_str() == remote)
            .map(|(local, _)| local.clone())
            .ok_or_else(|| NamespaceNotAvailable(remote.to_string()))
    }

    pub fn snapshot(&self) -> HashMap<String, String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn remove(&self, local: &str) -> Option<String> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(local)
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Translation API handed to reflection workers
#[derive(Clone, Debug)]
pub struct NamespaceTranslator {
    cache: NamespaceNatCache,
}

impl NamespaceTranslator {
    pub fn new(cache: NamespaceNatCache) -> Self {
        Self { cache }
    }

    /// Remote name of a local namespace
    pub fn home_to_foreign(&self, local: &str) -> Result<String, NamespaceNotAvailable> {
        self.cache.read_forward(local)
    }

    /// Local name of a remote namespace
    pub fn foreign_to_local(&self, remote: &str) -> Result<String, NamespaceNotAvailable> {
        self.cache.read_backward(remote)
    }
}
