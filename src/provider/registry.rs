// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Registry mapping provider type strings to handler factories.
//!
//! The registry is an explicit value owned by the shared context (never a
//! process-wide singleton) so tests construct fresh registries without any
//! cross-case state. It also enforces the administrative allow/deny lists
//! from the process configuration.

use crate::provider::HandlerFactory;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Why a provider type cannot be used.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeRejection {
    /// No factory is registered under the type string
    Unsupported,
    /// A factory exists but configuration disables the type
    Disabled,
}

/// Registry of handler factories with administrative gating.
pub struct HandlerRegistry {
    factories: BTreeMap<&'static str, Arc<dyn HandlerFactory>>,
    enabled_types: Option<BTreeSet<String>>,
    disabled_types: BTreeSet<String>,
}

impl HandlerRegistry {
    /// An empty registry with no gating.
    #[must_use]
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
            enabled_types: None,
            disabled_types: BTreeSet::new(),
        }
    }

    /// Restrict usable types to an allow-list. `None` allows all registered.
    pub fn set_enabled_types(&mut self, types: Option<BTreeSet<String>>) {
        self.enabled_types = types;
    }

    /// Deny-list individual types.
    pub fn set_disabled_types(&mut self, types: BTreeSet<String>) {
        self.disabled_types = types;
    }

    /// Register a factory under its provider type.
    pub fn register(&mut self, factory: Arc<dyn HandlerFactory>) {
        self.factories.insert(factory.provider_type(), factory);
    }

    /// Look up the factory for a provider type, applying the allow/deny
    /// lists.
    ///
    /// # Errors
    ///
    /// Returns [`TypeRejection::Unsupported`] for unknown types and
    /// [`TypeRejection::Disabled`] for administratively disabled ones.
    pub fn lookup(&self, provider_type: &str) -> Result<Arc<dyn HandlerFactory>, TypeRejection> {
        let factory = self
            .factories
            .get(provider_type)
            .ok_or(TypeRejection::Unsupported)?;
        if self.disabled_types.contains(provider_type) {
            return Err(TypeRejection::Disabled);
        }
        if let Some(enabled) = &self.enabled_types {
            if !enabled.contains(provider_type) {
                return Err(TypeRejection::Disabled);
            }
        }
        Ok(factory.clone())
    }

    /// All registered type strings.
    #[must_use]
    pub fn registered_types(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod registry_tests;
