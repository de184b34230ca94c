//! A name-keyed registry of provider constructors, so an embedding
//! application can resolve `"s3"` / `"osfstorage"` / `"filesystem"` strings
//! from a request into a live [`Provider`] without this crate knowing about
//! any concrete backend crate (none of `filegate-sbe-*` is a dependency of
//! `filegate` itself — they depend on it, not the reverse, the same
//! direction as libunftp's root crate and its `unftp-sbe-*` back-ends).

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{Error, ErrorKind, Result};
use crate::provider::Provider;
use crate::settings::Settings;

/// Builds a [`Provider`] from backend-specific configuration (typically an
/// already-parsed JSON blob carrying credentials and a base path).
pub type ProviderConstructor =
    Arc<dyn Fn(&Settings, &Value) -> Result<Arc<dyn Provider>> + Send + Sync>;

/// Maps backend names to the constructors that build them.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    constructors: HashMap<String, ProviderConstructor>,
}

impl ProviderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        ProviderRegistry::default()
    }

    /// Registers a constructor for `name`, overwriting any existing
    /// registration.
    pub fn register(&mut self, name: impl Into<String>, constructor: ProviderConstructor) {
        self.constructors.insert(name.into(), constructor);
    }

    /// Builds a provider instance by name.
    pub fn build(&self, name: &str, settings: &Settings, config: &Value) -> Result<Arc<dyn Provider>> {
        let constructor = self
            .constructors
            .get(name)
            .ok_or_else(|| Error::new(ErrorKind::InvalidParameters, format!("unknown provider: {name}")))?;
        constructor(settings, config)
    }

    /// The names of every registered backend.
    pub fn names(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn building_an_unregistered_name_is_invalid_parameters() {
        let registry = ProviderRegistry::new();
        let err = registry
            .build("nonexistent", &Settings::default(), &Value::Null)
            .unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidParameters);
    }

    #[test]
    fn names_reflects_registrations() {
        let mut registry = ProviderRegistry::new();
        registry.register("noop", Arc::new(|_settings, _config| Err(Error::not_found("unused"))));
        assert_eq!(registry.names(), vec!["noop"]);
    }
}
