//! Custom generator providers
//!
//! A provider adds extra formatter methods to a generator handle. Columns opt
//! in with `provider = "<id>"`; the identifier must name an entry of the
//! [`ProviderCatalog`], otherwise resolution fails with a provider type error.

pub mod barcode;

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::errors::MasqueradeError;
use crate::domain::result::Result;
use crate::generator::registry::FormatterRegistry;

/// A set of formatter methods attachable to a generator
pub trait GeneratorProvider: Send + Sync {
    /// Catalog identifier used in column definitions
    fn id(&self) -> &'static str;

    /// Adds the provider's methods to `registry`
    fn register(&self, registry: &mut FormatterRegistry);
}

/// Known providers by identifier
#[derive(Clone, Default)]
pub struct ProviderCatalog {
    providers: BTreeMap<String, Arc<dyn GeneratorProvider>>,
}

impl ProviderCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Catalog with every provider shipped with the crate
    pub fn builtin() -> Self {
        let mut catalog = Self::empty();
        catalog.add(barcode::BarcodeProvider);
        catalog
    }

    pub fn add(&mut self, provider: impl GeneratorProvider + 'static) {
        self.providers
            .insert(provider.id().to_string(), Arc::new(provider));
    }

    /// Looks a provider up by identifier
    ///
    /// # Errors
    ///
    /// Returns `MasqueradeError::ProviderType` when `id` names no provider.
    pub fn get(&self, id: &str) -> Result<Arc<dyn GeneratorProvider>> {
        self.providers.get(id).cloned().ok_or_else(|| {
            MasqueradeError::ProviderType(format!(
                "'{id}' is not a generator provider (known: {})",
                self.ids().join(", ")
            ))
        })
    }

    pub fn ids(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for ProviderCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderCatalog")
            .field("providers", &self.ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog() {
        let catalog = ProviderCatalog::builtin();
        assert_eq!(catalog.ids(), vec!["barcode"]);
        assert!(catalog.get("barcode").is_ok());
    }

    #[test]
    fn test_unknown_provider_is_provider_type_error() {
        let catalog = ProviderCatalog::builtin();
        let err = catalog.get("Acme\\NotAProvider").err().unwrap();
        assert!(matches!(err, MasqueradeError::ProviderType(_)));
        assert!(err.to_string().contains("barcode"));
    }
}
