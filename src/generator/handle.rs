//! Generator handles and the modifiers that decorate them
//!
//! A [`GeneratorHandle`] owns a random source, a formatter registry (built-ins
//! plus at most one provider) and a modifier set. Modifiers wrap the base
//! call in this order, innermost first:
//!
//! 1. `unique`: retry until the value was not produced before by the same
//!    method and arguments on this handle
//! 2. `optional`: NULL with probability 0.5, otherwise the value from (1)
//! 3. `valid`: retry (2) until the value is neither NULL nor empty text
//!
//! Handles are memoized per (locale, provider, modifiers) by
//! [`GeneratorCache`], so every column sharing that key shares one `unique`
//! history for the lifetime of the execution unit.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::errors::GeneratorError;
use crate::domain::result::Result;
use crate::domain::table::Modifiers;
use crate::domain::value::Value;
use crate::generator::builtin::register_builtins;
use crate::generator::locale::Locale;
use crate::generator::providers::ProviderCatalog;
use crate::generator::registry::{Call, FormatterRegistry};

/// Attempts `unique` and `valid` make before giving up
pub const MAX_RETRIES: usize = 10_000;

/// A seeded generator with its modifier layers
pub struct GeneratorHandle {
    registry: Arc<FormatterRegistry>,
    rng: StdRng,
    locale: Locale,
    modifiers: Modifiers,
    /// Identities produced so far, per method + arguments
    seen: HashMap<String, HashSet<String>>,
}

impl GeneratorHandle {
    pub fn new(
        registry: Arc<FormatterRegistry>,
        rng: StdRng,
        locale: Locale,
        modifiers: Modifiers,
    ) -> Self {
        Self {
            registry,
            rng,
            locale,
            modifiers,
            seen: HashMap::new(),
        }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Produces one value for `name(args)` through the modifier layers
    ///
    /// # Errors
    ///
    /// Resolution misses (`UnknownFormatter`, `InvalidArguments`) surface
    /// immediately without retrying; `UniqueOverflow`/`ValidOverflow` when a
    /// modifier cannot be satisfied within [`MAX_RETRIES`] attempts.
    pub fn generate(
        &mut self,
        name: &str,
        args: &[Value],
    ) -> std::result::Result<Value, GeneratorError> {
        if !self.modifiers.valid {
            return self.optional_layer(name, args);
        }

        for _ in 0..MAX_RETRIES {
            let value = self.optional_layer(name, args)?;
            if value.is_present() {
                return Ok(value);
            }
        }
        Err(GeneratorError::ValidOverflow {
            formatter: name.to_string(),
            attempts: MAX_RETRIES,
        })
    }

    fn optional_layer(
        &mut self,
        name: &str,
        args: &[Value],
    ) -> std::result::Result<Value, GeneratorError> {
        if self.modifiers.optional && self.rng.random_bool(0.5) {
            // The call must still resolve, otherwise a bad column writes NULLs
            self.base(name, args)?;
            return Ok(Value::Null);
        }
        self.unique_layer(name, args)
    }

    fn unique_layer(
        &mut self,
        name: &str,
        args: &[Value],
    ) -> std::result::Result<Value, GeneratorError> {
        if !self.modifiers.unique {
            return self.base(name, args);
        }

        let key = call_key(name, args);
        for _ in 0..MAX_RETRIES {
            let value = self.base(name, args)?;
            if self.seen.entry(key.clone()).or_default().insert(value.identity()) {
                return Ok(value);
            }
        }
        Err(GeneratorError::UniqueOverflow {
            formatter: name.to_string(),
            attempts: MAX_RETRIES,
        })
    }

    fn base(&mut self, name: &str, args: &[Value]) -> std::result::Result<Value, GeneratorError> {
        let call = Call::new(name, self.locale, args);
        self.registry.invoke(&mut self.rng, &call)
    }
}

fn call_key(name: &str, args: &[Value]) -> String {
    let args: Vec<String> = args.iter().map(Value::identity).collect();
    format!("{name}({})", args.join(","))
}

impl std::fmt::Debug for GeneratorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorHandle")
            .field("locale", &self.locale)
            .field("modifiers", &self.modifiers)
            .field("tracked_methods", &self.seen.len())
            .finish()
    }
}

/// Creates handles for one execution unit
///
/// With a seed, the n-th handle created is seeded with `seed + n`, so a run
/// over the same configuration and data is reproducible.
#[derive(Debug)]
pub struct GeneratorFactory {
    base: Arc<FormatterRegistry>,
    catalog: ProviderCatalog,
    locale: Locale,
    seed: Option<u64>,
    created: u64,
}

impl GeneratorFactory {
    pub fn new(catalog: ProviderCatalog, locale: Locale, seed: Option<u64>) -> Self {
        let mut base = FormatterRegistry::new();
        register_builtins(&mut base);
        Self {
            base: Arc::new(base),
            catalog,
            locale,
            seed,
            created: 0,
        }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Builds a new handle
    ///
    /// # Errors
    ///
    /// Returns `MasqueradeError::ProviderType` if `provider` is not in the
    /// catalog.
    pub fn create(&mut self, provider: Option<&str>, modifiers: Modifiers) -> Result<GeneratorHandle> {
        let registry = match provider {
            None => Arc::clone(&self.base),
            Some(id) => {
                let provider = self.catalog.get(id)?;
                let mut registry = (*self.base).clone();
                provider.register(&mut registry);
                Arc::new(registry)
            }
        };

        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(self.created)),
            None => StdRng::from_os_rng(),
        };
        self.created += 1;

        tracing::debug!(
            locale = %self.locale,
            provider = provider.unwrap_or("-"),
            unique = modifiers.unique,
            optional = modifiers.optional,
            valid = modifiers.valid,
            "Created generator handle"
        );

        Ok(GeneratorHandle::new(registry, rng, self.locale, modifiers))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct HandleKey {
    locale: Locale,
    provider: Option<String>,
    modifiers: Modifiers,
}

/// Lazily created handles of one execution unit
#[derive(Debug)]
pub struct GeneratorCache {
    factory: GeneratorFactory,
    handles: HashMap<HandleKey, GeneratorHandle>,
}

impl GeneratorCache {
    pub fn new(factory: GeneratorFactory) -> Self {
        Self {
            factory,
            handles: HashMap::new(),
        }
    }

    /// Returns the handle for `(provider, modifiers)`, creating it on first use
    ///
    /// # Errors
    ///
    /// Returns `MasqueradeError::ProviderType` if `provider` is unknown.
    pub fn handle(
        &mut self,
        provider: Option<&str>,
        modifiers: Modifiers,
    ) -> Result<&mut GeneratorHandle> {
        let key = HandleKey {
            locale: self.factory.locale(),
            provider: provider.map(ToString::to_string),
            modifiers,
        };

        match self.handles.entry(key) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let handle = self.factory.create(provider, modifiers)?;
                Ok(entry.insert(handle))
            }
        }
    }

    /// Number of distinct handles created so far
    pub fn handle_count(&self) -> usize {
        self.handles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle_with(modifiers: Modifiers, registry: FormatterRegistry) -> GeneratorHandle {
        GeneratorHandle::new(
            Arc::new(registry),
            StdRng::seed_from_u64(5),
            Locale::EnUs,
            modifiers,
        )
    }

    fn digits() -> FormatterRegistry {
        let mut registry = FormatterRegistry::new();
        registry.register("digit", |rng, _| Ok(Value::Int(rng.random_range(0..10))));
        registry.register("blank", |_, _| Ok(Value::Text(String::new())));
        registry
    }

    #[test]
    fn test_unique_never_repeats_and_overflows() {
        let mut handle = handle_with(
            Modifiers {
                unique: true,
                ..Modifiers::default()
            },
            digits(),
        );

        let mut seen = HashSet::new();
        for _ in 0..10 {
            let v = handle.generate("digit", &[]).unwrap();
            assert!(seen.insert(v.identity()));
        }

        let err = handle.generate("digit", &[]).unwrap_err();
        assert!(matches!(err, GeneratorError::UniqueOverflow { .. }));
        assert!(!err.is_resolution_miss());
    }

    #[test]
    fn test_unique_history_is_per_arguments() {
        let mut handle = handle_with(
            Modifiers {
                unique: true,
                ..Modifiers::default()
            },
            digits(),
        );
        for _ in 0..10 {
            handle.generate("digit", &[]).unwrap();
        }
        // Same method, different arguments: fresh history
        assert!(handle.generate("digit", &[Value::Int(1)]).is_ok());
    }

    #[test]
    fn test_optional_yields_some_nulls() {
        let mut handle = handle_with(
            Modifiers {
                optional: true,
                ..Modifiers::default()
            },
            digits(),
        );
        let nulls = (0..200)
            .filter(|_| handle.generate("digit", &[]).unwrap().is_null())
            .count();
        assert!(nulls > 50 && nulls < 150, "got {nulls} nulls");
    }

    #[test]
    fn test_valid_filters_nulls_from_optional() {
        let mut handle = handle_with(
            Modifiers {
                optional: true,
                valid: true,
                ..Modifiers::default()
            },
            digits(),
        );
        for _ in 0..100 {
            assert!(!handle.generate("digit", &[]).unwrap().is_null());
        }
    }

    #[test]
    fn test_valid_overflow() {
        let mut handle = handle_with(
            Modifiers {
                valid: true,
                ..Modifiers::default()
            },
            digits(),
        );
        let err = handle.generate("blank", &[]).unwrap_err();
        assert!(matches!(err, GeneratorError::ValidOverflow { .. }));
    }

    #[test]
    fn test_unknown_method_is_a_miss_even_when_optional() {
        let mut handle = handle_with(
            Modifiers {
                optional: true,
                unique: true,
                valid: true,
            },
            digits(),
        );
        for _ in 0..20 {
            let err = handle.generate("nope", &[]).unwrap_err();
            assert!(err.is_resolution_miss());
        }
    }

    #[test]
    fn test_invalid_arguments_are_a_miss_under_every_modifier() {
        let mut registry = digits();
        registry.register("below", |rng, call| {
            let max = call.int_or(0, 9)?;
            Ok(Value::Int(rng.random_range(0..=max)))
        });

        for (unique, optional, valid) in [
            (false, true, false),
            (true, true, false),
            (false, true, true),
            (true, true, true),
            (false, false, true),
        ] {
            let mut handle = handle_with(
                Modifiers {
                    unique,
                    optional,
                    valid,
                },
                registry.clone(),
            );
            for _ in 0..20 {
                let err = handle.generate("below", &[Value::from("low")]).unwrap_err();
                assert!(err.is_resolution_miss(), "{err}");
            }
        }
    }

    #[test]
    fn test_seeded_factory_is_reproducible() {
        let mut a = GeneratorFactory::new(ProviderCatalog::builtin(), Locale::EnUs, Some(9));
        let mut b = GeneratorFactory::new(ProviderCatalog::builtin(), Locale::EnUs, Some(9));

        let mut ha = a.create(None, Modifiers::none()).unwrap();
        let mut hb = b.create(None, Modifiers::none()).unwrap();
        for _ in 0..5 {
            assert_eq!(
                ha.generate("safeEmail", &[]).unwrap(),
                hb.generate("safeEmail", &[]).unwrap()
            );
        }
    }

    #[test]
    fn test_provider_methods_only_on_provider_handles() {
        let mut factory = GeneratorFactory::new(ProviderCatalog::builtin(), Locale::EnUs, Some(1));

        let mut plain = factory.create(None, Modifiers::none()).unwrap();
        assert!(plain.generate("ean13", &[]).unwrap_err().is_resolution_miss());

        let mut barcode = factory.create(Some("barcode"), Modifiers::none()).unwrap();
        assert!(barcode.generate("ean13", &[]).is_ok());
        assert!(barcode.generate("firstName", &[]).is_ok());

        assert!(factory.create(Some("nope"), Modifiers::none()).is_err());
    }

    #[test]
    fn test_cache_memoizes_by_key() {
        let factory = GeneratorFactory::new(ProviderCatalog::builtin(), Locale::FrFr, None);
        let mut cache = GeneratorCache::new(factory);

        let unique = Modifiers {
            unique: true,
            ..Modifiers::default()
        };
        cache.handle(None, unique).unwrap();
        cache.handle(None, unique).unwrap();
        cache.handle(None, Modifiers::none()).unwrap();
        cache.handle(Some("barcode"), unique).unwrap();

        assert_eq!(cache.handle_count(), 3);
        assert_eq!(cache.handle(None, unique).unwrap().locale(), Locale::FrFr);
    }
}
