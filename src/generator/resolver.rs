//! Column → value resolution

use crate::domain::errors::GeneratorError;
use crate::domain::result::Result;
use crate::domain::table::{ColumnSpec, FormatterSpec};
use crate::domain::value::Value;
use crate::generator::handle::{GeneratorCache, GeneratorFactory};
use crate::generator::locale::Locale;
use crate::generator::providers::ProviderCatalog;

/// Outcome of resolving one column for one row
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Write this value
    Value(Value),
    /// The formatter could not be resolved; leave the column untouched
    Omit(GeneratorError),
    /// The column has no formatter
    Skip,
}

/// Turns column declarations into values, one execution unit at a time
#[derive(Debug)]
pub struct GeneratorResolver {
    cache: GeneratorCache,
}

impl GeneratorResolver {
    pub fn new(catalog: ProviderCatalog, locale: Locale, seed: Option<u64>) -> Self {
        Self {
            cache: GeneratorCache::new(GeneratorFactory::new(catalog, locale, seed)),
        }
    }

    /// Resolves `column` for the current row
    ///
    /// Fixed literals never touch a generator. Calls go through the handle
    /// memoized for the column's provider and modifiers.
    ///
    /// # Errors
    ///
    /// - `MasqueradeError::ProviderType` when the column names an unknown provider
    /// - `MasqueradeError::Generation` when `unique` or `valid` run out of retries
    pub fn resolve(&mut self, column: &ColumnSpec) -> Result<Resolution> {
        let (name, args) = match &column.formatter {
            None => return Ok(Resolution::Skip),
            Some(FormatterSpec::Fixed(literal)) => return Ok(Resolution::Value(literal.clone())),
            Some(FormatterSpec::Call { name, args }) => (name, args),
        };

        let handle = self
            .cache
            .handle(column.provider.as_deref(), column.modifiers)?;

        match handle.generate(name, args) {
            Ok(value) => Ok(Resolution::Value(value)),
            Err(miss) if miss.is_resolution_miss() => Ok(Resolution::Omit(miss)),
            Err(fatal) => Err(fatal.into()),
        }
    }

    /// Number of generator handles created so far
    pub fn handle_count(&self) -> usize {
        self.cache.handle_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::MasqueradeError;
    use crate::domain::table::Modifiers;

    fn resolver() -> GeneratorResolver {
        GeneratorResolver::new(ProviderCatalog::builtin(), Locale::EnUs, Some(3))
    }

    #[test]
    fn test_fixed_literal_needs_no_handle() {
        let mut resolver = resolver();
        let column = ColumnSpec::new("gender").with_formatter(FormatterSpec::Fixed(Value::Int(0)));
        for _ in 0..3 {
            assert_eq!(
                resolver.resolve(&column).unwrap(),
                Resolution::Value(Value::Int(0))
            );
        }
        assert_eq!(resolver.handle_count(), 0);
    }

    #[test]
    fn test_missing_formatter_skips() {
        let mut resolver = resolver();
        assert_eq!(
            resolver.resolve(&ColumnSpec::new("notes")).unwrap(),
            Resolution::Skip
        );
    }

    #[test]
    fn test_unknown_formatter_omits() {
        let mut resolver = resolver();
        let column = ColumnSpec::new("x").with_formatter(FormatterSpec::call("doesNotExist", vec![]));
        assert!(matches!(
            resolver.resolve(&column).unwrap(),
            Resolution::Omit(GeneratorError::UnknownFormatter(_))
        ));
    }

    #[test]
    fn test_unknown_provider_is_fatal() {
        let mut resolver = resolver();
        let column = ColumnSpec::new("x")
            .with_formatter(FormatterSpec::call("ean13", vec![]))
            .with_provider("NotAProvider");
        assert!(matches!(
            resolver.resolve(&column),
            Err(MasqueradeError::ProviderType(_))
        ));
    }

    #[test]
    fn test_unique_overflow_is_fatal() {
        let mut resolver = resolver();
        let column = ColumnSpec::new("flag")
            .with_formatter(FormatterSpec::call("boolean", vec![]))
            .with_modifiers(Modifiers {
                unique: true,
                ..Modifiers::default()
            });
        resolver.resolve(&column).unwrap();
        resolver.resolve(&column).unwrap();
        assert!(matches!(
            resolver.resolve(&column),
            Err(MasqueradeError::Generation(GeneratorError::UniqueOverflow { .. }))
        ));
    }
}
