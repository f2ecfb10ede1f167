//! Synthetic value generation
//!
//! - [`registry`]: name → formatter function lookup
//! - [`builtin`]: the Faker-compatible formatter catalog, backed by `fake`
//! - [`providers`]: optional providers a column can attach (e.g. `barcode`)
//! - [`handle`]: seeded handles with `unique`/`optional`/`valid` layers and
//!   their per-unit cache
//! - [`resolver`]: the column-level entry point used by the transformer

pub mod builtin;
pub mod handle;
pub mod locale;
pub mod providers;
pub mod registry;
pub mod resolver;

pub use handle::{GeneratorCache, GeneratorFactory, GeneratorHandle, MAX_RETRIES};
pub use locale::Locale;
pub use providers::{GeneratorProvider, ProviderCatalog};
pub use registry::{Call, FormatterRegistry};
pub use resolver::{GeneratorResolver, Resolution};
