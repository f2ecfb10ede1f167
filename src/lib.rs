// Masquerade - Database Anonymization Tool
// Copyright (c) 2025 Masquerade Contributors
// Licensed under the MIT License

//! # Masquerade - database anonymization
//!
//! Masquerade overwrites personal data in a database copy with realistic
//! fake values, driven by per-platform configuration files.
//!
//! ## Overview
//!
//! - **Configure** which tables and columns to rewrite, grouped by concern
//!   (`customer`, `sales`, ...), with local overrides merged per table
//! - **Generate** values through named formatters (`firstName`, `safeEmail`,
//!   `numberBetween`, ...) with `unique`, `optional` and `valid` modifiers
//! - **Update** rows in primary key order, in batches, one group per worker
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Anonymization engine (schema check, transform, orchestration)
//! - [`generator`] - Formatter registry, providers and modifier layers
//! - [`adapters`] - Database access (trait-based, PostgreSQL implementation)
//! - [`domain`] - Core domain types, values and errors
//! - [`config`] - Application and platform configuration
//! - [`logging`] - Structured logging and observability
//!
//! ## Platform configuration
//!
//! ```toml
//! [customer.customer_entity]
//! pk = "entity_id"
//!
//! [customer.customer_entity.columns]
//! firstname = "firstName"
//! email = { formatter = "safeEmail", unique = true, nullColumnBeforeRun = true }
//! dob = { formatter = { name = "date", args = ["Y-m-d", "2005-12-31"] }, optional = true }
//! gender = { formatter = { name = "fixed", value = 0 } }
//! ```
//!
//! ## Generating values
//!
//! ```rust
//! use masquerade::domain::{ColumnSpec, FormatterSpec, Modifiers};
//! use masquerade::generator::{GeneratorResolver, Locale, ProviderCatalog, Resolution};
//!
//! let mut resolver = GeneratorResolver::new(ProviderCatalog::builtin(), Locale::EnUs, Some(7));
//! let column = ColumnSpec::new("email")
//!     .with_formatter(FormatterSpec::call("safeEmail", vec![]))
//!     .with_modifiers(Modifiers { unique: true, ..Modifiers::none() });
//!
//! match resolver.resolve(&column).unwrap() {
//!     Resolution::Value(value) => println!("{value}"),
//!     other => println!("{other:?}"),
//! }
//! ```
//!
//! ## Error Handling
//!
//! All fallible operations return [`domain::Result`] with a
//! [`domain::MasqueradeError`]. Schema drift and unknown formatters are not
//! errors: they are logged, reported in the run summary and skipped.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod generator;
pub mod logging;
