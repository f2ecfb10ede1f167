//! Name → formatter function registry
//!
//! Formatter methods are looked up by their camelCase name. A missing entry is
//! a normal outcome ([`GeneratorError::UnknownFormatter`]), not a failure of
//! the run.

use std::collections::HashMap;
use std::sync::Arc;

use rand::rngs::StdRng;

use crate::domain::errors::GeneratorError;
use crate::domain::value::Value;
use crate::generator::locale::Locale;

/// One formatter invocation
#[derive(Debug, Clone, Copy)]
pub struct Call<'a> {
    pub name: &'a str,
    pub locale: Locale,
    pub args: &'a [Value],
}

impl<'a> Call<'a> {
    pub fn new(name: &'a str, locale: Locale, args: &'a [Value]) -> Self {
        Self { name, locale, args }
    }

    /// Fails when more than `max` arguments were given
    pub fn at_most(&self, max: usize) -> Result<(), GeneratorError> {
        if self.args.len() > max {
            return Err(GeneratorError::invalid_args(
                self.name,
                format!("expected at most {max} arguments, got {}", self.args.len()),
            ));
        }
        Ok(())
    }

    /// Integer argument at `idx`, `default` when absent or NULL
    pub fn int_or(&self, idx: usize, default: i64) -> Result<i64, GeneratorError> {
        match self.args.get(idx) {
            None | Some(Value::Null) => Ok(default),
            Some(v) => v.as_i64().ok_or_else(|| self.type_error(idx, "an integer", v)),
        }
    }

    /// Optional integer argument
    pub fn int_opt(&self, idx: usize) -> Result<Option<i64>, GeneratorError> {
        match self.args.get(idx) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => v
                .as_i64()
                .map(Some)
                .ok_or_else(|| self.type_error(idx, "an integer", v)),
        }
    }

    /// Optional finite float argument; NaN and infinities are rejected
    pub fn float_opt(&self, idx: usize) -> Result<Option<f64>, GeneratorError> {
        match self.args.get(idx) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => v
                .as_f64()
                .filter(|f| f.is_finite())
                .map(Some)
                .ok_or_else(|| self.type_error(idx, "a finite number", v)),
        }
    }

    pub fn bool_or(&self, idx: usize, default: bool) -> Result<bool, GeneratorError> {
        match self.args.get(idx) {
            None | Some(Value::Null) => Ok(default),
            Some(v) => v.as_bool().ok_or_else(|| self.type_error(idx, "a boolean", v)),
        }
    }

    pub fn str_or<'b>(&'b self, idx: usize, default: &'b str) -> Result<&'b str, GeneratorError> {
        match self.args.get(idx) {
            None | Some(Value::Null) => Ok(default),
            Some(Value::Text(s)) => Ok(s),
            Some(v) => Err(self.type_error(idx, "a string", v)),
        }
    }

    fn type_error(&self, idx: usize, expected: &str, got: &Value) -> GeneratorError {
        GeneratorError::invalid_args(
            self.name,
            format!("argument {} must be {expected}, got '{got}'", idx + 1),
        )
    }
}

/// Signature every formatter implements
pub type FormatterFn =
    Arc<dyn Fn(&mut StdRng, &Call<'_>) -> Result<Value, GeneratorError> + Send + Sync>;

/// Formatter methods available to a generator handle
#[derive(Clone, Default)]
pub struct FormatterRegistry {
    formatters: HashMap<String, FormatterFn>,
}

impl FormatterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `f` under `name`, replacing any earlier entry
    pub fn register<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&mut StdRng, &Call<'_>) -> Result<Value, GeneratorError> + Send + Sync + 'static,
    {
        self.formatters.insert(name.to_string(), Arc::new(f));
    }

    pub fn get(&self, name: &str) -> Option<&FormatterFn> {
        self.formatters.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.formatters.contains_key(name)
    }

    /// Invokes `call.name`
    ///
    /// # Errors
    ///
    /// `UnknownFormatter` when nothing is registered under the name, or
    /// whatever the formatter itself returns.
    pub fn invoke(&self, rng: &mut StdRng, call: &Call<'_>) -> Result<Value, GeneratorError> {
        let f = self
            .get(call.name)
            .ok_or_else(|| GeneratorError::UnknownFormatter(call.name.to_string()))?;
        f(rng, call)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.formatters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.formatters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formatters.is_empty()
    }
}

impl std::fmt::Debug for FormatterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatterRegistry")
            .field("formatters", &self.names())
            .finish()
    }
}
