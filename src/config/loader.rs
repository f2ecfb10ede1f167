//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{ForeignKeyPolicy, MasqueradeConfig};
use crate::config::secret_string;
use crate::domain::errors::MasqueradeError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into MasqueradeConfig
/// 4. Applies environment variable overrides (MASQUERADE_* prefix)
/// 5. Validates the configuration
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - A referenced environment variable is not set
/// - Configuration validation fails
pub fn load_config(path: impl AsRef<Path>) -> Result<MasqueradeConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MasqueradeError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        MasqueradeError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let config: MasqueradeConfig = toml::from_str(&contents)
        .map_err(|e| MasqueradeError::Configuration(format!("Failed to parse TOML: {e}")))?;

    finish(config)
}

/// Loads the configuration file if present, defaults otherwise
///
/// A missing file is only an error when `required` is set (the user named
/// the file explicitly). Environment overrides and validation always apply.
///
/// # Errors
///
/// Same as [`load_config`]
pub fn load_config_or_default(path: impl AsRef<Path>, required: bool) -> Result<MasqueradeConfig> {
    let path = path.as_ref();
    if path.exists() || required {
        return load_config(path);
    }

    tracing::debug!(path = %path.display(), "No configuration file, using defaults");
    finish(MasqueradeConfig::default())
}

fn finish(mut config: MasqueradeConfig) -> Result<MasqueradeConfig> {
    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        MasqueradeError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error listing every referenced variable that is not set
pub(crate) fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| MasqueradeError::Other(format!("Invalid substitution pattern: {e}")))?;
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    processed_line = processed_line.replace(&format!("${{{var_name}}}"), &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(MasqueradeError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using the MASQUERADE_* prefix
///
/// Variables follow the pattern `MASQUERADE_<SECTION>_<KEY>`, for example
/// `MASQUERADE_DATABASE_HOST` or `MASQUERADE_RUN_BATCH_SIZE`. Top-level keys
/// drop the section: `MASQUERADE_PLATFORM`, `MASQUERADE_LOCALE`,
/// `MASQUERADE_GROUP` (comma separated).
///
/// # Errors
///
/// Returns an error when a numeric or enum override cannot be parsed
fn apply_env_overrides(config: &mut MasqueradeConfig) -> Result<()> {
    if let Ok(val) = std::env::var("MASQUERADE_PLATFORM") {
        config.platform = Some(val);
    }
    if let Ok(val) = std::env::var("MASQUERADE_LOCALE") {
        config.locale = val;
    }
    if let Ok(val) = std::env::var("MASQUERADE_GROUP") {
        config.groups = split_list(&val);
    }

    // Database overrides
    if let Ok(val) = std::env::var("MASQUERADE_DATABASE_DRIVER") {
        config.database.driver = val;
    }
    if let Ok(val) = std::env::var("MASQUERADE_DATABASE_HOST") {
        config.database.host = Some(val);
    }
    if let Ok(val) = std::env::var("MASQUERADE_DATABASE_PORT") {
        config.database.port = parse_env("MASQUERADE_DATABASE_PORT", &val)?;
    }
    if let Ok(val) = std::env::var("MASQUERADE_DATABASE_DATABASE") {
        config.database.database = Some(val);
    }
    if let Ok(val) = std::env::var("MASQUERADE_DATABASE_USERNAME") {
        config.database.username = Some(val);
    }
    if let Ok(val) = std::env::var("MASQUERADE_DATABASE_PASSWORD") {
        config.database.password = Some(secret_string(val));
    }
    if let Ok(val) = std::env::var("MASQUERADE_DATABASE_PREFIX") {
        config.database.prefix = val;
    }
    if let Ok(val) = std::env::var("MASQUERADE_DATABASE_CHARSET") {
        config.database.charset = val;
    }

    // Run overrides
    if let Ok(val) = std::env::var("MASQUERADE_RUN_BATCH_SIZE") {
        config.run.batch_size = parse_env("MASQUERADE_RUN_BATCH_SIZE", &val)?;
    }
    if let Ok(val) = std::env::var("MASQUERADE_RUN_FOREIGN_KEY_CHECKS") {
        config.run.foreign_key_checks = val
            .parse::<ForeignKeyPolicy>()
            .map_err(MasqueradeError::Configuration)?;
    }
    if let Ok(val) = std::env::var("MASQUERADE_RUN_MAX_PARALLEL_GROUPS") {
        config.run.max_parallel_groups = parse_env("MASQUERADE_RUN_MAX_PARALLEL_GROUPS", &val)?;
    }
    if let Ok(val) = std::env::var("MASQUERADE_RUN_SEED") {
        config.run.seed = Some(parse_env("MASQUERADE_RUN_SEED", &val)?);
    }
    if let Ok(val) = std::env::var("MASQUERADE_RUN_PLATFORMS_DIR") {
        config.run.platforms_dir = val;
    }
    if let Ok(val) = std::env::var("MASQUERADE_RUN_OVERRIDE_DIR") {
        config.run.override_dir = val;
    }

    // Logging overrides
    if let Ok(val) = std::env::var("MASQUERADE_LOG_LEVEL") {
        config.logging.level = val;
    }
    if let Ok(val) = std::env::var("MASQUERADE_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("MASQUERADE_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}

fn parse_env<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| {
        MasqueradeError::Configuration(format!("Invalid value '{raw}' for {name}"))
    })
}

/// Splits a comma separated list, trimming entries and dropping empty ones
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Tests in this module touch process-wide environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_substitute_env_vars() {
        let _guard = ENV_MUTEX.lock().unwrap();
        std::env::set_var("MASQ_TEST_VAR", "test_value");
        let result = substitute_env_vars("password = \"${MASQ_TEST_VAR}\"").unwrap();
        assert_eq!(result, "password = \"test_value\"\n");
        std::env::remove_var("MASQ_TEST_VAR");
    }

    #[test]
    fn test_substitute_env_vars_skips_comments() {
        let _guard = ENV_MUTEX.lock().unwrap();
        std::env::remove_var("MASQ_COMMENTED_VAR");
        let result = substitute_env_vars("# password = \"${MASQ_COMMENTED_VAR}\"").unwrap();
        assert!(result.contains("${MASQ_COMMENTED_VAR}"));
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        let _guard = ENV_MUTEX.lock().unwrap();
        std::env::remove_var("MASQ_MISSING_VAR");
        let err = substitute_env_vars("password = \"${MASQ_MISSING_VAR}\"").unwrap_err();
        assert!(err.to_string().contains("MASQ_MISSING_VAR"));
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent-masquerade.toml");
        assert!(result.unwrap_err().is_configuration());
    }

    #[test]
    fn test_load_config_or_default_when_absent() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = load_config_or_default("nonexistent-masquerade.toml", false).unwrap();
        assert_eq!(config.run.batch_size, 100);

        assert!(load_config_or_default("nonexistent-masquerade.toml", true).is_err());
    }

    #[test]
    fn test_load_config_valid() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let toml_content = r#"
platform = "magento2"
locale = "fr_FR"

[database]
host = "localhost"
database = "shop"
username = "shop"
password = "secret"
prefix = "mg_"

[run]
batch_size = 250
seed = 7
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.platform.as_deref(), Some("magento2"));
        assert_eq!(config.locale, "fr_FR");
        assert_eq!(config.database.prefix, "mg_");
        assert_eq!(config.run.batch_size, 250);
        assert_eq!(config.run.seed, Some(7));
    }

    #[test]
    fn test_env_overrides_file_values() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[database]\nhost = \"from-file\"\n")
            .unwrap();
        temp_file.flush().unwrap();

        std::env::set_var("MASQUERADE_DATABASE_HOST", "from-env");
        std::env::set_var("MASQUERADE_GROUP", "customer, sales ,");
        let config = load_config(temp_file.path());
        std::env::remove_var("MASQUERADE_DATABASE_HOST");
        std::env::remove_var("MASQUERADE_GROUP");

        let config = config.unwrap();
        assert_eq!(config.database.host.as_deref(), Some("from-env"));
        assert_eq!(config.groups, vec!["customer", "sales"]);
    }

    #[test]
    fn test_invalid_numeric_override() {
        let _guard = ENV_MUTEX.lock().unwrap();
        std::env::set_var("MASQUERADE_RUN_BATCH_SIZE", "lots");
        let result = load_config_or_default("nonexistent-masquerade.toml", false);
        std::env::remove_var("MASQUERADE_RUN_BATCH_SIZE");

        assert!(result.unwrap_err().to_string().contains("MASQUERADE_RUN_BATCH_SIZE"));
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(" a, b ,,c "), vec!["a", "b", "c"]);
        assert!(split_list("").is_empty());
    }
}
