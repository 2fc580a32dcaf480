//! 🔧 App Configuration: the sacred TOML-to-struct pipeline.
//!
//! 📡 "Config not found: We looked everywhere. Under the couch. Behind the fridge.
//! In the junk drawer. Nothing." (every developer at 3am) 🦆
//!
//! Three layers, later ones win:
//! 1. `SFBULK_*` environment variables, nested with `__`
//!    (`SFBULK_SALESFORCE__OBJECT=Account`)
//! 2. an optional TOML file
//! 3. whatever the caller merges on top (the CLI puts its flags here)
//!
//! ```toml
//! [source_config.File]
//! file_name = "accounts.csv"
//! has_headers = true
//!
//! [salesforce]
//! instance_url = "env://SF_INSTANCE_URL"
//! access_token = "env://SF_ACCESS_TOKEN"
//! object = "Account"
//!
//! [delivery]
//! bulk_size = 200
//! dry_run = true
//! ```

use std::path::Path;

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::backends::{FileSourceConfig, InMemorySourceConfig, SalesforceConfig};
use crate::delivery::DeliveryConfig;
use crate::error::BulkError;

pub const ENV_PREFIX: &str = "SFBULK_";
const SECRET_ENV_SCHEME: &str = "env://";

/// 📦 Everything one run needs to know, in one place.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub source_config: SourceConfig,
    pub salesforce: SalesforceConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

/// 🚰 Where the rows come from.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub enum SourceConfig {
    // -- 🔡 env vars arrive lowercased, hence the aliases
    #[serde(alias = "file")]
    File(FileSourceConfig),
    #[serde(alias = "in_memory", alias = "inmemory")]
    InMemory(InMemorySourceConfig),
}

impl AppConfig {
    /// 🔒 Swap `env://VAR` placeholders for the variable's value.
    pub fn resolve_secrets(&mut self) -> Result<(), BulkError> {
        self.salesforce.instance_url = resolve_secret(&self.salesforce.instance_url)?;
        self.salesforce.access_token = resolve_secret(&self.salesforce.access_token)?;
        Ok(())
    }
}

/// 🔒 `env://VAR` → `$VAR`. Anything else comes back as it went in.
/// A placeholder pointing at an unset (or empty) variable is a configuration error.
pub fn resolve_secret(value: &str) -> Result<String, BulkError> {
    let Some(var_name) = value.strip_prefix(SECRET_ENV_SCHEME) else {
        return Ok(value.to_string());
    };
    match std::env::var(var_name) {
        Ok(resolved) if !resolved.is_empty() => Ok(resolved),
        _ => Err(BulkError::config(format!(
            "environment variable `{var_name}` is unset or empty"
        ))),
    }
}

/// 🚀 Load the config: env vars, then the file (if any), then `overrides`.
///
/// 📐 No file means env vars and overrides only. We do not go looking for a default
/// file name, like assuming everyone wants pineapple on their pizza.
pub fn load_config(config_file_name: Option<&Path>, overrides: Figment) -> anyhow::Result<AppConfig> {
    info!(
        "🔧 Loading configuration: {}",
        config_file_name.map_or_else(|| "(no file)".to_string(), |p| p.display().to_string())
    );

    let config = Figment::new().merge(Env::prefixed(ENV_PREFIX).split("__"));
    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };
    let config = config.merge(overrides);

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}', {ENV_PREFIX}* environment variables \
             and command-line flags.",
            path.display()
        ),
        None => format!(
            "💀 Failed to parse configuration from {ENV_PREFIX}* environment variables and \
             command-line flags. No file was provided, so this one's all on them."
        ),
    };

    // ✅ or 💀, there is no try. Actually there is, it's called `?`
    config.extract().context(context_msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::FileFormat;
    use figment::providers::Serialized;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_test_config(contents: &str) -> NamedTempFile {
        // 🧪 Figment wants TOML from disk, like it's method acting.
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    const MINIMAL: &str = r#"
        [source_config.File]
        file_name = "accounts.csv"

        [salesforce]
        instance_url = "https://acme.my.salesforce.com"
        access_token = "token"
        object = "Account"
    "#;

    #[test]
    fn the_one_where_a_minimal_file_gets_every_default() {
        let file = write_test_config(MINIMAL);
        let app_config = load_config(Some(file.path()), Figment::new()).unwrap();

        assert_eq!(app_config.delivery, DeliveryConfig::default());
        assert_eq!(app_config.salesforce.api_version, "v58.0");
        match app_config.source_config {
            SourceConfig::File(file_config) => {
                assert_eq!(file_config.file_name, "accounts.csv");
                assert_eq!(file_config.format, FileFormat::Csv);
                assert!(!file_config.has_headers);
            }
            honestly_who_knows => panic!(
                "💀 Expected a File source, serde took us to {honestly_who_knows:?}. Plot twist energy."
            ),
        }
    }

    #[test]
    fn the_one_where_the_flags_outrank_the_file() {
        let file = write_test_config(&format!("{MINIMAL}\n[delivery]\nbulk_size = 50\ndry_run = false\n"));
        let overrides = Figment::new()
            .merge(Serialized::default("delivery.dry_run", true))
            .merge(Serialized::default("salesforce.external_id", "Ext_Id__c"));

        let app_config = load_config(Some(file.path()), overrides).unwrap();

        assert_eq!(app_config.delivery.bulk_size, 50);
        assert!(app_config.delivery.dry_run);
        assert_eq!(app_config.salesforce.external_id.as_deref(), Some("Ext_Id__c"));
    }

    #[test]
    fn the_one_where_no_file_and_no_flags_means_no_config() {
        let result = load_config(None, Figment::new());
        assert!(result.is_err());
    }

    #[test]
    fn the_one_where_env_placeholders_are_resolved() {
        // SAFETY: the variable name is unique to this test, nothing else reads or writes it.
        unsafe { std::env::set_var("SFBULK_TEST_RESOLVED_TOKEN", "00Dxx!from-env") };

        assert_eq!(
            resolve_secret("env://SFBULK_TEST_RESOLVED_TOKEN").unwrap(),
            "00Dxx!from-env"
        );
        assert_eq!(resolve_secret("plain-value").unwrap(), "plain-value");

        let err = resolve_secret("env://SFBULK_TEST_DEFINITELY_UNSET").unwrap_err();
        assert!(matches!(err, BulkError::Configuration(_)));
        assert!(err.to_string().contains("SFBULK_TEST_DEFINITELY_UNSET"));
    }
}
