use std::{fs, path};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Missing or invalid config value: {0}")]
    Missing(String),
}

pub trait Configurable {
    fn config(&self) -> &toml::Value;

    // read configuration from toml config
    fn load_config(
        config_file_path: impl AsRef<path::Path>,
    ) -> Result<toml::Value, ConfigError> {
        let content: String = fs::read_to_string(config_file_path)?;
        let config: toml::Value = toml::from_str(&content)?;
        Ok(config)
    }

    /// Extract Value from config using dot notation i.e. "http.timeout"
    fn get_config_value(&self, key: &str) -> Option<&toml::Value> {
        let keys: Vec<&str> = key.split('.').collect();
        get_value_recursive(self.config(), &keys)
    }
}

/// Plain toml tables are configurable as-is.
impl Configurable for toml::Value {
    fn config(&self) -> &toml::Value {
        self
    }
}

fn get_value_recursive<'a>(
    config: &'a toml::Value,
    keys: &[&str],
) -> Option<&'a toml::Value> {
    let (key, remaining_keys) = keys.split_first()?;
    if key.is_empty() {
        return None;
    }
    let value = config.as_table()?.get(*key)?;
    if remaining_keys.is_empty() {
        Some(value)
    } else {
        get_value_recursive(value, remaining_keys)
    }
}
