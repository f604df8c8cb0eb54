use std::{env, path::PathBuf};

/// Default number of shapes per persisted batch
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Settings for a generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Directory holding the file store.
    pub data_dir: PathBuf,
    /// Shapes per bulk write.
    pub batch_size: usize,
    /// Confirm fingerprint hits cell by cell during dedup.
    pub verify_matches: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            batch_size: DEFAULT_BATCH_SIZE,
            verify_matches: true,
        }
    }
}

impl GeneratorConfig {
    /// Builds a configuration from `POLYCUBE_*` environment variables, falling
    /// back to the defaults for anything unset.
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let data_dir = env::var("POLYCUBE_DATA")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);
        let batch_size = match env::var("POLYCUBE_BATCH_SIZE") {
            Ok(v) => v.parse()?,
            Err(_) => defaults.batch_size,
        };
        let verify_matches = match env::var("POLYCUBE_VERIFY") {
            Ok(v) => parse_flag(&v)?,
            Err(_) => defaults.verify_matches,
        };

        let config = Self {
            data_dir,
            batch_size,
            verify_matches,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.batch_size >= 1, "batch size must be >= 1");
        Ok(())
    }
}

fn parse_flag(value: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("invalid boolean value: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GeneratorConfig::default();
        assert_eq!(config.batch_size, 1000);
        assert!(config.verify_matches);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_batch_is_invalid() {
        let config = GeneratorConfig {
            batch_size: 0,
            ..GeneratorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("TRUE").unwrap());
        assert!(!parse_flag(" off ").unwrap());
        assert!(parse_flag("maybe").is_err());
    }
}
