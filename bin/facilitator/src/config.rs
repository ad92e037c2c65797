use std::path::PathBuf;

use facilitator_db::persistent::config::DbConfig;
use serde::{Deserialize, Serialize};

/// The configuration values that dictate the behavior of the facilitator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Config {
    /// The directory to store all the data in.
    pub datadir: PathBuf,

    /// The number of runtime worker threads.
    pub num_threads: Option<u8>,

    /// The configuration for the sqlite3 database.
    pub db: DbConfig,
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_config_serde_toml() {
        let config = r#"
            datadir = ".data"
            num_threads = 2

            [db]
            max_retry_count = 3
            backoff_period = { secs = 1, nanos = 0 }
        "#;

        let config = toml::from_str::<Config>(config);
        assert!(
            config.is_ok(),
            "must be able to deserialize config from toml but got: {}",
            config.unwrap_err()
        );

        let config = config.unwrap();
        assert_eq!(config.db.max_retry_count(), 3);
        assert_eq!(config.db.backoff_period(), Duration::from_secs(1));

        let serialized = toml::to_string(&config).unwrap();
        let deserialized = toml::from_str::<Config>(&serialized).unwrap();
        assert_eq!(
            deserialized, config,
            "must be able to serialize and deserialize config to toml"
        );
    }

    #[test]
    fn test_num_threads_is_optional() {
        let config = toml::from_str::<Config>(
            r#"
            datadir = ".data"

            [db]
            max_retry_count = 3
            backoff_period = { secs = 1, nanos = 0 }
        "#,
        )
        .unwrap();

        assert!(config.num_threads.is_none());
    }
}
