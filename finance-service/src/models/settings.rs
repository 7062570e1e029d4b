use common::{aws_logging::LoggingConfig, db_client::DatabaseConfig};
use serde::{Deserialize, Serialize};

const DART_BASE_URL: &str = "https://opendart.fss.or.kr";
const DART_API_KEY: &str = "DART_API_KEY";

#[derive(Debug, Serialize, Deserialize)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub dart: DartConfig,
    #[serde(default)]
    pub listen: ListenConfig,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DartConfig {
    pub base_url: String,
    /// Environment variable or SSM parameter holding the API key
    pub api_key_param: String,
}

impl Default for DartConfig {
    fn default() -> Self {
        DartConfig {
            base_url: DART_BASE_URL.to_string(),
            api_key_param: DART_API_KEY.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        ListenConfig {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::settings::SettingsReader;

    #[test]
    fn test_settings_defaults() {
        let json = r#"{
            "database": {"name": "finance", "port": 5432, "host": "localhost", "user": "fin"},
            "logging": {"log_group": "finlens", "log_stream": "finance-service"}
        }"#;
        let settings = SettingsReader::parse::<Settings>(json).unwrap();
        assert_eq!(settings.dart.base_url, DART_BASE_URL);
        assert_eq!(settings.dart.api_key_param, DART_API_KEY);
        assert_eq!(settings.listen.port, 8000);
    }
}
