use anyhow::{Context, Result};
use aws_config::BehaviorVersion;
use aws_sdk_ssm::Client;
use std::env;
use tracing::debug;

/// AWS Systems Manager Parameter Store client
pub struct ParameterStore {
    client: Client,
}

impl ParameterStore {
    pub async fn new() -> Self {
        let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        Self::with_config(&config)
    }

    pub fn with_config(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }

    /// Get a parameter value by its full path, e.g. "/finlens/DART_API_KEY"
    pub async fn get_parameter(&self, path: &str, decrypt: bool) -> Result<String> {
        let response = self
            .client
            .get_parameter()
            .name(path)
            .with_decryption(decrypt)
            .send()
            .await
            .with_context(|| format!("Failed to get parameter: {path}"))?;

        response
            .parameter
            .and_then(|p| p.value)
            .with_context(|| format!("Parameter has no value: {path}"))
    }
}

fn parameter_path(name: &str) -> String {
    if name.starts_with('/') {
        name.to_string()
    } else {
        format!("/{name}")
    }
}

fn from_env(name: &str) -> Option<String> {
    let key = name.trim_start_matches('/').replace('/', "_");
    env::var(key).ok().filter(|val| !val.is_empty())
}

/// Resolves a secret or deployment parameter. A non-empty environment
/// variable of the same name wins; otherwise the value is read from SSM.
pub async fn resolve(name: &str, decrypt: bool) -> Result<String> {
    if let Some(val) = from_env(name) {
        debug!("Resolved {name} from environment");
        return Ok(val);
    }
    let store = ParameterStore::new().await;
    store.get_parameter(&parameter_path(name), decrypt).await
}
