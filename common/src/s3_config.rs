use anyhow::{Context, Result};
use aws_config::BehaviorVersion;
use serde::Deserialize;

/// Reads deployment settings stored as S3 objects
pub struct S3ConfigReader {
    client: aws_sdk_s3::Client,
}

impl S3ConfigReader {
    pub async fn new() -> Self {
        let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        Self::with_config(&config)
    }

    pub fn with_config(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_s3::Client::new(config),
        }
    }

    async fn read_object(&self, bucket: &str, key: &str) -> Result<String> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("Failed to fetch s3://{bucket}/{key}"))?;

        let body = response
            .body
            .collect()
            .await
            .with_context(|| format!("Failed to read response body from s3://{bucket}/{key}"))?;

        String::from_utf8(body.into_bytes().to_vec())
            .with_context(|| format!("s3://{bucket}/{key} is not valid UTF-8"))
    }

    pub async fn read_json_config<T>(&self, bucket: &str, key: &str) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let contents = self.read_object(bucket, key).await?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings JSON from s3://{bucket}/{key}"))
    }
}

pub async fn read_json_config_from_s3<T>(bucket: &str, key: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    S3ConfigReader::new()
        .await
        .read_json_config::<T>(bucket, key)
        .await
}
