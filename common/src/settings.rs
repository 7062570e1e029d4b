use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

#[derive(Debug)]
pub struct SettingsReader {}

impl SettingsReader {
    /// Read settings from a local JSON file
    pub fn read_config_file<Settings>(path: &str) -> Result<Settings>
    where
        Settings: for<'de> Deserialize<'de>,
    {
        let contents =
            fs::read_to_string(path).with_context(|| format!("Failed to read settings file {path}"))?;
        Self::parse::<Settings>(&contents).with_context(|| format!("Invalid settings in {path}"))
    }

    pub fn parse<Settings>(contents: &str) -> Result<Settings>
    where
        Settings: for<'de> Deserialize<'de>,
    {
        Ok(serde_json::from_str(contents)?)
    }

    /// Read settings from S3 bucket
    pub async fn read_config_from_s3<Settings>(
        bucket_name: &str,
        object_key: &str,
    ) -> Result<Settings>
    where
        Settings: for<'de> Deserialize<'de>,
    {
        crate::s3_config::read_json_config_from_s3(bucket_name, object_key).await
    }
}
