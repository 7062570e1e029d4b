use tracing::info;

use crate::settings::SettingsReader;

pub mod aws_logging;
pub mod db_client;
pub mod parameter_store;
pub mod s3_config;
pub mod settings;

/// Loads a JSON settings object stored in S3. The bucket name itself is a
/// secret resolved through [`parameter_store::resolve`]. Exits the process
/// when the settings cannot be loaded, there is nothing useful to run
/// without them.
pub async fn load_settings_from_s3<T>(bucket_param: &str, object_key: &str) -> T
where
    T: for<'de> serde::Deserialize<'de>,
{
    let bucket = match parameter_store::resolve(bucket_param, false).await {
        Ok(val) => val,
        Err(e) => {
            eprintln!("Failed to resolve {bucket_param} from env or SSM: {e:#}");
            std::process::exit(1);
        }
    };

    info!("Loading settings from S3: s3://{}/{}", bucket, object_key);
    match SettingsReader::read_config_from_s3::<T>(&bucket, object_key).await {
        Err(val) => {
            eprintln!("Failed to load settings from S3: {val:#}");
            std::process::exit(1);
        }
        Ok(val) => val,
    }
}
