use aws_config::BehaviorVersion;
use aws_sdk_cloudwatchlogs::{types::InputLogEvent, Client as CloudWatchClient};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

const CHANNEL_CAPACITY: usize = 1024;
const FLUSH_INTERVAL: Duration = Duration::from_secs(5);

fn default_level() -> String {
    "INFO".to_string()
}

fn default_batch_size() -> usize {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub log_group: String,
    pub log_stream: String,
    #[serde(default = "default_level")]
    pub level: String,
    /// Ship events to CloudWatch Logs in addition to the console
    #[serde(default)]
    pub cloudwatch: bool,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

#[derive(Debug, Serialize)]
struct LogEntry {
    #[serde(skip)]
    timestamp: i64,
    level: &'static str,
    target: String,
    message: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    fields: Map<String, Value>,
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: Map<String, Value>,
}

impl FieldVisitor {
    fn insert(&mut self, field: &Field, value: Value) {
        if field.name() == "message" {
            self.message = Some(match value {
                Value::String(text) => text,
                other => other.to_string(),
            });
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.insert(field, Value::String(format!("{value:?}")));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, Value::String(value.to_string()));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::from(value));
    }
}

/// Forwards events to a background task that batches them into
/// CloudWatch `PutLogEvents` calls.
struct CloudWatchLayer {
    sender: mpsc::Sender<LogEntry>,
}

impl CloudWatchLayer {
    fn spawn(log_group: String, log_stream: String, batch_size: usize) -> Self {
        let (sender, receiver) = mpsc::channel::<LogEntry>(CHANNEL_CAPACITY);
        tokio::spawn(ship_logs(log_group, log_stream, batch_size.max(1), receiver));
        CloudWatchLayer { sender }
    }
}

async fn ship_logs(
    log_group: String,
    log_stream: String,
    batch_size: usize,
    mut receiver: mpsc::Receiver<LogEntry>,
) {
    let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let client = CloudWatchClient::new(&config);

    // Both calls fail with ResourceAlreadyExists after the first deployment.
    let _ = client.create_log_group().log_group_name(&log_group).send().await;
    let _ = client
        .create_log_stream()
        .log_group_name(&log_group)
        .log_stream_name(&log_stream)
        .send()
        .await;

    let mut batch: Vec<InputLogEvent> = Vec::with_capacity(batch_size);
    let mut ticker = tokio::time::interval(FLUSH_INTERVAL);

    loop {
        tokio::select! {
            entry = receiver.recv() => match entry {
                Some(entry) => {
                    if let Some(event) = to_input_event(&entry) {
                        batch.push(event);
                    }
                    if batch.len() >= batch_size {
                        send_logs(&client, &log_group, &log_stream, &mut batch).await;
                    }
                }
                None => {
                    send_logs(&client, &log_group, &log_stream, &mut batch).await;
                    break;
                }
            },
            _ = ticker.tick() => {
                send_logs(&client, &log_group, &log_stream, &mut batch).await;
            }
        }
    }
}

fn to_input_event(entry: &LogEntry) -> Option<InputLogEvent> {
    let message = serde_json::to_string(entry).ok()?;
    InputLogEvent::builder()
        .timestamp(entry.timestamp)
        .message(message)
        .build()
        .ok()
}

async fn send_logs(
    client: &CloudWatchClient,
    log_group: &str,
    log_stream: &str,
    batch: &mut Vec<InputLogEvent>,
) {
    if batch.is_empty() {
        return;
    }

    let result = client
        .put_log_events()
        .log_group_name(log_group)
        .log_stream_name(log_stream)
        .set_log_events(Some(std::mem::take(batch)))
        .send()
        .await;

    // Reporting through tracing here would feed the failure back into this layer.
    if let Err(err) = result {
        eprintln!("Error sending logs to CloudWatch: {err:?}");
    }
}

impl<S> Layer<S> for CloudWatchLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let Some(message) = visitor.message else {
            return;
        };

        let metadata = event.metadata();
        let _ = self.sender.try_send(LogEntry {
            timestamp: Utc::now().timestamp_millis(),
            level: metadata.level().as_str(),
            target: metadata.target().to_string(),
            message,
            fields: visitor.fields,
        });
    }
}

fn parse_level(level: &str) -> Level {
    Level::from_str(level.trim()).unwrap_or(Level::INFO)
}

/// Installs the global subscriber: console output always, CloudWatch when
/// enabled. Must be called from inside a tokio runtime.
pub fn init_logger(settings: &LoggingConfig) -> anyhow::Result<()> {
    let level = LevelFilter::from_level(parse_level(&settings.level));

    let cloudwatch_layer = settings.cloudwatch.then(|| {
        CloudWatchLayer::spawn(
            settings.log_group.clone(),
            settings.log_stream.clone(),
            settings.batch_size,
        )
        .with_filter(level)
    });

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_filter(level);

    tracing_subscriber::registry()
        .with(cloudwatch_layer)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), Level::DEBUG);
        assert_eq!(parse_level("WARN"), Level::WARN);
        assert_eq!(parse_level("verbose"), Level::INFO);
    }

    #[test]
    fn test_logging_config_defaults() {
        let cfg: LoggingConfig =
            serde_json::from_str(r#"{"log_group": "finlens", "log_stream": "finance-service"}"#)
                .unwrap();
        assert_eq!(cfg.level, "INFO");
        assert!(!cfg.cloudwatch);
        assert_eq!(cfg.batch_size, 10);
    }

    #[test]
    fn test_log_entry_serializes_fields() {
        let mut fields = Map::new();
        fields.insert("corp_code".to_string(), Value::from("00126380"));
        let entry = LogEntry {
            timestamp: 0,
            level: "INFO",
            target: "finance_service".to_string(),
            message: "ratios saved".to_string(),
            fields,
        };
        let json: Value = serde_json::from_str(&serde_json::to_string(&entry).unwrap()).unwrap();
        assert_eq!(json["message"], "ratios saved");
        assert_eq!(json["fields"]["corp_code"], "00126380");
        assert!(json.get("timestamp").is_none());
    }
}
