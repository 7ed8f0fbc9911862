use std::{fmt, path::PathBuf, sync::Arc};

use anyhow::Result;
use serde_json::Value;
use shared_event_bus::{EventPublisher, EventRecord};
use shared_logging::{JsonLogger, LogLevel, LogRecord};

/// Builder for the risk crate's telemetry sinks.
pub struct RiskTelemetryBuilder {
    component: String,
    log_path: Option<PathBuf>,
    event_publisher: Option<Arc<dyn EventPublisher>>,
}

impl RiskTelemetryBuilder {
    /// Creates the builder for the named component.
    #[must_use]
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            log_path: None,
            event_publisher: None,
        }
    }

    /// Sets the JSONL log path.
    #[must_use]
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Sets the event publisher.
    #[must_use]
    pub fn event_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.event_publisher = Some(publisher);
        self
    }

    /// Builds the telemetry handle.
    pub fn build(self) -> Result<RiskTelemetry> {
        let logger = match self.log_path {
            Some(path) => Some(JsonLogger::new(path)?),
            None => None,
        };
        Ok(RiskTelemetry {
            inner: Arc::new(TelemetryInner {
                component: self.component,
                logger,
                publisher: self.event_publisher,
            }),
        })
    }
}

/// Telemetry handle shared across risk components. Cheap to clone.
#[derive(Clone)]
pub struct RiskTelemetry {
    inner: Arc<TelemetryInner>,
}

struct TelemetryInner {
    component: String,
    logger: Option<JsonLogger>,
    publisher: Option<Arc<dyn EventPublisher>>,
}

impl fmt::Debug for RiskTelemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RiskTelemetry")
            .field("component", &self.inner.component)
            .finish()
    }
}

impl RiskTelemetry {
    /// Returns a builder for the named component.
    #[must_use]
    pub fn builder(component: impl Into<String>) -> RiskTelemetryBuilder {
        RiskTelemetryBuilder::new(component)
    }

    /// Writes a structured log line; object payloads become record fields.
    pub fn log(&self, level: LogLevel, message: &str, fields: Value) -> Result<()> {
        if let Some(logger) = &self.inner.logger {
            let mut record = LogRecord::new(&self.inner.component, level, message);
            if let Value::Object(map) = fields {
                record = record.with_fields(map);
            }
            logger.log(&record)?;
        }
        Ok(())
    }

    /// Publishes an event to the bus, if one is attached. Inside a tokio
    /// runtime the publish is spawned; otherwise it completes inline.
    pub fn event(&self, kind: &str, payload: Value) -> Result<()> {
        if let Some(publisher) = &self.inner.publisher {
            let record = EventRecord::new(&self.inner.component, kind, payload);
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                let publisher = Arc::clone(publisher);
                handle.spawn(async move {
                    if let Err(err) = publisher.publish(record).await {
                        eprintln!("telemetry event publish failed: {err:?}");
                    }
                });
            } else {
                futures::executor::block_on(publisher.publish(record))?;
            }
        }
        Ok(())
    }
}
