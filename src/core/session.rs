//! The protocol session: declare measurement points, start, inject, close.
//!
//! A `Session` owns its resolved configuration, the schema registry, the
//! lifecycle state and the output sink. The sink is acquired by `start` and
//! released by `close`; dropping a started session releases it as well.
//!
//! # Examples
//!
//! ```ignore
//! let mut session = Session::new(SessionArgs::new("app").domain("exp"))?;
//! session.add_mp("fft", "freq:long amplitude:double")?;
//! session.start().await?;
//! session.inject("fft", &oml_values![100i64, 2.5]).await?;
//! session.close().await?;
//! ```

use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{debug, info, instrument, trace, warn};

use super::{
    clock::{Clock, SystemClock},
    error::{OmlError, Result},
    protocol::{self, Header},
    schema::{is_valid_name, Schema, SchemaRegistry, METADATA_POINT},
    settings::{Environment, SessionArgs, SessionConfig},
    sink::{NetworkSink, Sink, StdoutSink},
    state::SessionState,
    types::Value,
};

/// What a metadata entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataSubject<'a> {
    /// The experiment as a whole.
    Experiment,
    /// A declared measurement point.
    Point(&'a str),
    /// One field of a declared measurement point.
    Field { point: &'a str, field: &'a str },
}

/// A single client session of the OML text protocol.
pub struct Session {
    config: SessionConfig,
    registry: SchemaRegistry,
    state: SessionState,
    sink: Option<Box<dyn Sink>>,
    clock: Arc<dyn Clock>,
    start_time: Option<OffsetDateTime>,
}

impl Session {
    /// Initializes a session, falling back to the process environment for
    /// anything not given explicitly.
    ///
    /// # Errors
    ///
    /// See [`SessionConfig::resolve`].
    pub fn new(args: SessionArgs) -> Result<Self> {
        Self::with_environment(args, &Environment::capture())
    }

    /// Initializes a session against an explicit environment snapshot.
    pub fn with_environment(args: SessionArgs, env: &Environment) -> Result<Self> {
        let config = SessionConfig::resolve(args, env)?;
        Ok(Self::from_config(config))
    }

    /// Creates a session from an already resolved configuration.
    pub fn from_config(config: SessionConfig) -> Self {
        match &config.target {
            Some(target) => debug!("Session '{}' will report to {}", config.app_name, target),
            None => warn!(
                "No collection target for '{}'; measurements will be written to stdout",
                config.app_name
            ),
        }
        Session {
            config,
            registry: SchemaRegistry::new(),
            state: SessionState::Created,
            sink: None,
            clock: Arc::new(SystemClock),
            start_time: None,
        }
    }

    /// Replaces the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// True when output goes to stdout instead of a collection endpoint.
    pub fn is_disabled(&self) -> bool {
        self.config.is_disabled()
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Time origin of the session, set by `start`.
    pub fn start_time(&self) -> Option<OffsetDateTime> {
        self.start_time
    }

    fn require(&self, operation: &'static str, allowed: bool) -> Result<()> {
        if allowed {
            Ok(())
        } else {
            Err(OmlError::ProtocolState {
                operation,
                state: self.state,
            })
        }
    }

    /// Declares a measurement point and returns its schema index.
    ///
    /// # Errors
    ///
    /// * `OmlError::ProtocolState` unless the session is `CREATED`.
    /// * `OmlError::DuplicateSchema`, `OmlError::InvalidSchema` or
    ///   `OmlError::UnsupportedType` from schema parsing.
    pub fn add_mp(&mut self, name: &str, schema: &str) -> Result<u32> {
        self.require("addmp", self.state.accepts_declarations())?;
        let index = self.registry.declare(name, schema)?;
        debug!("Declared measurement point '{}' as schema {}", name, index);
        Ok(index)
    }

    /// Opens the sink chosen by the configuration and sends the header.
    ///
    /// # Errors
    ///
    /// * `OmlError::ProtocolState` unless the session is `CREATED`.
    /// * `OmlError::Connection` if the endpoint cannot be reached.
    /// * `OmlError::Transport` if the header cannot be written.
    #[instrument(skip_all, fields(app = %self.config.app_name))]
    pub async fn start(&mut self) -> Result<()> {
        self.require("start", self.state.accepts_declarations())?;
        let sink: Box<dyn Sink> = match &self.config.target {
            Some(target) => Box::new(NetworkSink::connect(target).await?),
            None => Box::new(StdoutSink::new()),
        };
        self.start_with_sink(sink).await
    }

    /// Starts the session on a caller-provided sink.
    ///
    /// On failure the sink is dropped and the session stays `CREATED`.
    pub async fn start_with_sink(&mut self, mut sink: Box<dyn Sink>) -> Result<()> {
        self.require("start", self.state.accepts_declarations())?;

        let now = self.clock.now();
        // The origin is truncated to whole seconds, as announced in the header.
        let start = OffsetDateTime::from_unix_timestamp(now.unix_timestamp()).unwrap_or(now);
        let header = Header {
            domain: self.config.domain.as_deref(),
            app_name: &self.config.app_name,
            sender_id: self.config.node.as_deref(),
            start_time: start.unix_timestamp(),
        }
        .encode(&self.registry);

        sink.write_all(header.as_bytes())
            .await
            .map_err(OmlError::Transport)?;

        info!(
            "Session started on {} with {} measurement point(s)",
            sink.describe(),
            self.registry.declared()
        );
        self.sink = Some(sink);
        self.start_time = Some(start);
        self.state = SessionState::Started;
        Ok(())
    }

    fn elapsed(&self) -> f64 {
        match self.start_time {
            Some(start) => (self.clock.now() - start).as_seconds_f64().max(0.0),
            None => 0.0,
        }
    }

    async fn emit(&mut self, line: &str) -> Result<()> {
        let sink = self.sink.as_mut().ok_or(OmlError::ProtocolState {
            operation: "inject",
            state: self.state,
        })?;
        sink.write_all(line.as_bytes())
            .await
            .map_err(OmlError::Transport)
    }

    /// Encodes one sample for `name` and writes it to the sink.
    ///
    /// Nothing is written and no sequence number is consumed unless every
    /// value matches the declared schema.
    ///
    /// # Errors
    ///
    /// * `OmlError::ProtocolState` unless the session is `STARTED`.
    /// * `OmlError::UnknownMeasurementPoint` for an undeclared point.
    /// * `OmlError::TypeMismatch` for a wrong arity or an unconvertible value.
    /// * `OmlError::Transport` if the write fails.
    pub async fn inject(&mut self, name: &str, values: &[Value]) -> Result<()> {
        self.require("inject", self.state.accepts_injections())?;
        let point = self
            .registry
            .get(name)
            .filter(|p| p.name() != METADATA_POINT)
            .ok_or_else(|| OmlError::UnknownMeasurementPoint(name.to_string()))?;

        let coerced = coerce_tuple(name, point.schema(), values)?;
        let line = protocol::encode_record(
            self.elapsed(),
            point.index(),
            point.next_sequence(),
            &coerced,
        );

        self.emit(&line).await?;
        trace!("Injected into '{}': {}", name, line.trim_end());
        self.advance(name);
        Ok(())
    }

    /// Reports a `key`/`value` pair on the experiment metadata stream.
    ///
    /// # Errors
    ///
    /// * `OmlError::ProtocolState` unless the session is `STARTED`.
    /// * `OmlError::Config` for an invalid key name.
    /// * `OmlError::UnknownMeasurementPoint` / `OmlError::UnknownField` when
    ///   the subject does not exist.
    /// * `OmlError::Transport` if the write fails.
    pub async fn inject_metadata(
        &mut self,
        subject: MetadataSubject<'_>,
        key: &str,
        value: &str,
    ) -> Result<()> {
        self.require("inject_metadata", self.state.accepts_injections())?;
        if !is_valid_name(key) {
            return Err(OmlError::Config(format!(
                "'{}' is not a valid metadata key name",
                key
            )));
        }

        let subject = match subject {
            MetadataSubject::Experiment => ".".to_string(),
            MetadataSubject::Point(point) => {
                self.user_point(point)?;
                format!(".{}", point)
            }
            MetadataSubject::Field { point, field } => {
                let schema = self.user_point(point)?;
                if schema.field(field).is_none() {
                    return Err(OmlError::UnknownField {
                        point: point.to_string(),
                        field: field.to_string(),
                    });
                }
                format!(".{}.{}", point, field)
            }
        };

        let meta = self
            .registry
            .get(METADATA_POINT)
            .ok_or_else(|| OmlError::UnknownMeasurementPoint(METADATA_POINT.to_string()))?;
        let line = protocol::encode_record(
            self.elapsed(),
            meta.index(),
            meta.next_sequence(),
            &[
                Value::String(subject),
                Value::String(key.to_string()),
                Value::String(value.to_string()),
            ],
        );

        self.emit(&line).await?;
        self.advance(METADATA_POINT);
        Ok(())
    }

    fn user_point(&self, name: &str) -> Result<&Schema> {
        self.registry
            .get(name)
            .filter(|p| p.name() != METADATA_POINT)
            .map(|p| p.schema())
            .ok_or_else(|| OmlError::UnknownMeasurementPoint(name.to_string()))
    }

    fn advance(&mut self, name: &str) {
        if let Some(point) = self.registry.get_mut(name) {
            point.advance();
        }
    }

    /// Flushes and releases the sink and moves to `CLOSED`.
    ///
    /// Closing an already closed session is a no-op. The sink is released
    /// even when flushing it fails; the failure is still reported.
    #[instrument(skip_all, fields(app = %self.config.app_name))]
    pub async fn close(&mut self) -> Result<()> {
        match self.state {
            SessionState::Closed => {
                debug!("close() on a closed session ignored");
                return Ok(());
            }
            SessionState::Created => {
                debug!("Closing session that was never started");
            }
            SessionState::Started => {}
        }

        self.state = SessionState::Closed;
        let Some(mut sink) = self.sink.take() else {
            return Ok(());
        };
        let described = sink.describe();
        let result = sink.close().await.map_err(OmlError::Transport);
        drop(sink);
        info!("Session closed, released {}", described);
        result
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.sink.is_some() {
            warn!(
                "Session '{}' dropped while started; releasing sink without flush",
                self.config.app_name
            );
        }
    }
}

/// Checks arity and converts every value to its declared field type.
fn coerce_tuple(point: &str, schema: &Schema, values: &[Value]) -> Result<Vec<Value>> {
    if values.len() != schema.len() {
        return Err(OmlError::mismatch(
            point,
            format!(
                "expected {} value(s), got {}",
                schema.len(),
                values.len()
            ),
        ));
    }
    schema
        .fields()
        .iter()
        .zip(values)
        .map(|(field, value)| {
            value
                .coerce(field.ty)
                .map_err(|reason| OmlError::mismatch(&field.name, reason))
        })
        .collect()
}
