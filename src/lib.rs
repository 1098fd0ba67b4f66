//! oml4rs: client for the OML text measurement-collection protocol
//!
//! An application declares named measurement points (typed tuples), starts a
//! session and streams timestamped samples to a collection endpoint over TCP.
//! Without a configured endpoint the same protocol lines are written to
//! standard output.
//!
//! ## Modules
//!
//! * `core`: the protocol session and its building blocks: schemas, typed
//!   values, text encoding, output sinks and configuration resolution.
//!
//! * `config`: optional TOML configuration for the bundled binary, validated
//!   with the `validator` crate.
//!
//! * `logger`: `tracing` subscriber setup (console on stderr, optional
//!   systemd journald).
//!
//! ## Example
//!
//! ```ignore
//! use oml4rs::{oml_values, Session, SessionArgs};
//!
//! let mut session = Session::new(SessionArgs::new("app").domain("exp").collect("tcp:localhost:3003"))?;
//! session.add_mp("fft", "freq:long amplitude:double")?;
//! session.start().await?;
//! session.inject("fft", &oml_values![100i64, 2.5]).await?;
//! session.close().await?;
//! ```

pub mod config;
pub mod core;
pub mod logger;

pub use crate::core::{
    error::{OmlError, Result},
    session::{MetadataSubject, Session},
    settings::{Environment, SessionArgs, SessionConfig},
    state::SessionState,
    types::{generate_guid, FieldType, Value},
};
