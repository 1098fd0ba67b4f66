//! Core of the OML client: the protocol session and everything it is built on.
//!
//! * `session`: lifecycle state machine and the five session operations
//! * `schema`: measurement point schemas and the registry
//! * `types`: field types and tagged values
//! * `protocol`: header and data-line text encoding
//! * `sink`: network, stdout and in-memory output sinks
//! * `settings`: layered resolution of session configuration
//! * `target`: collection URI parsing

pub mod clock;
pub mod error;
pub mod protocol;
pub mod schema;
pub mod session;
pub mod settings;
pub mod sink;
pub mod state;
pub mod target;
pub mod types;
