//! Layered resolution of session settings.
//!
//! Explicit arguments win over environment variables, which win over unset.
//! The environment is passed in as a snapshot so resolution stays a pure
//! function and tests never have to mutate the process environment.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use super::{
    error::{OmlError, Result},
    target::CollectTarget,
};

pub const ENV_NAME: &str = "OML_NAME";
pub const ENV_DOMAIN: &str = "OML_DOMAIN";
pub const ENV_ID: &str = "OML_ID";
pub const ENV_COLLECT: &str = "OML_COLLECT";

/// Deprecated spelling of `OML_DOMAIN`.
pub const ENV_EXP_ID: &str = "OML_EXP_ID";
/// Deprecated spelling of `OML_COLLECT`.
pub const ENV_SERVER: &str = "OML_SERVER";

static APP_NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("app name pattern is a valid regex")
});

/// Immutable snapshot of the environment variables the resolver consults.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    /// Snapshots the current process environment.
    pub fn capture() -> Self {
        Self::from_pairs(std::env::vars())
    }

    /// An empty environment.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Environment {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Returns the variable if it is set to a non-empty value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    fn get_with_fallback(&self, key: &str, deprecated: &str) -> Option<String> {
        if let Some(value) = self.get(key) {
            return Some(value.to_string());
        }
        self.get(deprecated).map(|value| {
            warn!("{} is deprecated; please use {} instead", deprecated, key);
            value.to_string()
        })
    }
}

/// Values supplied explicitly by the embedding application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionArgs {
    pub app_name: Option<String>,
    pub domain: Option<String>,
    pub node: Option<String>,
    pub collect: Option<String>,
}

impl SessionArgs {
    pub fn new(app_name: impl Into<String>) -> Self {
        SessionArgs {
            app_name: Some(app_name.into()),
            ..Default::default()
        }
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn node(mut self, node: impl Into<String>) -> Self {
        self.node = Some(node.into());
        self
    }

    pub fn collect(mut self, uri: impl Into<String>) -> Self {
        self.collect = Some(uri.into());
        self
    }
}

/// Fully resolved, immutable session configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub app_name: String,
    pub domain: Option<String>,
    pub node: Option<String>,
    /// `None` means disabled mode: protocol lines go to standard output.
    pub target: Option<CollectTarget>,
}

impl SessionConfig {
    /// Resolves explicit arguments against an environment snapshot.
    ///
    /// # Errors
    ///
    /// * `OmlError::Config` if no usable application name is found, or the
    ///   collection URI is malformed.
    /// * `OmlError::UnsupportedScheme` if the URI names a non-`tcp` scheme.
    pub fn resolve(args: SessionArgs, env: &Environment) -> Result<Self> {
        let app_name = match args.app_name {
            Some(name) => name,
            None => env
                .get(ENV_NAME)
                .map(str::to_string)
                .ok_or_else(|| OmlError::Config("no application name given".to_string()))?,
        };
        if app_name.is_empty() {
            return Err(OmlError::Config(
                "application name must not be empty".to_string(),
            ));
        }
        if !APP_NAME_PATTERN.is_match(&app_name) {
            return Err(OmlError::Config(format!(
                "invalid application name '{}'",
                app_name
            )));
        }

        let domain = non_empty(args.domain).or_else(|| env.get_with_fallback(ENV_DOMAIN, ENV_EXP_ID));
        let node = non_empty(args.node).or_else(|| env.get(ENV_ID).map(str::to_string));
        let target = non_empty(args.collect)
            .or_else(|| env.get_with_fallback(ENV_COLLECT, ENV_SERVER))
            .map(|uri| CollectTarget::parse(&uri))
            .transpose()?;

        debug!(
            app = %app_name,
            domain = ?domain,
            node = ?node,
            collect = ?target.as_ref().map(ToString::to_string),
            "Resolved session configuration"
        );

        Ok(SessionConfig {
            app_name,
            domain,
            node,
            target,
        })
    }

    /// True when no collection target is configured.
    pub fn is_disabled(&self) -> bool {
        self.target.is_none()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
