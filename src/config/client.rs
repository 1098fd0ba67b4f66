//! Session defaults read from the `[client]` section of the configuration file.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::settings::SessionArgs;

/// Optional defaults for the session arguments.
///
/// Every field is optional; anything left unset here may still be supplied by
/// the `OML_*` environment variables when the session is initialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ClientConfig {
    #[validate(length(min = 1, message = "Application name must not be empty"))]
    pub app_name: Option<String>,

    pub domain: Option<String>,

    pub node: Option<String>,

    /// Collection URI, `[tcp:]host[:port]`.
    #[validate(length(min = 1, message = "Collection URI must not be empty"))]
    pub collect: Option<String>,
}

impl ClientConfig {
    /// Fills every argument that `args` leaves unset from this section.
    pub fn apply_to(&self, args: SessionArgs) -> SessionArgs {
        SessionArgs {
            app_name: args.app_name.or_else(|| self.app_name.clone()),
            domain: args.domain.or_else(|| self.domain.clone()),
            node: args.node.or_else(|| self.node.clone()),
            collect: args.collect.or_else(|| self.collect.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_arguments_take_priority() {
        let file = ClientConfig {
            app_name: Some("fileapp".into()),
            domain: Some("filedomain".into()),
            node: None,
            collect: Some("tcp:file:3003".into()),
        };
        let args = SessionArgs::new("cliapp").collect("tcp:cli:4000");

        let merged = file.apply_to(args);
        assert_eq!(merged.app_name.as_deref(), Some("cliapp"));
        assert_eq!(merged.domain.as_deref(), Some("filedomain"));
        assert_eq!(merged.node, None);
        assert_eq!(merged.collect.as_deref(), Some("tcp:cli:4000"));
    }

    #[test]
    fn empty_strings_fail_validation() {
        let config = ClientConfig {
            app_name: Some(String::new()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(ClientConfig::default().validate().is_ok());
    }
}
