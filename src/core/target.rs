//! Collection target URIs of the form `[tcp:]host[:port]`.

use std::{fmt, str::FromStr};

use super::error::{OmlError, Result};

/// Port used when the target URI does not name one.
pub const DEFAULT_PORT: u16 = 3003;

/// The only transport scheme the client speaks.
pub const DEFAULT_SCHEME: &str = "tcp";

/// A parsed TCP collection endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectTarget {
    pub host: String,
    pub port: u16,
}

impl CollectTarget {
    /// Parses `host`, `host:port`, `tcp:host` or `tcp:host:port`.
    ///
    /// # Errors
    ///
    /// * `OmlError::UnsupportedScheme` when a scheme other than `tcp` is given.
    /// * `OmlError::Config` for empty hosts, bad ports or too many components.
    pub fn parse(uri: &str) -> Result<Self> {
        let uri = uri.trim();
        let parts: Vec<&str> = uri.split(':').collect();

        let (scheme, host, port) = match parts.as_slice() {
            [host] => (None, *host, None),
            [scheme, host] if scheme.eq_ignore_ascii_case(DEFAULT_SCHEME) => {
                (Some(*scheme), *host, None)
            }
            [host, port] => (None, *host, Some(*port)),
            [scheme, host, port] => (Some(*scheme), *host, Some(*port)),
            _ => {
                return Err(OmlError::Config(format!(
                    "'{}' is not a valid collection URI",
                    uri
                )))
            }
        };

        if let Some(scheme) = scheme {
            if !scheme.eq_ignore_ascii_case(DEFAULT_SCHEME) {
                return Err(OmlError::UnsupportedScheme(scheme.to_string()));
            }
        }

        if host.is_empty() {
            return Err(OmlError::Config(format!(
                "collection URI '{}' has no host",
                uri
            )));
        }

        let port = match port {
            None => DEFAULT_PORT,
            Some(raw) => parse_port(raw)?,
        };

        Ok(CollectTarget {
            host: host.to_string(),
            port,
        })
    }

    /// `host:port` pair suitable for `TcpStream::connect`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_port(raw: &str) -> Result<u16> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(OmlError::Config(format!(
            "cannot use '{}' as a port number",
            raw
        )));
    }
    match raw.parse::<u16>() {
        Ok(0) | Err(_) => Err(OmlError::Config(format!(
            "cannot use '{}' as a port number",
            raw
        ))),
        Ok(port) => Ok(port),
    }
}

impl FromStr for CollectTarget {
    type Err = OmlError;

    fn from_str(s: &str) -> Result<Self> {
        CollectTarget::parse(s)
    }
}

impl fmt::Display for CollectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", DEFAULT_SCHEME, self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(host: &str, port: u16) -> CollectTarget {
        CollectTarget {
            host: host.into(),
            port,
        }
    }

    #[test]
    fn host_only_uses_default_port() {
        assert_eq!(CollectTarget::parse("localhost").unwrap(), target("localhost", 3003));
    }

    #[test]
    fn host_and_port() {
        assert_eq!(
            CollectTarget::parse("collector.example.org:4000").unwrap(),
            target("collector.example.org", 4000)
        );
    }

    #[test]
    fn scheme_and_host() {
        assert_eq!(CollectTarget::parse("tcp:10.0.0.1").unwrap(), target("10.0.0.1", 3003));
    }

    #[test]
    fn full_uri() {
        assert_eq!(
            CollectTarget::parse("tcp:localhost:3004").unwrap(),
            target("localhost", 3004)
        );
        assert_eq!(
            CollectTarget::parse("TCP:localhost:3004").unwrap(),
            target("localhost", 3004)
        );
    }

    #[test]
    fn other_schemes_are_unsupported() {
        assert!(matches!(
            CollectTarget::parse("udp:localhost:3003"),
            Err(OmlError::UnsupportedScheme(s)) if s == "udp"
        ));
    }

    #[test]
    fn two_part_uri_is_host_and_port_unless_scheme_is_tcp() {
        assert_eq!(CollectTarget::parse("tcp:3003").unwrap(), target("3003", 3003));
        assert_eq!(CollectTarget::parse("localhost:99").unwrap(), target("localhost", 99));
    }

    #[test]
    fn malformed_uris_are_config_errors() {
        for uri in [
            "",
            "tcp::3003",
            "tcp:host:port",
            "tcp:host:70000",
            "tcp:host:0",
            "a:b:c:d",
            "localhost:abc",
            "host:",
            "localhost:99999",
            "file:output",
            "tcp:",
        ] {
            assert!(
                matches!(CollectTarget::parse(uri), Err(OmlError::Config(_))),
                "expected Config error for {:?}",
                uri
            );
        }
    }

    #[test]
    fn display_and_address() {
        let t = target("localhost", 3003);
        assert_eq!(t.to_string(), "tcp:localhost:3003");
        assert_eq!(t.address(), "localhost:3003");
    }
}
