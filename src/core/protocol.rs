//! Text encoding of the OML protocol header and data lines.
//!
//! The header is a block of `key: value` lines closed by an empty line. Each
//! sample is one line of tab-separated fields:
//!
//! ```text
//! <elapsed-seconds>\t<schema-index>\t<sequence-number>\t<value1>\t<value2>...\n
//! ```

use std::fmt::Write as _;

use base64::{engine::general_purpose::STANDARD, Engine as _};

use super::{schema::SchemaRegistry, types::Value};

/// Version announced in the `protocol:` header line.
pub const PROTOCOL_VERSION: u32 = 4;

/// Placeholder for header values that were never configured.
pub const UNKNOWN: &str = "UNKNOWN";

/// Header fields known at start.
#[derive(Debug, Clone)]
pub struct Header<'a> {
    pub domain: Option<&'a str>,
    pub app_name: &'a str,
    pub sender_id: Option<&'a str>,
    pub start_time: i64,
}

impl Header<'_> {
    /// Renders the full header, one `schema:` line per registered point,
    /// terminated by an empty line.
    pub fn encode(&self, registry: &SchemaRegistry) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = writeln!(out, "protocol: {}", PROTOCOL_VERSION);
        let _ = writeln!(out, "experiment-id: {}", self.domain.unwrap_or(UNKNOWN));
        let _ = writeln!(out, "content: text");
        let _ = writeln!(out, "app-name: {}", self.app_name);
        let _ = writeln!(out, "sender-id: {}", self.sender_id.unwrap_or(UNKNOWN));
        let _ = writeln!(out, "start-time: {}", self.start_time);
        for point in registry.iter() {
            let _ = writeln!(
                out,
                "schema: {} {} {}",
                point.index(),
                point.name(),
                point.schema().to_spec_string()
            );
        }
        out.push('\n');
        out
    }
}

/// Encodes one data line, including the trailing newline.
///
/// `values` must already be coerced to the declared field types.
pub fn encode_record(elapsed: f64, index: u32, sequence: u64, values: &[Value]) -> String {
    let mut line = format!("{:.6}\t{}\t{}", elapsed, index, sequence);
    for value in values {
        line.push('\t');
        encode_value(value, &mut line);
    }
    line.push('\n');
    line
}

fn encode_value(value: &Value, out: &mut String) {
    match value {
        Value::Int32(v) => {
            let _ = write!(out, "{}", v);
        }
        Value::UInt32(v) => {
            let _ = write!(out, "{}", v);
        }
        Value::Int64(v) => {
            let _ = write!(out, "{}", v);
        }
        Value::UInt64(v) | Value::Guid(v) => {
            let _ = write!(out, "{}", v);
        }
        // Display for f64 is the shortest representation that round-trips.
        Value::Double(v) => {
            let _ = write!(out, "{}", v);
        }
        Value::Bool(v) => out.push_str(if *v { "true" } else { "false" }),
        Value::String(s) => out.push_str(&escape(s)),
        Value::Blob(bytes) => out.push_str(&STANDARD.encode(bytes)),
    }
}

/// Escapes backslashes, tabs, carriage returns and newlines so that text
/// values cannot break line or field framing.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lists_every_schema_and_ends_with_blank_line() {
        let mut registry = SchemaRegistry::new();
        registry.declare("fft", "freq:long amplitude:double").unwrap();

        let header = Header {
            domain: Some("exp"),
            app_name: "app",
            sender_id: Some("node"),
            start_time: 1_700_000_000,
        }
        .encode(&registry);

        assert_eq!(
            header,
            "protocol: 4\n\
             experiment-id: exp\n\
             content: text\n\
             app-name: app\n\
             sender-id: node\n\
             start-time: 1700000000\n\
             schema: 0 _experiment_metadata subject:string key:string value:string\n\
             schema: 1 fft freq:int64 amplitude:double\n\
             \n"
        );
    }

    #[test]
    fn header_uses_placeholder_for_unset_values() {
        let header = Header {
            domain: None,
            app_name: "app",
            sender_id: None,
            start_time: 0,
        }
        .encode(&SchemaRegistry::new());

        assert!(header.contains("experiment-id: UNKNOWN\n"));
        assert!(header.contains("sender-id: UNKNOWN\n"));
    }

    #[test]
    fn record_is_tab_separated_and_newline_terminated() {
        let line = encode_record(
            1.5,
            1,
            0,
            &[Value::Int64(100), Value::Double(2.5)],
        );
        assert_eq!(line, "1.500000\t1\t0\t100\t2.5\n");
    }

    #[test]
    fn doubles_keep_full_precision() {
        let line = encode_record(0.0, 1, 3, &[Value::Double(0.1 + 0.2), Value::Double(-1.0)]);
        assert_eq!(line, "0.000000\t1\t3\t0.30000000000000004\t-1\n");
    }

    #[test]
    fn strings_are_escaped() {
        let line = encode_record(0.0, 2, 0, &[Value::String("a\tb\nc\\d\re".into())]);
        assert_eq!(line, "0.000000\t2\t0\ta\\tb\\nc\\\\d\\re\n");
        assert_eq!(line.matches('\n').count(), 1);
        assert_eq!(line.matches('\t').count(), 3);
    }

    #[test]
    fn blobs_are_base64_encoded() {
        let line = encode_record(0.0, 1, 0, &[Value::Blob(b"hello\n".to_vec())]);
        assert_eq!(line, "0.000000\t1\t0\taGVsbG8K\n");
    }

    #[test]
    fn integers_bools_and_guids_render_as_decimal_or_words() {
        let line = encode_record(
            0.0,
            1,
            0,
            &[
                Value::Int32(-7),
                Value::UInt32(u32::MAX),
                Value::UInt64(u64::MAX),
                Value::Guid(42),
                Value::Bool(false),
            ],
        );
        assert_eq!(
            line,
            "0.000000\t1\t0\t-7\t4294967295\t18446744073709551615\t42\tfalse\n"
        );
    }
}
