//! Measurement point schemas and the per-session registry.
//!
//! A schema string is a whitespace-separated list of `name:type` tokens. The
//! registry keeps points in declaration order: the reserved experiment metadata
//! stream always occupies index 0 and user points are numbered from 1.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use super::{
    error::{OmlError, Result},
    types::FieldType,
};

/// Name of the reserved metadata measurement point.
pub const METADATA_POINT: &str = "_experiment_metadata";

const METADATA_SCHEMA: &str = "subject:string key:string value:string";

static NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("name pattern is a valid regex")
});

/// True if `name` is usable as a measurement point, field or metadata key name.
pub fn is_valid_name(name: &str) -> bool {
    NAME_PATTERN.is_match(name)
}

/// One declared field of a measurement point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub ty: FieldType,
}

/// Ordered list of typed fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    /// Parses a schema string declared for `point`.
    ///
    /// # Errors
    ///
    /// * `OmlError::InvalidSchema` for empty schemas, tokens without a colon,
    ///   invalid or duplicate field names.
    /// * `OmlError::UnsupportedType` for an unknown type token.
    pub fn parse(point: &str, text: &str) -> Result<Self> {
        let invalid = |reason: String| OmlError::InvalidSchema {
            point: point.to_string(),
            reason,
        };

        let mut fields: Vec<Field> = Vec::new();
        for token in text.split_whitespace() {
            let (name, type_name) = token
                .split_once(':')
                .ok_or_else(|| invalid(format!("token '{}' is not of the form name:type", token)))?;

            if !is_valid_name(name) {
                return Err(invalid(format!("invalid field name '{}'", name)));
            }
            if type_name.is_empty() {
                return Err(invalid(format!("field '{}' has no type", name)));
            }
            if fields.iter().any(|f| f.name.eq_ignore_ascii_case(name)) {
                return Err(invalid(format!("duplicate field name '{}'", name)));
            }

            let ty = FieldType::from_name(type_name).ok_or_else(|| OmlError::UnsupportedType {
                field: name.to_string(),
                type_name: type_name.to_string(),
            })?;
            fields.push(Field {
                name: name.to_string(),
                ty,
            });
        }

        if fields.is_empty() {
            return Err(invalid("schema has no fields".to_string()));
        }
        Ok(Schema { fields })
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// Renders the canonical `name:type` list used in header lines.
    pub fn to_spec_string(&self) -> String {
        self.fields
            .iter()
            .map(|f| format!("{}:{}", f.name, f.ty))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A declared measurement point together with its sequence counter.
#[derive(Debug, Clone)]
pub struct MeasurementPoint {
    name: String,
    index: u32,
    schema: Schema,
    next_seq: u64,
}

impl MeasurementPoint {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Schema index referenced by every data line of this point.
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Sequence number the next successful injection will carry.
    pub fn next_sequence(&self) -> u64 {
        self.next_seq
    }

    pub(crate) fn advance(&mut self) {
        self.next_seq += 1;
    }
}

/// Name to schema mapping, in declaration order.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    points: Vec<MeasurementPoint>,
    by_name: HashMap<String, usize>,
}

impl SchemaRegistry {
    /// Creates a registry holding only the reserved metadata point.
    pub fn new() -> Self {
        let mut registry = SchemaRegistry {
            points: Vec::new(),
            by_name: HashMap::new(),
        };
        let schema = Schema::parse(METADATA_POINT, METADATA_SCHEMA)
            .expect("metadata schema is statically valid");
        registry.insert(METADATA_POINT, schema);
        registry
    }

    fn insert(&mut self, name: &str, schema: Schema) -> u32 {
        let index = self.points.len() as u32;
        self.by_name.insert(name.to_string(), self.points.len());
        self.points.push(MeasurementPoint {
            name: name.to_string(),
            index,
            schema,
            next_seq: 0,
        });
        index
    }

    /// Declares a new measurement point and returns its schema index.
    ///
    /// # Errors
    ///
    /// * `OmlError::InvalidSchema` if the point name is invalid or the schema
    ///   string does not parse.
    /// * `OmlError::DuplicateSchema` if the name is already registered.
    /// * `OmlError::UnsupportedType` for an unknown field type.
    pub fn declare(&mut self, name: &str, schema_text: &str) -> Result<u32> {
        if !is_valid_name(name) {
            return Err(OmlError::InvalidSchema {
                point: name.to_string(),
                reason: "invalid measurement point name".to_string(),
            });
        }
        if self.by_name.contains_key(name) {
            return Err(OmlError::DuplicateSchema(name.to_string()));
        }
        let schema = Schema::parse(name, schema_text)?;
        Ok(self.insert(name, schema))
    }

    pub fn get(&self, name: &str) -> Option<&MeasurementPoint> {
        self.by_name.get(name).map(|&i| &self.points[i])
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut MeasurementPoint> {
        match self.by_name.get(name) {
            Some(&i) => self.points.get_mut(i),
            None => None,
        }
    }

    /// All points, metadata stream first, in index order.
    pub fn iter(&self) -> impl Iterator<Item = &MeasurementPoint> {
        self.points.iter()
    }

    /// Number of user-declared points (the metadata stream is not counted).
    pub fn declared(&self) -> usize {
        self.points.len() - 1
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_counts_one_field_per_token() {
        let schema = Schema::parse("fft", "freq:long   amplitude:double\tlabel:string").unwrap();
        assert_eq!(schema.len(), 3);
        assert_eq!(schema.fields()[0].ty, FieldType::Int64);
        assert_eq!(schema.fields()[1].ty, FieldType::Double);
        assert_eq!(schema.fields()[2].ty, FieldType::String);
    }

    #[test]
    fn parse_splits_on_first_colon_only() {
        let err = Schema::parse("mp", "value:double:extra").unwrap_err();
        match err {
            OmlError::UnsupportedType { field, type_name } => {
                assert_eq!(field, "value");
                assert_eq!(type_name, "double:extra");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn parse_rejects_unknown_type() {
        assert!(matches!(
            Schema::parse("mp", "a:int32 b:vector"),
            Err(OmlError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn parse_rejects_malformed_tokens() {
        for text in ["", "   ", "novalue", "a:", ":int32", "1a:int32", "a:int32 A:double"] {
            assert!(
                matches!(Schema::parse("mp", text), Err(OmlError::InvalidSchema { .. })),
                "expected InvalidSchema for {:?}",
                text
            );
        }
    }

    #[test]
    fn spec_string_uses_canonical_type_names() {
        let schema = Schema::parse("fft", "freq:long amplitude:FLOAT").unwrap();
        assert_eq!(schema.to_spec_string(), "freq:int64 amplitude:double");
    }

    #[test]
    fn registry_reserves_index_zero_for_metadata() {
        let registry = SchemaRegistry::new();
        let meta = registry.get(METADATA_POINT).unwrap();
        assert_eq!(meta.index(), 0);
        assert_eq!(meta.schema().len(), 3);
        assert_eq!(registry.declared(), 0);
    }

    #[test]
    fn registry_assigns_indices_in_declaration_order() {
        let mut registry = SchemaRegistry::new();
        assert_eq!(registry.declare("first", "a:int32").unwrap(), 1);
        assert_eq!(registry.declare("second", "b:double").unwrap(), 2);

        let names: Vec<&str> = registry.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec![METADATA_POINT, "first", "second"]);
    }

    #[test]
    fn registry_rejects_duplicates_and_reserved_name() {
        let mut registry = SchemaRegistry::new();
        registry.declare("fft", "a:int32").unwrap();
        assert!(matches!(
            registry.declare("fft", "b:double"),
            Err(OmlError::DuplicateSchema(name)) if name == "fft"
        ));
        assert!(matches!(
            registry.declare(METADATA_POINT, "b:double"),
            Err(OmlError::DuplicateSchema(_))
        ));
    }

    #[test]
    fn registry_rejects_invalid_point_names() {
        let mut registry = SchemaRegistry::new();
        for name in ["", "1abc", "has-dash", "dot.ted"] {
            assert!(registry.declare(name, "a:int32").is_err());
        }
        assert_eq!(registry.declared(), 0);
    }

    #[test]
    fn failed_declaration_leaves_registry_unchanged() {
        let mut registry = SchemaRegistry::new();
        assert!(registry.declare("bad", "a:nope").is_err());
        assert!(!registry.contains("bad"));
        assert_eq!(registry.declare("good", "a:int32").unwrap(), 1);
    }

    #[test]
    fn sequence_counters_are_per_point() {
        let mut registry = SchemaRegistry::new();
        registry.declare("a", "x:int32").unwrap();
        registry.declare("b", "x:int32").unwrap();

        registry.get_mut("a").unwrap().advance();
        registry.get_mut("a").unwrap().advance();

        assert_eq!(registry.get("a").unwrap().next_sequence(), 2);
        assert_eq!(registry.get("b").unwrap().next_sequence(), 0);
    }
}
