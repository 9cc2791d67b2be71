use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use promptlab_core::error::{ConfigError, LabError, Result};

/// A single dataset row: field name → value pairs in document order.
///
/// Field order is preserved because input-field inference falls back
/// to the *first* field when no candidate name is present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    fields: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn push(&mut self, name: impl Into<String>, value: Value) -> &mut Self {
        self.fields.push((name.into(), value));
        self
    }

    /// Look up a field by name. With duplicate names the first wins.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(field, _)| field.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct RowVisitor;

        impl<'de> Visitor<'de> for RowVisitor {
            type Value = Row;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of field names to values")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Row, A::Error> {
                let mut fields = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, value)) = access.next_entry::<String, Value>()? {
                    fields.push((name, value));
                }
                Ok(Row { fields })
            }
        }

        deserializer.deserialize_map(RowVisitor)
    }
}

/// An ordered collection of rows under a reference string. Immutable
/// for the duration of a run once fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub reference: String,
    pub rows: Vec<Row>,
}

impl Dataset {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            rows: Vec::new(),
        }
    }

    pub fn add_row(&mut self, row: Row) -> &mut Self {
        self.rows.push(row);
        self
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Field names of the first row, in document order. Empty for an
    /// empty dataset.
    pub fn field_names(&self) -> Vec<&str> {
        self.rows
            .first()
            .map(|row| row.field_names().collect())
            .unwrap_or_default()
    }

    /// Parse a dataset from a JSON array of row objects.
    pub fn from_json(reference: impl Into<String>, json: &str) -> Result<Self> {
        let rows: Vec<Row> = serde_json::from_str(json)?;
        Ok(Self {
            reference: reference.into(),
            rows,
        })
    }
}

/// Render a row value the way it is shown to a model: strings as-is,
/// everything else as compact JSON.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Capability trait for resolving a dataset reference. The pipeline
/// treats the fetch as opaque and does not implement dataset storage.
#[async_trait]
pub trait DatasetSource: Send + Sync {
    async fn fetch(&self, reference: &str) -> Result<Dataset>;
}

/// Resolves references against a directory of `<reference>.json` files.
pub struct JsonFileSource {
    base_dir: PathBuf,
}

impl JsonFileSource {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

#[async_trait]
impl DatasetSource for JsonFileSource {
    async fn fetch(&self, reference: &str) -> Result<Dataset> {
        let path = self.base_dir.join(format!("{reference}.json"));
        let raw = tokio::fs::read_to_string(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LabError::Config(ConfigError::DatasetNotFound(reference.into()))
            } else {
                LabError::Io(e)
            }
        })?;
        Dataset::from_json(reference, &raw)
    }
}

/// In-memory source for tests and pre-loaded datasets.
#[derive(Default)]
pub struct InMemorySource {
    datasets: HashMap<String, Dataset>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, dataset: Dataset) -> &mut Self {
        self.datasets.insert(dataset.reference.clone(), dataset);
        self
    }
}

#[async_trait]
impl DatasetSource for InMemorySource {
    async fn fetch(&self, reference: &str) -> Result<Dataset> {
        self.datasets
            .get(reference)
            .cloned()
            .ok_or_else(|| LabError::Config(ConfigError::DatasetNotFound(reference.into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn row_preserves_document_order() {
        let json = r#"{"zeta": 1, "alpha": 2, "mid": 3}"#;
        let row: Row = serde_json::from_str(json).unwrap();
        let names: Vec<&str> = row.field_names().collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn row_get_by_name() {
        let json = r#"{"email": "hello", "expected_name": "Alex Thompson"}"#;
        let row: Row = serde_json::from_str(json).unwrap();
        assert_eq!(row.get("email"), Some(&json!("hello")));
        assert_eq!(row.get("expected_name"), Some(&json!("Alex Thompson")));
        assert_eq!(row.get("missing"), None);
    }

    #[test]
    fn row_serde_roundtrip_keeps_order() {
        let json = r#"{"b":1,"a":2}"#;
        let row: Row = serde_json::from_str(json).unwrap();
        let out = serde_json::to_string(&row).unwrap();
        assert_eq!(out, json);
    }

    #[test]
    fn dataset_from_json_array() {
        let json = r#"[
            {"question": "What is 2+2?", "answer": "4"},
            {"question": "Capital of France?", "answer": "Paris"}
        ]"#;
        let ds = Dataset::from_json("math-qa", json).unwrap();
        assert_eq!(ds.reference, "math-qa");
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.field_names(), vec!["question", "answer"]);
    }

    #[test]
    fn dataset_from_json_rejects_non_array() {
        assert!(Dataset::from_json("bad", r#"{"rows": []}"#).is_err());
    }

    #[test]
    fn empty_dataset_has_no_fields() {
        let ds = Dataset::new("empty");
        assert!(ds.is_empty());
        assert!(ds.field_names().is_empty());
    }

    #[test]
    fn value_to_text_string_passthrough() {
        assert_eq!(value_to_text(&json!("plain text")), "plain text");
    }

    #[test]
    fn value_to_text_non_string_as_json() {
        assert_eq!(value_to_text(&json!(42)), "42");
        assert_eq!(value_to_text(&json!({"k": 1})), r#"{"k":1}"#);
        assert_eq!(value_to_text(&json!(null)), "null");
    }

    #[tokio::test]
    async fn in_memory_source_fetch() {
        let mut source = InMemorySource::new();
        let mut ds = Dataset::new("qa");
        ds.add_row([("input".to_string(), json!("hi"))].into_iter().collect());
        source.insert(ds);

        let fetched = source.fetch("qa").await.unwrap();
        assert_eq!(fetched.len(), 1);

        let err = source.fetch("nope").await.unwrap_err();
        assert!(matches!(
            err,
            LabError::Config(ConfigError::DatasetNotFound(_))
        ));
    }

    #[tokio::test]
    async fn json_file_source_fetch() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("sample.json"),
            r#"[{"input": "a", "expected": "b"}]"#,
        )
        .unwrap();

        let source = JsonFileSource::new(dir.path());
        let ds = source.fetch("sample").await.unwrap();
        assert_eq!(ds.reference, "sample");
        assert_eq!(ds.field_names(), vec!["input", "expected"]);
    }

    #[tokio::test]
    async fn json_file_source_missing_reference() {
        let dir = tempfile::tempdir().unwrap();
        let source = JsonFileSource::new(dir.path());
        let err = source.fetch("absent").await.unwrap_err();
        assert!(matches!(
            err,
            LabError::Config(ConfigError::DatasetNotFound(_))
        ));
    }
}
