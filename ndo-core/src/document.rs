use std::fmt;

use json_patch::jsonptr::PointerBuf;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// A path to a field inside a policy document, one segment per nesting level.
///
/// `name` is a top-level field; `synce.adminState` is the `adminState` leaf of
/// the `synce` sub-section.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    pub fn new(segments: &[&str]) -> Self {
        debug_assert!(!segments.is_empty(), "field paths have at least one segment");
        FieldPath(segments.iter().map(|s| s.to_string()).collect())
    }

    pub fn leaf(name: &str) -> Self {
        FieldPath(vec![name.to_string()])
    }

    pub fn nested(section: &str, field: &str) -> Self {
        FieldPath(vec![section.to_string(), field.to_string()])
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// The first segment: the field itself for flat paths, the sub-section
    /// for nested ones.
    pub fn head(&self) -> &str {
        self.0.first().map(String::as_str).unwrap_or_default()
    }

    pub fn last(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or_default()
    }

    /// The sub-section this field lives in, if it is nested.
    pub fn section(&self) -> Option<&str> {
        if self.0.len() > 1 {
            Some(self.head())
        } else {
            None
        }
    }

    pub fn is_nested(&self) -> bool {
        self.0.len() > 1
    }

    /// The JSON pointer of this field below `base`.
    pub fn pointer_from(&self, base: &PointerBuf) -> PointerBuf {
        let mut pointer = base.clone();
        for segment in &self.0 {
            pointer.push_back(segment.as_str());
        }
        pointer
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

/// A policy object: a tree of string keys mapping to values or nested
/// sub-documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    pub fn new() -> Self {
        Document(Map::new())
    }

    /// Wrap a JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Document(map)),
            other => Err(Error::Configuration(format!(
                "expected a JSON object for a policy document, got: {}",
                other
            ))),
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, path: &FieldPath) -> Option<&Value> {
        let (last, parents) = path.segments().split_last()?;
        let mut map = &self.0;
        for segment in parents {
            map = map.get(segment)?.as_object()?;
        }
        map.get(last)
    }

    /// A top-level string field.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.get_str("name")
    }

    /// A sub-section, if it is present as an object.
    pub fn section(&self, name: &str) -> Option<&Map<String, Value>> {
        self.0.get(name).and_then(Value::as_object)
    }

    pub fn contains(&self, path: &FieldPath) -> bool {
        self.get(path).is_some()
    }

    /// Set a field, materializing (or overwriting non-object) parents.
    pub fn set(&mut self, path: &FieldPath, value: Value) {
        let Some((last, parents)) = path.segments().split_last() else {
            return;
        };
        let mut map = &mut self.0;
        for segment in parents {
            let slot = map
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            let Value::Object(next) = slot else {
                return;
            };
            map = next;
        }
        map.insert(last.clone(), value);
    }

    pub fn remove(&mut self, path: &FieldPath) -> Option<Value> {
        let (last, parents) = path.segments().split_last()?;
        let mut map = &mut self.0;
        for segment in parents {
            map = map.get_mut(segment)?.as_object_mut()?;
        }
        map.remove(last)
    }
}

impl From<Map<String, Value>> for Document {
    fn from(map: Map<String, Value>) -> Self {
        Document(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        Document::from_value(value).unwrap()
    }

    #[test]
    fn test_get_nested() {
        let d = doc(json!({"name": "ns1", "synce": {"adminState": "enabled"}}));
        assert_eq!(d.get(&FieldPath::leaf("name")), Some(&json!("ns1")));
        assert_eq!(
            d.get(&FieldPath::nested("synce", "adminState")),
            Some(&json!("enabled"))
        );
        assert_eq!(d.get(&FieldPath::nested("ptp", "prio2")), None);
        assert_eq!(d.get(&FieldPath::nested("name", "x")), None);
    }

    #[test]
    fn test_set_materializes_parents() {
        let mut d = Document::new();
        d.set(&FieldPath::nested("ptp", "domain"), json!(25));
        assert_eq!(d.into_value(), json!({"ptp": {"domain": 25}}));
    }

    #[test]
    fn test_set_overwrites_non_object_parent() {
        let mut d = doc(json!({"ptp": null}));
        d.set(&FieldPath::nested("ptp", "prio2"), json!(100));
        assert_eq!(d.into_value(), json!({"ptp": {"prio2": 100}}));
    }

    #[test]
    fn test_remove() {
        let mut d = doc(json!({"synce": {"adminState": "enabled", "qlOption": "op1"}}));
        assert_eq!(
            d.remove(&FieldPath::nested("synce", "qlOption")),
            Some(json!("op1"))
        );
        assert_eq!(d.remove(&FieldPath::nested("ptp", "prio1")), None);
        assert!(d.remove(&FieldPath::leaf("synce")).is_some());
        assert!(d.is_empty());
    }

    #[test]
    fn test_section_requires_object() {
        let d = doc(json!({"synce": {"adminState": "enabled"}, "ptp": null}));
        assert!(d.section("synce").is_some());
        assert!(d.section("ptp").is_none());
        assert!(d.contains(&FieldPath::leaf("ptp")));
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        assert!(matches!(
            Document::from_value(json!([1, 2])),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_pointer_from() {
        let base = PointerBuf::from_tokens(vec!["fabricPolicyTemplate", "template"]);
        let p = FieldPath::nested("synce", "adminState").pointer_from(&base);
        assert_eq!(p.as_str(), "/fabricPolicyTemplate/template/synce/adminState");
    }

    #[test]
    fn test_display() {
        assert_eq!(FieldPath::nested("ptp", "prio2").to_string(), "ptp.prio2");
        assert_eq!(FieldPath::leaf("name").section(), None);
        assert_eq!(FieldPath::nested("ptp", "prio2").section(), Some("ptp"));
    }
}
