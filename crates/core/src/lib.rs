//! Strata core types: resource kinds, records, and tables.

#![forbid(unsafe_code)]

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::Value;

pub mod columns;
mod kind;

pub use kind::{looks_like_id, Addressing, IdShape, QualifierRole, ResourceKind, UnknownKind};

/// A single resource snapshot: an ordered field list tagged with its kind.
///
/// Field order is the order fields arrived from the API, plus any
/// synthesized fields appended by the normalization hooks. Canonical
/// *column* order for display is computed separately (see [`columns`]).
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    kind: ResourceKind,
    fields: Vec<(String, Value)>,
}

#[derive(Debug, thiserror::Error)]
#[error("expected a JSON object for {kind} record, got {got}")]
pub struct NotAnObject {
    pub kind: ResourceKind,
    pub got: &'static str,
}

impl Record {
    pub fn new(kind: ResourceKind) -> Self {
        Self { kind, fields: Vec::new() }
    }

    /// Build a record from a raw API object, coercing known timestamp
    /// fields to their canonical RFC 3339 rendering.
    pub fn from_value(kind: ResourceKind, value: Value) -> Result<Self, NotAnObject> {
        let obj = match value {
            Value::Object(obj) => obj,
            other => return Err(NotAnObject { kind, got: json_type_name(&other) }),
        };
        let mut rec = Self { kind, fields: Vec::with_capacity(obj.len()) };
        for (k, v) in obj {
            let v = columns::coerce(&k, v);
            rec.fields.push((k, v));
        }
        Ok(rec)
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == field).map(|(_, v)| v)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    /// The platform-assigned identity field. Empty for malformed records.
    pub fn id(&self) -> &str {
        self.get_str("id").unwrap_or("")
    }

    pub fn owner(&self) -> &str {
        self.get_str("owner").unwrap_or("")
    }

    pub fn name(&self) -> &str {
        self.get_str("name").unwrap_or("")
    }

    /// Insert or replace a field, preserving its position when it exists.
    pub fn set(&mut self, field: &str, value: Value) {
        match self.fields.iter_mut().find(|(k, _)| k == field) {
            Some((_, v)) => *v = columns::coerce(field, value),
            None => {
                let v = columns::coerce(field, value);
                self.fields.push((field.to_string(), v));
            }
        }
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        let idx = self.fields.iter().position(|(k, _)| k == field)?;
        Some(self.fields.remove(idx).1)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    /// `owner/name/id` triple used in disambiguation messages.
    pub fn triple(&self) -> String {
        format!("{}/{}/{}", self.owner(), self.name(), self.id())
    }

    /// Render a field for tabular output. Missing fields and nulls are
    /// blank; compound values print as compact JSON.
    pub fn render(&self, field: &str) -> String {
        match self.get(field) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(Value::Bool(b)) => b.to_string(),
            Some(Value::Number(n)) => n.to_string(),
            Some(v) => v.to_string(),
        }
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// An ordered table of same-kind records with a stable column set.
///
/// The column set survives emptiness: a listing that matched nothing still
/// renders its canonical header.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordList {
    kind: ResourceKind,
    columns: Vec<String>,
    records: Vec<Record>,
}

impl RecordList {
    /// An empty table carrying the kind's base columns.
    pub fn empty(kind: ResourceKind) -> Self {
        let columns = columns::base_columns(kind).iter().map(|c| (*c).to_string()).collect();
        Self { kind, columns, records: Vec::new() }
    }

    /// Build a table from records, deriving the final column order from the
    /// canonical registry plus any extra fields present in the data.
    pub fn from_records(kind: ResourceKind, records: Vec<Record>) -> Self {
        if records.is_empty() {
            return Self::empty(kind);
        }
        let columns = columns::column_order(kind, &records);
        Self { kind, columns, records }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    /// Retain only records satisfying `keep`, preserving columns.
    pub fn retain(&mut self, keep: impl FnMut(&Record) -> bool) {
        self.records.retain(keep);
    }
}

impl IntoIterator for RecordList {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;
    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl Serialize for RecordList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.records.len()))?;
        for rec in &self.records {
            seq.serialize_element(rec)?;
        }
        seq.end()
    }
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_value_rejects_non_objects() {
        let err = Record::from_value(ResourceKind::Project, json!([1, 2])).unwrap_err();
        assert_eq!(err.got, "array");
    }

    #[test]
    fn field_order_is_preserved_in_serialization() {
        let mut rec = Record::new(ResourceKind::Project);
        rec.set("zeta", json!("z"));
        rec.set("alpha", json!("a"));
        let out = serde_json::to_string(&rec).unwrap();
        assert_eq!(out, r#"{"zeta":"z","alpha":"a"}"#);
    }

    #[test]
    fn set_replaces_in_place() {
        let mut rec = Record::new(ResourceKind::Project);
        rec.set("name", json!("one"));
        rec.set("owner", json!("alice"));
        rec.set("name", json!("two"));
        assert_eq!(rec.get_str("name"), Some("two"));
        assert_eq!(rec.field_names().collect::<Vec<_>>(), vec!["name", "owner"]);
    }

    #[test]
    fn render_blanks_missing_and_null() {
        let mut rec = Record::new(ResourceKind::Project);
        rec.set("a", Value::Null);
        assert_eq!(rec.render("a"), "");
        assert_eq!(rec.render("b"), "");
    }

    #[test]
    fn empty_table_keeps_base_columns() {
        let t = RecordList::empty(ResourceKind::Project);
        assert!(t.is_empty());
        assert!(t.columns().iter().any(|c| c == "name"));
        assert!(t.columns().iter().any(|c| c == "id"));
        // deferred columns stay hidden on empty tables
        assert!(!t.columns().iter().any(|c| c == "collaborators"));
    }
}
