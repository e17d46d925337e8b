//! Extra field filters (`--filter FIELD[!]=VALUE`).
//!
//! Filters are AND-ed with the identifier pattern during resolution and are
//! independent of it: they can narrow on any record field, not just the
//! addressable ones.

use globset::{Glob, GlobMatcher};
use std::fmt;
use strata_core::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Glob,
}

#[derive(Debug, thiserror::Error)]
#[error("invalid filter {raw:?}: {reason}")]
pub struct InvalidFilter {
    pub raw: String,
    pub reason: String,
}

/// One `field op value` predicate.
#[derive(Debug, Clone)]
pub struct FieldFilter {
    field: String,
    op: FilterOp,
    value: String,
    glob: Option<GlobMatcher>,
}

impl FieldFilter {
    /// Parse `field=value` or `field!=value`. An `=` value carrying wildcard
    /// characters becomes a glob predicate.
    pub fn parse(raw: &str) -> Result<Self, InvalidFilter> {
        let fail = |reason: &str| InvalidFilter { raw: raw.to_string(), reason: reason.to_string() };
        let (field, op, value) = if let Some((f, v)) = raw.split_once("!=") {
            (f, FilterOp::Ne, v)
        } else if let Some((f, v)) = raw.split_once('=') {
            let op = if v.contains(['*', '?', '[']) { FilterOp::Glob } else { FilterOp::Eq };
            (f, op, v)
        } else {
            return Err(fail("expected FIELD=VALUE or FIELD!=VALUE"));
        };
        if field.is_empty() {
            return Err(fail("empty field name"));
        }
        let glob = if value.contains(['*', '?', '[']) {
            let g = Glob::new(value).map_err(|e| fail(&format!("bad wildcard pattern: {e}")))?;
            Some(g.compile_matcher())
        } else {
            None
        };
        Ok(Self { field: field.to_string(), op, value: value.to_string(), glob })
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn op(&self) -> FilterOp {
        self.op
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn matches(&self, rec: &Record) -> bool {
        let actual = rec.render(&self.field);
        let hit = match &self.glob {
            Some(g) => g.is_match(&actual),
            None => actual == self.value,
        };
        match self.op {
            FilterOp::Eq | FilterOp::Glob => hit,
            FilterOp::Ne => !hit,
        }
    }
}

impl fmt::Display for FieldFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.op {
            FilterOp::Eq | FilterOp::Glob => "=",
            FilterOp::Ne => "!=",
        };
        write!(f, "{}{}{}", self.field, op, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strata_core::ResourceKind;

    fn rec() -> Record {
        Record::from_value(
            ResourceKind::Deployment,
            json!({"name": "dep1", "owner": "alice", "public": true, "replicas": 3}),
        )
        .unwrap()
    }

    #[test]
    fn equality_and_negation() {
        assert!(FieldFilter::parse("owner=alice").unwrap().matches(&rec()));
        assert!(!FieldFilter::parse("owner=bob").unwrap().matches(&rec()));
        assert!(FieldFilter::parse("owner!=bob").unwrap().matches(&rec()));
    }

    #[test]
    fn non_string_scalars_compare_via_rendering() {
        assert!(FieldFilter::parse("public=true").unwrap().matches(&rec()));
        assert!(FieldFilter::parse("replicas=3").unwrap().matches(&rec()));
    }

    #[test]
    fn glob_values() {
        let f = FieldFilter::parse("name=dep*").unwrap();
        assert_eq!(f.op(), FilterOp::Glob);
        assert!(f.matches(&rec()));
        assert!(!FieldFilter::parse("name!=de*").unwrap().matches(&rec()));
    }

    #[test]
    fn missing_fields_render_blank() {
        assert!(FieldFilter::parse("ghost=").unwrap().matches(&rec()));
        assert!(!FieldFilter::parse("ghost=x").unwrap().matches(&rec()));
    }

    #[test]
    fn parse_errors() {
        assert!(FieldFilter::parse("nofilter").is_err());
        assert!(FieldFilter::parse("=x").is_err());
        assert!(FieldFilter::parse("name=[").is_err());
    }

    #[test]
    fn display_round_trips() {
        for raw in ["owner=alice", "owner!=alice", "name=dep*"] {
            assert_eq!(FieldFilter::parse(raw).unwrap().to_string(), raw);
        }
    }
}
