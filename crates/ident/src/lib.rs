//! Strata identifier grammar and record matcher.
//!
//! Users address platform resources with partial, wildcard-bearing
//! identifiers of the form `[owner/]name-or-id[:qualifier][/id]`. This crate
//! parses those strings into typed [`Identifier`] patterns and resolves them
//! against live listings, enforcing match-exactly-one semantics where a
//! command acts on a single resource. Resolution never tie-breaks: two
//! surviving candidates are an error carrying both, not a guess.

#![forbid(unsafe_code)]

mod filter;
mod pattern;

pub use filter::{FieldFilter, FilterOp, InvalidFilter};
pub use pattern::{Identifier, InvalidIdentifier};

use strata_core::{Record, RecordList, ResourceKind};
use tracing::debug;

/// Outcome of resolving a pattern against a table.
#[derive(Debug, Clone)]
pub enum MatchOutcome {
    Unique(Record),
    Empty,
    Ambiguous(RecordList),
}

/// Resolution failure for callers that require a unique match.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("no {}s found matching {}", .kind.label(), .ident)]
    NotFound { kind: ResourceKind, ident: String },

    #[error("multiple {}s found matching {}:{}", .kind.label(), .ident, list_triples(.matches))]
    Ambiguous {
        kind: ResourceKind,
        ident: String,
        matches: RecordList,
    },
}

fn list_triples(matches: &RecordList) -> String {
    matches.iter().map(|r| format!("\n  - {}", r.triple())).collect()
}

/// Filter a table down to the records matching `pattern` and every extra
/// filter. Listing intent: any cardinality, including empty, is a valid
/// result and keeps the table's column set.
pub fn select(pattern: &Identifier, table: &RecordList, filters: &[FieldFilter]) -> RecordList {
    let preds = pattern.compile();
    let records: Vec<Record> = table
        .iter()
        .filter(|rec| preds.matches(rec) && filters.iter().all(|f| f.matches(rec)))
        .cloned()
        .collect();
    metrics::histogram!("ident_resolve_candidates", records.len() as f64);
    debug!(
        kind = %table.kind(),
        ident = %pattern,
        candidates = records.len(),
        total = table.len(),
        "identifier selection"
    );
    if records.is_empty() {
        RecordList::empty(table.kind())
    } else {
        RecordList::from_records(table.kind(), records)
    }
}

/// Resolve a pattern to zero, one, or many records.
///
/// Pure in `(pattern, table, filters)`: repeated calls with unchanged inputs
/// yield identical outcomes.
pub fn resolve(pattern: &Identifier, table: &RecordList, filters: &[FieldFilter]) -> MatchOutcome {
    let matched = select(pattern, table, filters);
    match matched.len() {
        0 => MatchOutcome::Empty,
        1 => MatchOutcome::Unique(matched.into_records().remove(0)),
        _ => MatchOutcome::Ambiguous(matched),
    }
}

/// Resolve for acting intent: exactly one record, or an error naming the
/// kind and the raw identifier (plus the conflicting `owner/name/id`
/// triples when more than one survived).
pub fn resolve_unique(
    pattern: &Identifier,
    table: &RecordList,
    filters: &[FieldFilter],
) -> Result<Record, ResolveError> {
    match resolve(pattern, table, filters) {
        MatchOutcome::Unique(rec) => Ok(rec),
        MatchOutcome::Empty => Err(ResolveError::NotFound {
            kind: table.kind(),
            ident: pattern.to_string(),
        }),
        MatchOutcome::Ambiguous(matches) => Err(ResolveError::Ambiguous {
            kind: table.kind(),
            ident: pattern.to_string(),
            matches,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strata_core::{Record, RecordList, ResourceKind};

    const ID_A: &str = "a0-00000000000000000000000000000001";
    const ID_B: &str = "a0-00000000000000000000000000000002";
    const ID_C: &str = "a0-00000000000000000000000000000003";

    fn project(owner: &str, name: &str, id: &str) -> Record {
        Record::from_value(
            ResourceKind::Project,
            json!({"name": name, "owner": owner, "id": id, "resource_profile": "default"}),
        )
        .unwrap()
    }

    fn table(records: Vec<Record>) -> RecordList {
        RecordList::from_records(ResourceKind::Project, records)
    }

    fn parse(raw: &str) -> Identifier {
        Identifier::parse(raw, ResourceKind::Project).unwrap()
    }

    #[test]
    fn name_only_over_two_owners_is_ambiguous() {
        let t = table(vec![project("alice", "proj1", ID_A), project("bob", "proj1", ID_B)]);
        let err = resolve_unique(&parse("proj1"), &t, &[]).unwrap_err();
        match err {
            ResolveError::Ambiguous { ref matches, .. } => {
                assert_eq!(matches.len(), 2);
                let msg = err.to_string();
                assert!(msg.contains(&format!("alice/proj1/{ID_A}")), "{msg}");
                assert!(msg.contains(&format!("bob/proj1/{ID_B}")), "{msg}");
            }
            other => panic!("expected ambiguous, got {other:?}"),
        }
    }

    #[test]
    fn owner_qualification_disambiguates() {
        let t = table(vec![project("alice", "proj1", ID_A), project("bob", "proj1", ID_B)]);
        let rec = resolve_unique(&parse("alice/proj1"), &t, &[]).unwrap();
        assert_eq!(rec.id(), ID_A);
    }

    #[test]
    fn id_shaped_token_matches_by_id() {
        let t = table(vec![project("alice", "proj1", ID_A), project("bob", "proj1", ID_B)]);
        let rec = resolve_unique(&parse(ID_B), &t, &[]).unwrap();
        assert_eq!(rec.owner(), "bob");
    }

    #[test]
    fn id_shaped_token_also_matching_a_name_is_ambiguous() {
        // One record *named* like another record's id: both contribute to the
        // candidate set, and ambiguity surfaces instead of a priority order.
        let t = table(vec![project("alice", ID_B, ID_A), project("bob", "proj1", ID_B)]);
        match resolve(&parse(ID_B), &t, &[]) {
            MatchOutcome::Ambiguous(m) => assert_eq!(m.len(), 2),
            other => panic!("expected ambiguous, got {other:?}"),
        }
    }

    #[test]
    fn empty_table_listing_is_empty_not_error() {
        let t = RecordList::empty(ResourceKind::Project);
        let out = select(&parse("proj1"), &t, &[]);
        assert!(out.is_empty());
        assert!(out.columns().iter().any(|c| c == "name"));

        let err = resolve_unique(&parse("proj1"), &t, &[]).unwrap_err();
        assert!(matches!(err, ResolveError::NotFound { .. }));
        assert!(err.to_string().contains("no projects found matching proj1"));
    }

    #[test]
    fn glob_selects_prefix_matches() {
        let t = table(vec![
            project("alice", "proj1", ID_A),
            project("alice", "proj2", ID_B),
            project("alice", "other", ID_C),
        ]);
        let out = select(&parse("proj*"), &t, &[]);
        assert_eq!(out.len(), 2);
        assert!(matches!(resolve(&parse("proj*"), &t, &[]), MatchOutcome::Ambiguous(_)));
    }

    #[test]
    fn bare_star_lists_everything() {
        let t = table(vec![project("alice", "proj1", ID_A), project("bob", "other", ID_B)]);
        assert_eq!(select(&parse("*"), &t, &[]).len(), 2);
    }

    #[test]
    fn extra_filters_are_anded() {
        let t = table(vec![project("alice", "proj1", ID_A), project("bob", "proj1", ID_B)]);
        let f = vec![FieldFilter::parse("owner=bob").unwrap()];
        let rec = resolve_unique(&parse("proj1"), &t, &f).unwrap();
        assert_eq!(rec.id(), ID_B);

        let f = vec![FieldFilter::parse("owner!=bob").unwrap()];
        let rec = resolve_unique(&parse("proj1"), &t, &f).unwrap();
        assert_eq!(rec.id(), ID_A);
    }

    #[test]
    fn resolution_is_idempotent() {
        let t = table(vec![project("alice", "proj1", ID_A), project("bob", "proj1", ID_B)]);
        let p = parse("proj*");
        let first = select(&p, &t, &[]);
        let second = select(&p, &t, &[]);
        assert_eq!(first, second);
    }

    #[test]
    fn explicit_trailing_id_overrides_name_collision() {
        let t = table(vec![project("alice", "proj1", ID_A), project("bob", "proj1", ID_B)]);
        let rec = resolve_unique(&parse(&format!("*/proj1/{ID_B}")), &t, &[]).unwrap();
        assert_eq!(rec.owner(), "bob");
    }
}
