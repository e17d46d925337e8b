//! Identifier parsing.
//!
//! Grammar: `[owner/]name-or-id[:qualifier][/id]`. Parsing is total and
//! side-effect-free; values that merely fail to match anything are a
//! resolution concern, not a parse error. Only structurally broken input is
//! rejected: empty strings, empty components, disallowed characters,
//! repeated separators, or malformed glob classes.

use globset::{Glob, GlobMatcher};
use std::fmt;
use strata_core::{looks_like_id, Addressing, QualifierRole, Record, ResourceKind};

/// A parsed identifier pattern. Components hold their raw (possibly
/// glob-bearing) text; compilation to matchers happens per resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    kind: ResourceKind,
    owner: Option<String>,
    name: Option<String>,
    id: Option<String>,
    qualifier: Option<String>,
    /// True when `name` and `id` came from one id-shaped token: the token
    /// matches either field, and ambiguity detection arbitrates collisions.
    name_or_id: bool,
}

#[derive(Debug, thiserror::Error)]
#[error("invalid {} identifier {raw:?}: {reason}", .kind.label())]
pub struct InvalidIdentifier {
    pub kind: ResourceKind,
    pub raw: String,
    pub reason: String,
}

impl Identifier {
    /// Parse a user-supplied identifier for the given kind.
    pub fn parse(raw: &str, kind: ResourceKind) -> Result<Self, InvalidIdentifier> {
        let fail = |reason: &str| InvalidIdentifier {
            kind,
            raw: raw.to_string(),
            reason: reason.to_string(),
        };
        if raw.is_empty() {
            return Err(fail("empty identifier"));
        }

        match kind.addressing() {
            Addressing::Fields(_) => {
                if raw.contains('/') || raw.contains(':') {
                    return Err(fail("this kind is addressed by a single value"));
                }
                check_component(raw).map_err(|r| fail(&r))?;
                Ok(Self {
                    kind,
                    owner: None,
                    name: Some(raw.to_string()),
                    id: None,
                    qualifier: None,
                    name_or_id: false,
                })
            }
            Addressing::OwnerName => Self::parse_owner_name(raw, kind, &fail),
        }
    }

    fn parse_owner_name(
        raw: &str,
        kind: ResourceKind,
        fail: &dyn Fn(&str) -> InvalidIdentifier,
    ) -> Result<Self, InvalidIdentifier> {
        // Qualifier first: at most one ':', everything after it belongs to
        // the qualifier (and an optional trailing id override).
        let (main, qual_rest) = match raw.split_once(':') {
            Some((m, q)) => (m, Some(q)),
            None => (raw, None),
        };
        if qual_rest.is_some_and(|q| q.contains(':')) {
            return Err(fail("at most one ':' is allowed"));
        }

        let (qualifier, id_after_qual) = match qual_rest {
            None => (None, None),
            Some(rest) => match rest.split_once('/') {
                None => (Some(rest), None),
                Some((q, id)) => (Some(q), Some(id)),
            },
        };
        if let Some(q) = qualifier {
            if q.is_empty() {
                return Err(fail("empty qualifier after ':'"));
            }
        }
        if qualifier.is_some() && kind.qualifier_role() == QualifierRole::None {
            return Err(fail("this kind does not take a ':qualifier'"));
        }

        let parts: Vec<&str> = main.split('/').collect();
        if parts.iter().any(|p| p.is_empty()) || id_after_qual.is_some_and(str::is_empty) {
            return Err(fail("empty component"));
        }
        let (owner, token, id_in_main) = match parts.as_slice() {
            [token] => (None, *token, None),
            [owner, token] => (Some(*owner), *token, None),
            [owner, token, id] => (Some(*owner), *token, Some(*id)),
            _ => return Err(fail("too many '/'-separated components")),
        };
        if id_in_main.is_some() && id_after_qual.is_some() {
            return Err(fail("multiple id components"));
        }
        let explicit_id = id_in_main.or(id_after_qual);

        for comp in [Some(token), owner, explicit_id, qualifier].into_iter().flatten() {
            check_component(comp).map_err(|r| fail(&r))?;
        }

        // A token only counts as id-shaped against the kind's own id shape;
        // another kind's id (wrong prefix) can still be a name.
        let id_like = match kind.id_shape() {
            Some(shape) => shape.matches(token),
            None => looks_like_id(token),
        };
        let (name, id, name_or_id) = match explicit_id {
            Some(id) => (Some(token.to_string()), Some(id.to_string()), false),
            None if id_like => (Some(token.to_string()), Some(token.to_string()), true),
            None => (Some(token.to_string()), None, false),
        };

        Ok(Self {
            kind,
            owner: owner.map(str::to_string),
            name,
            id,
            qualifier: qualifier.map(str::to_string),
            name_or_id,
        })
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    /// The revision tag carried by this identifier, for kinds whose
    /// qualifier is a revision selector.
    pub fn revision(&self) -> Option<&str> {
        match self.kind.qualifier_role() {
            QualifierRole::Revision => self.qualifier.as_deref(),
            _ => None,
        }
    }

    pub fn has_glob(&self) -> bool {
        [&self.owner, &self.name, &self.id, &self.qualifier]
            .into_iter()
            .flatten()
            .any(|c| is_glob(c))
    }

    /// Compile the pattern's components into field predicates.
    pub fn compile(&self) -> CompiledIdentifier {
        CompiledIdentifier {
            owner: self.owner.as_deref().map(Pred::new),
            name: self.name.as_deref().map(Pred::new),
            id: self.id.as_deref().map(Pred::new),
            qualifier: self.qualifier.as_deref().map(Pred::new),
            kind: self.kind,
            name_or_id: self.name_or_id,
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(owner) = &self.owner {
            write!(f, "{owner}/")?;
        }
        if let Some(name) = &self.name {
            f.write_str(name)?;
        }
        if let Some(q) = &self.qualifier {
            write!(f, ":{q}")?;
        }
        if !self.name_or_id {
            if let Some(id) = &self.id {
                write!(f, "/{id}")?;
            }
        }
        Ok(())
    }
}

/// A single-field predicate: exact equality, or a compiled glob when the
/// component carries wildcard characters.
#[derive(Debug, Clone)]
enum Pred {
    Exact(String),
    Glob(GlobMatcher),
}

impl Pred {
    fn new(component: &str) -> Self {
        if is_glob(component) {
            // Compilability was checked at parse time.
            match Glob::new(component) {
                Ok(glob) => return Pred::Glob(glob.compile_matcher()),
                Err(_) => {}
            }
        }
        Pred::Exact(component.to_string())
    }

    fn matches(&self, value: &str) -> bool {
        match self {
            Pred::Exact(s) => s == value,
            Pred::Glob(g) => g.is_match(value),
        }
    }

    fn matches_field(&self, rec: &Record, field: &str) -> bool {
        self.matches(&rec.render(field))
    }
}

/// Compiled form of an [`Identifier`], ready to test records.
#[derive(Debug, Clone)]
pub struct CompiledIdentifier {
    kind: ResourceKind,
    owner: Option<Pred>,
    name: Option<Pred>,
    id: Option<Pred>,
    qualifier: Option<Pred>,
    name_or_id: bool,
}

impl CompiledIdentifier {
    pub fn matches(&self, rec: &Record) -> bool {
        match self.kind.addressing() {
            Addressing::Fields(fields) => match &self.name {
                // Union across the kind's addressable fields.
                Some(pred) => fields.iter().any(|f| pred.matches_field(rec, f)),
                None => true,
            },
            Addressing::OwnerName => self.matches_owner_name(rec),
        }
    }

    fn matches_owner_name(&self, rec: &Record) -> bool {
        if let Some(owner) = &self.owner {
            if !owner.matches_field(rec, "owner") {
                return false;
            }
        }
        if self.name_or_id {
            // One id-shaped token: id or name, one candidate set.
            let id_hit = self.id.as_ref().is_some_and(|p| p.matches_field(rec, "id"));
            let name_hit = self.name.as_ref().is_some_and(|p| p.matches_field(rec, "name"));
            if !id_hit && !name_hit {
                return false;
            }
        } else {
            if let Some(name) = &self.name {
                if !name.matches_field(rec, "name") {
                    return false;
                }
            }
            if let Some(id) = &self.id {
                if !id.matches_field(rec, "id") {
                    return false;
                }
            }
        }
        match (self.kind.qualifier_role(), &self.qualifier) {
            // Revision tags select revisions later; they never narrow the
            // owning record.
            (QualifierRole::Revision, _) | (_, None) => true,
            (QualifierRole::Endpoint, Some(q)) => q.matches_field(rec, "endpoint"),
            (QualifierRole::SessionName, Some(q)) => q.matches_field(rec, "session_name"),
            (QualifierRole::None, Some(_)) => false,
        }
    }
}

fn is_glob(component: &str) -> bool {
    component.contains(['*', '?', '['])
}

fn check_component(component: &str) -> Result<(), String> {
    for ch in component.chars() {
        let ok = ch.is_ascii_alphanumeric()
            || matches!(ch, ' ' | '-' | '_' | '.' | '@' | '+' | '*' | '?' | '[' | ']' | '!');
        if !ok {
            return Err(format!("character {ch:?} is not allowed"));
        }
    }
    if is_glob(component) {
        Glob::new(component).map_err(|e| format!("bad wildcard pattern: {e}"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "a0-00000000000000000000000000000001";

    fn parse(raw: &str) -> Identifier {
        Identifier::parse(raw, ResourceKind::Project).unwrap()
    }

    #[test]
    fn decomposes_all_components() {
        let p = parse(&format!("alice/proj:rev/{ID}"));
        assert_eq!(p.owner(), Some("alice"));
        assert_eq!(p.name(), Some("proj"));
        assert_eq!(p.qualifier(), Some("rev"));
        assert_eq!(p.id(), Some(ID));
        assert_eq!(p.revision(), Some("rev"));
    }

    #[test]
    fn single_token_is_name() {
        let p = parse("proj");
        assert_eq!(p.owner(), None);
        assert_eq!(p.name(), Some("proj"));
        assert_eq!(p.id(), None);
    }

    #[test]
    fn id_shaped_token_keeps_name_fallback() {
        let p = parse(ID);
        assert_eq!(p.id(), Some(ID));
        assert_eq!(p.name(), Some(ID));
    }

    #[test]
    fn another_kinds_id_is_just_a_name() {
        // a1- is a session id; for a project identifier it is only a name
        let p = parse("a1-00000000000000000000000000000001");
        assert_eq!(p.id(), None);
        assert_eq!(p.name(), Some("a1-00000000000000000000000000000001"));
    }

    #[test]
    fn three_main_components_carry_trailing_id() {
        let p = parse(&format!("alice/proj/{ID}"));
        assert_eq!(p.owner(), Some("alice"));
        assert_eq!(p.name(), Some("proj"));
        assert_eq!(p.id(), Some(ID));
    }

    #[test]
    fn rejects_structural_breakage() {
        let double_id = format!("a/b/{ID}:rev/{ID}");
        for bad in [
            "",
            "alice/",
            "/proj",
            "a/b/c/d",
            "proj:",
            "proj:rev:again",
            "proj\n",
            "pro{j}",
            double_id.as_str(),
            "proj[",
        ] {
            assert!(
                Identifier::parse(bad, ResourceKind::Project).is_err(),
                "expected parse failure for {bad:?}"
            );
        }
    }

    #[test]
    fn simple_kinds_reject_separators() {
        assert!(Identifier::parse("alice/ed", ResourceKind::Editor).is_err());
        assert!(Identifier::parse("ed:1", ResourceKind::Editor).is_err());
        let p = Identifier::parse("jupyterlab", ResourceKind::Editor).unwrap();
        assert_eq!(p.name(), Some("jupyterlab"));
    }

    #[test]
    fn qualifier_rejected_where_meaningless() {
        assert!(Identifier::parse("x:y", ResourceKind::Editor).is_err());
        assert!(Identifier::parse("sess:name", ResourceKind::Session).is_ok());
    }

    #[test]
    fn display_round_trips() {
        let with_id = format!("alice/proj/{ID}");
        let with_rev_id = format!("proj:rev/{ID}");
        for raw in [
            "proj",
            "alice/proj",
            "alice/proj:rev",
            with_id.as_str(),
            with_rev_id.as_str(),
            ID,
            "proj*",
            "*/proj?",
            "alice/pro[jk]1",
            "*",
        ] {
            let p = parse(raw);
            let again = parse(&p.to_string());
            assert_eq!(p, again, "round-trip failed for {raw:?}");
            assert_eq!(p.to_string(), raw);
        }
    }

    #[test]
    fn glob_detection() {
        assert!(parse("proj*").has_glob());
        assert!(parse("pro?").has_glob());
        assert!(!parse("proj").has_glob());
    }
}
