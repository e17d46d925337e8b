//! Resource kinds and their addressing schemas.
//!
//! The platform's REST API serves heterogeneous record shapes; rather than
//! inferring behavior from the shape mid-pipeline, every kind is an explicit
//! enum variant carrying the data identifier parsing and matching need:
//! which fields a bare token may address, what an id for the kind looks
//! like, and what the `:qualifier` suffix means.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Project,
    Revision,
    Command,
    Collaborator,
    Session,
    ResourceProfile,
    Editor,
    Sample,
    Deployment,
    Job,
    Run,
    Branch,
    Change,
    User,
    Activity,
    Endpoint,
}

/// How a user-supplied identifier addresses records of a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Addressing {
    /// Full `[owner/]name-or-id[:qualifier][/id]` grammar.
    OwnerName,
    /// A single token matched against the listed fields (union).
    Fields(&'static [&'static str]),
}

/// Meaning of the `:qualifier` identifier component for a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualifierRole {
    /// Qualifier is rejected for this kind.
    None,
    /// Revision tag; consumed by revision selection, never matched against
    /// listing fields.
    Revision,
    /// Matched against the `endpoint` field.
    Endpoint,
    /// Matched against the `session_name` field.
    SessionName,
}

/// Shape of platform-assigned ids for a kind: `a<digit>-<32 hex>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdShape {
    pub prefix: &'static str,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Revision => "revision",
            Self::Command => "command",
            Self::Collaborator => "collaborator",
            Self::Session => "session",
            Self::ResourceProfile => "resource_profile",
            Self::Editor => "editor",
            Self::Sample => "sample",
            Self::Deployment => "deployment",
            Self::Job => "job",
            Self::Run => "run",
            Self::Branch => "branch",
            Self::Change => "change",
            Self::User => "user",
            Self::Activity => "activity",
            Self::Endpoint => "endpoint",
        }
    }

    /// Human label for error messages (`resource profile`, not
    /// `resource_profile`).
    pub fn label(self) -> String {
        self.as_str().replace('_', " ")
    }

    pub fn addressing(self) -> Addressing {
        match self {
            Self::Project | Self::Session | Self::Deployment | Self::Job | Self::Run => {
                Addressing::OwnerName
            }
            Self::Revision => Addressing::Fields(&["name", "id"]),
            Self::Command => Addressing::Fields(&["id"]),
            Self::Collaborator => Addressing::Fields(&["id"]),
            Self::ResourceProfile => Addressing::Fields(&["name"]),
            Self::Editor => Addressing::Fields(&["name", "id"]),
            Self::Sample => Addressing::Fields(&["name", "id"]),
            Self::Branch => Addressing::Fields(&["branch"]),
            Self::Change => Addressing::Fields(&["path"]),
            Self::User => Addressing::Fields(&["username", "id"]),
            Self::Activity => Addressing::Fields(&["id"]),
            Self::Endpoint => Addressing::Fields(&["id"]),
        }
    }

    pub fn qualifier_role(self) -> QualifierRole {
        match self {
            Self::Project | Self::Job | Self::Run => QualifierRole::Revision,
            Self::Deployment => QualifierRole::Endpoint,
            Self::Session => QualifierRole::SessionName,
            _ => QualifierRole::None,
        }
    }

    /// Id shape for kinds with platform-assigned opaque ids.
    pub fn id_shape(self) -> Option<IdShape> {
        let prefix = match self {
            Self::Project => "a0",
            Self::Session => "a1",
            Self::Deployment => "a2",
            Self::Job => "a3",
            Self::Run => "a4",
            _ => return None,
        };
        Some(IdShape { prefix })
    }
}

impl IdShape {
    /// Whether `token` matches this kind's id shape exactly.
    pub fn matches(&self, token: &str) -> bool {
        token.len() == self.prefix.len() + 33
            && token.starts_with(self.prefix)
            && token.as_bytes()[self.prefix.len()] == b'-'
            && token[self.prefix.len() + 1..].bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
    }
}

/// Whether `token` looks like any platform id (`a<digit>-<32 hex>`).
///
/// Used during parsing, where the record a token will land on is not yet
/// known; kind-specific prefixes only refine matching, never parsing.
pub fn looks_like_id(token: &str) -> bool {
    let bytes = token.as_bytes();
    bytes.len() == 35
        && bytes[0] == b'a'
        && bytes[1].is_ascii_digit()
        && bytes[2] == b'-'
        && bytes[3..].iter().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown resource kind: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for ResourceKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s {
            "project" => Self::Project,
            "revision" => Self::Revision,
            "command" => Self::Command,
            "collaborator" => Self::Collaborator,
            "session" => Self::Session,
            "resource_profile" | "resource-profile" => Self::ResourceProfile,
            "editor" => Self::Editor,
            "sample" => Self::Sample,
            "deployment" => Self::Deployment,
            "job" => Self::Job,
            "run" => Self::Run,
            "branch" => Self::Branch,
            "change" => Self::Change,
            "user" => Self::User,
            "activity" => Self::Activity,
            "endpoint" => Self::Endpoint,
            other => return Err(UnknownKind(other.to_string())),
        };
        Ok(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_shape_accepts_canonical_ids() {
        let shape = ResourceKind::Project.id_shape().unwrap();
        assert!(shape.matches("a0-c3fc35506d5f4d41a0bb0ce55af4e06c"));
        assert!(!shape.matches("a1-c3fc35506d5f4d41a0bb0ce55af4e06c"));
        assert!(!shape.matches("a0-c3fc"));
        assert!(!shape.matches("a0-C3FC35506D5F4D41A0BB0CE55AF4E06C"));
    }

    #[test]
    fn generic_id_shape() {
        assert!(looks_like_id("a4-0123456789abcdef0123456789abcdef"));
        assert!(!looks_like_id("proj1"));
        assert!(!looks_like_id("b0-0123456789abcdef0123456789abcdef"));
        assert!(!looks_like_id("a0-0123456789abcdef0123456789abcde"));
    }

    #[test]
    fn kind_round_trips_through_str() {
        for kind in [
            ResourceKind::Project,
            ResourceKind::ResourceProfile,
            ResourceKind::Deployment,
        ] {
            assert_eq!(kind.as_str().parse::<ResourceKind>().unwrap(), kind);
        }
        assert_eq!("resource-profile".parse::<ResourceKind>().unwrap(), ResourceKind::ResourceProfile);
    }

    #[test]
    fn labels_are_human() {
        assert_eq!(ResourceKind::ResourceProfile.label(), "resource profile");
    }
}
