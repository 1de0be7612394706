use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an entity in the world. Chosen by the event source or
/// assigned positionally by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Classification of an entity. Only players may issue events; any other
/// type string supplied by the event source is carried through verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    #[default]
    #[serde(rename = "")]
    Unspecified,
    Player,
    Bullet,
    #[serde(untagged)]
    Other(String),
}

/// Team affiliation. Teams other than red and blue are kept by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    #[default]
    #[serde(rename = "")]
    Unassigned,
    Red,
    Blue,
    #[serde(untagged)]
    Other(String),
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Team::Unassigned => f.write_str("-"),
            Team::Red => f.write_str("red"),
            Team::Blue => f.write_str("blue"),
            Team::Other(name) => f.write_str(name),
        }
    }
}

/// Discrete state label stamped onto a span of a trajectory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(pub String);

impl Tag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// An empty tag is indistinguishable from "no label" on the wire.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Tag {
    fn from(tag: &str) -> Self {
        Self(tag.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_serializes_as_plain_string() {
        let id = EntityId::from("p1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"p1\"");
    }

    #[test]
    fn unassigned_team_is_empty_string() {
        assert_eq!(serde_json::to_string(&Team::Unassigned).unwrap(), "\"\"");
        let red: Team = serde_json::from_str("\"red\"").unwrap();
        assert_eq!(red, Team::Red);
    }

    #[test]
    fn entity_kind_round_trips_lowercase() {
        assert_eq!(serde_json::to_string(&EntityKind::Player).unwrap(), "\"player\"");
        let k: EntityKind = serde_json::from_str("\"\"").unwrap();
        assert_eq!(k, EntityKind::Unspecified);
    }

    #[test]
    fn unknown_team_and_kind_are_carried_by_name() {
        let green: Team = serde_json::from_str("\"green\"").unwrap();
        assert_eq!(green, Team::Other("green".into()));
        assert_eq!(serde_json::to_string(&green).unwrap(), "\"green\"");
        assert_eq!(green.to_string(), "green");

        let kind: EntityKind = serde_json::from_str("\"asteroid\"").unwrap();
        assert_eq!(kind, EntityKind::Other("asteroid".into()));
        assert_eq!(serde_json::to_string(&kind).unwrap(), "\"asteroid\"");
    }
}
