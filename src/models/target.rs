// Managed hosts and the volume identifier shared by all of them

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{InputError, TargetError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reachability {
    #[default]
    Unknown,
    Reachable,
    Unreachable,
}

/// One managed host. The name is fixed at creation; collection produces new
/// values carrying the observed reachability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    name: String,
    reachability: Reachability,
    error: Option<String>,
}

impl Target {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reachability: Reachability::Unknown,
            error: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reachability(&self) -> Reachability {
        self.reachability
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn reachable(&self) -> Self {
        Self {
            name: self.name.clone(),
            reachability: Reachability::Reachable,
            error: None,
        }
    }

    /// Records a failed query. The host counts as reachable when it answered
    /// (bad credentials, missing resource).
    pub fn failed(&self, error: &TargetError) -> Self {
        let reachability = match error {
            TargetError::Unreachable(_) | TargetError::TimedOut(_) => Reachability::Unreachable,
            _ => Reachability::Reachable,
        };
        Self {
            name: self.name.clone(),
            reachability,
            error: Some(error.to_string()),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Volume identifier: a drive letter (stored upper case, no colon) or a
/// symbolic id such as a mount path or device name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId(String);

impl ResourceId {
    pub fn parse(raw: &str) -> Result<Self, InputError> {
        let s = raw.trim();
        if s.is_empty() {
            return Err(InputError::new("resource", "must not be empty"));
        }
        if s.chars().any(char::is_whitespace) {
            return Err(InputError::new("resource", "must not contain whitespace"));
        }
        let letter = s.strip_suffix(':').unwrap_or(s);
        let mut chars = letter.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if c.is_ascii_alphabetic() {
                return Ok(Self(c.to_ascii_uppercase().to_string()));
            }
            return Err(InputError::new(
                "resource",
                format!("'{}' is not a drive letter", c),
            ));
        }
        if s.ends_with(':') {
            return Err(InputError::new("resource", "only drive letters may end with ':'"));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The letter, when this id names a drive.
    pub fn drive_letter(&self) -> Option<char> {
        let mut chars = self.0.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_alphabetic() => Some(c),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.drive_letter() {
            Some(c) => write!(f, "{}:", c),
            None => f.write_str(&self.0),
        }
    }
}

impl TryFrom<String> for ResourceId {
    type Error = InputError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<ResourceId> for String {
    fn from(id: ResourceId) -> Self {
        id.0
    }
}
