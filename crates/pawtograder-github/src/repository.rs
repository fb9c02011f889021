//! Repository full names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, ErrorKind};

/// A validated `owner/repo` pair.
///
/// The owner is the installation lookup key. GitHub logins are
/// case-insensitive, so the lookup lowercases it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepositoryName {
    owner: String,
    name: String,
}

impl RepositoryName {
    /// Creates a repository name from its parts.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Result<Self, Error> {
        let owner = owner.into();
        let name = name.into();

        if !is_valid_segment(&owner) || !is_valid_segment(&name) {
            return Err(Error::new(ErrorKind::InvalidInput)
                .with_message(format!("Invalid repository name: {owner}/{name}")));
        }

        Ok(Self { owner, name })
    }

    /// Returns the owning account or organization login.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Returns the repository name without the owner.
    pub fn name(&self) -> &str {
        &self.name
    }
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

impl FromStr for RepositoryName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (owner, name) = s.trim().split_once('/').ok_or_else(|| {
            Error::new(ErrorKind::InvalidInput)
                .with_message(format!("Repository must be in owner/repo form, got {s:?}"))
        })?;

        Self::new(owner, name)
    }
}

impl TryFrom<String> for RepositoryName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RepositoryName> for String {
    fn from(value: RepositoryName) -> Self {
        value.to_string()
    }
}

impl fmt::Display for RepositoryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_owner_and_name() {
        let repo: RepositoryName = "Pawtograder-Org/grader.solution".parse().unwrap();
        assert_eq!(repo.owner(), "Pawtograder-Org");
        assert_eq!(repo.name(), "grader.solution");
        assert_eq!(repo.to_string(), "Pawtograder-Org/grader.solution");
    }

    #[test]
    fn rejects_malformed_names() {
        for input in ["", "owner", "/repo", "owner/", "a/b/c", "owner/..", "own er/repo"] {
            assert!(input.parse::<RepositoryName>().is_err(), "{input:?}");
        }
    }

    #[test]
    fn serde_uses_full_name() {
        let repo: RepositoryName = serde_json::from_str("\"acme/hw1\"").unwrap();
        assert_eq!(serde_json::to_string(&repo).unwrap(), "\"acme/hw1\"");
        assert!(serde_json::from_str::<RepositoryName>("\"acme\"").is_err());
    }
}
