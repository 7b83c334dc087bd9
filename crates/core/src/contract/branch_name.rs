//! Validated, user-facing branch identifiers
//!
//! Branches have dual identity: a stable internal [`crate::EntityId`]-shaped
//! UUID assigned at creation, and a semantic, human-chosen `BranchName` used
//! everywhere in the facade and diagnostics.
//!
//! ## Grammar
//!
//! The wire grammar is `^[A-Za-z0-9][A-Za-z0-9_\-./]{0,63}$`: must start with
//! an alphanumeric character, 1-64 characters total, and otherwise draw from
//! `[A-Za-z0-9_\-./]`. This is the strictly narrower of the two rules named
//! in the branch-naming requirements, so it governs both internal
//! construction and REST-facing validation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a branch name, per the ยง6 grammar.
pub const MAX_BRANCH_NAME_LENGTH: usize = 64;

/// A validated branch name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BranchName(String);

/// Why a candidate branch name was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BranchNameError {
    /// The name was empty.
    #[error("branch name cannot be empty")]
    Empty,
    /// The name exceeded [`MAX_BRANCH_NAME_LENGTH`].
    #[error("branch name too long: {length} chars (max {max})")]
    TooLong {
        /// Actual length in bytes.
        length: usize,
        /// Maximum allowed length.
        max: usize,
    },
    /// The first character was not alphanumeric.
    #[error("branch name must start with an alphanumeric character, got '{char}'")]
    InvalidStart {
        /// The offending first character.
        char: char,
    },
    /// A character outside `[A-Za-z0-9_\-./]` appeared at `position`.
    #[error("invalid character '{char}' at position {position}")]
    InvalidChar {
        /// The offending character.
        char: char,
        /// Its byte position in the name.
        position: usize,
    },
}

impl BranchName {
    /// Validate and wrap a candidate branch name.
    pub fn new(name: impl Into<String>) -> Result<Self, BranchNameError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(BranchName(name))
    }

    /// Wrap a name without validating it.
    ///
    /// Reserved for names produced internally (e.g. the default branch) that
    /// are known to satisfy the grammar.
    pub fn new_unchecked(name: impl Into<String>) -> Self {
        BranchName(name.into())
    }

    /// Validate a candidate name against the ยง6 grammar.
    pub fn validate(name: &str) -> Result<(), BranchNameError> {
        if name.is_empty() {
            return Err(BranchNameError::Empty);
        }
        if name.len() > MAX_BRANCH_NAME_LENGTH {
            return Err(BranchNameError::TooLong {
                length: name.len(),
                max: MAX_BRANCH_NAME_LENGTH,
            });
        }
        let first = name.chars().next().expect("checked non-empty above");
        if !first.is_ascii_alphanumeric() {
            return Err(BranchNameError::InvalidStart { char: first });
        }
        for (position, ch) in name.char_indices() {
            if !Self::is_valid_char(ch) {
                return Err(BranchNameError::InvalidChar { char: ch, position });
            }
        }
        Ok(())
    }

    #[inline]
    fn is_valid_char(c: char) -> bool {
        c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/')
    }

    /// Borrow the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The canonical name of the default (trunk) branch.
    pub fn default_branch() -> Self {
        BranchName("main".to_string())
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for BranchName {
    type Err = BranchNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BranchName::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_typical_names() {
        assert!(BranchName::new("branch2").is_ok());
        assert!(BranchName::new("feature/add-vlan").is_ok());
        assert!(BranchName::new("release.2024-01").is_ok());
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(BranchName::new(""), Err(BranchNameError::Empty));
    }

    #[test]
    fn rejects_spaces() {
        // "not valid" per scenario S1
        assert!(matches!(
            BranchName::new("not valid"),
            Err(BranchNameError::InvalidChar { char: ' ', .. })
        ));
    }

    #[test]
    fn rejects_leading_dash() {
        assert!(matches!(
            BranchName::new("-branch"),
            Err(BranchNameError::InvalidStart { char: '-' })
        ));
    }

    #[test]
    fn rejects_too_long() {
        let name = "a".repeat(MAX_BRANCH_NAME_LENGTH + 1);
        assert!(matches!(
            BranchName::new(name),
            Err(BranchNameError::TooLong { .. })
        ));
    }
}
