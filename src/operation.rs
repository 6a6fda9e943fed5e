//! Operation vocabulary shared by the credential store and the
//! authorization server client.
//!
//! Both collaborators are driven by the same five operation types and answer
//! with the same small set of result states.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of operation submitted to a collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationType {
    /// Create a document (store) or POST (authorization server)
    Create,
    /// Read a document (store) or GET (authorization server)
    Read,
    /// Replace a document (store) or PUT (authorization server)
    Replace,
    /// Delete a document (store) or DELETE (authorization server)
    Delete,
    /// Query documents (store only)
    Search,
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "CREATE",
            Self::Read => "READ",
            Self::Replace => "REPLACE",
            Self::Delete => "DELETE",
            Self::Search => "SEARCH",
        };
        f.write_str(name)
    }
}

/// Outcome state reported by a collaborator.
///
/// For the authorization server the state is derived from the HTTP status:
/// 2xx is [`Success`](Self::Success), 401 is
/// [`NotAuthorized`](Self::NotAuthorized), 3xx is [`Warning`](Self::Warning),
/// 404 is [`NotExist`](Self::NotExist) and anything else is
/// [`Error`](Self::Error).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResultState {
    /// The operation succeeded
    Success,
    /// The operation failed
    Error,
    /// The addressed document or resource does not exist
    #[serde(rename = "NOTEXIST")]
    NotExist,
    /// The presented credential was rejected
    #[serde(rename = "NOTAUTHORIZED")]
    NotAuthorized,
    /// The operation was redirected
    Warning,
}

impl ResultState {
    /// Returns `true` for [`ResultState::Success`].
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl fmt::Display for ResultState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Success => "SUCCESS",
            Self::Error => "ERROR",
            Self::NotExist => "NOTEXIST",
            Self::NotAuthorized => "NOTAUTHORIZED",
            Self::Warning => "WARNING",
        };
        f.write_str(name)
    }
}
