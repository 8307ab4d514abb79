//! Caller identity.

use serde::{Deserialize, Serialize};

/// Who is making the request.
///
/// Set by the Authentication unit; consumed by the RateLimit unit to choose a
/// client key and by dispatchers for attribution.
///
/// # Example
///
/// ```
/// use courier_core::CallerIdentity;
///
/// let identity = CallerIdentity::user("user-123");
/// assert_eq!(identity.user_id(), Some("user-123"));
/// assert_eq!(identity.log_id(), "user:user-123");
/// assert!(CallerIdentity::Anonymous.user_id().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CallerIdentity {
    /// No credentials were presented.
    #[default]
    Anonymous,
    /// A bearer token was accepted.
    User {
        /// Stable user identifier.
        user_id: String,
    },
}

impl CallerIdentity {
    /// Creates a user identity.
    #[must_use]
    pub fn user(user_id: impl Into<String>) -> Self {
        Self::User {
            user_id: user_id.into(),
        }
    }

    /// Returns the user id when authenticated.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::User { user_id } => Some(user_id),
            Self::Anonymous => None,
        }
    }

    /// Returns `true` when no credentials were accepted.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }

    /// Returns a string identifier suitable for logging.
    ///
    /// Never contains the raw token.
    #[must_use]
    pub fn log_id(&self) -> String {
        match self {
            Self::User { user_id } => format!("user:{user_id}"),
            Self::Anonymous => "anonymous".to_string(),
        }
    }
}
