use serde::{Deserialize, Serialize};

use crate::UserId;

/// Authenticated caller attached to a request after token validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    user_id: UserId,
    username: String,
    is_superuser: bool,
}

impl CurrentUser {
    /// Creates a current user from authentication data.
    #[must_use]
    pub fn new(user_id: UserId, username: impl Into<String>, is_superuser: bool) -> Self {
        Self {
            user_id,
            username: username.into(),
            is_superuser,
        }
    }

    /// Returns the stable user identifier.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the login name for the current user.
    #[must_use]
    pub fn username(&self) -> &str {
        self.username.as_str()
    }

    /// Returns whether the account carries the superuser flag.
    ///
    /// Superusers bypass context refinement the same way holders of the
    /// `admin` role do; the flag exists for break-glass accounts created
    /// outside role administration.
    #[must_use]
    pub fn is_superuser(&self) -> bool {
        self.is_superuser
    }
}
