use serde::{Deserialize, Serialize};

/// An authenticated (or offline) player session.
///
/// Sessions are produced by an external authentication collaborator; the
/// crate only consumes them. An absent access token denotes an offline
/// session, which is valid input for launching but restricts online
/// multiplayer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    pub access_token: Option<String>,
}

impl Session {
    /// Creates an offline session for the given username.
    pub fn offline(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            access_token: None,
        }
    }

    pub fn is_online(&self) -> bool {
        self.access_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}
