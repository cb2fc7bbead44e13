//! Author projection.
//!
//! A read-only view over a user identity for rendering: display name
//! fallback chain and a gravatar-style avatar URL. There is no author
//! table; this is derived from the user row on demand.

use agora_db::entities::user;
use serde::Serialize;

/// Rendering view of a post author.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorView {
    /// User ID.
    pub id: String,
    /// Username.
    pub username: String,
    /// Display name: the user's name when set, otherwise the username.
    pub display_name: String,
    /// Gravatar URL derived from the email address.
    pub avatar_url: String,
}

impl AuthorView {
    /// Build the view from a user row.
    #[must_use]
    pub fn from_user(user: &user::Model) -> Self {
        let display_name = user
            .name
            .clone()
            .unwrap_or_else(|| user.username.clone());

        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            display_name,
            avatar_url: gravatar_url(&user.email),
        }
    }
}

/// Gravatar URL for an email address: md5 of the trimmed, lowercased
/// address, with identicon fallback.
#[must_use]
pub fn gravatar_url(email: &str) -> String {
    let digest = md5::compute(email.trim().to_lowercase().as_bytes());
    format!("https://www.gravatar.com/avatar/{digest:x}?d=identicon")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn test_user(name: Option<&str>) -> user::Model {
        user::Model {
            id: "u1".to_string(),
            username: "alice".to_string(),
            email: "MyEmailAddress@example.com ".to_string(),
            name: name.map(ToString::to_string),
            is_moderator: false,
            created_at: Utc::now().into(),
        }
    }

    #[test]
    fn test_display_name_prefers_name() {
        let view = AuthorView::from_user(&test_user(Some("Alice A.")));
        assert_eq!(view.display_name, "Alice A.");
    }

    #[test]
    fn test_display_name_falls_back_to_username() {
        let view = AuthorView::from_user(&test_user(None));
        assert_eq!(view.display_name, "alice");
    }

    #[test]
    fn test_gravatar_normalizes_email() {
        // Reference hash from the gravatar documentation.
        let view = AuthorView::from_user(&test_user(None));
        assert_eq!(
            view.avatar_url,
            "https://www.gravatar.com/avatar/0bc83cb571cd1c50ba6f3e8a78ef1346?d=identicon"
        );
    }
}
