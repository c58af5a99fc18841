//! HTML formatting helpers for outgoing messages.

use crate::api::UserRef;

/// Escape text for Telegram's HTML parse mode.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Clickable mention of a user, `<a href="tg://user?id=..">name</a>`.
pub fn mention_html(user: &UserRef) -> String {
    let name = if user.first_name.is_empty() {
        user.username.as_deref().unwrap_or("user")
    } else {
        user.first_name.as_str()
    };
    format!(
        "<a href=\"tg://user?id={}\">{}</a>",
        user.id,
        html_escape(name)
    )
}

/// Pick the singular or plural unit name for `count`.
pub fn unit_for<'a>(count: u64, singular: &'a str, plural: &'a str) -> &'a str {
    if count == 1 { singular } else { plural }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("a < b && c > d"), "a &lt; b &amp;&amp; c &gt; d");
        assert_eq!(html_escape("plain"), "plain");
    }

    #[test]
    fn test_mention_html_escapes_name() {
        let user = UserRef {
            id: 7,
            is_bot: false,
            first_name: "<Ana>".to_string(),
            username: None,
        };
        assert_eq!(
            mention_html(&user),
            "<a href=\"tg://user?id=7\">&lt;Ana&gt;</a>"
        );

        let nameless = UserRef {
            first_name: String::new(),
            username: Some("ana".to_string()),
            ..user
        };
        assert!(mention_html(&nameless).ends_with(">ana</a>"));
    }

    #[test]
    fn test_unit_for() {
        assert_eq!(unit_for(1, "trinket", "trinkets"), "trinket");
        assert_eq!(unit_for(0, "trinket", "trinkets"), "trinkets");
        assert_eq!(unit_for(3, "trinket", "trinkets"), "trinkets");
    }
}
