// crates/jd-cli/src/pages/home.rs
//
// The home page: title, link cards, the hello greeting and the auth showcase.

use jd_client::QueryState;
use jd_core::Session;

pub const TITLE: &str = "Create JD App";
pub const LOADING: &str = "Loading tRPC query";
pub const HELLO_NAME: &str = "from tRPC";

/// A link card on the home page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkCard {
    pub title: &'static str,
    pub href: &'static str,
    pub blurb: &'static str,
}

pub const LINK_CARDS: [LinkCard; 2] = [
    LinkCard {
        title: "Solid Start →",
        href: "https://start.solidjs.com",
        blurb: "Learn more about Solid Start and the basics.",
    },
    LinkCard {
        title: "JD End →",
        href: "https://github.com/orjdev/create-jd-app",
        blurb: "Learn more about Create JD App, the libraries it uses, and how to deploy it",
    },
];

/// The greeting, or the loading placeholder while pending or failed.
pub fn render_hello(hello: &QueryState<String>) -> String {
    match hello.data() {
        Some(greeting) => greeting.clone(),
        None => LOADING.to_string(),
    }
}

/// Whether the showcase offers sign-out (a session is known) or sign-in.
pub fn action_label(session: &QueryState<Option<Session>>) -> &'static str {
    match session.data() {
        Some(Some(_)) => "Sign out",
        _ => "Sign in",
    }
}

/// "Logged in as <name>" when a session exists, followed by the action label.
pub fn render_auth_showcase(session: &QueryState<Option<Session>>) -> String {
    let mut lines = Vec::new();
    if let Some(Some(session)) = session.data() {
        lines.push(format!(
            "Logged in as {}",
            session.display_name().unwrap_or("unknown user")
        ));
    }
    lines.push(format!("[ {} ]", action_label(session)));
    lines.join("\n")
}

fn render_card(card: &LinkCard) -> String {
    format!("  {}\n    {}\n    {}", card.title, card.blurb, card.href)
}

/// The whole page.
pub fn render_home(hello: &QueryState<String>, session: &QueryState<Option<Session>>) -> String {
    let rule = "=".repeat(TITLE.len());
    let cards: Vec<String> = LINK_CARDS.iter().map(render_card).collect();

    format!(
        "{rule}\n{TITLE}\n{rule}\n\n{}\n\n{}\n\n{}\n",
        cards.join("\n\n"),
        render_hello(hello),
        render_auth_showcase(session),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use jd_client::ClientError;
    use jd_core::SessionUser;

    fn session(name: &str) -> Session {
        Session {
            user: SessionUser {
                name: Some(name.to_string()),
                ..SessionUser::default()
            },
            expires: None,
        }
    }

    #[test]
    fn test_hello_placeholder_until_loaded() {
        assert_eq!(render_hello(&QueryState::Pending), "Loading tRPC query");
        assert_eq!(
            render_hello(&QueryState::Error(ClientError::Transport("down".into()))),
            "Loading tRPC query"
        );
        assert_eq!(
            render_hello(&QueryState::Success("Hello from tRPC".to_string())),
            "Hello from tRPC"
        );
    }

    #[test]
    fn test_showcase_signed_in() {
        let text = render_auth_showcase(&QueryState::Success(Some(session("Ada"))));
        assert!(text.contains("Logged in as Ada"));
        assert!(text.contains("Sign out"));
    }

    #[test]
    fn test_showcase_signed_out_or_unknown() {
        for state in [QueryState::Success(None), QueryState::Pending] {
            let text = render_auth_showcase(&state);
            assert!(!text.contains("Logged in"));
            assert!(text.contains("Sign in"));
        }
    }

    #[test]
    fn test_home_layout() {
        let page = render_home(
            &QueryState::Success("Hello from tRPC".to_string()),
            &QueryState::Success(None),
        );
        assert!(page.contains("Create JD App"));
        assert!(page.contains("https://start.solidjs.com"));
        assert!(page.contains("https://github.com/orjdev/create-jd-app"));

        let hello_at = page.find("Hello from tRPC").unwrap();
        let action_at = page.find("Sign in").unwrap();
        assert!(hello_at < action_at);
    }
}
