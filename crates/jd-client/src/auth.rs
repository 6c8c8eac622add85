// crates/jd-client/src/auth.rs
//
// AuthClient: sign-in links and sign-out against the identity provider's
// REST routes (`<base>/api/auth/...`). Sessions themselves are read through
// the `session.getSession` procedure, never here.

use reqwest::header::{ACCEPT, COOKIE, SET_COOKIE};
use serde::Deserialize;

use crate::error::ClientError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CsrfResponse {
    csrf_token: String,
}

/// Client for the identity provider's browser-facing routes.
#[derive(Debug, Clone)]
pub struct AuthClient {
    /// Application base URL, e.g. `http://localhost:3000`.
    app_url: String,
    client: reqwest::Client,
}

impl AuthClient {
    pub fn new(app_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            app_url: app_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    fn auth_url(&self, route: &str) -> String {
        format!("{}/api/auth/{}", self.app_url, route)
    }

    /// Where to send the user to sign in with `provider` (e.g. "github").
    pub fn sign_in_url(&self, provider: &str) -> String {
        self.auth_url(&format!("signin/{}", provider))
    }

    /// End the session identified by `cookie`.
    ///
    /// Fetches a CSRF token, then posts it to the sign-out route together with
    /// the session cookie and the CSRF cookie the provider just set. Returns
    /// the cookie header after applying the provider's `Set-Cookie` replies,
    /// which no longer carries a cleared session cookie. Callers should send
    /// that header from now on and invalidate `session.getSession`.
    pub async fn sign_out(&self, cookie: Option<&str>) -> Result<Option<String>, ClientError> {
        let mut csrf_request = self.client.get(self.auth_url("csrf")).header(ACCEPT, "application/json");
        if let Some(cookie) = cookie {
            csrf_request = csrf_request.header(COOKIE, cookie);
        }
        let csrf_response = csrf_request.send().await?;
        if !csrf_response.status().is_success() {
            return Err(ClientError::Transport(format!(
                "CSRF request failed with HTTP {}",
                csrf_response.status()
            )));
        }

        let set_cookies = set_cookie_headers(&csrf_response);
        let csrf: CsrfResponse = csrf_response.json().await?;
        let cookie_header = merge_set_cookies(cookie, set_cookies.iter().map(String::as_str));

        let mut request = self.client.post(self.auth_url("signout")).form(&[
            ("csrfToken", csrf.csrf_token.as_str()),
            ("callbackUrl", self.app_url.as_str()),
        ]);
        if let Some(cookie_header) = &cookie_header {
            request = request.header(COOKIE, cookie_header.as_str());
        }

        let response = request.send().await?;
        // The provider answers a successful sign-out with a redirect.
        if response.status().is_success() || response.status().is_redirection() {
            let cleared = set_cookie_headers(&response);
            tracing::info!(cookies_updated = cleared.len(), "Signed out");
            Ok(merge_set_cookies(
                cookie_header.as_deref(),
                cleared.iter().map(String::as_str),
            ))
        } else {
            Err(ClientError::Transport(format!(
                "Sign-out failed with HTTP {}",
                response.status()
            )))
        }
    }
}

fn set_cookie_headers(response: &reqwest::Response) -> Vec<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok().map(str::to_string))
        .collect()
}

/// Whether a `Set-Cookie` value deletes its cookie: an empty value or a
/// non-positive `Max-Age`.
fn clears_cookie(value: &str, attributes: &str) -> bool {
    value.is_empty()
        || attributes.split(';').any(|attr| match attr.split_once('=') {
            Some((name, age)) if name.trim().eq_ignore_ascii_case("max-age") => {
                age.trim().parse::<i64>().map_or(false, |age| age <= 0)
            }
            _ => false,
        })
}

/// Merge the `name=value` part of `Set-Cookie` headers into a cookie header.
/// Newly set cookies replace existing ones of the same name; cleared cookies
/// are removed.
pub fn merge_set_cookies<'a, I>(existing: Option<&str>, set_cookies: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut pairs: Vec<(String, String)> = existing
        .unwrap_or("")
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            Some((name.trim().to_string(), value.trim().to_string()))
        })
        .filter(|(name, _)| !name.is_empty())
        .collect();

    for set_cookie in set_cookies {
        let (first, attributes) = set_cookie.split_once(';').unwrap_or((set_cookie, ""));
        if let Some((name, value)) = first.split_once('=') {
            let name = name.trim().to_string();
            let value = value.trim().to_string();
            if clears_cookie(&value, attributes) {
                pairs.retain(|(n, _)| *n != name);
                continue;
            }
            match pairs.iter_mut().find(|(n, _)| *n == name) {
                Some(existing) => existing.1 = value,
                None => pairs.push((name, value)),
            }
        }
    }

    if pairs.is_empty() {
        None
    } else {
        Some(
            pairs
                .into_iter()
                .map(|(n, v)| format!("{}={}", n, v))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}
