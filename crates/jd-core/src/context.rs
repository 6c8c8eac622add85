// crates/jd-core/src/context.rs
//
// RequestContext: per-call data handed from the transport to a procedure.
// Built from the incoming HTTP request, cloned once per call in a batch and
// dropped when the call resolves.

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::wire::HttpMethod;

/// Incoming request metadata visible to procedure handlers.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Identifier used to correlate log lines of one HTTP request.
    pub request_id: Uuid,
    /// HTTP method the batch arrived with.
    pub method: HttpMethod,
    /// Dotted procedure path this context was issued for (set per call).
    pub path: Option<String>,
    /// Header map with lowercased names.
    headers: BTreeMap<String, String>,
    /// Cookies parsed from the `cookie` header.
    cookies: BTreeMap<String, String>,
}

impl RequestContext {
    /// Build a context from raw header pairs. Header names are case-insensitive;
    /// repeated headers are joined (`; ` for cookies, `, ` otherwise).
    pub fn new<I, K, V>(method: HttpMethod, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut map: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in headers {
            let name = name.as_ref().to_ascii_lowercase();
            let value = value.as_ref().trim();
            let sep = if name == "cookie" { "; " } else { ", " };
            map.entry(name)
                .and_modify(|existing| {
                    existing.push_str(sep);
                    existing.push_str(value);
                })
                .or_insert_with(|| value.to_string());
        }

        let cookies = map
            .get("cookie")
            .map(|raw| parse_cookies(raw))
            .unwrap_or_default();

        Self {
            request_id: Uuid::now_v7(),
            method,
            path: None,
            headers: map,
            cookies,
        }
    }

    /// A context with no headers, as seen by an anonymous caller.
    pub fn anonymous(method: HttpMethod) -> Self {
        Self::new(method, std::iter::empty::<(&str, &str)>())
    }

    /// Derive the context for a single call of a batch.
    pub fn for_call(&self, path: &str) -> Self {
        let mut ctx = self.clone();
        ctx.path = Some(path.to_string());
        ctx
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// The raw `cookie` header, if any.
    pub fn cookie_header(&self) -> Option<&str> {
        self.header("cookie")
    }

    pub fn has_cookies(&self) -> bool {
        !self.cookies.is_empty()
    }
}

fn parse_cookies(raw: &str) -> BTreeMap<String, String> {
    raw.split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            let value = value.trim().trim_matches('"');
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}
