//! Path rewrite table.
//!
//! The client addresses the backend through page-relative paths
//! (`/api/chat`, `/upload_and_ask`). A [`RouteTable`] maps those onto the
//! backend origin the same way a dev-server rewrite list does:
//!
//! ```rust
//! use docchat::routes::RouteTable;
//! use url::Url;
//!
//! let origin = Url::parse("http://127.0.0.1:8000").unwrap();
//! let routes = RouteTable::for_origin(&origin);
//! let url = routes.resolve("/api/chat").unwrap();
//! assert_eq!(url.as_str(), "http://127.0.0.1:8000/api/chat");
//! ```
//!
//! Patterns are `/`-separated. A `:name` segment captures one segment and a
//! trailing `:name*` captures the rest of the path (possibly empty).

use std::collections::HashMap;

use url::Url;

use crate::error::{Error, Result};

/// Path of the streaming chat endpoint.
pub const CHAT_PATH: &str = "/api/chat";
/// Path of the multipart upload-and-ask endpoint.
pub const UPLOAD_AND_ASK_PATH: &str = "/upload_and_ask";
/// Path of the backend health check.
pub const HEALTH_PATH: &str = "/api/health";

/// A single `source -> destination` rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteRule {
    pub source: String,
    pub destination: String,
}

impl RewriteRule {
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }

    /// Match `path` against the source pattern, returning captured params.
    fn capture(&self, path: &str) -> Option<HashMap<String, String>> {
        let pattern: Vec<&str> = split_segments(&self.source);
        let segments: Vec<&str> = split_segments(path);
        let mut params = HashMap::new();

        for (i, part) in pattern.iter().enumerate() {
            match part.strip_prefix(':') {
                Some(name) if name.ends_with('*') => {
                    if i != pattern.len() - 1 {
                        return None;
                    }
                    let rest = segments.get(i..).unwrap_or_default().join("/");
                    params.insert(name.trim_end_matches('*').to_string(), rest);
                    return Some(params);
                }
                Some(name) => {
                    let value = segments.get(i)?;
                    params.insert(name.to_string(), (*value).to_string());
                }
                None => {
                    if segments.get(i) != Some(part) {
                        return None;
                    }
                }
            }
        }

        (segments.len() == pattern.len()).then_some(params)
    }

    /// Substitute captured params into the destination.
    fn expand(&self, params: &HashMap<String, String>) -> String {
        let dest = &self.destination;
        let mut out = String::with_capacity(dest.len());
        let mut rest = dest.as_str();

        while let Some(pos) = rest.find(':') {
            out.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];
            let name_len = after
                .char_indices()
                .take_while(|(i, c)| {
                    c.is_ascii_alphanumeric() && (*i > 0 || c.is_ascii_alphabetic()) || *c == '_'
                })
                .count();

            // `http://host:8000` has colons that are not params.
            if name_len == 0 {
                out.push(':');
                rest = after;
                continue;
            }

            let name = &after[..name_len];
            let mut consumed = name_len;
            if after[name_len..].starts_with('*') {
                consumed += 1;
            }
            match params.get(name) {
                Some(value) => out.push_str(value),
                None => out.push_str(&after[..consumed]),
            }
            rest = &after[consumed..];
        }
        out.push_str(rest);

        // An empty catch-all leaves a trailing slash behind.
        if out.ends_with('/') && !self.destination.ends_with('/') {
            out.pop();
        }
        out
    }
}

fn split_segments(path: &str) -> Vec<&str> {
    path.trim_start_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect()
}

/// Ordered list of rewrite rules; the first match wins.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    rules: Vec<RewriteRule>,
}

impl RouteTable {
    pub fn new(rules: Vec<RewriteRule>) -> Self {
        Self { rules }
    }

    /// The two forwards the chat page relies on.
    pub fn for_origin(origin: &Url) -> Self {
        let base = origin.as_str().trim_end_matches('/');
        Self::new(vec![
            RewriteRule::new("/api/:path*", format!("{base}/api/:path*")),
            RewriteRule::new(UPLOAD_AND_ASK_PATH, format!("{base}{UPLOAD_AND_ASK_PATH}")),
        ])
    }

    pub fn rules(&self) -> &[RewriteRule] {
        &self.rules
    }

    /// Resolve a page-relative path (optionally with a query) to a backend URL.
    pub fn resolve(&self, path: &str) -> Result<Url> {
        let (path_part, query) = match path.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (path, None),
        };

        let rule_and_params = self
            .rules
            .iter()
            .find_map(|rule| rule.capture(path_part).map(|params| (rule, params)));

        let Some((rule, params)) = rule_and_params else {
            return Err(Error::NoRoute(path.to_string()));
        };

        let mut url = Url::parse(&rule.expand(&params))?;
        if let Some(q) = query {
            url.set_query(Some(q));
        }

        tracing::trace!(path = %path, url = %url, "Route resolved");
        Ok(url)
    }
}
