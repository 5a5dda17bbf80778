//! Route matching for the request gate.
//!
//! Two independent decisions live here:
//! - [`GateScope`]: does the gate run for this path at all (deployment matcher)
//! - [`RouteClassifier`]: once it runs, is the path public or private

use thiserror::Error;

/// Extensions the sync controller never syncs on.
const SYNC_EXEMPT_EXTENSIONS: &[&str] = &["ico", "png", "jpg", "jpeg", "svg", "css", "js"];

/// Extensions the gate does not run for at all, matched as prefixes of the
/// text after any `.` in the path (`woff` also covers `woff2`).
/// `js` is handled separately so that `.json` still goes through the gate.
const STATIC_FILE_EXTENSIONS: &[&str] = &[
    "htm", "css", "jpg", "jpeg", "webp", "png", "gif", "svg", "ttf", "woff", "ico", "csv",
    "doc", "xls", "zip", "webmanifest",
];

#[derive(Debug, Error, PartialEq, Eq)]
#[error("route pattern '{0}' has an empty prefix and would make every route public")]
pub struct EmptyPrefixPattern(pub String);

/// A single allow-list entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutePattern {
    /// Matches only this exact path.
    Exact(String),
    /// Matches any path starting with this literal.
    Prefix(String),
}

impl RoutePattern {
    pub fn matches(&self, path: &str) -> bool {
        match self {
            RoutePattern::Exact(literal) => path == literal,
            RoutePattern::Prefix(literal) => path.starts_with(literal.as_str()),
        }
    }

    /// Parse one pattern. `/foo(.*)` and `/foo*` are prefixes, anything else is exact.
    pub fn parse(raw: &str) -> Result<Self, EmptyPrefixPattern> {
        let raw = raw.trim();
        let prefix = raw.strip_suffix("(.*)").or_else(|| raw.strip_suffix('*'));

        match prefix {
            Some("") => Err(EmptyPrefixPattern(raw.to_string())),
            Some(literal) => Ok(RoutePattern::Prefix(literal.to_string())),
            None => Ok(RoutePattern::Exact(raw.to_string())),
        }
    }

    /// Parse a comma-separated list, keeping order. Blank entries are skipped.
    pub fn parse_list(raw: &str) -> Result<Vec<Self>, EmptyPrefixPattern> {
        raw.split(',')
            .filter(|entry| !entry.trim().is_empty())
            .map(Self::parse)
            .collect()
    }
}

/// Decides whether a path is reachable without a signed-in user.
#[derive(Debug, Clone)]
pub struct RouteClassifier {
    patterns: Vec<RoutePattern>,
}

impl RouteClassifier {
    pub fn new(patterns: Vec<RoutePattern>) -> Self {
        Self { patterns }
    }

    /// Default-deny: only paths matching an allow-list entry are public.
    pub fn is_public(&self, path: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.matches(path))
    }
}

/// Which paths the gate is mounted on.
///
/// Framework internals and static files bypass the gate; API paths never do.
#[derive(Debug, Clone, Copy, Default)]
pub struct GateScope;

impl GateScope {
    /// A static extension anywhere in the path keeps the gate out, not only
    /// on the last segment: `/docs/app.js/edit` and `/download.zipper` bypass it.
    pub fn applies_to(&self, path: &str) -> bool {
        if path.starts_with("/api") || path.starts_with("/trpc") {
            return true;
        }
        let Some(rest) = path.strip_prefix('/') else {
            return false;
        };
        if rest.starts_with("_next") {
            return false;
        }
        !path.match_indices('.').any(|(dot, _)| is_static_suffix(&path[dot + 1..]))
    }
}

fn is_static_suffix(after_dot: &str) -> bool {
    if let Some(rest) = after_dot.strip_prefix("js") {
        return !rest.starts_with("on");
    }
    STATIC_FILE_EXTENSIONS
        .iter()
        .any(|ext| after_dot.starts_with(ext))
}

/// Whether the sync controller must leave this path alone.
///
/// Extensions are compared case-sensitively against whatever follows the last `.`.
pub fn is_sync_exempt(path: &str) -> bool {
    path.starts_with("/api/sync")
        || path.starts_with("/api/")
        || path
            .rsplit_once('.')
            .is_some_and(|(_, ext)| SYNC_EXEMPT_EXTENSIONS.contains(&ext))
}
