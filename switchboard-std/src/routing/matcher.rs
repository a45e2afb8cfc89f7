//! Path pattern compilation.
//!
//! Patterns use the familiar `:name` / `*name` syntax:
//!
//! | pattern            | matches            | params                 |
//! |--------------------|--------------------|------------------------|
//! | `/rooms/:id`       | `/rooms/42`        | `id = "42"`            |
//! | `/files/*path`     | `/files/a/b.txt`   | `path = "a/b.txt"`     |
//! | `/health`          | `/health`          | (none)                 |
//!
//! Each pattern is compiled once, at registration, into its own `matchit`
//! router holding a single entry. Literal segments match ASCII
//! case-insensitively; captured values keep the case of the path and are
//! percent-decoded. A raw `?` or `#` never belongs to a captured value, so a
//! path carrying a query or fragment does not match.

use matchit::Router as InnerRouter;
use percent_encoding::percent_decode_str;
use std::fmt;
use switchboard_core::{Params, RouteError};

/// Name given to a bare `*` catch-all.
const ANONYMOUS_WILDCARD: &str = "wildcard";

/// A compiled route pattern.
pub struct PathMatcher {
    pattern: String,
    inner: InnerRouter<()>,
}

impl PathMatcher {
    /// Compile `pattern`, rejecting anything the matcher cannot represent.
    pub fn compile(pattern: &str) -> Result<Self, RouteError> {
        let translated = translate(trim_trailing_slash(pattern));
        let mut inner = InnerRouter::new();
        inner
            .insert(translated, ())
            .map_err(|e| RouteError::InvalidPattern {
                pattern: pattern.to_owned(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            pattern: pattern.to_owned(),
            inner,
        })
    }

    /// The pattern as registered.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Match `path`, returning the decoded parameters on success.
    ///
    /// A trailing slash on the path is ignored. A captured value that contains
    /// `?` or `#`, or that does not percent-decode to UTF-8, is treated as a
    /// mismatch.
    pub fn matches(&self, path: &str) -> Option<Params> {
        let path = trim_trailing_slash(path);
        // ASCII lowering keeps every byte offset, so captures map back onto `path`.
        let folded = path.to_ascii_lowercase();
        let matched = self.inner.at(&folded).ok()?;
        matched
            .params
            .iter()
            .map(|(name, value)| {
                let start = (value.as_ptr() as usize).checked_sub(folded.as_ptr() as usize)?;
                let raw = path.get(start..start + value.len())?;
                if raw.contains(['?', '#']) {
                    return None;
                }
                percent_decode_str(raw)
                    .decode_utf8()
                    .ok()
                    .map(|value| (name.to_owned(), value.into_owned()))
            })
            .collect::<Option<Params>>()
    }
}

impl fmt::Debug for PathMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathMatcher")
            .field("pattern", &self.pattern)
            .finish()
    }
}

fn trim_trailing_slash(path: &str) -> &str {
    if path.len() > 1 {
        path.strip_suffix('/').unwrap_or(path)
    } else {
        path
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Rewrite `:name` and `*name` into matchit's `{name}` and `{*name}`.
///
/// Literal text is lowered to ASCII lowercase; parameter names are kept.
fn translate(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            ':' if chars.peek().copied().is_some_and(is_name_char) => {
                out.push('{');
                while let Some(n) = chars.next_if(|c| is_name_char(*c)) {
                    out.push(n);
                }
                out.push('}');
            }
            '*' => {
                out.push_str("{*");
                let mut named = false;
                while let Some(n) = chars.next_if(|c| is_name_char(*c)) {
                    out.push(n);
                    named = true;
                }
                if !named {
                    out.push_str(ANONYMOUS_WILDCARD);
                }
                out.push('}');
            }
            // Literal braces are escaped by doubling.
            '{' => out.push_str("{{"),
            '}' => out.push_str("}}"),
            other => out.push(other.to_ascii_lowercase()),
        }
    }
    out
}
