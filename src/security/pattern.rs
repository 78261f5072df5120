//! Origin pattern compilation.
//!
//! # Responsibilities
//! - Turn a configured pattern entry into an anchored regular expression
//! - Literal entries: escape metacharacters, insert the preview subdomain slot
//! - Free-form entries (`/…/`): use the body verbatim, anchored
//!
//! # Design Decisions
//! - Every pattern is anchored `^…$`; substring matches are impossible
//! - Empty entries compile to nothing rather than to a match-all
//! - Compilation happens once, when the policy is built

use regex::Regex;

const SCHEME_SEPARATOR: &str = "://";

/// Optional `{label}--{number}.` prefix used by preview deployments.
const PREVIEW_SLOT: &str = "(?:[A-Za-z0-9-]+--[0-9]+\\.)?";

/// Error compiling a pattern entry.
#[derive(Debug, thiserror::Error)]
#[error("invalid origin pattern '{entry}': {source}")]
pub struct PatternError {
    pub entry: String,
    #[source]
    pub source: regex::Error,
}

/// How a pattern entry was written in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    /// A literal origin with the implicit preview subdomain slot.
    Literal,
    /// A free-form regular expression.
    Regex,
}

/// A compiled, anchored origin pattern.
#[derive(Debug, Clone)]
pub struct OriginPattern {
    kind: PatternKind,
    source: String,
    regex: Regex,
}

impl OriginPattern {
    /// Compile a configured entry.
    ///
    /// Returns `Ok(None)` for entries that are empty after trimming.
    pub fn compile(entry: &str) -> Result<Option<Self>, PatternError> {
        let entry = entry.trim();
        if entry.is_empty() {
            return Ok(None);
        }

        let (kind, body) = match free_form_body(entry) {
            Some(body) if body.is_empty() => return Ok(None),
            Some(body) => (PatternKind::Regex, body.to_string()),
            None => (PatternKind::Literal, literal_expression(entry)),
        };

        let regex = Regex::new(&format!("^(?:{body})$")).map_err(|source| PatternError {
            entry: entry.to_string(),
            source,
        })?;

        Ok(Some(Self {
            kind,
            source: entry.to_string(),
            regex,
        }))
    }

    /// True if the whole origin matches.
    pub fn matches(&self, origin: &str) -> bool {
        self.regex.is_match(origin)
    }

    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    /// The entry as written in configuration.
    pub fn source(&self) -> &str {
        &self.source
    }
}

fn free_form_body(entry: &str) -> Option<&str> {
    if entry.len() >= 2 && entry.starts_with('/') && entry.ends_with('/') {
        Some(&entry[1..entry.len() - 1])
    } else {
        None
    }
}

fn literal_expression(origin: &str) -> String {
    match origin.find(SCHEME_SEPARATOR) {
        Some(idx) => {
            let (scheme, rest) = origin.split_at(idx + SCHEME_SEPARATOR.len());
            format!("{}{PREVIEW_SLOT}{}", regex::escape(scheme), regex::escape(rest))
        }
        None => format!("{PREVIEW_SLOT}{}", regex::escape(origin)),
    }
}
