//! Fetch ref-spec parsing and expansion
//!
//! Supports the subset git uses for fetch configuration: an optional leading
//! `+` (force), a source pattern, an optional `:destination`, and at most one
//! `*` wildcard per side.

use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// A single fetch ref-spec such as `+refs/heads/*:refs/remotes/origin/*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RefSpec {
    force: bool,
    source: String,
    destination: Option<String>,
}

impl RefSpec {
    /// Parse a ref-spec string.
    pub fn parse(spec: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidRefSpec {
            spec: spec.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = spec.trim();
        let (force, body) = match trimmed.strip_prefix('+') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        let (source, destination) = match body.split_once(':') {
            Some((src, dst)) if dst.is_empty() => (src, None),
            Some((src, dst)) => (src, Some(dst)),
            None => (body, None),
        };

        if source.is_empty() {
            return Err(invalid("empty source"));
        }

        let src_stars = source.matches('*').count();
        if src_stars > 1 {
            return Err(invalid("more than one wildcard in source"));
        }
        if let Some(dst) = destination {
            let dst_stars = dst.matches('*').count();
            if dst_stars > 1 {
                return Err(invalid("more than one wildcard in destination"));
            }
            if dst_stars != src_stars {
                return Err(invalid("wildcard must appear on both sides"));
            }
        }

        Ok(Self {
            force,
            source: source.to_string(),
            destination: destination.map(str::to_string),
        })
    }

    /// Build a non-wildcard spec mapping `source` onto `destination`.
    pub fn single(force: bool, source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            force,
            source: source.into(),
            destination: Some(destination.into()),
        }
    }

    pub fn is_force(&self) -> bool {
        self.force
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn destination(&self) -> Option<&str> {
        self.destination.as_deref()
    }

    pub fn is_wildcard(&self) -> bool {
        self.source.contains('*')
    }

    /// Whether a remote reference name is selected by the source side.
    pub fn matches_source(&self, name: &str) -> bool {
        capture(&self.source, name).is_some()
    }

    /// Whether a local reference name is selected by the destination side.
    pub fn matches_destination(&self, name: &str) -> bool {
        self.destination
            .as_deref()
            .is_some_and(|dst| capture(dst, name).is_some())
    }

    /// Map a remote reference name onto its local tracking reference.
    ///
    /// Returns `None` when the name is not matched or the spec has no destination.
    pub fn to_destination(&self, name: &str) -> Option<String> {
        let dst = self.destination.as_deref()?;
        let captured = capture(&self.source, name)?;
        Some(dst.replacen('*', captured, 1))
    }

    /// Map a local tracking reference name back onto its remote source name.
    pub fn to_source(&self, name: &str) -> Option<String> {
        let dst = self.destination.as_deref()?;
        let captured = capture(dst, name)?;
        Some(self.source.replacen('*', captured, 1))
    }

    /// Narrow a wildcard spec to a single concrete source reference.
    ///
    /// Keeps the force flag, so `+refs/heads/*:refs/remotes/origin/*` expanded
    /// for `refs/heads/main` becomes `+refs/heads/main:refs/remotes/origin/main`.
    pub fn expand_for(&self, name: &str) -> Option<RefSpec> {
        let destination = self.to_destination(name)?;
        Some(Self::single(self.force, name, destination))
    }
}

/// Match `name` against a pattern with at most one `*`, returning the captured part.
fn capture<'a>(pattern: &str, name: &'a str) -> Option<&'a str> {
    match pattern.split_once('*') {
        None => (pattern == name).then_some(""),
        Some((prefix, suffix)) => {
            if name.len() < prefix.len() + suffix.len() {
                return None;
            }
            let rest = name.strip_prefix(prefix)?;
            let captured = rest.strip_suffix(suffix)?;
            (!captured.is_empty()).then_some(captured)
        }
    }
}

impl FromStr for RefSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        RefSpec::parse(s)
    }
}

impl fmt::Display for RefSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.force {
            write!(f, "+")?;
        }
        write!(f, "{}", self.source)?;
        if let Some(dst) = &self.destination {
            write!(f, ":{}", dst)?;
        }
        Ok(())
    }
}
