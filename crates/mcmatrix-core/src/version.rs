//! Game version ordering and range predicates.
//!
//! [`McVersion`] is a totally ordered value type over revision identifiers
//! (`1.20`, `1.20.1`, `1.21.4-rc1`). [`VersionReq`] is the predicate
//! language used by directive markers: whitespace-separated comparators
//! that must all hold (`>=1.20.2 <=1.21`, `1.20.x`, `*`).
//!
//! Partial versions in comparators follow x-range semantics: `<=1.21`
//! admits every `1.21.x`, `>1.21` means "at least `1.22.0`", and a bare
//! `1.21` is the x-range `1.21.*`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{McMatrixError, Result};

// ---------------------------------------------------------------------------
// McVersion
// ---------------------------------------------------------------------------

/// A parsed revision identifier: MAJOR.MINOR.PATCH with optional
/// pre-release suffix. Missing minor/patch components parse as zero, but
/// the original token is retained for display and file naming.
///
/// Immutable once parsed. Ordering ignores the original token: `1.20` and
/// `1.20.0` compare equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct McVersion {
    major: u64,
    minor: u64,
    patch: u64,
    pre: Option<String>,
    raw: String,
}

impl McVersion {
    /// Parse a revision identifier.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(invalid_version(input, "empty version"));
        }

        let (numeric, pre) = match trimmed.split_once('-') {
            Some((n, p)) if !p.is_empty() => (n, Some(p.to_string())),
            Some(_) => return Err(invalid_version(input, "empty pre-release")),
            None => (trimmed, None),
        };

        let mut parts = numeric.split('.');
        let major = parse_component(input, parts.next())?;
        let minor = match parts.next() {
            Some(c) => parse_component(input, Some(c))?,
            None => 0,
        };
        let patch = match parts.next() {
            Some(c) => parse_component(input, Some(c))?,
            None => 0,
        };
        if parts.next().is_some() {
            return Err(invalid_version(input, "more than three components"));
        }

        Ok(Self {
            major,
            minor,
            patch,
            pre,
            raw: trimmed.to_string(),
        })
    }

    /// The original token, exactly as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    fn triple(&self) -> (u64, u64, u64) {
        (self.major, self.minor, self.patch)
    }
}

fn parse_component(input: &str, component: Option<&str>) -> Result<u64> {
    let c = component.ok_or_else(|| invalid_version(input, "missing component"))?;
    c.parse::<u64>()
        .map_err(|_| invalid_version(input, "non-numeric component"))
}

fn invalid_version(input: &str, reason: &str) -> McMatrixError {
    McMatrixError::InvalidVersion {
        input: input.to_string(),
        reason: reason.to_string(),
    }
}

/// Pre-release < release for equal numeric versions; two pre-releases
/// compare lexically.
fn pre_cmp(a: &Option<String>, b: &Option<String>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (Some(x), Some(y)) => x.cmp(y),
    }
}

impl PartialEq for McVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for McVersion {}

impl Ord for McVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.triple()
            .cmp(&other.triple())
            .then_with(|| pre_cmp(&self.pre, &other.pre))
    }
}

impl PartialOrd for McVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for McVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl FromStr for McVersion {
    type Err = McMatrixError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for McVersion {
    type Error = McMatrixError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<McVersion> for String {
    fn from(v: McVersion) -> String {
        v.raw
    }
}

// ---------------------------------------------------------------------------
// VersionReq
// ---------------------------------------------------------------------------

/// A comparator operand: a version with possibly-unspecified trailing
/// components (`1.21` leaves patch open, `1.x` leaves minor and patch open).
#[derive(Debug, Clone)]
struct VersionPattern {
    major: u64,
    minor: Option<u64>,
    patch: Option<u64>,
    pre: Option<String>,
}

impl VersionPattern {
    fn parse(req: &str, token: &str) -> Result<Self> {
        let (numeric, pre) = match token.split_once('-') {
            Some((n, p)) if !p.is_empty() => (n, Some(p.to_string())),
            Some(_) => return Err(invalid_requirement(req, "empty pre-release")),
            None => (token, None),
        };

        let mut components = numeric.split('.');
        let major = match components.next() {
            Some(c) if !is_wildcard(c) => c
                .parse::<u64>()
                .map_err(|_| invalid_requirement(req, "non-numeric component"))?,
            _ => return Err(invalid_requirement(req, "wildcard major version")),
        };
        let minor = parse_open_component(req, components.next())?;
        let patch = match minor {
            Some(_) => parse_open_component(req, components.next())?,
            // `1.x.4` makes no sense; once a component is open the rest stay open.
            None => None,
        };
        if components.next().is_some() {
            return Err(invalid_requirement(req, "more than three components"));
        }

        Ok(Self {
            major,
            minor,
            patch,
            pre,
        })
    }

    fn is_full(&self) -> bool {
        self.minor.is_some() && self.patch.is_some()
    }

    /// Inclusive lower bound: unspecified components become zero.
    fn floor(&self) -> (u64, u64, u64) {
        (self.major, self.minor.unwrap_or(0), self.patch.unwrap_or(0))
    }

    /// Exclusive upper bound of the span covered by a partial pattern.
    /// `1.21` → `1.22.0`, `1` → `2.0.0`. Full patterns have no span.
    fn ceiling(&self) -> (u64, u64, u64) {
        match (self.minor, self.patch) {
            (None, _) => (self.major + 1, 0, 0),
            (Some(minor), None) => (self.major, minor + 1, 0),
            (Some(minor), Some(patch)) => (self.major, minor, patch),
        }
    }
}

fn parse_open_component(req: &str, component: Option<&str>) -> Result<Option<u64>> {
    match component {
        None => Ok(None),
        Some(c) if is_wildcard(c) => Ok(None),
        Some(c) => c
            .parse::<u64>()
            .map(Some)
            .map_err(|_| invalid_requirement(req, "non-numeric component")),
    }
}

fn is_wildcard(component: &str) -> bool {
    matches!(component, "x" | "X" | "*")
}

fn invalid_requirement(input: &str, reason: &str) -> McMatrixError {
    McMatrixError::InvalidRequirement {
        input: input.to_string(),
        reason: reason.to_string(),
    }
}

#[derive(Debug, Clone)]
enum Comparator {
    /// Bare token. Full precision is an exact match; partial precision is
    /// an x-range (`1.20` matches every `1.20.*`).
    Exact(VersionPattern),
    Gt(VersionPattern),
    Gte(VersionPattern),
    Lt(VersionPattern),
    Lte(VersionPattern),
    /// `*` — matches everything.
    Any,
}

impl Comparator {
    fn matches(&self, v: &McVersion) -> bool {
        match self {
            Comparator::Any => true,
            Comparator::Exact(p) => {
                if p.is_full() {
                    v.triple() == p.floor() && pre_cmp(&v.pre, &p.pre) == Ordering::Equal
                } else {
                    v.triple() >= p.floor() && v.triple() < p.ceiling()
                }
            }
            Comparator::Gte(p) => v.triple() >= p.floor(),
            Comparator::Lt(p) => v.triple() < p.floor(),
            Comparator::Gt(p) => {
                if p.is_full() {
                    v.triple() > p.floor() || (v.triple() == p.floor() && pre_cmp(&v.pre, &p.pre) == Ordering::Greater)
                } else {
                    // `>1.21` admits nothing in the 1.21 line.
                    v.triple() >= p.ceiling()
                }
            }
            Comparator::Lte(p) => {
                if p.is_full() {
                    v.triple() < p.floor() || (v.triple() == p.floor() && pre_cmp(&v.pre, &p.pre) != Ordering::Greater)
                } else {
                    // `<=1.21` admits the whole 1.21 line.
                    v.triple() < p.ceiling()
                }
            }
        }
    }
}

/// A version-range predicate: whitespace-separated comparators, all of
/// which must hold.
#[derive(Debug, Clone)]
pub struct VersionReq {
    comparators: Vec<Comparator>,
    raw: String,
}

impl VersionReq {
    /// Parse a predicate expression.
    pub fn parse(input: &str) -> Result<Self> {
        let raw = input.trim().to_string();
        if raw.is_empty() {
            return Err(invalid_requirement(input, "empty requirement"));
        }

        let mut comparators = Vec::new();
        for token in raw.split_whitespace() {
            comparators.push(parse_comparator(&raw, token)?);
        }

        Ok(Self { comparators, raw })
    }

    /// Whether `version` satisfies every comparator.
    pub fn matches(&self, version: &McVersion) -> bool {
        self.comparators.iter().all(|c| c.matches(version))
    }

    /// The predicate exactly as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

fn parse_comparator(req: &str, token: &str) -> Result<Comparator> {
    if token == "*" {
        return Ok(Comparator::Any);
    }
    if let Some(rest) = token.strip_prefix(">=") {
        return Ok(Comparator::Gte(VersionPattern::parse(req, rest)?));
    }
    if let Some(rest) = token.strip_prefix("<=") {
        return Ok(Comparator::Lte(VersionPattern::parse(req, rest)?));
    }
    if let Some(rest) = token.strip_prefix('>') {
        return Ok(Comparator::Gt(VersionPattern::parse(req, rest)?));
    }
    if let Some(rest) = token.strip_prefix('<') {
        return Ok(Comparator::Lt(VersionPattern::parse(req, rest)?));
    }
    if let Some(rest) = token.strip_prefix('=') {
        return Ok(Comparator::Exact(VersionPattern::parse(req, rest)?));
    }
    Ok(Comparator::Exact(VersionPattern::parse(req, token)?))
}

impl fmt::Display for VersionReq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl FromStr for VersionReq {
    type Err = McMatrixError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
