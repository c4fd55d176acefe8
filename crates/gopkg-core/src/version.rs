//! Version tags, declared version specs, and ordering.
//!
//! Two orderings live here. [`compare_versions`] is the lightweight numeric
//! comparator used to classify staleness (`list`, `check`, `update`): it only
//! looks at `major.minor.patch` and never fails. [`sort_versions_desc`] and
//! [`latest_release`] use full semantic-version precedence via the `semver`
//! crate, so pre-release tags order correctly when listing what a registry
//! publishes.

use std::cmp::Ordering;
use std::fmt;

/// The keyword accepted in place of a concrete version tag.
pub const LATEST: &str = "latest";

/// A declared version constraint: a concrete tag or `latest`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionSpec {
    /// Track whatever the registry reports as newest.
    Latest,
    /// A concrete version tag such as `v1.14.17`.
    Exact(String),
}

impl VersionSpec {
    /// Parse a declared spec. Anything other than `latest` is a concrete tag.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s == LATEST {
            VersionSpec::Latest
        } else {
            VersionSpec::Exact(s.to_string())
        }
    }

    pub fn is_latest(&self) -> bool {
        matches!(self, VersionSpec::Latest)
    }

    pub fn as_str(&self) -> &str {
        match self {
            VersionSpec::Latest => LATEST,
            VersionSpec::Exact(v) => v,
        }
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compare two dot-separated version strings numerically.
///
/// A leading `v` is ignored. Up to three components are compared; a missing
/// component, or one with no leading digits, counts as zero. Pre-release and
/// build suffixes are not ordered: `v1.2.3-rc1` compares equal to `v1.2.3`.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let a = numeric_components(a);
    let b = numeric_components(b);
    a.cmp(&b)
}

fn numeric_components(v: &str) -> [u64; 3] {
    let v = v.trim();
    let v = v.strip_prefix('v').unwrap_or(v);
    let mut out = [0u64; 3];
    for (slot, part) in out.iter_mut().zip(v.split('.')) {
        let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
        *slot = digits.parse().unwrap_or(0);
    }
    out
}

/// Parse a registry tag as a semantic version, tolerating a leading `v`.
pub fn parse_tag(tag: &str) -> Option<semver::Version> {
    let t = tag.trim();
    let t = t.strip_prefix('v').unwrap_or(t);
    semver::Version::parse(t).ok()
}

/// Whether a tag denotes a pre-release.
pub fn is_prerelease(tag: &str) -> bool {
    match parse_tag(tag) {
        Some(v) => !v.pre.is_empty(),
        None => {
            let lower = tag.to_ascii_lowercase();
            ["alpha", "beta", "rc"].iter().any(|m| lower.contains(m))
        }
    }
}

/// Total order by semantic-version precedence.
///
/// Valid semver tags sort above tags that do not parse; the latter fall back
/// to [`compare_versions`], then to plain string order so the result is
/// deterministic. Build metadata (`+incompatible`) does not affect
/// precedence but still breaks ties.
pub fn precedence(a: &str, b: &str) -> Ordering {
    match (parse_tag(a), parse_tag(b)) {
        (Some(va), Some(vb)) => va.cmp_precedence(&vb).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => compare_versions(a, b).then_with(|| a.cmp(b)),
    }
}

/// Sort tags newest-first by [`precedence`].
pub fn sort_versions_desc(versions: &mut [String]) {
    versions.sort_by(|a, b| precedence(b, a));
}

/// Pick the newest release tag, or the newest pre-release when no release
/// exists. Returns `None` for an empty list.
pub fn latest_release(versions: &[String]) -> Option<&str> {
    let newest = move |want_release: bool| {
        versions
            .iter()
            .filter(|v| is_prerelease(v) != want_release)
            .max_by(|a, b| precedence(a, b))
            .map(String::as_str)
    };
    newest(true).or_else(|| newest(false))
}
