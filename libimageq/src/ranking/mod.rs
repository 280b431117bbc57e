//! Semantic-version ranking of container tags.
//!
//! Container tags are only loosely versioned: `v2.0.0`, `1.25-alpine` and
//! `3.19` are all meant as versions, while `latest` or `alpine` are not.
//! [`parse_version`] accepts the common shapes, and [`rank`] gives every tag
//! set a deterministic newest-first order.

use crate::metadata::TagInfo;
use regex::Regex;
use semver::{BuildMetadata, Prerelease, Version};
use std::cmp::Ordering;
use std::sync::LazyLock;


/// Distribution suffixes that decorate a version without changing it.
pub const VARIANT_SUFFIXES: [&str; 7] = [
    "-alpine",
    "-slim",
    "-buster",
    "-bullseye",
    "-bookworm",
    "-focal",
    "-jammy",
];

// Partial versions such as `1` or `1.21` are accepted and padded with zeros.
static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^v?(\d+)(?:\.(\d+))?(?:\.(\d+))?(?:-([0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))?(?:\+([0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))?$",
    )
    .expect("version pattern is valid")
});

/// Parses a tag into a semantic version.
///
/// One leading `v` and one variant suffix are removed first.
///
/// # Examples
///
/// ```
/// use libimageq::ranking::parse_version;
///
/// assert_eq!(parse_version("v1.2.3").unwrap().to_string(), "1.2.3");
/// assert_eq!(parse_version("1.25-alpine").unwrap().to_string(), "1.25.0");
/// assert!(parse_version("latest").is_none());
/// ```
pub fn parse_version(tag: &str) -> Option<Version> {
    let cleaned = tag.strip_prefix('v').unwrap_or(tag);
    let cleaned = VARIANT_SUFFIXES
        .iter()
        .find_map(|suffix| cleaned.strip_suffix(suffix))
        .unwrap_or(cleaned);

    let captures = VERSION_PATTERN.captures(cleaned)?;
    let number = |index: usize| -> Option<u64> {
        match captures.get(index) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };

    let mut version = Version::new(number(1)?, number(2)?, number(3)?);
    if let Some(pre) = captures.get(4) {
        version.pre = Prerelease::new(pre.as_str()).ok()?;
    }
    if let Some(build) = captures.get(5) {
        version.build = BuildMetadata::new(build.as_str()).ok()?;
    }
    Some(version)
}

/// Returns true when the tag parses as a semantic version.
pub fn is_versioned(tag: &str) -> bool {
    parse_version(tag).is_some()
}

/// Total newest-first order over tag names.
///
/// Versioned tags come before unversioned ones and are compared by semantic
/// precedence; equal versions fall back to ascending name. Unversioned tags
/// sort by descending name.
pub fn compare_tags(a: &str, b: &str) -> Ordering {
    compare_parsed((parse_version(a).as_ref(), a), (parse_version(b).as_ref(), b))
}

fn compare_parsed(a: (Option<&Version>, &str), b: (Option<&Version>, &str)) -> Ordering {
    match (a, b) {
        ((Some(va), name_a), (Some(vb), name_b)) => vb
            .cmp_precedence(va)
            .then_with(|| name_a.cmp(name_b)),
        ((Some(_), _), (None, _)) => Ordering::Less,
        ((None, _), (Some(_), _)) => Ordering::Greater,
        ((None, name_a), (None, name_b)) => name_b.cmp(name_a),
    }
}

/// Orders every tag, versioned or not, newest first.
pub fn rank(tags: Vec<TagInfo>) -> Vec<TagInfo> {
    let mut keyed: Vec<(Option<Version>, TagInfo)> = tags
        .into_iter()
        .map(|tag| (parse_version(&tag.name), tag))
        .collect();

    keyed.sort_by(|(va, a), (vb, b)| {
        compare_parsed((va.as_ref(), &a.name), (vb.as_ref(), &b.name))
    });

    keyed.into_iter().map(|(_, tag)| tag).collect()
}

/// Keeps only versioned tags, ordered as by [`rank`].
///
/// # Examples
///
/// ```
/// use libimageq::metadata::TagInfo;
/// use libimageq::ranking::filter_valid;
///
/// let tags = ["1.2.3", "latest", "1.2.4", "alpine", "v2.0.0"]
///     .into_iter()
///     .map(TagInfo::named)
///     .collect();
/// let names: Vec<String> = filter_valid(tags).into_iter().map(|t| t.name).collect();
/// assert_eq!(names, ["v2.0.0", "1.2.4", "1.2.3"]);
/// ```
pub fn filter_valid(tags: Vec<TagInfo>) -> Vec<TagInfo> {
    rank(
        tags.into_iter()
            .filter(|tag| is_versioned(&tag.name))
            .collect(),
    )
}
