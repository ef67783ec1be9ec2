//! Version retention
//!
//! Two passes over one chart's versions, in index order:
//!
//! 1. Skip marking: versions are grouped by their minor prefix (`XY` in
//!    `XY.Z`). Inside a run of the same group only a version whose patch is
//!    higher than every patch seen so far in the run is kept; the others are
//!    marked as older patches. Helm indexes list newest first, so this keeps
//!    the latest patch of each minor line.
//! 2. Cap: kept versions are counted and processing of the chart stops as
//!    soon as the count goes past `max_versions`.
//!
//! The group boundary test is substring containment of the current prefix in
//! the previous one, so `1.1` following `1.11` counts as the same group.
//! [`GroupBoundary::Exact`] switches to plain equality.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::index::ChartVersionEntry;

/// How consecutive minor prefixes are compared
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GroupBoundary {
    /// Same group while the current prefix is a substring of the previous one
    #[default]
    Substring,
    /// Same group only when the prefixes are equal
    Exact,
}

impl GroupBoundary {
    fn same_group(self, current: &str, previous: &str) -> bool {
        match self {
            GroupBoundary::Substring => previous.contains(current),
            GroupBoundary::Exact => previous == current,
        }
    }
}

/// Retention policy applied to every chart
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Keep only the latest patch of each minor group
    pub latest_patch_only: bool,
    /// Maximum number of kept versions per chart
    pub max_versions: Option<usize>,
    /// Minor group boundary test
    pub boundary: GroupBoundary,
}

impl RetentionPolicy {
    /// Upload every version
    pub fn keep_all() -> Self {
        Self::default()
    }
}

/// Decision for one index entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Upload this version
    Keep,
    /// A higher patch of the same minor group was already kept
    OlderPatch,
    /// The chart already reached its version cap
    CapReached,
}

impl Decision {
    pub fn is_keep(self) -> bool {
        self == Decision::Keep
    }

    /// Short reason, for plan output and logs
    pub fn reason(self) -> &'static str {
        match self {
            Decision::Keep => "keep",
            Decision::OlderPatch => "older patch",
            Decision::CapReached => "version cap reached",
        }
    }
}

/// Decisions for one chart, aligned with the raw index positions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    decisions: Vec<Decision>,
}

impl Selection {
    /// Decision per raw index position
    pub fn decisions(&self) -> &[Decision] {
        &self.decisions
    }

    /// Raw index positions of kept versions, in order
    pub fn kept(&self) -> impl Iterator<Item = usize> + '_ {
        self.decisions
            .iter()
            .enumerate()
            .filter(|(_, d)| d.is_keep())
            .map(|(idx, _)| idx)
    }

    pub fn kept_count(&self) -> usize {
        self.count(Decision::Keep)
    }

    pub fn count(&self, decision: Decision) -> usize {
        self.decisions.iter().filter(|d| **d == decision).count()
    }
}

/// Applies a [`RetentionPolicy`] to a chart's version list
#[derive(Debug, Clone, Default)]
pub struct VersionSelector {
    policy: RetentionPolicy,
}

impl VersionSelector {
    pub fn new(policy: RetentionPolicy) -> Self {
        Self { policy }
    }

    /// Pass 1: version strings that are not the latest patch of their group
    pub fn older_patches(&self, entries: &[ChartVersionEntry]) -> HashSet<String> {
        let mut skip = HashSet::new();
        let mut last_xy = String::new();
        let mut latest_z: Option<u64> = None;

        for entry in entries {
            let (xy, z) = split_version(&entry.version);

            if !self.policy.boundary.same_group(xy, &last_xy) {
                latest_z = None;
            }

            match parse_patch(z) {
                Some(z) if latest_z.is_none_or(|latest| z > latest) => latest_z = Some(z),
                Some(_) => {
                    skip.insert(entry.version.clone());
                }
                // Not comparable, never skipped
                None => {}
            }

            last_xy.clear();
            last_xy.push_str(xy);
        }

        skip
    }

    /// Both passes: one decision per entry
    pub fn select(&self, entries: &[ChartVersionEntry]) -> Selection {
        let skip = if self.policy.latest_patch_only {
            self.older_patches(entries)
        } else {
            HashSet::new()
        };

        let mut decisions = Vec::with_capacity(entries.len());
        let mut kept = 0usize;

        for entry in entries {
            if skip.contains(&entry.version) {
                decisions.push(Decision::OlderPatch);
                continue;
            }

            kept += 1;
            if self.policy.max_versions.is_some_and(|max| kept > max) {
                break;
            }
            decisions.push(Decision::Keep);
        }

        decisions.resize(entries.len(), Decision::CapReached);
        Selection { decisions }
    }
}

/// Split `1.2.3` into (`1.2`, `3`); a version without dots has an empty prefix
fn split_version(version: &str) -> (&str, &str) {
    version.rsplit_once('.').unwrap_or(("", version))
}

/// Leading digits of a patch segment (`3-rc.1` -> 3)
fn parse_patch(segment: &str) -> Option<u64> {
    let end = segment
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(segment.len());
    segment[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(versions: &[&str]) -> Vec<ChartVersionEntry> {
        versions
            .iter()
            .map(|v| ChartVersionEntry::new("demo", *v, format!("https://e.com/demo-{v}.tgz")))
            .collect()
    }

    fn latest_patch(max_versions: Option<usize>) -> VersionSelector {
        VersionSelector::new(RetentionPolicy {
            latest_patch_only: true,
            max_versions,
            boundary: GroupBoundary::Substring,
        })
    }

    #[test]
    fn test_split_version() {
        assert_eq!(split_version("1.2.3"), ("1.2", "3"));
        assert_eq!(split_version("10.0"), ("10", "0"));
        assert_eq!(split_version("7"), ("", "7"));
        assert_eq!(split_version("1.2.3-rc.1"), ("1.2.3-rc", "1"));
    }

    #[test]
    fn test_parse_patch() {
        assert_eq!(parse_patch("3"), Some(3));
        assert_eq!(parse_patch("12-beta"), Some(12));
        assert_eq!(parse_patch("0+build.5"), Some(0));
        assert_eq!(parse_patch("x"), None);
        assert_eq!(parse_patch(""), None);
    }

    #[test]
    fn test_older_patch_in_same_minor_is_skipped() {
        let list = entries(&["1.2.3", "1.2.2", "1.3.0"]);
        let selector = latest_patch(None);

        let skip = selector.older_patches(&list);
        assert_eq!(skip, HashSet::from(["1.2.2".to_string()]));

        let selection = selector.select(&list);
        assert_eq!(
            selection.decisions(),
            &[Decision::Keep, Decision::OlderPatch, Decision::Keep]
        );
        assert_eq!(selection.kept().collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn test_latest_patch_per_minor_line() {
        let list = entries(&["2.1.4", "2.1.3", "2.1.0", "2.0.9", "2.0.8", "1.9.0"]);
        let selection = latest_patch(None).select(&list);
        assert_eq!(selection.kept().collect::<Vec<_>>(), vec![0, 3, 5]);
        assert_eq!(selection.count(Decision::OlderPatch), 3);
    }

    #[test]
    fn test_ascending_patches_are_all_kept() {
        // Each patch is higher than the last one seen in the run
        let list = entries(&["1.0.0", "1.0.1", "1.0.2"]);
        let selection = latest_patch(None).select(&list);
        assert_eq!(selection.kept_count(), 3);
    }

    #[test]
    fn test_substring_boundary_keeps_group_open() {
        // "1.1" is contained in "1.11": no reset, patch 3 is below 5
        let list = entries(&["1.11.5", "1.1.3"]);
        let selection = latest_patch(None).select(&list);
        assert_eq!(
            selection.decisions(),
            &[Decision::Keep, Decision::OlderPatch]
        );

        // The other way round "1.11" is not inside "1.1": reset
        let list = entries(&["1.1.3", "1.11.2"]);
        let selection = latest_patch(None).select(&list);
        assert_eq!(selection.kept_count(), 2);
    }

    #[test]
    fn test_exact_boundary_resets_on_any_change() {
        let selector = VersionSelector::new(RetentionPolicy {
            latest_patch_only: true,
            max_versions: None,
            boundary: GroupBoundary::Exact,
        });
        let list = entries(&["1.11.5", "1.1.3"]);
        assert_eq!(selector.select(&list).kept_count(), 2);
    }

    #[test]
    fn test_duplicate_version_strings_share_skip() {
        // The skip set is keyed by version string
        let list = entries(&["1.0.2", "1.0.1", "1.0.1"]);
        let selection = latest_patch(None).select(&list);
        assert_eq!(
            selection.decisions(),
            &[Decision::Keep, Decision::OlderPatch, Decision::OlderPatch]
        );
    }

    #[test]
    fn test_non_numeric_patch_is_kept() {
        let list = entries(&["1.0.5", "1.0.x", "1.0.4"]);
        let selection = latest_patch(None).select(&list);
        assert_eq!(
            selection.decisions(),
            &[Decision::Keep, Decision::Keep, Decision::OlderPatch]
        );
    }

    #[test]
    fn test_cap_stops_chart() {
        let list = entries(&["3.0.0", "2.0.0", "1.0.0", "0.9.0", "0.8.0"]);
        let selection = latest_patch(Some(2)).select(&list);
        assert_eq!(
            selection.decisions(),
            &[
                Decision::Keep,
                Decision::Keep,
                Decision::CapReached,
                Decision::CapReached,
                Decision::CapReached,
            ]
        );
    }

    #[test]
    fn test_cap_counts_only_kept() {
        let list = entries(&["1.2.3", "1.2.2", "1.2.1", "1.3.0", "1.4.0"]);
        let selection = latest_patch(Some(2)).select(&list);
        assert_eq!(
            selection.decisions(),
            &[
                Decision::Keep,
                Decision::OlderPatch,
                Decision::OlderPatch,
                Decision::Keep,
                Decision::CapReached,
            ]
        );
    }

    #[test]
    fn test_cap_without_latest_patch_filter() {
        let selector = VersionSelector::new(RetentionPolicy {
            latest_patch_only: false,
            max_versions: Some(2),
            boundary: GroupBoundary::Substring,
        });
        let list = entries(&["1.2.3", "1.2.2", "1.2.1"]);
        let selection = selector.select(&list);
        assert_eq!(selection.kept().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(selection.count(Decision::CapReached), 1);
    }

    #[test]
    fn test_keep_all() {
        let list = entries(&["1.2.3", "1.2.2", "1.2.1"]);
        let selection = VersionSelector::new(RetentionPolicy::keep_all()).select(&list);
        assert_eq!(selection.kept_count(), 3);
        assert_eq!(selection.decisions().len(), 3);
    }

    #[test]
    fn test_empty_chart() {
        let selection = latest_patch(Some(1)).select(&[]);
        assert!(selection.decisions().is_empty());
        assert_eq!(selection.kept_count(), 0);
    }
}
