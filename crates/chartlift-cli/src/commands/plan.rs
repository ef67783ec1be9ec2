//! Plan command - show which versions an import would upload

use chartlift_repo::{
    ChartSource, Decision, HttpRepository, ImportConfig, Selection, VersionSelector,
};
use console::style;

use crate::error::Result;

/// What an import would do with one index entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannedAction {
    CreateApp,
    AttachVersion,
    /// Kept by retention, but the chart's first version creates no application
    Dropped,
    Skip(Decision),
}

impl PlannedAction {
    fn label(self) -> &'static str {
        match self {
            PlannedAction::CreateApp => "create application",
            PlannedAction::AttachVersion => "attach version",
            PlannedAction::Dropped => "dropped, application not created",
            PlannedAction::Skip(decision) => decision.reason(),
        }
    }

    fn uploads(self) -> bool {
        matches!(self, PlannedAction::CreateApp | PlannedAction::AttachVersion)
    }
}

/// Actions aligned with the raw index positions of a chart
pub fn plan_actions(selection: &Selection) -> Vec<PlannedAction> {
    let decisions = selection.decisions();
    let creates_app = decisions.first().is_some_and(|d| d.is_keep());

    decisions
        .iter()
        .enumerate()
        .map(|(idx, decision)| match decision {
            Decision::Keep if idx == 0 => PlannedAction::CreateApp,
            Decision::Keep if creates_app => PlannedAction::AttachVersion,
            Decision::Keep => PlannedAction::Dropped,
            other => PlannedAction::Skip(*other),
        })
        .collect()
}

/// Fetch the index and print the per-version plan
pub async fn run(config: &ImportConfig) -> Result<()> {
    config.validate_source()?;
    let source = HttpRepository::new(&config.repo_url()?, config.mirror_rewriter()?)?;
    let index = source.fetch_index().await?;
    let selector = VersionSelector::new(config.retention_policy());

    let mut uploads = 0;
    let mut skipped = 0;
    for (chart, entries) in index.charts() {
        let actions = plan_actions(&selector.select(entries));
        println!("{}", style(chart).bold());
        for (entry, action) in entries.iter().zip(&actions) {
            let marker = if action.uploads() {
                uploads += 1;
                style("+").green()
            } else {
                skipped += 1;
                style("-").dim()
            };
            println!("  {} {:<20} {}", marker, entry.version, style(action.label()).dim());
        }
    }

    println!();
    println!(
        "{} chart(s), {} version(s) to upload, {} left out",
        index.chart_count(),
        uploads,
        skipped
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartlift_repo::{ChartVersionEntry, RetentionPolicy};

    fn actions(versions: &[&str], policy: RetentionPolicy) -> Vec<PlannedAction> {
        let entries: Vec<_> = versions
            .iter()
            .map(|v| ChartVersionEntry::new("nginx", *v, format!("nginx-{v}.tgz")))
            .collect();
        plan_actions(&VersionSelector::new(policy).select(&entries))
    }

    #[test]
    fn test_first_version_creates_app() {
        let policy = RetentionPolicy {
            latest_patch_only: true,
            ..RetentionPolicy::keep_all()
        };
        assert_eq!(
            actions(&["1.2.3", "1.2.2", "1.3.0"], policy),
            vec![
                PlannedAction::CreateApp,
                PlannedAction::Skip(Decision::OlderPatch),
                PlannedAction::AttachVersion,
            ]
        );
    }

    #[test]
    fn test_skipped_first_version_drops_chart() {
        let policy = RetentionPolicy {
            latest_patch_only: true,
            ..RetentionPolicy::keep_all()
        };
        // the repeated 1.0.1 puts the first entry in the skip set too
        assert_eq!(
            actions(&["1.0.1", "1.0.2", "1.0.1", "1.1.0"], policy),
            vec![
                PlannedAction::Skip(Decision::OlderPatch),
                PlannedAction::Dropped,
                PlannedAction::Skip(Decision::OlderPatch),
                PlannedAction::Dropped,
            ]
        );
    }

    #[test]
    fn test_cap() {
        let policy = RetentionPolicy {
            max_versions: Some(1),
            ..RetentionPolicy::keep_all()
        };
        assert_eq!(
            actions(&["2.0.0", "1.0.0"], policy),
            vec![
                PlannedAction::CreateApp,
                PlannedAction::Skip(Decision::CapReached),
            ]
        );
    }
}
