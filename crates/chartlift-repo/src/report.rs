//! Per-entry import outcomes
//!
//! The import keeps going after per-version failures; every entry's fate is
//! recorded here so the run ends with a summary instead of silent skips.

use crate::selection::Decision;

/// What happened to one index entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    /// First version uploaded, application created
    Created { app_id: String },
    /// Version attached to the chart's application
    Attached,
    /// Left out by the retention policy
    PolicySkipped(Decision),
    /// Chart archive could not be downloaded
    FetchFailed(String),
    /// App store refused the upload or answered garbage
    UploadFailed(String),
    /// No application to attach the version to
    MissingAppId,
}

impl EntryOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            EntryOutcome::FetchFailed(_) | EntryOutcome::UploadFailed(_) | EntryOutcome::MissingAppId
        )
    }

    pub fn is_uploaded(&self) -> bool {
        matches!(self, EntryOutcome::Created { .. } | EntryOutcome::Attached)
    }

    /// Human-readable reason for failures and skips
    pub fn describe(&self) -> String {
        match self {
            EntryOutcome::Created { app_id } => format!("created application {}", app_id),
            EntryOutcome::Attached => "attached".to_string(),
            EntryOutcome::PolicySkipped(decision) => decision.reason().to_string(),
            EntryOutcome::FetchFailed(e) => format!("download failed: {}", e),
            EntryOutcome::UploadFailed(e) => format!("upload failed: {}", e),
            EntryOutcome::MissingAppId => "application was not created".to_string(),
        }
    }
}

/// Outcome of one version of a chart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionOutcome {
    pub version: String,
    pub outcome: EntryOutcome,
}

/// Outcomes of one chart
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChartReport {
    pub chart: String,
    /// Application identifier returned by the app store
    pub app_id: Option<String>,
    pub versions: Vec<VersionOutcome>,
}

impl ChartReport {
    pub fn new(chart: impl Into<String>) -> Self {
        Self {
            chart: chart.into(),
            ..Default::default()
        }
    }

    pub fn record(&mut self, version: impl Into<String>, outcome: EntryOutcome) {
        self.versions.push(VersionOutcome {
            version: version.into(),
            outcome,
        });
    }

    pub fn uploaded(&self) -> usize {
        self.versions.iter().filter(|v| v.outcome.is_uploaded()).count()
    }

    pub fn failed(&self) -> usize {
        self.versions.iter().filter(|v| v.outcome.is_failure()).count()
    }

    pub fn skipped(&self) -> usize {
        self.versions
            .iter()
            .filter(|v| matches!(v.outcome, EntryOutcome::PolicySkipped(_)))
            .count()
    }
}

/// Outcomes of a whole import run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub charts: Vec<ChartReport>,
}

impl ImportReport {
    /// Applications created during the run
    pub fn apps_created(&self) -> usize {
        self.charts.iter().filter(|c| c.app_id.is_some()).count()
    }

    pub fn uploaded(&self) -> usize {
        self.charts.iter().map(ChartReport::uploaded).sum()
    }

    pub fn failed(&self) -> usize {
        self.charts.iter().map(ChartReport::failed).sum()
    }

    pub fn skipped(&self) -> usize {
        self.charts.iter().map(ChartReport::skipped).sum()
    }

    /// Failed entries as (chart, outcome)
    pub fn failures(&self) -> impl Iterator<Item = (&str, &VersionOutcome)> {
        self.charts.iter().flat_map(|chart| {
            chart
                .versions
                .iter()
                .filter(|v| v.outcome.is_failure())
                .map(move |v| (chart.chart.as_str(), v))
        })
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// Format as human-readable summary
    pub fn summary(&self) -> String {
        let mut parts = Vec::with_capacity(4);
        parts.push(format!("{} chart(s)", self.charts.len()));
        parts.push(format!("{} version(s) uploaded", self.uploaded()));
        if self.skipped() > 0 {
            parts.push(format!("{} skipped by policy", self.skipped()));
        }
        if self.failed() > 0 {
            parts.push(format!("{} failed", self.failed()));
        }
        parts.join(", ")
    }
}
