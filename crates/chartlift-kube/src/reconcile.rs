//! Publish imported applications
//!
//! Freshly uploaded applications carry the import marker as their category.
//! Four phases run in a fixed order, each listing its targets again:
//!
//! 1. application status `active`, with an update time
//! 2. `app-store=true` label on every application
//! 3. version status `active`, published by `admin`
//! 4. category moved to `kubesphere-app-uncategorized`
//!
//! Phase 4 removes the marker, so a second run finds nothing to do. A
//! failure stops the run; earlier phases are not rolled back.

use std::fmt;

use kube::api::DynamicObject;
use serde_json::json;

use crate::error::Result;
use crate::resources::{
    label_selector, object_name, rfc3339_now, set_label, set_nested_field, ResourceKind,
    APP_ID_LABEL, APP_STORE_LABEL, CATEGORY_LABEL, PUBLISHER, UNCATEGORIZED,
};
use crate::store::ResourceStore;

/// Reconciliation phase, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AppStatus,
    AppStoreLabel,
    VersionStatus,
    Uncategorize,
}

impl Phase {
    pub const ALL: [Phase; 4] = [
        Phase::AppStatus,
        Phase::AppStoreLabel,
        Phase::VersionStatus,
        Phase::Uncategorize,
    ];

    /// 1-based position
    pub fn number(self) -> usize {
        match self {
            Phase::AppStatus => 1,
            Phase::AppStoreLabel => 2,
            Phase::VersionStatus => 3,
            Phase::Uncategorize => 4,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Phase::AppStatus => "application status",
            Phase::AppStoreLabel => "app store label",
            Phase::VersionStatus => "version status",
            Phase::Uncategorize => "category label",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}] {}", self.number(), Phase::ALL.len(), self.description())
    }
}

/// Objects updated by each phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub apps_activated: usize,
    pub apps_listed: usize,
    pub versions_activated: usize,
    pub apps_uncategorized: usize,
}

impl ReconcileReport {
    pub fn count(&self, phase: Phase) -> usize {
        match phase {
            Phase::AppStatus => self.apps_activated,
            Phase::AppStoreLabel => self.apps_listed,
            Phase::VersionStatus => self.versions_activated,
            Phase::Uncategorize => self.apps_uncategorized,
        }
    }

    fn count_mut(&mut self, phase: Phase) -> &mut usize {
        match phase {
            Phase::AppStatus => &mut self.apps_activated,
            Phase::AppStoreLabel => &mut self.apps_listed,
            Phase::VersionStatus => &mut self.versions_activated,
            Phase::Uncategorize => &mut self.apps_uncategorized,
        }
    }

    /// Whether the run found anything to publish
    pub fn is_empty(&self) -> bool {
        Phase::ALL.iter().all(|p| self.count(*p) == 0)
    }

    /// Format as human-readable summary
    pub fn summary(&self) -> String {
        if self.is_empty() {
            return "No applications to publish".to_string();
        }
        format!(
            "{} application(s) published, {} version(s) activated",
            self.apps_uncategorized, self.versions_activated
        )
    }
}

/// Runs the publish phases over applications tagged with a marker
pub struct Reconciler<S: ResourceStore> {
    store: S,
    marker: String,
}

impl<S: ResourceStore> Reconciler<S> {
    pub fn new(store: S, marker: impl Into<String>) -> Self {
        Self {
            store,
            marker: marker.into(),
        }
    }

    /// Run all four phases
    pub async fn run(&self) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::default();
        for phase in Phase::ALL {
            let count = match phase {
                Phase::AppStatus => self.activate_apps().await?,
                Phase::AppStoreLabel => self.label_apps(phase, APP_STORE_LABEL, "true").await?,
                Phase::VersionStatus => self.activate_versions().await?,
                Phase::Uncategorize => self.label_apps(phase, CATEGORY_LABEL, UNCATEGORIZED).await?,
            };
            *report.count_mut(phase) = count;
            tracing::info!(phase = phase.number(), updated = count, "{} completed", phase);
        }
        Ok(report)
    }

    /// Applications still carrying the import marker
    async fn marked_apps(&self, phase: Phase) -> Result<Vec<DynamicObject>> {
        let selector = label_selector(CATEGORY_LABEL, &self.marker);
        self.store
            .list(ResourceKind::Application, &selector)
            .await
            .map_err(|e| e.in_phase(phase, ResourceKind::Application.plural()))
    }

    async fn activate_apps(&self) -> Result<usize> {
        let phase = Phase::AppStatus;
        let apps = self.marked_apps(phase).await?;
        let count = apps.len();
        let now = rfc3339_now();

        for mut app in apps {
            let name = object_name(ResourceKind::Application, &app)?;
            activate_app(&mut app.data, &now).map_err(|e| e.in_phase(phase, &name))?;
            self.store
                .replace_status(ResourceKind::Application, &app)
                .await
                .map_err(|e| e.in_phase(phase, &name))?;
            tracing::debug!(phase = phase.number(), app = %name, "application activated");
        }
        Ok(count)
    }

    async fn label_apps(&self, phase: Phase, key: &str, value: &str) -> Result<usize> {
        let apps = self.marked_apps(phase).await?;
        let count = apps.len();

        for mut app in apps {
            let name = object_name(ResourceKind::Application, &app)?;
            set_label(&mut app, key, value);
            self.store
                .replace(ResourceKind::Application, &app)
                .await
                .map_err(|e| e.in_phase(phase, &name))?;
            tracing::debug!(phase = phase.number(), app = %name, label = %key, value = %value, "label set");
        }
        Ok(count)
    }

    async fn activate_versions(&self) -> Result<usize> {
        let phase = Phase::VersionStatus;
        let apps = self.marked_apps(phase).await?;
        let now = rfc3339_now();
        let mut count = 0;

        for app in &apps {
            let app_name = object_name(ResourceKind::Application, app)?;
            let versions = self
                .store
                .list(
                    ResourceKind::ApplicationVersion,
                    &label_selector(APP_ID_LABEL, &app_name),
                )
                .await
                .map_err(|e| e.in_phase(phase, &app_name))?;

            for mut version in versions {
                let name = object_name(ResourceKind::ApplicationVersion, &version)?;
                activate_version(&mut version.data, &now)
                    .map_err(|e| e.in_phase(phase, &name))?;
                self.store
                    .replace_status(ResourceKind::ApplicationVersion, &version)
                    .await
                    .map_err(|e| e.in_phase(phase, &name))?;
                tracing::debug!(phase = phase.number(), app = %app_name, version = %name, "version activated");
                count += 1;
            }
        }
        Ok(count)
    }
}

fn activate_app(data: &mut serde_json::Value, now: &str) -> Result<()> {
    set_nested_field(data, json!("active"), &["status", "state"])?;
    set_nested_field(data, json!(now), &["status", "updateTime"])
}

fn activate_version(data: &mut serde_json::Value, now: &str) -> Result<()> {
    set_nested_field(data, json!(now), &["status", "updated"])?;
    set_nested_field(data, json!(PUBLISHER), &["status", "userName"])?;
    set_nested_field(data, json!("active"), &["status", "state"])
}
