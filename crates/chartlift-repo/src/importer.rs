//! Import pipeline: index -> retention -> upload
//!
//! Charts are processed one at a time in index order, versions in index
//! order. The version at raw position 0 creates the application; later kept
//! versions are attached to the identifier it returned. When that identifier
//! is missing (the first version was skipped, failed to download or was
//! refused) later versions of the chart are dropped without calling the app
//! store.

use crate::backend::ChartSource;
use crate::error::Result;
use crate::gateway::{AppGateway, UploadRequest};
use crate::index::{ChartVersionEntry, RepositoryIndex};
use crate::pacing::Pacer;
use crate::report::{ChartReport, EntryOutcome, ImportReport};
use crate::selection::{Decision, RetentionPolicy, VersionSelector};

/// Uploads the charts of one repository to the app store
pub struct Importer<S: ChartSource, G: AppGateway> {
    source: S,
    gateway: G,
    selector: VersionSelector,
    pacer: Pacer,
    /// Category every uploaded application is tagged with
    marker: String,
}

impl<S: ChartSource, G: AppGateway> Importer<S, G> {
    pub fn new(source: S, gateway: G, policy: RetentionPolicy, marker: impl Into<String>) -> Self {
        Self {
            source,
            gateway,
            selector: VersionSelector::new(policy),
            pacer: Pacer::default(),
            marker: marker.into(),
        }
    }

    /// Replace the default upload pacing
    pub fn with_pacer(mut self, pacer: Pacer) -> Self {
        self.pacer = pacer;
        self
    }

    /// Fetch the index and import every chart
    ///
    /// Index failures and a missing app store abort the run; everything
    /// else is recorded in the report.
    pub async fn run(&mut self) -> Result<ImportReport> {
        tracing::info!(repo = %self.source.url(), "fetching repository index");
        let index = self.source.fetch_index().await?;
        tracing::info!(charts = index.chart_count(), "repository index loaded");
        self.import_index(&index).await
    }

    /// Import every chart of an already fetched index
    pub async fn import_index(&mut self, index: &RepositoryIndex) -> Result<ImportReport> {
        let mut report = ImportReport::default();
        for (chart, entries) in index.charts() {
            let chart_report = self.import_chart(chart, entries).await?;
            tracing::info!(
                chart = %chart,
                uploaded = chart_report.uploaded(),
                skipped = chart_report.skipped(),
                failed = chart_report.failed(),
                "chart processed"
            );
            report.charts.push(chart_report);
        }
        Ok(report)
    }

    /// Import the versions of one chart
    pub async fn import_chart(
        &mut self,
        chart: &str,
        entries: &[ChartVersionEntry],
    ) -> Result<ChartReport> {
        let selection = self.selector.select(entries);
        let mut report = ChartReport::new(chart);
        let mut app_id: Option<String> = None;

        if let Some(first) = selection
            .decisions()
            .iter()
            .position(|d| *d == Decision::CapReached)
        {
            tracing::debug!(
                chart = %chart,
                version = %entries[first].version,
                ignored = entries.len() - first,
                "version cap reached, ignoring remaining versions"
            );
        }

        for (idx, (entry, decision)) in entries.iter().zip(selection.decisions()).enumerate() {
            match decision {
                Decision::Keep => {}
                Decision::OlderPatch => {
                    tracing::debug!(chart = %chart, version = %entry.version, "skipping older patch");
                    report.record(&entry.version, EntryOutcome::PolicySkipped(*decision));
                    continue;
                }
                Decision::CapReached => {
                    report.record(&entry.version, EntryOutcome::PolicySkipped(*decision));
                    continue;
                }
            }

            if idx > 0 && app_id.is_none() {
                tracing::error!(
                    chart = %chart,
                    version = %entry.version,
                    "skipping version, application was not created"
                );
                report.record(&entry.version, EntryOutcome::MissingAppId);
                continue;
            }

            let package = match self.source.fetch_chart(entry).await {
                Ok(package) => package,
                Err(e) => {
                    tracing::error!(chart = %chart, version = %entry.version, error = %e, "failed to fetch chart");
                    report.record(&entry.version, EntryOutcome::FetchFailed(e.to_string()));
                    continue;
                }
            };
            let request = UploadRequest::helm(&package, &self.marker);

            self.pacer.ready().await;
            let outcome = match app_id.clone() {
                None => match self.gateway.create_app(&request).await {
                    Ok(id) => {
                        tracing::info!(chart = %chart, version = %entry.version, app_id = %id, "application created");
                        app_id = Some(id.clone());
                        report.app_id = Some(id.clone());
                        EntryOutcome::Created { app_id: id }
                    }
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        tracing::error!(chart = %chart, version = %entry.version, error = %e, "failed to create application");
                        app_id = None;
                        EntryOutcome::UploadFailed(e.to_string())
                    }
                },
                Some(id) => match self.gateway.create_version(&id, &request).await {
                    Ok(_) => {
                        tracing::info!(chart = %chart, version = %entry.version, app_id = %id, "version uploaded");
                        EntryOutcome::Attached
                    }
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        tracing::error!(chart = %chart, version = %entry.version, error = %e, "failed to upload version");
                        EntryOutcome::UploadFailed(e.to_string())
                    }
                },
            };
            report.record(&entry.version, outcome);
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RepoError;
    use crate::mock::{GatewayCall, MockAppGateway, MockChartSource, MockFailure};
    use crate::selection::GroupBoundary;
    use base64::Engine;

    const MARKER: &str = "openpitrix-import";

    fn index(charts: Vec<(&str, Vec<&str>)>) -> RepositoryIndex {
        let mut index = RepositoryIndex::default();
        for (name, versions) in charts {
            index.entries.insert(
                name.to_string(),
                versions
                    .iter()
                    .map(|v| ChartVersionEntry::new(name, *v, format!("charts/{name}-{v}.tgz")))
                    .collect(),
            );
        }
        index
    }

    fn package(name: &str, version: &str) -> String {
        base64::engine::general_purpose::STANDARD.encode(MockChartSource::archive(name, version))
    }

    fn importer(
        source: &MockChartSource,
        gateway: &MockAppGateway,
        policy: RetentionPolicy,
    ) -> Importer<MockChartSource, MockAppGateway> {
        Importer::new(source.clone(), gateway.clone(), policy, MARKER).with_pacer(Pacer::unlimited())
    }

    fn latest_patch(max_versions: Option<usize>) -> RetentionPolicy {
        RetentionPolicy {
            latest_patch_only: true,
            max_versions,
            boundary: GroupBoundary::Substring,
        }
    }

    #[tokio::test]
    async fn test_first_version_creates_then_attaches() {
        let source = MockChartSource::new(index(vec![("nginx", vec!["1.2.3", "1.2.2", "1.3.0"])]));
        let gateway = MockAppGateway::new();

        let report = importer(&source, &gateway, RetentionPolicy::keep_all())
            .run()
            .await
            .unwrap();

        assert_eq!(
            gateway.calls(),
            vec![
                GatewayCall::CreateApp {
                    package: package("nginx", "1.2.3")
                },
                GatewayCall::CreateVersion {
                    app_id: "app-1".to_string(),
                    package: package("nginx", "1.2.2")
                },
                GatewayCall::CreateVersion {
                    app_id: "app-1".to_string(),
                    package: package("nginx", "1.3.0")
                },
            ]
        );
        assert_eq!(report.uploaded(), 3);
        assert_eq!(report.charts[0].app_id.as_deref(), Some("app-1"));
    }

    #[tokio::test]
    async fn test_retention_skips_older_patch() {
        let source = MockChartSource::new(index(vec![("nginx", vec!["1.2.3", "1.2.2", "1.3.0"])]));
        let gateway = MockAppGateway::new();

        let report = importer(&source, &gateway, latest_patch(None))
            .run()
            .await
            .unwrap();

        assert_eq!(gateway.create_app_count(), 1);
        assert_eq!(gateway.create_version_count(), 1);
        assert_eq!(source.fetches(), vec!["nginx:1.2.3", "nginx:1.3.0"]);
        assert_eq!(
            report.charts[0].versions[1].outcome,
            EntryOutcome::PolicySkipped(Decision::OlderPatch)
        );
    }

    #[tokio::test]
    async fn test_cap_limits_uploads() {
        let source = MockChartSource::new(index(vec![(
            "redis",
            vec!["7.2.0", "7.1.0", "7.0.0", "6.2.0", "6.0.0"],
        )]));
        let gateway = MockAppGateway::new();

        let report = importer(&source, &gateway, latest_patch(Some(3)))
            .run()
            .await
            .unwrap();

        assert_eq!(gateway.calls().len(), 3);
        assert_eq!(source.fetches().len(), 3);
        assert_eq!(report.charts[0].skipped(), 2);
    }

    #[tokio::test]
    async fn test_skipped_first_version_drops_chart() {
        // The trailing 1.0.1 is an older patch than 1.0.2, and the skip set
        // is keyed by version string, so raw index 0 is skipped as well
        let source = MockChartSource::new(index(vec![(
            "demo",
            vec!["1.0.1", "1.0.2", "1.0.1", "1.1.0"],
        )]));
        let gateway = MockAppGateway::new();

        let report = importer(&source, &gateway, latest_patch(None))
            .run()
            .await
            .unwrap();

        assert_eq!(gateway.create_app_count(), 0);
        assert_eq!(gateway.calls().len(), 0);
        let outcomes: Vec<_> = report.charts[0]
            .versions
            .iter()
            .map(|v| v.outcome.clone())
            .collect();
        assert_eq!(
            outcomes,
            vec![
                EntryOutcome::PolicySkipped(Decision::OlderPatch),
                EntryOutcome::MissingAppId,
                EntryOutcome::PolicySkipped(Decision::OlderPatch),
                EntryOutcome::MissingAppId,
            ]
        );
        assert!(source.fetches().is_empty());
    }

    #[tokio::test]
    async fn test_failed_create_drops_remaining_versions() {
        let source = MockChartSource::new(index(vec![
            ("nginx", vec!["2.0.0", "1.0.0"]),
            ("redis", vec!["7.0.0", "6.0.0"]),
        ]));
        let gateway = MockAppGateway::new().fail_call(0, MockFailure::Rejected(500));

        let report = importer(&source, &gateway, RetentionPolicy::keep_all())
            .run()
            .await
            .unwrap();

        // nginx: create fails, 1.0.0 dropped; redis unaffected
        assert_eq!(
            gateway.calls(),
            vec![
                GatewayCall::CreateApp {
                    package: package("nginx", "2.0.0")
                },
                GatewayCall::CreateApp {
                    package: package("redis", "7.0.0")
                },
                GatewayCall::CreateVersion {
                    app_id: "app-2".to_string(),
                    package: package("redis", "6.0.0")
                },
            ]
        );
        assert_eq!(report.charts[0].app_id, None);
        assert_eq!(report.charts[0].versions[1].outcome, EntryOutcome::MissingAppId);
        assert_eq!(report.charts[1].uploaded(), 2);
        assert_eq!(report.failed(), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_of_first_version_drops_chart() {
        let source = MockChartSource::new(index(vec![("nginx", vec!["2.0.0", "1.0.0"])]))
            .with_broken("nginx", "2.0.0");
        let gateway = MockAppGateway::new();

        let report = importer(&source, &gateway, RetentionPolicy::keep_all())
            .run()
            .await
            .unwrap();

        assert!(gateway.calls().is_empty());
        assert!(matches!(
            report.charts[0].versions[0].outcome,
            EntryOutcome::FetchFailed(_)
        ));
        assert_eq!(report.charts[0].versions[1].outcome, EntryOutcome::MissingAppId);
    }

    #[tokio::test]
    async fn test_failed_version_does_not_stop_chart() {
        let source = MockChartSource::new(index(vec![("nginx", vec!["3.0.0", "2.0.0", "1.0.0"])]))
            .with_broken("nginx", "2.0.0");
        let gateway = MockAppGateway::new();

        let report = importer(&source, &gateway, RetentionPolicy::keep_all())
            .run()
            .await
            .unwrap();

        assert_eq!(gateway.create_app_count(), 1);
        assert_eq!(gateway.create_version_count(), 1);
        assert_eq!(report.charts[0].uploaded(), 2);
        assert_eq!(report.charts[0].failed(), 1);
    }

    #[tokio::test]
    async fn test_app_id_reused_verbatim() {
        let source =
            MockChartSource::new(index(vec![("nginx", vec!["4.0.0", "3.0.0", "2.0.0", "1.0.0"])]));
        let gateway = MockAppGateway::new();

        importer(&source, &gateway, RetentionPolicy::keep_all())
            .run()
            .await
            .unwrap();

        let ids: Vec<_> = gateway
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                GatewayCall::CreateVersion { app_id, .. } => Some(app_id),
                _ => None,
            })
            .collect();
        assert_eq!(ids, vec!["app-1", "app-1", "app-1"]);
    }

    #[tokio::test]
    async fn test_app_id_is_chart_local() {
        let source = MockChartSource::new(index(vec![
            ("nginx", vec!["2.0.0", "1.0.0"]),
            ("redis", vec!["7.0.0", "6.0.0"]),
        ]));
        let gateway = MockAppGateway::new();

        importer(&source, &gateway, RetentionPolicy::keep_all())
            .run()
            .await
            .unwrap();

        assert!(matches!(
            &gateway.calls()[3],
            GatewayCall::CreateVersion { app_id, .. } if app_id == "app-2"
        ));
    }

    #[tokio::test]
    async fn test_not_found_aborts_run() {
        let source = MockChartSource::new(index(vec![
            ("nginx", vec!["2.0.0", "1.0.0"]),
            ("redis", vec!["7.0.0"]),
        ]));
        let gateway = MockAppGateway::new().fail_call(1, MockFailure::NotFound);

        let err = importer(&source, &gateway, RetentionPolicy::keep_all())
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, RepoError::AppStoreNotFound { .. }));
        // Nothing after the 404 is attempted
        assert_eq!(gateway.calls().len(), 2);
        assert_eq!(source.fetches(), vec!["nginx:2.0.0", "nginx:1.0.0"]);
    }

    #[tokio::test]
    async fn test_packages_tagged_with_marker() {
        let request = UploadRequest::helm(&MockChartSource::archive("a", "1.0.0"), MARKER);
        assert_eq!(request.category_name, MARKER);
        assert_eq!(request.package, package("a", "1.0.0"));
    }
}
