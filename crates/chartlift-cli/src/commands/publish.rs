//! Publish command - activate and list imported applications

use chartlift_kube::{KubeResourceStore, Reconciler, ResourceStore};
use chartlift_repo::ImportConfig;

use crate::display;
use crate::error::{CliError, Result};

/// Run the four publish phases over applications carrying the marker
pub async fn run(config: &ImportConfig) -> Result<()> {
    let store = connect(config).await?;
    run_with(store, &config.marker).await
}

/// Check the marker and open the cluster client
///
/// `import` calls this before uploading so a broken kubeconfig fails the run
/// while nothing has been created yet.
pub async fn connect(config: &ImportConfig) -> Result<KubeResourceStore> {
    if config.marker.trim().is_empty() {
        return Err(CliError::config("marker must not be empty"));
    }
    Ok(KubeResourceStore::connect(config.kubeconfig.as_deref()).await?)
}

/// Publish through an already connected store
pub async fn run_with<S: ResourceStore>(store: S, marker: &str) -> Result<()> {
    let report = Reconciler::new(store, marker).run().await?;
    tracing::info!(
        apps = report.apps_uncategorized,
        versions = report.versions_activated,
        "publish finished"
    );
    display::print_reconcile_report(&report);
    Ok(())
}
