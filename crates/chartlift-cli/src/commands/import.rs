//! Import command - upload a repository's charts, then publish them

use chartlift_repo::{AppStoreGateway, HttpRepository, ImportConfig, Importer, Pacer};

use crate::display;
use crate::error::Result;

use super::publish;

/// Run a full import
///
/// Credentials and the cluster client are set up before any upload.
/// Per-version failures are reported but do not stop the run or the publish
/// phases.
pub async fn run(config: &ImportConfig, skip_publish: bool) -> Result<()> {
    config.validate()?;
    let credentials = config.credentials().resolve()?;
    tracing::debug!(scheme = credentials.scheme(), "app store credentials resolved");

    let store = if skip_publish {
        None
    } else {
        Some(publish::connect(config).await?)
    };

    let source = HttpRepository::new(&config.repo_url()?, config.mirror_rewriter()?)?;
    let gateway = AppStoreGateway::new(&config.server_url()?, credentials)?;
    let mut importer = Importer::new(source, gateway, config.retention_policy(), &config.marker)
        .with_pacer(Pacer::new(config.pace()));

    let report = importer.run().await?;
    tracing::info!(
        charts = report.charts.len(),
        apps_created = report.apps_created(),
        uploaded = report.uploaded(),
        skipped = report.skipped(),
        failed = report.failed(),
        "import finished"
    );
    display::print_import_report(&report);

    match store {
        Some(store) => publish::run_with(store, &config.marker).await,
        None => {
            tracing::info!("publish skipped, run `chartlift publish` to finish");
            Ok(())
        }
    }
}
