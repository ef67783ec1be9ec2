//! Chartlift Chart Import
//!
//! This crate moves charts from a Helm repository into the KubeSphere app
//! store:
//!
//! - **Index fetching**: download and parse the repository's `index.yaml`
//! - **Version retention**: keep the latest patch per minor line, cap the
//!   number of versions per chart
//! - **Uploads**: create one application per chart from its first version,
//!   attach every later version to it
//!
//! ## Example
//!
//! ```rust,no_run
//! use chartlift_repo::{
//!     AppStoreGateway, Credentials, HttpRepository, Importer, MirrorRewriter, RetentionPolicy,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = HttpRepository::new("https://charts.example.com", MirrorRewriter::default())?;
//! let credentials = Credentials::bearer("token").resolve()?;
//! let gateway = AppStoreGateway::new("http://ks-apiserver", credentials)?;
//!
//! let mut importer = Importer::new(source, gateway, RetentionPolicy::keep_all(), "openpitrix-import");
//! let report = importer.run().await?;
//! println!("{}", report.summary());
//! # Ok(())
//! # }
//! ```
//!
//! ## Failure handling
//!
//! - Index failures and a missing app store endpoint abort the run
//! - Download and upload failures of single versions are recorded in the
//!   [`ImportReport`] and the run continues

pub mod error;
pub mod config;
pub mod credentials;
pub mod index;
pub mod backend;
pub mod http;
pub mod mirror;
pub mod selection;
pub mod pacing;
pub mod gateway;
pub mod report;
pub mod importer;
pub mod mock;

// Re-exports for convenience
pub use error::{RepoError, Result};
pub use config::{DEFAULT_MARKER, ImportConfig, RetentionConfig};
pub use credentials::{Credentials, ResolvedCredentials, SERVICE_ACCOUNT_TOKEN_PATH};
pub use index::{ChartVersionEntry, RepositoryIndex};
pub use backend::ChartSource;
pub use http::HttpRepository;
pub use mirror::{MirrorRewriter, MirrorRule};
pub use selection::{Decision, GroupBoundary, RetentionPolicy, Selection, VersionSelector};
pub use pacing::{DEFAULT_PACE, Pacer};
pub use gateway::{AppGateway, AppStoreGateway, UploadRequest};
pub use report::{ChartReport, EntryOutcome, ImportReport, VersionOutcome};
pub use importer::Importer;
