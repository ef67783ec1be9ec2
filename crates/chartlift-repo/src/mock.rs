//! In-memory chart source and app gateway for testing
//!
//! Both record every call so tests can assert on the exact upload sequence
//! without a repository server or an app store.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::backend::ChartSource;
use crate::error::{RepoError, Result};
use crate::gateway::{AppGateway, UploadRequest};
use crate::index::{ChartVersionEntry, RepositoryIndex};

/// Chart source serving a fixed index
///
/// Every archive is the bytes of `"{name}-{version}"`.
#[derive(Clone, Default)]
pub struct MockChartSource {
    index: RepositoryIndex,
    /// `name:version` keys whose download fails
    broken: HashSet<String>,
    fetches: Arc<RwLock<Vec<String>>>,
}

impl MockChartSource {
    pub fn new(index: RepositoryIndex) -> Self {
        Self {
            index,
            ..Default::default()
        }
    }

    /// Make the download of `name:version` fail
    pub fn with_broken(mut self, name: &str, version: &str) -> Self {
        self.broken.insert(format!("{}:{}", name, version));
        self
    }

    /// Archive bytes served for an entry
    pub fn archive(name: &str, version: &str) -> Vec<u8> {
        format!("{}-{}", name, version).into_bytes()
    }

    /// `name:version` of every download attempt, in order
    pub fn fetches(&self) -> Vec<String> {
        self.fetches.read().unwrap().clone()
    }
}

#[async_trait]
impl ChartSource for MockChartSource {
    fn url(&self) -> &str {
        "mock://charts"
    }

    async fn fetch_index(&self) -> Result<RepositoryIndex> {
        Ok(self.index.clone())
    }

    async fn fetch_chart(&self, entry: &ChartVersionEntry) -> Result<Vec<u8>> {
        let key = format!("{}:{}", entry.name, entry.version);
        self.fetches.write().unwrap().push(key.clone());

        if self.broken.contains(&key) {
            return Err(RepoError::NetworkError {
                message: format!("connection reset while downloading {}", key),
            });
        }
        Ok(Self::archive(&entry.name, &entry.version))
    }
}

/// Canned failure returned by [`MockAppGateway`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// 404, the app store is missing
    NotFound,
    /// Any other status
    Rejected(u16),
}

impl MockFailure {
    fn into_error(self) -> RepoError {
        match self {
            MockFailure::NotFound => RepoError::AppStoreNotFound {
                url: "mock://appstore".to_string(),
            },
            MockFailure::Rejected(status) => RepoError::UploadRejected {
                status,
                body: "rejected by mock".to_string(),
            },
        }
    }
}

/// One call received by [`MockAppGateway`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    CreateApp { package: String },
    CreateVersion { app_id: String, package: String },
}

/// App gateway answering `app-{n}` for the n-th created application
#[derive(Clone, Default)]
pub struct MockAppGateway {
    calls: Arc<RwLock<Vec<GatewayCall>>>,
    /// Failures keyed by the 0-based call number
    failures: HashMap<usize, MockFailure>,
}

impl MockAppGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `call`-th request (0-based, counting both endpoints)
    pub fn fail_call(mut self, call: usize, failure: MockFailure) -> Self {
        self.failures.insert(call, failure);
        self
    }

    /// Every call received, in order
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.read().unwrap().clone()
    }

    pub fn create_app_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, GatewayCall::CreateApp { .. }))
            .count()
    }

    pub fn create_version_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, GatewayCall::CreateVersion { .. }))
            .count()
    }

    fn record(&self, call: GatewayCall) -> Result<usize> {
        let mut calls = self.calls.write().unwrap();
        let number = calls.len();
        calls.push(call);
        match self.failures.get(&number) {
            Some(failure) => Err(failure.into_error()),
            None => Ok(number),
        }
    }
}

#[async_trait]
impl AppGateway for MockAppGateway {
    async fn create_app(&self, request: &UploadRequest) -> Result<String> {
        self.record(GatewayCall::CreateApp {
            package: request.package.clone(),
        })?;
        Ok(format!("app-{}", self.create_app_count()))
    }

    async fn create_version(&self, app_id: &str, request: &UploadRequest) -> Result<String> {
        self.record(GatewayCall::CreateVersion {
            app_id: app_id.to_string(),
            package: request.package.clone(),
        })?;
        Ok(app_id.to_string())
    }
}
