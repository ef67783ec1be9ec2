//! Chartlift Kube - publishing imported applications
//!
//! This crate provides:
//! - **Resources**: KubeSphere `Application` / `ApplicationVersion` kinds, label
//!   constants and JSON path mutation over dynamic objects
//! - **Store**: the [`ResourceStore`] seam with a Kubernetes-backed and an
//!   in-memory implementation
//! - **Reconciler**: the four publish phases run after an import

pub mod error;
pub mod mock;
pub mod reconcile;
pub mod resources;
pub mod store;

pub use error::{KubeError, Result};
pub use mock::{MockOperation, MockResourceStore, OperationCounts};
pub use reconcile::{Phase, ReconcileReport, Reconciler};
pub use resources::{
    APP_ID_LABEL, APP_STORE_LABEL, CATEGORY_LABEL, ResourceKind, UNCATEGORIZED, set_nested_field,
};
pub use store::{KubeResourceStore, ResourceStore};
