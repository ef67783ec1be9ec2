//! Standard exit codes for CLI operations
//!
//! Every fatal failure class gets its own code so wrapping jobs can tell a
//! bad configuration from an unreachable cluster.

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Configuration error - missing or invalid settings
pub const CONFIG_ERROR: i32 = 2;

/// Repository error - index could not be fetched or parsed
pub const REPOSITORY_ERROR: i32 = 3;

/// App store error - upload endpoint missing
pub const APP_STORE_ERROR: i32 = 4;

/// Cluster error - client could not be built
pub const CLUSTER_ERROR: i32 = 5;

/// Publish error - a reconciliation phase failed
pub const PUBLISH_ERROR: i32 = 6;
