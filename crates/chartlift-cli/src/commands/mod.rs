//! CLI commands

pub mod import;
pub mod plan;
pub mod publish;
