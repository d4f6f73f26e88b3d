pub mod annotations;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod diff;
pub mod error;
pub mod github;
pub mod linter;
pub mod process;
pub mod reconcile;
pub mod review;
