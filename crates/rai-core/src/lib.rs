// Library root: the RAI scoring core. Re-exports all modules so the CLI and
// integration tests can reach the public API.

pub mod config;
pub mod features;
pub mod scoring;
pub mod tracking;
