// Library root for the RAI command-line pipeline: tracking CSV loading,
// batch scoring and report export. Exposed so integration tests can drive
// each stage directly.

pub mod batch;
pub mod loader;
pub mod report;
