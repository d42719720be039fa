// Library interface for tshelf modules
// This allows tests and the smoke-test binaries to import modules

pub mod classifier;
pub mod curriculum;
pub mod extraction;
pub mod ingestion;
pub mod llm;
pub mod pipeline;
