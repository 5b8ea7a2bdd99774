//! Duration adaptation and end-to-end composition.

pub mod adapt;
pub mod cleanup;
pub mod orchestrator;

pub use adapt::adapt;
pub use cleanup::TransientFiles;
pub use orchestrator::Composer;
