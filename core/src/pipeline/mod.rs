// flowbot/src/pipeline/mod.rs

//! Defines the `Pipeline` step graph, its construction, the per-step
//! supervisor and the routing execution loop.

pub mod definition;
mod dispatch;
pub mod execution;
pub mod supervisor;

pub use definition::{Pipeline, Route};
pub use execution::RunReport;
pub use supervisor::StepSupervisor;
