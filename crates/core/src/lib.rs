//! Domain types shared by the textq API server and worker.
//!
//! - [`operation`] -- the closed set of text transforms a worker may run.
//! - [`task`] -- the task descriptor carried on the queue and the
//!   submission input.
//! - [`status`] -- the per-task status record kept in the status store.

pub mod error;
pub mod operation;
pub mod status;
pub mod task;
pub mod types;
