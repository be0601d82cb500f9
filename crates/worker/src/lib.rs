//! textq task worker.
//!
//! Consumes task descriptors from the durable work queue, runs the named
//! text operation and records progress in the status store.

pub mod config;
pub mod consumer;
pub mod processor;
