//! Staged task scheduling.
//!
//! A run is a [`Task`] tree: leaves do the work, groups fan work out across
//! the [`Executor`]'s worker pool and wait for all of it, and sequences chain
//! stages so each one sees the previous stage's output.

mod executor;
mod task;

pub use executor::{AdmissionGate, Executor, Permit, TaskFailure, default_limit};
pub use task::Task;
