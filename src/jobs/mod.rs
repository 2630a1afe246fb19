//! Background Jobs
//!
//! Independent producers that generate widget updates on fixed intervals.
//!
//! ## Architecture
//!
//! - **Definition**: the `Job` trait and validated `JobDefinition`
//! - **Runner**: one isolated unit task per definition
//! - **Supervisor**: keeps every unit alive, restarting on crash
//! - **Builtin**: the sample jobs and startup discovery
//!
//! A unit talks to the supervisor over a one-way channel carrying three
//! message shapes: a one-time `meta` defaults announcement, `emit` for each
//! produced message, and `run-error` when a single invocation fails. Channel
//! disconnect is the stop signal.

pub mod builtin;
mod definition;
mod runner;
mod supervisor;

pub use builtin::{discover, ClockJob, UptimeJob};
pub use definition::{Emitter, Job, JobContext, JobDefaults, JobDefinition, JobError};
pub use supervisor::{JobSupervisor, SupervisorConfig};
