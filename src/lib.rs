//! joblock: the job-locking core of a store-backed job scheduler.
//!
//! Many worker processes share one collection of job records. Each worker
//! periodically claims the jobs that are due, or whose previous claim has gone
//! stale, through a single atomic conditional update, so no job is ever held
//! by two workers at once.
//!
//! The library is organised around [`locker::JobLocker`], which drives a
//! [`store::JobStore`] backend ([`store::MemoryStore`] or [`store::FileStore`])
//! and reports through an [`events::EventBus`].

pub mod cli;
pub mod clock;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod exit_codes;
pub mod fs;
pub mod job;
pub mod locker;
pub mod locks;
pub mod store;

#[cfg(test)]
mod test_support;
