//! Exit code constants for the joblock CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, bad config, uninitialized root)
//! - 2: Store failure (query/update/index/timeout)
//! - 3: Store connection lost for good (restart required)
//! - 4: Table lock acquisition failure

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, invalid configuration, or missing layout.
pub const USER_ERROR: i32 = 1;

/// Store failure: a claim, read-back, index, or persistence step failed.
pub const STORE_FAILURE: i32 = 2;

/// The store connection is unrecoverable; a supervisor should restart the worker.
pub const CONNECTION_LOST: i32 = 3;

/// The store's table lock could not be acquired in time.
pub const LOCK_FAILURE: i32 = 4;
