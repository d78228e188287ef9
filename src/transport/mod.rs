//! Socket transport.
//!
//! - [`endpoint`]: deterministic socket paths under one base directory
//! - [`adhoc`]: primary channel plus on-demand auxiliary channels

pub mod adhoc;
pub mod endpoint;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use adhoc::AdHocChannel;
pub use endpoint::Endpoints;

/// Lock a mutex, carrying on with the data if a previous holder panicked.
/// Every mutex in the bridge guards plain maps or streams that stay
/// consistent across a panic.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
