//! Per-entity sync components. Each one mirrors a remote collection in a
//! local cache and owns that cache exclusively; the hosted service stays the
//! source of truth and every mutation is followed by a read back.

pub mod attendance;
pub mod notify;
pub mod profile;
pub mod tasks;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::error::AppError;

/// Loading flag of one component. Fetches stack; mutations are exclusive
/// among themselves, so a second submit while one is in flight is refused.
/// A running fetch never blocks a mutation.
#[derive(Default)]
pub struct Loading {
    fetches: AtomicUsize,
    mutating: AtomicBool,
}

impl Loading {
    pub fn is_loading(&self) -> bool {
        self.fetches.load(Ordering::SeqCst) > 0 || self.mutating.load(Ordering::SeqCst)
    }

    pub fn begin(&self) -> LoadingGuard<'_> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        LoadingGuard::Fetch(&self.fetches)
    }

    pub fn begin_exclusive(&self, what: &'static str) -> Result<LoadingGuard<'_>, AppError> {
        self.mutating
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| LoadingGuard::Mutation(&self.mutating))
            .map_err(|_| AppError::Busy(what))
    }
}

pub enum LoadingGuard<'a> {
    Fetch(&'a AtomicUsize),
    Mutation(&'a AtomicBool),
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        match self {
            LoadingGuard::Fetch(count) => {
                count.fetch_sub(1, Ordering::SeqCst);
            }
            LoadingGuard::Mutation(flag) => flag.store(false, Ordering::SeqCst),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclusive_begin_refuses_while_in_flight() {
        let loading = Loading::default();
        let guard = loading.begin_exclusive("Check-in").unwrap();
        assert!(loading.is_loading());
        assert!(matches!(loading.begin_exclusive("Check-in"), Err(AppError::Busy(_))));

        drop(guard);
        assert!(!loading.is_loading());
        assert!(loading.begin_exclusive("Check-in").is_ok());
    }

    #[test]
    fn fetch_in_flight_does_not_block_a_mutation() {
        let loading = Loading::default();
        let fetch = loading.begin();
        let mutation = loading.begin_exclusive("Task update").unwrap();
        drop(fetch);
        assert!(loading.is_loading());
        drop(mutation);
        assert!(!loading.is_loading());
    }

    #[test]
    fn fetches_stack() {
        let loading = Loading::default();
        let a = loading.begin();
        let b = loading.begin();
        drop(a);
        assert!(loading.is_loading());
        drop(b);
        assert!(!loading.is_loading());
    }
}
