// Cache-aware fetch coordination
mod coordinator;
mod query;
mod state;

pub use {
    coordinator::{CacheCoordinator, LoadOutcome, LoadSource},
    query::{DatasetQuery, PendingLoad},
    state::{LoadState, LoadStatus, RequestPhase},
};
