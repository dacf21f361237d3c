//! Request counter shared through the application state

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

/// Thread-safe count of API requests served since start or the last reset
#[derive(Debug, Default)]
pub struct RequestCounter {
    hits: AtomicU64,
}

impl RequestCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) -> u64 {
        self.hits.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn get(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
    }
}

/// Middleware counting every request that passes through it
pub async fn count_requests(
    State(counter): State<Arc<RequestCounter>>,
    request: Request,
    next: Next,
) -> Response {
    counter.increment();
    next.run(request).await
}
