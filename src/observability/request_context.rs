//! Request context propagated through every deduplicator and repository call.

use crate::{Error, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Per-request context with correlation ID, cancellation and deadline.
///
/// Clones share the cancellation flag, so cancelling any clone cancels the
/// whole call sequence.
#[derive(Clone, Debug)]
pub struct RequestContext {
    request_id: String,
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// Creates a new request context with a generated ID.
    #[must_use]
    pub fn new() -> Self {
        Self::from_id(Uuid::new_v4().to_string())
    }

    /// Creates a new request context with an existing request ID.
    #[must_use]
    pub fn from_id(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: None,
        }
    }

    /// Returns a context that expires after `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    /// Returns a context that expires at `deadline`.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Returns the request ID.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Returns the deadline, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancels this context and every clone of it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns true once the context is cancelled or past its deadline.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.check().is_err()
    }

    /// Fails if the context is cancelled or past its deadline.
    pub fn check(&self) -> Result<()> {
        if self.cancelled.load(Ordering::SeqCst) {
            return Err(Error::ContextCancelled {
                request_id: self.request_id.clone(),
            });
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(Error::ContextDeadlineExceeded {
                request_id: self.request_id.clone(),
            });
        }
        Ok(())
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
