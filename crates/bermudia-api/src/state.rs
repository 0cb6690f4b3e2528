//! Shared application state for the player API.
//!
//! [`AppState`] holds the [`GameService`] every handler calls into and the
//! optional grader token. The service already shares its store, catalog
//! and hub behind [`Arc`](std::sync::Arc)s, so the state is cheap to clone.

use bermudia_core::GameService;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`](std::sync::Arc) and injected via Axum's `State`
/// extractor.
#[derive(Debug)]
pub struct AppState<S> {
    /// The game service.
    pub service: GameService<S>,
    /// Token grader routes require in `x-grader-token`. Grader routes are
    /// open when `None`.
    pub grader_token: Option<String>,
}

impl<S> AppState<S> {
    /// Create state around `service` with grader routes left open.
    pub const fn new(service: GameService<S>) -> Self {
        Self {
            service,
            grader_token: None,
        }
    }

    /// Require `token` on grader routes.
    #[must_use]
    pub fn with_grader_token(mut self, token: Option<String>) -> Self {
        self.grader_token = token;
        self
    }
}
