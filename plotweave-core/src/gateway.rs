//! The gateway seam between the engine and the PlotWeave backend.
//!
//! [`ScriptGateway`] abstracts the remote contract so the engine and the
//! session are generic over the transport: [`plotweave_api::ApiClient`]
//! implements it against the real backend, [`crate::testing::MockGateway`]
//! implements it for deterministic tests. The polling loop is a provided
//! method so every implementation shares the same semantics.

use std::time::Duration;

use async_trait::async_trait;
use plotweave_api::{ApiClient, Book, BookStatus, Error as ApiError, Scene, Script};
use thiserror::Error;

/// Errors from the processing-status poll loop.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("gateway error: {0}")]
    Gateway(#[from] ApiError),

    #[error("book processing failed: {0}")]
    Failed(String),

    #[error("book was not ready after {attempts} status checks")]
    TimedOut { attempts: usize },

    #[error("polling was cancelled")]
    Cancelled,
}

/// Whether a poll loop keeps going after a progress tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollControl {
    Continue,
    Cancel,
}

/// Cadence and retry ceiling for [`ScriptGateway::poll_until_ready`].
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Delay between status checks.
    pub interval: Duration,

    /// Maximum number of status checks before giving up with
    /// [`PollError::TimedOut`]. `None` polls until the backend reaches a
    /// terminal status, however long that takes.
    pub max_attempts: Option<usize>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(2000),
            max_attempts: Some(150),
        }
    }
}

impl PollConfig {
    /// Set the delay between status checks.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the retry ceiling; `None` removes it.
    pub fn with_max_attempts(mut self, max_attempts: Option<usize>) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

/// Remote script gateway contract.
///
/// The fallible methods return [`plotweave_api::Error`]; network and
/// storage failures are surfaced to the caller, never swallowed.
#[async_trait]
pub trait ScriptGateway: Send + Sync {
    /// Upload a book for processing.
    async fn upload_book(
        &self,
        title: &str,
        author: &str,
        file_name: &str,
        file_bytes: Vec<u8>,
    ) -> Result<Book, ApiError>;

    /// List all books known to the backend.
    async fn list_books(&self) -> Result<Vec<Book>, ApiError>;

    /// Get a single book with its current processing status.
    async fn get_book(&self, book_id: &str) -> Result<Book, ApiError>;

    /// Get the generated script for a processed book.
    async fn get_script(&self, book_id: &str) -> Result<Script, ApiError>;

    /// Fetch a single scene absent from the loaded script.
    async fn get_scene(&self, scene_id: &str, book_id: &str) -> Result<Scene, ApiError>;

    /// Best-effort reachability probe. Never errors.
    async fn check_connectivity(&self) -> bool;

    /// Poll [`get_book`](Self::get_book) until the book reaches a terminal
    /// status.
    ///
    /// `on_progress` is invoked on every status check, including the first;
    /// returning [`PollControl::Cancel`] aborts the loop with
    /// [`PollError::Cancelled`] before any further request. A server-side
    /// `error` status fails with the server's message, or a generic one
    /// when the server gave none.
    async fn poll_until_ready(
        &self,
        book_id: &str,
        config: &PollConfig,
        on_progress: &mut (dyn FnMut(BookStatus, u8) -> PollControl + Send),
    ) -> Result<Book, PollError> {
        let mut attempts = 0usize;
        loop {
            let book = self.get_book(book_id).await?;
            attempts += 1;

            if on_progress(book.status, book.progress) == PollControl::Cancel {
                log::debug!("poll for book {book_id} cancelled after {attempts} checks");
                return Err(PollError::Cancelled);
            }

            match book.status {
                BookStatus::Ready => return Ok(book),
                BookStatus::Error => {
                    let message = book
                        .error
                        .unwrap_or_else(|| "An error occurred during processing".to_string());
                    return Err(PollError::Failed(message));
                }
                _ => {}
            }

            if let Some(max) = config.max_attempts {
                if attempts >= max {
                    log::warn!(
                        "book {book_id} still {} after {attempts} status checks",
                        book.status
                    );
                    return Err(PollError::TimedOut { attempts });
                }
            }

            tokio::time::sleep(config.interval).await;
        }
    }
}

#[async_trait]
impl ScriptGateway for ApiClient {
    async fn upload_book(
        &self,
        title: &str,
        author: &str,
        file_name: &str,
        file_bytes: Vec<u8>,
    ) -> Result<Book, ApiError> {
        ApiClient::upload_book(self, title, author, file_name, file_bytes).await
    }

    async fn list_books(&self) -> Result<Vec<Book>, ApiError> {
        ApiClient::list_books(self).await
    }

    async fn get_book(&self, book_id: &str) -> Result<Book, ApiError> {
        ApiClient::get_book(self, book_id).await
    }

    async fn get_script(&self, book_id: &str) -> Result<Script, ApiError> {
        ApiClient::get_script(self, book_id).await
    }

    async fn get_scene(&self, scene_id: &str, book_id: &str) -> Result<Scene, ApiError> {
        ApiClient::get_scene(self, scene_id, book_id).await
    }

    async fn check_connectivity(&self) -> bool {
        ApiClient::check_connectivity(self).await
    }
}
