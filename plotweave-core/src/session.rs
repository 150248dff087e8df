//! Session orchestration: bookshelf, upload, processing, story startup.
//!
//! [`StorySession`] is the explicit owner of one user-facing session. The
//! gateway is injected at construction (there is no global client) and
//! every long-running operation is guarded by a [`Generation`] token so a
//! poll left over from an abandoned screen can never mutate state the user
//! has already navigated away from.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use plotweave_api::{Book, BookStatus, Error as ApiError};
use thiserror::Error;

use crate::engine::{EngineError, StoryEngine};
use crate::events::EngineEvent;
use crate::gateway::{PollConfig, PollControl, PollError, ScriptGateway};
use crate::sample;

/// Errors from session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("gateway error: {0}")]
    Gateway(#[from] ApiError),

    #[error("processing error: {0}")]
    Poll(#[from] PollError),

    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Generation token guarding asynchronous completions.
///
/// Operations snapshot the generation when they start; [`invalidate`]
/// (called when the user leaves the session) makes any in-flight poll
/// cancel before its next state mutation. Handles are cheap clones sharing
/// one counter.
///
/// [`invalidate`]: Generation::invalidate
#[derive(Debug, Clone, Default)]
pub struct Generation(Arc<AtomicU64>);

impl Generation {
    /// The current generation value.
    pub fn snapshot(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    /// Invalidate every snapshot taken so far.
    pub fn invalidate(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    /// Whether a snapshot is still the current generation.
    pub fn is_current(&self, snapshot: u64) -> bool {
        self.snapshot() == snapshot
    }
}

/// One user-facing story session, from bookshelf to playback.
pub struct StorySession<G> {
    gateway: G,
    poll_config: PollConfig,
    generation: Generation,
    events: Vec<EngineEvent>,
}

impl<G: ScriptGateway + Clone> StorySession<G> {
    /// Create a session around an injected gateway.
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            poll_config: PollConfig::default(),
            generation: Generation::default(),
            events: Vec::new(),
        }
    }

    /// Override the polling cadence and retry ceiling.
    pub fn with_poll_config(mut self, poll_config: PollConfig) -> Self {
        self.poll_config = poll_config;
        self
    }

    /// A handle to this session's generation token. Invalidating it cancels
    /// in-flight polls (the "user returned to the bookshelf" path).
    pub fn generation(&self) -> Generation {
        self.generation.clone()
    }

    /// The injected gateway.
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Drain queued presentation events.
    pub fn take_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    /// Best-effort backend reachability probe for the presentation layer's
    /// connection banner.
    pub async fn check_connectivity(&self) -> bool {
        self.gateway.check_connectivity().await
    }

    /// Books to show on the shelf.
    ///
    /// Falls back to the built-in samples when the backend is unreachable
    /// or has no books; the shelf is never blank.
    pub async fn load_bookshelf(&mut self) -> Vec<Book> {
        match self.gateway.list_books().await {
            Ok(books) if !books.is_empty() => books,
            Ok(_) => sample::sample_books(),
            Err(e) => {
                log::error!("failed to load books: {e}");
                self.events.push(EngineEvent::UserWarning(
                    "Couldn't reach the library. Showing sample books.".to_string(),
                ));
                sample::sample_books()
            }
        }
    }

    /// Upload a book and wait for the processing pipeline to finish.
    ///
    /// `on_progress` receives every status tick. On failure the session
    /// state is unchanged; the caller decides how to surface the error.
    pub async fn upload_and_process(
        &mut self,
        title: &str,
        author: &str,
        file_name: &str,
        file_bytes: Vec<u8>,
        on_progress: &mut (dyn FnMut(BookStatus, u8) + Send),
    ) -> Result<Book, SessionError> {
        let book = self
            .gateway
            .upload_book(title, author, file_name, file_bytes)
            .await?;
        log::info!("uploaded book {} ({title})", book.id);

        self.poll(&book.id, on_progress).await
    }

    /// Open a book for playback: wait for readiness when needed, fetch its
    /// script, and return an engine positioned at the entry scene.
    ///
    /// Sample books skip the backend entirely. A missing or empty script is
    /// fatal for this book: the error is returned and mirrored as an
    /// [`EngineEvent::FatalError`] for hosts rendering from the event
    /// stream.
    pub async fn open_book(
        &mut self,
        book: &Book,
        on_progress: &mut (dyn FnMut(BookStatus, u8) + Send),
    ) -> Result<StoryEngine<G>, SessionError> {
        if book.id.starts_with(sample::SAMPLE_ID_PREFIX) {
            let script = sample::sample_script(&book.title);
            return Ok(StoryEngine::new(self.gateway.clone(), &book.id, script)?);
        }

        if !book.is_ready() {
            self.poll(&book.id, on_progress).await?;
        }

        let script = match self.gateway.get_script(&book.id).await {
            Ok(script) => script,
            Err(e) => {
                log::error!("failed to load script for book {}: {e}", book.id);
                self.events.push(EngineEvent::FatalError(
                    "Couldn't load the story script. Please try again later.".to_string(),
                ));
                return Err(e.into());
            }
        };

        if log::log_enabled!(log::Level::Debug) {
            for links in script.graph_summary() {
                log::debug!(
                    "scene {}: in={:?} out={:?}",
                    links.id,
                    links.incoming,
                    links.outgoing
                );
            }
        }

        match StoryEngine::new(self.gateway.clone(), &book.id, script) {
            Ok(engine) => Ok(engine),
            Err(e) => {
                self.events.push(EngineEvent::FatalError(
                    "The generated story contains no scenes.".to_string(),
                ));
                Err(e.into())
            }
        }
    }

    /// Poll with this session's config, wrapped in the generation guard.
    async fn poll(
        &mut self,
        book_id: &str,
        on_progress: &mut (dyn FnMut(BookStatus, u8) + Send),
    ) -> Result<Book, SessionError> {
        let snapshot = self.generation.snapshot();
        let generation = self.generation.clone();

        let mut tick = |status: BookStatus, progress: u8| {
            if !generation.is_current(snapshot) {
                return PollControl::Cancel;
            }
            on_progress(status, progress);
            PollControl::Continue
        };

        let book = self
            .gateway
            .poll_until_ready(book_id, &self.poll_config, &mut tick)
            .await?;

        // A cancellation can land between the last tick and the response.
        if !self.generation.is_current(snapshot) {
            return Err(PollError::Cancelled.into());
        }
        Ok(book)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_token() {
        let generation = Generation::default();
        let snapshot = generation.snapshot();
        assert!(generation.is_current(snapshot));

        let handle = generation.clone();
        handle.invalidate();
        assert!(!generation.is_current(snapshot));
        assert!(generation.is_current(generation.snapshot()));
    }
}
