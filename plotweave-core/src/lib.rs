//! Story graph traversal and recovery engine for AI-generated visual novels.
//!
//! This crate provides:
//! - [`StoryEngine`]: walks a directed graph of narrative scenes, advances
//!   on user input, and recovers from missing or inconsistent graph edges
//!   without ever dead-ending the user
//! - [`StorySession`]: bookshelf, upload, and processing orchestration
//!   around an injected [`ScriptGateway`]
//! - [`testing`]: a mock gateway and fixtures for deterministic tests
//!
//! # Quick Start
//!
//! ```ignore
//! use plotweave_api::ApiClient;
//! use plotweave_core::{EngineEvent, StorySession};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = StorySession::new(ApiClient::from_env()?);
//!
//!     let books = session.load_bookshelf().await;
//!     let mut engine = session
//!         .open_book(&books[0], &mut |status, progress| {
//!             println!("{status}... {progress}%");
//!         })
//!         .await?;
//!
//!     engine.advance();
//!     for event in engine.take_events() {
//!         if let EngineEvent::DialogueChanged(line) = event {
//!             println!("{}: {}", line.speaker, line.text);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod events;
pub mod gateway;
pub mod resolver;
pub mod sample;
pub mod session;
pub mod testing;

// Re-export the wire data model for convenience.
pub use plotweave_api as api;
pub use plotweave_api::{
    ApiClient, Book, BookStatus, Character, Choice, DialogueLine, Scene, Script, EXIT_SCENE,
};

// Primary public API
pub use engine::{EngineError, StoryEngine, HISTORY_LIMIT};
pub use events::EngineEvent;
pub use gateway::{PollConfig, PollControl, PollError, ScriptGateway};
pub use session::{Generation, SessionError, StorySession};
pub use testing::MockGateway;
