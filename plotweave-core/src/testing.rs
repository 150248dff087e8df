//! Testing utilities for the story engine.
//!
//! This module provides tools for integration testing:
//! - `MockGateway` for deterministic tests without a backend
//! - fixture builders for scripts, scenes, and choices
//! - assertion helpers for engine state and event streams

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use plotweave_api::{
    Book, BookStatus, Character, Choice, DialogueLine, Error as ApiError, Scene, Script,
};

use crate::engine::StoryEngine;
use crate::events::EngineEvent;
use crate::gateway::ScriptGateway;

#[derive(Default)]
struct MockState {
    books: Vec<Book>,
    fail_books: bool,
    /// Scripted `get_book` responses. The last entry is sticky: once the
    /// queue is down to one status, every further call returns it.
    statuses: VecDeque<Book>,
    scripts: HashMap<String, Script>,
    scenes: HashMap<String, Scene>,
    fail_scenes: bool,
    upload_result: Option<Book>,
    offline: bool,
    get_book_calls: usize,
    get_scene_calls: usize,
}

/// A scripted gateway for deterministic tests.
///
/// Clones share state, so call counters stay visible after a clone has been
/// handed to an engine or session.
#[derive(Clone, Default)]
pub struct MockGateway {
    state: Arc<Mutex<MockState>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the books returned by `list_books`.
    pub fn with_books(self, books: Vec<Book>) -> Self {
        self.state.lock().unwrap().books = books;
        self
    }

    /// Make `list_books` fail with a network error.
    pub fn failing_books(self) -> Self {
        self.state.lock().unwrap().fail_books = true;
        self
    }

    /// Append a status to the scripted `get_book` sequence.
    pub fn queue_status(self, book: Book) -> Self {
        self.state.lock().unwrap().statuses.push_back(book);
        self
    }

    /// Register the script returned by `get_script` for a book id.
    pub fn with_script(self, book_id: impl Into<String>, script: Script) -> Self {
        self.state.lock().unwrap().scripts.insert(book_id.into(), script);
        self
    }

    /// Register a scene that `get_scene` can serve.
    pub fn with_scene(self, scene: Scene) -> Self {
        self.state.lock().unwrap().scenes.insert(scene.id.clone(), scene);
        self
    }

    /// Make every `get_scene` call fail.
    pub fn failing_scenes(self) -> Self {
        self.state.lock().unwrap().fail_scenes = true;
        self
    }

    /// Set the book returned by `upload_book`. Without one, uploads fail.
    pub fn with_upload(self, book: Book) -> Self {
        self.state.lock().unwrap().upload_result = Some(book);
        self
    }

    /// Make the connectivity probe report the backend as unreachable.
    pub fn offline(self) -> Self {
        self.state.lock().unwrap().offline = true;
        self
    }

    /// How many times `get_book` was called.
    pub fn get_book_calls(&self) -> usize {
        self.state.lock().unwrap().get_book_calls
    }

    /// How many times `get_scene` was called.
    pub fn get_scene_calls(&self) -> usize {
        self.state.lock().unwrap().get_scene_calls
    }
}

#[async_trait]
impl ScriptGateway for MockGateway {
    async fn upload_book(
        &self,
        _title: &str,
        _author: &str,
        _file_name: &str,
        _file_bytes: Vec<u8>,
    ) -> Result<Book, ApiError> {
        self.state
            .lock()
            .unwrap()
            .upload_result
            .clone()
            .ok_or_else(|| ApiError::Upload {
                status: 500,
                message: "no scripted upload result".to_string(),
            })
    }

    async fn list_books(&self) -> Result<Vec<Book>, ApiError> {
        let state = self.state.lock().unwrap();
        if state.fail_books {
            return Err(ApiError::Network("scripted network failure".to_string()));
        }
        Ok(state.books.clone())
    }

    async fn get_book(&self, book_id: &str) -> Result<Book, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.get_book_calls += 1;
        match state.statuses.len() {
            0 => Err(ApiError::Api {
                status: 404,
                message: format!("no scripted status for book {book_id}"),
            }),
            1 => Ok(state.statuses.front().unwrap().clone()),
            _ => Ok(state.statuses.pop_front().unwrap()),
        }
    }

    async fn get_script(&self, book_id: &str) -> Result<Script, ApiError> {
        self.state
            .lock()
            .unwrap()
            .scripts
            .get(book_id)
            .cloned()
            .ok_or_else(|| ApiError::Api {
                status: 404,
                message: format!("no scripted script for book {book_id}"),
            })
    }

    async fn get_scene(&self, scene_id: &str, book_id: &str) -> Result<Scene, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.get_scene_calls += 1;
        if state.fail_scenes {
            return Err(ApiError::Api {
                status: 500,
                message: "scripted scene failure".to_string(),
            });
        }
        state.scenes.get(scene_id).cloned().ok_or_else(|| ApiError::Api {
            status: 404,
            message: format!("scene {scene_id} not found for book {book_id}"),
        })
    }

    async fn check_connectivity(&self) -> bool {
        !self.state.lock().unwrap().offline
    }
}

// ============================================================================
// Fixture builders
// ============================================================================

pub fn script(title: &str, scenes: Vec<Scene>) -> Script {
    Script {
        title: title.to_string(),
        scenes,
    }
}

pub fn scene(id: &str, dialogue: Vec<DialogueLine>) -> Scene {
    Scene {
        id: id.to_string(),
        background: "bg.png".to_string(),
        characters: Vec::new(),
        dialogue,
    }
}

pub fn scene_with_characters(id: &str, characters: Vec<Character>, dialogue: Vec<DialogueLine>) -> Scene {
    Scene {
        id: id.to_string(),
        background: "bg.png".to_string(),
        characters,
        dialogue,
    }
}

pub fn line(speaker: &str, text: &str) -> DialogueLine {
    DialogueLine {
        speaker: speaker.to_string(),
        text: text.to_string(),
        character: None,
        choices: Vec::new(),
    }
}

pub fn line_with_choices(speaker: &str, text: &str, choices: Vec<Choice>) -> DialogueLine {
    DialogueLine {
        speaker: speaker.to_string(),
        text: text.to_string(),
        character: None,
        choices,
    }
}

pub fn choice(text: &str, next_scene: &str) -> Choice {
    Choice {
        text: text.to_string(),
        next_scene: next_scene.to_string(),
    }
}

pub fn book_at(id: &str, status: BookStatus, progress: u8) -> Book {
    Book {
        id: id.to_string(),
        title: "Test Book".to_string(),
        author: "Test Author".to_string(),
        status,
        progress,
        error: None,
    }
}

pub fn ready_book(id: &str) -> Book {
    book_at(id, BookStatus::Ready, 100)
}

// ============================================================================
// Assertion helpers
// ============================================================================

/// Assert the engine is positioned at the start of the given scene.
#[track_caller]
pub fn assert_at_scene<G: ScriptGateway>(engine: &StoryEngine<G>, id: &str) {
    assert_eq!(
        engine.current_scene().id,
        id,
        "expected to be in scene {id}, was in {}",
        engine.current_scene().id
    );
}

/// Ids carried by the `SceneChanged` events in a drained batch, in order.
pub fn scene_changes(events: &[EngineEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            EngineEvent::SceneChanged(scene) => Some(scene.id.clone()),
            _ => None,
        })
        .collect()
}

/// The `LoadingChanged` flags in a drained batch, in order.
pub fn loading_flags(events: &[EngineEvent]) -> Vec<bool> {
    events
        .iter()
        .filter_map(|e| match e {
            EngineEvent::LoadingChanged(flag) => Some(*flag),
            _ => None,
        })
        .collect()
}

/// Number of `UserWarning` events in a drained batch.
pub fn warning_count(events: &[EngineEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, EngineEvent::UserWarning(_)))
        .count()
}

/// Whether a drained batch contains an `ExitRequested` event.
pub fn has_exit_request(events: &[EngineEvent]) -> bool {
    events.iter().any(|e| matches!(e, EngineEvent::ExitRequested))
}
