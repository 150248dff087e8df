//! Events emitted by the engine for the presentation layer.
//!
//! The engine never touches a rendering surface. Hosts drain the event
//! queue after each engine or session operation and render accordingly;
//! this keeps the core host-independent and unit-testable.

use plotweave_api::{DialogueLine, Scene};

/// A presentation-facing event.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// The current scene changed; the host should rebuild the background
    /// and character set and show the first dialogue line.
    SceneChanged(Scene),

    /// The current dialogue line changed within the same scene.
    DialogueChanged(DialogueLine),

    /// A dynamic scene fetch started (`true`) or finished (`false`).
    /// Hosts should suppress choice input while loading is active.
    LoadingChanged(bool),

    /// The story asked to end the session (the `exit` sentinel).
    ExitRequested,

    /// A recoverable problem the user should see, e.g. a scene could not
    /// be loaded and the story restarted from the beginning.
    UserWarning(String),

    /// An unrecoverable session failure; the host should return to the
    /// bookshelf.
    FatalError(String),
}
