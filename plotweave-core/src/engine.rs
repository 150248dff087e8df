//! The story graph traversal and recovery engine.
//!
//! [`StoryEngine`] owns the current position in a narrative graph: the
//! script, the active scene, the dialogue cursor within it, and a bounded
//! history of visited scenes. User input arrives as [`advance`] ("continue"
//! on a plain line) or [`choose`] (an explicit choice click); the engine
//! mutates its state and queues [`EngineEvent`]s for the host to render.
//!
//! The backing script is AI-generated and may be incomplete: a referenced
//! scene can be missing, numbering can be inconsistent. The engine never
//! dead-ends the user: every transition converges on *some* valid scene,
//! through dynamic fetch and the heuristics in [`crate::resolver`], trading
//! narrative correctness for availability.
//!
//! [`advance`]: StoryEngine::advance
//! [`choose`]: StoryEngine::choose

use std::collections::VecDeque;

use plotweave_api::{Choice, DialogueLine, Scene, Script, EXIT_SCENE};
use thiserror::Error;

use crate::events::EngineEvent;
use crate::gateway::ScriptGateway;
use crate::resolver;

/// Maximum number of scene ids retained in the visited history.
pub const HISTORY_LIMIT: usize = 10;

/// Errors from story engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("script contains no scenes")]
    EmptyScript,

    #[error("dialogue index {index} out of range for scene {scene_id} ({len} lines)")]
    DialogueOutOfRange {
        scene_id: String,
        index: usize,
        len: usize,
    },
}

/// Re-entrancy gate. While a dynamic scene fetch is in flight the engine is
/// `Resolving` and further traversal input is dropped; the UI disabling its
/// buttons is not relied upon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Resolving,
}

/// Holds the gate at `Resolving` for the duration of a fetch and releases
/// it on drop, so a `choose` future abandoned mid-await cannot wedge the
/// engine in the busy state.
struct ResolvingGuard<'a>(&'a mut Phase);

impl<'a> ResolvingGuard<'a> {
    fn arm(phase: &'a mut Phase) -> Self {
        *phase = Phase::Resolving;
        Self(phase)
    }
}

impl Drop for ResolvingGuard<'_> {
    fn drop(&mut self) {
        *self.0 = Phase::Idle;
    }
}

/// Story graph engine for one playback session.
///
/// The gateway is injected at construction; with a mock gateway the engine
/// runs entirely offline (see [`crate::testing`]).
pub struct StoryEngine<G> {
    gateway: G,
    book_id: String,
    script: Script,
    /// Index of the current scene in `script.scenes`. Indices stay valid
    /// because the scene list only grows (dynamic loads append).
    current: usize,
    dialogue_index: usize,
    visited: VecDeque<String>,
    phase: Phase,
    events: Vec<EngineEvent>,
}

impl<G: ScriptGateway> StoryEngine<G> {
    /// Create an engine positioned at the script's entry scene.
    ///
    /// Fails with [`EngineError::EmptyScript`] when the script has no
    /// scenes.
    pub fn new(gateway: G, book_id: impl Into<String>, script: Script) -> Result<Self, EngineError> {
        let mut engine = Self {
            gateway,
            book_id: book_id.into(),
            script: Script {
                title: String::new(),
                scenes: Vec::new(),
            },
            current: 0,
            dialogue_index: 0,
            visited: VecDeque::new(),
            phase: Phase::Idle,
            events: Vec::new(),
        };
        engine.initialize(script, None)?;
        Ok(engine)
    }

    /// Replace the script wholesale and reposition at the entry scene (or
    /// `entry_override` when given and present). Clears the visited
    /// history. This is the "start new book" path.
    pub fn initialize(
        &mut self,
        script: Script,
        entry_override: Option<&str>,
    ) -> Result<(), EngineError> {
        if script.scenes.is_empty() {
            return Err(EngineError::EmptyScript);
        }

        let entry = match entry_override {
            Some(id) => match script.scenes.iter().position(|s| s.id == id) {
                Some(idx) => idx,
                None => {
                    log::warn!("entry override {id} not in script, using the entry scene");
                    0
                }
            },
            None => 0,
        };

        self.script = script;
        self.current = entry;
        self.dialogue_index = 0;
        self.visited.clear();
        self.phase = Phase::Idle;
        self.events
            .push(EngineEvent::SceneChanged(self.script.scenes[entry].clone()));
        Ok(())
    }

    /// Advance past a non-choice line.
    ///
    /// Within a scene this moves the dialogue cursor. At the end of a scene
    /// the continuation pipeline picks the next scene: the first choice of
    /// the last line when present, then numeric-suffix inference, then the
    /// entry scene as a defensive last resort. An `exit` continuation emits
    /// [`EngineEvent::ExitRequested`] and leaves all state untouched.
    pub fn advance(&mut self) {
        if self.phase == Phase::Resolving {
            log::debug!("ignoring advance while a scene fetch is in flight");
            return;
        }

        if self.dialogue_index + 1 < self.current_scene().dialogue.len() {
            self.dialogue_index += 1;
            let line = self.current_scene().dialogue[self.dialogue_index].clone();
            self.events.push(EngineEvent::DialogueChanged(line));
            return;
        }

        // End of scene without an explicit choice click.
        let current_id = self.current_scene().id.clone();
        let Some(target) = resolver::resolve_continuation(&self.script, self.current_scene())
        else {
            log::warn!("no continuation found after {current_id}, looping to the entry scene");
            self.transition_to(0);
            return;
        };

        if target == EXIT_SCENE {
            self.events.push(EngineEvent::ExitRequested);
            return;
        }

        match self.scene_index(&target) {
            Some(idx) => self.transition_to(idx),
            None => {
                log::warn!(
                    "continuation {target} after {current_id} is not in the script, \
                     looping to the entry scene"
                );
                self.transition_to(0);
            }
        }
    }

    /// Follow an explicit choice.
    ///
    /// A choice with no target is logged and ignored. The `exit` sentinel
    /// emits [`EngineEvent::ExitRequested`] without touching state. A
    /// target missing from the script is fetched from the backend and
    /// appended; when the fetch fails the engine falls back to a fuzzy
    /// substring match and finally to the entry scene with a user-facing
    /// warning.
    pub async fn choose(&mut self, choice: &Choice) {
        if self.phase == Phase::Resolving {
            log::debug!("ignoring choice while a scene fetch is in flight");
            return;
        }

        if choice.next_scene.trim().is_empty() {
            log::warn!("invalid choice {:?}: no target scene", choice.text);
            return;
        }

        if choice.is_exit() {
            self.events.push(EngineEvent::ExitRequested);
            return;
        }

        self.push_history();

        if let Some(idx) = self.scene_index(&choice.next_scene) {
            self.move_to(idx);
            return;
        }

        // The scene is not part of the script yet; try a dynamic load.
        log::debug!("scene {} not in script, fetching", choice.next_scene);
        self.events.push(EngineEvent::LoadingChanged(true));
        let fetched = {
            let _busy = ResolvingGuard::arm(&mut self.phase);
            self.gateway.get_scene(&choice.next_scene, &self.book_id).await
        };
        self.events.push(EngineEvent::LoadingChanged(false));

        match fetched {
            Ok(scene) => {
                log::debug!("dynamically loaded scene {}", scene.id);
                self.script.scenes.push(scene);
                self.move_to(self.script.scenes.len() - 1);
            }
            Err(e) => {
                log::warn!("failed to load scene {}: {e}", choice.next_scene);
                match resolver::substring_match(&self.script, &choice.next_scene) {
                    Some(idx) => {
                        log::debug!(
                            "using similar scene {} instead of {}",
                            self.script.scenes[idx].id,
                            choice.next_scene
                        );
                        self.move_to(idx);
                    }
                    None => {
                        self.move_to(0);
                        self.events.push(EngineEvent::UserWarning(
                            "Couldn't load the next part of the story. \
                             Returning to the beginning."
                                .to_string(),
                        ));
                    }
                }
            }
        }
    }

    /// The dialogue line the cursor is on.
    pub fn current_line(&self) -> Result<&DialogueLine, EngineError> {
        let scene = self.current_scene();
        scene
            .dialogue
            .get(self.dialogue_index)
            .ok_or_else(|| EngineError::DialogueOutOfRange {
                scene_id: scene.id.clone(),
                index: self.dialogue_index,
                len: scene.dialogue.len(),
            })
    }

    /// Whether the current line presents choices.
    pub fn has_choices(&self) -> bool {
        self.current_line().map(|l| l.has_choices()).unwrap_or(false)
    }

    /// The scene the cursor is in.
    pub fn current_scene(&self) -> &Scene {
        &self.script.scenes[self.current]
    }

    /// Offset of the current line within the scene.
    pub fn dialogue_index(&self) -> usize {
        self.dialogue_index
    }

    /// The whole script, including dynamically loaded scenes.
    pub fn script(&self) -> &Script {
        &self.script
    }

    /// Ids of previously visited scenes, oldest first (at most
    /// [`HISTORY_LIMIT`]).
    pub fn visited(&self) -> Vec<&str> {
        self.visited.iter().map(String::as_str).collect()
    }

    /// Whether a dynamic scene fetch is in flight.
    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Resolving
    }

    /// Drain the queued presentation events.
    pub fn take_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    fn scene_index(&self, id: &str) -> Option<usize> {
        self.script.scenes.iter().position(|s| s.id == id)
    }

    /// History push followed by the move; every real scene transition
    /// records where it came from.
    fn transition_to(&mut self, idx: usize) {
        self.push_history();
        self.move_to(idx);
    }

    fn move_to(&mut self, idx: usize) {
        self.current = idx;
        self.dialogue_index = 0;
        self.events
            .push(EngineEvent::SceneChanged(self.script.scenes[idx].clone()));
    }

    fn push_history(&mut self) {
        let id = self.current_scene().id.clone();
        self.visited.push_back(id);
        while self.visited.len() > HISTORY_LIMIT {
            self.visited.pop_front();
        }
    }

    #[cfg(test)]
    pub(crate) fn force_resolving(&mut self) {
        self.phase = Phase::Resolving;
    }
}
