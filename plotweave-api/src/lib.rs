//! Minimal PlotWeave backend API client.
//!
//! This crate provides a focused client for the PlotWeave book-processing
//! backend with:
//! - Book upload (multipart) and status queries
//! - Script and single-scene retrieval
//! - A best-effort connectivity probe
//!
//! It also defines the wire data model shared with the story engine:
//! [`Script`], [`Scene`], [`DialogueLine`], [`Choice`], [`Book`].

use reqwest::multipart;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

/// Environment variable holding the backend base URL.
pub const BACKEND_URL_ENV: &str = "PLOTWEAVE_BACKEND_URL";

/// Sentinel `next_scene` value meaning "end the session".
pub const EXIT_SCENE: &str = "exit";

const CONNECTIVITY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum Error {
    #[error("backend URL not configured")]
    NoBaseUrl,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Upload failed (status {status}): {message}")]
    Upload { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// PlotWeave backend API client.
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new client for the given backend base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .connect_timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            base_url,
        }
    }

    /// Create a client from the `PLOTWEAVE_BACKEND_URL` environment variable.
    pub fn from_env() -> Result<Self, Error> {
        let base_url = std::env::var(BACKEND_URL_ENV).map_err(|_| Error::NoBaseUrl)?;
        if base_url.trim().is_empty() {
            return Err(Error::NoBaseUrl);
        }
        Ok(Self::new(base_url))
    }

    /// The configured base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Upload a book for processing.
    ///
    /// Returns the freshly created [`Book`], normally still in the
    /// `uploading`/`processing` stages.
    pub async fn upload_book(
        &self,
        title: &str,
        author: &str,
        file_name: &str,
        file_bytes: Vec<u8>,
    ) -> Result<Book, Error> {
        let part = multipart::Part::bytes(file_bytes).file_name(file_name.to_string());
        let form = multipart::Form::new()
            .text("title", title.to_string())
            .text("author", author.to_string())
            .part("file", part);

        let response = self
            .client
            .post(self.url("/api/books/upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Upload { status, message });
        }

        response.json().await.map_err(|e| Error::Parse(e.to_string()))
    }

    /// List all books known to the backend.
    pub async fn list_books(&self) -> Result<Vec<Book>, Error> {
        self.get_json(self.url("/api/books")).await
    }

    /// Get a single book with its current processing status.
    pub async fn get_book(&self, book_id: &str) -> Result<Book, Error> {
        self.get_json(self.url(&format!("/api/books/{book_id}"))).await
    }

    /// Get the generated script for a processed book.
    pub async fn get_script(&self, book_id: &str) -> Result<Script, Error> {
        self.get_json(self.url(&format!("/api/books/{book_id}/script")))
            .await
    }

    /// Fetch a single scene that is not yet part of the loaded script.
    ///
    /// The backend materializes referenced-but-ungenerated scenes on demand.
    pub async fn get_scene(&self, scene_id: &str, book_id: &str) -> Result<Scene, Error> {
        self.get_json(self.url(&format!("/api/scenes/{scene_id}?book_id={book_id}")))
            .await
    }

    /// Best-effort reachability probe against the backend root.
    ///
    /// Uses a short timeout and never returns an error; an unreachable or
    /// unhealthy backend is reported as `false` and logged.
    pub async fn check_connectivity(&self) -> bool {
        let result = self
            .client
            .get(self.url("/"))
            .timeout(CONNECTIVITY_TIMEOUT)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                log::warn!(
                    "backend responded with status {} on connectivity probe",
                    response.status()
                );
                false
            }
            Err(e) => {
                log::error!("failed to reach backend at {}: {e}", self.base_url);
                false
            }
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, Error> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Api { status, message });
        }

        response.json().await.map_err(|e| Error::Parse(e.to_string()))
    }
}

// ============================================================================
// Wire data model
// ============================================================================

/// A complete visual novel script for one book.
///
/// Scene order is irrelevant for lookup, but the first scene is the
/// canonical entry point of the story.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    pub title: String,
    pub scenes: Vec<Scene>,
}

impl Script {
    /// Look up a scene by exact id.
    pub fn scene(&self, id: &str) -> Option<&Scene> {
        self.scenes.iter().find(|s| s.id == id)
    }

    /// The canonical entry scene, if the script is non-empty.
    pub fn entry(&self) -> Option<&Scene> {
        self.scenes.first()
    }

    /// Summarize the scene graph as incoming/outgoing edges per scene.
    ///
    /// Edges pointing at scenes that are not (yet) part of the script are
    /// still listed as outgoing; they are candidates for dynamic loading.
    /// The `exit` sentinel is not an edge.
    pub fn graph_summary(&self) -> Vec<SceneLinks> {
        let mut links: Vec<SceneLinks> = self
            .scenes
            .iter()
            .map(|s| SceneLinks {
                id: s.id.clone(),
                incoming: Vec::new(),
                outgoing: Vec::new(),
            })
            .collect();

        for scene in &self.scenes {
            for line in &scene.dialogue {
                for choice in &line.choices {
                    if choice.is_exit() {
                        continue;
                    }
                    if let Some(entry) = links.iter_mut().find(|l| l.id == scene.id) {
                        if !entry.outgoing.contains(&choice.next_scene) {
                            entry.outgoing.push(choice.next_scene.clone());
                        }
                    }
                    if let Some(target) = links.iter_mut().find(|l| l.id == choice.next_scene) {
                        if !target.incoming.contains(&scene.id) {
                            target.incoming.push(scene.id.clone());
                        }
                    }
                }
            }
        }

        links
    }
}

/// Incoming and outgoing edges of one scene in the narrative graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneLinks {
    pub id: String,
    pub incoming: Vec<String>,
    pub outgoing: Vec<String>,
}

/// A node in the narrative graph: a background, a character set, and an
/// ordered sequence of dialogue lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    pub id: String,
    pub background: String,
    #[serde(default)]
    pub characters: Vec<Character>,
    #[serde(default)]
    pub dialogue: Vec<DialogueLine>,
}

impl Scene {
    /// The final dialogue line of the scene, if any.
    pub fn last_line(&self) -> Option<&DialogueLine> {
        self.dialogue.last()
    }
}

/// A character that can appear in a scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    pub id: String,
    pub image: String,
}

/// One line of dialogue.
///
/// Choices normally only appear on the last line of a scene, but the
/// generator is not trusted to uphold that.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueLine {
    pub speaker: String,
    pub text: String,
    /// Id of the speaking character within the owning scene, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
}

impl DialogueLine {
    /// Whether this line presents choices to the player.
    pub fn has_choices(&self) -> bool {
        !self.choices.is_empty()
    }
}

/// A graph edge: display text plus the id of the scene it leads to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    pub text: String,
    #[serde(rename = "nextScene")]
    pub next_scene: String,
}

impl Choice {
    /// Whether this choice ends the session instead of leading to a scene.
    pub fn is_exit(&self) -> bool {
        self.next_scene == EXIT_SCENE
    }
}

/// A book known to the backend, with its processing state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: String,
    pub status: BookStatus,
    #[serde(default)]
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Book {
    /// Whether the script for this book can be fetched.
    pub fn is_ready(&self) -> bool {
        self.status == BookStatus::Ready
    }
}

/// Processing pipeline stage of an uploaded book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookStatus {
    Uploading,
    Processing,
    Analyzing,
    Generating,
    Ready,
    Error,
    /// Any status string this client does not know. The backend script
    /// generator evolves independently; an unknown stage must not break a
    /// poll loop.
    #[serde(other)]
    Unknown,
}

impl BookStatus {
    /// Whether polling should stop at this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookStatus::Ready | BookStatus::Error)
    }
}

impl std::fmt::Display for BookStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BookStatus::Uploading => "uploading",
            BookStatus::Processing => "processing",
            BookStatus::Analyzing => "analyzing",
            BookStatus::Generating => "generating",
            BookStatus::Ready => "ready",
            BookStatus::Error => "error",
            BookStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_strips_trailing_slash() {
        let client = ApiClient::new("https://backend.example.com/");
        assert_eq!(client.base_url(), "https://backend.example.com");
        assert_eq!(client.url("/api/books"), "https://backend.example.com/api/books");
    }

    #[test]
    fn test_deserialize_scene_payload() {
        let json = r#"{
            "id": "scene_1",
            "background": "bg.png",
            "characters": [{"id": "protagonist", "image": "hero.png"}],
            "dialogue": [
                {"speaker": "Narrator", "text": "A dark night."},
                {
                    "speaker": "Narrator",
                    "text": "What now?",
                    "character": "protagonist",
                    "choices": [
                        {"text": "Press on", "nextScene": "scene_2"},
                        {"text": "Give up", "nextScene": "exit"}
                    ]
                }
            ]
        }"#;

        let scene: Scene = serde_json::from_str(json).unwrap();
        assert_eq!(scene.id, "scene_1");
        assert_eq!(scene.characters.len(), 1);
        assert!(!scene.dialogue[0].has_choices());

        let last = scene.last_line().unwrap();
        assert!(last.has_choices());
        assert_eq!(last.choices[0].next_scene, "scene_2");
        assert!(!last.choices[0].is_exit());
        assert!(last.choices[1].is_exit());
    }

    #[test]
    fn test_deserialize_book_status() {
        let book: Book = serde_json::from_str(
            r#"{"id": "b1", "title": "Dracula", "author": "Bram Stoker",
                "status": "analyzing", "progress": 60}"#,
        )
        .unwrap();
        assert_eq!(book.status, BookStatus::Analyzing);
        assert_eq!(book.progress, 60);
        assert!(!book.status.is_terminal());
        assert!(!book.is_ready());

        // A status string added server-side later must still parse.
        let book: Book = serde_json::from_str(
            r#"{"id": "b1", "title": "Dracula", "author": "Bram Stoker",
                "status": "illustrating", "progress": 95}"#,
        )
        .unwrap();
        assert_eq!(book.status, BookStatus::Unknown);
    }

    #[test]
    fn test_script_lookup() {
        let script = Script {
            title: "Test".to_string(),
            scenes: vec![
                Scene {
                    id: "scene_1".to_string(),
                    background: String::new(),
                    characters: vec![],
                    dialogue: vec![],
                },
                Scene {
                    id: "scene_2".to_string(),
                    background: String::new(),
                    characters: vec![],
                    dialogue: vec![],
                },
            ],
        };

        assert_eq!(script.entry().unwrap().id, "scene_1");
        assert_eq!(script.scene("scene_2").unwrap().id, "scene_2");
        assert!(script.scene("scene_3").is_none());
    }

    #[test]
    fn test_graph_summary() {
        let json = r#"{
            "title": "Graph",
            "scenes": [
                {"id": "a", "background": "", "dialogue": [
                    {"speaker": "N", "text": "t", "choices": [
                        {"text": "to b", "nextScene": "b"},
                        {"text": "away", "nextScene": "exit"},
                        {"text": "missing", "nextScene": "ghost"}
                    ]}
                ]},
                {"id": "b", "background": "", "dialogue": []}
            ]
        }"#;
        let script: Script = serde_json::from_str(json).unwrap();

        let links = script.graph_summary();
        let a = links.iter().find(|l| l.id == "a").unwrap();
        assert_eq!(a.outgoing, vec!["b".to_string(), "ghost".to_string()]);
        let b = links.iter().find(|l| l.id == "b").unwrap();
        assert_eq!(b.incoming, vec!["a".to_string()]);
    }
}
