//! Built-in demo story.
//!
//! Used when the backend is unreachable or the shelf is empty, so the app
//! always has something playable. The graph deliberately exercises every
//! traversal path: branching choices, a loop back to the entry scene, and
//! an exit edge.

use plotweave_api::{Book, BookStatus, Character, Choice, DialogueLine, Scene, Script, EXIT_SCENE};

/// Id prefix of books served from this module instead of the backend.
pub const SAMPLE_ID_PREFIX: &str = "sample";

const PROTAGONIST_IMAGE: &str = "data:image/svg+xml;utf8,<svg xmlns='http://www.w3.org/2000/svg' viewBox='0 0 100 250'><rect x='35' y='20' width='30' height='30' rx='15' fill='%23f9d5e5'/><rect x='30' y='50' width='40' height='110' fill='%236a0572'/></svg>";
const GUIDE_IMAGE: &str = "data:image/svg+xml;utf8,<svg xmlns='http://www.w3.org/2000/svg' viewBox='0 0 100 250'><rect x='35' y='20' width='30' height='30' rx='15' fill='%23d1d1e0'/><rect x='30' y='50' width='40' height='110' fill='%23333333'/></svg>";
const MAIN_BACKGROUND: &str = "data:image/svg+xml;utf8,<svg xmlns='http://www.w3.org/2000/svg' viewBox='0 0 800 600'><rect width='800' height='600' fill='%23243b55'/></svg>";
const SECONDARY_BACKGROUND: &str = "data:image/svg+xml;utf8,<svg xmlns='http://www.w3.org/2000/svg' viewBox='0 0 800 600'><rect width='800' height='600' fill='%232c3e50'/></svg>";

/// The sample shelf shown when no real books exist.
pub fn sample_books() -> Vec<Book> {
    let titles = [
        ("sample1", "The Great Gatsby", "F. Scott Fitzgerald"),
        ("sample2", "Pride and Prejudice", "Jane Austen"),
        ("sample3", "Sherlock Holmes", "Arthur Conan Doyle"),
        ("sample4", "Dracula", "Bram Stoker"),
    ];

    titles
        .iter()
        .map(|(id, title, author)| Book {
            id: (*id).to_string(),
            title: (*title).to_string(),
            author: (*author).to_string(),
            status: BookStatus::Ready,
            progress: 100,
            error: None,
        })
        .collect()
}

/// Generate the demo script for a book title.
pub fn sample_script(title: &str) -> Script {
    let protagonist = Character {
        id: "protagonist".to_string(),
        image: PROTAGONIST_IMAGE.to_string(),
    };
    let guide = Character {
        id: "guide".to_string(),
        image: GUIDE_IMAGE.to_string(),
    };

    Script {
        title: title.to_string(),
        scenes: vec![
            Scene {
                id: "scene_1".to_string(),
                background: MAIN_BACKGROUND.to_string(),
                characters: vec![protagonist.clone()],
                dialogue: vec![
                    narration(format!(
                        "Welcome to the world of {title}. This interactive \
                         retelling lets you explore the story from the inside."
                    )),
                    narration("The choices you make will shape how the tale unfolds.".to_string()),
                    spoken("You", "I wonder what awaits me here...", "protagonist"),
                    choice_line(
                        "Narrator",
                        "How would you like to begin?",
                        vec![
                            edge("With courage and determination", "scene_2a"),
                            edge("Cautiously and thoughtfully", "scene_2b"),
                            edge("Let fate decide my path", "scene_2c"),
                        ],
                    ),
                ],
            },
            Scene {
                id: "scene_2a".to_string(),
                background: SECONDARY_BACKGROUND.to_string(),
                characters: vec![protagonist.clone(), guide.clone()],
                dialogue: vec![
                    narration("You meet the challenge head-on, determination guiding every step.".to_string()),
                    spoken("You", "I'm ready for whatever comes my way.", "protagonist"),
                    spoken("Guide", "Your courage is admirable, but courage without wisdom invites peril.", "guide"),
                    choice_line(
                        "Guide",
                        "Do you still wish to continue?",
                        vec![
                            edge("I understand the risks", "scene_continue"),
                            edge("Perhaps I should reconsider", "scene_1"),
                        ],
                    ),
                ],
            },
            Scene {
                id: "scene_2b".to_string(),
                background: SECONDARY_BACKGROUND.to_string(),
                characters: vec![protagonist.clone()],
                dialogue: vec![
                    narration("You choose the careful path, weighing each step before taking it.".to_string()),
                    spoken("You", "Better to proceed with care than to rush into danger.", "protagonist"),
                    choice_line(
                        "Narrator",
                        "What draws your attention first?",
                        vec![
                            edge("The history of this place", "scene_continue"),
                            edge("The people and their motives", "scene_continue"),
                            edge("The mysteries left unsolved", "scene_continue"),
                        ],
                    ),
                ],
            },
            Scene {
                id: "scene_2c".to_string(),
                background: MAIN_BACKGROUND.to_string(),
                characters: vec![],
                dialogue: vec![
                    narration("You surrender to the current of the story and let it carry you.".to_string()),
                    narration("Sometimes the most interesting paths are the ones we do not choose.".to_string()),
                    choice_line(
                        "Narrator",
                        "Which pull of fate is strongest?",
                        vec![
                            edge("A mysterious encounter", "scene_continue"),
                            edge("An unexpected opportunity", "scene_continue"),
                            edge("A moment of revelation", "scene_continue"),
                        ],
                    ),
                ],
            },
            Scene {
                id: "scene_continue".to_string(),
                background: MAIN_BACKGROUND.to_string(),
                characters: vec![protagonist],
                dialogue: vec![
                    narration("This is where your own version of the story would continue...".to_string()),
                    spoken("You", "I look forward to seeing where this leads.", "protagonist"),
                    choice_line(
                        "Narrator",
                        "Would you like to keep exploring?",
                        vec![
                            edge("Return to the beginning", "scene_1"),
                            edge("Return to the bookshelf", EXIT_SCENE),
                        ],
                    ),
                ],
            },
        ],
    }
}

fn narration(text: String) -> DialogueLine {
    DialogueLine {
        speaker: "Narrator".to_string(),
        text,
        character: None,
        choices: Vec::new(),
    }
}

fn spoken(speaker: &str, text: &str, character: &str) -> DialogueLine {
    DialogueLine {
        speaker: speaker.to_string(),
        text: text.to_string(),
        character: Some(character.to_string()),
        choices: Vec::new(),
    }
}

fn choice_line(speaker: &str, text: &str, choices: Vec<Choice>) -> DialogueLine {
    DialogueLine {
        speaker: speaker.to_string(),
        text: text.to_string(),
        character: None,
        choices,
    }
}

fn edge(text: &str, next_scene: &str) -> Choice {
    Choice {
        text: text.to_string(),
        next_scene: next_scene.to_string(),
    }
}
