//! Continuation strategies for the narrative graph.
//!
//! AI-generated scripts are incomplete in practice: a choice may reference a
//! scene that was never generated, and scene numbering drifts between
//! generation passes. Rather than dead-ending, the engine resolves missing
//! edges through an ordered list of heuristics. Each strategy lives here as
//! a plain function so it can be tested on its own.

use plotweave_api::{Scene, Script};

/// A continuation strategy: given the script and the scene that just ran out
/// of dialogue, propose the id of the scene to continue with.
pub type Strategy = fn(&Script, &Scene) -> Option<String>;

/// Strategies tried, in order, when a scene ends without an explicit choice
/// click. The entry-scene fallback is not part of the list; it is the
/// engine's last resort when every strategy declines.
pub const CONTINUATION_STRATEGIES: &[Strategy] =
    &[implicit_choice_target, numeric_successor_in_script];

/// Run the continuation pipeline. `None` means no strategy applied and the
/// caller should fall back to the entry scene.
pub fn resolve_continuation(script: &Script, current: &Scene) -> Option<String> {
    CONTINUATION_STRATEGIES
        .iter()
        .find_map(|strategy| strategy(script, current))
}

/// Implicit default continuation: when the last dialogue line of the scene
/// carries choices, the first choice's target is treated as the canonical
/// "keep reading" path. The target may be the `exit` sentinel or a scene
/// that does not exist yet; the engine deals with both.
pub fn implicit_choice_target(_script: &Script, scene: &Scene) -> Option<String> {
    scene
        .last_line()
        .and_then(|line| line.choices.first())
        .map(|choice| choice.next_scene.clone())
}

/// Numeric-suffix inference, constrained to scenes that actually exist:
/// increment the first digit run of the current id and look the result up.
pub fn numeric_successor_in_script(script: &Script, scene: &Scene) -> Option<String> {
    let candidate = numeric_successor(&scene.id)?;
    script.scene(&candidate).map(|s| s.id.clone())
}

/// Increment the first digit run in `id` and substitute it back.
///
/// Only the first run is touched: `"scene_2a"` becomes `"scene_3a"`,
/// `"chapter_12_part_3"` becomes `"chapter_13_part_3"`. Ids without digits
/// yield `None`.
pub fn numeric_successor(id: &str) -> Option<String> {
    let start = id.find(|c: char| c.is_ascii_digit())?;
    let end = id[start..]
        .find(|c: char| !c.is_ascii_digit())
        .map(|offset| start + offset)
        .unwrap_or(id.len());

    let value: u64 = id[start..end].parse().ok()?;
    let next = value.checked_add(1)?;
    Some(format!("{}{}{}", &id[..start], next, &id[end..]))
}

/// Fuzzy fallback for an unresolvable edge target: substring containment in
/// either direction, returning the index of the match in `script.scenes`.
///
/// Scenes whose id contains the requested id are preferred (the request is
/// usually a truncated or partial form of a real id); only when none match
/// is the reverse direction tried. Within each pass the first match in
/// iteration order wins.
pub fn substring_match(script: &Script, wanted: &str) -> Option<usize> {
    if wanted.is_empty() {
        return None;
    }
    script
        .scenes
        .iter()
        .position(|s| s.id.contains(wanted))
        .or_else(|| script.scenes.iter().position(|s| wanted.contains(s.id.as_str())))
}
