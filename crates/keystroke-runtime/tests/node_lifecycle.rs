use std::time::Duration;

use keystroke_core::config::{ConfigOverride, NodeDescriptor};
use keystroke_core::document::{ContainerId, Document};
use keystroke_runtime::{Engine, NodeEvent, NodeState};
use keystroke_memory::{Element, MemoryDocument};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

fn single(text: &str, patch: ConfigOverride) -> (Engine<MemoryDocument>, ContainerId) {
    let mut doc = MemoryDocument::new();
    let id = doc.insert(Element::new("p").class("keystroke").text(text));
    let mut engine = Engine::new(doc);
    engine.initialize();
    engine
        .global_config(&ConfigOverride {
            auto_render: Some(false),
            ..patch
        })
        .unwrap();
    engine.render(None).unwrap();
    (engine, id)
}

fn no_loop(delay: f64) -> ConfigOverride {
    ConfigOverride {
        repeat: Some(false),
        delay: Some(delay),
        ..ConfigOverride::speed(10.0, 20.0)
    }
}

fn text(engine: &Engine<MemoryDocument>, id: ContainerId) -> String {
    engine.document().text(id).unwrap_or_default()
}

#[test]
fn single_scene_plays_once_on_schedule() {
    let (mut engine, id) = single("ab", no_loop(1.0));
    assert_eq!(text(&engine, id), "");

    engine.advance(ms(100));
    assert_eq!(text(&engine, id), "a");
    engine.advance(ms(100));
    assert_eq!(text(&engine, id), "ab");

    // Held for exactly the delay, then erased at 20 chars/s.
    engine.advance(ms(999));
    assert_eq!(text(&engine, id), "ab");
    engine.advance(ms(1));
    assert_eq!(text(&engine, id), "a");
    engine.advance(ms(50));
    assert_eq!(text(&engine, id), "");
    assert_eq!(engine.live_timers(), 0);

    let transitions: Vec<_> = engine
        .drain_events()
        .into_iter()
        .map(|NodeEvent::Transition { from, to, .. }| (from, to))
        .collect();
    assert_eq!(
        transitions,
        vec![
            (NodeState::Idle, NodeState::Writing),
            (NodeState::Writing, NodeState::Pausing),
            (NodeState::Pausing, NodeState::Erasing),
            (NodeState::Erasing, NodeState::Finished),
        ]
    );
}

#[test]
fn coarse_advance_matches_fine_advance() {
    let (mut fine, a) = single("hello world", ConfigOverride::default());
    let (mut coarse, b) = single("hello world", ConfigOverride::default());
    for _ in 0..250 {
        fine.advance(ms(20));
    }
    coarse.advance(ms(5000));
    assert_eq!(text(&fine, a), text(&coarse, b));
    assert_eq!(fine.now(), coarse.now());
}

#[test]
fn looping_rotates_through_descriptor_words() {
    let mut doc = MemoryDocument::new();
    let id = doc.insert(Element::new("h1").id("hero"));
    let mut engine = Engine::new(doc);
    engine.initialize();
    engine
        .global_config(&ConfigOverride {
            delay: Some(0.0),
            query_selector: Some(String::new()),
            nodes: Some(vec![NodeDescriptor::new("#hero").words(["ab", "cd"])]),
            ..ConfigOverride::speed(10.0, 10.0)
        })
        .unwrap();

    let mut seen = Vec::new();
    for _ in 0..20 {
        engine.advance(ms(100));
        seen.push(text(&engine, id));
    }
    assert!(seen.contains(&"ab".to_string()));
    assert!(seen.contains(&"cd".to_string()));
    // Back to the first scene after wrapping.
    let last_ab = seen.iter().rposition(|t| t == "ab");
    let first_cd = seen.iter().position(|t| t == "cd");
    assert!(last_ab > first_cd);
}

#[test]
fn hold_leaves_final_scene_visible() {
    let patch = ConfigOverride {
        hold: Some(true),
        ..no_loop(0.5)
    };
    let (mut engine, id) = single("done", patch);
    engine.advance(ms(10_000));
    assert_eq!(text(&engine, id), "done");
    assert_eq!(engine.live_timers(), 0);
    assert!(engine.nodes().all(|n| n.state() == NodeState::Finished));
}

#[test]
fn pause_all_freezes_every_node() {
    let mut doc = MemoryDocument::new();
    let a = doc.insert(Element::new("p").class("keystroke").text("abc"));
    let b = doc.insert(Element::new("p").class("keystroke").text("xyz"));
    let mut engine = Engine::new(doc);
    engine.initialize();
    engine.render(None).unwrap();

    engine.advance(ms(100));
    assert_eq!(engine.pause_all().unwrap(), 2);
    assert_eq!(engine.pause_all().unwrap(), 0);
    engine.advance(ms(1000));
    assert_eq!(text(&engine, a), "a");
    assert_eq!(text(&engine, b), "x");
    assert_eq!(engine.live_timers(), 0);

    assert_eq!(engine.resume_all().unwrap(), 2);
    assert_eq!(engine.resume_all().unwrap(), 0);
    engine.advance(ms(0));
    assert_eq!(text(&engine, a), "ab");
    assert_eq!(text(&engine, b), "xy");
}

proptest! {
    #[test]
    fn pause_resume_preserves_final_text(pause_at in 0u64..1_200, hold_for in 0u64..5_000) {
        let (mut baseline, a) = single("type this", no_loop(60.0));
        baseline.advance(ms(2_000));

        let (mut engine, b) = single("type this", no_loop(60.0));
        engine.advance(ms(pause_at));
        engine.pause_all().unwrap();
        engine.advance(ms(hold_for));
        engine.resume_all().unwrap();
        engine.advance(ms(2_000));

        prop_assert_eq!(text(&baseline, a), "type this");
        prop_assert_eq!(text(&engine, b), "type this");
    }
}
