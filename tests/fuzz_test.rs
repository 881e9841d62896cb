//! Garbage and random input must never panic or reach a handler by accident

mod common;

use common::mock_registry::Behavior;
use common::{build_recording_loop, wake_and_handle, Script};
use optus::intent::{is_cancellation, DispatchOutcome, IntentMatcher, Utterance};
use optus::listening::LoopState;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::Instant;

const GARBAGE: &[&str] = &[
    "asdfghjkl",
    "!!! @@@ ###",
    "1234567890",
    "extremely long string that doesn't mean anything to the assistant at all but keeps going for quite a while",
    "ÄÖÜ ß 日本語 🎙️",
    "what is",
    "calculate",
];

#[test]
fn test_random_text_never_panics() {
    let matcher = IntentMatcher::new();
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..2000 {
        let len = rng.gen_range(0..64);
        let raw: String = (0..len).map(|_| rng.gen::<char>()).collect();
        let utterance = Utterance::new(&raw);

        let first = matcher.match_utterance(&utterance);
        assert_eq!(first, matcher.match_utterance(&utterance));
        let _ = is_cancellation(&utterance);
    }
}

#[test]
fn test_garbage_is_fallback() {
    let matcher = IntentMatcher::new();
    for text in &GARBAGE[..5] {
        assert_eq!(
            matcher.match_utterance(&Utterance::new(text)),
            DispatchOutcome::Fallback,
            "{}",
            text
        );
    }
}

#[tokio::test]
async fn test_asr_flood_keeps_loop_alive() {
    let rounds = 20;
    let phrases: Vec<&str> = GARBAGE.iter().copied().cycle().take(rounds).collect();
    let (mut listening, handles, registry) =
        build_recording_loop(Script::saying(&phrases), Behavior::Succeed);

    let start = Instant::now();
    for _ in 0..rounds {
        assert_eq!(wake_and_handle(&mut listening).await, LoopState::Idle);
    }
    println!("Handled {} commands in {:?}", rounds, start.elapsed());

    assert_eq!(registry.calls().len(), rounds);
    assert_eq!(handles.tts.get_spoken().len(), rounds * 2);
}
