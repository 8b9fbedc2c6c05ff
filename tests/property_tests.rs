//! Property-based tests for difficulty, bottle generation and the fill
//! controls' stale-message handling.

use crossterm::event::KeyCode;
use fill_line::clock::ManualClock;
use fill_line::game::FillLine;
use fill_line::host::Host;
use fill_line::model::{Model, Msg, Scene, SceneKind};
use fill_line::program::Program;
use fill_line::sim::{handicap, make_random_bottle, FILL_RATES};
use fill_line::storage::{HighScoreStore, MemoryStore};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::rc::Rc;

fn fixture(seed: u64) -> (ManualClock, FillLine) {
    let clock = ManualClock::new(0);
    let host = Host::new(Rc::new(clock.clone()), "");
    let game = FillLine::new(
        host,
        HighScoreStore::new(Rc::new(MemoryStore::new())),
        false,
        StdRng::seed_from_u64(seed),
        KeyCode::Char(' '),
    );
    (clock, game)
}

fn loaded(game: &FillLine, kind: SceneKind) -> Model {
    let (model, _) = game.init();
    game.update(
        Msg::Load {
            initial_scene: kind,
            high_score: None,
        },
        &model,
    )
    .0
}

prop_compose! {
    fn arbitrary_scene_kind()(about in any::<bool>()) -> SceneKind {
        if about { SceneKind::About } else { SceneKind::Game }
    }
}

proptest! {
    #[test]
    fn handicap_is_ten_minus_score_then_zero(score in 0u32..10_000) {
        let expected = if score >= 10 { 0 } else { 10 - score };
        prop_assert_eq!(handicap(score), expected);
    }

    #[test]
    fn handicap_never_increases(score in 0u32..10_000) {
        prop_assert!(handicap(score + 1) <= handicap(score));
    }

    #[test]
    fn generated_bottles_respect_bounds(seed in any::<u64>(), round in 0u32..50) {
        let mut rng = StdRng::seed_from_u64(seed);
        let b = make_random_bottle(&mut rng, round);
        prop_assert!(0.0 < b.fill_min);
        prop_assert!(b.fill_min < b.fill_max);
        prop_assert!(b.fill_max < 1.0);
        prop_assert!(b.fill_max >= 0.6 && b.fill_max < 0.95);
        let width = b.fill_max - b.fill_min;
        let widest = 0.2 + handicap(round) as f64 * 0.01;
        prop_assert!(width >= 0.1 - 1e-9, "band too narrow: {width}");
        prop_assert!(width <= widest + 1e-9, "band wider than {widest}: {width}");
        prop_assert!(FILL_RATES.contains(&b.fill_rate));
        prop_assert_eq!(b.height, 0.0);
        prop_assert_eq!(b.id, format!("b{round}"));
    }

    #[test]
    fn second_start_fill_is_idempotent(seed in any::<u64>(), t1 in 0i64..100_000, dt in 0i64..10_000) {
        let (clock, game) = fixture(seed);
        let model = loaded(&game, SceneKind::Game);
        clock.set(t1);
        let (once, _) = game.update(Msg::StartFill, &model);
        clock.set(t1 + dt);
        let (twice, effect) = game.update(Msg::StartFill, &once);
        prop_assert_eq!(twice, once);
        prop_assert!(effect.is_none());
    }

    #[test]
    fn end_fill_without_start_is_a_no_op(seed in any::<u64>(), kind in arbitrary_scene_kind(), t in 0i64..100_000) {
        let (clock, game) = fixture(seed);
        let model = loaded(&game, kind);
        clock.set(t);
        let (next, effect) = game.update(Msg::EndFill, &model);
        prop_assert_eq!(next, model);
        prop_assert!(effect.is_none());
    }

    #[test]
    fn fill_messages_outside_a_game_change_nothing(seed in any::<u64>(), ts in 0i64..100_000) {
        let (_, game) = fixture(seed);
        let model = loaded(&game, SceneKind::About);
        prop_assert_eq!(&model.scene, &Scene::About);
        for msg in [Msg::StartFill, Msg::EndFill, Msg::AnimationFrame(ts), Msg::ResetGame] {
            let (next, effect) = game.update(msg, &model);
            prop_assert_eq!(&next, &model);
            prop_assert!(effect.is_none());
        }
    }

    #[test]
    fn high_score_round_trips(score in any::<u32>()) {
        let scores = HighScoreStore::new(Rc::new(MemoryStore::new()));
        scores.write(score).unwrap();
        prop_assert_eq!(scores.read(), Some(score));
    }

    #[test]
    fn high_score_only_grows_on_reset(seed in any::<u64>(), score in 0u32..100, best in proptest::option::of(0u32..100)) {
        let (_, game) = fixture(seed);
        let mut model = loaded(&game, SceneKind::Game);
        model.high_score = best;
        if let Scene::Game(g) = &mut model.scene {
            g.score = score;
        }
        let (next, _) = game.update(Msg::ResetGame, &model);
        let expected = if score > best.unwrap_or(0) { Some(score) } else { best };
        prop_assert_eq!(next.high_score, expected);
        prop_assert!(next.high_score.unwrap_or(0) >= best.unwrap_or(0));
    }
}
