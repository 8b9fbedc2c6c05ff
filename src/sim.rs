//! Procedural content: difficulty, bottle generation and fresh games.

use crate::model::{Bottle, GameScene, SceneKind};
use rand::Rng;

/// Per-millisecond fill rates a bottle can be given.
pub const FILL_RATES: [f64; 6] = [0.00085, 0.0009, 0.00095, 0.001, 0.0011, 0.0012];

pub const ABOUT_FRAGMENT: &str = "#about";
pub const GAME_FRAGMENT: &str = "";

const HANDICAP_ROUNDS: u32 = 10;

/// Extra band width for new players: shrinks by one per round, gone by round 10.
pub fn handicap(score: u32) -> u32 {
    HANDICAP_ROUNDS.saturating_sub(score)
}

pub fn make_random_bottle<R: Rng + ?Sized>(rng: &mut R, round: u32) -> Bottle {
    let handicap = handicap(round) as f64;
    let fill_max = rng.gen_range(0.6..0.95);
    let fill_min = rng.gen_range((fill_max - 0.2 - handicap * 0.01)..(fill_max - 0.1));
    let fill_rate = FILL_RATES[rng.gen_range(0..FILL_RATES.len())];

    Bottle {
        id: format!("b{round}"),
        height: 0.0,
        fill_min,
        fill_max,
        fill_rate,
    }
}

pub fn make_initial_game<R: Rng + ?Sized>(rng: &mut R, game_id: u32) -> GameScene {
    GameScene {
        game_id,
        score: 0,
        fill_start: None,
        hold_end: None,
        fail: None,
        previous_bottle: None,
        current_bottle: make_random_bottle(rng, 0),
        next_bottle: make_random_bottle(rng, 1),
    }
}

pub fn scene_from_fragment(fragment: &str) -> SceneKind {
    if fragment.trim_start_matches('#') == "about" {
        SceneKind::About
    } else {
        SceneKind::Game
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn handicap_floors_at_zero() {
        assert_eq!(handicap(0), 10);
        assert_eq!(handicap(7), 3);
        assert_eq!(handicap(10), 0);
        assert_eq!(handicap(u32::MAX), 0);
    }

    #[test]
    fn bottle_ids_follow_the_round() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(make_random_bottle(&mut rng, 0).id, "b0");
        assert_eq!(make_random_bottle(&mut rng, 12).id, "b12");
    }

    #[test]
    fn initial_game_is_round_zero() {
        let mut rng = StdRng::seed_from_u64(7);
        let game = make_initial_game(&mut rng, 3);
        assert_eq!(game.game_id, 3);
        assert_eq!(game.score, 0);
        assert_eq!(game.current_bottle.id, "b0");
        assert_eq!(game.next_bottle.id, "b1");
        assert!(game.previous_bottle.is_none());
        assert!(game.fill_start.is_none() && game.hold_end.is_none());
    }

    #[test]
    fn fragments_pick_scenes() {
        assert_eq!(scene_from_fragment("#about"), SceneKind::About);
        assert_eq!(scene_from_fragment("about"), SceneKind::About);
        assert_eq!(scene_from_fragment(""), SceneKind::Game);
        assert_eq!(scene_from_fragment("#"), SceneKind::Game);
        assert_eq!(scene_from_fragment("#aboutx"), SceneKind::Game);
    }
}
