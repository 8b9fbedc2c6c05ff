use crate::clock::Timestamp;

/// Delay between a failed pour and the automatic reset.
pub const RESET_DELAY_MS: i64 = 500;

#[derive(Clone, Debug, PartialEq)]
pub struct Bottle {
    /// Stable per round, used to key visuals.
    pub id: String,
    /// Current fill fraction. Derived from the pour while pouring.
    pub height: f64,
    pub fill_min: f64,
    pub fill_max: f64,
    /// Fill fraction gained per millisecond of pour.
    pub fill_rate: f64,
}

impl Bottle {
    pub fn height_at(&self, fill_start: Timestamp, now: Timestamp) -> f64 {
        (now - fill_start) as f64 * self.fill_rate
    }

    /// Overflow is checked first and underflow second, so underflow wins if
    /// both ever hold.
    pub fn judge(&self, final_height: f64) -> Option<Fail> {
        let mut fail = None;
        if final_height > self.fill_max {
            fail = Some(Fail::Overflow);
        }
        if final_height < self.fill_min {
            fail = Some(Fail::Underflow);
        }
        fail
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fail {
    Overflow,
    Underflow,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GameScene {
    pub game_id: u32,
    /// Rounds completed in this game.
    pub score: u32,
    pub fill_start: Option<Timestamp>,
    pub hold_end: Option<Timestamp>,
    pub fail: Option<Fail>,
    pub previous_bottle: Option<Bottle>,
    pub current_bottle: Bottle,
    pub next_bottle: Bottle,
}

impl GameScene {
    pub fn is_pouring(&self) -> bool {
        self.fill_start.is_some() && self.hold_end.is_none()
    }

    pub fn is_holding(&self) -> bool {
        self.hold_end.is_some()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Scene {
    Loading,
    About,
    Game(GameScene),
}

impl Scene {
    pub fn game(&self) -> Option<&GameScene> {
        match self {
            Scene::Game(game) => Some(game),
            Scene::Loading | Scene::About => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Model {
    /// Tap-to-toggle input instead of press and release.
    pub touch: bool,
    pub scene: Scene,
    pub high_score: Option<u32>,
    /// The game as it stood right before the last reset.
    pub previous_game: Option<GameScene>,
}

/// Scenes reachable by loading or navigating.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SceneKind {
    Game,
    About,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Msg {
    Load {
        initial_scene: SceneKind,
        high_score: Option<u32>,
    },
    Navigate(SceneKind),
    StartFill,
    EndFill,
    AnimationFrame(Timestamp),
    ResetGame,
}
