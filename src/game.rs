//! The Fill Line program: every scene transition lives in [`FillLine::update`].

use crate::adapters::{AnimationFrames, FragmentChanges, KeyEdges};
use crate::clock::Timestamp;
use crate::effect::{self, batch, Adapter, Effect};
use crate::host::Host;
use crate::model::{GameScene, Model, Msg, Scene, SceneKind, RESET_DELAY_MS};
use crate::program::Program;
use crate::sim::{make_initial_game, make_random_bottle, scene_from_fragment};
use crate::storage::HighScoreStore;
use crossterm::event::KeyCode;
use rand::rngs::StdRng;
use std::cell::RefCell;
use tracing::{debug, info, warn};

pub struct FillLine {
    touch: bool,
    host: Host,
    high_scores: HighScoreStore,
    rng: RefCell<StdRng>,
    frames: AnimationFrames,
    keys: KeyEdges,
    fragments: FragmentChanges,
}

impl FillLine {
    /// `fill_key` drives pours through press and release; it is only
    /// listened to when `touch` is off.
    pub fn new(
        host: Host,
        high_scores: HighScoreStore,
        touch: bool,
        rng: StdRng,
        fill_key: KeyCode,
    ) -> Self {
        Self {
            touch,
            frames: AnimationFrames::new(host.clone()),
            keys: KeyEdges::new(host.clone(), fill_key),
            fragments: FragmentChanges::new(host.clone()),
            host,
            high_scores,
            rng: RefCell::new(rng),
        }
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn frames(&self) -> &AnimationFrames {
        &self.frames
    }

    pub fn keys(&self) -> &KeyEdges {
        &self.keys
    }

    pub fn fragments(&self) -> &FragmentChanges {
        &self.fragments
    }

    fn new_game(&self, game_id: u32) -> GameScene {
        make_initial_game(&mut *self.rng.borrow_mut(), game_id)
    }

    fn scene_for(&self, kind: SceneKind) -> Scene {
        match kind {
            SceneKind::About => Scene::About,
            SceneKind::Game => Scene::Game(self.new_game(0)),
        }
    }

    fn load_initial_state(&self) -> Effect<Msg> {
        let high_scores = self.high_scores.clone();
        let host = self.host.clone();
        Effect::from_fn(move |d| {
            d(Msg::Load {
                initial_scene: scene_from_fragment(&host.fragment()),
                high_score: high_scores.read(),
            })
        })
    }

    fn reset_later(&self) -> Effect<Msg> {
        let host = self.host.clone();
        Effect::from_fn(move |d| {
            host.set_timeout(RESET_DELAY_MS, move || d(Msg::ResetGame));
        })
    }

    fn save_high_score(&self, score: u32) -> Effect<Msg> {
        let high_scores = self.high_scores.clone();
        Effect::from_fn(move |_| match high_scores.write(score) {
            Ok(()) => info!(score, "new high score saved"),
            Err(e) => warn!(score, error = %e, "could not save high score"),
        })
    }

    fn with_game(model: &Model, game: GameScene) -> Model {
        Model {
            scene: Scene::Game(game),
            ..model.clone()
        }
    }

    fn end_fill(
        &self,
        model: &Model,
        game: &GameScene,
        fill_start: Timestamp,
    ) -> (Model, Effect<Msg>) {
        let fill_end = self.host.now();
        let final_height = game.current_bottle.height_at(fill_start, fill_end);
        let mut poured = game.current_bottle.clone();
        poured.height = final_height;

        if let Some(fail) = poured.judge(final_height) {
            debug!(?fail, final_height, score = game.score, "pour failed");
            let held = GameScene {
                hold_end: Some(fill_end),
                fail: Some(fail),
                current_bottle: poured,
                ..game.clone()
            };
            return (
                Self::with_game(model, held),
                batch([effect::cancel(&self.frames), self.reset_later()]),
            );
        }

        let score = game.score + 1;
        debug!(final_height, score, "pour landed");
        let next_bottle = make_random_bottle(&mut *self.rng.borrow_mut(), score + 1);
        let advanced = GameScene {
            score,
            fill_start: None,
            previous_bottle: Some(poured),
            current_bottle: game.next_bottle.clone(),
            next_bottle,
            ..game.clone()
        };
        (
            Self::with_game(model, advanced),
            effect::cancel(&self.frames),
        )
    }

    fn reset_game(&self, model: &Model, game: &GameScene) -> (Model, Effect<Msg>) {
        let beat_high = game.score > model.high_score.unwrap_or(0);
        let high_score = if beat_high {
            Some(game.score)
        } else {
            model.high_score
        };
        debug!(game_id = game.game_id, score = game.score, beat_high, "game reset");

        let next = Model {
            high_score,
            scene: Scene::Game(self.new_game(game.game_id + 1)),
            previous_game: Some(game.clone()),
            ..model.clone()
        };
        let effect = if beat_high {
            self.save_high_score(game.score)
        } else {
            Effect::none()
        };
        (next, effect)
    }
}

fn unchanged(model: &Model) -> (Model, Effect<Msg>) {
    (model.clone(), Effect::none())
}

impl Program for FillLine {
    type Msg = Msg;
    type Model = Model;

    fn init(&self) -> (Model, Effect<Msg>) {
        let model = Model {
            touch: self.touch,
            scene: Scene::Loading,
            high_score: None,
            previous_game: None,
        };

        let navigation = effect::start(&self.fragments)
            .map(|fragment: String| Msg::Navigate(scene_from_fragment(&fragment)));
        let fill_key = if self.touch {
            Effect::none()
        } else {
            effect::start(&self.keys).map(|down| if down { Msg::StartFill } else { Msg::EndFill })
        };

        (
            model,
            batch([self.load_initial_state(), navigation, fill_key]),
        )
    }

    fn update(&self, msg: Msg, model: &Model) -> (Model, Effect<Msg>) {
        match msg {
            Msg::Load {
                initial_scene,
                high_score,
            } => {
                let next = Model {
                    high_score,
                    scene: self.scene_for(initial_scene),
                    ..model.clone()
                };
                (next, Effect::none())
            }
            Msg::Navigate(kind) => {
                let next = Model {
                    scene: self.scene_for(kind),
                    ..model.clone()
                };
                (next, Effect::none())
            }
            Msg::StartFill => {
                let Some(game) = model.scene.game() else {
                    return unchanged(model);
                };
                if game.fill_start.is_some() {
                    return unchanged(model);
                }
                let pouring = GameScene {
                    fill_start: Some(self.host.now()),
                    ..game.clone()
                };
                (
                    Self::with_game(model, pouring),
                    effect::start(&self.frames).map(Msg::AnimationFrame),
                )
            }
            Msg::EndFill => match model.scene.game() {
                Some(game) if game.hold_end.is_none() => match game.fill_start {
                    Some(fill_start) => self.end_fill(model, game, fill_start),
                    None => unchanged(model),
                },
                _ => unchanged(model),
            },
            Msg::AnimationFrame(ts) => match model.scene.game() {
                Some(game) if game.is_pouring() => {
                    let Some(fill_start) = game.fill_start else {
                        return unchanged(model);
                    };
                    let mut bottle = game.current_bottle.clone();
                    bottle.height = bottle.height_at(fill_start, ts);
                    let next = GameScene {
                        current_bottle: bottle,
                        ..game.clone()
                    };
                    (Self::with_game(model, next), Effect::none())
                }
                _ => unchanged(model),
            },
            Msg::ResetGame => match model.scene.game() {
                Some(game) => self.reset_game(model, game),
                None => unchanged(model),
            },
        }
    }

    fn done(&self) {
        self.keys.cancel();
        self.fragments.cancel();
        self.frames.cancel();
        debug!("input adapters released");
    }
}
