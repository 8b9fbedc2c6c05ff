//! Terminal events mapped onto what the game screen exposes: fill controls,
//! navigation links and quitting. Raw key events also go to the host so the
//! key-edge adapter can see them; that happens in the app loop.

use crate::model::{Model, Msg, Scene};
use crate::sim::{ABOUT_FRAGMENT, GAME_FRAGMENT};
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind,
};
use std::time::Duration;

#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    Dispatch(Msg),
    Navigate(&'static str),
    Quit,
}

/// Waits up to `timeout` for the first event, then drains whatever else is ready.
pub fn collect_input(timeout: Duration) -> anyhow::Result<Vec<Event>> {
    let mut out = Vec::new();
    let mut wait = timeout;
    while event::poll(wait)? {
        out.push(event::read()?);
        if out.len() >= 32 {
            break;
        }
        wait = Duration::ZERO;
    }
    Ok(out)
}

pub fn map_event_to_action(model: &Model, ev: &Event) -> Option<Action> {
    match ev {
        Event::Key(k) => map_key(model, k),
        Event::Mouse(m) => {
            let game = model.scene.game()?;
            if game.is_holding() {
                return None;
            }
            match (m.kind, model.touch) {
                (MouseEventKind::Down(MouseButton::Left), true) => Some(tap(game.fill_start.is_some())),
                (MouseEventKind::Down(MouseButton::Left), false) => Some(Action::Dispatch(Msg::StartFill)),
                (MouseEventKind::Up(MouseButton::Left), false) => Some(Action::Dispatch(Msg::EndFill)),
                _ => None,
            }
        }
        _ => None,
    }
}

fn map_key(model: &Model, k: &KeyEvent) -> Option<Action> {
    if k.kind != KeyEventKind::Press {
        return None;
    }
    if matches!(k.code, KeyCode::Char('c')) && k.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(Action::Quit);
    }
    if matches!(k.code, KeyCode::Char('q') | KeyCode::Char('Q')) {
        return Some(Action::Quit);
    }

    match &model.scene {
        Scene::Loading => None,
        Scene::About => match k.code {
            KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('b') | KeyCode::Char('B') => {
                Some(Action::Navigate(GAME_FRAGMENT))
            }
            _ => None,
        },
        Scene::Game(game) => match k.code {
            // The about link is only on screen before the first point.
            KeyCode::Char('?') if game.score == 0 => Some(Action::Navigate(ABOUT_FRAGMENT)),
            KeyCode::Enter if model.touch && !game.is_holding() => {
                Some(tap(game.fill_start.is_some()))
            }
            _ => None,
        },
    }
}

fn tap(pouring: bool) -> Action {
    if pouring {
        Action::Dispatch(Msg::EndFill)
    } else {
        Action::Dispatch(Msg::StartFill)
    }
}
