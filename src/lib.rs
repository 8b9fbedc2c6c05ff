//! Fill Line: fill cups up to their fill lines in rapid succession.
//!
//! The game runs on a small Elm-style runtime. [`game::FillLine`] is a pure
//! `init`/`update` program; [`program::Runtime`] serialises every message
//! through it; asynchronous sources (frames, keys, navigation, timeouts) live
//! in the [`host::Host`] and reach the program only through [`effect::Effect`]s.

pub mod adapters;
pub mod app;
pub mod clock;
pub mod config;
pub mod effect;
pub mod game;
pub mod host;
pub mod input;
pub mod logging;
pub mod model;
pub mod program;
pub mod render;
pub mod sim;
pub mod storage;
