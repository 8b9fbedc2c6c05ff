use crate::clock::SystemClock;
use crate::config::{load_settings, project_paths, save_settings_atomic, Args, Paths, Settings};
use crate::game::FillLine;
use crate::host::Host;
use crate::input::{collect_input, map_event_to_action, Action};
use crate::logging::init_logging;
use crate::program::Runtime;
use crate::render::{draw_model, Palette, Terminal};
use crate::sim::{ABOUT_FRAGMENT, GAME_FRAGMENT};
use crate::storage::{FileStore, HighScoreStore};
use anyhow::Context;
use crossterm::event::{Event, KeyCode};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::{error, info};

pub struct App {
    settings: Settings,
    session: Settings,
    paths: Paths,
    host: Host,
    runtime: Runtime<FillLine>,
    term: Terminal,
    palette: Palette,
    should_quit: bool,
}

impl App {
    fn init(args: Args) -> anyhow::Result<Self> {
        let paths = project_paths(args.data_dir.as_deref())?;
        init_logging(&paths.log_path)?;
        let settings = load_settings(&paths.settings_path);
        let session = settings.with_args(&args);

        let store = FileStore::open(&paths.storage_path);
        let high_scores = HighScoreStore::new(Rc::new(store));
        let rng = match session.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let fragment = if args.about {
            ABOUT_FRAGMENT
        } else {
            GAME_FRAGMENT
        };
        let host = Host::new(Rc::new(SystemClock), fragment);

        let term = Terminal::begin().context("could not set up the terminal")?;
        let touch = session.touch.unwrap_or(!term.reports_key_releases());
        let game = FillLine::new(
            host.clone(),
            high_scores,
            touch,
            rng,
            KeyCode::Char(session.fill_key),
        );
        let runtime = Runtime::start(game);
        info!(touch, fps = session.fps_cap, "fill line started");

        Ok(Self {
            palette: Palette::new(session.enable_color),
            settings,
            session,
            paths,
            host,
            runtime,
            term,
            should_quit: false,
        })
    }

    fn run(&mut self) -> anyhow::Result<()> {
        let frame_dt = Duration::from_secs_f32(1.0 / self.session.fps_cap as f32);
        let mut next_frame = Instant::now();

        self.runtime.drain();
        while !self.should_quit {
            self.term.resize_if_needed()?;

            // input, waking early for a due timeout
            let mut wait = next_frame.saturating_duration_since(Instant::now());
            if let Some(deadline) = self.host.next_deadline() {
                let ms = (deadline - self.host.now()).max(0) as u64;
                wait = wait.min(Duration::from_millis(ms));
            }
            for ev in collect_input(wait)? {
                self.handle_event(&ev);
                self.runtime.drain();
                if self.should_quit {
                    break;
                }
            }

            self.host.fire_due_timers();
            self.runtime.drain();

            let now = Instant::now();
            if now >= next_frame {
                self.host.fire_frames();
                self.runtime.drain();
                self.render_frame()?;
                next_frame += frame_dt;
                if next_frame < now {
                    next_frame = now + frame_dt;
                }
            }
        }
        Ok(())
    }

    fn handle_event(&mut self, ev: &Event) {
        if let Event::Key(k) = ev {
            self.host.emit_key(k);
        }
        match map_event_to_action(self.runtime.model(), ev) {
            Some(Action::Quit) => self.should_quit = true,
            Some(Action::Navigate(fragment)) => {
                self.host.navigate(fragment);
            }
            Some(Action::Dispatch(msg)) => (self.runtime.dispatcher())(msg),
            None => {}
        }
    }

    fn render_frame(&mut self) -> anyhow::Result<()> {
        draw_model(&mut self.term.cur, self.runtime.model(), &self.palette);
        self.term.present(true)
    }

    fn shutdown(&mut self) -> anyhow::Result<()> {
        self.runtime.done();
        self.term.end()?;
        save_settings_atomic(&self.paths.settings_path, &self.settings)?;
        info!("fill line stopped");
        Ok(())
    }
}

pub fn run(args: Args) -> anyhow::Result<()> {
    let mut app = App::init(args)?;
    let res = app.run();
    if let Err(e) = &res {
        error!(error = %e, "main loop failed");
    }
    app.shutdown()?;
    res
}
