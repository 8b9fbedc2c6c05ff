use crate::model::{Bottle, Fail, GameScene, Model, Scene};
use crossterm::{
    cursor,
    event::{
        DisableMouseCapture, EnableMouseCapture, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute, queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use std::io::{self, Write};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub fg: Color,
    pub bg: Color,
    pub bold: bool,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: Color::White,
            bg: Color::Black,
            bold: false,
        }
    }
}

pub struct CellBuffer {
    pub w: u16,
    pub h: u16,
    pub cells: Vec<Cell>,
}

impl CellBuffer {
    pub fn new(w: u16, h: u16) -> Self {
        Self {
            w,
            h,
            cells: vec![Cell::default(); (w as usize) * (h as usize)],
        }
    }
    pub fn idx(&self, x: u16, y: u16) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }
    pub fn set(&mut self, x: u16, y: u16, c: Cell) {
        if x < self.w && y < self.h {
            let i = self.idx(x, y);
            self.cells[i] = c;
        }
    }
    pub fn get(&self, x: u16, y: u16) -> Option<Cell> {
        (x < self.w && y < self.h).then(|| self.cells[self.idx(x, y)])
    }
    pub fn clear(&mut self, bg: Color) {
        for c in &mut self.cells {
            *c = Cell {
                bg,
                ..Cell::default()
            };
        }
    }

    /// The characters of row `y`, for inspection.
    pub fn row_text(&self, y: u16) -> String {
        (0..self.w)
            .filter_map(|x| self.get(x, y))
            .map(|c| c.ch)
            .collect()
    }
}

/* -----------------------------
   Terminal
------------------------------ */

pub struct Terminal {
    out: io::Stdout,
    pub cols: u16,
    pub rows: u16,
    prev: CellBuffer,
    pub cur: CellBuffer,
    key_releases: bool,
}

impl Terminal {
    /// Enters the alternate screen with mouse capture. Asks for key release
    /// events when the terminal supports them.
    /// Enters the alternate screen, then raw mode last. If anything after
    /// raw mode fails, the terminal is put back before the error returns.
    pub fn begin() -> anyhow::Result<Self> {
        let mut out = io::stdout();
        execute!(
            out,
            EnterAlternateScreen,
            cursor::Hide,
            DisableLineWrap,
            EnableMouseCapture,
            terminal::Clear(ClearType::All)
        )?;
        if let Err(e) = terminal::enable_raw_mode() {
            let _ = execute!(out, DisableMouseCapture, cursor::Show, EnableLineWrap, LeaveAlternateScreen);
            return Err(e.into());
        }

        let setup = (|| -> anyhow::Result<(bool, u16, u16)> {
            let key_releases = terminal::supports_keyboard_enhancement().unwrap_or(false);
            if key_releases {
                execute!(
                    io::stdout(),
                    PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
                )?;
            }
            let (cols, rows) = terminal::size()?;
            Ok((key_releases, cols, rows))
        })();
        let (key_releases, cols, rows) = undo_on_err(setup, || {
            let _ = terminal::disable_raw_mode();
            let _ = execute!(
                io::stdout(),
                DisableMouseCapture,
                cursor::Show,
                EnableLineWrap,
                LeaveAlternateScreen
            );
        })?;

        Ok(Self {
            out,
            cols,
            rows,
            prev: CellBuffer::new(cols, rows),
            cur: CellBuffer::new(cols, rows),
            key_releases,
        })
    }

    pub fn reports_key_releases(&self) -> bool {
        self.key_releases
    }

    pub fn end(&mut self) -> anyhow::Result<()> {
        if self.key_releases {
            queue!(self.out, PopKeyboardEnhancementFlags)?;
        }
        queue!(
            self.out,
            BeginSynchronizedUpdate,
            ResetColor,
            Clear(ClearType::All),
            DisableMouseCapture,
            cursor::Show,
            EnableLineWrap,
            EndSynchronizedUpdate,
            LeaveAlternateScreen
        )?;
        self.out.flush()?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    pub fn resize_if_needed(&mut self) -> anyhow::Result<bool> {
        let (c, r) = terminal::size()?;
        if c == self.cols && r == self.rows {
            return Ok(false);
        }
        self.cols = c;
        self.rows = r;
        self.prev = CellBuffer::new(c, r);
        self.cur = CellBuffer::new(c, r);
        queue!(self.out, Clear(ClearType::All))?;
        Ok(true)
    }

    pub fn present(&mut self, diff_only: bool) -> anyhow::Result<()> {
        queue!(self.out, BeginSynchronizedUpdate)?;

        let mut last_fg = None;
        let mut last_bg = None;
        let mut last_bold = false;

        for y in 0..self.rows {
            for x in 0..self.cols {
                let i = self.cur.idx(x, y);
                let c = self.cur.cells[i];
                if diff_only && c == self.prev.cells[i] {
                    continue;
                }

                queue!(self.out, cursor::MoveTo(x, y))?;

                if c.bold != last_bold {
                    let attr = if c.bold {
                        Attribute::Bold
                    } else {
                        Attribute::NormalIntensity
                    };
                    queue!(self.out, SetAttribute(attr))?;
                    last_bold = c.bold;
                }
                if last_fg != Some(c.fg) {
                    queue!(self.out, SetForegroundColor(c.fg))?;
                    last_fg = Some(c.fg);
                }
                if last_bg != Some(c.bg) {
                    queue!(self.out, SetBackgroundColor(c.bg))?;
                    last_bg = Some(c.bg);
                }

                queue!(self.out, Print(c.ch))?;
            }
        }

        queue!(
            self.out,
            SetAttribute(Attribute::Reset),
            ResetColor,
            EndSynchronizedUpdate
        )?;
        self.out.flush()?;
        self.prev.cells.copy_from_slice(&self.cur.cells);
        Ok(())
    }
}

/* -----------------------------
   Palette
------------------------------ */

#[derive(Clone, Copy, Debug)]
pub struct Palette {
    pub bg: Color,
    pub text: Color,
    pub dim: Color,
    pub glass: Color,
    pub water: Color,
    pub band: Color,
    pub alert: Color,
}

impl Palette {
    pub fn new(color: bool) -> Self {
        if !color {
            return Self {
                bg: Color::Black,
                text: Color::White,
                dim: Color::Grey,
                glass: Color::White,
                water: Color::White,
                band: Color::DarkGrey,
                alert: Color::White,
            };
        }
        Self {
            bg: Color::Rgb { r: 8, g: 10, b: 16 },
            text: Color::Rgb { r: 220, g: 230, b: 240 },
            dim: Color::Rgb { r: 110, g: 120, b: 135 },
            glass: Color::Rgb { r: 170, g: 190, b: 210 },
            water: Color::Rgb { r: 70, g: 160, b: 255 },
            band: Color::Rgb { r: 20, g: 70, b: 45 },
            alert: Color::Rgb { r: 255, g: 90, b: 80 },
        }
    }
}

/* -----------------------------
   Scene painting
------------------------------ */

pub fn draw_text(buf: &mut CellBuffer, x: u16, y: u16, s: &str, fg: Color, bg: Color) {
    for (i, ch) in s.chars().enumerate() {
        let xx = x.saturating_add(i as u16);
        if xx >= buf.w {
            break;
        }
        buf.set(
            xx,
            y,
            Cell {
                ch,
                fg,
                bg,
                bold: false,
            },
        );
    }
}

fn draw_text_centered(buf: &mut CellBuffer, cx: u16, y: u16, s: &str, fg: Color, bg: Color) {
    let half = (s.chars().count() / 2) as u16;
    draw_text(buf, cx.saturating_sub(half), y, s, fg, bg);
}

pub fn draw_model(buf: &mut CellBuffer, model: &Model, palette: &Palette) {
    buf.clear(palette.bg);
    match &model.scene {
        Scene::Loading => draw_text(buf, 1, 0, "Loading...", palette.text, palette.bg),
        Scene::About => draw_about(buf, palette),
        Scene::Game(game) => draw_game(buf, model, game, palette),
    }
}

fn draw_about(buf: &mut CellBuffer, p: &Palette) {
    let cx = buf.w / 2;
    let top = (buf.h / 2).saturating_sub(4);
    let title = Cell {
        ch: ' ',
        fg: p.water,
        bg: p.bg,
        bold: true,
    };
    for (i, ch) in "Fill Line".chars().enumerate() {
        buf.set(cx.saturating_sub(4) + i as u16, top, Cell { ch, ..title });
    }
    draw_text_centered(
        buf,
        cx,
        top + 2,
        "Fill cups up to their fill lines in rapid succession.",
        p.text,
        p.bg,
    );
    draw_text_centered(
        buf,
        cx,
        top + 4,
        "Fill Line is written by Chris Andrejewski. This game is open source.",
        p.dim,
        p.bg,
    );
    draw_text_centered(buf, cx, top + 7, "<- Back to game (Esc)", p.glass, p.bg);
}

fn draw_game(buf: &mut CellBuffer, model: &Model, game: &GameScene, p: &Palette) {
    draw_hud(buf, model, game, p);

    let bottle_w: u16 = 10;
    let bottle_h: u16 = buf.h.saturating_sub(7).clamp(6, 22);
    let top: u16 = 4;
    let cx = buf.w / 2;
    let spacing = bottle_w + 6;

    let slot = |cx| Slot {
        cx,
        top,
        w: bottle_w,
        h: bottle_h,
    };

    if let Some(prev) = &game.previous_bottle {
        if cx >= spacing + bottle_w {
            draw_bottle(buf, slot(cx - spacing), prev, p.dim, p);
        }
    }
    draw_bottle(buf, slot(cx), &game.current_bottle, p.glass, p);
    if cx + spacing + bottle_w / 2 < buf.w {
        draw_bottle(buf, slot(cx + spacing), &game.next_bottle, p.dim, p);
    }

    if game.is_pouring() {
        for y in 2..top {
            buf.set(
                cx,
                y,
                Cell {
                    ch: '┃',
                    fg: p.water,
                    bg: p.bg,
                    bold: false,
                },
            );
        }
    }

    if let Some(fail) = game.fail {
        let label = match fail {
            Fail::Overflow => "OVERFLOW!",
            Fail::Underflow => "UNDERFLOW!",
        };
        draw_text_centered(buf, cx, 2, label, p.alert, p.bg);
    }

    let hint = if model.touch {
        "tap ENTER or click to start/stop pouring"
    } else {
        "hold SPACE or the mouse button to pour"
    };
    let footer = if game.score == 0 {
        format!("{hint} · ? about · q quit")
    } else {
        format!("{hint} · q quit")
    };
    draw_text_centered(buf, cx, buf.h.saturating_sub(1), &footer, p.dim, p.bg);
}

fn draw_hud(buf: &mut CellBuffer, model: &Model, game: &GameScene, p: &Palette) {
    if let Some(prev) = &model.previous_game {
        draw_text(buf, 2, 0, &format!("last {}", prev.score), p.dim, p.bg);
    }
    if model.previous_game.is_some() || model.high_score.unwrap_or(0) > 0 {
        draw_text_centered(buf, buf.w / 2, 0, &game.score.to_string(), p.text, p.bg);
    }
    if let Some(high) = model.high_score.filter(|h| *h > 0) {
        let s = format!("best {high}");
        let x = buf.w.saturating_sub(s.chars().count() as u16 + 2);
        draw_text(buf, x, 0, &s, p.dim, p.bg);
    }
}

const EIGHTHS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Where a bottle goes: centred on `cx`, rim on row `top`. `h` counts the
/// interior rows plus the base.
#[derive(Clone, Copy)]
struct Slot {
    cx: u16,
    top: u16,
    w: u16,
    h: u16,
}

fn draw_bottle(buf: &mut CellBuffer, slot: Slot, bottle: &Bottle, glass: Color, p: &Palette) {
    let Slot { cx, top, w, h } = slot;
    let x0 = cx.saturating_sub(w / 2);
    let x1 = x0 + w - 1;
    let inner = h - 1;
    let base = top + inner;
    let level = bottle.height.clamp(0.0, 1.0);

    let glass_cell = |ch| Cell {
        ch,
        fg: glass,
        bg: p.bg,
        bold: false,
    };

    for r in 0..inner {
        let y = base - 1 - r;
        let lo = r as f64 / inner as f64;
        let hi = (r + 1) as f64 / inner as f64;
        let mid = (lo + hi) / 2.0;
        let bg = if mid >= bottle.fill_min && mid <= bottle.fill_max {
            p.band
        } else {
            p.bg
        };

        let ch = if level >= hi {
            '█'
        } else if level > lo {
            let eighths = (((level - lo) * inner as f64) * 8.0).round() as usize;
            if eighths == 0 {
                ' '
            } else {
                EIGHTHS[eighths.min(8) - 1]
            }
        } else {
            ' '
        };

        buf.set(x0, y, glass_cell('│'));
        buf.set(x1, y, glass_cell('│'));
        for x in x0 + 1..x1 {
            buf.set(
                x,
                y,
                Cell {
                    ch,
                    fg: p.water,
                    bg,
                    bold: false,
                },
            );
        }
    }

    buf.set(x0, base, glass_cell('└'));
    buf.set(x1, base, glass_cell('┘'));
    for x in x0 + 1..x1 {
        buf.set(x, base, glass_cell('─'));
    }
}

/// Runs `undo` when `res` is an error, then passes `res` through.
fn undo_on_err<T>(res: anyhow::Result<T>, undo: impl FnOnce()) -> anyhow::Result<T> {
    if res.is_err() {
        undo();
    }
    res
}
