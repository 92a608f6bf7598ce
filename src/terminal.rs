use std::io::{self, Write};
use std::time::Duration;

use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEventKind},
    execute, queue,
    style::{self, Color as CColor},
    terminal,
};

use crate::collab::{Command, Hud, InputSource, Renderer};
use crate::error::Result;
use crate::session::{EndReason, Phase, Snapshot};

// ── Colors ──────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    const fn lerp(a: Rgb, b: Rgb, t_256: u16) -> Rgb {
        let t = t_256 as i32;
        Rgb(
            (a.0 as i32 + (b.0 as i32 - a.0 as i32) * t / 256) as u8,
            (a.1 as i32 + (b.1 as i32 - a.1 as i32) * t / 256) as u8,
            (a.2 as i32 + (b.2 as i32 - a.2 as i32) * t / 256) as u8,
        )
    }

    const fn dim(self) -> Rgb {
        Rgb(self.0 / 2, self.1 / 2, self.2 / 2)
    }

    fn term(self) -> CColor {
        CColor::Rgb {
            r: self.0,
            g: self.1,
            b: self.2,
        }
    }
}

const SKY_TOP: Rgb = Rgb(96, 150, 230);
const SKY_BOT: Rgb = Rgb(200, 225, 255);
const GROUND: Rgb = Rgb(70, 90, 120);
const GROUND_EDGE: Rgb = Rgb(45, 60, 85);
const SHADE_L: Rgb = Rgb(11, 11, 11);
const SHADE_R: Rgb = Rgb(40, 40, 48);
const HERO: Rgb = Rgb(11, 11, 11);
const HEADBAND: Rgb = Rgb(255, 45, 75);
const EYE: Rgb = Rgb(255, 255, 255);
const WHITE: Rgb = Rgb(255, 255, 255);
const GOLD: Rgb = Rgb(245, 200, 66);
const SHADOW: Rgb = Rgb(30, 30, 30);
const METER_BG: Rgb = Rgb(20, 20, 20);
const METER_LOW: Rgb = Rgb(90, 200, 90);
const METER_HIGH: Rgb = Rgb(255, 45, 75);
const PANEL: Rgb = Rgb(230, 230, 235);

// ── Pixel buffer with half-block rendering ──────────────────────────────────

/// Two vertical pixels per terminal cell, drawn with `▀`.
pub struct PixelBuf {
    w: usize,
    h: usize,
    px: Vec<Rgb>,
}

impl PixelBuf {
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            px: vec![SKY_TOP; w * h],
        }
    }

    pub fn width(&self) -> usize {
        self.w
    }

    pub fn height(&self) -> usize {
        self.h
    }

    pub fn resize(&mut self, w: usize, h: usize) {
        self.w = w;
        self.h = h;
        self.px.resize(w * h, SKY_TOP);
    }

    pub fn set(&mut self, x: i32, y: i32, c: Rgb) {
        if x >= 0 && y >= 0 && (x as usize) < self.w && (y as usize) < self.h {
            self.px[y as usize * self.w + x as usize] = c;
        }
    }

    pub fn get(&self, x: usize, y: usize) -> Rgb {
        self.px[y * self.w + x]
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, c: Rgb) {
        for dy in 0..h {
            for dx in 0..w {
                self.set(x + dx, y + dy, c);
            }
        }
    }

    fn dim_all(&mut self) {
        for c in &mut self.px {
            *c = c.dim();
        }
    }

    /// Flush to `out`, only emitting color changes when they differ from the
    /// previous cell.
    pub fn render(&self, out: &mut impl Write) -> io::Result<()> {
        queue!(out, cursor::MoveTo(0, 0))?;
        let rows = self.h / 2;
        let mut fg: Option<Rgb> = None;
        let mut bg: Option<Rgb> = None;

        for row in 0..rows {
            for col in 0..self.w {
                let top = self.get(col, row * 2);
                let bot = self.get(col, row * 2 + 1);

                if bg != Some(bot) {
                    queue!(out, style::SetBackgroundColor(bot.term()))?;
                    bg = Some(bot);
                }
                if top == bot {
                    queue!(out, style::Print(' '))?;
                    continue;
                }
                if fg != Some(top) {
                    queue!(out, style::SetForegroundColor(top.term()))?;
                    fg = Some(top);
                }
                queue!(out, style::Print('\u{2580}'))?; // ▀
            }
            if row + 1 < rows {
                queue!(out, style::ResetColor, style::Print("\r\n"))?;
                fg = None;
                bg = None;
            }
        }
        queue!(out, style::ResetColor)
    }
}

// ── 3x5 bitmap digits ──────────────────────────────────────────────────────

#[rustfmt::skip]
const DIGITS: [[u8; 15]; 10] = [
    [1,1,1, 1,0,1, 1,0,1, 1,0,1, 1,1,1], // 0
    [0,1,0, 1,1,0, 0,1,0, 0,1,0, 1,1,1], // 1
    [1,1,1, 0,0,1, 1,1,1, 1,0,0, 1,1,1], // 2
    [1,1,1, 0,0,1, 0,1,1, 0,0,1, 1,1,1], // 3
    [1,0,1, 1,0,1, 1,1,1, 0,0,1, 0,0,1], // 4
    [1,1,1, 1,0,0, 1,1,1, 0,0,1, 1,1,1], // 5
    [1,1,1, 1,0,0, 1,1,1, 1,0,1, 1,1,1], // 6
    [1,1,1, 0,0,1, 0,1,0, 0,1,0, 0,1,0], // 7
    [1,1,1, 1,0,1, 1,1,1, 1,0,1, 1,1,1], // 8
    [1,1,1, 1,0,1, 1,1,1, 0,0,1, 1,1,1], // 9
];

fn draw_number(buf: &mut PixelBuf, cx: i32, y: i32, n: u32, fg: Rgb) {
    let s = n.to_string();
    let total_w = s.len() as i32 * 4 - 1; // 3px per digit + 1px spacing
    let start_x = cx - total_w / 2;
    for (i, ch) in s.bytes().enumerate() {
        let glyph = &DIGITS[(ch - b'0') as usize];
        let x = start_x + i as i32 * 4;
        for row in 0..5 {
            for col in 0..3 {
                if glyph[row * 3 + col] == 1 {
                    let px = x + col as i32;
                    let py = y + row as i32;
                    buf.set(px + 1, py + 1, SHADOW);
                    buf.set(px, py, fg);
                }
            }
        }
    }
}

// ── Scene ───────────────────────────────────────────────────────────────────

/// Maps field coordinates onto the pixel grid.
#[derive(Debug, Clone, Copy)]
struct Viewport {
    sx: f64,
    sy: f64,
}

impl Viewport {
    fn new(buf: &PixelBuf, snap: &Snapshot) -> Self {
        Self {
            sx: buf.width() as f64 / snap.field_width,
            sy: buf.height() as f64 / snap.field_height,
        }
    }

    fn x(&self, x: f64) -> i32 {
        (x * self.sx).round() as i32
    }

    fn y(&self, y: f64) -> i32 {
        (y * self.sy).round() as i32
    }

    fn w(&self, w: f64) -> i32 {
        ((w * self.sx).round() as i32).max(1)
    }

    fn h(&self, h: f64) -> i32 {
        (h * self.sy).round() as i32
    }
}

fn obstacle_shade(x: i32, total_w: i32) -> Rgb {
    if total_w <= 1 {
        return SHADE_L;
    }
    let t = (x as u32 * 256 / (total_w - 1) as u32).min(256) as u16;
    Rgb::lerp(SHADE_L, SHADE_R, t)
}

pub fn draw_scene(buf: &mut PixelBuf, snap: &Snapshot, hud: &Hud) {
    let vp = Viewport::new(buf, snap);
    let floor = vp.y(snap.floor_y);

    // Sky
    for y in 0..floor.max(0) {
        let t = (y as u32 * 256 / floor.max(1) as u32) as u16;
        let c = Rgb::lerp(SKY_TOP, SKY_BOT, t);
        for x in 0..buf.width() as i32 {
            buf.set(x, y, c);
        }
    }

    // Obstacles
    for o in &snap.obstacles {
        let (x, y, w, h) = (vp.x(o.rect.x), vp.y(o.rect.y), vp.w(o.rect.w), vp.h(o.rect.h));
        for dx in 0..w {
            let c = obstacle_shade(dx, w);
            for dy in 0..h {
                buf.set(x + dx, y + dy, c);
            }
        }
    }

    // Ground
    let scroll = (snap.frame as f64 * snap.speed * vp.sx) as i32;
    for y in floor..buf.height() as i32 {
        for x in 0..buf.width() as i32 {
            let edge = y == floor || (y == floor + 1 && ((x + scroll) / 4) % 2 == 0);
            buf.set(x, y, if edge { GROUND_EDGE } else { GROUND });
        }
    }

    draw_hero(buf, &vp, snap);
    draw_meter(buf, hud);
    draw_number(buf, buf.width() as i32 - 12, 2, snap.score, WHITE);

    match snap.phase {
        Phase::Idle => draw_title(buf),
        Phase::Ended(reason) => draw_game_over(buf, snap, reason),
        Phase::Running => {}
    }
}

fn draw_hero(buf: &mut PixelBuf, vp: &Viewport, snap: &Snapshot) {
    let r = snap.hero;
    let (x, y, w, h) = (vp.x(r.x), vp.y(r.y), vp.w(r.w), vp.h(r.h).max(2));
    buf.fill_rect(x, y, w, h, HERO);

    // Headband across the forehead, trailing behind when moving up.
    let band_y = y + (h / 6).max(0);
    buf.fill_rect(x - 1, band_y, w + 2, (h / 6).max(1), HEADBAND);
    let tail = if snap.hero_vy < 0.0 { 1 } else { -1 };
    buf.set(x - 2, band_y + tail, HEADBAND);
    buf.set(x - 3, band_y + 2 * tail, HEADBAND);

    let eye = (w / 5).max(1);
    buf.fill_rect(x + w * 3 / 5, band_y + (h / 6).max(1) + 1, eye, eye, EYE);
}

/// Vertical loudness meter with the threshold marked.
fn draw_meter(buf: &mut PixelBuf, hud: &Hud) {
    let (x, top, h) = (2, 2, 20);
    buf.fill_rect(x, top, 3, h, METER_BG);
    if let Some(level) = hud.loudness {
        let fill = (level.clamp(0.0, 1.0) * h as f32).round() as i32;
        let c = if level as f64 > hud.threshold {
            METER_HIGH
        } else {
            METER_LOW
        };
        buf.fill_rect(x, top + h - fill, 3, fill, c);
    }
    let mark = top + h - (hud.threshold.clamp(0.0, 1.0) * h as f64).round() as i32;
    buf.fill_rect(x - 1, mark, 5, 1, WHITE);
}

fn draw_title(buf: &mut PixelBuf) {
    let cx = buf.width() as i32 / 2;
    let cy = buf.height() as i32 / 4;
    let letters = 6;
    let (char_w, char_h) = (5, 7);
    let sx = cx - letters * char_w / 2;
    for i in 0..letters {
        let bx = sx + i * char_w;
        buf.fill_rect(bx, cy, char_w - 1, char_h, HEADBAND);
        buf.fill_rect(bx, cy, char_w - 1, 1, GOLD);
    }
}

fn draw_game_over(buf: &mut PixelBuf, snap: &Snapshot, reason: EndReason) {
    buf.dim_all();

    let cx = buf.width() as i32 / 2;
    let cy = buf.height() as i32 / 2;
    let (panel_w, panel_h) = (30, 20);
    let px = cx - panel_w / 2;
    let py = cy - panel_h / 2;
    buf.fill_rect(px - 1, py - 1, panel_w + 2, panel_h + 2, SHADOW);
    buf.fill_rect(px, py, panel_w, panel_h, PANEL);
    let band = match reason {
        EndReason::Stopped => GOLD,
        EndReason::Floor | EndReason::Collision => HEADBAND,
    };
    buf.fill_rect(px, py, panel_w, 2, band);

    draw_number(buf, cx, py + 4, snap.score, HERO);
    draw_number(buf, cx, py + 12, snap.best, GOLD);
}

fn status_line(snap: &Snapshot, hud: &Hud) -> String {
    let mic = if hud.mic_active { "on" } else { "off" };
    let phase = match snap.phase {
        Phase::Idle => "press space to start".to_string(),
        Phase::Running => "Scream louder to jump higher!".to_string(),
        Phase::Ended(EndReason::Stopped) => format!("stopped, score {}", snap.score),
        Phase::Ended(_) => format!("game over, score {} best {}", snap.score, snap.best),
    };
    format!(
        " {phase} | mic {mic} | threshold {:.2} | space jump  s start/stop  r reset  +/- threshold  m mic  q quit",
        hud.threshold
    )
}

// ── Terminal collaborators ──────────────────────────────────────────────────

/// Raw mode plus alternate screen for as long as it lives.
pub struct TerminalGuard;

impl TerminalGuard {
    pub fn enter(out: &mut impl Write) -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        execute!(
            out,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            terminal::DisableLineWrap,
        )?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let mut out = io::stdout();
        let _ = execute!(
            out,
            terminal::LeaveAlternateScreen,
            cursor::Show,
            terminal::EnableLineWrap,
        );
        let _ = terminal::disable_raw_mode();
    }
}

/// Half-block renderer. The bottom terminal row carries the status line.
pub struct TerminalRenderer<W: Write> {
    out: W,
    buf: PixelBuf,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            buf: PixelBuf::new(0, 0),
        }
    }

    fn fit(&mut self) -> io::Result<u16> {
        let (cols, rows) = terminal::size()?;
        let pw = cols as usize;
        let ph = rows.saturating_sub(1) as usize * 2;
        if pw != self.buf.width() || ph != self.buf.height() {
            self.buf.resize(pw, ph);
        }
        Ok(rows)
    }
}

impl<W: Write> Renderer for TerminalRenderer<W> {
    fn draw(&mut self, snapshot: &Snapshot, hud: &Hud) -> Result<()> {
        let rows = self.fit()?;
        if self.buf.width() == 0 || self.buf.height() == 0 {
            return Ok(());
        }
        draw_scene(&mut self.buf, snapshot, hud);
        self.buf.render(&mut self.out)?;

        let mut line = status_line(snapshot, hud);
        line.truncate(self.buf.width());
        queue!(
            self.out,
            cursor::MoveTo(0, rows.saturating_sub(1)),
            terminal::Clear(terminal::ClearType::CurrentLine),
            style::Print(line),
        )?;
        self.out.flush()?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct KeyboardInput;

impl KeyboardInput {
    fn map(code: KeyCode) -> Option<Command> {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => Some(Command::Quit),
            KeyCode::Char(' ') | KeyCode::Up | KeyCode::Enter => Some(Command::Jump),
            KeyCode::Char('s') => Some(Command::StartStop),
            KeyCode::Char('r') => Some(Command::Reset),
            KeyCode::Char('+') | KeyCode::Char('=') => Some(Command::ThresholdUp),
            KeyCode::Char('-') => Some(Command::ThresholdDown),
            KeyCode::Char('m') => Some(Command::ToggleMic),
            _ => None,
        }
    }
}

impl InputSource for KeyboardInput {
    fn poll(&mut self) -> Result<Vec<Command>> {
        let mut commands = Vec::new();
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Release {
                    continue;
                }
                commands.extend(Self::map(key.code));
            }
        }
        Ok(commands)
    }
}
