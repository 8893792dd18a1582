/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// Each frame is composed into the `front` buffer, diffed cell-by-cell
/// against `back` (the previous frame), and only changed cells are
/// emitted. Commands are batched with `queue!` and flushed once. This
/// keeps a full-speed arcade loop flicker-free on ordinary terminals.
///
/// One playfield cell is 2 terminal columns by 1 row, so the 25×20
/// field occupies 50×20 characters. Entities carry pixel positions;
/// the composer rounds them onto the character grid (missiles at
/// half-cell horizontal resolution so shots track the ship visibly).

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::entity::{EntityKind, Heading, MUSHROOM_MAX_HEALTH};
use crate::domain::field::{CELL, FIELD_H, FIELD_W};
use crate::sim::world::{Phase, WorldState};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for every "empty" terminal cell.
    ///
    /// Using the same RGB for `Clear` and for cell backgrounds keeps
    /// the inter-row gap pixels on VTE terminals identical to the cell
    /// color, so no horizontal seams show.
    const BASE_BG: Color = Color::Rgb { r: 12, g: 12, b: 24 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Sentinel that differs from any real cell, so a buffer filled
    /// with it diffs as fully dirty.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = match bg {
            // Never leave a cell on the terminal's native default.
            Color::Reset => Self::BASE_BG,
            other => other,
        };
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        let mut cx = x;
        for ch in s.chars() {
            if cx >= self.width {
                break;
            }
            self.set(cx, y, Cell::new(ch, fg, bg));
            cx += 1;
        }
    }
}

// ── Layout ──

/// Each playfield cell spans 2 terminal columns.
const CELL_W: usize = 2;

const HUD_ROW: usize = 0;
const FIELD_ROW: usize = 2;
const FIELD_COLS: usize = FIELD_W * CELL_W;

const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const MSG_BG: Color = Color::Rgb { r: 200, g: 180, b: 50 };

/// Per-level color set, cycled by `world.palette`.
struct Palette {
    mushroom_fg: Color,
    mushroom_bg: Color,
    head_fg: Color,
    body_fg: Color,
}

const PALETTES: [Palette; 4] = [
    Palette {
        mushroom_fg: Color::Rgb { r: 220, g: 80, b: 80 },
        mushroom_bg: Color::Rgb { r: 70, g: 20, b: 20 },
        head_fg: Color::Rgb { r: 120, g: 255, b: 120 },
        body_fg: Color::Rgb { r: 60, g: 200, b: 60 },
    },
    Palette {
        mushroom_fg: Color::Rgb { r: 220, g: 180, b: 70 },
        mushroom_bg: Color::Rgb { r: 70, g: 55, b: 15 },
        head_fg: Color::Rgb { r: 130, g: 180, b: 255 },
        body_fg: Color::Rgb { r: 70, g: 110, b: 220 },
    },
    Palette {
        mushroom_fg: Color::Rgb { r: 190, g: 110, b: 230 },
        mushroom_bg: Color::Rgb { r: 55, g: 25, b: 70 },
        head_fg: Color::Rgb { r: 255, g: 180, b: 90 },
        body_fg: Color::Rgb { r: 220, g: 130, b: 40 },
    },
    Palette {
        mushroom_fg: Color::Rgb { r: 100, g: 210, b: 210 },
        mushroom_bg: Color::Rgb { r: 20, g: 60, b: 60 },
        head_fg: Color::Rgb { r: 255, g: 120, b: 180 },
        body_fg: Color::Rgb { r: 210, g: 60, b: 130 },
    },
];

// ── Renderer ──

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, world: &WorldState) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        // Full repaint on phase transitions for a clean switch.
        if self.last_phase != Some(world.phase) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(world.phase);
        }

        self.front.clear();
        match world.phase {
            Phase::Title => self.compose_title(world),
            Phase::Playing => self.compose_game(world),
            Phase::GameOver => self.compose_game_over(world),
        }

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colors up front; ResetColor would fall back to
        // the terminal default and cause seam artifacts.
        queue!(
            self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }

                let mut buf = [0u8; 4];
                queue!(self.writer, Print(&*cell.ch.encode_utf8(&mut buf)))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Game screen ──

    fn compose_game(&mut self, w: &WorldState) {
        self.compose_hud(w);

        let pal = &PALETTES[w.palette % PALETTES.len()];

        // Field background, one shade so the play area stands out.
        let field_bg = Color::Rgb { r: 18, g: 18, b: 32 };
        for row in 0..FIELD_H {
            for col in 0..FIELD_COLS {
                self.front.set(col, FIELD_ROW + row, Cell::new(' ', Color::White, field_bg));
            }
        }

        // Home-lane divider: a faint line above the player's band.
        let lane_row = FIELD_ROW + FIELD_H * 2 / 3;
        for col in 0..FIELD_COLS {
            self.front.set(
                col,
                lane_row,
                Cell::new('┄', Color::Rgb { r: 40, g: 40, b: 70 }, field_bg),
            );
        }

        // Mushrooms first (grid-aligned), then segments, ship and
        // missiles over them.
        for e in w.entities.iter() {
            if e.removed {
                continue;
            }
            if let EntityKind::Mushroom(m) = &e.kind {
                let (c0, c1) = match m.health() {
                    h if h >= MUSHROOM_MAX_HEALTH => ('▓', '▓'),
                    3 => ('▒', '▒'),
                    2 => ('░', '░'),
                    _ => ('·', '·'),
                };
                let col = m.cell.0 * CELL_W;
                let row = FIELD_ROW + m.cell.1;
                self.front.set(col, row, Cell::new(c0, pal.mushroom_fg, pal.mushroom_bg));
                self.front.set(col + 1, row, Cell::new(c1, pal.mushroom_fg, pal.mushroom_bg));
            }
        }

        for e in w.entities.iter() {
            if e.removed {
                continue;
            }
            if let EntityKind::Segment(s) = &e.kind {
                let (col, row) = px_to_char(s.pos.x, s.pos.y);
                if row < 0 {
                    continue; // still entering above the field
                }
                let row = FIELD_ROW + row as usize;
                let is_head = s.parent.is_none() || !w.entities.is_live(s.parent.unwrap_or(e.id));
                if is_head {
                    let glyph = match s.heading {
                        Heading::Right => ('▶', '▶'),
                        Heading::Left => ('◀', '◀'),
                        Heading::Up => ('▲', '▲'),
                        Heading::Down => ('▼', '▼'),
                    };
                    self.front.set(col, row, Cell::new(glyph.0, pal.head_fg, field_bg));
                    self.front.set(col + 1, row, Cell::new(glyph.1, pal.head_fg, field_bg));
                } else {
                    self.front.set(col, row, Cell::new('●', pal.body_fg, field_bg));
                    self.front.set(col + 1, row, Cell::new('●', pal.body_fg, field_bg));
                }
            }
        }

        if let Some(id) = w.player {
            if let Some(e) = w.entities.get(id) {
                if let EntityKind::Player(p) = &e.kind {
                    let (col, row) = px_to_char(p.pos.x, p.pos.y);
                    let row = FIELD_ROW + row.max(0) as usize;
                    let ship_fg = Color::Rgb { r: 255, g: 240, b: 120 };
                    self.front.set(col, row, Cell::new('◢', ship_fg, field_bg));
                    self.front.set(col + 1, row, Cell::new('◣', ship_fg, field_bg));
                }
            }
        }

        // Missiles at half-cell horizontal resolution.
        for e in w.entities.iter() {
            if e.removed {
                continue;
            }
            if let EntityKind::Missile(m) = &e.kind {
                let col = (m.pos.x / (CELL / CELL_W as f32)).round() as i32;
                let row = (m.pos.y / CELL).round() as i32;
                if row < 0 || row >= FIELD_H as i32 {
                    continue;
                }
                let col = (col.max(0) as usize).min(FIELD_COLS - 1);
                self.front.set(
                    col,
                    FIELD_ROW + row as usize,
                    Cell::new('╿', Color::Rgb { r: 255, g: 255, b: 200 }, field_bg),
                );
            }
        }

        // ── Message bar ──
        let msg_row = FIELD_ROW + FIELD_H + 1;
        if !w.message.is_empty() && msg_row < self.front.height {
            let msg = format!(" ◈ {} ", w.message);
            for x in 0..FIELD_COLS {
                self.front.set(x, msg_row, Cell::new(' ', Color::Black, MSG_BG));
            }
            self.front.put_str(0, msg_row, &msg, Color::Black, MSG_BG);
        }

        // ── Help bar ──
        let help_row = FIELD_ROW + FIELD_H + 3;
        if help_row < self.front.height {
            let help = " Arrows/WASD:Move  Space:Fire  N:Skip  Esc:Title  │  Pad: stick + A";
            self.front.put_str(0, help_row, help, Color::DarkGrey, Color::Reset);
        }
    }

    fn compose_hud(&mut self, w: &WorldState) {
        for x in 0..self.front.width.min(FIELD_COLS) {
            self.front.set(x, HUD_ROW, Cell::new(' ', Color::White, HUD_BG));
        }
        let hud = format!(
            " Wave {:<3} Score:{:<7} ♥×{}  Parts:{:<2}",
            w.level, w.score, w.lives, w.remaining_parts,
        );
        self.front.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);
    }

    // ── Static screens ──

    fn compose_title(&mut self, w: &WorldState) {
        let title = [
            "█▀▀ █▀▀ █▄ █ ▀█▀ █ ▀█▀ █▀▀ █▀█ █▄ █▄",
            "█▄▄██▄▄ █ ▀█  █  █  █  ██▄ █▀▄ █ ▀█ ",
        ];
        let cy = self.front.height / 2;
        let base = cy.saturating_sub(5);
        for (i, line) in title.iter().enumerate() {
            let cx = self.center_x(line.chars().count());
            self.front.put_str(cx, base + i, line, Color::Rgb { r: 120, g: 255, b: 120 }, Color::Reset);
        }

        let sub = "a terminal centipede";
        let cx = self.center_x(sub.len());
        self.front.put_str(cx, base + 3, sub, Color::DarkGrey, Color::Reset);

        // Blinking prompt
        if (w.anim_tick / 30) % 2 == 0 {
            let prompt = "▸▸▸ PRESS ENTER TO START ◂◂◂";
            let cx = self.center_x(prompt.len());
            self.front.put_str(cx, base + 6, prompt, Color::Rgb { r: 255, g: 220, b: 50 }, Color::Reset);
        }

        let help = "Arrows/WASD move · Space fires · Q quits";
        let cx = self.center_x(help.len());
        self.front.put_str(cx, base + 8, help, Color::DarkGrey, Color::Reset);
    }

    fn compose_game_over(&mut self, w: &WorldState) {
        // Leave the final scene under the overlay.
        self.compose_game(w);

        let cy = FIELD_ROW + FIELD_H / 2;
        let border = "╔══════════════════════════╗";
        let middle = "║        GAME  OVER        ║";
        let score = format!("║  Score {:<8} Wave {:<3} ║", w.score, w.level);
        let prompt = "║  ENTER: Title  Q: Quit   ║";
        let bottom = "╚══════════════════════════╝";
        let cx = self.center_x(border.chars().count());
        let fg = Color::Rgb { r: 255, g: 120, b: 120 };
        let bg = Color::Rgb { r: 50, g: 15, b: 15 };
        self.front.put_str(cx, cy - 2, border, fg, bg);
        self.front.put_str(cx, cy - 1, middle, fg, bg);
        self.front.put_str(cx, cy, &score, Color::White, bg);
        self.front.put_str(cx, cy + 1, prompt, Color::Rgb { r: 255, g: 220, b: 50 }, bg);
        self.front.put_str(cx, cy + 2, bottom, fg, bg);
    }

    fn center_x(&self, len: usize) -> usize {
        self.front.width.min(FIELD_COLS).saturating_sub(len) / 2
    }
}

/// Round a playfield pixel position onto the character grid.
fn px_to_char(x: f32, y: f32) -> (usize, i32) {
    let cx = ((x / CELL).round() as i32).clamp(0, FIELD_W as i32 - 1) as usize * CELL_W;
    let cy = (y / CELL).round() as i32;
    (cx, cy)
}
