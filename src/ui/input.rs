/// Keyboard state tracker.
///
/// The ship needs continuous movement while arrows are held and the
/// trigger works both held (autofire via the reload timer) and tapped.
/// Terminals only deliver Press/Repeat reliably; Release events exist
/// only behind the keyboard-enhancement protocol. So each key carries a
/// last-seen timestamp and expires after a short window unless the
/// terminal confirmed Release support.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind};

/// Without a Press/Repeat inside this window the key counts as
/// released. Fallback for terminals without Release events.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

pub struct InputState {
    /// Last Press/Repeat timestamp per key.
    last_active: HashMap<KeyCode, Instant>,
    /// Keys that went from up to down during the latest drain.
    fresh: Vec<KeyCode>,
    /// Raw events from the latest drain, for modifier checks.
    pub raw_events: Vec<KeyEvent>,
    /// True once the terminal has confirmed Release reporting.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Drain every pending terminal event. Once per frame, before the
    /// simulation tick.
    pub fn drain_events(&mut self) {
        self.fresh.clear();
        self.raw_events.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.raw_events.push(key);
                match key.kind {
                    KeyEventKind::Release if self.honor_release => {
                        self.last_active.remove(&key.code);
                    }
                    KeyEventKind::Release => {
                        // Unconfirmed terminals emit bogus Releases;
                        // the timeout handles expiry instead.
                    }
                    _ => {
                        let was_down = self.down(key.code);
                        self.last_active.insert(key.code, Instant::now());
                        if !was_down {
                            self.fresh.push(key.code);
                        }
                    }
                }
            }
        }

        let now = Instant::now();
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    /// Level trigger: key currently held. Drives movement and autofire.
    pub fn is_held(&self, code: KeyCode) -> bool {
        self.down(code)
    }

    pub fn any_held(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.is_held(*c))
    }

    /// Edge trigger: key went down during this frame's drain.
    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh.contains(&code)
    }

    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        use crossterm::event::KeyModifiers;
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && matches!(k.code, KeyCode::Char('c') | KeyCode::Char('C'))
        })
    }

    fn down(&self, code: KeyCode) -> bool {
        self.last_active
            .get(&code)
            .map(|t| t.elapsed() < HOLD_TIMEOUT)
            .unwrap_or(false)
    }
}
