/// WorldState: the complete snapshot of a running game.
///
/// Single owner of the entity table, the mushroom field and the round
/// counters. Mutated only from the frame loop via `step()` and the
/// level functions — entities never reach back into shared state.

use glam::Vec2;

use crate::config::{RulesConfig, SpeedConfig};
use crate::domain::entity::{Entities, EntityId, EntityKind, PLAYER_SIZE};
use crate::domain::field::{MushroomField, CELL, FIELD_H, FIELD_W};
use crate::domain::geom::Rect;

/// Number of per-level color palettes the presentation cycles through.
pub const PALETTE_COUNT: usize = 4;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Title,
    Playing,
    GameOver,
}

pub struct WorldState {
    // ── Simulation ──
    pub entities: Entities,
    pub field: MushroomField,
    /// Id of the live player ship entity; None while dead.
    pub player: Option<EntityId>,

    // ── Round tracking ──
    pub phase: Phase,
    pub score: u32,
    pub level: u32,
    pub lives: u32,
    /// Live centipede segments left in the current wave.
    pub remaining_parts: usize,
    /// Some(secs) while the round is in the dead/respawn-wait sub-state.
    pub respawn_timer: Option<f32>,
    /// Index into the per-level palette cycle.
    pub palette: usize,

    // ── Tuning ──
    pub speed: SpeedConfig,
    pub rules: RulesConfig,

    // ── UI ──
    pub message: String,
    pub message_timer: f32,
    pub anim_tick: u32,
}

impl WorldState {
    pub fn new() -> Self {
        WorldState {
            entities: Entities::new(),
            field: MushroomField::new(),
            player: None,
            phase: Phase::Title,
            score: 0,
            level: 0,
            lives: 0,
            remaining_parts: 0,
            respawn_timer: None,
            palette: 0,
            speed: SpeedConfig::default(),
            rules: RulesConfig::default(),
            message: String::new(),
            message_timer: 0.0,
            anim_tick: 0,
        }
    }

    /// The single score accumulator: every point source goes through
    /// here, so scoring is observable in one place.
    pub fn award(&mut self, points: u32) {
        self.score += points;
    }

    /// Segment traversal speed for the current level, px/s.
    pub fn segment_speed(&self) -> f32 {
        let scale = self.level.saturating_sub(1) as f32;
        self.speed.segment_speed_base + self.speed.segment_speed_per_level * scale
    }

    /// Playfield size in pixels.
    pub fn field_px(&self) -> Vec2 {
        Vec2::new(FIELD_W as f32 * CELL, FIELD_H as f32 * CELL)
    }

    pub fn player_rect(&self) -> Option<Rect> {
        let id = self.player?;
        let e = self.entities.get(id)?;
        if e.removed {
            return None;
        }
        match &e.kind {
            EntityKind::Player(p) => Some(Rect::from_parts(p.pos, PLAYER_SIZE)),
            _ => None,
        }
    }

    /// Does `rect` overlap any live mushroom?
    pub fn overlaps_live_mushroom(&self, rect: &Rect) -> bool {
        self.entities.iter().any(|e| {
            !e.removed
                && matches!(e.kind, EntityKind::Mushroom(_))
                && e.rect().intersects(rect)
        })
    }

    pub fn set_message(&mut self, msg: &str, secs: f32) {
        self.message = msg.to_string();
        self.message_timer = secs;
    }
}
