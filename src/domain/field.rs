/// The mushroom field: a fixed-size grid mapping cells to the mushroom
/// entity occupying them, if any.
///
/// A cell reference is only meaningful while the referenced mushroom is
/// live: a cell whose occupant has been flagged for removal counts as
/// accessible, and `gc()` clears such references at tick end. All
/// accessors are total — out-of-range coordinates never panic.

use rand::Rng;

use crate::config::RulesConfig;
use crate::domain::entity::{Entities, EntityId, EntityKind, Mushroom};

pub const FIELD_W: usize = 25;
pub const FIELD_H: usize = 20;
/// Cell edge length in playfield pixels (sprite size of the original).
pub const CELL: f32 = 32.0;

pub struct MushroomField {
    cells: Vec<Option<EntityId>>,
    pub width: usize,
    pub height: usize,
}

impl MushroomField {
    pub fn new() -> Self {
        MushroomField {
            cells: vec![None; FIELD_W * FIELD_H],
            width: FIELD_W,
            height: FIELD_H,
        }
    }

    fn idx(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    /// Id of the mushroom registered at (x, y), live or not.
    pub fn mushroom_at(&self, x: i32, y: i32) -> Option<EntityId> {
        if !self.in_bounds(x, y) {
            return None;
        }
        self.cells[self.idx(x as usize, y as usize)]
    }

    /// True iff (x, y) is inside the field and not occupied by a live
    /// mushroom. Out-of-bounds cells are never accessible.
    pub fn is_cell_accessible(&self, x: i32, y: i32, entities: &Entities) -> bool {
        if !self.in_bounds(x, y) {
            return false;
        }
        match self.mushroom_at(x, y) {
            None => true,
            Some(id) => !entities.is_live(id),
        }
    }

    /// Put a full-health mushroom at (x, y): a fresh entity if the cell
    /// is free (or its occupant is already flagged), otherwise the
    /// existing one restored to full health. Out-of-bounds is a no-op.
    pub fn spawn_mushroom(
        &mut self,
        x: i32,
        y: i32,
        entities: &mut Entities,
    ) -> Option<EntityId> {
        if !self.in_bounds(x, y) {
            return None;
        }
        let idx = self.idx(x as usize, y as usize);

        if let Some(id) = self.cells[idx] {
            if let Some(e) = entities.get_mut(id) {
                if !e.removed {
                    if let EntityKind::Mushroom(m) = &mut e.kind {
                        m.restore();
                        return Some(id);
                    }
                }
            }
        }

        let id = entities.spawn(EntityKind::Mushroom(Mushroom::new((
            x as usize, y as usize,
        ))));
        self.cells[idx] = Some(id);
        Some(id)
    }

    /// Scatter the round-start mushrooms: a uniform random count in the
    /// configured range, at random cells in the upper 2/3 of the field
    /// (the bottom third stays clear for the player's lane).
    pub fn scatter_defaults(
        &mut self,
        entities: &mut Entities,
        rules: &RulesConfig,
        rng: &mut impl Rng,
    ) {
        let count = rng.gen_range(rules.scatter_min..=rules.scatter_max);
        let rows = self.height * 2 / 3;
        for _ in 0..count {
            let x = rng.gen_range(0..self.width) as i32;
            let y = rng.gen_range(0..rows) as i32;
            self.spawn_mushroom(x, y, entities);
        }
    }

    /// Restore the first damaged mushroom, scanning lowest x then lowest
    /// y. Returns its cell, or None when every live mushroom is at full
    /// health. Used to regenerate the field one mushroom per tick after
    /// a player death.
    pub fn restore_next(&mut self, entities: &mut Entities) -> Option<(usize, usize)> {
        for x in 0..self.width {
            for y in 0..self.height {
                let id = match self.cells[self.idx(x, y)] {
                    Some(id) => id,
                    None => continue,
                };
                let e = match entities.get_mut(id) {
                    Some(e) if !e.removed => e,
                    _ => continue,
                };
                if let EntityKind::Mushroom(m) = &mut e.kind {
                    if m.is_damaged() {
                        m.restore();
                        return Some((x, y));
                    }
                }
            }
        }
        None
    }

    /// Any live mushroom still below full health?
    pub fn has_damaged(&self, entities: &Entities) -> bool {
        self.cells.iter().flatten().any(|&id| {
            entities.get(id).map_or(false, |e| {
                if e.removed {
                    return false;
                }
                matches!(&e.kind, EntityKind::Mushroom(m) if m.is_damaged())
            })
        })
    }

    /// Clear references to mushrooms that no longer exist or are
    /// flagged. Call after entity compaction.
    pub fn gc(&mut self, entities: &Entities) {
        for cell in &mut self.cells {
            if let Some(id) = *cell {
                if !entities.is_live(id) {
                    *cell = None;
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.cells.fill(None);
    }
}
