/// The entity table: every simulated object (mushroom, player ship,
/// missile, centipede segment) lives in one ordered collection.
///
/// Identity is a stable `EntityId` (monotonic, never reused), so a
/// segment's "parent" link survives reordering and removal. Removal is
/// two-phase: flag `removed` during the tick, physically drop flagged
/// entries in one `compact()` pass at tick end. Within a tick a flagged
/// entity still occupies its slot but is ignored by liveness queries.

use glam::Vec2;

use crate::domain::field::CELL;
use crate::domain::geom::Rect;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct EntityId(pub u32);

#[derive(Clone, Debug)]
pub struct Entity {
    pub id: EntityId,
    pub removed: bool,
    pub kind: EntityKind,
}

#[derive(Clone, Debug)]
pub enum EntityKind {
    Mushroom(Mushroom),
    Player(PlayerShip),
    Missile(Missile),
    Segment(Segment),
}

impl Entity {
    /// Bounding box in playfield pixels.
    pub fn rect(&self) -> Rect {
        match &self.kind {
            EntityKind::Mushroom(m) => m.rect(),
            EntityKind::Player(p) => p.rect(),
            EntityKind::Missile(m) => m.rect(),
            EntityKind::Segment(s) => s.rect(),
        }
    }
}

// ── Entity collection ──

pub struct Entities {
    items: Vec<Entity>,
    next_id: u32,
}

impl Entities {
    pub fn new() -> Self {
        Entities { items: Vec::new(), next_id: 0 }
    }

    pub fn spawn(&mut self, kind: EntityKind) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        self.items.push(Entity { id, removed: false, kind });
        id
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.items.iter().find(|e| e.id == id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.items.iter_mut().find(|e| e.id == id)
    }

    /// Present and not flagged for removal.
    pub fn is_live(&self, id: EntityId) -> bool {
        self.get(id).map_or(false, |e| !e.removed)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn at(&self, idx: usize) -> &Entity {
        &self.items[idx]
    }

    pub fn at_mut(&mut self, idx: usize) -> &mut Entity {
        &mut self.items[idx]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.items.iter()
    }

    /// Drop flagged entries, preserving the order of survivors.
    /// Returns how many were dropped.
    pub fn compact(&mut self) -> usize {
        let before = self.items.len();
        self.items.retain(|e| !e.removed);
        before - self.items.len()
    }
}

// ── Mushroom ──

pub const MUSHROOM_MAX_HEALTH: u8 = 4;

/// Destructible grid-aligned obstacle with 4 health tiers.
/// Health only changes through `set_health`, the single point that
/// signals removal (return value) to the caller.
#[derive(Clone, Debug)]
pub struct Mushroom {
    pub cell: (usize, usize),
    health: u8,
}

impl Mushroom {
    pub fn new(cell: (usize, usize)) -> Self {
        Mushroom { cell, health: MUSHROOM_MAX_HEALTH }
    }

    pub fn health(&self) -> u8 {
        self.health
    }

    /// Returns true when the new health is 0, i.e. the mushroom is done.
    fn set_health(&mut self, health: u8) -> bool {
        self.health = health.min(MUSHROOM_MAX_HEALTH);
        self.health == 0
    }

    /// One projectile hit. Returns true when this hit destroyed it.
    pub fn hit(&mut self) -> bool {
        let h = self.health.saturating_sub(1);
        self.set_health(h)
    }

    pub fn restore(&mut self) {
        self.set_health(MUSHROOM_MAX_HEALTH);
    }

    /// Nibbled but still standing: restorable between rounds.
    pub fn is_damaged(&self) -> bool {
        self.health >= 1 && self.health < MUSHROOM_MAX_HEALTH
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.cell.0 as f32 * CELL, self.cell.1 as f32 * CELL, CELL, CELL)
    }
}

// ── Player ship ──

pub const PLAYER_SIZE: Vec2 = Vec2::new(CELL, CELL);

#[derive(Clone, Debug)]
pub struct PlayerShip {
    pub pos: Vec2,
    /// Seconds until the next shot is allowed.
    pub reload: f32,
}

impl PlayerShip {
    pub fn new(pos: Vec2) -> Self {
        PlayerShip { pos, reload: 0.0 }
    }

    pub fn rect(&self) -> Rect {
        Rect::from_parts(self.pos, PLAYER_SIZE)
    }
}

// ── Missile ──

pub const MISSILE_SIZE: Vec2 = Vec2::new(4.0, 12.0);

#[derive(Clone, Debug)]
pub struct Missile {
    pub pos: Vec2,
}

impl Missile {
    pub fn new(pos: Vec2) -> Self {
        Missile { pos }
    }

    pub fn rect(&self) -> Rect {
        Rect::from_parts(self.pos, MISSILE_SIZE)
    }
}

// ── Centipede segment ──

/// Four fixed head orientations, set from the direction of travel.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Heading {
    Up,
    Down,
    Left,
    Right,
}

/// One unit of a centipede chain.
///
/// `cell` is the logical grid position (rows may be negative while the
/// segment is still entering above the field). `pos` is the visual pixel
/// position; the segment is *settled* when the two coincide and
/// *in transit* otherwise. `parent` is a weak link to the segment one
/// step ahead in the chain — a segment renders as a body while its
/// parent is live, and promotes itself to a head permanently once the
/// parent is gone.
#[derive(Clone, Debug)]
pub struct Segment {
    pub cell: (i32, i32),
    pub dir_x: i32,
    pub dir_y: i32,
    pub pos: Vec2,
    pub parent: Option<EntityId>,
    pub heading: Heading,
}

impl Segment {
    pub fn new(cell: (i32, i32), dir_x: i32, parent: Option<EntityId>) -> Self {
        let pos = Vec2::new(cell.0 as f32 * CELL, cell.1 as f32 * CELL);
        Segment { cell, dir_x, dir_y: 1, pos, parent, heading: Heading::Down }
    }

    /// Pixel position of the logical cell.
    pub fn target_px(&self) -> Vec2 {
        Vec2::new(self.cell.0 as f32 * CELL, self.cell.1 as f32 * CELL)
    }

    pub fn settled(&self) -> bool {
        self.pos == self.target_px()
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.pos.x, self.pos.y, CELL, CELL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mushroom_health_ladder() {
        let mut m = Mushroom::new((3, 3));
        assert_eq!(m.health(), 4);
        assert!(!m.is_damaged());

        assert!(!m.hit()); // 4 → 3
        assert!(m.is_damaged());
        assert!(!m.hit()); // 3 → 2
        assert!(!m.hit()); // 2 → 1
        assert!(m.hit());  // 1 → 0: destroyed exactly now
        assert_eq!(m.health(), 0);

        // Never goes below zero
        assert!(m.hit());
        assert_eq!(m.health(), 0);
    }

    #[test]
    fn mushroom_restore_resets_to_full() {
        let mut m = Mushroom::new((0, 0));
        m.hit();
        m.hit();
        assert_eq!(m.health(), 2);
        m.restore();
        assert_eq!(m.health(), 4);
        assert!(!m.is_damaged());
    }

    #[test]
    fn entity_ids_are_stable_across_compaction() {
        let mut es = Entities::new();
        let a = es.spawn(EntityKind::Mushroom(Mushroom::new((0, 0))));
        let b = es.spawn(EntityKind::Mushroom(Mushroom::new((1, 0))));
        let c = es.spawn(EntityKind::Mushroom(Mushroom::new((2, 0))));
        assert_ne!(a, b);

        es.get_mut(b).unwrap().removed = true;
        assert!(!es.is_live(b)); // flagged counts as gone
        assert!(es.is_live(a));

        assert_eq!(es.compact(), 1);
        assert_eq!(es.len(), 2);
        assert!(es.get(b).is_none());
        assert_eq!(es.at(0).id, a);
        assert_eq!(es.at(1).id, c); // survivor order preserved

        // New spawns never reuse a dropped id
        let d = es.spawn(EntityKind::Missile(Missile::new(Vec2::ZERO)));
        assert_ne!(d, b);
    }

    #[test]
    fn segment_settles_on_its_cell() {
        let s = Segment::new((4, 2), 1, None);
        assert!(s.settled());
        assert_eq!(s.target_px(), Vec2::new(128.0, 64.0));
    }
}
