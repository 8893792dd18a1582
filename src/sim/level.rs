/// Round and wave setup: new game, player respawn, level advance.
///
/// Levels are procedural — no level files. Each wave spawns a fresh
/// centipede chain above the top edge and bumps the traversal speed.

use glam::Vec2;
use rand::Rng;

use crate::domain::entity::{EntityKind, PlayerShip, Segment};
use crate::domain::field::{CELL, FIELD_H, FIELD_W};
use crate::sim::world::{Phase, WorldState, PALETTE_COUNT};

/// Reset everything and start a fresh game at wave 1.
pub fn new_game(world: &mut WorldState, rng: &mut impl Rng) {
    world.entities = crate::domain::entity::Entities::new();
    world.field.clear();
    world.player = None;
    world.score = 0;
    world.level = 0;
    world.lives = world.rules.start_lives;
    world.remaining_parts = 0;
    world.respawn_timer = None;
    world.phase = Phase::Playing;

    let rules = world.rules.clone();
    world.field.scatter_defaults(&mut world.entities, &rules, rng);
    spawn_player(world);
    advance_level(world, rng);
}

/// Put a fresh player ship at the bottom center of its lane.
pub fn spawn_player(world: &mut WorldState) {
    let x = (FIELD_W as f32 * CELL - CELL) / 2.0;
    let y = (FIELD_H - 1) as f32 * CELL;
    let id = world
        .entities
        .spawn(EntityKind::Player(PlayerShip::new(Vec2::new(x, y))));
    world.player = Some(id);
}

/// Advance to the next wave: bump the level counter, rotate the
/// palette, and spawn a chain sized to the new level.
pub fn advance_level(world: &mut WorldState, rng: &mut impl Rng) {
    world.level += 1;
    world.palette = ((world.level - 1) as usize) % PALETTE_COUNT;

    let len = (world.rules.chain_base + world.level as usize).min(world.rules.chain_cap);
    spawn_chain(world, len, rng);
    world.remaining_parts = len;

    world.set_message(&format!("Wave {}", world.level), 2.0);
}

/// Spawn a head-to-tail chain stacked above the top edge at a random
/// column. Each new segment's parent is the previously created one, so
/// the chain enters head first with a pure vertical descent.
fn spawn_chain(world: &mut WorldState, len: usize, rng: &mut impl Rng) {
    let col = rng.gen_range(0..FIELD_W) as i32;
    let dir_x = if rng.gen_bool(0.5) { 1 } else { -1 };

    let mut parent = None;
    for i in 0..len {
        let cell = (col, -1 - i as i32);
        let id = world
            .entities
            .spawn(EntityKind::Segment(Segment::new(cell, dir_x, parent)));
        parent = Some(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn segments(world: &WorldState) -> Vec<&Segment> {
        world
            .entities
            .iter()
            .filter_map(|e| match &e.kind {
                EntityKind::Segment(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn new_game_sets_up_a_round() {
        let mut w = WorldState::new();
        let mut rng = StdRng::seed_from_u64(1);
        new_game(&mut w, &mut rng);

        assert_eq!(w.phase, Phase::Playing);
        assert_eq!(w.score, 0);
        assert_eq!(w.level, 1);
        assert_eq!(w.lives, 3);
        assert!(w.player.is_some());
        assert!(w.player_rect().is_some());

        let segs = segments(&w);
        assert_eq!(segs.len(), w.remaining_parts);
        assert_eq!(segs.len(), 8); // chain_base 7 + level 1
    }

    #[test]
    fn chain_links_head_to_tail_above_the_field() {
        let mut w = WorldState::new();
        let mut rng = StdRng::seed_from_u64(3);
        new_game(&mut w, &mut rng);

        let segs = segments(&w);
        // Head has no parent, every later segment points at the one ahead.
        assert!(segs[0].parent.is_none());
        for s in &segs[1..] {
            assert!(s.parent.is_some());
        }
        // Stacked at negative rows, one column, descending order.
        let col = segs[0].cell.0;
        for (i, s) in segs.iter().enumerate() {
            assert_eq!(s.cell.0, col);
            assert_eq!(s.cell.1, -1 - i as i32);
            assert!(s.settled());
        }
    }

    #[test]
    fn chain_length_caps_at_configured_max() {
        let mut w = WorldState::new();
        let mut rng = StdRng::seed_from_u64(5);
        new_game(&mut w, &mut rng);
        w.level = 40;
        advance_level(&mut w, &mut rng);
        // Only counting the new chain: remaining_parts reflects it.
        assert_eq!(w.remaining_parts, w.rules.chain_cap);
    }

    #[test]
    fn palette_cycles_with_level() {
        let mut w = WorldState::new();
        let mut rng = StdRng::seed_from_u64(9);
        new_game(&mut w, &mut rng);
        assert_eq!(w.palette, 0);
        for expect in [1, 2, 3, 0, 1] {
            advance_level(&mut w, &mut rng);
            assert_eq!(w.palette, expect);
        }
    }
}
