/// The step function: advances the world by one tick of `dt` seconds.
///
/// Processing order:
///   1. Player movement / firing
///   2. Missile travel + collision resolution
///   3. Segment promotion, transit motion, grid advancement
///   4. Player/segment contact
///   5. Compaction (drop flagged entities, gc the field)
///   6. Round logic (respawn wait, regeneration, wave advance)
///
/// Entities update in collection order. Removal only flags during the
/// pass; the collection is compacted once per tick, so a removal never
/// changes which entities are visited in the same tick.

use glam::Vec2;
use rand::Rng;

use crate::domain::entity::{
    EntityId, EntityKind, Heading, Missile, MISSILE_SIZE, PLAYER_SIZE,
};
use crate::domain::field::{CELL, FIELD_H};
use crate::domain::geom::Rect;
use super::event::GameEvent;
use super::level;
use super::world::{Phase, WorldState};

/// Per-frame input snapshot. Directions and fire are level-triggered
/// (held keys), skip is edge-triggered.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameInput {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub fire: bool,
    pub skip_level: bool,
}

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(
    world: &mut WorldState,
    input: FrameInput,
    dt: f32,
    rng: &mut impl Rng,
) -> Vec<GameEvent> {
    if world.phase != Phase::Playing {
        return vec![];
    }

    let mut events: Vec<GameEvent> = Vec::new();

    if world.message_timer > 0.0 {
        world.message_timer -= dt;
        if world.message_timer <= 0.0 {
            world.message.clear();
            world.message_timer = 0.0;
        }
    }

    resolve_player(world, &input, dt, &mut events);
    resolve_missiles(world, dt, &mut events);
    resolve_segments(world, dt);
    resolve_contact(world, &mut events);

    world.entities.compact();
    world.field.gc(&world.entities);

    resolve_round(world, input.skip_level, dt, rng, &mut events);

    events
}

// ══════════════════════════════════════════════════════════════
// Player
// ══════════════════════════════════════════════════════════════

fn resolve_player(
    world: &mut WorldState,
    input: &FrameInput,
    dt: f32,
    events: &mut Vec<GameEvent>,
) {
    if world.respawn_timer.is_some() {
        return;
    }
    let id = match world.player {
        Some(id) => id,
        None => return,
    };
    let (mut pos, mut reload) = match world.entities.get(id) {
        Some(e) if !e.removed => match &e.kind {
            EntityKind::Player(p) => (p.pos, p.reload),
            _ => return,
        },
        _ => return,
    };

    // Movement vector from the four direction inputs, normalized so
    // diagonal speed equals axial speed, then scaled by speed × dt.
    let mut mv = Vec2::ZERO;
    if input.up {
        mv.y -= 1.0;
    }
    if input.down {
        mv.y += 1.0;
    }
    if input.left {
        mv.x -= 1.0;
    }
    if input.right {
        mv.x += 1.0;
    }
    let mv = mv.normalize_or_zero() * world.speed.player_speed * dt;

    // Axes resolve independently so the ship slides along mushroom
    // edges instead of sticking.
    pos.x += mv.x;
    if world.overlaps_live_mushroom(&Rect::from_parts(pos, PLAYER_SIZE)) {
        pos.x -= mv.x;
    }
    pos.y += mv.y;
    if world.overlaps_live_mushroom(&Rect::from_parts(pos, PLAYER_SIZE)) {
        pos.y -= mv.y;
    }

    // Clamp to the screen horizontally and to the home lane vertically
    // (the bottom third of the playfield).
    let field_px = world.field_px();
    let lane_top = FIELD_H as f32 * 2.0 / 3.0 * CELL;
    pos.x = pos.x.clamp(0.0, field_px.x - PLAYER_SIZE.x);
    pos.y = pos.y.clamp(lane_top, field_px.y - PLAYER_SIZE.y);

    reload -= dt;
    let mut fired = false;
    if input.fire && reload <= 0.0 {
        reload = world.speed.reload_time;
        fired = true;
    }

    if let Some(e) = world.entities.get_mut(id) {
        if let EntityKind::Player(p) = &mut e.kind {
            p.pos = pos;
            p.reload = reload;
        }
    }

    if fired {
        let muzzle = Vec2::new(
            pos.x + (PLAYER_SIZE.x - MISSILE_SIZE.x) / 2.0,
            pos.y - MISSILE_SIZE.y,
        );
        world.entities.spawn(EntityKind::Missile(Missile::new(muzzle)));
        events.push(GameEvent::Shoot);
    }
}

// ══════════════════════════════════════════════════════════════
// Missiles
// ══════════════════════════════════════════════════════════════

fn resolve_missiles(world: &mut WorldState, dt: f32, events: &mut Vec<GameEvent>) {
    let speed = world.speed.missile_speed;
    let mut hits: Vec<(EntityId, EntityId)> = Vec::new();
    let mut gone: Vec<EntityId> = Vec::new();

    for i in 0..world.entities.len() {
        let (id, mut pos) = {
            let e = world.entities.at(i);
            match &e.kind {
                EntityKind::Missile(m) if !e.removed => (e.id, m.pos),
                _ => continue,
            }
        };

        pos.y -= speed * dt;
        if let EntityKind::Missile(m) = &mut world.entities.at_mut(i).kind {
            m.pos = pos;
        }

        // Past the top boundary: remove with no effect.
        if pos.y + MISSILE_SIZE.y < 0.0 {
            gone.push(id);
            continue;
        }

        // First live mushroom or segment in list order wins; simultaneous
        // overlaps resolve by list position, not by distance.
        let mrect = Rect::from_parts(pos, MISSILE_SIZE);
        let target = world
            .entities
            .iter()
            .find(|e| {
                !e.removed
                    && matches!(e.kind, EntityKind::Mushroom(_) | EntityKind::Segment(_))
                    && e.rect().intersects(&mrect)
            })
            .map(|e| e.id);
        if let Some(t) = target {
            hits.push((id, t));
        }
    }

    for id in gone {
        if let Some(e) = world.entities.get_mut(id) {
            e.removed = true;
        }
    }

    for (missile, target) in hits {
        apply_hit(world, target, events);
        if let Some(e) = world.entities.get_mut(missile) {
            e.removed = true;
        }
    }
}

/// Resolve one missile strike against a mushroom or segment.
/// A target already flagged this tick absorbs the missile with no
/// further effect (removal is idempotent).
fn apply_hit(world: &mut WorldState, target: EntityId, events: &mut Vec<GameEvent>) {
    enum Struck {
        Mushroom { cell: (usize, usize) },
        Segment { cell: (i32, i32), parent: Option<EntityId> },
    }

    let struck = match world.entities.get(target) {
        Some(e) if !e.removed => match &e.kind {
            EntityKind::Mushroom(m) => Struck::Mushroom { cell: m.cell },
            EntityKind::Segment(s) => Struck::Segment { cell: s.cell, parent: s.parent },
            _ => return,
        },
        _ => return,
    };

    match struck {
        Struck::Mushroom { cell } => {
            let mut destroyed = false;
            if let Some(e) = world.entities.get_mut(target) {
                if let EntityKind::Mushroom(m) = &mut e.kind {
                    destroyed = m.hit();
                    if destroyed {
                        e.removed = true;
                    }
                }
            }
            events.push(GameEvent::MushroomHit { x: cell.0, y: cell.1 });
            if destroyed {
                world.award(1);
                events.push(GameEvent::MushroomDestroyed { x: cell.0, y: cell.1 });
            }
        }
        Struck::Segment { cell, parent } => {
            let head = parent.map_or(true, |p| !world.entities.is_live(p));
            if let Some(e) = world.entities.get_mut(target) {
                e.removed = true;
            }
            world.remaining_parts = world.remaining_parts.saturating_sub(1);
            world.award(if head { 100 } else { 10 });
            // The segment's cell grows a fresh mushroom (no-op above the
            // top edge).
            world.field.spawn_mushroom(cell.0, cell.1, &mut world.entities);
            events.push(GameEvent::SegmentKilled { head, x: cell.0, y: cell.1 });
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Segments — promotion, transit, grid advancement
// ══════════════════════════════════════════════════════════════

/// Clamp one axis of transit travel so the segment never overshoots
/// its logical cell.
fn step_axis(cur: f32, target: f32, budget: f32) -> f32 {
    let d = target - cur;
    if d.abs() <= budget {
        target
    } else {
        cur + budget * d.signum()
    }
}

fn resolve_segments(world: &mut WorldState, dt: f32) {
    // ── Phase 1: head promotion ──
    // A segment whose parent is gone becomes a head permanently; the
    // cleared link makes repeated ticks a no-op.
    let mut promote: Vec<EntityId> = Vec::new();
    for e in world.entities.iter() {
        if e.removed {
            continue;
        }
        if let EntityKind::Segment(s) = &e.kind {
            if let Some(p) = s.parent {
                if !world.entities.is_live(p) {
                    promote.push(e.id);
                }
            }
        }
    }
    for id in promote {
        if let Some(e) = world.entities.get_mut(id) {
            if let EntityKind::Segment(s) = &mut e.kind {
                s.parent = None;
            }
        }
    }

    // ── Phase 2: transit motion + advance intents ──
    struct Advance {
        id: EntityId,
        next: (i32, i32),
        dir_x: i32,
        dir_y: i32,
    }
    let budget = world.segment_speed() * dt;
    let mut intents: Vec<Advance> = Vec::new();

    for i in 0..world.entities.len() {
        let seg = {
            let e = world.entities.at(i);
            match &e.kind {
                EntityKind::Segment(s) if !e.removed => s.clone(),
                _ => continue,
            }
        };
        let id = world.entities.at(i).id;

        if !seg.settled() {
            // Move the visual toward the logical cell, per axis,
            // clamped so as never to overshoot.
            let target = seg.target_px();
            let heading = if target.x > seg.pos.x {
                Heading::Right
            } else if target.x < seg.pos.x {
                Heading::Left
            } else if target.y > seg.pos.y {
                Heading::Down
            } else {
                Heading::Up
            };
            let pos = Vec2::new(
                step_axis(seg.pos.x, target.x, budget),
                step_axis(seg.pos.y, target.y, budget),
            );
            if let EntityKind::Segment(s) = &mut world.entities.at_mut(i).kind {
                s.pos = pos;
                s.heading = heading;
            }
            continue;
        }

        // Settled: pick the next logical cell.
        let (x, y) = seg.cell;

        // Entry from above the field is a pure vertical descent.
        if y < 0 {
            intents.push(Advance { id, next: (x, y + 1), dir_x: seg.dir_x, dir_y: seg.dir_y });
            continue;
        }

        let cand = (x + seg.dir_x, y);
        let blocked = !world.field.is_cell_accessible(cand.0, cand.1, &world.entities);
        if blocked {
            // Reverse vertical direction only at the traversal
            // boundaries, then drop a row and flip horizontal.
            let at_boundary = (seg.dir_y > 0 && y >= FIELD_H as i32 - 1)
                || (seg.dir_y < 0 && y <= 0);
            let dir_y = if at_boundary { -seg.dir_y } else { seg.dir_y };
            intents.push(Advance { id, next: (x, y + dir_y), dir_x: -seg.dir_x, dir_y });
        } else {
            intents.push(Advance { id, next: cand, dir_x: seg.dir_x, dir_y: seg.dir_y });
        }
    }

    // ── Phase 3: commit, holding where a same-direction segment
    //    already occupies the destination cell ──
    for intent in intents {
        let occupied = world.entities.iter().any(|e| {
            if e.id == intent.id || e.removed {
                return false;
            }
            match &e.kind {
                EntityKind::Segment(o) => {
                    o.cell == intent.next
                        && o.dir_x == intent.dir_x
                        && o.dir_y == intent.dir_y
                }
                _ => false,
            }
        });
        if occupied {
            continue; // hold position for this tick
        }
        if let Some(e) = world.entities.get_mut(intent.id) {
            if let EntityKind::Segment(s) = &mut e.kind {
                s.cell = intent.next;
                s.dir_x = intent.dir_x;
                s.dir_y = intent.dir_y;
            }
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Player / segment contact
// ══════════════════════════════════════════════════════════════

fn resolve_contact(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    if world.respawn_timer.is_some() {
        return;
    }
    let prect = match world.player_rect() {
        Some(r) => r,
        None => return,
    };

    let hit = world.entities.iter().any(|e| {
        !e.removed
            && matches!(e.kind, EntityKind::Segment(_))
            && e.rect().intersects(&prect)
    });
    if !hit {
        return;
    }

    // Exactly one death per tick, however many segments overlap.
    player_die(world, events);
}

fn player_die(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    if let Some(id) = world.player.take() {
        if let Some(e) = world.entities.get_mut(id) {
            e.removed = true;
        }
    }
    for i in 0..world.entities.len() {
        let e = world.entities.at_mut(i);
        if matches!(e.kind, EntityKind::Segment(_)) {
            e.removed = true;
        }
    }
    world.remaining_parts = 0;
    world.lives = world.lives.saturating_sub(1);
    events.push(GameEvent::PlayerKilled);

    if world.lives == 0 {
        world.phase = Phase::GameOver;
        world.set_message("GAME OVER", 0.0);
        events.push(GameEvent::GameOver);
    } else {
        world.respawn_timer = Some(world.speed.respawn_delay);
        world.set_message("Ouch!", 1.5);
    }
}

// ══════════════════════════════════════════════════════════════
// Round logic — respawn wait, field regeneration, wave advance
// ══════════════════════════════════════════════════════════════

fn resolve_round(
    world: &mut WorldState,
    skip: bool,
    dt: f32,
    rng: &mut impl Rng,
    events: &mut Vec<GameEvent>,
) {
    if world.phase != Phase::Playing {
        return;
    }

    // Dead sub-state: wait out the delay, then regenerate the field one
    // mushroom per tick; respawn + next wave once nothing is damaged.
    if let Some(t) = world.respawn_timer {
        let remaining = t - dt;
        if remaining > 0.0 {
            world.respawn_timer = Some(remaining);
            return;
        }
        world.respawn_timer = Some(0.0);

        if world.field.has_damaged(&world.entities) {
            if let Some((x, y)) = world.field.restore_next(&mut world.entities) {
                world.award(5);
                events.push(GameEvent::MushroomRestored { x, y });
            }
            return;
        }

        world.respawn_timer = None;
        level::spawn_player(world);
        level::advance_level(world, rng);
        return;
    }

    if world.remaining_parts == 0 || skip {
        if skip {
            for i in 0..world.entities.len() {
                let e = world.entities.at_mut(i);
                if matches!(e.kind, EntityKind::Segment(_)) {
                    e.removed = true;
                }
            }
            world.remaining_parts = 0;
        }
        events.push(GameEvent::LevelCleared { level: world.level });
        level::advance_level(world, rng);
    }
}

// ══════════════════════════════════════════════════════════════
// Tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::{PlayerShip, Segment};
    use crate::domain::field::FIELD_W;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const DT: f32 = 0.016;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    /// A Playing-phase world with a sentinel wave count so round logic
    /// stays quiet unless a test drives it.
    fn world() -> WorldState {
        let mut w = WorldState::new();
        w.phase = Phase::Playing;
        w.level = 1;
        w.lives = 3;
        w.remaining_parts = 5;
        w
    }

    fn add_player(w: &mut WorldState, x: f32, y: f32) -> EntityId {
        let id = w
            .entities
            .spawn(EntityKind::Player(PlayerShip::new(Vec2::new(x, y))));
        w.player = Some(id);
        id
    }

    fn add_segment(w: &mut WorldState, cell: (i32, i32), dir_x: i32) -> EntityId {
        w.entities
            .spawn(EntityKind::Segment(Segment::new(cell, dir_x, None)))
    }

    fn add_missile(w: &mut WorldState, x: f32, y: f32) -> EntityId {
        w.entities
            .spawn(EntityKind::Missile(Missile::new(Vec2::new(x, y))))
    }

    fn player_pos(w: &WorldState) -> Vec2 {
        match &w.entities.get(w.player.unwrap()).unwrap().kind {
            EntityKind::Player(p) => p.pos,
            _ => panic!("not a player"),
        }
    }

    fn segment(w: &WorldState, id: EntityId) -> &Segment {
        match &w.entities.get(id).unwrap().kind {
            EntityKind::Segment(s) => s,
            _ => panic!("not a segment"),
        }
    }

    fn count_kind(w: &WorldState, f: impl Fn(&EntityKind) -> bool) -> usize {
        w.entities.iter().filter(|e| f(&e.kind)).count()
    }

    // ── Player movement ──

    #[test]
    fn diagonal_movement_is_normalized() {
        let mut w = world();
        add_player(&mut w, 400.0, 600.0);
        let before = player_pos(&w);

        let input = FrameInput { up: true, left: true, ..Default::default() };
        step(&mut w, input, DT, &mut rng());

        let moved = player_pos(&w) - before;
        let expected = w.speed.player_speed * DT;
        assert!((moved.length() - expected).abs() < 1e-3);
        // Both components carry equal share
        assert!((moved.x.abs() - moved.y.abs()).abs() < 1e-3);
    }

    #[test]
    fn no_input_means_no_motion() {
        let mut w = world();
        add_player(&mut w, 400.0, 600.0);
        let before = player_pos(&w);
        step(&mut w, FrameInput::default(), DT, &mut rng());
        assert_eq!(player_pos(&w), before);
    }

    #[test]
    fn single_axis_speed_equals_diagonal_speed() {
        let mut w = world();
        add_player(&mut w, 400.0, 600.0);
        let before = player_pos(&w);
        let input = FrameInput { right: true, ..Default::default() };
        step(&mut w, input, DT, &mut rng());
        let moved = (player_pos(&w) - before).length();
        assert!((moved - w.speed.player_speed * DT).abs() < 1e-3);
    }

    #[test]
    fn blocked_axis_reverts_but_free_axis_slides() {
        let mut w = world();
        // Mushroom one cell to the right of the player.
        w.field.spawn_mushroom(4, 19, &mut w.entities);
        add_player(&mut w, 3.0 * CELL, 19.0 * CELL);
        let before = player_pos(&w);

        let input = FrameInput { right: true, up: true, ..Default::default() };
        step(&mut w, input, DT, &mut rng());

        let after = player_pos(&w);
        assert!((after.x - before.x).abs() < 1e-4); // x reverted on mushroom overlap
        assert!(after.y < before.y); // y still applied: slide
    }

    #[test]
    fn player_is_clamped_to_the_home_lane() {
        let mut w = world();
        add_player(&mut w, 0.0, FIELD_H as f32 * 2.0 / 3.0 * CELL);
        // Push up and left well past the bounds.
        let input = FrameInput { up: true, left: true, ..Default::default() };
        for _ in 0..200 {
            step(&mut w, input, DT, &mut rng());
        }
        let pos = player_pos(&w);
        assert_eq!(pos.x, 0.0);
        assert_eq!(pos.y, FIELD_H as f32 * 2.0 / 3.0 * CELL);
    }

    // ── Firing ──

    #[test]
    fn fire_respects_reload_cooldown() {
        let mut w = world();
        add_player(&mut w, 400.0, 600.0);
        let input = FrameInput { fire: true, ..Default::default() };

        let events = step(&mut w, input, DT, &mut rng());
        assert!(matches!(events[..], [GameEvent::Shoot]));
        assert_eq!(count_kind(&w, |k| matches!(k, EntityKind::Missile(_))), 1);

        // Cooldown still running: no second missile.
        let events = step(&mut w, input, DT, &mut rng());
        assert!(events.is_empty());
        assert_eq!(count_kind(&w, |k| matches!(k, EntityKind::Missile(_))), 1);
    }

    #[test]
    fn missile_past_top_is_removed_without_effect() {
        let mut w = world();
        add_missile(&mut w, 100.0, 1.0);
        let score = w.score;
        step(&mut w, FrameInput::default(), 0.05, &mut rng());
        assert_eq!(count_kind(&w, |k| matches!(k, EntityKind::Missile(_))), 0);
        assert_eq!(w.score, score);
    }

    // ── Missile vs mushroom ──

    #[test]
    fn four_hits_destroy_a_mushroom_scoring_once() {
        let mut w = world();
        w.field.spawn_mushroom(3, 3, &mut w.entities);

        for n in 1..=4 {
            // A fresh missile overlapping the mushroom each tick; tiny dt
            // keeps it inside the cell after travel.
            add_missile(&mut w, 3.0 * CELL + 14.0, 3.0 * CELL + 10.0);
            let events = step(&mut w, FrameInput::default(), 0.001, &mut rng());
            assert!(events
                .iter()
                .any(|e| matches!(e, GameEvent::MushroomHit { x: 3, y: 3 })));
            if n < 4 {
                assert!(!w.field.is_cell_accessible(3, 3, &w.entities));
            }
        }

        // Removed after the 4th hit, exactly one destruction bonus.
        assert!(w.field.is_cell_accessible(3, 3, &w.entities));
        assert_eq!(w.score, 1);
        assert_eq!(count_kind(&w, |k| matches!(k, EntityKind::Mushroom(_))), 0);
    }

    #[test]
    fn first_target_in_list_order_wins() {
        let mut w = world();
        // Mushroom spawned before the segment, both overlapping the missile.
        w.field.spawn_mushroom(3, 3, &mut w.entities);
        let seg = add_segment(&mut w, (3, 3), 1);
        add_missile(&mut w, 3.0 * CELL + 14.0, 3.0 * CELL + 10.0);

        step(&mut w, FrameInput::default(), 0.001, &mut rng());

        assert!(w.entities.is_live(seg)); // segment untouched
        let id = w.field.mushroom_at(3, 3).unwrap();
        match &w.entities.get(id).unwrap().kind {
            EntityKind::Mushroom(m) => assert_eq!(m.health(), 3),
            _ => unreachable!(),
        }
    }

    // ── Missile vs segment ──

    #[test]
    fn killed_segment_becomes_a_mushroom() {
        let mut w = world();
        add_segment(&mut w, (5, 4), 1);
        add_missile(&mut w, 5.0 * CELL + 14.0, 4.0 * CELL + 10.0);
        let parts = w.remaining_parts;

        let events = step(&mut w, FrameInput::default(), 0.001, &mut rng());

        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::SegmentKilled { head: true, x: 5, y: 4 })));
        assert_eq!(w.remaining_parts, parts - 1);
        assert_eq!(w.score, 100); // parentless segment scores as a head
        assert_eq!(count_kind(&w, |k| matches!(k, EntityKind::Segment(_))), 0);
        assert!(!w.field.is_cell_accessible(5, 4, &w.entities)); // mushroom grew
    }

    #[test]
    fn body_segment_scores_less_than_head() {
        let mut w = world();
        let head = add_segment(&mut w, (5, 4), 1);
        let body = w
            .entities
            .spawn(EntityKind::Segment(Segment::new((4, 4), 1, Some(head))));
        let _ = body;
        add_missile(&mut w, 4.0 * CELL + 14.0, 4.0 * CELL + 10.0);

        step(&mut w, FrameInput::default(), 0.0, &mut rng());
        assert_eq!(w.score, 10);
    }

    // ── Promotion ──

    #[test]
    fn body_promotes_to_head_exactly_once() {
        let mut w = world();
        let head = add_segment(&mut w, (5, 5), 1);
        let body = w
            .entities
            .spawn(EntityKind::Segment(Segment::new((4, 5), 1, Some(head))));

        // Head dies (as if shot last tick) and is compacted away.
        w.entities.get_mut(head).unwrap().removed = true;
        w.entities.compact();

        step(&mut w, FrameInput::default(), 0.0, &mut rng());
        assert!(segment(&w, body).parent.is_none());

        // Further ticks change nothing about headship.
        step(&mut w, FrameInput::default(), 0.0, &mut rng());
        assert!(segment(&w, body).parent.is_none());
    }

    // ── Grid advancement ──

    #[test]
    fn off_map_candidate_drops_a_row_and_reverses() {
        let mut w = world();
        let id = add_segment(&mut w, (FIELD_W as i32 - 1, 5), 1);

        step(&mut w, FrameInput::default(), 0.0, &mut rng());

        let s = segment(&w, id);
        assert_eq!(s.cell, (FIELD_W as i32 - 1, 6));
        assert_eq!(s.dir_x, -1);
        assert_eq!(s.dir_y, 1); // mid-field: vertical direction unchanged
    }

    #[test]
    fn bottom_boundary_reverses_vertical_direction() {
        let mut w = world();
        let id = add_segment(&mut w, (FIELD_W as i32 - 1, FIELD_H as i32 - 1), 1);

        step(&mut w, FrameInput::default(), 0.0, &mut rng());

        let s = segment(&w, id);
        assert_eq!(s.cell, (FIELD_W as i32 - 1, FIELD_H as i32 - 2));
        assert_eq!(s.dir_x, -1);
        assert_eq!(s.dir_y, -1);
    }

    #[test]
    fn mushroom_block_turns_the_segment_down() {
        let mut w = world();
        w.field.spawn_mushroom(6, 5, &mut w.entities);
        let id = add_segment(&mut w, (5, 5), 1);

        step(&mut w, FrameInput::default(), 0.0, &mut rng());

        let s = segment(&w, id);
        assert_eq!(s.cell, (5, 6));
        assert_eq!(s.dir_x, -1);
    }

    #[test]
    fn occupied_destination_holds_for_a_tick() {
        let mut w = world();
        let a = add_segment(&mut w, (FIELD_W as i32 - 1, 5), 1);
        // Another segment already sits on A's reversal target with the
        // exact direction pair A would adopt. Keep it in transit so it
        // doesn't advance away this tick.
        let b = add_segment(&mut w, (FIELD_W as i32 - 1, 6), -1);
        if let EntityKind::Segment(s) = &mut w.entities.get_mut(b).unwrap().kind {
            s.pos.x -= 4.0;
        }

        step(&mut w, FrameInput::default(), 0.0, &mut rng());

        assert_eq!(segment(&w, a).cell, (FIELD_W as i32 - 1, 5)); // held
        assert_eq!(segment(&w, a).dir_x, 1);
    }

    #[test]
    fn entry_rows_descend_vertically() {
        let mut w = world();
        let id = add_segment(&mut w, (3, -2), 1);
        step(&mut w, FrameInput::default(), 0.0, &mut rng());
        assert_eq!(segment(&w, id).cell, (3, -1));
        // One tick to glide onto the new cell, one to advance again.
        step(&mut w, FrameInput::default(), 10.0, &mut rng());
        assert!(segment(&w, id).settled());
        step(&mut w, FrameInput::default(), 0.0, &mut rng());
        assert_eq!(segment(&w, id).cell, (3, 0));
    }

    #[test]
    fn transit_never_overshoots_the_cell() {
        let mut w = world();
        let id = add_segment(&mut w, (5, 5), 1);
        if let EntityKind::Segment(s) = &mut w.entities.get_mut(id).unwrap().kind {
            s.pos.x -= 10.0; // 10 px short of the cell
        }

        // A giant dt gives far more travel budget than distance.
        step(&mut w, FrameInput::default(), 1.0, &mut rng());

        let s = segment(&w, id);
        assert!(s.settled());
        assert_eq!(s.heading, Heading::Right);
    }

    // ── Player death ──

    #[test]
    fn overlapping_segments_kill_the_player_once() {
        let mut w = world();
        add_player(&mut w, 12.0 * CELL, 19.0 * CELL);
        // Two segments on the same cell, both overlapping the ship.
        add_segment(&mut w, (12, 19), 1);
        add_segment(&mut w, (12, 19), 1);
        w.remaining_parts = 2;

        let events = step(&mut w, FrameInput::default(), 0.0, &mut rng());

        let deaths = events
            .iter()
            .filter(|e| matches!(e, GameEvent::PlayerKilled))
            .count();
        assert_eq!(deaths, 1);
        assert!(w.player.is_none());
        assert_eq!(w.remaining_parts, 0);
        assert_eq!(count_kind(&w, |k| matches!(k, EntityKind::Segment(_))), 0);
        assert_eq!(w.lives, 2);
        assert!(w.respawn_timer.is_some());
        assert_eq!(w.phase, Phase::Playing);
    }

    #[test]
    fn last_life_ends_the_game() {
        let mut w = world();
        w.lives = 1;
        add_player(&mut w, 12.0 * CELL, 19.0 * CELL);
        add_segment(&mut w, (12, 19), 1);

        let events = step(&mut w, FrameInput::default(), 0.0, &mut rng());

        assert_eq!(w.phase, Phase::GameOver);
        assert!(events.iter().any(|e| matches!(e, GameEvent::GameOver)));
        assert!(w.respawn_timer.is_none());
    }

    // ── Respawn / regeneration / wave advance ──

    #[test]
    fn field_regenerates_then_respawns_and_advances() {
        let mut w = world();
        w.remaining_parts = 0;
        w.respawn_timer = Some(0.05);
        // One damaged mushroom awaiting restoration.
        let id = w.field.spawn_mushroom(2, 2, &mut w.entities).unwrap();
        if let EntityKind::Mushroom(m) = &mut w.entities.get_mut(id).unwrap().kind {
            m.hit();
        }
        let level = w.level;

        // Timer expires and one mushroom is restored (+5).
        let events = step(&mut w, FrameInput::default(), 0.1, &mut rng());
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::MushroomRestored { x: 2, y: 2 })));
        assert_eq!(w.score, 5);
        assert!(w.player.is_none());

        // Field is pristine: respawn + next wave.
        step(&mut w, FrameInput::default(), 0.1, &mut rng());
        assert!(w.player.is_some());
        assert_eq!(w.level, level + 1);
        assert!(w.respawn_timer.is_none());
        assert!(w.remaining_parts > 0);
    }

    #[test]
    fn clearing_the_wave_advances_the_level() {
        let mut w = world();
        add_player(&mut w, 0.0, 19.0 * CELL);
        w.remaining_parts = 1;
        add_segment(&mut w, (5, 4), 1);
        add_missile(&mut w, 5.0 * CELL + 14.0, 4.0 * CELL + 10.0);

        let events = step(&mut w, FrameInput::default(), 0.001, &mut rng());

        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::LevelCleared { level: 1 })));
        assert_eq!(w.level, 2);
        // Fresh chain sized to the new level.
        assert_eq!(w.remaining_parts, w.rules.chain_base + 2);
    }

    #[test]
    fn skip_input_discards_the_wave_and_advances() {
        let mut w = world();
        add_player(&mut w, 0.0, 19.0 * CELL);
        add_segment(&mut w, (5, 4), 1);
        w.remaining_parts = 1;

        let input = FrameInput { skip_level: true, ..Default::default() };
        step(&mut w, input, 0.0, &mut rng());

        assert_eq!(w.level, 2);
        assert_eq!(w.remaining_parts, w.rules.chain_base + 2);
    }

    #[test]
    fn step_is_inert_outside_the_playing_phase() {
        let mut w = WorldState::new();
        w.phase = Phase::Title;
        let events = step(&mut w, FrameInput::default(), DT, &mut rng());
        assert!(events.is_empty());
        assert_eq!(w.level, 0);
    }
}
