/// Events emitted during a simulation step.
/// The presentation layer consumes these for sound effects.

#[derive(Clone, Debug)]
pub enum GameEvent {
    Shoot,
    MushroomHit { x: usize, y: usize },
    MushroomDestroyed { x: usize, y: usize },
    MushroomRestored { x: usize, y: usize },
    SegmentKilled { head: bool, x: i32, y: i32 },
    PlayerKilled,
    LevelCleared { level: u32 },
    GameOver,
}
