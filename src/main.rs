/// Entry point and frame loop.

mod config;
mod domain;
mod sim;
mod ui;

use std::time::{Duration, Instant};

use crossterm::event::KeyCode;
use rand::rngs::StdRng;
use rand::SeedableRng;

use config::GameConfig;
use sim::event::GameEvent;
use sim::level;
use sim::step::{self, FrameInput};
use sim::world::{Phase, WorldState};
use ui::gamepad::GamepadState;
use ui::input::InputState;
use ui::renderer::Renderer;
use ui::sound::SoundEngine;

const FRAME_SLEEP: Duration = Duration::from_millis(8);

/// A stall (debugger, laptop sleep) must not turn into one giant
/// simulation jump.
const MAX_DT: f32 = 0.1;

fn main() {
    let config = GameConfig::load();

    let mut world = WorldState::new();
    world.speed = config.speed.clone();
    world.rules = config.rules.clone();

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let sound = SoundEngine::new();

    let result = game_loop(&mut world, &mut renderer, sound.as_ref(), &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Final Score: {}", world.score);
}

fn game_loop(
    world: &mut WorldState,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    let mut gp = GamepadState::new();
    gp.apply_button_config(&config.gamepad);
    let mut rng = StdRng::from_entropy();
    let mut last_frame = Instant::now();

    loop {
        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() {
            break;
        }
        if handle_meta(world, sound, &kb, &gp, &mut rng) {
            break;
        }

        let dt = last_frame.elapsed().as_secs_f32().min(MAX_DT);
        last_frame = Instant::now();

        if world.phase == Phase::Playing {
            let input = FrameInput {
                up: kb.any_held(KEYS_UP) || gp.up_held(),
                down: kb.any_held(KEYS_DOWN) || gp.down_held(),
                left: kb.any_held(KEYS_LEFT) || gp.left_held(),
                right: kb.any_held(KEYS_RIGHT) || gp.right_held(),
                fire: kb.any_held(KEYS_FIRE) || gp.fire_held(),
                skip_level: kb.any_pressed(KEYS_SKIP) || gp.skip_pressed(),
            };
            let events = step::step(world, input, dt, &mut rng);
            process_sound_events(sound, &events);
        }

        world.anim_tick = world.anim_tick.wrapping_add(1);

        renderer.render(world)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

fn process_sound_events(sound: Option<&SoundEngine>, events: &[GameEvent]) {
    let sfx = match sound {
        Some(s) => s,
        None => return,
    };
    for event in events {
        match event {
            GameEvent::Shoot => sfx.play_shoot(),
            GameEvent::MushroomHit { .. } => sfx.play_hit(),
            GameEvent::MushroomDestroyed { .. } => sfx.play_pop(),
            GameEvent::SegmentKilled { .. } => sfx.play_kill(),
            GameEvent::PlayerKilled => sfx.play_die(),
            GameEvent::LevelCleared { .. } => sfx.play_wave_clear(),
            _ => {}
        }
    }
}

// ── Key Constants ──

const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const KEYS_UP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
const KEYS_DOWN: &[KeyCode] = &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')];
const KEYS_FIRE: &[KeyCode] = &[KeyCode::Char(' ')];
const KEYS_SKIP: &[KeyCode] = &[KeyCode::Char('n'), KeyCode::Char('N')];
const KEYS_CONFIRM: &[KeyCode] = &[KeyCode::Enter, KeyCode::Char(' ')];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Char('q'), KeyCode::Char('Q')];

/// Phase transitions driven by meta keys. Returns true to quit.
fn handle_meta(
    world: &mut WorldState,
    sound: Option<&SoundEngine>,
    kb: &InputState,
    gp: &GamepadState,
    rng: &mut StdRng,
) -> bool {
    let confirm = kb.any_pressed(KEYS_CONFIRM) || gp.confirm_pressed();
    let esc = kb.any_pressed(&[KeyCode::Esc]) || gp.cancel_pressed();

    match world.phase {
        Phase::Title => {
            if confirm {
                level::new_game(world, rng);
                if let Some(sfx) = sound {
                    sfx.play_start();
                }
            } else if kb.any_pressed(KEYS_QUIT) || esc {
                return true;
            }
        }
        Phase::Playing => {
            if esc {
                return_to_title(world);
            }
        }
        Phase::GameOver => {
            if confirm || esc {
                return_to_title(world);
            } else if kb.any_pressed(KEYS_QUIT) {
                return true;
            }
        }
    }

    false
}

/// Back to the title screen, keeping the tuning config (the final
/// score stays on `world` for the exit message).
fn return_to_title(world: &mut WorldState) {
    let speed = world.speed.clone();
    let rules = world.rules.clone();
    let score = world.score;
    *world = WorldState::new();
    world.speed = speed;
    world.rules = rules;
    world.score = score;
    world.phase = Phase::Title;
}
