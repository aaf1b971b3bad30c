//! Interactive commands that drive the poll loop.

use std::cell::Cell;
use std::error::Error;
use std::rc::Rc;
use std::thread;

use kontrol_a49::{Bitmap, Event, Key, KontrolA49, SCREEN_HEIGHT, SCREEN_WIDTH};
use tracing::debug;

use crate::config::BounceConfig;

/// Print every event as it arrives. With `echo`, held keys are lit at that level.
pub fn watch(board: &mut KontrolA49, echo: Option<u8>) -> Result<(), Box<dyn Error>> {
    board.on_key_press(|key| println!("pressed {key}"));
    board.on_key_release(|key| println!("released {key}"));
    board.on_rotary(|value| println!("rotary {value}"));
    board.on_octave(|value| println!("octave {value}"));

    if echo.is_some() {
        board.set_all_keys(0, true)?;
    }
    println!("watching for events, press ctrl+c to exit");

    loop {
        let events = board.poll()?;
        let Some(level) = echo else {
            continue;
        };

        let mut dirty = false;
        for event in events {
            match event {
                Event::KeyPressed(key) => board.set_key_light(key, level, false)?,
                Event::KeyReleased(key) => board.set_key_light(key, 0, false)?,
                _ => continue,
            }
            dirty = true;
        }
        if dirty {
            board.send_key_lights()?;
        }
    }
}

/// Position and velocity along one axis, reflecting off `0` and `max`
fn step(pos: &mut i32, vel: &mut i32, max: i32) {
    *pos += *vel;
    if *pos <= 0 || *pos >= max {
        *pos = (*pos).clamp(0, max);
        *vel = -*vel;
    }
}

/// Bounce a box around the display until STOP is pressed, then clear everything
pub fn bounce(board: &mut KontrolA49, config: &BounceConfig) -> Result<(), Box<dyn Error>> {
    let running = Rc::new(Cell::new(true));
    let flag = running.clone();
    board.on_key_press(move |key| {
        if key == Key::Stop {
            flag.set(false)
        }
    });

    board.set_all_keys(0, false)?;
    board.set_key_light(Key::Stop, 0xff, true)?;
    println!("bouncing, press STOP to exit");

    let width = config.box_width.clamp(1, SCREEN_WIDTH);
    let height = config.box_height.clamp(1, SCREEN_HEIGHT);
    let max_x = (SCREEN_WIDTH - width) as i32;
    let max_y = (SCREEN_HEIGHT - height) as i32;
    let (mut x, mut y, mut vx, mut vy) = (0, 0, 1, 1);

    let mut frames = 0u64;
    while running.get() {
        step(&mut x, &mut vx, max_x);
        step(&mut y, &mut vy, max_y);

        // the background is drawn with set bits, the box with cleared ones
        let mut frame = Bitmap::filled();
        frame.fill_rect(x, y, width, height, false);
        board.send_image(&frame)?;
        frames += 1;

        thread::sleep(config.frame_interval);
        board.poll()?;
    }
    debug!(frames, "bounce stopped");

    board.clear_handlers();
    board.send_image(&Bitmap::filled())?;
    board.set_all_keys(0, true)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_reflects_at_edges() {
        let (mut pos, mut vel) = (0, 1);
        let mut seen = Vec::new();
        for _ in 0..6 {
            step(&mut pos, &mut vel, 3);
            seen.push(pos);
        }
        assert_eq!(seen, [1, 2, 3, 2, 1, 0]);
        assert_eq!(vel, 1);
    }

    #[test]
    fn step_without_room_stays_put() {
        let (mut pos, mut vel) = (0, 1);
        step(&mut pos, &mut vel, 0);
        assert_eq!(pos, 0);
        step(&mut pos, &mut vel, 0);
        assert_eq!(pos, 0);
    }
}
