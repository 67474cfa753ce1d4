// src/main.rs

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::time::{Duration, Instant};

use studio_modules::controller::StudioController;

fn main() -> Result<(), anyhow::Error> {
    let take_dir = std::env::args()
        .nth(1)
        .map(Into::into)
        .unwrap_or_else(std::env::temp_dir);
    std::fs::create_dir_all(&take_dir)?;

    let mut screen = StudioController::new(take_dir);

    println!("Press [R] Record | [Space] Play/Pause | [←/→] Seek | [Q] Quit");

    enable_raw_mode()?;

    // The frame loop doubles as the animation-frame driver for the
    // sampling loop: one tick per frame, ~60 fps.
    let frame = Duration::from_millis(16);
    let epoch = Instant::now();

    let result = run(&mut screen, frame, epoch);

    disable_raw_mode()?;
    println!("\n👋 Leaving the studio.");
    result
}

fn run(
    screen: &mut StudioController,
    frame: Duration,
    epoch: Instant,
) -> Result<(), anyhow::Error> {
    loop {
        if event::poll(frame)? {
            if let Event::Key(ev) = event::read()? {
                if ev.kind == KeyEventKind::Press {
                    if ev.code == KeyCode::Char('c')
                        && ev.modifiers.contains(KeyModifiers::CONTROL)
                    {
                        return Ok(());
                    }
                    if screen.should_quit(ev.code) {
                        return Ok(());
                    }
                    screen.handle_key(ev.code);
                }
            }
        }

        let now = Instant::now();
        let now_ms = now.duration_since(epoch).as_millis() as u64;
        screen.run_tick(now_ms, now)?;
    }
}
