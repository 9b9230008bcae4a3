/// Night Run example: a scripted walk through the bundled OneZeroFour story.
///
/// Drives the terminal with a simulated clock so the whole run prints
/// instantly: open, pick a district, read it through, step back, close.
///
/// Run with: cargo run --example night_run

use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use terminal_narrative::core::archive::WorldArchive;
use terminal_narrative::core::story::StoryRepository;
use terminal_narrative::core::terminal::Terminal;

fn main() {
    let story = StoryRepository::load_from_ron(Path::new("story_data/onezerofour/story.ron"))
        .expect("Failed to load OneZeroFour story");
    let story = Arc::new(story);

    let mut terminal = Terminal::builder(Arc::clone(&story))
        .build()
        .expect("Failed to build terminal");

    let keystrokes = Rc::new(Cell::new(0usize));
    let counter = Rc::clone(&keystrokes);
    terminal.subscribe(move |view| {
        if view.typing {
            counter.set(counter.get() + 1);
        }
    });

    let mut now = 0u64;

    println!("========================================");
    println!("   ONEZEROFOUR // NIGHT RUN");
    println!("========================================");
    println!();

    terminal.open(now);
    settle(&mut terminal, &mut now);
    show(&terminal, "Boot");

    terminal.choose(0, now).expect("First district should exist");
    settle(&mut terminal, &mut now);
    show(&terminal, "Enter");

    let count = terminal.view().narrative_count;
    for _ in 1..count {
        terminal.advance(now);
        settle(&mut terminal, &mut now);
        show(&terminal, "Advance");
    }

    // Wraps to the first narrative again.
    terminal.advance(now);
    settle(&mut terminal, &mut now);
    show(&terminal, "Advance (wrapped)");

    while terminal.view().history_depth > 0 {
        terminal.navigate_back(now);
        show(&terminal, "Back");
    }

    let mut archive = WorldArchive::from_story(&story);
    println!("--- World archive ---");
    loop {
        if let Some(page) = archive.current() {
            println!("{}", archive.header());
            println!("{}", page);
            println!("{}", archive.indicator());
            println!();
        }
        if !archive.next_page() {
            break;
        }
    }

    terminal.close(now);
    settle(&mut terminal, &mut now);
    show(&terminal, "Close");

    println!("========================================");
    println!(
        "   [CONNECTION TERMINATED AT {} ms, {} KEYSTROKES]",
        now,
        keystrokes.get()
    );
    println!("========================================");
}

/// Step the simulated clock until no reveal or timer is pending.
fn settle(terminal: &mut Terminal, now: &mut u64) {
    let step = terminal.config().tick_interval_ms;
    loop {
        let next = match terminal.next_timer_at() {
            Some(at) if !terminal.is_typing() => at,
            _ if terminal.is_typing() => *now + step,
            _ => break,
        };
        *now = next.max(*now);
        terminal.tick(*now);
    }
}

fn show(terminal: &Terminal, title: &str) {
    let view = terminal.view();
    println!(
        "--- {} [{} | history {}] ---",
        title, view.stage, view.history_depth
    );
    println!("{}", view.displayed_text);
    if view.choices_visible {
        for (i, choice) in view.choices.iter().enumerate() {
            println!("  [{}] {}", i + 1, choice.text);
        }
    }
    println!();
}
