/// Preview: interactive shell for walking a story in a real terminal.
///
/// Usage: preview --story <path> [--legacy] [--config <path>]
///
/// Commands:
///   open            - open the terminal and type the intro
///   choose <n>      - take menu entry n (1-based)
///   go <scene>      - enter a scene by id
///   next            - advance to the next narrative
///   back            - step back through history
///   close           - close the terminal
///   archive [next|prev]
///                   - show (and page) the world archive
///   status          - print stage, scene and history depth
///   help            - list commands
///   quit            - exit

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use terminal_narrative::core::archive::WorldArchive;
use terminal_narrative::core::story::{StoryError, StoryRepository};
use terminal_narrative::core::terminal::Terminal;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let mut story_path = None;
    let mut config_path = None;
    let mut legacy = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--story" if i + 1 < args.len() => {
                i += 1;
                story_path = Some(args[i].clone());
            }
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(args[i].clone());
            }
            "--legacy" => legacy = true,
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let Some(story_path) = story_path else {
        print_usage();
        std::process::exit(1);
    };

    let story = match load_story(Path::new(&story_path), legacy) {
        Ok(story) => Arc::new(story),
        Err(e) => {
            error!(error = %e, path = %story_path, "story load failed");
            std::process::exit(1);
        }
    };

    let mut archive = WorldArchive::from_story(&story);
    let mut builder = Terminal::builder(Arc::clone(&story));
    if let Some(ref path) = config_path {
        builder = builder.config_file(Path::new(path));
    }
    let mut terminal = match builder.build() {
        Ok(terminal) => terminal,
        Err(e) => {
            error!(error = %e, "terminal build failed");
            std::process::exit(1);
        }
    };

    println!("Loaded {} scenes", story.len());
    println!("Type 'help' for commands.\n");

    let clock = Instant::now();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("terminal> ");
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let cmd = parts[0].to_lowercase();
        let printed_before = terminal.view().displayed_text;

        match cmd.as_str() {
            "quit" | "exit" | "q" => {
                println!("Goodbye.");
                break;
            }
            "help" | "h" | "?" => {
                print_help();
                continue;
            }
            "open" => terminal.open(now_ms(&clock)),
            "close" => terminal.close(now_ms(&clock)),
            "next" | "n" => terminal.advance(now_ms(&clock)),
            "back" | "b" => terminal.navigate_back(now_ms(&clock)),
            "choose" | "c" => {
                let index = match parts.get(1).and_then(|s| s.parse::<usize>().ok()) {
                    Some(n) if n > 0 => n - 1,
                    _ => {
                        println!("Usage: choose <n>");
                        continue;
                    }
                };
                if let Err(e) = terminal.choose(index, now_ms(&clock)) {
                    println!("{}", e);
                    continue;
                }
            }
            "go" => {
                let Some(id) = parts.get(1) else {
                    println!("Usage: go <scene>");
                    continue;
                };
                if let Err(e) = terminal.select_scene(id, now_ms(&clock)) {
                    println!("{}", e);
                    continue;
                }
            }
            "archive" | "a" => {
                match parts.get(1).copied() {
                    Some("next") => {
                        archive.next_page();
                    }
                    Some("prev") => {
                        archive.previous_page();
                    }
                    _ => {}
                }
                print_archive(&archive);
                continue;
            }
            "status" | "s" => {
                let view = terminal.view();
                println!("  stage:   {}", view.stage);
                println!(
                    "  scene:   {}",
                    view.scene_id.as_deref().unwrap_or("(none)")
                );
                println!(
                    "  index:   {} / {}",
                    view.narrative_index, view.narrative_count
                );
                println!("  history: {}", view.history_depth);
                continue;
            }
            _ => {
                println!("Unknown command: {}. Type 'help' for commands.", cmd);
                continue;
            }
        }

        play_out(&mut terminal, &clock, &printed_before);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();
}

fn now_ms(clock: &Instant) -> u64 {
    clock.elapsed().as_millis() as u64
}

fn load_story(path: &Path, legacy: bool) -> Result<StoryRepository, StoryError> {
    let is_json = path.extension().and_then(|s| s.to_str()) == Some("json");
    if legacy {
        let contents = std::fs::read_to_string(path)?;
        StoryRepository::parse_legacy_json(&contents)
    } else if is_json {
        StoryRepository::load_from_json(path)
    } else {
        StoryRepository::load_from_ron(path)
    }
}

/// Tick in real time until the terminal settles, echoing typed characters.
fn play_out(terminal: &mut Terminal, clock: &Instant, printed_before: &str) {
    let mut stdout = io::stdout();
    let mut shown = String::new();
    let view = terminal.view();
    if view.displayed_text != printed_before && !view.displayed_text.is_empty() {
        // Snapped text (back navigation) is shown whole.
        print!("{}", view.displayed_text);
        shown = view.displayed_text;
    }

    while terminal.is_typing() || terminal.next_timer_at().is_some() {
        std::thread::sleep(Duration::from_millis(5));
        terminal.tick(now_ms(clock));
        let text = terminal.view().displayed_text;
        if let Some(rest) = text.strip_prefix(shown.as_str()) {
            print!("{}", rest);
        } else if !text.is_empty() {
            print!("\n{}", text);
        }
        stdout.flush().ok();
        shown = text;
    }
    println!();

    let view = terminal.view();
    if view.choices_visible {
        for (i, choice) in view.choices.iter().enumerate() {
            println!("  [{}] {}", i + 1, choice.text);
        }
    }
}

fn print_archive(archive: &WorldArchive) {
    match archive.current() {
        Some(text) => {
            println!("{}", archive.header());
            println!("{}", text);
            println!("{}", archive.indicator());
        }
        None => println!("The archive is empty."),
    }
}

fn print_usage() {
    println!("Usage: preview --story <path> [--legacy] [--config <path>]");
    println!();
    println!("Options:");
    println!("  --story <path>   Story document (.ron, or .json)");
    println!("  --legacy         Read the story as a districts-list JSON document");
    println!("  --config <path>  Terminal timing config (.ron)");
}

fn print_help() {
    println!("Commands:");
    println!("  open                 Open the terminal and type the intro");
    println!("  choose <n>           Take menu entry n");
    println!("  go <scene>           Enter a scene by id");
    println!("  next                 Advance to the next narrative");
    println!("  back                 Step back through history");
    println!("  close                Close the terminal");
    println!("  archive [next|prev]  Browse the world archive");
    println!("  status               Show stage, scene and history");
    println!("  quit                 Exit");
}
