//! WASM bindings for terminal-narrative: the browser terminal's core.
//!
//! The page owns rendering and time. It calls `tick(performance.now())`
//! from its animation loop and re-renders from `view()` whenever
//! `tick` or an action returns `true`.

use std::sync::Arc;
use wasm_bindgen::prelude::*;

use terminal_narrative::core::archive::WorldArchive;
use terminal_narrative::core::config::TerminalConfig;
use terminal_narrative::core::story::StoryRepository;
use terminal_narrative::core::terminal::{Terminal, TerminalView};

// ---------------------------------------------------------------------------
// Embedded story data, compiled into the WASM binary
// ---------------------------------------------------------------------------
mod data {
    pub const ONEZEROFOUR_STORY: &str = include_str!("../../story_data/onezerofour/story.ron");
}

// ---------------------------------------------------------------------------
// JSON helper types for communication across the WASM boundary
// ---------------------------------------------------------------------------
#[derive(serde::Serialize)]
struct ArchivePage<'a> {
    header: String,
    indicator: String,
    text: Option<&'a str>,
    has_previous: bool,
    has_next: bool,
}

fn to_js_error(context: &str, err: impl std::fmt::Display) -> JsError {
    JsError::new(&format!("{context}: {err}"))
}

fn host_time(now_ms: f64) -> u64 {
    if now_ms.is_finite() && now_ms > 0.0 {
        now_ms as u64
    } else {
        0
    }
}

// ---------------------------------------------------------------------------
// TerminalDemo, the main exported struct
// ---------------------------------------------------------------------------
#[wasm_bindgen]
pub struct TerminalDemo {
    terminal: Terminal,
    archive: WorldArchive,
    last_view: TerminalView,
}

#[wasm_bindgen]
impl TerminalDemo {
    /// Create a terminal over a bundled story (`"onezerofour"`).
    #[wasm_bindgen(constructor)]
    pub fn new(story: &str) -> Result<TerminalDemo, JsError> {
        let source = match story {
            "onezerofour" => data::ONEZEROFOUR_STORY,
            _ => return Err(JsError::new(&format!("Unknown story: {story}"))),
        };
        let repository =
            StoryRepository::parse_ron(source).map_err(|e| to_js_error("Story load error", e))?;
        Self::with_repository(repository, TerminalConfig::default())
    }

    /// Create a terminal over a JSON story document supplied by the page.
    /// `config_ron` may be empty to keep the default cadences.
    pub fn from_json(story_json: &str, config_ron: &str) -> Result<TerminalDemo, JsError> {
        let repository = StoryRepository::parse_json(story_json)
            .map_err(|e| to_js_error("Story load error", e))?;
        let config = if config_ron.trim().is_empty() {
            TerminalConfig::default()
        } else {
            TerminalConfig::parse_ron(config_ron).map_err(|e| to_js_error("Config error", e))?
        };
        Self::with_repository(repository, config)
    }

    /// Create a terminal over a legacy districts-list JSON document.
    pub fn from_legacy_json(story_json: &str) -> Result<TerminalDemo, JsError> {
        let repository = StoryRepository::parse_legacy_json(story_json)
            .map_err(|e| to_js_error("Story load error", e))?;
        Self::with_repository(repository, TerminalConfig::default())
    }

    pub fn open(&mut self, now_ms: f64) -> bool {
        self.terminal.open(host_time(now_ms));
        self.refresh()
    }

    pub fn close(&mut self, now_ms: f64) -> bool {
        self.terminal.close(host_time(now_ms));
        self.refresh()
    }

    pub fn select_scene(&mut self, id: &str, now_ms: f64) -> Result<bool, JsError> {
        self.terminal
            .select_scene(id, host_time(now_ms))
            .map_err(|e| to_js_error("Navigation error", e))?;
        Ok(self.refresh())
    }

    pub fn choose(&mut self, index: usize, now_ms: f64) -> Result<bool, JsError> {
        self.terminal
            .choose(index, host_time(now_ms))
            .map_err(|e| to_js_error("Navigation error", e))?;
        Ok(self.refresh())
    }

    pub fn advance(&mut self, now_ms: f64) -> bool {
        self.terminal.advance(host_time(now_ms));
        self.refresh()
    }

    pub fn navigate_back(&mut self, now_ms: f64) -> bool {
        self.terminal.navigate_back(host_time(now_ms));
        self.refresh()
    }

    /// Deliver due reveal ticks and timers. Returns whether the view changed.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        self.terminal.tick(host_time(now_ms));
        self.refresh()
    }

    /// JSON snapshot of `{displayed_text, stage, choices_visible, history_depth, ...}`.
    pub fn view(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.last_view).map_err(|e| to_js_error("Serialization error", e))
    }

    /// JSON description of the current world archive page.
    pub fn archive_page(&self) -> Result<String, JsError> {
        let page = ArchivePage {
            header: self.archive.header(),
            indicator: self.archive.indicator(),
            text: self.archive.current(),
            has_previous: self.archive.has_previous(),
            has_next: self.archive.has_next(),
        };
        serde_json::to_string(&page).map_err(|e| to_js_error("Serialization error", e))
    }

    pub fn archive_next(&mut self) -> bool {
        self.archive.next_page()
    }

    pub fn archive_previous(&mut self) -> bool {
        self.archive.previous_page()
    }

    pub fn archive_reset(&mut self) {
        self.archive.reset();
    }

    /// Return JSON array of bundled story identifiers.
    pub fn available_stories() -> String {
        serde_json::to_string(&["onezerofour"]).unwrap_or_else(|_| "[]".to_string())
    }
}

// Private helpers
impl TerminalDemo {
    fn with_repository(
        repository: StoryRepository,
        config: TerminalConfig,
    ) -> Result<TerminalDemo, JsError> {
        let archive = WorldArchive::from_story(&repository);
        let terminal = Terminal::builder(Arc::new(repository))
            .config(config)
            .build()
            .map_err(|e| to_js_error("Terminal build error", e))?;
        let last_view = terminal.view();
        Ok(TerminalDemo {
            terminal,
            archive,
            last_view,
        })
    }

    fn refresh(&mut self) -> bool {
        let view = self.terminal.view();
        if view == self.last_view {
            return false;
        }
        self.last_view = view;
        true
    }
}
