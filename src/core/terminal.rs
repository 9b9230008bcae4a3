/// Terminal runner: drives the navigation state machine.
///
/// Owns the typewriter and the pending timers, executes the effects each
/// transition asks for and turns reveal/timer results back into events.
/// The host supplies time (`now_ms`) and calls `tick` from its event loop.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::config::TerminalConfig;
use crate::core::navigation::{
    transition, Effect, NavEvent, NavigationState, RevealPurpose, Stage, TimerKind, Transition,
};
use crate::core::story::{StoryError, StoryRepository};
use crate::core::typewriter::{RevealToken, RevealUpdate, Typewriter};
use crate::schema::scene::Choice;

#[derive(Debug, Error)]
pub enum TerminalError {
    #[error("story error: {0}")]
    Story(#[from] StoryError),
    #[error("choice index {0} is out of range")]
    ChoiceOutOfRange(usize),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// What the presentation layer renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TerminalView {
    pub stage: Stage,
    pub displayed_text: String,
    pub choices_visible: bool,
    pub history_depth: usize,
    pub scene_id: Option<String>,
    pub scene_name: Option<String>,
    pub narrative_index: usize,
    pub narrative_count: usize,
    /// Empty while choices are hidden.
    pub choices: Vec<Choice>,
    pub typing: bool,
    pub closing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&TerminalView)>;

/// The interactive terminal. Built via `Terminal::builder(story)`.
pub struct Terminal {
    story: Arc<StoryRepository>,
    config: TerminalConfig,
    state: NavigationState,
    typewriter: Typewriter<RevealPurpose>,
    active_reveal: Option<RevealToken>,
    timers: Vec<(TimerKind, u64)>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
    last_view: Option<TerminalView>,
}

/// Builder for constructing a `Terminal`.
pub struct TerminalBuilder {
    story: Arc<StoryRepository>,
    config: TerminalConfig,
    config_path: Option<PathBuf>,
    tick_interval_ms: Option<u64>,
    intro_pause_ms: Option<u64>,
    close_delay_ms: Option<u64>,
}

impl Terminal {
    pub fn builder(story: Arc<StoryRepository>) -> TerminalBuilder {
        TerminalBuilder {
            story,
            config: TerminalConfig::default(),
            config_path: None,
            tick_interval_ms: None,
            intro_pause_ms: None,
            close_delay_ms: None,
        }
    }

    /// Open the terminal and start typing the intro.
    pub fn open(&mut self, now_ms: u64) {
        info!("terminal opened");
        self.run(NavEvent::Open, now_ms);
    }

    /// Start the closing transition; state resets once it elapses.
    pub fn close(&mut self, now_ms: u64) {
        info!("terminal close requested");
        self.run(NavEvent::Close, now_ms);
    }

    /// Enter the scene `id`.
    ///
    /// Ignored while choices are hidden. An unknown id is reported as
    /// `SceneNotFound` and leaves the terminal exactly as it was.
    pub fn select_scene(&mut self, id: &str, now_ms: u64) -> Result<(), TerminalError> {
        if !self.state.accepts_selection() {
            debug!(scene = id, stage = %self.state.stage(), "selection ignored, choices hidden");
            return Ok(());
        }
        let scene = self.story.scene(id)?;
        self.run(NavEvent::SelectScene(scene), now_ms);
        Ok(())
    }

    /// Take the `index`th entry of the menu currently on screen.
    pub fn choose(&mut self, index: usize, now_ms: u64) -> Result<(), TerminalError> {
        if !self.state.accepts_selection() {
            debug!(index, stage = %self.state.stage(), "choice ignored, choices hidden");
            return Ok(());
        }
        let target = self
            .state
            .menu()
            .get(index)
            .map(|choice| choice.next_scene.clone())
            .ok_or(TerminalError::ChoiceOutOfRange(index))?;
        info!(index, target = %target, "choice taken");
        self.select_scene(&target, now_ms)
    }

    /// Move to the next narrative of the current scene, wrapping at the end.
    pub fn advance(&mut self, now_ms: u64) {
        self.run(NavEvent::Advance, now_ms);
    }

    /// Step back through history, showing the restored text at once.
    pub fn navigate_back(&mut self, now_ms: u64) {
        self.run(NavEvent::Back, now_ms);
    }

    /// Deliver everything that has come due by `now_ms`.
    pub fn tick(&mut self, now_ms: u64) {
        self.settle(now_ms);
        self.notify();
    }

    pub fn view(&self) -> TerminalView {
        let scene = self.state.current_scene();
        let choices_visible = self.state.choices_visible();
        TerminalView {
            stage: self.state.stage(),
            displayed_text: self.state.displayed_text().to_string(),
            choices_visible,
            history_depth: self.state.history_depth(),
            scene_id: scene.map(|s| s.id.clone()),
            scene_name: scene.and_then(|s| s.name.clone()),
            narrative_index: self.state.narrative_index(),
            narrative_count: scene.map_or(0, |s| s.narratives.len()),
            choices: if choices_visible {
                self.state.menu().to_vec()
            } else {
                Vec::new()
            },
            typing: self.typewriter.is_active(),
            closing: self.state.is_closing(),
        }
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    pub fn story(&self) -> &StoryRepository {
        &self.story
    }

    pub fn config(&self) -> &TerminalConfig {
        &self.config
    }

    pub fn is_typing(&self) -> bool {
        self.typewriter.is_active()
    }

    /// Earliest pending timer deadline, for hosts that sleep between ticks.
    pub fn next_timer_at(&self) -> Option<u64> {
        self.timers.iter().map(|(_, due)| *due).min()
    }

    /// Call `listener` whenever an operation changes the view.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&TerminalView) + 'static,
    {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.listeners.push((id, Box::new(listener)));
        if self.last_view.is_none() {
            self.last_view = Some(self.view());
        }
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        if self.listeners.is_empty() {
            self.last_view = None;
        }
        self.listeners.len() != before
    }

    fn run(&mut self, event: NavEvent, now_ms: u64) {
        self.dispatch(event, now_ms);
        self.settle(now_ms);
        self.notify();
    }

    fn dispatch(&mut self, event: NavEvent, now_ms: u64) {
        let Transition { state, effects } = transition(&self.state, event);
        self.state = state;
        for effect in effects {
            self.apply(effect, now_ms);
        }
    }

    fn apply(&mut self, effect: Effect, now_ms: u64) {
        match effect {
            Effect::StartReveal { text, purpose } => {
                let token = self.typewriter.start(text, purpose, now_ms);
                self.active_reveal = Some(token);
            }
            Effect::CancelReveal => {
                self.typewriter.cancel();
                self.active_reveal = None;
            }
            Effect::StartTimer(kind) => {
                let delay = match kind {
                    TimerKind::IntroPause => self.config.intro_pause_ms,
                    TimerKind::CloseDelay => self.config.close_delay_ms,
                };
                self.timers.retain(|(existing, _)| *existing != kind);
                self.timers.push((kind, now_ms.saturating_add(delay)));
            }
            Effect::CancelTimers => self.timers.clear(),
        }
    }

    /// Feed due reveal updates and timers into the state machine until
    /// nothing more is due at `now_ms`.
    fn settle(&mut self, now_ms: u64) {
        loop {
            if let Some(update) = self.typewriter.poll(now_ms) {
                let token = match &update {
                    RevealUpdate::Progress { token, .. } | RevealUpdate::Complete { token, .. } => {
                        *token
                    }
                };
                if self.active_reveal != Some(token) {
                    warn!("dropping update from a superseded reveal");
                    continue;
                }
                let event = match update {
                    RevealUpdate::Progress { text, .. } => NavEvent::RevealProgress(text),
                    RevealUpdate::Complete { text, payload, .. } => {
                        self.active_reveal = None;
                        NavEvent::RevealCompleted {
                            purpose: payload,
                            text,
                        }
                    }
                };
                self.dispatch(event, now_ms);
                continue;
            }

            match self.take_due_timer(now_ms) {
                Some(kind) => self.dispatch(NavEvent::TimerElapsed(kind), now_ms),
                None => break,
            }
        }
    }

    fn take_due_timer(&mut self, now_ms: u64) -> Option<TimerKind> {
        let position = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, (_, due))| *due <= now_ms)
            .min_by_key(|(_, (_, due))| *due)
            .map(|(i, _)| i)?;
        Some(self.timers.remove(position).0)
    }

    fn notify(&mut self) {
        if self.listeners.is_empty() {
            return;
        }
        let view = self.view();
        if self.last_view.as_ref() == Some(&view) {
            return;
        }
        for (_, listener) in self.listeners.iter_mut() {
            listener(&view);
        }
        self.last_view = Some(view);
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        if self.typewriter.cancel() {
            debug!("reveal cancelled on teardown");
        }
        self.timers.clear();
    }
}

impl TerminalBuilder {
    pub fn config(mut self, config: TerminalConfig) -> Self {
        self.config = config;
        self
    }

    /// Read the configuration from a RON file at build time. Replaces
    /// anything passed to `config`; the individual setters still win.
    pub fn config_file(mut self, path: &Path) -> Self {
        self.config_path = Some(path.to_path_buf());
        self
    }

    pub fn tick_interval_ms(mut self, ms: u64) -> Self {
        self.tick_interval_ms = Some(ms);
        self
    }

    pub fn intro_pause_ms(mut self, ms: u64) -> Self {
        self.intro_pause_ms = Some(ms);
        self
    }

    pub fn close_delay_ms(mut self, ms: u64) -> Self {
        self.close_delay_ms = Some(ms);
        self
    }

    pub fn build(self) -> Result<Terminal, TerminalError> {
        let mut config = match self.config_path {
            Some(ref path) => TerminalConfig::load_from_ron(path)?,
            None => self.config,
        };
        if let Some(ms) = self.tick_interval_ms {
            config.tick_interval_ms = ms;
        }
        if let Some(ms) = self.intro_pause_ms {
            config.intro_pause_ms = ms;
        }
        if let Some(ms) = self.close_delay_ms {
            config.close_delay_ms = ms;
        }
        config.validate()?;

        let state = NavigationState::new(self.story.initial_scene());
        Ok(Terminal {
            story: self.story,
            config,
            state,
            typewriter: Typewriter::new(config.tick_interval_ms),
            active_reveal: None,
            timers: Vec::new(),
            listeners: Vec::new(),
            next_subscription: 0,
            last_view: None,
        })
    }
}
