//! Navigation state machine.
//!
//! Modelled as a pure function:
//! ```text
//! NavigationState × NavEvent → (NavigationState, Vec<Effect>)
//! ```
//! `transition` never touches a clock or the typewriter. It only describes
//! what should happen next through `Effect`s; the `Terminal` runner carries
//! those out and feeds reveal/timer results back in as events.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::schema::scene::{Choice, Scene};

/// Where the terminal is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    TypingIntro,
    SceneSelect,
    SceneExploration,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::TypingIntro => "typing_intro",
            Self::SceneSelect => "scene_select",
            Self::SceneExploration => "scene_exploration",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A history entry. Only the stages a forward navigation can leave from
/// are representable, and an exploration entry always carries its scene.
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    SceneSelect,
    SceneExploration {
        scene: Arc<Scene>,
        narrative_index: usize,
    },
}

impl Snapshot {
    pub fn stage(&self) -> Stage {
        match self {
            Self::SceneSelect => Stage::SceneSelect,
            Self::SceneExploration { .. } => Stage::SceneExploration,
        }
    }
}

/// What a reveal was started for; comes back with its completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealPurpose {
    Intro,
    Narrative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    IntroPause,
    CloseDelay,
}

#[derive(Debug, Clone)]
pub enum NavEvent {
    Open,
    SelectScene(Arc<Scene>),
    Advance,
    Back,
    Close,
    RevealProgress(String),
    RevealCompleted { purpose: RevealPurpose, text: String },
    TimerElapsed(TimerKind),
}

/// Side effects requested by a transition, in the order they must run.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Start typing `text`. Implies cancelling whatever is typing now.
    StartReveal { text: String, purpose: RevealPurpose },
    CancelReveal,
    StartTimer(TimerKind),
    CancelTimers,
}

#[derive(Debug, Clone)]
pub struct Transition {
    pub state: NavigationState,
    pub effects: Vec<Effect>,
}

/// Everything the terminal shows, minus the live reveal and timers.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationState {
    intro: Arc<Scene>,
    stage: Stage,
    current_scene: Option<Arc<Scene>>,
    narrative_index: usize,
    history: Vec<Snapshot>,
    displayed_text: String,
    choices_visible: bool,
    closing: bool,
}

impl NavigationState {
    /// A closed terminal. `intro` is the entry scene typed out on open.
    pub fn new(intro: Arc<Scene>) -> Self {
        Self {
            intro,
            stage: Stage::Idle,
            current_scene: None,
            narrative_index: 0,
            history: Vec::new(),
            displayed_text: String::new(),
            choices_visible: false,
            closing: false,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn intro(&self) -> &Arc<Scene> {
        &self.intro
    }

    pub fn current_scene(&self) -> Option<&Arc<Scene>> {
        self.current_scene.as_ref()
    }

    pub fn narrative_index(&self) -> usize {
        self.narrative_index
    }

    pub fn history(&self) -> &[Snapshot] {
        &self.history
    }

    pub fn history_depth(&self) -> usize {
        self.history.len()
    }

    pub fn displayed_text(&self) -> &str {
        &self.displayed_text
    }

    pub fn choices_visible(&self) -> bool {
        self.choices_visible
    }

    pub fn is_closing(&self) -> bool {
        self.closing
    }

    /// Whether a scene selection would be considered right now.
    pub fn accepts_selection(&self) -> bool {
        !self.closing
            && self.choices_visible
            && matches!(self.stage, Stage::SceneSelect | Stage::SceneExploration)
    }

    /// The choices belonging to the current position, visible or not.
    pub fn menu(&self) -> &[Choice] {
        match (self.stage, &self.current_scene) {
            (Stage::SceneSelect, _) => self.intro.choices.as_slice(),
            (Stage::SceneExploration, Some(scene)) => scene.choices.as_slice(),
            _ => &[],
        }
    }

    fn intro_text(&self) -> &str {
        self.intro.narrative(0).unwrap_or("")
    }

    fn snapshot(&self) -> Option<Snapshot> {
        match (self.stage, &self.current_scene) {
            (Stage::SceneSelect, _) => Some(Snapshot::SceneSelect),
            (Stage::SceneExploration, Some(scene)) => Some(Snapshot::SceneExploration {
                scene: Arc::clone(scene),
                narrative_index: self.narrative_index,
            }),
            _ => None,
        }
    }

    /// Apply a snapshot in full and show its text without retyping.
    fn restore(&mut self, snapshot: Snapshot) {
        match snapshot {
            Snapshot::SceneSelect => {
                self.stage = Stage::SceneSelect;
                self.current_scene = None;
                self.narrative_index = 0;
                self.displayed_text = self.intro_text().to_string();
            }
            Snapshot::SceneExploration {
                scene,
                narrative_index,
            } => {
                self.stage = Stage::SceneExploration;
                self.displayed_text = scene.narrative(narrative_index).unwrap_or("").to_string();
                self.current_scene = Some(scene);
                self.narrative_index = narrative_index;
            }
        }
        self.choices_visible = true;
    }

    fn begin_reveal(&mut self) {
        self.displayed_text.clear();
        self.choices_visible = false;
    }
}

/// Compute the state that follows `event`, plus the effects to run.
///
/// Events that do not apply in the current state (back with no history,
/// advance without a scene, selection while choices are hidden, anything
/// while closing) leave the state untouched and request no effects.
pub fn transition(state: &NavigationState, event: NavEvent) -> Transition {
    let mut next = state.clone();
    let mut effects = Vec::new();

    match event {
        NavEvent::Open => {
            if state.stage != Stage::Idle || state.closing {
                debug!(stage = %state.stage, "open ignored");
            } else {
                next = NavigationState::new(Arc::clone(&state.intro));
                next.stage = Stage::TypingIntro;
                effects.push(Effect::CancelTimers);
                effects.push(Effect::StartReveal {
                    text: state.intro_text().to_string(),
                    purpose: RevealPurpose::Intro,
                });
                debug!("terminal opening");
            }
        }

        NavEvent::SelectScene(scene) => {
            let same = state
                .current_scene
                .as_ref()
                .is_some_and(|current| current.id == scene.id);
            match state.snapshot() {
                Some(snapshot) if state.accepts_selection() && !same && scene.is_enterable() => {
                    next.history.push(snapshot);
                    next.stage = Stage::SceneExploration;
                    next.narrative_index = 0;
                    next.begin_reveal();
                    effects.push(Effect::StartReveal {
                        text: scene.narratives[0].clone(),
                        purpose: RevealPurpose::Narrative,
                    });
                    debug!(scene = %scene.id, depth = next.history.len(), "scene selected");
                    next.current_scene = Some(scene);
                }
                _ => {
                    debug!(scene = %scene.id, stage = %state.stage, "selection ignored");
                }
            }
        }

        NavEvent::Advance => {
            let target = match (&state.current_scene, state.stage, state.closing) {
                (Some(scene), Stage::SceneExploration, false) => scene
                    .next_index(state.narrative_index)
                    .map(|index| (Arc::clone(scene), index)),
                _ => None,
            };
            match (target, state.snapshot()) {
                (Some((scene, index)), Some(snapshot)) => {
                    next.history.push(snapshot);
                    next.narrative_index = index;
                    next.begin_reveal();
                    effects.push(Effect::StartReveal {
                        text: scene.narratives[index].clone(),
                        purpose: RevealPurpose::Narrative,
                    });
                    debug!(scene = %scene.id, index, "narrative advanced");
                }
                _ => debug!(stage = %state.stage, "advance ignored"),
            }
        }

        NavEvent::Back => {
            if state.closing {
                debug!("back ignored while closing");
            } else if let Some(snapshot) = next.history.pop() {
                next.restore(snapshot);
                effects.push(Effect::CancelReveal);
                debug!(
                    stage = %next.stage,
                    index = next.narrative_index,
                    depth = next.history.len(),
                    "navigated back"
                );
            } else {
                debug!("back ignored, history empty");
            }
        }

        NavEvent::Close => {
            if state.closing || state.stage == Stage::Idle {
                debug!(stage = %state.stage, "close ignored");
            } else {
                next.closing = true;
                next.choices_visible = false;
                effects.push(Effect::CancelReveal);
                effects.push(Effect::CancelTimers);
                effects.push(Effect::StartTimer(TimerKind::CloseDelay));
                debug!("terminal closing");
            }
        }

        NavEvent::RevealProgress(text) => {
            if !state.closing {
                next.displayed_text = text;
            }
        }

        NavEvent::RevealCompleted { purpose, text } => {
            if !state.closing {
                next.displayed_text = text;
                match purpose {
                    RevealPurpose::Intro if state.stage == Stage::TypingIntro => {
                        effects.push(Effect::StartTimer(TimerKind::IntroPause));
                    }
                    RevealPurpose::Intro => {}
                    RevealPurpose::Narrative => next.choices_visible = true,
                }
            }
        }

        NavEvent::TimerElapsed(TimerKind::IntroPause) => {
            if state.stage == Stage::TypingIntro && !state.closing {
                next.stage = Stage::SceneSelect;
                next.choices_visible = true;
                debug!("scene menu shown");
            }
        }

        NavEvent::TimerElapsed(TimerKind::CloseDelay) => {
            if state.closing {
                next = NavigationState::new(Arc::clone(&state.intro));
                debug!("terminal closed");
            }
        }
    }

    Transition {
        state: next,
        effects,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(id: &str, narratives: &[&str]) -> Arc<Scene> {
        Arc::new(Scene {
            id: id.to_string(),
            name: None,
            narratives: narratives.iter().map(|s| s.to_string()).collect(),
            choices: Vec::new(),
        })
    }

    fn intro() -> Arc<Scene> {
        Arc::new(Scene {
            id: "initial".to_string(),
            name: None,
            narratives: vec!["HELLO".to_string()],
            choices: vec![Choice {
                text: "A".to_string(),
                next_scene: "a".to_string(),
            }],
        })
    }

    fn step(state: &NavigationState, event: NavEvent) -> NavigationState {
        transition(state, event).state
    }

    /// Open and let the intro finish: the terminal sits in the scene menu.
    fn at_menu() -> NavigationState {
        let mut state = NavigationState::new(intro());
        state = step(&state, NavEvent::Open);
        state = step(
            &state,
            NavEvent::RevealCompleted {
                purpose: RevealPurpose::Intro,
                text: "HELLO".to_string(),
            },
        );
        step(&state, NavEvent::TimerElapsed(TimerKind::IntroPause))
    }

    fn finish_narrative(state: &NavigationState) -> NavigationState {
        let text = state
            .current_scene()
            .and_then(|s| s.narrative(state.narrative_index()))
            .unwrap_or("")
            .to_string();
        step(
            state,
            NavEvent::RevealCompleted {
                purpose: RevealPurpose::Narrative,
                text,
            },
        )
    }

    #[test]
    fn open_starts_intro_reveal() {
        let state = NavigationState::new(intro());
        let t = transition(&state, NavEvent::Open);
        assert_eq!(t.state.stage(), Stage::TypingIntro);
        assert_eq!(
            t.effects,
            vec![
                Effect::CancelTimers,
                Effect::StartReveal {
                    text: "HELLO".to_string(),
                    purpose: RevealPurpose::Intro
                }
            ]
        );
    }

    #[test]
    fn open_twice_is_ignored() {
        let state = step(&NavigationState::new(intro()), NavEvent::Open);
        let t = transition(&state, NavEvent::Open);
        assert_eq!(t.state, state);
        assert!(t.effects.is_empty());
    }

    #[test]
    fn intro_completion_schedules_pause_then_menu() {
        let state = step(&NavigationState::new(intro()), NavEvent::Open);
        let t = transition(
            &state,
            NavEvent::RevealCompleted {
                purpose: RevealPurpose::Intro,
                text: "HELLO".to_string(),
            },
        );
        assert_eq!(t.effects, vec![Effect::StartTimer(TimerKind::IntroPause)]);
        assert_eq!(t.state.stage(), Stage::TypingIntro);
        assert!(!t.state.choices_visible());

        let menu = step(&t.state, NavEvent::TimerElapsed(TimerKind::IntroPause));
        assert_eq!(menu.stage(), Stage::SceneSelect);
        assert!(menu.choices_visible());
        assert_eq!(menu.displayed_text(), "HELLO");
        assert_eq!(menu.menu().len(), 1);
    }

    #[test]
    fn select_pushes_history_and_types_first_narrative() {
        let state = at_menu();
        let t = transition(&state, NavEvent::SelectScene(scene("a", &["X", "Y"])));
        assert_eq!(t.state.stage(), Stage::SceneExploration);
        assert_eq!(t.state.narrative_index(), 0);
        assert_eq!(t.state.history(), &[Snapshot::SceneSelect]);
        assert_eq!(t.state.displayed_text(), "");
        assert!(!t.state.choices_visible());
        assert_eq!(
            t.effects,
            vec![Effect::StartReveal {
                text: "X".to_string(),
                purpose: RevealPurpose::Narrative
            }]
        );
    }

    #[test]
    fn select_is_gated_on_visible_choices() {
        let state = step(&NavigationState::new(intro()), NavEvent::Open);
        let t = transition(&state, NavEvent::SelectScene(scene("a", &["X"])));
        assert_eq!(t.state, state);
        assert!(t.effects.is_empty());
    }

    #[test]
    fn select_same_scene_is_ignored() {
        let a = scene("a", &["X"]);
        let state = finish_narrative(&step(&at_menu(), NavEvent::SelectScene(Arc::clone(&a))));
        let t = transition(&state, NavEvent::SelectScene(a));
        assert_eq!(t.state, state);
    }

    #[test]
    fn select_scene_without_narratives_is_ignored() {
        let state = at_menu();
        let t = transition(&state, NavEvent::SelectScene(scene("empty", &[])));
        assert_eq!(t.state, state);
        assert!(t.effects.is_empty());
    }

    #[test]
    fn advance_wraps_cyclically() {
        let narratives = ["one", "two", "three", "four"];
        let mut state = step(&at_menu(), NavEvent::SelectScene(scene("a", &narratives)));
        for expected in [1, 2, 3, 0] {
            state = step(&state, NavEvent::Advance);
            assert_eq!(state.narrative_index(), expected);
        }
    }

    #[test]
    fn advance_outside_exploration_is_ignored() {
        let state = at_menu();
        let t = transition(&state, NavEvent::Advance);
        assert_eq!(t.state, state);
        assert!(t.effects.is_empty());

        let idle = NavigationState::new(intro());
        assert_eq!(step(&idle, NavEvent::Advance), idle);
    }

    #[test]
    fn back_restores_snapshot_without_retyping() {
        let mut state = step(&at_menu(), NavEvent::SelectScene(scene("a", &["X", "Y"])));
        state = step(&state, NavEvent::Advance);
        assert_eq!(state.history_depth(), 2);

        let t = transition(&state, NavEvent::Back);
        assert_eq!(t.effects, vec![Effect::CancelReveal]);
        assert_eq!(t.state.narrative_index(), 0);
        assert_eq!(t.state.displayed_text(), "X");
        assert!(t.state.choices_visible());
        assert_eq!(t.state.history_depth(), 1);

        let menu = step(&t.state, NavEvent::Back);
        assert_eq!(menu.stage(), Stage::SceneSelect);
        assert!(menu.current_scene().is_none());
        assert_eq!(menu.displayed_text(), "HELLO");
    }

    #[test]
    fn back_with_empty_history_is_ignored() {
        let state = at_menu();
        let t = transition(&state, NavEvent::Back);
        assert_eq!(t.state, state);
        assert!(t.effects.is_empty());
    }

    #[test]
    fn forward_then_back_is_identity_on_position() {
        let a = scene("a", &["a1", "a2", "a3"]);
        let b = scene("b", &["b1"]);
        let start = at_menu();

        let mut state = finish_narrative(&step(&start, NavEvent::SelectScene(a)));
        state = step(&state, NavEvent::Advance);
        state = step(&state, NavEvent::Advance);
        state = finish_narrative(&state);
        state = step(&state, NavEvent::SelectScene(b));
        state = step(&state, NavEvent::Advance);

        for _ in 0..5 {
            state = step(&state, NavEvent::Back);
        }
        assert_eq!(state.stage(), start.stage());
        assert_eq!(state.current_scene(), start.current_scene());
        assert_eq!(state.narrative_index(), start.narrative_index());
        assert_eq!(state.history_depth(), 0);
    }

    #[test]
    fn close_then_delay_resets() {
        let state = step(&at_menu(), NavEvent::SelectScene(scene("a", &["X"])));
        let t = transition(&state, NavEvent::Close);
        assert!(t.state.is_closing());
        assert_eq!(
            t.effects,
            vec![
                Effect::CancelReveal,
                Effect::CancelTimers,
                Effect::StartTimer(TimerKind::CloseDelay)
            ]
        );

        // Navigation is frozen while closing.
        assert_eq!(step(&t.state, NavEvent::Back), t.state);
        assert_eq!(step(&t.state, NavEvent::Advance), t.state);

        let closed = step(&t.state, NavEvent::TimerElapsed(TimerKind::CloseDelay));
        assert_eq!(closed, NavigationState::new(intro()));
    }

    #[test]
    fn close_when_idle_is_ignored() {
        let state = NavigationState::new(intro());
        let t = transition(&state, NavEvent::Close);
        assert_eq!(t.state, state);
        assert!(t.effects.is_empty());
    }

    #[test]
    fn stale_intro_pause_after_close_is_ignored() {
        let state = step(&NavigationState::new(intro()), NavEvent::Open);
        let closing = step(&state, NavEvent::Close);
        let after = step(&closing, NavEvent::TimerElapsed(TimerKind::IntroPause));
        assert_eq!(after, closing);
    }
}
