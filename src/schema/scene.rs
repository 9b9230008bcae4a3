use serde::{Deserialize, Serialize};

/// Identifier the story repository stamps on the entry scene.
pub const INITIAL_SCENE_ID: &str = "initial";

/// A labelled transition from one scene to another by identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub text: String,
    #[serde(alias = "nextScene")]
    pub next_scene: String,
}

/// A node in the story graph: an ordered run of narrative blocks plus the
/// choices offered once a block has finished typing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    pub id: String,
    pub name: Option<String>,
    pub narratives: Vec<String>,
    pub choices: Vec<Choice>,
}

impl Scene {
    /// The narrative block at `index`, if there is one.
    pub fn narrative(&self, index: usize) -> Option<&str> {
        self.narratives.get(index).map(String::as_str)
    }

    /// A scene can only be entered when it has something to show.
    pub fn is_enterable(&self) -> bool {
        !self.narratives.is_empty()
    }

    /// Index that follows `index`, wrapping back to the first block after
    /// the last one. `None` for a scene without narratives.
    pub fn next_index(&self, index: usize) -> Option<usize> {
        if self.narratives.is_empty() {
            return None;
        }
        Some((index + 1) % self.narratives.len())
    }

    /// Display label: the name when one is given, otherwise the id.
    pub fn title(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn is_initial(&self) -> bool {
        self.id == INITIAL_SCENE_ID
    }
}
