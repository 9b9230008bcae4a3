/// Story repository: loads, validates and serves the scene graph.

use rustc_hash::FxHashMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::schema::document::{LegacyDistrictDocument, StoryDocument};
use crate::schema::scene::{Choice, Scene, INITIAL_SCENE_ID};

/// Why a story document was rejected.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("JSON deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Structure(String),
}

#[derive(Debug, Error)]
pub enum StoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid story content: {0}")]
    InvalidContent(#[from] ContentError),
    #[error("scene not found: {0}")]
    SceneNotFound(String),
}

/// Validated, read-only view of a story document.
///
/// Scenes are handed out as `Arc<Scene>` so navigation history can hold on
/// to them without copying narrative text.
#[derive(Debug, Clone)]
pub struct StoryRepository {
    initial: Arc<Scene>,
    scenes: FxHashMap<String, Arc<Scene>>,
    world: Vec<String>,
}

impl StoryRepository {
    /// Validate a document and build the repository from it.
    pub fn load(document: StoryDocument) -> Result<StoryRepository, StoryError> {
        if document.scenes.is_empty() {
            return Err(structure("story defines no scenes"));
        }

        let mut scenes = FxHashMap::default();
        for (id, def) in document.scenes {
            if id.trim().is_empty() {
                return Err(structure("scene with an empty id"));
            }
            if id == INITIAL_SCENE_ID {
                return Err(structure(format!(
                    "scene id '{}' is reserved for the entry scene",
                    INITIAL_SCENE_ID
                )));
            }
            let scene = Scene {
                id: id.clone(),
                name: def.name,
                narratives: def.narratives,
                choices: def.choices,
            };
            scenes.insert(id, Arc::new(scene));
        }

        // Without authored choices the entry menu lists every scene.
        let mut menu = document.initial_scene.choices;
        if menu.is_empty() {
            let mut all: Vec<&Arc<Scene>> = scenes.values().collect();
            all.sort_by(|a, b| a.id.cmp(&b.id));
            menu = all
                .into_iter()
                .map(|scene| Choice {
                    text: scene.title().to_string(),
                    next_scene: scene.id.clone(),
                })
                .collect();
        }

        let initial = Arc::new(Scene {
            id: INITIAL_SCENE_ID.to_string(),
            name: None,
            narratives: vec![document.initial_scene.text],
            choices: menu,
        });

        info!(
            scenes = scenes.len(),
            world_pages = document.world.len(),
            "story loaded"
        );

        Ok(StoryRepository {
            initial,
            scenes,
            world: document.world,
        })
    }

    /// Parse and validate a story from a RON string.
    pub fn parse_ron(input: &str) -> Result<StoryRepository, StoryError> {
        let document: StoryDocument = ron::from_str(input).map_err(ContentError::from)?;
        Self::load(document)
    }

    /// Parse and validate a story from a JSON string.
    pub fn parse_json(input: &str) -> Result<StoryRepository, StoryError> {
        let document: StoryDocument =
            serde_json::from_str(input).map_err(ContentError::from)?;
        Self::load(document)
    }

    /// Parse a districts-list JSON document through the legacy adapter.
    pub fn parse_legacy_json(input: &str) -> Result<StoryRepository, StoryError> {
        let legacy: LegacyDistrictDocument =
            serde_json::from_str(input).map_err(ContentError::from)?;
        Self::load(legacy.into_document())
    }

    /// Load a story from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<StoryRepository, StoryError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Load a story from a JSON file.
    pub fn load_from_json(path: &Path) -> Result<StoryRepository, StoryError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_json(&contents)
    }

    /// The entry scene, stamped with the id `initial`.
    pub fn initial_scene(&self) -> Arc<Scene> {
        Arc::clone(&self.initial)
    }

    /// Look up a scene. `initial` is an alias for the entry scene.
    pub fn scene(&self, id: &str) -> Result<Arc<Scene>, StoryError> {
        if id == INITIAL_SCENE_ID {
            return Ok(self.initial_scene());
        }
        match self.scenes.get(id) {
            Some(scene) => Ok(Arc::clone(scene)),
            None => {
                warn!(scene = id, "scene lookup failed");
                Err(StoryError::SceneNotFound(id.to_string()))
            }
        }
    }

    /// Static lore pages for the world archive, in authored order.
    pub fn world_content(&self) -> &[String] {
        &self.world
    }

    /// Ids of every keyed scene, sorted.
    pub fn scene_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.scenes.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}

fn structure(message: impl Into<String>) -> StoryError {
    StoryError::InvalidContent(ContentError::Structure(message.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_SCENES: &str = r#"(
        initial_scene: (
            text: "HELLO",
            choices: [(text: "Enter A", next_scene: "a")],
        ),
        scenes: {
            "a": (narratives: ["X", "Y"], choices: [(text: "To B", next_scene: "b")]),
            "b": (name: Some("Bee"), narratives: ["Z"]),
        },
        world: ["lore one", "lore two"],
    )"#;

    #[test]
    fn initial_scene_is_stamped() {
        let story = StoryRepository::parse_ron(TWO_SCENES).unwrap();
        let initial = story.initial_scene();
        assert_eq!(initial.id, INITIAL_SCENE_ID);
        assert_eq!(initial.narratives, vec!["HELLO"]);
        assert_eq!(initial.choices.len(), 1);
    }

    #[test]
    fn scene_lookup() {
        let story = StoryRepository::parse_ron(TWO_SCENES).unwrap();
        let a = story.scene("a").unwrap();
        assert_eq!(a.id, "a");
        assert_eq!(a.narratives, vec!["X", "Y"]);
        assert_eq!(story.scene("b").unwrap().title(), "Bee");
    }

    #[test]
    fn initial_alias_returns_entry_scene() {
        let story = StoryRepository::parse_ron(TWO_SCENES).unwrap();
        let scene = story.scene("initial").unwrap();
        assert!(Arc::ptr_eq(&scene, &story.initial_scene()));
    }

    #[test]
    fn unknown_scene_is_not_found() {
        let story = StoryRepository::parse_ron(TWO_SCENES).unwrap();
        match story.scene("nowhere") {
            Err(StoryError::SceneNotFound(id)) => assert_eq!(id, "nowhere"),
            other => panic!("expected SceneNotFound, got {:?}", other),
        }
    }

    #[test]
    fn world_content_in_order() {
        let story = StoryRepository::parse_ron(TWO_SCENES).unwrap();
        assert_eq!(story.world_content(), &["lore one", "lore two"]);
    }

    #[test]
    fn malformed_ron_is_invalid_content() {
        let err = StoryRepository::parse_ron("(initial_scene: (text: ").unwrap_err();
        assert!(matches!(err, StoryError::InvalidContent(ContentError::Ron(_))));
    }

    #[test]
    fn missing_root_scene_is_invalid_content() {
        let err = StoryRepository::parse_json(r#"{"scenes": {"a": {"narratives": ["X"]}}}"#)
            .unwrap_err();
        assert!(matches!(err, StoryError::InvalidContent(ContentError::Json(_))));
    }

    #[test]
    fn empty_scene_collection_is_rejected() {
        let err = StoryRepository::parse_ron(r#"(initial_scene: (text: "hi"), scenes: {})"#)
            .unwrap_err();
        assert!(matches!(
            err,
            StoryError::InvalidContent(ContentError::Structure(_))
        ));
    }

    #[test]
    fn reserved_scene_id_is_rejected() {
        let input = r#"(
            initial_scene: (text: "hi"),
            scenes: {"initial": (narratives: ["X"])},
        )"#;
        let err = StoryRepository::parse_ron(input).unwrap_err();
        assert!(err.to_string().contains("reserved"));
    }

    #[test]
    fn menu_defaults_to_every_scene_by_id() {
        let input = r#"(
            initial_scene: (text: "hi"),
            scenes: {
                "zeta": (narratives: ["z"]),
                "alpha": (name: Some("Alpha Block"), narratives: ["a"]),
            },
        )"#;
        let story = StoryRepository::parse_ron(input).unwrap();
        let menu = &story.initial_scene().choices;
        assert_eq!(menu.len(), 2);
        assert_eq!(menu[0].next_scene, "alpha");
        assert_eq!(menu[0].text, "Alpha Block");
        assert_eq!(menu[1].text, "zeta");
    }

    #[test]
    fn choice_targets_are_not_checked_at_load() {
        let input = r#"(
            initial_scene: (text: "hi", choices: [(text: "?", next_scene: "missing")]),
            scenes: {"a": (narratives: ["X"])},
        )"#;
        assert!(StoryRepository::parse_ron(input).is_ok());
    }

    #[test]
    fn scene_ids_sorted() {
        let story = StoryRepository::parse_ron(TWO_SCENES).unwrap();
        assert_eq!(story.scene_ids(), vec!["a", "b"]);
        assert_eq!(story.len(), 2);
        assert!(!story.is_empty());
    }
}
