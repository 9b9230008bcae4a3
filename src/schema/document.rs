use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::scene::Choice;

/// The story document as authored: one entry scene, a keyed scene
/// collection and the world archive pages.
///
/// Field names are snake_case; the camelCase spellings used by the JSON
/// content of the web front end are accepted as aliases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryDocument {
    #[serde(alias = "initialScene")]
    pub initial_scene: InitialSceneDef,
    pub scenes: FxHashMap<String, SceneDef>,
    #[serde(default)]
    pub world: Vec<String>,
}

/// The entry scene. Its text is typed out when the terminal opens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitialSceneDef {
    pub text: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
}

/// A scene body; the id is the key it is stored under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneDef {
    #[serde(default)]
    pub name: Option<String>,
    pub narratives: Vec<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
}

// The older districts-list shape. It is never read as a `StoryDocument`
// directly; it goes through `into_document`.

#[derive(Debug, Clone, Deserialize)]
pub struct LegacyDistrictDocument {
    #[serde(alias = "initialConnection")]
    pub initial_connection: LegacyIntro,
    pub districts: Vec<LegacyDistrict>,
    #[serde(default)]
    pub world: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LegacyIntro {
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LegacyDistrict {
    pub id: String,
    pub name: String,
    pub narratives: Vec<String>,
}

impl LegacyDistrictDocument {
    /// Convert to the keyed-scenes shape. Each district becomes a scene and,
    /// in list order, a choice on the entry scene.
    pub fn into_document(self) -> StoryDocument {
        let mut choices = Vec::with_capacity(self.districts.len());
        let mut scenes = FxHashMap::default();

        for district in self.districts {
            choices.push(Choice {
                text: district.name.clone(),
                next_scene: district.id.clone(),
            });
            scenes.insert(
                district.id,
                SceneDef {
                    name: Some(district.name),
                    narratives: district.narratives,
                    choices: Vec::new(),
                },
            );
        }

        StoryDocument {
            initial_scene: InitialSceneDef {
                text: self.initial_connection.text,
                choices,
            },
            scenes,
            world: self.world,
        }
    }
}
