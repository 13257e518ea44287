use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Clone, Deserialize)]
pub struct AuthenticationTokenData {
    #[serde(rename = "authenticationToken")]
    pub authentication_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthenticationData {
    pub authenticated: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentModelData {
    #[serde(rename = "modelLoaded")]
    pub model_loaded: bool,
    #[serde(rename = "modelID", default)]
    pub model_id: Option<String>,
    #[serde(rename = "modelName", default)]
    pub model_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    #[serde(rename = "modelName")]
    pub model_name: String,
    #[serde(rename = "modelID")]
    pub model_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvailableModelsData {
    #[serde(rename = "availableModels")]
    pub available_models: Vec<Model>,
}

/// Hotkey action type. Only two kinds matter to this client; everything else
/// is kept verbatim and filtered out when partitioning. A missing `type`
/// reads as an empty `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HotkeyKind {
    ToggleExpression,
    TriggerAnimation,
    Other(String),
}

impl HotkeyKind {
    pub fn as_str(&self) -> &str {
        match self {
            HotkeyKind::ToggleExpression => "ToggleExpression",
            HotkeyKind::TriggerAnimation => "TriggerAnimation",
            HotkeyKind::Other(other) => other,
        }
    }
}

impl fmt::Display for HotkeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for HotkeyKind {
    fn default() -> Self {
        HotkeyKind::Other(String::new())
    }
}

impl From<String> for HotkeyKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "ToggleExpression" => HotkeyKind::ToggleExpression,
            "TriggerAnimation" => HotkeyKind::TriggerAnimation,
            _ => HotkeyKind::Other(value),
        }
    }
}

impl From<HotkeyKind> for String {
    fn from(kind: HotkeyKind) -> Self {
        match kind {
            HotkeyKind::ToggleExpression => "ToggleExpression".to_string(),
            HotkeyKind::TriggerAnimation => "TriggerAnimation".to_string(),
            HotkeyKind::Other(other) => other,
        }
    }
}

/// One entry of `availableHotkeys`. The host fills these fields unevenly for
/// kinds this client ignores, so none of them is required at decode time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hotkey {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: HotkeyKind,
    #[serde(rename = "hotkeyID", default)]
    pub hotkey_id: Option<String>,
}

/// An animation or expression hotkey listed without a `name`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} hotkey {} has no name", .hotkey_id.as_deref().unwrap_or("<no id>"))]
pub struct UnnamedHotkey {
    pub kind: HotkeyKind,
    pub hotkey_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvailableHotkeysData {
    #[serde(rename = "availableHotkeys")]
    pub available_hotkeys: Vec<Hotkey>,
}

/// `modelName -> modelID` in the order the host listed them.
///
/// A repeated name keeps its first position and takes the later ID.
/// Serializes as a JSON object in that same order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelCatalog {
    models: Vec<Model>,
}

impl ModelCatalog {
    pub fn from_models(models: impl IntoIterator<Item = Model>) -> Self {
        let mut catalog = Self::default();
        for model in models {
            catalog.insert(model);
        }
        catalog
    }

    fn insert(&mut self, model: Model) {
        match self
            .models
            .iter_mut()
            .find(|existing| existing.model_name == model.model_name)
        {
            Some(existing) => existing.model_id = model.model_id,
            None => self.models.push(model),
        }
    }

    pub fn get(&self, model_name: &str) -> Option<&str> {
        self.models
            .iter()
            .find(|m| m.model_name == model_name)
            .map(|m| m.model_id.as_str())
    }

    pub fn contains_id(&self, model_id: &str) -> bool {
        self.models.iter().any(|m| m.model_id == model_id)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// `(modelName, modelID)` pairs in host order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.models
            .iter()
            .map(|m| (m.model_name.as_str(), m.model_id.as_str()))
    }

    pub fn models(&self) -> &[Model] {
        &self.models
    }
}

impl Serialize for ModelCatalog {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.models.len()))?;
        for (name, id) in self.iter() {
            map.serialize_entry(name, id)?;
        }
        map.end()
    }
}

/// Trigger names split by kind, each in host order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Triggers {
    pub animations: Vec<String>,
    pub expressions: Vec<String>,
}

impl Triggers {
    /// Keep `TriggerAnimation` and `ToggleExpression` entries; drop the rest
    /// without looking at them. Only the kept entries must carry a name.
    pub fn partition<'a>(
        hotkeys: impl IntoIterator<Item = &'a Hotkey>,
    ) -> Result<Self, UnnamedHotkey> {
        let mut triggers = Self::default();
        for hotkey in hotkeys {
            let list = match hotkey.kind {
                HotkeyKind::TriggerAnimation => &mut triggers.animations,
                HotkeyKind::ToggleExpression => &mut triggers.expressions,
                HotkeyKind::Other(_) => continue,
            };
            let name = hotkey.name.clone().ok_or_else(|| UnnamedHotkey {
                kind: hotkey.kind.clone(),
                hotkey_id: hotkey.hotkey_id.clone(),
            })?;
            list.push(name);
        }
        Ok(triggers)
    }

    pub fn is_empty(&self) -> bool {
        self.animations.is_empty() && self.expressions.is_empty()
    }
}
