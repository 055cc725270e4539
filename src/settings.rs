/// User settings kept in chrome.storage.sync
///
/// Each field is its own top-level storage key, shared with the popup,
/// which toggles `extensionEnabled` and `theme` directly.

use crate::error::{Result, TabStackError};
use crate::url_filter::DEFAULT_INTERNAL_SCHEMES;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Storage keys owned by `Settings`
pub const SETTINGS_KEYS: [&str; 5] = [
    "extensionEnabled",
    "theme",
    "favoritesFolder",
    "favoritesParentId",
    "internalSchemes",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub extension_enabled: bool,
    /// Popup theme; stored here so install writes the full default set
    pub theme: String,
    /// Name of the top-level bookmark folder favorites go into
    pub favorites_folder: String,
    /// Bookmark node the top-level folder is created under
    pub favorites_parent_id: String,
    pub internal_schemes: Vec<String>,
}

/// One entry of a `storage.onChanged` notification
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StorageChange {
    #[serde(default)]
    pub old_value: Option<Value>,
    #[serde(default)]
    pub new_value: Option<Value>,
}

impl Settings {
    pub fn new() -> Self {
        Settings {
            extension_enabled: true,
            theme: "light".to_string(),
            favorites_folder: "TabStack".to_string(),
            // "Other bookmarks"
            favorites_parent_id: "2".to_string(),
            internal_schemes: DEFAULT_INTERNAL_SCHEMES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Read settings from a `storage.sync.get` result. `None` when none of
    /// the settings keys has been stored yet.
    pub fn from_storage(items: Value) -> Result<Option<Settings>> {
        let Value::Object(items) = items else {
            return Ok(None);
        };
        if !SETTINGS_KEYS.iter().any(|key| items.contains_key(*key)) {
            return Ok(None);
        }
        decode(items).map(Some)
    }

    /// Top-level items for `storage.sync.set`
    pub fn to_storage(&self) -> Result<Map<String, Value>> {
        match serde_json::to_value(self) {
            Ok(Value::Object(items)) => Ok(items),
            Ok(other) => Err(TabStackError::Encode {
                what: "settings",
                detail: format!("expected an object, got {}", other),
            }),
            Err(e) => Err(TabStackError::Encode {
                what: "settings",
                detail: e.to_string(),
            }),
        }
    }

    /// Settings after a storage change. Removed keys fall back to their
    /// defaults; keys other components own are ignored.
    pub fn with_changes(&self, changes: &BTreeMap<String, StorageChange>) -> Result<Settings> {
        let mut items = self.to_storage()?;
        for (key, change) in changes {
            if !SETTINGS_KEYS.contains(&key.as_str()) {
                continue;
            }
            match &change.new_value {
                Some(value) => {
                    items.insert(key.clone(), value.clone());
                }
                None => {
                    items.remove(key);
                }
            }
        }
        decode(items)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

fn decode(items: Map<String, Value>) -> Result<Settings> {
    serde_json::from_value(Value::Object(items)).map_err(|e| TabStackError::Decode {
        what: "settings",
        detail: e.to_string(),
    })
}

/// True if a storage change touches any settings key
pub fn touches_settings(changes: &BTreeMap<String, StorageChange>) -> bool {
    changes.keys().any(|key| SETTINGS_KEYS.contains(&key.as_str()))
}
