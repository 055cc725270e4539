/// Data structures for TabStack
use serde::{Deserialize, Serialize};

pub type TabId = i32;
pub type WindowId = i32;

/// Milliseconds since the Unix epoch, as reported by the host clock
pub type Timestamp = f64;

/// A browser tab as reported by the host.
///
/// Values are treated as immutable snapshots: the index replaces entries
/// wholesale instead of patching fields of a cached tab.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TabId>,
    pub window_id: WindowId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fav_icon_url: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audible: Option<bool>,
    #[serde(default)]
    pub discarded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub muted_info: Option<MutedInfo>,
    #[serde(default)]
    pub index: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MutedInfo {
    pub muted: bool,
}

impl Tab {
    pub fn new(id: TabId, window_id: WindowId, title: &str, url: &str) -> Tab {
        Tab {
            id: Some(id),
            window_id,
            title: Some(title.to_string()),
            url: Some(url.to_string()),
            ..Tab::default()
        }
    }

    pub fn title_or_empty(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }

    pub fn url_or_empty(&self) -> &str {
        self.url.as_deref().unwrap_or("")
    }

    /// Copy of this tab placed in another window
    pub fn in_window(&self, window_id: WindowId) -> Tab {
        Tab {
            window_id,
            ..self.clone()
        }
    }

    /// Copy of this tab at another position in its window
    pub fn at_index(&self, index: i32) -> Tab {
        Tab {
            index,
            ..self.clone()
        }
    }

    /// Copy of this tab with the given active flag
    pub fn with_active(&self, active: bool) -> Tab {
        Tab {
            active,
            ..self.clone()
        }
    }
}

/// Window kinds the host distinguishes. Only `Normal` windows are indexed.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WindowType {
    #[default]
    Normal,
    Popup,
    Panel,
    App,
    Devtools,
    #[serde(other)]
    Unknown,
}

/// A window as returned by the host, optionally populated with its tabs
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HostWindow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<WindowId>,
    #[serde(default)]
    pub focused: bool,
    #[serde(rename = "type", default)]
    pub window_type: WindowType,
    #[serde(default)]
    pub tabs: Vec<Tab>,
}

impl HostWindow {
    pub fn is_normal(&self) -> bool {
        self.window_type == WindowType::Normal
    }
}

/// One indexed window and its tabs in tab strip order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WindowRecord {
    pub window_id: WindowId,
    pub tabs: Vec<Tab>,
    pub focused: bool,
}

impl WindowRecord {
    pub fn new(window_id: WindowId, focused: bool) -> WindowRecord {
        WindowRecord {
            window_id,
            tabs: Vec::new(),
            focused,
        }
    }

    pub fn position_of(&self, tab_id: TabId) -> Option<usize> {
        self.tabs.iter().position(|t| t.id == Some(tab_id))
    }

    pub fn contains(&self, tab_id: TabId) -> bool {
        self.position_of(tab_id).is_some()
    }

    /// Make each tab's `index` match its position in the list
    pub fn renumber(&mut self) {
        self.tabs = self
            .tabs
            .iter()
            .enumerate()
            .map(|(i, t)| t.at_index(i as i32))
            .collect();
    }
}

/// Timing information the index keeps per tab
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TabMetadata {
    pub created_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_accessed: Option<Timestamp>,
}

impl TabMetadata {
    /// Metadata for a tab first observed at `now`
    pub fn observed(now: Timestamp, active: bool) -> TabMetadata {
        TabMetadata {
            created_at: now,
            last_accessed: active.then_some(now),
        }
    }
}
