/// Lifecycle notifications delivered by the browser
use crate::tab_data::{HostWindow, Tab, TabId, WindowId};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RemoveInfo {
    pub window_id: WindowId,
    #[serde(default)]
    pub is_window_closing: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MoveInfo {
    pub window_id: WindowId,
    pub from_index: usize,
    pub to_index: usize,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttachInfo {
    pub new_window_id: WindowId,
    pub new_position: usize,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetachInfo {
    pub old_window_id: WindowId,
    pub old_position: usize,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActiveInfo {
    pub tab_id: TabId,
    pub window_id: WindowId,
}

/// A raw notification, as it arrives from a host listener.
///
/// Everything except `TabAttached` carries the data the index needs. An
/// attach only names the tab, so the background pump fetches the tab before
/// handing it to the index.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    TabCreated(Tab),
    TabRemoved { tab_id: TabId, info: RemoveInfo },
    TabUpdated { tab_id: TabId, tab: Tab },
    TabMoved { tab_id: TabId, info: MoveInfo },
    TabAttached { tab_id: TabId, info: AttachInfo },
    TabDetached { tab_id: TabId, info: DetachInfo },
    TabActivated(ActiveInfo),
    WindowCreated(HostWindow),
    WindowRemoved(WindowId),
    WindowFocusChanged(WindowId),
    /// Drop the index and load a fresh snapshot
    Reindex,
}

impl HostEvent {
    pub fn name(&self) -> &'static str {
        match self {
            HostEvent::TabCreated(_) => "tabs.onCreated",
            HostEvent::TabRemoved { .. } => "tabs.onRemoved",
            HostEvent::TabUpdated { .. } => "tabs.onUpdated",
            HostEvent::TabMoved { .. } => "tabs.onMoved",
            HostEvent::TabAttached { .. } => "tabs.onAttached",
            HostEvent::TabDetached { .. } => "tabs.onDetached",
            HostEvent::TabActivated(_) => "tabs.onActivated",
            HostEvent::WindowCreated(_) => "windows.onCreated",
            HostEvent::WindowRemoved(_) => "windows.onRemoved",
            HostEvent::WindowFocusChanged(_) => "windows.onFocusChanged",
            HostEvent::Reindex => "reindex",
        }
    }
}
