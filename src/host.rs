/// Interfaces to the browser services the background worker depends on.
///
/// The chrome bindings implement these for real; tests use `fake::FakeHost`.
use crate::error::Result;
use crate::settings::Settings;
use crate::tab_data::{HostWindow, Tab, TabId, Timestamp, WindowId};
use serde::{Deserialize, Serialize};

/// Owner of the real window and tab state
#[allow(async_fn_in_trait)]
pub trait TabHost {
    /// All normal windows, populated with their tabs
    async fn fetch_windows(&self) -> Result<Vec<HostWindow>>;

    async fn get_tab(&self, tab_id: TabId) -> Result<Tab>;

    /// Activate the tab and bring its window to the front
    async fn focus_tab(&self, tab_id: TabId, window_id: WindowId) -> Result<()>;

    async fn close_tabs(&self, tab_ids: &[TabId]) -> Result<()>;

    async fn close_window(&self, window_id: WindowId) -> Result<()>;

    /// Open a new window containing `tab_id`, returning the window's id
    async fn create_window_with_tab(&self, tab_id: TabId) -> Result<WindowId>;

    async fn move_tab(&self, tab_id: TabId, window_id: WindowId, index: usize) -> Result<()>;
}

/// A folder (no url) or bookmark in the browser's bookmark tree
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkNode {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl BookmarkNode {
    pub fn is_folder(&self) -> bool {
        self.url.is_none()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewBookmark {
    pub parent_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl NewBookmark {
    pub fn folder(parent_id: &str, title: &str) -> NewBookmark {
        NewBookmark {
            parent_id: parent_id.to_string(),
            title: title.to_string(),
            url: None,
        }
    }

    pub fn link(parent_id: &str, title: &str, url: &str) -> NewBookmark {
        NewBookmark {
            parent_id: parent_id.to_string(),
            title: title.to_string(),
            url: Some(url.to_string()),
        }
    }
}

#[allow(async_fn_in_trait)]
pub trait BookmarkStore {
    async fn get_children(&self, parent_id: &str) -> Result<Vec<BookmarkNode>>;

    async fn create_bookmark(&self, bookmark: NewBookmark) -> Result<BookmarkNode>;
}

#[allow(async_fn_in_trait)]
pub trait SettingsStore {
    /// Stored settings, or `None` if nothing has been saved yet
    async fn load_settings(&self) -> Result<Option<Settings>>;

    async fn save_settings(&self, settings: &Settings) -> Result<()>;
}

/// A local calendar date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl CalendarDate {
    /// `YYYY-MM-DD`
    pub fn label(&self) -> String {
        format!("{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

pub trait Clock {
    fn now(&self) -> Timestamp;

    fn today(&self) -> CalendarDate;
}
