/// Messages exchanged between the extension pages and the background worker
use crate::error::{Result, TabStackError};
use crate::favorites::FavoritesReport;
use crate::tab_data::{TabId, TabMetadata, WindowId, WindowRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Request {
    Search {
        #[serde(default)]
        query: String,
    },
    GetIndex,
    GetMetadata,
    FocusTab {
        tab_id: TabId,
        window_id: WindowId,
    },
    CloseTab {
        tab_id: TabId,
    },
    CloseTabs {
        tab_ids: Vec<TabId>,
    },
    CloseWindow {
        window_id: WindowId,
    },
    MoveToNewWindow {
        tab_ids: Vec<TabId>,
    },
    AddToFavorites {
        tab_ids: Vec<TabId>,
    },
    Reindex,
}

/// Parse an incoming runtime message.
///
/// Messages without a string `type` belong to some other listener and yield
/// `Ok(None)`; a `type` this worker does not understand is an error.
pub fn parse_request(message: serde_json::Value) -> Result<Option<Request>> {
    let Some(kind) = message.get("type").and_then(|t| t.as_str()).map(str::to_string) else {
        return Ok(None);
    };
    serde_json::from_value(message)
        .map(Some)
        .map_err(|e| TabStackError::InvalidRequest(format!("{} ({})", kind, e)))
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Response {
    SearchResults {
        results: Vec<WindowRecord>,
    },
    IndexUpdate {
        results: Vec<WindowRecord>,
    },
    Metadata {
        metadata: BTreeMap<TabId, TabMetadata>,
    },
    Success {
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(flatten, skip_serializing_if = "Option::is_none")]
        favorites: Option<FavoritesReport>,
    },
    Error {
        message: String,
    },
}

impl Response {
    pub fn ok() -> Response {
        Response::Success {
            message: None,
            favorites: None,
        }
    }

    pub fn ok_with(message: impl Into<String>) -> Response {
        Response::Success {
            message: Some(message.into()),
            favorites: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Response {
        Response::Error {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tab_data::Tab;
    use serde_json::json;

    #[test]
    fn test_parse_requests() {
        let search: Request =
            serde_json::from_value(json!({"type": "search", "query": "rust"})).unwrap();
        assert_eq!(
            search,
            Request::Search {
                query: "rust".to_string()
            }
        );

        let focus: Request =
            serde_json::from_value(json!({"type": "focusTab", "tabId": 4, "windowId": 2})).unwrap();
        assert_eq!(
            focus,
            Request::FocusTab {
                tab_id: 4,
                window_id: 2
            }
        );

        let favorites: Request =
            serde_json::from_value(json!({"type": "addToFavorites", "tabIds": [1, 2, 3]})).unwrap();
        assert_eq!(
            favorites,
            Request::AddToFavorites {
                tab_ids: vec![1, 2, 3]
            }
        );

        let index: Request = serde_json::from_value(json!({"type": "getIndex"})).unwrap();
        assert_eq!(index, Request::GetIndex);
    }

    #[test]
    fn test_unknown_request_type_fails() {
        assert!(serde_json::from_value::<Request>(json!({"type": "explode"})).is_err());
        assert!(serde_json::from_value::<Request>(json!({"type": "closeTab"})).is_err());
    }

    #[test]
    fn test_parse_request_routing() {
        assert_eq!(
            parse_request(json!({"type": "closeTabs", "tabIds": [4, 5]})).unwrap(),
            Some(Request::CloseTabs { tab_ids: vec![4, 5] })
        );
        assert_eq!(parse_request(json!({"action": "getPageInfo"})).unwrap(), None);

        let err = parse_request(json!({"type": "teleportTab"})).unwrap_err();
        assert!(err.to_string().starts_with("Invalid request: teleportTab"));
    }

    #[test]
    fn test_search_results_shape() {
        let mut window = WindowRecord::new(3, true);
        window.tabs.push(Tab::new(8, 3, "Docs", "https://docs.rs"));

        let value = serde_json::to_value(Response::SearchResults {
            results: vec![window],
        })
        .unwrap();

        assert_eq!(value["type"], "searchResults");
        assert_eq!(value["results"][0]["windowId"], 3);
        assert_eq!(value["results"][0]["tabs"][0]["title"], "Docs");
    }

    #[test]
    fn test_metadata_shape() {
        let mut metadata = BTreeMap::new();
        metadata.insert(
            7,
            TabMetadata {
                created_at: 10.0,
                last_accessed: Some(20.0),
            },
        );

        let value = serde_json::to_value(Response::Metadata { metadata }).unwrap();

        assert_eq!(
            value,
            json!({
                "type": "metadata",
                "metadata": {"7": {"createdAt": 10.0, "lastAccessed": 20.0}}
            })
        );
    }

    #[test]
    fn test_success_shapes() {
        assert_eq!(serde_json::to_value(Response::ok()).unwrap(), json!({"type": "success"}));
        assert_eq!(
            serde_json::to_value(Response::ok_with("Moved 2 tabs")).unwrap(),
            json!({"type": "success", "message": "Moved 2 tabs"})
        );

        let favorites = Response::Success {
            message: None,
            favorites: Some(FavoritesReport {
                added_count: 2,
                skipped_count: 1,
                date_folder: "2024-03-07".to_string(),
            }),
        };
        assert_eq!(
            serde_json::to_value(favorites).unwrap(),
            json!({
                "type": "success",
                "addedCount": 2,
                "skippedCount": 1,
                "dateFolder": "2024-03-07"
            })
        );
    }

    #[test]
    fn test_error_shape() {
        let value = serde_json::to_value(Response::error("No valid tabs found")).unwrap();
        assert_eq!(value, json!({"type": "error", "message": "No valid tabs found"}));
    }
}
