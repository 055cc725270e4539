/// Error types for TabStack
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TabStackError {
    /// The browser rejected an API call
    #[error("{0}")]
    Host(String),

    #[error("Failed to parse {what}: {detail}")]
    Decode { what: &'static str, detail: String },

    #[error("Failed to serialize {what}: {detail}")]
    Encode { what: &'static str, detail: String },

    #[error("No valid tabs found")]
    NoValidTabs,

    #[error("Could not find or create bookmark folder \"{name}\": {source}")]
    BookmarkFolder {
        name: String,
        #[source]
        source: Box<TabStackError>,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("TabStack is disabled")]
    Disabled,
}

pub type Result<T> = std::result::Result<T, TabStackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            TabStackError::Host("No tab with id: 5.".to_string()).to_string(),
            "No tab with id: 5."
        );
        assert_eq!(TabStackError::NoValidTabs.to_string(), "No valid tabs found");
        assert_eq!(
            TabStackError::Decode {
                what: "tab",
                detail: "missing field `windowId`".to_string()
            }
            .to_string(),
            "Failed to parse tab: missing field `windowId`"
        );
    }

    #[test]
    fn test_folder_error_keeps_cause() {
        let err = TabStackError::BookmarkFolder {
            name: "TabStack".to_string(),
            source: Box::new(TabStackError::Host("quota exceeded".to_string())),
        };

        assert_eq!(
            err.to_string(),
            "Could not find or create bookmark folder \"TabStack\": quota exceeded"
        );
        assert!(std::error::Error::source(&err).is_some());
    }
}
