/// Tab operations: searching and counting

use crate::tab_data::{Tab, WindowRecord};

/// Case-insensitive substring match on title or URL.
/// `needle` must already be lowercase.
fn tab_matches(tab: &Tab, needle: &str) -> bool {
    tab.title_or_empty().to_lowercase().contains(needle)
        || tab.url_or_empty().to_lowercase().contains(needle)
}

/// Filter windows down to the tabs matching `query`.
///
/// An empty (or all-whitespace) query returns every window unchanged.
/// Windows without a match are dropped; both window order and tab order
/// follow the input.
pub fn search_windows(windows: &[WindowRecord], query: &str) -> Vec<WindowRecord> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return windows.to_vec();
    }

    windows
        .iter()
        .filter_map(|window| {
            let tabs: Vec<Tab> = window
                .tabs
                .iter()
                .filter(|tab| tab_matches(tab, &needle))
                .cloned()
                .collect();

            if tabs.is_empty() {
                None
            } else {
                Some(WindowRecord {
                    window_id: window.window_id,
                    tabs,
                    focused: window.focused,
                })
            }
        })
        .collect()
}

/// Total number of tabs across windows
pub fn count_tabs(windows: &[WindowRecord]) -> usize {
    windows.iter().map(|w| w.tabs.len()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_window(id: i32, tabs: &[(i32, &str, &str)]) -> WindowRecord {
        WindowRecord {
            window_id: id,
            tabs: tabs
                .iter()
                .map(|(tab_id, title, url)| Tab::new(*tab_id, id, title, url))
                .collect(),
            focused: false,
        }
    }

    fn sample_windows() -> Vec<WindowRecord> {
        vec![
            create_test_window(
                1,
                &[
                    (1, "GitHub Issue", "https://x.com"),
                    (2, "Docs", "https://github.com/y"),
                    (3, "Weather", "https://weather.example"),
                ],
            ),
            create_test_window(2, &[(4, "Mail", "https://mail.example")]),
        ]
    }

    #[test]
    fn test_search_title_or_url_case_insensitive() {
        let results = search_windows(&sample_windows(), "github");

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].window_id, 1);
        let ids: Vec<_> = results[0].tabs.iter().filter_map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_search_uppercase_query() {
        let results = search_windows(&sample_windows(), "MAIL");

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].window_id, 2);
    }

    #[test]
    fn test_search_empty_query_returns_everything() {
        let windows = sample_windows();

        assert_eq!(search_windows(&windows, ""), windows);
        assert_eq!(search_windows(&windows, "   "), windows);
    }

    #[test]
    fn test_search_no_matches() {
        assert!(search_windows(&sample_windows(), "nothing-like-this").is_empty());
    }

    #[test]
    fn test_search_preserves_window_order() {
        let windows = vec![
            create_test_window(9, &[(1, "rust book", "https://a")]),
            create_test_window(3, &[(2, "rust std", "https://b")]),
        ];

        let ids: Vec<_> = search_windows(&windows, "rust")
            .iter()
            .map(|w| w.window_id)
            .collect();

        assert_eq!(ids, vec![9, 3]);
    }

    #[test]
    fn test_search_tab_without_title() {
        let mut window = create_test_window(1, &[]);
        window.tabs.push(Tab {
            id: Some(5),
            window_id: 1,
            url: Some("https://untitled.example".to_string()),
            ..Tab::default()
        });

        assert_eq!(search_windows(&[window], "untitled").len(), 1);
    }

    #[test]
    fn test_count_tabs() {
        assert_eq!(count_tabs(&sample_windows()), 4);
        assert_eq!(count_tabs(&[]), 0);
    }
}
