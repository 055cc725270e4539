/// In-memory index of open windows and their tabs.
///
/// The index is filled once from a snapshot and afterwards only changes
/// through `apply`, one notification at a time. It never talks to the host
/// itself, which keeps every transition testable with plain values.
use crate::operations::search_windows;
use crate::tab_data::{HostWindow, Tab, TabId, TabMetadata, Timestamp, WindowId, WindowRecord};
use std::collections::{BTreeMap, HashSet};

/// A notification in the form the index consumes.
///
/// Differs from `HostEvent` only in that an attach carries the fetched tab.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexEvent {
    TabCreated(Tab),
    TabRemoved { tab_id: TabId, window_id: WindowId },
    TabUpdated { tab_id: TabId, tab: Tab },
    TabMoved { tab_id: TabId, window_id: WindowId, to_index: usize },
    TabAttached { tab: Tab, window_id: WindowId, position: usize },
    TabDetached { tab_id: TabId, window_id: WindowId },
    TabActivated { tab_id: TabId, window_id: WindowId },
    WindowCreated(HostWindow),
    WindowRemoved(WindowId),
    WindowFocusChanged(WindowId),
}

/// What a single `apply` or `load_snapshot` changed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexDelta {
    pub windows_added: Vec<WindowId>,
    pub windows_removed: Vec<WindowId>,
    pub windows_changed: Vec<WindowId>,
    pub metadata_changed: Vec<TabId>,
}

impl IndexDelta {
    pub fn is_empty(&self) -> bool {
        self.windows_added.is_empty()
            && self.windows_removed.is_empty()
            && self.windows_changed.is_empty()
            && self.metadata_changed.is_empty()
    }

    fn window_changed(&mut self, window_id: WindowId) {
        if !self.windows_changed.contains(&window_id) {
            self.windows_changed.push(window_id);
        }
    }

    fn metadata_touched(&mut self, tab_id: TabId) {
        if !self.metadata_changed.contains(&tab_id) {
            self.metadata_changed.push(tab_id);
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TabIndex {
    windows: Vec<WindowRecord>,
    metadata: BTreeMap<TabId, TabMetadata>,
    last_updated: Timestamp,
}

impl TabIndex {
    pub fn new() -> Self {
        TabIndex::default()
    }

    pub fn windows(&self) -> &[WindowRecord] {
        &self.windows
    }

    pub fn window(&self, window_id: WindowId) -> Option<&WindowRecord> {
        self.windows.iter().find(|w| w.window_id == window_id)
    }

    pub fn metadata(&self, tab_id: TabId) -> Option<&TabMetadata> {
        self.metadata.get(&tab_id)
    }

    pub fn last_updated(&self) -> Timestamp {
        self.last_updated
    }

    /// Window and position currently holding `tab_id`
    pub fn locate(&self, tab_id: TabId) -> Option<(WindowId, usize)> {
        self.windows
            .iter()
            .find_map(|w| w.position_of(tab_id).map(|pos| (w.window_id, pos)))
    }

    /// Owned copy of every window, safe to hand to another context
    pub fn snapshot(&self) -> Vec<WindowRecord> {
        self.windows.clone()
    }

    pub fn metadata_snapshot(&self) -> BTreeMap<TabId, TabMetadata> {
        self.metadata.clone()
    }

    pub fn search(&self, query: &str) -> Vec<WindowRecord> {
        search_windows(&self.windows, query)
    }

    /// Replace the indexed windows with a fresh snapshot from the host.
    ///
    /// Non-normal windows are skipped. Metadata survives for tabs that are
    /// still open and is created for tabs seen for the first time.
    pub fn load_snapshot(&mut self, windows: Vec<HostWindow>, now: Timestamp) -> IndexDelta {
        let mut delta = IndexDelta::default();
        let mut records: Vec<WindowRecord> = Vec::new();
        let mut seen: HashSet<TabId> = HashSet::new();

        for window in windows {
            if !window.is_normal() {
                continue;
            }
            let Some(window_id) = window.id else {
                continue;
            };
            if records.iter().any(|r| r.window_id == window_id) {
                continue;
            }

            let mut record = WindowRecord::new(window_id, window.focused);
            for tab in window.tabs {
                if let Some(tab_id) = tab.id {
                    if !seen.insert(tab_id) {
                        continue;
                    }
                    if !self.metadata.contains_key(&tab_id) {
                        self.metadata
                            .insert(tab_id, TabMetadata::observed(now, tab.active));
                        delta.metadata_touched(tab_id);
                    }
                }
                record.tabs.push(tab.in_window(window_id));
            }
            record.renumber();

            delta.windows_added.push(window_id);
            records.push(record);
        }

        let stale: Vec<TabId> = self
            .metadata
            .keys()
            .filter(|id| !seen.contains(*id))
            .copied()
            .collect();
        for tab_id in stale {
            self.metadata.remove(&tab_id);
            delta.metadata_touched(tab_id);
        }

        delta.windows_removed = self
            .windows
            .iter()
            .map(|w| w.window_id)
            .filter(|id| !records.iter().any(|r| r.window_id == *id))
            .collect();

        self.windows = records;
        self.touch(now);
        delta
    }

    /// Apply one notification. References to windows or tabs the index does
    /// not hold are no-ops and yield an empty delta.
    pub fn apply(&mut self, event: IndexEvent, now: Timestamp) -> IndexDelta {
        let delta = match event {
            IndexEvent::TabCreated(tab) => self.tab_created(tab, now),
            IndexEvent::TabRemoved { tab_id, window_id } => self.tab_removed(tab_id, window_id),
            IndexEvent::TabUpdated { tab_id, tab } => self.tab_updated(tab_id, tab, now),
            IndexEvent::TabMoved {
                tab_id,
                window_id,
                to_index,
            } => self.tab_moved(tab_id, window_id, to_index),
            IndexEvent::TabAttached {
                tab,
                window_id,
                position,
            } => self.tab_attached(tab, window_id, position, now),
            IndexEvent::TabDetached { tab_id, window_id } => self.tab_detached(tab_id, window_id),
            IndexEvent::TabActivated { tab_id, window_id } => {
                self.tab_activated(tab_id, window_id, now)
            }
            IndexEvent::WindowCreated(window) => self.window_created(window),
            IndexEvent::WindowRemoved(window_id) => self.window_removed(window_id),
            IndexEvent::WindowFocusChanged(window_id) => self.focus_changed(window_id),
        };

        for window_id in &delta.windows_changed {
            if let Some(window) = self.window_mut(*window_id) {
                window.renumber();
            }
        }
        if !delta.is_empty() {
            self.touch(now);
        }
        delta
    }

    fn touch(&mut self, now: Timestamp) {
        self.last_updated = self.last_updated.max(now);
    }

    fn window_mut(&mut self, window_id: WindowId) -> Option<&mut WindowRecord> {
        self.windows.iter_mut().find(|w| w.window_id == window_id)
    }

    fn has_window(&self, window_id: WindowId) -> bool {
        self.window(window_id).is_some()
    }

    /// Take `tab_id` out of every window holding it
    fn remove_everywhere(&mut self, tab_id: TabId, delta: &mut IndexDelta) {
        for window in self.windows.iter_mut() {
            if let Some(pos) = window.position_of(tab_id) {
                window.tabs.remove(pos);
                delta.window_changed(window.window_id);
            }
        }
    }

    fn tab_created(&mut self, tab: Tab, now: Timestamp) -> IndexDelta {
        let mut delta = IndexDelta::default();
        let window_id = tab.window_id;
        let Some(tab_id) = tab.id else {
            return delta;
        };
        if !self.has_window(window_id) {
            return delta;
        }

        let active = tab.active;
        let existing = self.window(window_id).and_then(|w| w.position_of(tab_id));
        match existing {
            Some(pos) => {
                if let Some(window) = self.window_mut(window_id) {
                    window.tabs[pos] = tab;
                }
            }
            None => {
                self.remove_everywhere(tab_id, &mut delta);
                if let Some(window) = self.window_mut(window_id) {
                    window.tabs.push(tab);
                }
            }
        }
        delta.window_changed(window_id);

        if !self.metadata.contains_key(&tab_id) {
            self.metadata.insert(tab_id, TabMetadata::observed(now, active));
            delta.metadata_touched(tab_id);
        }
        delta
    }

    fn tab_removed(&mut self, tab_id: TabId, window_id: WindowId) -> IndexDelta {
        let mut delta = IndexDelta::default();

        if let Some(window) = self.window_mut(window_id) {
            if let Some(pos) = window.position_of(tab_id) {
                window.tabs.remove(pos);
                delta.window_changed(window_id);
            }
        }
        // The removal info can name a window the tab already left.
        self.remove_everywhere(tab_id, &mut delta);

        if self.metadata.remove(&tab_id).is_some() {
            delta.metadata_touched(tab_id);
        }
        delta
    }

    fn tab_updated(&mut self, tab_id: TabId, tab: Tab, now: Timestamp) -> IndexDelta {
        let mut delta = IndexDelta::default();
        let window_id = tab.window_id;
        let active = tab.active;

        let Some(window) = self.window_mut(window_id) else {
            return delta;
        };
        let Some(pos) = window.position_of(tab_id) else {
            return delta;
        };
        window.tabs[pos] = Tab {
            id: Some(tab_id),
            ..tab
        };
        delta.window_changed(window_id);

        if active {
            if let Some(meta) = self.metadata.get_mut(&tab_id) {
                meta.last_accessed = Some(now);
                delta.metadata_touched(tab_id);
            }
        }
        delta
    }

    fn tab_moved(&mut self, tab_id: TabId, window_id: WindowId, to_index: usize) -> IndexDelta {
        let mut delta = IndexDelta::default();

        let Some(window) = self.window_mut(window_id) else {
            return delta;
        };
        let Some(pos) = window.position_of(tab_id) else {
            return delta;
        };
        let tab = window.tabs.remove(pos);
        let target = to_index.min(window.tabs.len());
        window.tabs.insert(target, tab);
        delta.window_changed(window_id);
        delta
    }

    fn tab_attached(
        &mut self,
        tab: Tab,
        window_id: WindowId,
        position: usize,
        now: Timestamp,
    ) -> IndexDelta {
        let mut delta = IndexDelta::default();
        let Some(tab_id) = tab.id else {
            return delta;
        };

        if !self.has_window(window_id) {
            // The tab moved somewhere the index does not track.
            if self.locate(tab_id).is_none() && self.metadata.remove(&tab_id).is_some() {
                delta.metadata_touched(tab_id);
            }
            return delta;
        }

        self.remove_everywhere(tab_id, &mut delta);
        let active = tab.active;
        if let Some(window) = self.window_mut(window_id) {
            let target = position.min(window.tabs.len());
            window.tabs.insert(target, tab.in_window(window_id));
        }
        delta.window_changed(window_id);

        if !self.metadata.contains_key(&tab_id) {
            self.metadata.insert(tab_id, TabMetadata::observed(now, active));
            delta.metadata_touched(tab_id);
        }
        delta
    }

    fn tab_detached(&mut self, tab_id: TabId, window_id: WindowId) -> IndexDelta {
        let mut delta = IndexDelta::default();

        if let Some(window) = self.window_mut(window_id) {
            if let Some(pos) = window.position_of(tab_id) {
                window.tabs.remove(pos);
                delta.window_changed(window_id);
            }
        }
        delta
    }

    fn tab_activated(&mut self, tab_id: TabId, window_id: WindowId, now: Timestamp) -> IndexDelta {
        let mut delta = IndexDelta::default();

        let Some(window) = self.window_mut(window_id) else {
            return delta;
        };
        if !window.contains(tab_id) {
            return delta;
        }
        window.tabs = window
            .tabs
            .iter()
            .map(|t| t.with_active(t.id == Some(tab_id)))
            .collect();
        delta.window_changed(window_id);

        if let Some(meta) = self.metadata.get_mut(&tab_id) {
            meta.last_accessed = Some(now);
            delta.metadata_touched(tab_id);
        }
        delta
    }

    fn window_created(&mut self, window: HostWindow) -> IndexDelta {
        let mut delta = IndexDelta::default();

        if !window.is_normal() {
            return delta;
        }
        let Some(window_id) = window.id else {
            return delta;
        };
        if self.has_window(window_id) {
            return delta;
        }

        self.windows.push(WindowRecord::new(window_id, window.focused));
        delta.windows_added.push(window_id);
        delta
    }

    fn window_removed(&mut self, window_id: WindowId) -> IndexDelta {
        let mut delta = IndexDelta::default();

        let Some(pos) = self.windows.iter().position(|w| w.window_id == window_id) else {
            return delta;
        };
        let record = self.windows.remove(pos);
        delta.windows_removed.push(window_id);

        for tab_id in record.tabs.iter().filter_map(|t| t.id) {
            if self.metadata.remove(&tab_id).is_some() {
                delta.metadata_touched(tab_id);
            }
        }
        delta
    }

    fn focus_changed(&mut self, window_id: WindowId) -> IndexDelta {
        let mut delta = IndexDelta::default();

        for window in self.windows.iter_mut() {
            let focused = window.window_id == window_id;
            if window.focused != focused {
                window.focused = focused;
                delta.window_changed(window.window_id);
            }
        }
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tab_data::WindowType;

    /// Window id the host reports when focus leaves every browser window
    const WINDOW_ID_NONE: WindowId = -1;

    fn tab(id: TabId, window_id: WindowId, title: &str, url: &str) -> Tab {
        Tab::new(id, window_id, title, url)
    }

    fn window(id: WindowId, focused: bool, tabs: Vec<Tab>) -> HostWindow {
        HostWindow {
            id: Some(id),
            focused,
            window_type: WindowType::Normal,
            tabs,
        }
    }

    fn tab_ids(index: &TabIndex, window_id: WindowId) -> Vec<TabId> {
        index
            .window(window_id)
            .map(|w| w.tabs.iter().filter_map(|t| t.id).collect())
            .unwrap_or_default()
    }

    fn assert_tabs_unique(index: &TabIndex) {
        let mut seen = HashSet::new();
        for w in index.windows() {
            for t in &w.tabs {
                if let Some(id) = t.id {
                    assert!(seen.insert(id), "tab {} indexed twice", id);
                }
                assert_eq!(t.window_id, w.window_id);
            }
        }
    }

    fn loaded() -> TabIndex {
        let mut index = TabIndex::new();
        index.load_snapshot(
            vec![
                window(
                    1,
                    true,
                    vec![
                        tab(10, 1, "A", "https://a.example"),
                        tab(11, 1, "B", "https://b.example"),
                        tab(12, 1, "C", "https://c.example"),
                    ],
                ),
                window(2, false, vec![tab(20, 2, "D", "https://d.example")]),
            ],
            1000.0,
        );
        index
    }

    #[test]
    fn test_load_snapshot() {
        let index = loaded();

        assert_eq!(index.windows().len(), 2);
        assert_eq!(tab_ids(&index, 1), vec![10, 11, 12]);
        assert_eq!(tab_ids(&index, 2), vec![20]);
        assert!(index.window(1).unwrap().focused);
        assert_eq!(index.metadata(10).unwrap().created_at, 1000.0);
        assert_eq!(index.last_updated(), 1000.0);
    }

    #[test]
    fn test_load_snapshot_skips_non_normal_windows() {
        let mut index = TabIndex::new();
        let mut popup = window(3, false, vec![tab(30, 3, "Popup", "https://p.example")]);
        popup.window_type = WindowType::Popup;

        index.load_snapshot(vec![window(1, false, vec![]), popup], 5.0);

        assert_eq!(index.windows().len(), 1);
        assert!(index.metadata(30).is_none());
    }

    #[test]
    fn test_load_snapshot_marks_active_tabs_accessed() {
        let mut index = TabIndex::new();
        let mut active = tab(10, 1, "A", "https://a.example");
        active.active = true;

        index.load_snapshot(
            vec![window(1, true, vec![active, tab(11, 1, "B", "https://b.example")])],
            50.0,
        );

        assert_eq!(index.metadata(10).unwrap().last_accessed, Some(50.0));
        assert_eq!(index.metadata(11).unwrap().last_accessed, None);
    }

    #[test]
    fn test_load_snapshot_mirrors_reported_focus() {
        let mut index = TabIndex::new();
        index.load_snapshot(vec![window(1, true, vec![]), window(2, true, vec![])], 1.0);

        assert!(index.windows().iter().all(|w| w.focused));
    }

    #[test]
    fn test_reload_keeps_existing_metadata_and_prunes_closed_tabs() {
        let mut index = loaded();

        index.load_snapshot(
            vec![window(1, true, vec![tab(10, 1, "A", "https://a.example")])],
            2000.0,
        );

        assert_eq!(index.metadata(10).unwrap().created_at, 1000.0);
        assert!(index.metadata(11).is_none());
        assert!(index.metadata(20).is_none());
    }

    #[test]
    fn test_tab_created_appends() {
        let mut index = loaded();
        let mut new_tab = tab(13, 1, "New", "https://new.example");
        new_tab.active = true;

        let delta = index.apply(IndexEvent::TabCreated(new_tab), 1500.0);

        assert_eq!(tab_ids(&index, 1), vec![10, 11, 12, 13]);
        assert_eq!(delta.windows_changed, vec![1]);
        assert_eq!(index.metadata(13).unwrap().created_at, 1500.0);
        assert_eq!(index.metadata(13).unwrap().last_accessed, Some(1500.0));
        assert_eq!(index.last_updated(), 1500.0);
    }

    #[test]
    fn test_tab_created_in_unknown_window_is_noop() {
        let mut index = loaded();

        let delta = index.apply(IndexEvent::TabCreated(tab(99, 42, "X", "https://x")), 1500.0);

        assert!(delta.is_empty());
        assert!(index.metadata(99).is_none());
        assert_eq!(index.last_updated(), 1000.0);
    }

    #[test]
    fn test_tab_created_twice_does_not_duplicate() {
        let mut index = loaded();

        index.apply(
            IndexEvent::TabCreated(tab(11, 1, "B again", "https://b.example")),
            1500.0,
        );
        index.apply(
            IndexEvent::TabCreated(tab(20, 1, "D moved", "https://d.example")),
            1600.0,
        );

        assert_eq!(tab_ids(&index, 1), vec![10, 11, 12, 20]);
        assert_eq!(index.window(1).unwrap().tabs[1].title_or_empty(), "B again");
        assert!(tab_ids(&index, 2).is_empty());
        assert_eq!(index.metadata(11).unwrap().created_at, 1000.0);
        assert_tabs_unique(&index);
    }

    #[test]
    fn test_tab_removed_cleans_list_and_metadata() {
        let mut index = loaded();

        let delta = index.apply(
            IndexEvent::TabRemoved {
                tab_id: 11,
                window_id: 1,
            },
            1100.0,
        );

        assert_eq!(tab_ids(&index, 1), vec![10, 12]);
        assert!(index.metadata(11).is_none());
        assert!(index.locate(11).is_none());
        assert_eq!(delta.metadata_changed, vec![11]);
    }

    #[test]
    fn test_tab_removed_with_stale_window_still_cleans() {
        let mut index = loaded();

        index.apply(
            IndexEvent::TabRemoved {
                tab_id: 20,
                window_id: 1,
            },
            1100.0,
        );

        assert!(tab_ids(&index, 2).is_empty());
        assert!(index.metadata(20).is_none());
    }

    #[test]
    fn test_tab_removed_unknown_is_noop() {
        let mut index = loaded();

        let delta = index.apply(
            IndexEvent::TabRemoved {
                tab_id: 77,
                window_id: 9,
            },
            1100.0,
        );

        assert!(delta.is_empty());
        assert_eq!(index.last_updated(), 1000.0);
    }

    #[test]
    fn test_tab_updated_replaces_in_place() {
        let mut index = loaded();
        let updated = tab(11, 1, "B renamed", "https://b.example/next");

        index.apply(
            IndexEvent::TabUpdated {
                tab_id: 11,
                tab: updated,
            },
            1200.0,
        );

        let w = index.window(1).unwrap();
        assert_eq!(tab_ids(&index, 1), vec![10, 11, 12]);
        assert_eq!(w.tabs[1].title_or_empty(), "B renamed");
        assert_eq!(w.tabs[1].url_or_empty(), "https://b.example/next");
        assert_eq!(index.metadata(11).unwrap().last_accessed, None);
    }

    #[test]
    fn test_tab_updated_with_same_snapshot_is_idempotent() {
        let mut index = loaded();
        let before = index.window(1).unwrap().tabs.clone();

        index.apply(
            IndexEvent::TabUpdated {
                tab_id: 12,
                tab: before[2].clone(),
            },
            1300.0,
        );

        assert_eq!(index.window(1).unwrap().tabs, before);
        assert_eq!(index.last_updated(), 1300.0);
    }

    #[test]
    fn test_tab_updated_active_sets_last_accessed() {
        let mut index = loaded();
        let mut updated = tab(10, 1, "A", "https://a.example");
        updated.active = true;

        index.apply(
            IndexEvent::TabUpdated {
                tab_id: 10,
                tab: updated,
            },
            1400.0,
        );

        assert_eq!(index.metadata(10).unwrap().last_accessed, Some(1400.0));
    }

    #[test]
    fn test_tab_updated_unknown_window_is_noop() {
        let mut index = loaded();

        let delta = index.apply(
            IndexEvent::TabUpdated {
                tab_id: 10,
                tab: tab(10, 55, "A", "https://a.example"),
            },
            1400.0,
        );

        assert!(delta.is_empty());
        assert_eq!(index.window(1).unwrap().tabs[0].window_id, 1);
    }

    #[test]
    fn test_tab_moved_within_window() {
        let mut index = loaded();

        index.apply(
            IndexEvent::TabMoved {
                tab_id: 10,
                window_id: 1,
                to_index: 2,
            },
            1100.0,
        );

        assert_eq!(tab_ids(&index, 1), vec![11, 12, 10]);
    }

    fn tab_positions(index: &TabIndex, window_id: WindowId) -> Vec<i32> {
        index
            .window(window_id)
            .map(|w| w.tabs.iter().map(|t| t.index).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_tab_positions_follow_list_order() {
        let mut index = loaded();
        assert_eq!(tab_positions(&index, 1), vec![0, 1, 2]);

        index.apply(
            IndexEvent::TabMoved {
                tab_id: 10,
                window_id: 1,
                to_index: 2,
            },
            1100.0,
        );
        assert_eq!(index.window(1).unwrap().tabs[2].index, 2);
        assert_eq!(tab_positions(&index, 1), vec![0, 1, 2]);

        index.apply(
            IndexEvent::TabAttached {
                tab: tab(11, 1, "B", "https://b.example").at_index(1),
                window_id: 2,
                position: 1,
            },
            1200.0,
        );
        assert_eq!(tab_ids(&index, 1), vec![12, 10]);
        assert_eq!(tab_positions(&index, 1), vec![0, 1]);
        assert_eq!(tab_ids(&index, 2), vec![20, 11]);
        assert_eq!(tab_positions(&index, 2), vec![0, 1]);

        index.apply(
            IndexEvent::TabRemoved {
                tab_id: 12,
                window_id: 1,
            },
            1300.0,
        );
        assert_eq!(tab_positions(&index, 1), vec![0]);
        assert_eq!(index.window(1).unwrap().tabs[0].id, Some(10));
    }

    #[test]
    fn test_tab_moved_past_end_clamps() {
        let mut index = loaded();

        index.apply(
            IndexEvent::TabMoved {
                tab_id: 11,
                window_id: 1,
                to_index: 40,
            },
            1100.0,
        );

        assert_eq!(tab_ids(&index, 1), vec![10, 12, 11]);
    }

    #[test]
    fn test_detach_then_attach() {
        let mut index = loaded();

        index.apply(
            IndexEvent::TabDetached {
                tab_id: 11,
                window_id: 1,
            },
            1100.0,
        );
        assert_eq!(tab_ids(&index, 1), vec![10, 12]);
        assert!(index.metadata(11).is_some());

        index.apply(
            IndexEvent::TabAttached {
                tab: tab(11, 1, "B", "https://b.example"),
                window_id: 2,
                position: 0,
            },
            1200.0,
        );

        assert_eq!(tab_ids(&index, 2), vec![11, 20]);
        assert_eq!(index.window(2).unwrap().tabs[0].window_id, 2);
        assert_eq!(index.metadata(11).unwrap().created_at, 1000.0);
        assert_tabs_unique(&index);
    }

    #[test]
    fn test_attach_without_detach_keeps_tab_unique() {
        let mut index = loaded();

        index.apply(
            IndexEvent::TabAttached {
                tab: tab(10, 2, "A", "https://a.example"),
                window_id: 2,
                position: 5,
            },
            1200.0,
        );

        assert_eq!(tab_ids(&index, 1), vec![11, 12]);
        assert_eq!(tab_ids(&index, 2), vec![20, 10]);
        assert_tabs_unique(&index);
    }

    #[test]
    fn test_attach_to_untracked_window_drops_metadata() {
        let mut index = loaded();
        index.apply(
            IndexEvent::TabDetached {
                tab_id: 20,
                window_id: 2,
            },
            1100.0,
        );

        let delta = index.apply(
            IndexEvent::TabAttached {
                tab: tab(20, 77, "D", "https://d.example"),
                window_id: 77,
                position: 0,
            },
            1200.0,
        );

        assert!(index.metadata(20).is_none());
        assert_eq!(delta.metadata_changed, vec![20]);
        assert!(index.window(77).is_none());
    }

    #[test]
    fn test_tab_activated() {
        let mut index = loaded();

        index.apply(
            IndexEvent::TabActivated {
                tab_id: 12,
                window_id: 1,
            },
            1700.0,
        );

        let active: Vec<bool> = index.window(1).unwrap().tabs.iter().map(|t| t.active).collect();
        assert_eq!(active, vec![false, false, true]);
        assert_eq!(index.metadata(12).unwrap().last_accessed, Some(1700.0));
    }

    #[test]
    fn test_window_created_and_removed() {
        let mut index = loaded();

        let delta = index.apply(IndexEvent::WindowCreated(window(3, false, vec![])), 1100.0);
        assert_eq!(delta.windows_added, vec![3]);
        assert!(index.window(3).unwrap().tabs.is_empty());

        index.apply(IndexEvent::TabCreated(tab(30, 3, "E", "https://e.example")), 1200.0);
        let delta = index.apply(IndexEvent::WindowRemoved(3), 1300.0);

        assert_eq!(delta.windows_removed, vec![3]);
        assert!(index.window(3).is_none());
        assert!(index.metadata(30).is_none());
    }

    #[test]
    fn test_window_created_non_normal_is_ignored() {
        let mut index = loaded();
        let mut devtools = window(4, false, vec![]);
        devtools.window_type = WindowType::Devtools;

        assert!(index.apply(IndexEvent::WindowCreated(devtools), 1100.0).is_empty());
        assert!(index.window(4).is_none());
    }

    #[test]
    fn test_window_created_twice_is_noop() {
        let mut index = loaded();

        let delta = index.apply(IndexEvent::WindowCreated(window(1, false, vec![])), 1100.0);
        assert!(delta.is_empty());
        assert_eq!(tab_ids(&index, 1), vec![10, 11, 12]);
    }

    #[test]
    fn test_focus_change_keeps_single_focused_window() {
        let mut index = TabIndex::new();
        index.load_snapshot(
            vec![window(1, true, vec![]), window(2, true, vec![]), window(3, false, vec![])],
            1.0,
        );

        index.apply(IndexEvent::WindowFocusChanged(3), 2.0);

        let focused: Vec<WindowId> = index
            .windows()
            .iter()
            .filter(|w| w.focused)
            .map(|w| w.window_id)
            .collect();
        assert_eq!(focused, vec![3]);
    }

    #[test]
    fn test_focus_leaving_browser_clears_focus() {
        let mut index = loaded();

        index.apply(IndexEvent::WindowFocusChanged(WINDOW_ID_NONE), 2000.0);

        assert!(index.windows().iter().all(|w| !w.focused));
    }

    #[test]
    fn test_snapshot_is_detached_copy() {
        let mut index = loaded();
        let snapshot = index.snapshot();
        let metadata = index.metadata_snapshot();

        index.apply(
            IndexEvent::TabRemoved {
                tab_id: 10,
                window_id: 1,
            },
            1100.0,
        );

        assert_eq!(snapshot[0].tabs.len(), 3);
        assert!(metadata.contains_key(&10));
    }

    #[test]
    fn test_last_updated_never_goes_backwards() {
        let mut index = loaded();

        index.apply(IndexEvent::WindowFocusChanged(2), 500.0);

        assert_eq!(index.last_updated(), 1000.0);
    }

    #[test]
    fn test_sequence_keeps_tabs_unique() {
        let mut index = loaded();
        let events = vec![
            IndexEvent::WindowCreated(window(3, false, vec![])),
            IndexEvent::TabDetached {
                tab_id: 10,
                window_id: 1,
            },
            IndexEvent::TabAttached {
                tab: tab(10, 3, "A", "https://a.example"),
                window_id: 3,
                position: 0,
            },
            IndexEvent::TabCreated(tab(10, 2, "A", "https://a.example")),
            IndexEvent::TabAttached {
                tab: tab(12, 3, "C", "https://c.example"),
                window_id: 3,
                position: 0,
            },
            IndexEvent::TabMoved {
                tab_id: 12,
                window_id: 3,
                to_index: 1,
            },
            IndexEvent::TabRemoved {
                tab_id: 11,
                window_id: 1,
            },
        ];

        for (i, event) in events.into_iter().enumerate() {
            index.apply(event, 2000.0 + i as f64);
            assert_tabs_unique(&index);
        }

        assert_eq!(tab_ids(&index, 1), Vec::<TabId>::new());
        assert_eq!(tab_ids(&index, 2), vec![20, 10]);
        assert_eq!(tab_ids(&index, 3), vec![12]);
        for id in index.metadata_snapshot().keys() {
            assert!(index.locate(*id).is_some());
        }
    }
}
