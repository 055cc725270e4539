/// Export of selected tabs into a dated bookmark folder

use crate::error::{Result, TabStackError};
use crate::host::{BookmarkNode, BookmarkStore, Clock, NewBookmark, TabHost};
use crate::settings::Settings;
use crate::tab_data::{Tab, TabId};
use crate::url_filter::is_bookmarkable;
use log::{info, warn};
use serde::Serialize;

/// Outcome of one export
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FavoritesReport {
    pub added_count: usize,
    pub skipped_count: usize,
    pub date_folder: String,
}

/// Find a child folder of `parent_id` named exactly `name`, creating it if
/// there is none.
pub async fn ensure_folder<B: BookmarkStore>(
    bookmarks: &B,
    parent_id: &str,
    name: &str,
) -> Result<BookmarkNode> {
    let children = bookmarks.get_children(parent_id).await?;
    if let Some(existing) = children
        .into_iter()
        .find(|node| node.is_folder() && node.title == name)
    {
        return Ok(existing);
    }

    info!("Creating bookmark folder \"{}\" under {}", name, parent_id);
    bookmarks.create_bookmark(NewBookmark::folder(parent_id, name)).await
}

async fn resolve_tabs<H: TabHost>(host: &H, tab_ids: &[TabId]) -> Vec<Tab> {
    let mut tabs = Vec::with_capacity(tab_ids.len());
    for tab_id in tab_ids {
        match host.get_tab(*tab_id).await {
            Ok(tab) => tabs.push(tab),
            Err(e) => warn!("Skipping tab {}: {}", tab_id, e),
        }
    }
    tabs
}

/// Bookmark the given tabs under `<favorites folder>/<YYYY-MM-DD>`.
///
/// Tabs that no longer exist are dropped. Internal pages and tabs whose
/// bookmark cannot be created count as skipped. Only an empty set of
/// resolved tabs or an unusable folder aborts the export.
pub async fn add_tabs_to_favorites<H, B, C>(
    host: &H,
    bookmarks: &B,
    clock: &C,
    settings: &Settings,
    tab_ids: &[TabId],
) -> Result<FavoritesReport>
where
    H: TabHost,
    B: BookmarkStore,
    C: Clock,
{
    let tabs = resolve_tabs(host, tab_ids).await;
    if tabs.is_empty() {
        return Err(TabStackError::NoValidTabs);
    }

    let date_folder = clock.today().label();

    let root = ensure_folder(
        bookmarks,
        &settings.favorites_parent_id,
        &settings.favorites_folder,
    )
    .await
    .map_err(|e| TabStackError::BookmarkFolder {
        name: settings.favorites_folder.clone(),
        source: Box::new(e),
    })?;

    let dated = ensure_folder(bookmarks, &root.id, &date_folder)
        .await
        .map_err(|e| TabStackError::BookmarkFolder {
            name: format!("{}/{}", settings.favorites_folder, date_folder),
            source: Box::new(e),
        })?;

    let mut added_count = 0;
    let mut skipped_count = 0;
    for tab in &tabs {
        let url = tab.url_or_empty();
        if !is_bookmarkable(url, &settings.internal_schemes) {
            skipped_count += 1;
            continue;
        }

        let title = match tab.title_or_empty() {
            "" => url,
            title => title,
        };
        match bookmarks
            .create_bookmark(NewBookmark::link(&dated.id, title, url))
            .await
        {
            Ok(_) => added_count += 1,
            Err(e) => {
                warn!("Failed to bookmark {}: {}", url, e);
                skipped_count += 1;
            }
        }
    }

    info!(
        "Added {} tabs to {}/{} ({} skipped)",
        added_count, settings.favorites_folder, date_folder, skipped_count
    );

    Ok(FavoritesReport {
        added_count,
        skipped_count,
        date_folder,
    })
}
