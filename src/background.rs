/// Background service: owns the tab index and serves the extension pages.
///
/// Host notifications are pushed onto one queue and applied strictly in
/// order by `run`. A notification that needs a host round trip (attach) is
/// awaited inside the loop, so nothing queued behind it can overtake it.
use crate::error::{Result, TabStackError};
use crate::events::HostEvent;
use crate::favorites::add_tabs_to_favorites;
use crate::host::{BookmarkStore, Clock, SettingsStore, TabHost};
use crate::index::{IndexDelta, IndexEvent, TabIndex};
use crate::messages::{Request, Response};
use crate::operations::count_tabs;
use crate::settings::{Settings, StorageChange, touches_settings};
use crate::tab_data::{Tab, TabId};
use futures::StreamExt;
use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};
use futures::future::LocalBoxFuture;
use log::{debug, error, info, warn};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// How a request gets answered
pub enum Reply {
    /// Answered synchronously from the index
    Now(Response),
    /// Needs the host; the caller must keep the response channel open
    Later(LocalBoxFuture<'static, Response>),
}

pub struct Background<H, C> {
    index: Rc<RefCell<TabIndex>>,
    settings: Rc<RefCell<Settings>>,
    host: Rc<H>,
    clock: Rc<C>,
    events: UnboundedSender<HostEvent>,
}

impl<H, C> Clone for Background<H, C> {
    fn clone(&self) -> Self {
        Background {
            index: Rc::clone(&self.index),
            settings: Rc::clone(&self.settings),
            host: Rc::clone(&self.host),
            clock: Rc::clone(&self.clock),
            events: self.events.clone(),
        }
    }
}

impl<H, C> Background<H, C>
where
    H: TabHost + BookmarkStore + SettingsStore + 'static,
    C: Clock + 'static,
{
    /// Create the service together with the receiving end of its event queue
    pub fn new(host: H, clock: C) -> (Self, UnboundedReceiver<HostEvent>) {
        let (events, receiver) = unbounded();
        let background = Background {
            index: Rc::new(RefCell::new(TabIndex::new())),
            settings: Rc::new(RefCell::new(Settings::new())),
            host: Rc::new(host),
            clock: Rc::new(clock),
            events,
        };
        (background, receiver)
    }

    /// Sender for host listeners to enqueue notifications
    pub fn sender(&self) -> UnboundedSender<HostEvent> {
        self.events.clone()
    }

    pub fn with_index<R>(&self, f: impl FnOnce(&TabIndex) -> R) -> R {
        f(&self.index.borrow())
    }

    pub fn settings(&self) -> Settings {
        self.settings.borrow().clone()
    }

    pub async fn load_settings(&self) {
        match self.host.load_settings().await {
            Ok(Some(settings)) => {
                info!("Loaded settings: folder \"{}\"", settings.favorites_folder);
                *self.settings.borrow_mut() = settings;
            }
            Ok(None) => info!("No stored settings, using defaults"),
            Err(e) => warn!("Failed to load settings, using defaults: {}", e),
        }
    }

    /// Apply a `storage.onChanged` notification from the sync area
    pub fn apply_settings_changes(&self, changes: &BTreeMap<String, StorageChange>) {
        if !touches_settings(changes) {
            return;
        }
        let updated = self.settings.borrow().with_changes(changes);
        match updated {
            Ok(settings) => {
                info!("Settings changed: enabled={}", settings.extension_enabled);
                *self.settings.borrow_mut() = settings;
            }
            Err(e) => warn!("Ignoring settings change: {}", e),
        }
    }

    /// First install writes the default settings
    pub async fn on_installed(&self, reason: &str) {
        info!("Extension installed: {}", reason);
        if reason != "install" {
            return;
        }
        let settings = self.settings();
        if let Err(e) = self.host.save_settings(&settings).await {
            warn!("Failed to store default settings: {}", e);
        }
    }

    /// Load a full snapshot of the host's windows into the index
    pub async fn initialize(&self) -> Result<IndexDelta> {
        let windows = self.host.fetch_windows().await?;
        let now = self.clock.now();

        let mut index = self.index.borrow_mut();
        let delta = index.load_snapshot(windows, now);
        info!(
            "Indexed {} tabs in {} windows",
            count_tabs(index.windows()),
            index.windows().len()
        );
        Ok(delta)
    }

    /// Initialize, then apply queued notifications until the queue closes
    pub async fn run(&self, mut events: UnboundedReceiver<HostEvent>) {
        if let Err(e) = self.initialize().await {
            error!("Failed to load windows: {}", e);
        }

        while let Some(event) = events.next().await {
            self.process(event).await;
        }
        debug!("Event queue closed");
    }

    /// Apply one notification to the index
    pub async fn process(&self, event: HostEvent) -> IndexDelta {
        let name = event.name();
        let index_event = match event {
            // Reload over the current index so surviving tabs keep their history
            HostEvent::Reindex => {
                return match self.initialize().await {
                    Ok(delta) => delta,
                    Err(e) => {
                        error!("Failed to reload windows: {}", e);
                        IndexDelta::default()
                    }
                };
            }
            HostEvent::TabAttached { tab_id, info } => match self.host.get_tab(tab_id).await {
                Ok(tab) => IndexEvent::TabAttached {
                    tab: Tab {
                        id: Some(tab_id),
                        ..tab
                    },
                    window_id: info.new_window_id,
                    position: info.new_position,
                },
                Err(e) => {
                    warn!("Dropping attach of tab {}: {}", tab_id, e);
                    return IndexDelta::default();
                }
            },
            HostEvent::TabCreated(tab) => IndexEvent::TabCreated(tab),
            HostEvent::TabRemoved { tab_id, info } => IndexEvent::TabRemoved {
                tab_id,
                window_id: info.window_id,
            },
            HostEvent::TabUpdated { tab_id, tab } => IndexEvent::TabUpdated { tab_id, tab },
            HostEvent::TabMoved { tab_id, info } => IndexEvent::TabMoved {
                tab_id,
                window_id: info.window_id,
                to_index: info.to_index,
            },
            HostEvent::TabDetached { tab_id, info } => IndexEvent::TabDetached {
                tab_id,
                window_id: info.old_window_id,
            },
            HostEvent::TabActivated(info) => IndexEvent::TabActivated {
                tab_id: info.tab_id,
                window_id: info.window_id,
            },
            HostEvent::WindowCreated(window) => IndexEvent::WindowCreated(window),
            HostEvent::WindowRemoved(window_id) => IndexEvent::WindowRemoved(window_id),
            HostEvent::WindowFocusChanged(window_id) => IndexEvent::WindowFocusChanged(window_id),
        };

        let now = self.clock.now();
        let delta = self.index.borrow_mut().apply(index_event, now);
        if delta.is_empty() {
            debug!("{}: no change", name);
        } else {
            debug!("{}: {:?}", name, delta);
        }
        delta
    }

    /// Answer index queries; `None` for requests that need the host
    pub fn answer_query(&self, request: &Request) -> Option<Response> {
        self.with_index(|index| match request {
            Request::Search { query } => Some(Response::SearchResults {
                results: index.search(query),
            }),
            Request::GetIndex => Some(Response::IndexUpdate {
                results: index.snapshot(),
            }),
            Request::GetMetadata => Some(Response::Metadata {
                metadata: index.metadata_snapshot(),
            }),
            _ => None,
        })
    }

    /// Route a request to a synchronous or deferred answer
    pub fn dispatch(&self, request: Request) -> Reply {
        match self.answer_query(&request) {
            Some(response) => Reply::Now(response),
            None => {
                let background = self.clone();
                Reply::Later(Box::pin(async move { background.execute(request).await }))
            }
        }
    }

    /// Handle any request, always producing exactly one response
    pub async fn execute(&self, request: Request) -> Response {
        if let Some(response) = self.answer_query(&request) {
            return response;
        }
        if !self.settings.borrow().extension_enabled {
            return Response::error(TabStackError::Disabled.to_string());
        }

        match self.run_command(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Request failed: {}", e);
                Response::error(e.to_string())
            }
        }
    }

    async fn run_command(&self, request: Request) -> Result<Response> {
        match request {
            Request::FocusTab { tab_id, window_id } => {
                self.host.focus_tab(tab_id, window_id).await?;
                Ok(Response::ok())
            }
            Request::CloseTab { tab_id } => {
                self.host.close_tabs(&[tab_id]).await?;
                Ok(Response::ok())
            }
            Request::CloseTabs { tab_ids } => {
                if !tab_ids.is_empty() {
                    self.host.close_tabs(&tab_ids).await?;
                }
                Ok(Response::ok())
            }
            Request::CloseWindow { window_id } => {
                self.host.close_window(window_id).await?;
                Ok(Response::ok())
            }
            Request::MoveToNewWindow { tab_ids } => self.move_to_new_window(&tab_ids).await,
            Request::AddToFavorites { tab_ids } => {
                let settings = self.settings();
                let report = add_tabs_to_favorites(
                    self.host.as_ref(),
                    self.host.as_ref(),
                    self.clock.as_ref(),
                    &settings,
                    &tab_ids,
                )
                .await?;
                Ok(Response::Success {
                    message: None,
                    favorites: Some(report),
                })
            }
            Request::Reindex => {
                self.events
                    .unbounded_send(HostEvent::Reindex)
                    .map_err(|e| TabStackError::InvalidRequest(e.to_string()))?;
                Ok(Response::ok_with("Reindex scheduled"))
            }
            Request::Search { .. } | Request::GetIndex | Request::GetMetadata => Err(
                TabStackError::InvalidRequest("query routed as a command".to_string()),
            ),
        }
    }

    async fn move_to_new_window(&self, tab_ids: &[TabId]) -> Result<Response> {
        let Some((first, rest)) = tab_ids.split_first() else {
            return Err(TabStackError::InvalidRequest("no tabs selected".to_string()));
        };

        let window_id = self.host.create_window_with_tab(*first).await?;
        let mut moved = 1;
        for (i, tab_id) in rest.iter().enumerate() {
            match self.host.move_tab(*tab_id, window_id, i + 1).await {
                Ok(()) => moved += 1,
                Err(e) => warn!("Failed to move tab {}: {}", tab_id, e),
            }
        }

        Ok(Response::ok_with(format!(
            "Moved {} of {} tabs to a new window",
            moved,
            tab_ids.len()
        )))
    }
}
