/// Bridge to the chrome.* extension APIs
use crate::background::{Background, Reply};
use crate::error::{Result, TabStackError};
use crate::events::{ActiveInfo, AttachInfo, DetachInfo, HostEvent, MoveInfo, RemoveInfo};
use crate::host::{
    BookmarkNode, BookmarkStore, CalendarDate, Clock, NewBookmark, SettingsStore, TabHost,
};
use crate::messages::{Response, parse_request};
use crate::settings::{SETTINGS_KEYS, Settings, StorageChange};
use crate::tab_data::{HostWindow, Tab, TabId, Timestamp, WindowId};
use futures::channel::mpsc::UnboundedSender;
use log::{error, info, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::collections::BTreeMap;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(catch, js_namespace = ["chrome", "windows"], js_name = "getAll")]
    async fn windows_get_all(query: JsValue) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "windows"], js_name = "update")]
    async fn windows_update(window_id: i32, info: JsValue) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "windows"], js_name = "create")]
    async fn windows_create(data: JsValue) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "windows"], js_name = "remove")]
    async fn windows_remove(window_id: i32) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "tabs"], js_name = "get")]
    async fn tabs_get(tab_id: i32) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "tabs"], js_name = "update")]
    async fn tabs_update(tab_id: i32, properties: JsValue) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "tabs"], js_name = "remove")]
    async fn tabs_remove(tab_ids: JsValue) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "tabs"], js_name = "move")]
    async fn tabs_move(tab_id: i32, properties: JsValue) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "bookmarks"], js_name = "getChildren")]
    async fn bookmarks_get_children(id: &str) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "bookmarks"], js_name = "create")]
    async fn bookmarks_create(bookmark: JsValue) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "sync"], js_name = "get")]
    async fn storage_sync_get(keys: JsValue) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "sync"], js_name = "set")]
    async fn storage_sync_set(items: JsValue) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "tabs", "onCreated"], js_name = "addListener")]
    fn on_tab_created(callback: &Closure<dyn FnMut(JsValue)>);

    #[wasm_bindgen(js_namespace = ["chrome", "tabs", "onRemoved"], js_name = "addListener")]
    fn on_tab_removed(callback: &Closure<dyn FnMut(i32, JsValue)>);

    #[wasm_bindgen(js_namespace = ["chrome", "tabs", "onUpdated"], js_name = "addListener")]
    fn on_tab_updated(callback: &Closure<dyn FnMut(i32, JsValue, JsValue)>);

    #[wasm_bindgen(js_namespace = ["chrome", "tabs", "onMoved"], js_name = "addListener")]
    fn on_tab_moved(callback: &Closure<dyn FnMut(i32, JsValue)>);

    #[wasm_bindgen(js_namespace = ["chrome", "tabs", "onAttached"], js_name = "addListener")]
    fn on_tab_attached(callback: &Closure<dyn FnMut(i32, JsValue)>);

    #[wasm_bindgen(js_namespace = ["chrome", "tabs", "onDetached"], js_name = "addListener")]
    fn on_tab_detached(callback: &Closure<dyn FnMut(i32, JsValue)>);

    #[wasm_bindgen(js_namespace = ["chrome", "tabs", "onActivated"], js_name = "addListener")]
    fn on_tab_activated(callback: &Closure<dyn FnMut(JsValue)>);

    #[wasm_bindgen(js_namespace = ["chrome", "windows", "onCreated"], js_name = "addListener")]
    fn on_window_created(callback: &Closure<dyn FnMut(JsValue)>);

    #[wasm_bindgen(js_namespace = ["chrome", "windows", "onRemoved"], js_name = "addListener")]
    fn on_window_removed(callback: &Closure<dyn FnMut(i32)>);

    #[wasm_bindgen(js_namespace = ["chrome", "windows", "onFocusChanged"], js_name = "addListener")]
    fn on_window_focus_changed(callback: &Closure<dyn FnMut(i32)>);

    #[wasm_bindgen(js_namespace = ["chrome", "storage", "onChanged"], js_name = "addListener")]
    fn on_storage_changed(callback: &Closure<dyn FnMut(JsValue, String)>);

    #[wasm_bindgen(js_namespace = ["chrome", "runtime", "onMessage"], js_name = "addListener")]
    fn on_message(callback: &Closure<dyn FnMut(JsValue, JsValue, js_sys::Function) -> bool>);

    #[wasm_bindgen(js_namespace = ["chrome", "runtime", "onInstalled"], js_name = "addListener")]
    fn on_installed(callback: &Closure<dyn FnMut(JsValue)>);
}

/// Turn a rejected chrome promise into an error, keeping `Error.message`
fn js_error(e: JsValue) -> TabStackError {
    let message = e
        .as_string()
        .or_else(|| {
            js_sys::Reflect::get(&e, &JsValue::from_str("message"))
                .ok()
                .and_then(|m| m.as_string())
        })
        .unwrap_or_else(|| format!("{:?}", e));
    TabStackError::Host(message)
}

fn from_js<T: DeserializeOwned>(value: JsValue, what: &'static str) -> Result<T> {
    serde_wasm_bindgen::from_value(value).map_err(|e| TabStackError::Decode {
        what,
        detail: e.to_string(),
    })
}

/// Plain JS objects (not `Map`s), which is what the chrome APIs and the
/// extension pages expect
fn to_js<T: Serialize + ?Sized>(value: &T, what: &'static str) -> Result<JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| TabStackError::Encode {
            what,
            detail: e.to_string(),
        })
}

/// The live browser
pub struct ChromeHost;

impl TabHost for ChromeHost {
    async fn fetch_windows(&self) -> Result<Vec<HostWindow>> {
        let query = to_js(&json!({"populate": true, "windowTypes": ["normal"]}), "query")?;
        let windows = windows_get_all(query).await.map_err(js_error)?;
        from_js(windows, "windows")
    }

    async fn get_tab(&self, tab_id: TabId) -> Result<Tab> {
        let tab = tabs_get(tab_id).await.map_err(js_error)?;
        from_js(tab, "tab")
    }

    async fn focus_tab(&self, tab_id: TabId, window_id: WindowId) -> Result<()> {
        tabs_update(tab_id, to_js(&json!({"active": true}), "tab update")?)
            .await
            .map_err(js_error)?;
        windows_update(window_id, to_js(&json!({"focused": true}), "window update")?)
            .await
            .map_err(js_error)?;
        Ok(())
    }

    async fn close_tabs(&self, tab_ids: &[TabId]) -> Result<()> {
        tabs_remove(to_js(tab_ids, "tab ids")?)
            .await
            .map_err(js_error)?;
        Ok(())
    }

    async fn close_window(&self, window_id: WindowId) -> Result<()> {
        windows_remove(window_id).await.map_err(js_error)?;
        Ok(())
    }

    async fn create_window_with_tab(&self, tab_id: TabId) -> Result<WindowId> {
        let created = windows_create(to_js(&json!({"tabId": tab_id}), "window")?)
            .await
            .map_err(js_error)?;
        let window: HostWindow = from_js(created, "window")?;
        window
            .id
            .ok_or_else(|| TabStackError::Host("Created window has no id".to_string()))
    }

    async fn move_tab(&self, tab_id: TabId, window_id: WindowId, index: usize) -> Result<()> {
        let properties = to_js(&json!({"windowId": window_id, "index": index}), "move")?;
        tabs_move(tab_id, properties).await.map_err(js_error)?;
        Ok(())
    }
}

impl BookmarkStore for ChromeHost {
    async fn get_children(&self, parent_id: &str) -> Result<Vec<BookmarkNode>> {
        let children = bookmarks_get_children(parent_id).await.map_err(js_error)?;
        from_js(children, "bookmarks")
    }

    async fn create_bookmark(&self, bookmark: NewBookmark) -> Result<BookmarkNode> {
        let created = bookmarks_create(to_js(&bookmark, "bookmark")?)
            .await
            .map_err(js_error)?;
        from_js(created, "bookmark")
    }
}

impl SettingsStore for ChromeHost {
    async fn load_settings(&self) -> Result<Option<Settings>> {
        let items = storage_sync_get(to_js(&SETTINGS_KEYS, "settings keys")?)
            .await
            .map_err(js_error)?;
        Settings::from_storage(from_js(items, "settings")?)
    }

    async fn save_settings(&self, settings: &Settings) -> Result<()> {
        storage_sync_set(to_js(&settings.to_storage()?, "settings")?)
            .await
            .map_err(js_error)?;
        Ok(())
    }
}

pub struct BrowserClock;

impl Clock for BrowserClock {
    fn now(&self) -> Timestamp {
        js_sys::Date::now()
    }

    fn today(&self) -> CalendarDate {
        let date = js_sys::Date::new_0();
        CalendarDate {
            year: date.get_full_year() as i32,
            month: date.get_month() + 1,
            day: date.get_date(),
        }
    }
}

fn forward(sender: &UnboundedSender<HostEvent>, event: HostEvent) {
    if let Err(e) = sender.unbounded_send(event) {
        warn!("Event queue closed, dropping {}", e.into_inner().name());
    }
}

fn parse<T: DeserializeOwned>(value: JsValue, what: &'static str) -> Option<T> {
    match from_js(value, what) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!("Ignoring notification: {}", e);
            None
        }
    }
}

/// Subscribe to every tab and window notification, queueing each one
fn register_listeners(sender: &UnboundedSender<HostEvent>) {
    let tx = sender.clone();
    let callback = Closure::<dyn FnMut(JsValue)>::new(move |tab: JsValue| {
        if let Some(tab) = parse::<Tab>(tab, "tab") {
            forward(&tx, HostEvent::TabCreated(tab));
        }
    });
    on_tab_created(&callback);
    callback.forget();

    let tx = sender.clone();
    let callback = Closure::<dyn FnMut(i32, JsValue)>::new(move |tab_id: i32, info: JsValue| {
        if let Some(info) = parse::<RemoveInfo>(info, "removeInfo") {
            forward(&tx, HostEvent::TabRemoved { tab_id, info });
        }
    });
    on_tab_removed(&callback);
    callback.forget();

    let tx = sender.clone();
    let callback = Closure::<dyn FnMut(i32, JsValue, JsValue)>::new(
        move |tab_id: i32, _change: JsValue, tab: JsValue| {
            if let Some(tab) = parse::<Tab>(tab, "tab") {
                forward(&tx, HostEvent::TabUpdated { tab_id, tab });
            }
        },
    );
    on_tab_updated(&callback);
    callback.forget();

    let tx = sender.clone();
    let callback = Closure::<dyn FnMut(i32, JsValue)>::new(move |tab_id: i32, info: JsValue| {
        if let Some(info) = parse::<MoveInfo>(info, "moveInfo") {
            forward(&tx, HostEvent::TabMoved { tab_id, info });
        }
    });
    on_tab_moved(&callback);
    callback.forget();

    let tx = sender.clone();
    let callback = Closure::<dyn FnMut(i32, JsValue)>::new(move |tab_id: i32, info: JsValue| {
        if let Some(info) = parse::<AttachInfo>(info, "attachInfo") {
            forward(&tx, HostEvent::TabAttached { tab_id, info });
        }
    });
    on_tab_attached(&callback);
    callback.forget();

    let tx = sender.clone();
    let callback = Closure::<dyn FnMut(i32, JsValue)>::new(move |tab_id: i32, info: JsValue| {
        if let Some(info) = parse::<DetachInfo>(info, "detachInfo") {
            forward(&tx, HostEvent::TabDetached { tab_id, info });
        }
    });
    on_tab_detached(&callback);
    callback.forget();

    let tx = sender.clone();
    let callback = Closure::<dyn FnMut(JsValue)>::new(move |info: JsValue| {
        if let Some(info) = parse::<ActiveInfo>(info, "activeInfo") {
            forward(&tx, HostEvent::TabActivated(info));
        }
    });
    on_tab_activated(&callback);
    callback.forget();

    let tx = sender.clone();
    let callback = Closure::<dyn FnMut(JsValue)>::new(move |window: JsValue| {
        if let Some(window) = parse::<HostWindow>(window, "window") {
            forward(&tx, HostEvent::WindowCreated(window));
        }
    });
    on_window_created(&callback);
    callback.forget();

    let tx = sender.clone();
    let callback = Closure::<dyn FnMut(i32)>::new(move |window_id: i32| {
        forward(&tx, HostEvent::WindowRemoved(window_id));
    });
    on_window_removed(&callback);
    callback.forget();

    let tx = sender.clone();
    let callback = Closure::<dyn FnMut(i32)>::new(move |window_id: i32| {
        forward(&tx, HostEvent::WindowFocusChanged(window_id));
    });
    on_window_focus_changed(&callback);
    callback.forget();
}

/// Deliver exactly one response through chrome's `sendResponse`
fn respond(send_response: &js_sys::Function, response: &Response) {
    let value = to_js(response, "response").or_else(|e| {
        error!("{}", e);
        to_js(&Response::error(e.to_string()), "response")
    });
    match value {
        Ok(value) => {
            if let Err(e) = send_response.call1(&JsValue::NULL, &value) {
                error!("Failed to deliver response: {:?}", e);
            }
        }
        Err(e) => error!("{}", e),
    }
}

fn register_message_handler(background: Background<ChromeHost, BrowserClock>) {
    let callback = Closure::<dyn FnMut(JsValue, JsValue, js_sys::Function) -> bool>::new(
        move |message: JsValue, _sender: JsValue, send_response: js_sys::Function| {
            let request = match from_js::<serde_json::Value>(message, "message")
                .and_then(parse_request)
            {
                Ok(Some(request)) => request,
                Ok(None) => return false,
                Err(e) => {
                    warn!("{}", e);
                    respond(&send_response, &Response::error(e.to_string()));
                    return false;
                }
            };

            match background.dispatch(request) {
                Reply::Now(response) => {
                    respond(&send_response, &response);
                    false
                }
                Reply::Later(pending) => {
                    spawn_local(async move {
                        let response = pending.await;
                        respond(&send_response, &response);
                    });
                    // Keep the message channel open for the async reply
                    true
                }
            }
        },
    );
    on_message(&callback);
    callback.forget();
}

fn register_settings_listener(background: Background<ChromeHost, BrowserClock>) {
    let callback =
        Closure::<dyn FnMut(JsValue, String)>::new(move |changes: JsValue, area: String| {
            if area != "sync" {
                return;
            }
            let changes = parse::<BTreeMap<String, StorageChange>>(changes, "storage changes");
            if let Some(changes) = changes {
                background.apply_settings_changes(&changes);
            }
        });
    on_storage_changed(&callback);
    callback.forget();
}

fn register_install_handler(background: Background<ChromeHost, BrowserClock>) {
    let callback = Closure::<dyn FnMut(JsValue)>::new(move |details: JsValue| {
        let reason = js_sys::Reflect::get(&details, &JsValue::from_str("reason"))
            .ok()
            .and_then(|r| r.as_string())
            .unwrap_or_default();
        let background = background.clone();
        spawn_local(async move {
            background.on_installed(&reason).await;
        });
    });
    on_installed(&callback);
    callback.forget();
}

/// Boot the service worker. Listeners are registered synchronously so the
/// browser can wake the worker for them; the snapshot loads afterwards.
pub fn start() {
    info!("TabStack background starting");
    let (background, events) = Background::new(ChromeHost, BrowserClock);

    register_listeners(&background.sender());
    register_install_handler(background.clone());
    register_settings_listener(background.clone());
    register_message_handler(background.clone());

    spawn_local(async move {
        background.load_settings().await;
        background.run(events).await;
    });
}
