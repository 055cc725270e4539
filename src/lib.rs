/// TabStack - Chrome Extension background index of open tabs and windows
/// Built with Rust + WASM

pub mod background;
pub mod chrome;
pub mod error;
pub mod events;
pub mod favorites;
pub mod host;
pub mod index;
pub mod messages;
pub mod operations;
pub mod settings;
pub mod tab_data;
pub mod url_filter;

use wasm_bindgen::prelude::*;

// Set up panic hook for better error messages in the service worker console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    let level = if cfg!(debug_assertions) {
        log::Level::Debug
    } else {
        log::Level::Info
    };
    wasm_logger::init(wasm_logger::Config::new(level));
}

// Start indexing and serving the extension pages
#[wasm_bindgen]
pub fn start_background() {
    chrome::start();
}
