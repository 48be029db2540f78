//! Browser bindings
//!
//! Exposes the sandbox to JavaScript. Structured data crosses the boundary
//! as JSON strings; the page owns the animation loop and the canvas and
//! calls `advance` once per frame.

use glam::DVec2;
use wasm_bindgen::prelude::*;

use crate::config::SimConfig;
use crate::sandbox::{Sandbox, Viewport};
use crate::share;

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        // Logger already installed by an earlier module instance
        return;
    }
    log::info!("Barrage sandbox starting...");
}

/// Sandbox handle owned by the page
#[wasm_bindgen]
pub struct WebSandbox {
    inner: Sandbox,
}

#[wasm_bindgen]
impl WebSandbox {
    /// Build from a JSON config. Without a seed one is drawn from the OS.
    #[wasm_bindgen(constructor)]
    pub fn new(
        config_json: &str,
        width: f64,
        height: f64,
        seed: Option<f64>,
    ) -> Result<WebSandbox, JsValue> {
        let seed = match seed {
            Some(s) if s.is_finite() && s >= 0.0 => s as u64,
            _ => getrandom_03::u64().unwrap_or_default(),
        };
        let config = SimConfig::from_json_str(config_json);
        let inner = Sandbox::new(config, Viewport::new(width, height), seed).map_err(|e| {
            log::error!("Sandbox failed to start: {e}");
            js_error(e)
        })?;
        Ok(Self { inner })
    }

    /// Run fixed ticks for a frame delta in seconds
    pub fn advance(&mut self, frame_dt: f64) -> u32 {
        self.inner.advance(frame_dt)
    }

    pub fn start(&mut self) {
        self.inner.start();
    }

    pub fn stop(&mut self) {
        self.inner.stop();
    }

    pub fn reset(&mut self) {
        self.inner.reset();
    }

    #[wasm_bindgen(js_name = isRunning)]
    pub fn is_running(&self) -> bool {
        self.inner.is_running()
    }

    #[wasm_bindgen(js_name = setConfig)]
    pub fn set_config(&mut self, config_json: &str) {
        self.inner.set_config(SimConfig::from_json_str(config_json));
    }

    #[wasm_bindgen(js_name = configJson)]
    pub fn config_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.inner.config()).map_err(js_error)
    }

    pub fn resize(&mut self, width: f64, height: f64) -> Result<(), JsValue> {
        self.inner
            .resize(Viewport::new(width, height))
            .map_err(js_error)
    }

    /// Import a polygon arena exported by the arena editor
    #[wasm_bindgen(js_name = loadPolygon)]
    pub fn load_polygon(&mut self, json: &str) -> Result<(), JsValue> {
        self.inner.load_polygon_json(json).map_err(|e| {
            log::warn!("Rejected polygon arena: {e}");
            js_error(e)
        })
    }

    /// Post-tick snapshot as JSON
    pub fn snapshot(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.inner.snapshot()).map_err(js_error)
    }

    /// Arena boundary as JSON point chains (pixels, origin at the center)
    #[wasm_bindgen(js_name = arenaOutline)]
    pub fn arena_outline(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.inner.state().arena.outline()).map_err(js_error)
    }

    #[wasm_bindgen(js_name = moveCaster)]
    pub fn move_caster(&mut self, x: f64, y: f64) {
        self.inner.move_caster(DVec2::new(x, y));
    }

    #[wasm_bindgen(js_name = moveTarget)]
    pub fn move_target(&mut self, x: f64, y: f64) {
        self.inner.move_target(DVec2::new(x, y));
    }

    /// Current setup as a shareable query string
    #[wasm_bindgen(js_name = shareState)]
    pub fn share_state(&self) -> String {
        share::encode(self.inner.config(), &self.inner.entity_layout())
    }

    /// Apply a setup decoded from a shared query string
    #[wasm_bindgen(js_name = applyShared)]
    pub fn apply_shared(&mut self, encoded: &str) {
        let (config, layout) = share::decode(encoded);
        self.inner.set_config(config);
        self.inner.set_entity_layout(layout);
    }
}
