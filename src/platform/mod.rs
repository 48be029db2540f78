//! Platform abstraction layer
//!
//! Browser bindings are compiled for wasm32 only. Native hosts drive
//! `Sandbox` directly (see the headless runner in `main.rs`).

#[cfg(target_arch = "wasm32")]
pub mod web;
