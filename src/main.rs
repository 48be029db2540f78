//! Barrage Sandbox entry point
//!
//! Natively this is a headless runner: it loads a config (and optionally a
//! polygon arena), casts for a number of simulated seconds and prints the
//! final snapshot as JSON. The browser build drives the library through
//! `platform::web` instead.
//!
//! Usage: `barrage-sandbox [config.json] [seconds] [arena.json]`

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::path::Path;
    use std::process::ExitCode;

    use barrage_sandbox::consts::SIM_DT;
    use barrage_sandbox::sim::PolygonArena;
    use barrage_sandbox::{Sandbox, SimConfig, Viewport};

    const DEFAULT_SECONDS: f64 = 30.0;
    const VIEWPORT: f64 = 800.0;
    const SEED: u64 = 0x5EA1;

    fn read_file(path: &Path) -> Option<String> {
        match std::fs::read_to_string(path) {
            Ok(text) => Some(text),
            Err(e) => {
                log::error!("Cannot read {}: {e}", path.display());
                None
            }
        }
    }

    pub fn run() -> ExitCode {
        let args: Vec<String> = std::env::args().skip(1).collect();

        let config = match args.first() {
            Some(path) => match read_file(Path::new(path)) {
                Some(text) => SimConfig::from_json_str(&text),
                None => return ExitCode::FAILURE,
            },
            None => SimConfig::default(),
        };

        let seconds = match args.get(1).map(|s| s.parse::<f64>()) {
            Some(Ok(s)) if s.is_finite() && s > 0.0 => s,
            Some(_) => {
                log::warn!("Invalid duration, using {DEFAULT_SECONDS}s");
                DEFAULT_SECONDS
            }
            None => DEFAULT_SECONDS,
        };

        let polygon = match args.get(2) {
            Some(path) => {
                let Some(text) = read_file(Path::new(path)) else {
                    return ExitCode::FAILURE;
                };
                match PolygonArena::from_json(&text) {
                    Ok(polygon) => Some(polygon),
                    Err(e) => {
                        log::error!("Invalid arena {path}: {e}");
                        return ExitCode::FAILURE;
                    }
                }
            }
            None => None,
        };

        let viewport = Viewport::new(VIEWPORT, VIEWPORT);
        let mut sandbox = match Sandbox::with_polygon(config, viewport, SEED, polygon) {
            Ok(sandbox) => sandbox,
            Err(e) => {
                log::error!("Sandbox failed to start: {e}");
                return ExitCode::FAILURE;
            }
        };

        sandbox.start();
        sandbox.run_ticks((seconds / SIM_DT).round() as u64);

        let snapshot = sandbox.snapshot();
        log::info!(
            "{:.1}s simulated: {} hits, {:.1} damage, {:.2} hits/s",
            snapshot.time,
            snapshot.total_hits,
            snapshot.total_damage,
            snapshot.hits_per_second
        );
        if snapshot.time > 0.0 {
            log::info!("Average DPS: {:.1}", snapshot.total_damage / snapshot.time);
        }

        match serde_json::to_string_pretty(&snapshot) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                log::error!("Cannot serialize snapshot: {e}");
                ExitCode::FAILURE
            }
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> std::process::ExitCode {
    env_logger::init();
    log::info!("Barrage Sandbox (native) starting...");
    native::run()
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is platform::web::start, this is just to satisfy the compiler
}
