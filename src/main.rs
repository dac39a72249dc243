#[cfg(not(target_arch = "wasm32"))]
use {
    clap::Parser,
    series_cache::{Cli, run_cli},
    std::panic,
};

#[cfg(target_arch = "wasm32")]
use {
    series_cache::{CacheSettings, SeriesCache, cache::LocalStorageStore},
    wasm_bindgen::prelude::*,
};

#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(target_arch = "wasm32")]
pub fn init_log() {
    let (global_level, my_code_level) = if cfg!(debug_assertions) {
        (log::LevelFilter::Warn, log::LevelFilter::Info)
    } else {
        (log::LevelFilter::Error, log::LevelFilter::Warn)
    };

    let _ = fern::Dispatch::new()
        .level(global_level)
        .level_for("series_cache", my_code_level)
        .chain(fern::Output::call(|record| {
            let msg = record.args().to_string();
            match record.level() {
                log::Level::Error => web_sys::console::error_1(&msg.into()),
                log::Level::Warn => web_sys::console::warn_1(&msg.into()),
                log::Level::Info => web_sys::console::info_1(&msg.into()),
                log::Level::Debug | log::Level::Trace => web_sys::console::log_1(&msg.into()),
            }
        }))
        .apply();
}

/// Page start-up: wire logging, then sweep stale entries left by earlier visits.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    init_log();

    let store = LocalStorageStore::open().map_err(|e| JsValue::from_str(&e.to_string()))?;
    let cache = SeriesCache::new(store, CacheSettings::default());
    let removed = cache.evict_expired();
    if removed > 0 {
        log::info!("Removed {} stale cache entries on start-up", removed);
    }
    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::force_capture();
        log::error!("CRITICAL PANIC:\n{}\nStack Trace:\n{}", info, backtrace);
    }));

    let (global_level, my_code_level) = if cfg!(debug_assertions) {
        (log::LevelFilter::Warn, log::LevelFilter::Info)
    } else {
        (log::LevelFilter::Error, log::LevelFilter::Warn)
    };

    let mut builder = env_logger::Builder::new();

    builder
        .filter(None, global_level)
        .filter(Some("series_cache"), my_code_level)
        .init();

    let args = Cli::parse();
    run_cli(args)
}
