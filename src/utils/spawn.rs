use std::future::Future;

/// Fire-and-forget a background future on whatever executor the target has.
/// Returns false (and drops the future) when there is nothing to run it on.
#[cfg(not(target_arch = "wasm32"))]
pub fn spawn_detached<F>(label: &str, future: F) -> bool
where
    F: Future<Output = ()> + Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(future);
            true
        }
        Err(_) => {
            log::warn!("No tokio runtime available; dropped background task '{}'", label);
            false
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub fn spawn_detached<F>(_label: &str, future: F) -> bool
where
    F: Future<Output = ()> + 'static,
{
    wasm_bindgen_futures::spawn_local(future);
    true
}
