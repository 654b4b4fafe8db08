use std::sync::OnceLock;

use anyhow::{Context, Result};
use tokio::runtime::{Builder, Runtime};

/// Blocking adapter for async HTTP clients called from worker threads.
///
/// Gateway calls run on the task runner's background threads, which are plain OS
/// threads. This lets them drive `reqwest` futures to completion without making the
/// whole UI async.
pub fn block_on<F, T>(fut: F) -> Result<T>
where
    F: std::future::Future<Output = Result<T>>,
{
    shared()?.block_on(fut)
}

/// One runtime for the whole process. `reqwest` clients keep pooled connections on
/// the runtime that opened them, so every request must go through the same one.
fn shared() -> Result<&'static Runtime> {
    static RUNTIME: OnceLock<Runtime> = OnceLock::new();
    if let Some(rt) = RUNTIME.get() {
        return Ok(rt);
    }
    let rt = Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("lazrgit-http")
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;
    Ok(RUNTIME.get_or_init(|| rt))
}
