use anyhow::Result;

/// Everything the tracker does runs on one thread, the runtime only drives the timer view.
pub fn single_thread_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
