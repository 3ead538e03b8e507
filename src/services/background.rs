//! Background work for blocking grid requests.

use tracing::warn;

/// Runs `job` off the calling thread.
///
/// Uses the tokio blocking pool when called inside a runtime and a named
/// thread otherwise. Returns `false` if the job could not be started; it
/// has been dropped in that case.
pub(crate) fn spawn_background<F>(name: &str, job: F) -> bool
where
    F: FnOnce() + Send + 'static,
{
    let parent_span = tracing::Span::current();
    let job = move || {
        let _parent = parent_span.enter();
        job();
    };

    if let Ok(handle) = tokio::runtime::Handle::try_current() {
        handle.spawn_blocking(job);
        return true;
    }

    match std::thread::Builder::new().name(name.to_string()).spawn(job) {
        Ok(_) => true,
        Err(e) => {
            warn!(error = %e, thread = name, "Failed to spawn background request");
            metrics::counter!("background_spawn_failed_total").increment(1);
            false
        },
    }
}
