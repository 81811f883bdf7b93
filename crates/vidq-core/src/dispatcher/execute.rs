use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use super::pool::panic_message;
use super::DispatchContext;
use crate::error::CoreError;
use crate::fetcher::FetchRequest;
use crate::job::{Job, JobId};
use crate::progress::JobProgress;

/// One dispatched unit: Queued → Starting → fetch → Done | Failed.
pub(super) fn run_job(ctx: &DispatchContext, id: &JobId) {
    let Some(job) = ctx.store.get(id.as_str()) else {
        tracing::warn!(job_id = %id, "dispatched job not in store");
        return;
    };
    let span = tracing::info_span!("job", id = %id);
    let _enter = span.enter();

    let mut progress =
        JobProgress::with_log_interval(Arc::clone(&job), ctx.settings.progress_log_interval);
    if !progress.starting() {
        tracing::warn!("job already started, not running it again");
        return;
    }
    tracing::info!(url = job.url(), preset = job.preset(), "job started");

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| run_pipeline(ctx, &job, &mut progress)));
    match outcome {
        Ok(Ok(())) => {
            progress.complete();
            tracing::info!("job completed");
        }
        Ok(Err(e)) => {
            let message = e.to_string();
            tracing::warn!(error = %message, "job failed");
            progress.fail(&message);
        }
        Err(payload) => {
            let message = format!("internal error: {}", panic_message(payload.as_ref()));
            tracing::error!("job panicked: {}", message);
            progress.fail(&message);
        }
    }
}

fn run_pipeline(
    ctx: &DispatchContext,
    job: &Job,
    progress: &mut JobProgress,
) -> Result<(), CoreError> {
    let dir = &ctx.settings.download_dir;
    let preset = ctx.presets.resolve(job.preset())?;
    progress.log(format!("Preset: {}", preset.name));
    progress.log(format!("Saving to: {}", dir.display()));
    fs::create_dir_all(dir).map_err(|source| CoreError::Resource {
        path: dir.clone(),
        source,
    })?;

    let cookies = if job.use_cookies() {
        let source = ctx.settings.cookie_source();
        if source.is_none() {
            progress.log("Cookies requested but none are configured; continuing without");
        }
        source
    } else {
        None
    };
    let request = FetchRequest::new(job.url(), preset, dir).with_cookies(cookies);

    match ctx.fetcher.resolve_title(&request) {
        Ok(Some(title)) => progress.set_title(&title),
        Ok(None) => {}
        Err(e) => tracing::debug!("title lookup failed: {}", e),
    }

    ctx.fetcher.fetch(&request, progress)?;
    Ok(())
}
