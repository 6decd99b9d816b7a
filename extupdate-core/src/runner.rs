//! Runs the rename loop on a dedicated thread so the caller stays responsive.
//!
//! Only one job runs at a time and there is no cancellation: once spawned,
//! the worker goes through its whole candidate list. The history store is
//! moved into the worker and handed back when the job is done.

use crate::convert::{convert_candidates, ConversionReport, Progress};
use crate::history::History;
use crate::job::ConversionJob;
use crate::scanner::FileCandidate;
use anyhow::{anyhow, Context, Result};
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

/// A conversion running in the background
pub struct ConversionHandle {
    progress: Receiver<Progress>,
    worker: JoinHandle<(ConversionReport, History)>,
}

/// Start converting `candidates` on a background thread
pub fn spawn_conversion(
    job: ConversionJob,
    candidates: Vec<FileCandidate>,
    mut history: History,
) -> Result<ConversionHandle> {
    let (tx, rx) = mpsc::channel();

    let worker = thread::Builder::new()
        .name("extupdate-convert".to_string())
        .spawn(move || {
            let report = convert_candidates(&job, &candidates, &mut history, |progress| {
                // The receiver may already be gone if the caller stopped listening
                let _ = tx.send(progress.clone());
            });
            (report, history)
        })
        .context("Failed to start conversion thread")?;

    Ok(ConversionHandle {
        progress: rx,
        worker,
    })
}

impl ConversionHandle {
    /// Block until the job completes, forwarding every progress update
    pub fn wait(self, mut on_progress: impl FnMut(&Progress)) -> Result<(ConversionReport, History)> {
        // The channel closes when the worker drops its sender
        for progress in &self.progress {
            on_progress(&progress);
        }

        self.worker
            .join()
            .map_err(|_| anyhow!("conversion thread panicked"))
    }
}
