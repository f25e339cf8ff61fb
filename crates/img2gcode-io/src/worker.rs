//! A dedicated background thread that runs conversion jobs one at a
//! time, keeping a caller (such as an interactive front end) free while
//! images are converted.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::JoinHandle;

use crate::convert::{ConversionJob, ConvertError, Converter};
use crate::translator::Translator;

/// The result of one submitted job.
#[derive(Debug)]
pub struct JobOutcome {
    /// The job as it was submitted.
    pub job: ConversionJob,
    /// The G-code path, or why the job failed.
    pub result: Result<PathBuf, ConvertError>,
}

/// Errors talking to the worker thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WorkerError {
    /// The worker thread has stopped.
    #[error("conversion worker is closed")]
    Closed,
}

/// Owns the worker thread. Jobs run strictly in submission order.
///
/// Dropping the worker closes its queue, lets already queued jobs
/// finish, and joins the thread.
#[derive(Debug)]
pub struct JobWorker {
    jobs: Option<Sender<ConversionJob>>,
    outcomes: Receiver<JobOutcome>,
    handle: Option<JoinHandle<()>>,
}

impl JobWorker {
    /// Start the worker thread running jobs through `converter`.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the thread cannot be spawned.
    pub fn spawn<T>(converter: Converter<T>) -> std::io::Result<Self>
    where
        T: Translator + Send + 'static,
    {
        let (job_tx, job_rx) = mpsc::channel::<ConversionJob>();
        let (outcome_tx, outcome_rx) = mpsc::channel();

        let handle = std::thread::Builder::new()
            .name("img2gcode-worker".to_owned())
            .spawn(move || {
                for job in job_rx {
                    let result = converter.run(&job);
                    if let Err(e) = &result {
                        tracing::warn!(image = %job.image_path.display(), error = %e, "conversion failed");
                    }
                    if outcome_tx.send(JobOutcome { job, result }).is_err() {
                        break;
                    }
                }
                tracing::debug!("conversion worker stopped");
            })?;

        Ok(Self {
            jobs: Some(job_tx),
            outcomes: outcome_rx,
            handle: Some(handle),
        })
    }

    /// Queue `job` behind any jobs already submitted.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Closed`] if the worker thread has stopped.
    pub fn submit(&self, job: ConversionJob) -> Result<(), WorkerError> {
        self.jobs
            .as_ref()
            .ok_or(WorkerError::Closed)?
            .send(job)
            .map_err(|_| WorkerError::Closed)
    }

    /// Block until the next job finishes.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Closed`] if the worker thread has stopped
    /// and every outcome has been received.
    pub fn recv(&self) -> Result<JobOutcome, WorkerError> {
        self.outcomes.recv().map_err(|_| WorkerError::Closed)
    }

    /// The next finished job, if one is ready.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Closed`] if the worker thread has stopped
    /// and every outcome has been received.
    pub fn try_recv(&self) -> Result<Option<JobOutcome>, WorkerError> {
        match self.outcomes.try_recv() {
            Ok(outcome) => Ok(Some(outcome)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(WorkerError::Closed),
        }
    }
}

impl Drop for JobWorker {
    fn drop(&mut self) {
        drop(self.jobs.take());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
