// Conversion worker
// One background thread that runs sanitize/convert jobs strictly in
// submission order. Results are handed to a reply callback, which normally
// forwards them over a channel to the interaction thread.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use crossbeam::channel::{Receiver, Sender, unbounded};
use thiserror::Error;

const THREAD_NAME: &str = "paste";

type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("failed to spawn conversion worker thread")]
    FailedToSpawn,
    #[error("conversion worker is not running")]
    NotRunning,
    #[error("conversion worker thread panicked")]
    Panicked,
}

/// A job that panicked instead of producing a result
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("conversion job panicked: {0}")]
pub struct JobPanicked(pub String);

pub struct ConversionWorker {
    job_tx: Option<Sender<Job>>,
    handle: Option<JoinHandle<()>>,
}

impl ConversionWorker {
    pub fn start() -> Result<Self, WorkerError> {
        let (job_tx, job_rx) = unbounded();
        let handle = thread::Builder::new()
            .name(THREAD_NAME.into())
            .spawn(move || run_worker(job_rx))
            .map_err(|_| WorkerError::FailedToSpawn)?;

        Ok(ConversionWorker {
            job_tx: Some(job_tx),
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Queue `task`; `reply` receives its result, or the panic it raised,
    /// on the worker thread
    pub fn submit<T, F, R>(&self, task: F, reply: R) -> Result<(), WorkerError>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
        R: FnOnce(Result<T, JobPanicked>) + Send + 'static,
    {
        let Some(tx) = &self.job_tx else {
            return Err(WorkerError::NotRunning);
        };

        let job: Job = Box::new(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(task)).map_err(|payload| {
                let message = panic_message(payload.as_ref());
                log::error!("Conversion job panicked: {message}");
                JobPanicked(message)
            });
            reply(result);
        });
        tx.send(job).map_err(|_| WorkerError::NotRunning)
    }

    /// Finish queued jobs and stop the thread
    pub fn shutdown(&mut self) -> Result<(), WorkerError> {
        self.job_tx = None;
        if let Some(handle) = self.handle.take() {
            handle.join().map_err(|_| WorkerError::Panicked)?;
        }
        Ok(())
    }
}

impl Drop for ConversionWorker {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            log::warn!("{err}");
        }
    }
}

fn run_worker(job_rx: Receiver<Job>) {
    log::debug!("Conversion worker started");
    while let Ok(job) = job_rx.recv() {
        job();
    }
    log::debug!("Conversion worker stopped");
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
