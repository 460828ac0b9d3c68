pub mod source;

use crate::analysis::classify::Composition;
use crate::analysis::{analyze_image, AnalysisResult, AnalysisSettings};
use crate::error::AnalysisError;
use source::ImageSource;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct JobRequest {
    pub id: u64,
    /// Dispatcher generation; echoed back so stale answers can be dropped.
    pub seq: u64,
    pub src: String,
    pub composition: Option<Composition>,
}

#[derive(Debug, Clone)]
pub enum WorkerEvent {
    Ready,
    Done {
        id: u64,
        seq: u64,
        result: Box<AnalysisResult>,
    },
    Failed {
        id: u64,
        seq: u64,
        error: String,
    },
}

/// Handle to the background analysis thread. Dropping it stops the thread.
pub struct AnalysisWorker {
    tx: Option<Sender<JobRequest>>,
    rx: Receiver<WorkerEvent>,
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl AnalysisWorker {
    pub fn spawn(source: Arc<dyn ImageSource>, settings: AnalysisSettings) -> Result<Self, AnalysisError> {
        let (tx, rx) = mpsc::channel::<JobRequest>();
        let (res_tx, res_rx) = mpsc::channel::<WorkerEvent>();
        let cancel = Arc::new(AtomicBool::new(false));
        let cancel_flag = Arc::clone(&cancel);

        let handle = std::thread::Builder::new()
            .name("palette-worker".to_string())
            .spawn(move || worker_loop(rx, res_tx, cancel_flag, source, settings))
            .map_err(|e| AnalysisError::WorkerSpawn(e.to_string()))?;

        Ok(Self {
            tx: Some(tx),
            rx: res_rx,
            cancel,
            handle: Some(handle),
        })
    }

    pub fn post(&self, req: JobRequest) -> Result<(), AnalysisError> {
        let tx = self.tx.as_ref().ok_or(AnalysisError::WorkerGone)?;
        tx.send(req).map_err(|_| AnalysisError::WorkerGone)
    }

    pub fn try_recv(&self) -> Result<Option<WorkerEvent>, AnalysisError> {
        match self.rx.try_recv() {
            Ok(ev) => Ok(Some(ev)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(AnalysisError::WorkerGone),
        }
    }

    pub fn recv_timeout(&self, wait: Duration) -> Result<Option<WorkerEvent>, AnalysisError> {
        match self.rx.recv_timeout(wait) {
            Ok(ev) => Ok(Some(ev)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(AnalysisError::WorkerGone),
        }
    }

    /// Drops queued jobs and waits for the current one to finish.
    pub fn terminate(mut self) {
        self.stop();
    }

    /// Stops the thread without waiting for it. A job stuck in a fetch keeps
    /// running until it returns, but its answer goes nowhere.
    pub fn abandon(mut self) {
        self.cancel.store(true, Ordering::SeqCst);
        self.tx.take();
        self.handle.take();
    }

    fn stop(&mut self) {
        self.cancel.store(true, Ordering::SeqCst);
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("analysis worker panicked");
            }
        }
    }
}

impl Drop for AnalysisWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(
    rx: Receiver<JobRequest>,
    res_tx: Sender<WorkerEvent>,
    cancel: Arc<AtomicBool>,
    source: Arc<dyn ImageSource>,
    settings: AnalysisSettings,
) {
    let _ = res_tx.send(WorkerEvent::Ready);

    while let Ok(req) = rx.recv() {
        if cancel.load(Ordering::SeqCst) {
            break;
        }
        if req.src.trim().is_empty() {
            log::debug!("ignoring job {} without src", req.id);
            continue;
        }

        let event = match process_request(&req, source.as_ref(), &settings) {
            Ok(result) => WorkerEvent::Done {
                id: req.id,
                seq: req.seq,
                result: Box::new(result),
            },
            Err(e) => {
                log::debug!("job {} failed: {e}", req.id);
                WorkerEvent::Failed {
                    id: req.id,
                    seq: req.seq,
                    error: e.to_string(),
                }
            }
        };

        if res_tx.send(event).is_err() {
            break;
        }
    }
}

fn process_request(
    req: &JobRequest,
    source: &dyn ImageSource,
    settings: &AnalysisSettings,
) -> Result<AnalysisResult, AnalysisError> {
    let bytes = source.fetch(&req.src)?;
    analyze_image(&bytes, &req.src, req.composition, settings)
}

/// Creates workers for the dispatcher on first use.
pub trait WorkerFactory {
    fn spawn(&self) -> Result<AnalysisWorker, AnalysisError>;
}

pub struct ThreadWorkerFactory {
    pub source: Arc<dyn ImageSource>,
    pub settings: AnalysisSettings,
}

impl WorkerFactory for ThreadWorkerFactory {
    fn spawn(&self) -> Result<AnalysisWorker, AnalysisError> {
        AnalysisWorker::spawn(Arc::clone(&self.source), self.settings.clone())
    }
}
