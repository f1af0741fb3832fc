//! Background population of a playlist.
//!
//! Each load job runs on its own thread and streams tracks back over a
//! channel. The thread never touches the collection: the owner drains the
//! channel with [`Loader::drain`] and performs the inserts itself.

use crate::library;
use crate::model::Track;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadSource {
    PlaylistFile(PathBuf),
    Folder(PathBuf),
}

#[derive(Debug)]
pub enum LoadEvent {
    Track { job: u64, track: Track },
    Finished { job: u64, count: usize },
    Failed { job: u64, error: String },
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DrainSummary {
    pub added: usize,
    pub finished: usize,
    pub errors: Vec<String>,
}

#[derive(Debug)]
struct LoadJob {
    id: u64,
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

#[derive(Debug)]
pub struct Loader {
    event_tx: Sender<LoadEvent>,
    event_rx: Receiver<LoadEvent>,
    jobs: Vec<LoadJob>,
    next_job: u64,
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

impl Loader {
    pub fn new() -> Self {
        let (event_tx, event_rx) = mpsc::channel();
        Self {
            event_tx,
            event_rx,
            jobs: Vec::new(),
            next_job: 0,
        }
    }

    pub fn spawn(&mut self, source: LoadSource) -> u64 {
        let id = self.next_job;
        self.next_job += 1;

        let cancel = Arc::new(AtomicBool::new(false));
        let worker_cancel = Arc::clone(&cancel);
        let event_tx = self.event_tx.clone();
        log::info!("starting load job {id} for {source:?}");
        let handle = thread::spawn(move || run_job(id, source, &worker_cancel, &event_tx));

        self.jobs.push(LoadJob {
            id,
            cancel,
            handle: Some(handle),
        });
        id
    }

    pub fn is_busy(&self) -> bool {
        !self.jobs.is_empty()
    }

    /// Stops every running job and drops whatever they already sent.
    pub fn cancel_all(&mut self) {
        if self.jobs.is_empty() {
            return;
        }

        for job in &self.jobs {
            job.cancel.store(true, Ordering::Relaxed);
        }
        for mut job in self.jobs.drain(..) {
            join_job(&mut job);
            log::debug!("cancelled load job {}", job.id);
        }

        let mut discarded = 0;
        while self.event_rx.try_recv().is_ok() {
            discarded += 1;
        }
        if discarded > 0 {
            log::debug!("discarded {discarded} undelivered load events");
        }
    }

    /// Hands every track received so far to `sink`, in arrival order.
    pub fn drain(&mut self, mut sink: impl FnMut(Track)) -> DrainSummary {
        let mut summary = DrainSummary::default();
        loop {
            match self.event_rx.try_recv() {
                Ok(LoadEvent::Track { job, track }) => {
                    if self.is_active(job) {
                        sink(track);
                        summary.added += 1;
                    }
                }
                Ok(LoadEvent::Finished { job, count }) => {
                    if self.finish(job) {
                        log::info!("load job {job} finished with {count} tracks");
                        summary.finished += 1;
                    }
                }
                Ok(LoadEvent::Failed { job, error }) => {
                    if self.finish(job) {
                        log::warn!("load job {job} failed: {error}");
                        summary.errors.push(error);
                    }
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        summary
    }

    fn is_active(&self, id: u64) -> bool {
        self.jobs.iter().any(|job| job.id == id)
    }

    fn finish(&mut self, id: u64) -> bool {
        let Some(pos) = self.jobs.iter().position(|job| job.id == id) else {
            return false;
        };
        let mut job = self.jobs.remove(pos);
        join_job(&mut job);
        true
    }
}

impl Drop for Loader {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

fn join_job(job: &mut LoadJob) {
    if let Some(handle) = job.handle.take()
        && handle.join().is_err()
    {
        log::warn!("load job {} panicked", job.id);
    }
}

fn run_job(id: u64, source: LoadSource, cancel: &AtomicBool, event_tx: &Sender<LoadEvent>) {
    let paths = match &source {
        LoadSource::PlaylistFile(path) => match library::read_playlist(path) {
            Ok(paths) => paths,
            Err(err) => {
                let _ = event_tx.send(LoadEvent::Failed {
                    job: id,
                    error: format!("{err:#}"),
                });
                return;
            }
        },
        LoadSource::Folder(root) => library::scan_folder(root),
    };

    let mut count = 0;
    for path in paths {
        if cancel.load(Ordering::Relaxed) {
            log::debug!("load job {id} stopped after {count} tracks");
            return;
        }
        let track = library::track_for_path(&path);
        if event_tx.send(LoadEvent::Track { job: id, track }).is_err() {
            return;
        }
        count += 1;
    }
    let _ = event_tx.send(LoadEvent::Finished { job: id, count });
}
