use crate::analysis::classify::Composition;
use crate::analysis::AnalysisResult;
use crate::data::cache::{CacheMap, CacheStore};
use crate::data::catalog::{resolve_src, AnalysisItem, Creator};
use crate::error::AnalysisError;
use crate::worker::{AnalysisWorker, JobRequest, WorkerEvent, WorkerFactory};
use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Items that are still PNG/JPEG images.
    pub eligible: usize,
    /// Eligible items already cached or in flight.
    pub skipped: usize,
    pub dispatched: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub timed_out: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Failed(String),
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub id: u64,
    pub seq: u64,
    pub outcome: Outcome,
}

#[derive(Debug, Clone)]
struct InFlight {
    id: u64,
    seq: u64,
    src: String,
    composition: Option<Composition>,
}

impl InFlight {
    fn request(&self) -> JobRequest {
        JobRequest {
            id: self.id,
            seq: self.seq,
            src: self.src.clone(),
            composition: self.composition,
        }
    }
}

/// Memoised analysis results plus the worker that produces them.
///
/// All state is mutated on the owning thread; the worker only talks back
/// through its event channel.
pub struct AnalysisStore {
    storage: Box<dyn CacheStore>,
    factory: Box<dyn WorkerFactory>,
    worker: Option<AnalysisWorker>,
    creators: Vec<Creator>,
    job_timeout: Duration,

    data: CacheMap,
    // Worker runs jobs FIFO, so the front is the one being worked on.
    in_flight: VecDeque<InFlight>,
    head_since: Option<Instant>,
    next_seq: u64,

    is_loading: bool,
    error: Option<String>,
}

impl AnalysisStore {
    pub fn new(
        storage: Box<dyn CacheStore>,
        factory: Box<dyn WorkerFactory>,
        creators: Vec<Creator>,
        job_timeout: Duration,
    ) -> Self {
        let mut store = Self {
            storage,
            factory,
            worker: None,
            creators,
            job_timeout,
            data: CacheMap::new(),
            in_flight: VecDeque::new(),
            head_since: None,
            next_seq: 1,
            is_loading: false,
            error: None,
        };
        store.refresh_from_storage();
        store
    }

    pub fn data(&self) -> &CacheMap {
        &self.data
    }

    pub fn get(&self, id: u64) -> Option<&AnalysisResult> {
        self.data.get(&id)
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn in_flight(&self) -> Vec<u64> {
        self.in_flight.iter().map(|j| j.id).collect()
    }

    /// Analyses every eligible, uncached item and returns once each job sent
    /// by this call has succeeded, failed or timed out.
    pub fn analyze_all(&mut self, items: &[AnalysisItem]) -> BatchReport {
        let (mut report, mut pending) = self.dispatch_batch(items);

        while !pending.is_empty() && self.worker.is_some() {
            let wait = self.until_next_deadline();
            for s in self.pump(Some(wait)) {
                log::debug!("job {} settled: {:?}", s.id, s.outcome);
                if !pending.remove(&s.seq) {
                    continue;
                }
                match s.outcome {
                    Outcome::Succeeded => report.succeeded += 1,
                    Outcome::Failed(_) => report.failed += 1,
                    Outcome::TimedOut => report.timed_out += 1,
                }
            }
        }
        // Worker vanished with jobs outstanding.
        report.failed += pending.len();

        log::info!(
            "analysis batch: {} eligible, {} skipped, {} ok, {} failed, {} timed out",
            report.eligible,
            report.skipped,
            report.succeeded,
            report.failed,
            report.timed_out
        );
        report
    }

    /// Posts jobs without waiting; results arrive through [`Self::pump`].
    pub fn dispatch(&mut self, items: &[AnalysisItem]) -> usize {
        self.dispatch_batch(items).0.dispatched
    }

    fn dispatch_batch(&mut self, items: &[AnalysisItem]) -> (BatchReport, HashSet<u64>) {
        let mut report = BatchReport::default();
        let mut sent: HashSet<u64> = HashSet::new();

        self.refresh_from_storage();

        let mut queued: HashSet<u64> = self.in_flight.iter().map(|j| j.id).collect();
        let mut todo: Vec<&AnalysisItem> = Vec::new();
        for item in items.iter().filter(|it| it.is_analyzable()) {
            report.eligible += 1;
            if self.data.contains_key(&item.id) || !queued.insert(item.id) {
                report.skipped += 1;
                continue;
            }
            todo.push(item);
        }

        if todo.is_empty() {
            self.is_loading = !self.in_flight.is_empty();
            return (report, sent);
        }

        self.is_loading = true;
        if self.worker.is_none() {
            match self.factory.spawn() {
                Ok(w) => {
                    self.worker = Some(w);
                    self.error = None;
                }
                Err(e) => {
                    log::warn!("cannot start analysis worker: {e}");
                    self.error = Some(e.to_string());
                    self.is_loading = !self.in_flight.is_empty();
                    return (report, sent);
                }
            }
        }

        for item in todo {
            let seq = self.next_seq;
            self.next_seq += 1;
            let job = InFlight {
                id: item.id,
                seq,
                src: resolve_src(item, &self.creators),
                composition: item.composition,
            };

            let posted = match self.worker.as_ref() {
                Some(w) => w.post(job.request()),
                None => Err(AnalysisError::WorkerGone),
            };
            if let Err(e) = posted {
                log::warn!("analysis worker rejected job {}: {e}", item.id);
                self.error = Some(e.to_string());
                self.worker = None;
                break;
            }

            if self.in_flight.is_empty() {
                self.head_since = Some(Instant::now());
            }
            self.in_flight.push_back(job);
            sent.insert(seq);
            report.dispatched += 1;
        }

        if self.worker.is_none() {
            // Whatever was posted before the worker died will never answer.
            self.abandon_in_flight();
        }
        self.is_loading = !self.in_flight.is_empty();
        (report, sent)
    }

    /// Applies worker events. With `wait`, blocks up to that long for the
    /// first one. Overdue jobs are expired afterwards.
    pub fn pump(&mut self, wait: Option<Duration>) -> Vec<Settlement> {
        let mut out = Vec::new();
        let Some(worker) = self.worker.as_ref() else {
            return out;
        };

        let mut events = Vec::new();
        let mut gone = false;
        let first = match wait {
            Some(d) => worker.recv_timeout(d),
            None => worker.try_recv(),
        };
        match first {
            Ok(Some(ev)) => {
                events.push(ev);
                loop {
                    match worker.try_recv() {
                        Ok(Some(ev)) => events.push(ev),
                        Ok(None) => break,
                        Err(_) => {
                            gone = true;
                            break;
                        }
                    }
                }
            }
            Ok(None) => {}
            Err(_) => gone = true,
        }

        for ev in events {
            if let Some(s) = self.apply_event(ev) {
                out.push(s);
            }
        }

        if gone {
            log::warn!("analysis worker disconnected");
            self.error = Some(AnalysisError::WorkerGone.to_string());
            self.worker = None;
            out.extend(self.abandon_in_flight());
        } else {
            out.extend(self.expire_overdue());
        }

        self.is_loading = !self.in_flight.is_empty();
        out
    }

    fn apply_event(&mut self, ev: WorkerEvent) -> Option<Settlement> {
        match ev {
            WorkerEvent::Ready => {
                log::debug!("analysis worker ready");
                None
            }
            WorkerEvent::Done { id, seq, result } => {
                let job = self.settle(seq)?;
                log::debug!("analysed {} ({})", job.src, id);
                let result = *result;
                self.persist(id, &result);
                self.data.insert(id, result);
                Some(Settlement {
                    id,
                    seq,
                    outcome: Outcome::Succeeded,
                })
            }
            WorkerEvent::Failed { id, seq, error } => {
                let job = self.settle(seq)?;
                log::info!("analysis of {} ({}) failed: {error}", job.src, id);
                Some(Settlement {
                    id,
                    seq,
                    outcome: Outcome::Failed(error),
                })
            }
        }
    }

    /// Removes a job by generation. Unknown generations are stale answers.
    fn settle(&mut self, seq: u64) -> Option<InFlight> {
        let Some(pos) = self.in_flight.iter().position(|j| j.seq == seq) else {
            log::debug!("dropping stale answer for job seq {seq}");
            return None;
        };
        let job = self.in_flight.remove(pos)?;
        if pos == 0 {
            self.head_since = Some(Instant::now());
        }
        Some(job)
    }

    /// Times out the head job once its deadline has passed. The worker is
    /// still busy with it, so the worker is replaced and the jobs queued
    /// behind the head are re-posted to the new one.
    fn expire_overdue(&mut self) -> Vec<Settlement> {
        let (Some(head), Some(since)) = (self.in_flight.front(), self.head_since) else {
            return Vec::new();
        };
        if since.elapsed() < self.job_timeout {
            return Vec::new();
        }
        let err = AnalysisError::Timeout(self.job_timeout.as_millis() as u64);
        log::warn!("analysis of {} ({}): {err}", head.src, head.id);

        let Some(job) = self.in_flight.pop_front() else {
            return Vec::new();
        };
        let mut out = vec![Settlement {
            id: job.id,
            seq: job.seq,
            outcome: Outcome::TimedOut,
        }];
        out.extend(self.restart_worker());
        out
    }

    fn restart_worker(&mut self) -> Vec<Settlement> {
        if let Some(stuck) = self.worker.take() {
            stuck.abandon();
        }
        if self.in_flight.is_empty() {
            self.head_since = None;
            return Vec::new();
        }

        let worker = match self.factory.spawn() {
            Ok(w) => w,
            Err(e) => {
                log::warn!("cannot restart analysis worker: {e}");
                self.error = Some(e.to_string());
                return self.abandon_in_flight();
            }
        };
        log::debug!("re-posting {} queued analysis jobs", self.in_flight.len());
        let rejected = self
            .in_flight
            .iter()
            .find_map(|job| worker.post(job.request()).err().map(|e| (job.id, e)));
        if let Some((id, e)) = rejected {
            log::warn!("analysis worker rejected job {id}: {e}");
            self.error = Some(e.to_string());
            return self.abandon_in_flight();
        }
        self.worker = Some(worker);
        self.head_since = Some(Instant::now());
        Vec::new()
    }

    fn abandon_in_flight(&mut self) -> Vec<Settlement> {
        self.head_since = None;
        self.in_flight
            .drain(..)
            .map(|job| Settlement {
                id: job.id,
                seq: job.seq,
                outcome: Outcome::Failed(AnalysisError::WorkerGone.to_string()),
            })
            .collect()
    }

    fn until_next_deadline(&self) -> Duration {
        let floor = Duration::from_millis(1);
        match self.head_since {
            Some(since) => (since + self.job_timeout)
                .saturating_duration_since(Instant::now())
                .max(floor),
            None => self.job_timeout,
        }
    }

    fn refresh_from_storage(&mut self) {
        match self.storage.load() {
            Ok(stored) => {
                for (id, res) in stored {
                    self.data.entry(id).or_insert(res);
                }
            }
            Err(e) => log::warn!("analysis cache unreadable; using memory only: {e}"),
        }
    }

    fn persist(&mut self, id: u64, result: &AnalysisResult) {
        // Merge into what is on disk so another writer's entries survive.
        let mut on_disk = self.storage.load().unwrap_or_default();
        on_disk.insert(id, result.clone());
        if let Err(e) = self.storage.save(&on_disk) {
            log::warn!("analysis cache not saved: {e}");
        }
    }

    /// Empties durable storage and all in-memory state, and drops the worker
    /// along with any jobs it still had queued.
    pub fn clear_cache(&mut self) {
        if let Err(e) = self.storage.clear() {
            log::warn!("analysis cache not cleared: {e}");
        }
        // Its queue holds only jobs from before the clear.
        if let Some(worker) = self.worker.take() {
            worker.abandon();
        }
        self.data.clear();
        self.in_flight.clear();
        self.head_since = None;
        self.is_loading = false;
        self.error = None;
    }

    pub fn shutdown(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.terminate();
        }
        self.abandon_in_flight();
        self.is_loading = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::classify::{Composition, StyleLabel};
    use crate::analysis::tests::uniform_png;
    use crate::analysis::AnalysisSettings;
    use crate::data::cache::{JsonFileStore, MemoryStore, CACHE_FILE_NAME};
    use crate::data::catalog::ItemKind;
    use crate::worker::tests::MemorySource;
    use crate::worker::ThreadWorkerFactory;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    fn factory(source: &Arc<MemorySource>) -> Box<dyn WorkerFactory> {
        Box::new(ThreadWorkerFactory {
            source: source.clone(),
            settings: AnalysisSettings::default(),
        })
    }

    fn store_with(source: &Arc<MemorySource>, storage: Box<dyn CacheStore>) -> AnalysisStore {
        AnalysisStore::new(storage, factory(source), Vec::new(), Duration::from_secs(5))
    }

    struct FailingFactory;

    impl WorkerFactory for FailingFactory {
        fn spawn(&self) -> Result<AnalysisWorker, AnalysisError> {
            Err(AnalysisError::WorkerSpawn("no threads left".into()))
        }
    }

    /// Fails the first `failures` spawns, then hands out real workers.
    struct FlakyFactory {
        failures: std::cell::Cell<u32>,
        inner: Box<dyn WorkerFactory>,
    }

    impl WorkerFactory for FlakyFactory {
        fn spawn(&self) -> Result<AnalysisWorker, AnalysisError> {
            if self.failures.get() > 0 {
                self.failures.set(self.failures.get() - 1);
                return Err(AnalysisError::WorkerSpawn("no threads left".into()));
            }
            self.inner.spawn()
        }
    }

    struct BrokenStorage;

    impl CacheStore for BrokenStorage {
        fn load(&self) -> Result<CacheMap, AnalysisError> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into())
        }
        fn save(&self, _: &CacheMap) -> Result<(), AnalysisError> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "quota").into())
        }
        fn clear(&self) -> Result<(), AnalysisError> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "quota").into())
        }
    }

    #[test]
    fn dark_pet_banner_end_to_end() {
        let source = Arc::new(
            MemorySource::default().with("/assets/default/pet_banner.png", uniform_png(32, 32, [30, 30, 30])),
        );
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CACHE_FILE_NAME);
        let mut store = store_with(&source, Box::new(JsonFileStore::new(&path)));

        let report = store.analyze_all(&[AnalysisItem::new(7, "pet_banner.png")]);
        assert_eq!(report.succeeded, 1);
        assert!(!store.is_loading());
        assert_eq!(store.error(), None);

        let res = store.get(7).unwrap();
        assert!(res.brightness <= 35);
        assert!(res.style.contains(&StyleLabel::Dark));
        assert!(!res.style.contains(&StyleLabel::Vibrant));
        assert!(res.tags.iter().any(|t| t == "DARK"));

        let reloaded = JsonFileStore::new(&path).load().unwrap();
        assert_eq!(reloaded.get(&7), Some(res));
    }

    #[test]
    fn second_call_dispatches_nothing() {
        let source = Arc::new(MemorySource::default().with("/assets/default/a.png", uniform_png(8, 8, [200, 40, 40])));
        let mut store = store_with(&source, Box::new(MemoryStore::default()));
        let items = vec![AnalysisItem::new(1, "a.png")];

        assert_eq!(store.analyze_all(&items).dispatched, 1);
        let again = store.analyze_all(&items);
        assert_eq!(again.dispatched, 0);
        assert_eq!(again.skipped, 1);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn results_survive_a_new_store() {
        let source = Arc::new(MemorySource::default().with("/assets/default/a.png", uniform_png(8, 8, [40, 200, 40])));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CACHE_FILE_NAME);

        let mut first = store_with(&source, Box::new(JsonFileStore::new(&path)));
        first.analyze_all(&[AnalysisItem::new(3, "a.png")]);
        first.shutdown();

        let mut second = store_with(&source, Box::new(JsonFileStore::new(&path)));
        assert!(second.get(3).is_some());
        assert_eq!(second.analyze_all(&[AnalysisItem::new(3, "a.png")]).dispatched, 0);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn missing_image_fails_without_aggregate_error() {
        let source = Arc::new(MemorySource::default());
        let mut store = store_with(&source, Box::new(MemoryStore::default()));

        let report = store.analyze_all(&[AnalysisItem::new(8, "nowhere.png")]);
        assert_eq!(report.failed, 1);
        assert!(store.get(8).is_none());
        assert_eq!(store.error(), None);
        assert!(!store.is_loading());
    }

    #[test]
    fn skips_videos_and_other_formats() {
        let source = Arc::new(MemorySource::default());
        let mut store = store_with(&source, Box::new(MemoryStore::default()));
        let mut video = AnalysisItem::new(1, "clip.jpg");
        video.kind = Some(ItemKind::Video);

        let report = store.analyze_all(&[video, AnalysisItem::new(2, "anim.gif")]);
        assert_eq!(report, BatchReport::default());
        assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn worker_spawn_failure_sets_error() {
        let mut store = AnalysisStore::new(
            Box::new(MemoryStore::default()),
            Box::new(FailingFactory),
            Vec::new(),
            Duration::from_secs(1),
        );
        let report = store.analyze_all(&[AnalysisItem::new(1, "a.png")]);
        assert_eq!(report.dispatched, 0);
        assert!(store.error().unwrap().contains("no threads left"));
        assert!(!store.is_loading());
        assert!(store.data().is_empty());
    }

    #[test]
    fn overlapping_dispatch_skips_in_flight_ids() {
        let source = Arc::new(MemorySource::default().with("/assets/default/a.png", uniform_png(8, 8, [40, 40, 200])));
        let mut store = store_with(&source, Box::new(MemoryStore::default()));
        let items = vec![AnalysisItem::new(5, "a.png"), AnalysisItem::new(5, "a.png")];

        assert_eq!(store.dispatch(&items), 1);
        assert!(store.is_loading());
        assert_eq!(store.dispatch(&items), 0);
        assert_eq!(store.in_flight(), vec![5]);

        let report = store.analyze_all(&items);
        assert_eq!(report.dispatched, 0);
        while store.is_loading() {
            store.pump(Some(Duration::from_millis(50)));
        }
        assert!(store.get(5).is_some());
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn slow_job_times_out_and_late_answer_is_ignored() {
        let source = Arc::new(MemorySource::default().slow(
            "/assets/default/slow.png",
            uniform_png(8, 8, [200, 200, 40]),
            Duration::from_millis(300),
        ));
        let mut store = AnalysisStore::new(
            Box::new(MemoryStore::default()),
            factory(&source),
            Vec::new(),
            Duration::from_millis(50),
        );

        let report = store.analyze_all(&[AnalysisItem::new(9, "slow.png")]);
        assert_eq!(report.timed_out, 1);
        assert!(!store.is_loading());

        std::thread::sleep(Duration::from_millis(400));
        let late = store.pump(Some(Duration::from_millis(100)));
        assert!(late.is_empty());
        assert!(store.get(9).is_none());
        assert_eq!(store.error(), None);
    }

    #[test]
    fn storage_failures_are_swallowed() {
        let source = Arc::new(MemorySource::default().with("/assets/default/a.png", uniform_png(8, 8, [200, 40, 200])));
        let mut store = store_with(&source, Box::new(BrokenStorage));

        let report = store.analyze_all(&[AnalysisItem::new(1, "a.png")]);
        assert_eq!(report.succeeded, 1);
        assert!(store.get(1).is_some());
        assert_eq!(store.error(), None);
        store.clear_cache();
        assert!(store.data().is_empty());
    }

    #[test]
    fn clear_cache_empties_memory_and_disk() {
        let source = Arc::new(MemorySource::default().with("/assets/default/a.png", uniform_png(8, 8, [200, 40, 40])));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CACHE_FILE_NAME);
        let mut store = store_with(&source, Box::new(JsonFileStore::new(&path)));

        store.analyze_all(&[AnalysisItem::new(1, "a.png")]);
        assert!(path.exists());
        store.clear_cache();
        assert!(store.data().is_empty());
        assert!(!path.exists());

        assert_eq!(store.analyze_all(&[AnalysisItem::new(1, "a.png")]).dispatched, 1);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn src_uses_creator_folder() {
        let source = Arc::new(MemorySource::default().with("/assets/igor/logo.jpg", uniform_png(8, 8, [30, 120, 220])));
        let creators = vec![Creator {
            id: 2,
            name: "Igor".into(),
            image_folder: "igor".into(),
        }];
        let mut store = AnalysisStore::new(
            Box::new(MemoryStore::default()),
            factory(&source),
            creators,
            Duration::from_secs(5),
        );
        let mut item = AnalysisItem::new(4, "logo.jpg");
        item.creator_ids = vec![2];

        assert_eq!(store.analyze_all(&[item]).succeeded, 1);
    }

    #[test]
    fn item_composition_overrides_file_name() {
        let source = Arc::new(MemorySource::default().with("/assets/default/dog.png", uniform_png(8, 8, [30, 120, 220])));
        let mut store = store_with(&source, Box::new(MemoryStore::default()));
        let mut item = AnalysisItem::new(6, "dog.png");
        item.composition = Some(Composition::Fitness);

        store.analyze_all(&[item]);
        assert_eq!(store.get(6).unwrap().composition, Composition::Fitness);
    }

    #[test]
    fn slow_image_does_not_time_out_the_rest_of_the_batch() {
        let source = Arc::new(
            MemorySource::default()
                .slow("/assets/default/slow.png", uniform_png(8, 8, [200, 200, 40]), Duration::from_millis(600))
                .with("/assets/default/a.png", uniform_png(8, 8, [200, 40, 40]))
                .with("/assets/default/b.png", uniform_png(8, 8, [40, 40, 200])),
        );
        let mut store = AnalysisStore::new(
            Box::new(MemoryStore::default()),
            factory(&source),
            Vec::new(),
            Duration::from_millis(150),
        );
        let items = vec![
            AnalysisItem::new(1, "slow.png"),
            AnalysisItem::new(2, "a.png"),
            AnalysisItem::new(3, "b.png"),
        ];

        let report = store.analyze_all(&items);
        assert_eq!(report.dispatched, 3);
        assert_eq!(report.timed_out, 1);
        assert_eq!(report.succeeded, 2);
        assert!(store.get(1).is_none());
        assert!(store.get(2).is_some());
        assert!(store.get(3).is_some());
        assert_eq!(store.error(), None);
        assert!(!store.is_loading());
    }

    #[test]
    fn clear_cache_drops_jobs_queued_before_it() {
        let mut source = MemorySource::default().with("/assets/default/fresh.png", uniform_png(8, 8, [40, 200, 40]));
        for n in 1..=4 {
            source = source.slow(
                &format!("/assets/default/old{n}.png"),
                uniform_png(8, 8, [200, 40, 40]),
                Duration::from_millis(120),
            );
        }
        let source = Arc::new(source);
        let mut store = AnalysisStore::new(
            Box::new(MemoryStore::default()),
            factory(&source),
            Vec::new(),
            Duration::from_millis(200),
        );
        let old: Vec<AnalysisItem> = (1..=4).map(|n| AnalysisItem::new(n, format!("old{n}.png"))).collect();

        assert_eq!(store.dispatch(&old), 4);
        store.clear_cache();
        assert!(store.in_flight().is_empty());
        assert!(!store.is_loading());

        let report = store.analyze_all(&[AnalysisItem::new(9, "fresh.png")]);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.timed_out, 0);
        assert!(store.get(9).is_some());
        assert!((1..=4).all(|n| store.get(n).is_none()));
    }

    #[test]
    fn successful_spawn_clears_earlier_error() {
        let source = Arc::new(MemorySource::default().with("/assets/default/a.png", uniform_png(8, 8, [200, 40, 40])));
        let flaky = FlakyFactory {
            failures: std::cell::Cell::new(1),
            inner: factory(&source),
        };
        let mut store = AnalysisStore::new(
            Box::new(MemoryStore::default()),
            Box::new(flaky),
            Vec::new(),
            Duration::from_secs(5),
        );
        let items = vec![AnalysisItem::new(1, "a.png")];

        assert_eq!(store.analyze_all(&items).dispatched, 0);
        assert!(store.error().is_some());

        assert_eq!(store.analyze_all(&items).succeeded, 1);
        assert_eq!(store.error(), None);
    }
}
