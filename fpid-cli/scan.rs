//! Gallery scan: compare one probe against every gallery entry and keep the best.

use fpid_core::{FeatureSet, MatchConfig};
use fpid_match::{compare, GoodMatch, KnnMatcher};
use crate::error::IdentifyError;
use crate::extract::FeatureExtractor;
use crate::gallery::Gallery;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, info_span, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Scanning,
    Done,
}

impl ScanState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => ScanState::Scanning,
            2 => ScanState::Done,
            _ => ScanState::Idle,
        }
    }
}

/// Comparison of the probe with one gallery entry
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateResult {
    pub index: usize,
    pub identity: String,
    pub features: FeatureSet,
    pub good_matches: Vec<GoodMatch>,
    pub score: f32,
}

/// Running best candidate; empty is the no-match sentinel.
///
/// A candidate replaces the current best only with a strictly higher score,
/// or an equal score at a lower gallery index. Scores of zero never win.
/// This makes `merge` associative and commutative, so partial results from
/// any split of the gallery combine to the same winner a sequential scan in
/// index order would keep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BestResult(Option<CandidateResult>);

impl BestResult {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn offer(self, candidate: CandidateResult) -> Self {
        if !(candidate.score > 0.0) {
            return self;
        }
        match &self.0 {
            Some(current) if !Self::beats(&candidate, current) => self,
            _ => Self(Some(candidate)),
        }
    }

    pub fn merge(self, other: BestResult) -> Self {
        match other.0 {
            Some(candidate) => self.offer(candidate),
            None => self,
        }
    }

    fn beats(a: &CandidateResult, b: &CandidateResult) -> bool {
        a.score > b.score || (a.score == b.score && a.index < b.index)
    }

    pub fn score(&self) -> f32 {
        self.0.as_ref().map_or(0.0, |c| c.score)
    }

    pub fn identity(&self) -> Option<&str> {
        self.0.as_ref().map(|c| c.identity.as_str())
    }

    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }

    pub fn get(&self) -> Option<&CandidateResult> {
        self.0.as_ref()
    }

    pub fn into_inner(self) -> Option<CandidateResult> {
        self.0
    }
}

/// A gallery entry excluded from the result
#[derive(Debug)]
pub struct SkippedEntry {
    pub index: usize,
    pub identity: String,
    pub error: IdentifyError,
}

/// Shared flag that stops a scan before its next entry
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Scan progress callbacks. Called from worker threads.
pub trait ScanObserver: Sync {
    fn on_state(&self, _state: ScanState) {}

    /// Entry `index` finished; `visited` entries of `total` are done so far
    fn on_entry(&self, _index: usize, _visited: usize, _total: usize) {}

    fn on_skip(&self, _entry: &SkippedEntry) {}
}

impl ScanObserver for () {}

#[derive(Debug)]
pub struct ScanReport {
    pub best: BestResult,
    pub total: usize,
    pub visited: usize,
    pub skipped: Vec<SkippedEntry>,
    /// Entries never started because the scan was cancelled
    pub not_visited: usize,
    pub cancelled: bool,
    pub elapsed: Duration,
}

#[derive(Debug)]
pub struct GalleryScanner {
    extractor: FeatureExtractor,
    matcher: KnnMatcher,
    cancel: CancellationToken,
    deadline: Option<Instant>,
    state: AtomicU8,
}

impl GalleryScanner {
    pub fn new(extractor: FeatureExtractor, matcher: MatchConfig) -> Result<Self, IdentifyError> {
        matcher.validate()?;
        Ok(Self {
            extractor,
            matcher: KnnMatcher::new(matcher)?,
            cancel: CancellationToken::new(),
            deadline: None,
            state: AtomicU8::new(ScanState::Idle as u8),
        })
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn state(&self) -> ScanState {
        ScanState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    pub fn matcher(&self) -> &MatchConfig {
        self.matcher.config()
    }

    fn set_state(&self, state: ScanState, observer: &dyn ScanObserver) {
        self.state.store(state as u8, Ordering::Release);
        observer.on_state(state);
    }

    fn should_stop(&self) -> bool {
        self.cancel.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Compare `probe` against every entry of `gallery`.
    ///
    /// Entries are processed on the rayon pool. Failing entries are recorded
    /// in the report and never abort the scan. Cancellation and the deadline
    /// are checked before each entry; entries not started by then are
    /// counted in `not_visited`.
    pub fn scan(&self, probe: &FeatureSet, gallery: &dyn Gallery, observer: &dyn ScanObserver) -> ScanReport {
        self.run(probe, gallery.len(), observer, |index| {
            let identity = gallery.identity(index).unwrap_or_default().to_string();
            let features = gallery
                .load(index)
                .map_err(IdentifyError::from)
                .and_then(|image| Ok(self.extractor.extract(&image)?));
            (identity, features)
        })
    }

    /// Like [`GalleryScanner::scan`] for candidates whose features were extracted earlier
    pub fn scan_features(
        &self,
        probe: &FeatureSet,
        candidates: &[(String, FeatureSet)],
        observer: &dyn ScanObserver,
    ) -> ScanReport {
        self.run(probe, candidates.len(), observer, |index| {
            let (identity, features) = &candidates[index];
            (identity.clone(), Ok(features.clone()))
        })
    }

    /// Fold every entry produced by `entry` into one report
    fn run<F>(&self, probe: &FeatureSet, total: usize, observer: &dyn ScanObserver, entry: F) -> ScanReport
    where
        F: Fn(usize) -> (String, Result<FeatureSet, IdentifyError>) + Sync,
    {
        let _span = info_span!("scan", entries = total, probe_features = probe.len()).entered();
        let start = Instant::now();
        self.set_state(ScanState::Scanning, observer);
        info!(entries = total, probe_features = probe.len(), "gallery scan started");

        let visited = AtomicUsize::new(0);
        let not_visited = AtomicUsize::new(0);

        let (best, mut skipped) = (0..total)
            .into_par_iter()
            .fold(
                || (BestResult::none(), Vec::new()),
                |(best, mut skipped), index| {
                    if self.should_stop() {
                        not_visited.fetch_add(1, Ordering::Relaxed);
                        return (best, skipped);
                    }

                    let (identity, features) = entry(index);
                    let outcome = features.and_then(|f| self.score(index, &identity, probe, f));
                    let done = visited.fetch_add(1, Ordering::Relaxed) + 1;
                    observer.on_entry(index, done, total);

                    match outcome {
                        Ok(candidate) => {
                            debug!(index, identity = %candidate.identity, score = candidate.score, "entry scored");
                            (best.offer(candidate), skipped)
                        }
                        Err(error) => {
                            warn!(index, identity = %identity, %error, "skipping gallery entry");
                            let skipped_entry = SkippedEntry { index, identity, error };
                            observer.on_skip(&skipped_entry);
                            skipped.push(skipped_entry);
                            (best, skipped)
                        }
                    }
                },
            )
            .reduce(
                || (BestResult::none(), Vec::new()),
                |(a, mut skipped_a), (b, skipped_b)| {
                    skipped_a.extend(skipped_b);
                    (a.merge(b), skipped_a)
                },
            );
        skipped.sort_by_key(|s| s.index);

        let not_visited = not_visited.into_inner();
        let report = ScanReport {
            best,
            total,
            visited: visited.into_inner(),
            skipped,
            not_visited,
            cancelled: not_visited > 0,
            elapsed: start.elapsed(),
        };
        self.set_state(ScanState::Done, observer);
        info!(
            visited = report.visited,
            skipped = report.skipped.len(),
            not_visited = report.not_visited,
            best = report.best.identity().unwrap_or("-"),
            score = report.best.score(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "gallery scan finished"
        );
        report
    }

    /// Match and score one candidate's features
    fn score(&self, index: usize, identity: &str, probe: &FeatureSet, features: FeatureSet) -> Result<CandidateResult, IdentifyError> {
        let comparison = compare(probe, &features, &self.matcher)?;
        Ok(CandidateResult {
            index,
            identity: identity.to_string(),
            features,
            good_matches: comparison.good_matches,
            score: comparison.score,
        })
    }
}
