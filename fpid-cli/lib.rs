pub mod error;
pub mod extract;
pub mod gallery;
pub mod report;
pub mod scan;
pub mod synthetic;

use fpid_core::{FeatureSet, IdentifyConfig, Image};
use std::time::Instant;

pub use error::{DecodeError, ExtractError, IdentifyError, IdentifyResult};
pub use extract::FeatureExtractor;
pub use gallery::{load_image, DirectoryGallery, Gallery, MemoryGallery};
pub use report::{render_matches, summary_line, Identification, ProgressReporter};
pub use scan::{BestResult, CancellationToken, CandidateResult, GalleryScanner, ScanObserver, ScanReport, ScanState, SkippedEntry};
pub use fpid_core::{self, IdentifyConfig as Config};

/// High-level 1:N identifier: extracts the probe, then scans a gallery for the best match
#[derive(Debug)]
pub struct Identifier {
    config: IdentifyConfig,
    scanner: GalleryScanner,
}

impl Identifier {
    /// Create an identifier with the given configuration
    pub fn new(config: IdentifyConfig) -> IdentifyResult<Self> {
        config.validate()?;
        let extractor = FeatureExtractor::new(config.extractor.clone())?;
        let scanner = GalleryScanner::new(extractor, config.matcher)?;
        Ok(Self { config, scanner })
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.scanner = self.scanner.with_cancellation(token);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.scanner = self.scanner.with_deadline(deadline);
        self
    }

    /// Features of the probe; a probe that cannot be processed ends the run
    pub fn extract_probe(&self, probe: &Image) -> IdentifyResult<FeatureSet> {
        self.scanner
            .extractor()
            .extract(probe)
            .map_err(|e| IdentifyError::InvalidProbe(e.to_string()))
    }

    /// Best gallery match for `probe`, or the no-match record
    pub fn identify(&self, probe: &Image, gallery: &dyn Gallery) -> IdentifyResult<Identification> {
        self.identify_observed(probe, gallery, &()).map(|(ident, _)| ident)
    }

    /// Like [`Identifier::identify`], reporting progress to `observer` and returning the scan report
    pub fn identify_observed(
        &self,
        probe: &Image,
        gallery: &dyn Gallery,
        observer: &dyn ScanObserver,
    ) -> IdentifyResult<(Identification, ScanReport)> {
        let probe_features = self.extract_probe(probe)?;
        let mut report = self.scanner.scan(&probe_features, gallery, observer);
        let best = std::mem::take(&mut report.best);
        Ok((Identification::from_best(probe_features, best), report))
    }

    pub fn config(&self) -> &IdentifyConfig {
        &self.config
    }

    pub fn scanner(&self) -> &GalleryScanner {
        &self.scanner
    }
}
