use fpid_cli::fpid_core::{IdentifyConfig, Image, MatchConfig, SearchStrategy};
use fpid_cli::gallery::to_gray_image;
use fpid_cli::synthetic::ridge_image;
use fpid_cli::{
    CancellationToken, DirectoryGallery, FeatureExtractor, Gallery, IdentifyError, Identifier, MemoryGallery,
};
use fpid_match::{compare, KnnMatcher};
use std::path::PathBuf;

const SIZE: usize = 96;

fn identifier() -> Identifier {
    Identifier::new(IdentifyConfig::default()).unwrap()
}

fn mixed_gallery() -> MemoryGallery {
    (0..5).fold(MemoryGallery::new(), |g, v| g.with(format!("finger_{}", v), ridge_image(SIZE, SIZE, v)))
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("fpid-it-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn test_extraction_size_is_stable() {
    let extractor = FeatureExtractor::new(IdentifyConfig::default().extractor).unwrap();
    let img = ridge_image(SIZE, SIZE, 7);
    let first = extractor.extract(&img).unwrap().len();
    for _ in 0..3 {
        assert_eq!(extractor.extract(&img).unwrap().len(), first);
    }
}

#[test]
fn test_featureless_probe_yields_no_match_after_full_scan() {
    let gallery = mixed_gallery();
    let probe = Image::filled(SIZE, SIZE, 128);

    let (ident, report) = identifier().identify_observed(&probe, &gallery, &()).unwrap();
    assert!(ident.probe.is_empty());
    assert!(!ident.is_match());
    assert_eq!(ident.score, 0.0);
    assert_eq!(report.visited, gallery.len());
    assert!(report.skipped.is_empty());
    assert!(!report.cancelled);
}

#[test]
fn test_identical_entry_scores_strictly_highest() {
    let gallery = mixed_gallery();
    let probe = ridge_image(SIZE, SIZE, 2);

    let ident = identifier().identify(&probe, &gallery).unwrap();
    assert_eq!(ident.identity.as_deref(), Some("finger_2"));
    assert_eq!(ident.index, Some(2));

    let extractor = FeatureExtractor::new(IdentifyConfig::default().extractor).unwrap();
    let matcher = KnnMatcher::new(MatchConfig::default()).unwrap();
    for index in (0..gallery.len()).filter(|&i| i != 2) {
        let features = extractor.extract(&gallery.load(index).unwrap()).unwrap();
        let other = compare(&ident.probe, &features, &matcher).unwrap();
        assert!(ident.score > other.score, "entry {} scored {} against {}", index, other.score, ident.score);
    }
}

#[test]
fn test_extracted_keypoints_respect_nms_distance() {
    let config = IdentifyConfig::default().extractor;
    let nms = config.nms_distance;
    let extractor = FeatureExtractor::new(config).unwrap();
    let set = extractor.extract(&ridge_image(160, 160, 2)).unwrap();

    let kps = set.keypoints();
    assert!(!kps.is_empty());
    for (i, a) in kps.iter().enumerate() {
        for b in &kps[i + 1..] {
            let (dx, dy) = (a.x - b.x, a.y - b.y);
            assert!(dx * dx + dy * dy >= nms * nms, "({}, {}) and ({}, {})", a.x, a.y, b.x, b.y);
        }
    }
}

#[test]
fn test_scan_is_idempotent() {
    let gallery = mixed_gallery();
    let probe = ridge_image(SIZE, SIZE, 4);
    let identifier = identifier();

    let a = identifier.identify(&probe, &gallery).unwrap();
    let b = identifier.identify(&probe, &gallery).unwrap();
    assert_eq!(a.identity, b.identity);
    assert_eq!(a.score, b.score);
}

#[test]
fn test_tie_goes_to_first_enumerated_under_any_pool() {
    let twin = ridge_image(SIZE, SIZE, 3);
    let gallery = MemoryGallery::new()
        .with("other", ridge_image(SIZE, SIZE, 0))
        .with("twin_a", twin.clone())
        .with("twin_b", twin.clone())
        .with("another", ridge_image(SIZE, SIZE, 1));
    let identifier = identifier();

    for threads in [1, 2, 4] {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build().unwrap();
        for _ in 0..3 {
            let ident = pool.install(|| identifier.identify(&twin, &gallery)).unwrap();
            assert_eq!(ident.identity.as_deref(), Some("twin_a"));
            assert_eq!(ident.index, Some(1));
        }
    }
}

#[test]
fn test_undecodable_directory_entry_is_skipped() {
    let dir = scratch_dir("decode");
    for (name, variant) in [("a_finger.png", 0), ("c_finger.png", 5)] {
        to_gray_image(&ridge_image(SIZE, SIZE, variant)).unwrap().save(dir.join(name)).unwrap();
    }
    std::fs::write(dir.join("b_corrupt.bmp"), b"BM garbage").unwrap();

    let gallery = DirectoryGallery::open(&dir).unwrap();
    let probe = ridge_image(SIZE, SIZE, 5);
    let (ident, report) = identifier().identify_observed(&probe, &gallery, &()).unwrap();

    assert_eq!(ident.identity.as_deref(), Some("c_finger.png"));
    assert_eq!(report.visited, 3);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].identity, "b_corrupt.bmp");
    assert!(matches!(report.skipped[0].error, IdentifyError::DecodeFailed(_)));

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_cancelled_scan_returns_sentinel() {
    let token = CancellationToken::new();
    token.cancel();
    let identifier = identifier().with_cancellation(token);

    let gallery = mixed_gallery();
    let (ident, report) = identifier.identify_observed(&ridge_image(SIZE, SIZE, 1), &gallery, &()).unwrap();
    assert!(report.cancelled);
    assert_eq!(report.not_visited, gallery.len());
    assert!(!ident.is_match());
}

#[test]
fn test_kd_tree_strategy_finds_same_identity() {
    let mut config = IdentifyConfig::default();
    config.matcher.strategy = SearchStrategy::KdTree { leaf_size: 8, max_checks: 0 };
    let kd = Identifier::new(config).unwrap();

    let gallery = mixed_gallery();
    let probe = ridge_image(SIZE, SIZE, 3);
    let exact = identifier().identify(&probe, &gallery).unwrap();
    let approx = kd.identify(&probe, &gallery).unwrap();
    assert_eq!(exact.identity, approx.identity);
    assert_eq!(exact.score, approx.score);
}

#[test]
fn test_missing_probe_file_is_invalid_probe() {
    let result = fpid_cli::load_image("/nonexistent/probe.bmp").map_err(|e| IdentifyError::InvalidProbe(e.to_string()));
    assert!(matches!(result, Err(IdentifyError::InvalidProbe(_))));
}
