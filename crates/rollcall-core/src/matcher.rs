//! Nearest-neighbor matching of a probe embedding against the gallery.

use crate::types::{Embedding, GalleryEntry, MatchResult};

/// Strategy for comparing a probe embedding against enrolled entries.
pub trait Matcher {
    fn compare(&self, probe: &Embedding, gallery: &[GalleryEntry], tolerance: f32) -> MatchResult;
}

/// Euclidean-distance matcher.
///
/// Scans every gallery entry, keeps the minimum distance, and accepts the
/// best candidate iff its distance is at or below the tolerance. Ties go
/// to the earlier entry in gallery order, so results are deterministic for
/// a fixed gallery.
pub struct EuclideanMatcher;

impl Matcher for EuclideanMatcher {
    fn compare(&self, probe: &Embedding, gallery: &[GalleryEntry], tolerance: f32) -> MatchResult {
        let mut best: Option<(usize, f32)> = None;

        for (i, entry) in gallery.iter().enumerate() {
            let dist = probe.distance(&entry.embedding);
            // Strict < keeps the first entry on equal distances.
            match best {
                Some((_, best_dist)) if dist >= best_dist => {}
                _ => best = Some((i, dist)),
            }
        }

        match best {
            Some((idx, dist)) if dist <= tolerance => MatchResult::Matched {
                identity: gallery[idx].identity.clone(),
                distance: dist,
            },
            _ => MatchResult::Unknown,
        }
    }
}
