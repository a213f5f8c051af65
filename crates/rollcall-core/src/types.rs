use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Who an embedding belongs to. Names are not unique by construction;
/// matching is purely embedding-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub class_label: String,
}

/// Face embedding vector (512-dimensional for the ArcFace model).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn dim(&self) -> usize {
        self.values.len()
    }

    /// Euclidean distance to another embedding. Lower = more similar.
    pub fn distance(&self, other: &Embedding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

/// Face position as edge coordinates, in the coordinate space of whatever
/// frame the detector ran on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceLocation {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl FaceLocation {
    /// Map the location into a frame scaled by `factor` in each dimension.
    /// Detection runs on a downscaled frame; pass the inverse of the
    /// downscale factor to recover full-frame coordinates.
    pub fn scaled(&self, factor: f32) -> FaceLocation {
        FaceLocation {
            top: self.top * factor,
            right: self.right * factor,
            bottom: self.bottom * factor,
            left: self.left * factor,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }
}

/// One detected face in a frame: where it is plus its embedding.
/// Transient — never persisted.
#[derive(Debug, Clone)]
pub struct Detection {
    pub location: FaceLocation,
    pub embedding: Embedding,
}

/// An enrolled identity with its reference embedding.
#[derive(Debug, Clone)]
pub struct GalleryEntry {
    pub identity: Identity,
    pub embedding: Embedding,
}

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("embedding dimension mismatch: gallery is {expected}-dim, entry for '{name}' is {actual}-dim")]
    DimensionMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
}

/// Ordered set of enrolled (identity, embedding) pairs. Built once per
/// scan session and read-only for its duration. All embeddings share the
/// dimension of the first entry added.
#[derive(Debug, Clone, Default)]
pub struct Gallery {
    entries: Vec<GalleryEntry>,
}

impl Gallery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: GalleryEntry) -> Result<(), GalleryError> {
        if let Some(first) = self.entries.first() {
            if first.embedding.dim() != entry.embedding.dim() {
                return Err(GalleryError::DimensionMismatch {
                    name: entry.identity.name,
                    expected: first.embedding.dim(),
                    actual: entry.embedding.dim(),
                });
            }
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn entries(&self) -> &[GalleryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of matching one probe embedding against the gallery.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchResult {
    /// Best candidate was within tolerance.
    Matched { identity: Identity, distance: f32 },
    /// Gallery was empty, or no candidate came within tolerance.
    Unknown,
}

impl MatchResult {
    pub fn is_match(&self) -> bool {
        matches!(self, MatchResult::Matched { .. })
    }
}
