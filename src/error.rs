use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PaletteError {
    #[error("histogram grid size must be at least 1, got {0}")]
    InvalidGridSize(u32),

    #[error("k-means cluster count must be at least 1, got {0}")]
    InvalidClusterCount(usize),

    #[error("k-means iteration limit must be at least 1, got {0}")]
    InvalidIterationLimit(usize),

    #[error("min_cluster_size must be at least 1, got {0}")]
    InvalidMinClusterSize(usize),

    #[error("min_samples must be at least 1, got {0}")]
    InvalidMinSamples(usize),

    #[error("lab point count {lab} does not match pixel count {pixels}")]
    LabLengthMismatch { pixels: usize, lab: usize },

    #[error("density clustering accepts at most {max} points, got {len}")]
    TooManyPoints { len: usize, max: usize },

    #[error("palette size must be at least 1, got {0}")]
    InvalidPaletteSize(usize),
}
