#![forbid(unsafe_code)]

pub mod colorspace;
pub mod error;
pub mod group;
pub mod hdbscan;
pub mod histogram;
pub mod kmeans;
pub mod median_cut;
pub mod palette;

pub use colorspace::{Lab, delta_e, lab_to_rgb, luminance, rgb_to_lab};
pub use error::PaletteError;
pub use group::PixelGroup;
pub use hdbscan::{ClusterSpace, DensityParams, DensityResult};
pub use histogram::{BucketKey, Histogram};
pub use kmeans::{KMeansConfig, KMeansResult};
pub use median_cut::{Axis, Bounds, Cut, CutNode, MedianCutResult};
pub use palette::{Palette, PaletteSortStrategy, Swatch};

/// An 8-bit sRGB sample.
pub type Pixel = rgb::RGB<u8>;

/// Default `min_cluster_size` for density clustering through [`PaletteConfig`].
pub const DEFAULT_MIN_CLUSTER_SIZE: usize = 100;
/// Default `min_samples` for density clustering through [`PaletteConfig`].
pub const DEFAULT_MIN_SAMPLES: usize = 5;
/// Default levels per channel for histogram binning.
pub const DEFAULT_GRID_SIZE: u32 = 3;

/// What to do with pixels the density clusterer labels as noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoiseHandling {
    /// Leave noise out of the palette.
    #[default]
    Discard,
    /// Bin noise with a histogram of `grid_size` levels and add each bucket
    /// as an extra group.
    Bucket { grid_size: u32 },
}

/// Clustering strategy used to build a palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Histogram {
        grid_size: u32,
    },
    MedianCut {
        groups: usize,
    },
    KMeans {
        k: usize,
        max_iterations: usize,
    },
    Density {
        params: DensityParams,
        space: ClusterSpace,
        noise: NoiseHandling,
    },
}

impl Default for Method {
    fn default() -> Self {
        Self::histogram()
    }
}

impl Method {
    pub fn histogram() -> Self {
        Self::Histogram {
            grid_size: DEFAULT_GRID_SIZE,
        }
    }

    pub fn median_cut(groups: usize) -> Self {
        Self::MedianCut { groups }
    }

    pub fn kmeans(k: usize) -> Self {
        Self::KMeans {
            k,
            max_iterations: kmeans::DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Density clustering in RGB with the default parameters, noise discarded.
    pub fn density() -> Self {
        Self::Density {
            params: DensityParams::new(DEFAULT_MIN_CLUSTER_SIZE, DEFAULT_MIN_SAMPLES),
            space: ClusterSpace::Rgb,
            noise: NoiseHandling::Discard,
        }
    }
}

/// Configuration for [`extract_palette`].
#[derive(Debug, Clone, Default)]
pub struct PaletteConfig {
    pub method: Method,
    /// Keep at most this many of the most populated groups. `None` keeps all.
    pub palette_size: Option<usize>,
    pub sort: PaletteSortStrategy,
}

impl PaletteConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn palette_size(mut self, n: usize) -> Self {
        self.palette_size = Some(n);
        self
    }

    pub fn sort(mut self, strategy: PaletteSortStrategy) -> Self {
        self.sort = strategy;
        self
    }
}

/// Group pixels with the given method.
///
/// Histogram buckets come back most populated first. The other engines keep
/// their own output order.
///
/// Every returned group is non-empty except k-means clusters whose centroid
/// attracted no pixels.
pub fn cluster(pixels: &[Pixel], method: &Method) -> Result<Vec<PixelGroup>, PaletteError> {
    let groups = match *method {
        Method::Histogram { grid_size } => {
            histogram::bin(pixels, grid_size)?.into_groups_by_population()
        }
        Method::MedianCut { groups } => median_cut::median_cut(pixels, groups).into_groups(),
        Method::KMeans { k, max_iterations } => {
            let config = KMeansConfig::new(k).max_iterations(max_iterations);
            kmeans::kmeans(pixels, &config)?.clusters
        }
        Method::Density {
            params,
            space,
            noise,
        } => {
            let result = hdbscan::cluster_pixels(pixels, &params, space)?;
            let noise_groups = match noise {
                NoiseHandling::Discard => Vec::new(),
                NoiseHandling::Bucket { grid_size } => result.noise_clusters(grid_size)?,
            };
            let mut groups = result.clusters;
            groups.extend(noise_groups);
            groups
        }
    };
    Ok(groups)
}

/// Extract a palette of representative colors from pixel samples.
pub fn extract_palette(pixels: &[Pixel], config: &PaletteConfig) -> Result<Palette, PaletteError> {
    if config.palette_size == Some(0) {
        return Err(PaletteError::InvalidPaletteSize(0));
    }

    let groups = cluster(pixels, &config.method)?;
    let palette = Palette::from_groups_limited(&groups, config.palette_size, config.sort);

    log::debug!(
        "palette: {} pixels, {} groups, {} swatches ({:?})",
        pixels.len(),
        groups.len(),
        palette.len(),
        config.method
    );

    Ok(palette)
}
