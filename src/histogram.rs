use std::collections::BTreeMap;

use crate::Pixel;
use crate::error::PaletteError;
use crate::group::PixelGroup;

/// Discretized grid coordinate of a histogram bucket.
///
/// Each component is a level in `0..grid_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BucketKey {
    pub r: u32,
    pub g: u32,
    pub b: u32,
}

/// Fixed-grid color histogram. Only populated buckets are stored.
#[derive(Debug, Clone, Default)]
pub struct Histogram {
    grid_size: u32,
    buckets: BTreeMap<BucketKey, PixelGroup>,
}

impl Histogram {
    pub fn grid_size(&self) -> u32 {
        self.grid_size
    }

    /// Populated buckets keyed by grid coordinate.
    pub fn buckets(&self) -> &BTreeMap<BucketKey, PixelGroup> {
        &self.buckets
    }

    pub fn into_buckets(self) -> BTreeMap<BucketKey, PixelGroup> {
        self.buckets
    }

    /// Number of populated buckets.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Representative (rounded mean) color of every populated bucket.
    pub fn colors(&self) -> BTreeMap<BucketKey, Pixel> {
        self.buckets
            .iter()
            .filter_map(|(key, group)| group.representative().map(|c| (*key, c)))
            .collect()
    }

    /// Buckets ordered by descending member count, ties by ascending key.
    pub fn by_population(&self) -> Vec<(BucketKey, &PixelGroup)> {
        let mut entries: Vec<(BucketKey, &PixelGroup)> =
            self.buckets.iter().map(|(k, g)| (*k, g)).collect();
        // BTreeMap iteration is key-ordered, so a stable sort keeps key order on ties
        entries.sort_by(|a, b| b.1.len().cmp(&a.1.len()));
        entries
    }

    /// Consume the histogram into its groups, most populated first, ties by
    /// ascending key.
    pub fn into_groups_by_population(self) -> Vec<PixelGroup> {
        let mut groups: Vec<PixelGroup> = self.buckets.into_values().collect();
        groups.sort_by(|a, b| b.len().cmp(&a.len()));
        groups
    }

    /// The `n` most populated buckets.
    pub fn top(&self, n: usize) -> Vec<(BucketKey, &PixelGroup)> {
        let mut entries = self.by_population();
        entries.truncate(n);
        entries
    }
}

/// Map a channel value to its grid level: `value * grid_size / 256`.
fn quantize_channel(value: u8, grid_size: u32) -> u32 {
    ((value as u64 * grid_size as u64) / 256) as u32
}

/// Grid coordinate of a pixel at the given grid size.
pub fn bucket_key(pixel: Pixel, grid_size: u32) -> BucketKey {
    BucketKey {
        r: quantize_channel(pixel.r, grid_size),
        g: quantize_channel(pixel.g, grid_size),
        b: quantize_channel(pixel.b, grid_size),
    }
}

/// Quantize pixels into a `grid_size`³ grid of buckets.
///
/// `grid_size` is the number of levels per channel and must be at least 1.
/// Every input pixel lands in exactly one bucket.
pub fn bin(pixels: &[Pixel], grid_size: u32) -> Result<Histogram, PaletteError> {
    if grid_size == 0 {
        return Err(PaletteError::InvalidGridSize(grid_size));
    }

    let mut buckets: BTreeMap<BucketKey, PixelGroup> = BTreeMap::new();
    for &pixel in pixels {
        buckets
            .entry(bucket_key(pixel, grid_size))
            .or_default()
            .push(pixel);
    }

    log::debug!(
        "histogram: {} pixels into {} buckets (grid {})",
        pixels.len(),
        buckets.len(),
        grid_size
    );

    Ok(Histogram { grid_size, buckets })
}
