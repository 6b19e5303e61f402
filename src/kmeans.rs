use crate::Pixel;
use crate::colorspace::luminance;
use crate::error::PaletteError;
use crate::group::PixelGroup;

/// Iteration cap used when none is configured.
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Configuration for Lloyd's k-means over RGB pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KMeansConfig {
    /// Number of clusters (>= 1).
    pub k: usize,
    /// Upper bound on assignment/update rounds (>= 1).
    pub max_iterations: usize,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            k: 8,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl KMeansConfig {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            ..Self::default()
        }
    }

    pub fn max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    fn validate(&self) -> Result<(), PaletteError> {
        if self.k == 0 {
            return Err(PaletteError::InvalidClusterCount(self.k));
        }
        if self.max_iterations == 0 {
            return Err(PaletteError::InvalidIterationLimit(self.max_iterations));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct KMeansResult {
    /// One group per centroid, in centroid order. A group is empty when its
    /// centroid attracted no pixels.
    pub clusters: Vec<PixelGroup>,
    pub centroids: Vec<rgb::RGB<f32>>,
    /// Update rounds performed. Each round moves the centroids to their
    /// cluster means and reassigns every pixel; the last round of a
    /// converged run is the one that changed no assignment.
    pub iterations: usize,
    /// False when the iteration cap was hit before assignments settled.
    pub converged: bool,
}

/// K-means with the default iteration cap.
pub fn run(k: usize, pixels: &[Pixel]) -> Result<KMeansResult, PaletteError> {
    kmeans(pixels, &KMeansConfig::new(k))
}

/// Cluster pixels into `config.k` groups with Lloyd's algorithm.
///
/// Seeding is deterministic: centroids start at evenly spaced samples of the
/// pixels sorted by luminance. A centroid that receives no pixels keeps its
/// previous position and its cluster is returned empty.
pub fn kmeans(pixels: &[Pixel], config: &KMeansConfig) -> Result<KMeansResult, PaletteError> {
    config.validate()?;

    if pixels.is_empty() {
        return Ok(KMeansResult {
            clusters: Vec::new(),
            centroids: Vec::new(),
            iterations: 0,
            converged: true,
        });
    }

    let k = config.k;
    let mut centroids = seed_centroids(pixels, k);
    let mut assignments: Vec<usize> = pixels
        .iter()
        .map(|p| nearest_centroid(*p, &centroids))
        .collect();
    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iterations {
        iterations += 1;
        update_centroids(pixels, &assignments, &mut centroids);

        let mut changed = false;
        for (pixel, assigned) in pixels.iter().zip(assignments.iter_mut()) {
            let nearest = nearest_centroid(*pixel, &centroids);
            if nearest != *assigned {
                *assigned = nearest;
                changed = true;
            }
        }

        if !changed {
            converged = true;
            break;
        }
    }

    if !converged {
        log::warn!(
            "k-means stopped at the iteration cap ({}) before converging",
            config.max_iterations
        );
    }

    let mut clusters = vec![PixelGroup::new(); k];
    for (pixel, &assigned) in pixels.iter().zip(assignments.iter()) {
        clusters[assigned].push(*pixel);
    }

    log::debug!(
        "k-means: {} pixels, k={}, {} iterations, {} empty clusters",
        pixels.len(),
        k,
        iterations,
        clusters.iter().filter(|c| c.is_empty()).count()
    );

    Ok(KMeansResult {
        clusters,
        centroids,
        iterations,
        converged,
    })
}

/// Evenly spaced picks from the luminance-sorted pixels (ties by r, g, b).
fn seed_centroids(pixels: &[Pixel], k: usize) -> Vec<rgb::RGB<f32>> {
    let mut sorted: Vec<Pixel> = pixels.to_vec();
    sorted.sort_by(|a, b| {
        luminance(*a)
            .total_cmp(&luminance(*b))
            .then_with(|| (a.r, a.g, a.b).cmp(&(b.r, b.g, b.b)))
    });

    let n = sorted.len();
    (0..k)
        .map(|i| {
            let p = sorted[((2 * i + 1) * n / (2 * k)).min(n - 1)];
            rgb::RGB {
                r: p.r as f32,
                g: p.g as f32,
                b: p.b as f32,
            }
        })
        .collect()
}

fn distance_sq(pixel: Pixel, centroid: rgb::RGB<f32>) -> f32 {
    let dr = pixel.r as f32 - centroid.r;
    let dg = pixel.g as f32 - centroid.g;
    let db = pixel.b as f32 - centroid.b;
    dr * dr + dg * dg + db * db
}

/// Index of the nearest centroid; the lowest index wins ties.
fn nearest_centroid(pixel: Pixel, centroids: &[rgb::RGB<f32>]) -> usize {
    let mut best_idx = 0;
    let mut best_dist = f32::MAX;
    for (i, c) in centroids.iter().enumerate() {
        let d = distance_sq(pixel, *c);
        if d < best_dist {
            best_dist = d;
            best_idx = i;
        }
    }
    best_idx
}

fn update_centroids(pixels: &[Pixel], assignments: &[usize], centroids: &mut [rgb::RGB<f32>]) {
    let k = centroids.len();
    let mut sums = vec![[0u64; 3]; k];
    let mut counts = vec![0u64; k];

    for (p, &a) in pixels.iter().zip(assignments.iter()) {
        sums[a][0] += p.r as u64;
        sums[a][1] += p.g as u64;
        sums[a][2] += p.b as u64;
        counts[a] += 1;
    }

    for i in 0..k {
        if counts[i] > 0 {
            let n = counts[i] as f64;
            centroids[i] = rgb::RGB {
                r: (sums[i][0] as f64 / n) as f32,
                g: (sums[i][1] as f64 / n) as f32,
                b: (sums[i][2] as f64 / n) as f32,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn px(r: u8, g: u8, b: u8) -> Pixel {
        Pixel { r, g, b }
    }

    #[test]
    fn invalid_config_rejected() {
        assert_eq!(
            run(0, &[px(1, 1, 1)]).unwrap_err(),
            PaletteError::InvalidClusterCount(0)
        );
        let config = KMeansConfig::new(2).max_iterations(0);
        assert_eq!(
            kmeans(&[px(1, 1, 1)], &config).unwrap_err(),
            PaletteError::InvalidIterationLimit(0)
        );
    }

    #[test]
    fn empty_input() {
        let result = run(4, &[]).unwrap();
        assert!(result.clusters.is_empty());
        assert!(result.converged);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn single_cluster_is_exact_mean() {
        let pixels = vec![px(10, 20, 30), px(20, 40, 60), px(30, 0, 0), px(0, 0, 2)];
        let result = run(1, &pixels).unwrap();
        assert_eq!(result.clusters.len(), 1);
        assert_eq!(result.clusters[0].len(), 4);
        assert!(result.converged);
        let c = result.centroids[0];
        assert_eq!((c.r, c.g, c.b), (15.0, 15.0, 23.0));
        assert_eq!(result.clusters[0].mean(), Some(c));
    }

    #[test]
    fn two_blobs_separate() {
        let mut pixels = vec![px(10, 10, 10); 20];
        pixels.extend(vec![px(240, 240, 240); 30]);
        let result = run(2, &pixels).unwrap();
        assert!(result.converged);
        assert_eq!(result.clusters[0].len(), 20);
        assert_eq!(result.clusters[1].len(), 30);
        assert_eq!(result.clusters[0].pixels()[0], px(10, 10, 10));
    }

    #[test]
    fn more_clusters_than_colors_leaves_empties() {
        let pixels = vec![px(0, 0, 0), px(255, 255, 255)];
        let result = run(4, &pixels).unwrap();
        assert_eq!(result.clusters.len(), 4);
        let total: usize = result.clusters.iter().map(|c| c.len()).sum();
        assert_eq!(total, 2);
        assert!(result.clusters.iter().any(|c| c.is_empty()));
    }

    #[test]
    fn iteration_cap_is_reported() {
        let mut pixels = vec![px(0, 0, 0); 10];
        pixels.extend(vec![px(10, 10, 10); 10]);
        pixels.push(px(100, 100, 100));
        pixels.push(px(200, 200, 200));
        let result = kmeans(&pixels, &KMeansConfig::new(2).max_iterations(1)).unwrap();
        assert_eq!(result.iterations, 1);
        assert!(!result.converged);
        let total: usize = result.clusters.iter().map(|c| c.len()).sum();
        assert_eq!(total, pixels.len());

        let full = run(2, &pixels).unwrap();
        assert!(full.converged);
        assert!(full.iterations > 1);
    }

    #[test]
    fn stable_input_converges_in_one_round() {
        let pixels = vec![px(10, 20, 30), px(20, 40, 60), px(30, 0, 0)];
        let result = kmeans(&pixels, &KMeansConfig::new(1).max_iterations(1)).unwrap();
        assert!(result.converged);
        assert_eq!(result.iterations, 1);
        assert_eq!(result.clusters[0].len(), 3);

        let mut blobs = vec![px(0, 0, 0); 5];
        blobs.extend(vec![px(250, 250, 250); 5]);
        let result = kmeans(&blobs, &KMeansConfig::new(2).max_iterations(1)).unwrap();
        assert!(result.converged);
        assert_eq!(result.iterations, 1);
    }

    #[test]
    fn seeding_spans_luminance() {
        let pixels: Vec<Pixel> = (0..10u8).map(|v| px(v * 20, v * 20, v * 20)).collect();
        let seeds = seed_centroids(&pixels, 2);
        assert_eq!(seeds[0].r, 40.0);
        assert_eq!(seeds[1].r, 140.0);
    }
}
