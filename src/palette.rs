use crate::Pixel;
use crate::colorspace::{Lab, luminance_f32, rgb_to_lab};
use crate::group::{PixelGroup, round_color};

/// Strategy for ordering palette entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaletteSortStrategy {
    /// Most populated group first. Ties keep group order.
    #[default]
    Population,
    /// Ascending luminance of the mean color (darkest first).
    Luminance,
    /// Greedy nearest-neighbor walk in Lab from the darkest entry, so that
    /// adjacent swatches differ as little as possible.
    DeltaMinimize,
}

/// One palette entry: the representative color of a pixel group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Swatch {
    /// Mean color rounded to the nearest pixel value.
    pub color: Pixel,
    /// Exact mean color.
    pub mean: rgb::RGB<f32>,
    /// Lab value of `color`.
    pub lab: Lab,
    /// Number of pixels in the group.
    pub population: usize,
}

impl Swatch {
    /// Swatch for a group, `None` if the group is empty.
    pub fn from_group(group: &PixelGroup) -> Option<Self> {
        let mean = group.mean()?;
        let color = round_color(mean);
        Some(Self {
            color,
            mean,
            lab: rgb_to_lab(color),
            population: group.len(),
        })
    }

    pub fn hex(&self) -> String {
        crate::colorspace::to_hex(self.color)
    }
}

/// An ordered list of swatches extracted from clustered pixels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Palette {
    swatches: Vec<Swatch>,
}

impl Palette {
    /// Build a palette from pixel groups. Empty groups are skipped.
    pub fn from_groups<'a>(
        groups: impl IntoIterator<Item = &'a PixelGroup>,
        strategy: PaletteSortStrategy,
    ) -> Self {
        Self::from_groups_limited(groups, None, strategy)
    }

    /// Like [`Palette::from_groups`], keeping only the `limit` most populated
    /// groups before sorting.
    pub fn from_groups_limited<'a>(
        groups: impl IntoIterator<Item = &'a PixelGroup>,
        limit: Option<usize>,
        strategy: PaletteSortStrategy,
    ) -> Self {
        let mut swatches: Vec<Swatch> = groups.into_iter().filter_map(Swatch::from_group).collect();

        if let Some(limit) = limit {
            population_sort(&mut swatches);
            swatches.truncate(limit);
        }

        let swatches = match strategy {
            PaletteSortStrategy::Population => {
                population_sort(&mut swatches);
                swatches
            }
            PaletteSortStrategy::Luminance => {
                luminance_sort(&mut swatches);
                swatches
            }
            PaletteSortStrategy::DeltaMinimize => delta_minimize_sort(&swatches),
        };

        Self { swatches }
    }

    pub fn swatches(&self) -> &[Swatch] {
        &self.swatches
    }

    /// Rounded colors in palette order.
    pub fn colors(&self) -> Vec<Pixel> {
        self.swatches.iter().map(|s| s.color).collect()
    }

    pub fn len(&self) -> usize {
        self.swatches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.swatches.is_empty()
    }

    /// Index of the perceptually closest swatch (ΔE76), `None` when empty.
    pub fn nearest(&self, pixel: Pixel) -> Option<usize> {
        let lab = rgb_to_lab(pixel);
        let mut best: Option<(usize, f32)> = None;
        for (i, swatch) in self.swatches.iter().enumerate() {
            let d = lab.distance_sq(swatch.lab);
            if best.is_none_or(|(_, bd)| d < bd) {
                best = Some((i, d));
            }
        }
        best.map(|(i, _)| i)
    }
}

fn population_sort(swatches: &mut [Swatch]) {
    swatches.sort_by(|a, b| b.population.cmp(&a.population));
}

fn luminance_sort(swatches: &mut [Swatch]) {
    swatches.sort_by(|a, b| luminance_f32(a.mean).total_cmp(&luminance_f32(b.mean)));
}

/// Greedy nearest-neighbor TSP starting from the darkest entry.
fn delta_minimize_sort(swatches: &[Swatch]) -> Vec<Swatch> {
    let n = swatches.len();
    if n <= 1 {
        return swatches.to_vec();
    }

    let mut visited = vec![false; n];
    let mut result = Vec::with_capacity(n);

    // Start from darkest (lowest L)
    let start = swatches
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.lab.l.total_cmp(&b.lab.l))
        .map(|(i, _)| i)
        .unwrap_or(0);

    visited[start] = true;
    result.push(swatches[start]);
    let mut current = start;

    for _ in 1..n {
        let mut best_idx = 0;
        let mut best_dist = f32::MAX;

        for (j, visited_j) in visited.iter().enumerate() {
            if !visited_j {
                let d = swatches[current].lab.distance_sq(swatches[j].lab);
                if d < best_dist {
                    best_dist = d;
                    best_idx = j;
                }
            }
        }

        visited[best_idx] = true;
        result.push(swatches[best_idx]);
        current = best_idx;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn px(r: u8, g: u8, b: u8) -> Pixel {
        Pixel { r, g, b }
    }

    fn gray_groups(levels: &[(u8, usize)]) -> Vec<PixelGroup> {
        levels
            .iter()
            .map(|&(v, count)| vec![px(v, v, v); count].into())
            .collect()
    }

    #[test]
    fn empty_palette() {
        let p = Palette::from_groups(&[], PaletteSortStrategy::Population);
        assert!(p.is_empty());
        assert_eq!(p.len(), 0);
        assert_eq!(p.nearest(px(1, 2, 3)), None);
    }

    #[test]
    fn empty_groups_are_skipped() {
        let groups = vec![PixelGroup::new(), vec![px(9, 9, 9)].into()];
        let p = Palette::from_groups(&groups, PaletteSortStrategy::Population);
        assert_eq!(p.colors(), vec![px(9, 9, 9)]);
    }

    #[test]
    fn population_order() {
        let groups = gray_groups(&[(10, 1), (200, 5), (100, 3)]);
        let p = Palette::from_groups(&groups, PaletteSortStrategy::Population);
        let pops: Vec<usize> = p.swatches().iter().map(|s| s.population).collect();
        assert_eq!(pops, vec![5, 3, 1]);
    }

    #[test]
    fn limit_keeps_most_populated() {
        let groups = gray_groups(&[(10, 1), (200, 5), (100, 3), (50, 4)]);
        let p = Palette::from_groups_limited(&groups, Some(2), PaletteSortStrategy::Luminance);
        assert_eq!(p.colors(), vec![px(50, 50, 50), px(200, 200, 200)]);
    }

    #[test]
    fn delta_sort_produces_smooth_ordering() {
        let groups = gray_groups(&[
            (200, 1),
            (50, 1),
            (150, 1),
            (25, 1),
            (230, 1),
            (100, 1),
            (75, 1),
            (175, 1),
        ]);
        let p = Palette::from_groups(&groups, PaletteSortStrategy::DeltaMinimize);
        let values: Vec<u8> = p.colors().iter().map(|c| c.r).collect();
        assert_eq!(values, vec![25, 50, 75, 100, 150, 175, 200, 230]);
    }

    #[test]
    fn nearest_finds_closest() {
        let groups = gray_groups(&[(20, 1), (128, 1), (230, 1)]);
        let p = Palette::from_groups(&groups, PaletteSortStrategy::Luminance);
        assert_eq!(p.nearest(px(120, 130, 125)), Some(1));
        assert_eq!(p.nearest(px(0, 0, 0)), Some(0));
    }

    #[test]
    fn swatch_hex() {
        let group: PixelGroup = vec![px(255, 0, 16)].into();
        assert_eq!(Swatch::from_group(&group).unwrap().hex(), "#ff0010");
    }
}
