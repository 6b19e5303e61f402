use crate::Pixel;
use crate::colorspace::{Lab, rgb_to_lab};
use crate::error::PaletteError;
use crate::group::PixelGroup;
use crate::histogram;

/// Largest input accepted by the density clusterer. Core distances and the
/// minimum spanning tree are both O(n²) in time.
pub const MAX_DENSITY_POINTS: usize = 20_000;

/// Distances below this are treated as this value when converted to λ = 1/d,
/// so that duplicate pixels yield a finite (very large) λ.
const MIN_DISTANCE: f64 = 1e-12;

/// HDBSCAN parameters. Both values are mandatory; there are no engine defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DensityParams {
    /// Smallest population a cluster may have.
    pub min_cluster_size: usize,
    /// Neighbour rank that defines a point's core distance.
    pub min_samples: usize,
}

impl DensityParams {
    pub fn new(min_cluster_size: usize, min_samples: usize) -> Self {
        Self {
            min_cluster_size,
            min_samples,
        }
    }

    fn validate(&self) -> Result<(), PaletteError> {
        if self.min_cluster_size == 0 {
            return Err(PaletteError::InvalidMinClusterSize(self.min_cluster_size));
        }
        if self.min_samples == 0 {
            return Err(PaletteError::InvalidMinSamples(self.min_samples));
        }
        Ok(())
    }
}

/// Which representation distances are measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClusterSpace {
    /// Euclidean distance on raw 0..255 RGB channels.
    #[default]
    Rgb,
    /// ΔE76 on CIE Lab.
    Lab,
}

#[derive(Debug, Clone, Default)]
pub struct DensityResult {
    /// Selected clusters, in condensed-tree order. Never empty groups.
    pub clusters: Vec<PixelGroup>,
    /// Pixels not claimed by any selected cluster.
    pub noise: PixelGroup,
    /// Cluster index for each input pixel, `None` for noise.
    pub labels: Vec<Option<usize>>,
}

impl DensityResult {
    /// Mean color of every cluster.
    pub fn means(&self) -> Vec<rgb::RGB<f32>> {
        self.clusters.iter().filter_map(|c| c.mean()).collect()
    }

    /// Split the noise set into histogram buckets so it can be shown next to
    /// the real clusters.
    pub fn noise_clusters(&self, grid_size: u32) -> Result<Vec<PixelGroup>, PaletteError> {
        let hist = histogram::bin(self.noise.pixels(), grid_size)?;
        Ok(hist.into_buckets().into_values().collect())
    }
}

/// Cluster pixels, measuring distance in the requested space.
pub fn cluster_pixels(
    pixels: &[Pixel],
    params: &DensityParams,
    space: ClusterSpace,
) -> Result<DensityResult, PaletteError> {
    match space {
        ClusterSpace::Rgb => hdbscan(pixels, None, params),
        ClusterSpace::Lab => {
            let lab: Vec<Lab> = pixels.iter().map(|p| rgb_to_lab(*p)).collect();
            hdbscan(pixels, Some(&lab), params)
        }
    }
}

/// HDBSCAN over `pixels`, or over `lab_pixels` when given (same length and
/// order). Returned groups always hold the original RGB pixels.
pub fn run(
    min_cluster_size: usize,
    min_samples: usize,
    pixels: &[Pixel],
    lab_pixels: Option<&[Lab]>,
) -> Result<DensityResult, PaletteError> {
    hdbscan(
        pixels,
        lab_pixels,
        &DensityParams::new(min_cluster_size, min_samples),
    )
}

fn hdbscan(
    pixels: &[Pixel],
    lab_pixels: Option<&[Lab]>,
    params: &DensityParams,
) -> Result<DensityResult, PaletteError> {
    params.validate()?;
    if let Some(lab) = lab_pixels {
        if lab.len() != pixels.len() {
            return Err(PaletteError::LabLengthMismatch {
                pixels: pixels.len(),
                lab: lab.len(),
            });
        }
    }
    if pixels.len() > MAX_DENSITY_POINTS {
        return Err(PaletteError::TooManyPoints {
            len: pixels.len(),
            max: MAX_DENSITY_POINTS,
        });
    }
    if pixels.is_empty() {
        return Ok(DensityResult::default());
    }

    let points: Vec<Point> = match lab_pixels {
        Some(lab) => lab
            .iter()
            .map(|c| [c.l as f64, c.a as f64, c.b as f64])
            .collect(),
        None => pixels
            .iter()
            .map(|p| [p.r as f64, p.g as f64, p.b as f64])
            .collect(),
    };

    let n = points.len();
    let core = core_distances(&points, params.min_samples);
    let mst = mutual_reachability_mst(&points, &core);
    let merges = single_linkage(n, mst);
    let tree = condense(n, &merges, params.min_cluster_size);
    let stability = stabilities(&tree);
    let selected = select_clusters(&tree, &stability);
    let labels = label_points(n, &tree, &selected);

    let cluster_count = selected.iter().filter(|&&s| s).count();
    let mut clusters = vec![PixelGroup::new(); cluster_count];
    let mut noise = PixelGroup::new();
    for (pixel, label) in pixels.iter().zip(labels.iter()) {
        match label {
            Some(idx) => clusters[*idx].push(*pixel),
            None => noise.push(*pixel),
        }
    }

    log::debug!(
        "hdbscan: {} points, {} condensed clusters, {} selected, {} noise",
        n,
        tree.len(),
        clusters.len(),
        noise.len()
    );

    Ok(DensityResult {
        clusters,
        noise,
        labels,
    })
}

type Point = [f64; 3];

fn distance(a: &Point, b: &Point) -> f64 {
    let d0 = a[0] - b[0];
    let d1 = a[1] - b[1];
    let d2 = a[2] - b[2];
    (d0 * d0 + d1 * d1 + d2 * d2).sqrt()
}

/// Distance from each point to its `min_samples`-th nearest other point.
///
/// With fewer than `min_samples` other points the farthest one is used; a
/// lone point has core distance zero.
fn core_distances(points: &[Point], min_samples: usize) -> Vec<f64> {
    let rank = min_samples.min(points.len().saturating_sub(1));
    if rank == 0 {
        return vec![0.0; points.len()];
    }

    #[cfg(feature = "parallel")]
    let distances: Vec<f64> = {
        use rayon::prelude::*;
        (0..points.len())
            .into_par_iter()
            .map_init(Vec::new, |scratch, i| core_distance(points, i, rank, scratch))
            .collect()
    };

    #[cfg(not(feature = "parallel"))]
    let distances: Vec<f64> = {
        let mut scratch = Vec::with_capacity(points.len());
        (0..points.len())
            .map(|i| core_distance(points, i, rank, &mut scratch))
            .collect()
    };

    distances
}

fn core_distance(points: &[Point], i: usize, rank: usize, scratch: &mut Vec<f64>) -> f64 {
    scratch.clear();
    scratch.extend(
        points
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, p)| distance(&points[i], p)),
    );
    let (_, kth, _) = scratch.select_nth_unstable_by(rank - 1, |a, b| a.total_cmp(b));
    *kth
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Edge {
    a: usize,
    b: usize,
    weight: f64,
}

/// Prim's algorithm over the complete mutual-reachability graph, computing
/// edge weights on the fly. Ties go to the lowest point index.
fn mutual_reachability_mst(points: &[Point], core: &[f64]) -> Vec<Edge> {
    let n = points.len();
    let mut in_tree = vec![false; n];
    let mut best = vec![f64::INFINITY; n];
    let mut nearest = vec![0usize; n];
    let mut edges = Vec::with_capacity(n.saturating_sub(1));

    let mut current = 0;
    in_tree[current] = true;

    for _ in 1..n {
        for j in 0..n {
            if in_tree[j] {
                continue;
            }
            let reach = distance(&points[current], &points[j])
                .max(core[current])
                .max(core[j]);
            if reach < best[j] {
                best[j] = reach;
                nearest[j] = current;
            }
        }

        let mut next = usize::MAX;
        let mut next_weight = f64::INFINITY;
        for j in 0..n {
            if !in_tree[j] && (next == usize::MAX || best[j] < next_weight) {
                next = j;
                next_weight = best[j];
            }
        }

        in_tree[next] = true;
        edges.push(Edge {
            a: nearest[next],
            b: next,
            weight: next_weight,
        });
        current = next;
    }

    edges
}

/// One single-linkage merge. Merge `i` creates node `n + i`; nodes below `n`
/// are points.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Merge {
    left: usize,
    right: usize,
    distance: f64,
    size: usize,
}

struct UnionFind {
    parent: Vec<usize>,
    size: Vec<usize>,
    next_label: usize,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        let total = 2 * n - 1;
        let mut size = vec![0; total];
        size[..n].fill(1);
        Self {
            parent: (0..total).collect(),
            size,
            next_label: n,
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        while self.parent[x] != root {
            let next = self.parent[x];
            self.parent[x] = root;
            x = next;
        }
        root
    }

    fn union(&mut self, a: usize, b: usize) -> usize {
        let label = self.next_label;
        self.parent[a] = label;
        self.parent[b] = label;
        self.size[label] = self.size[a] + self.size[b];
        self.next_label += 1;
        label
    }
}

/// Kruskal-style merge of MST edges in ascending weight order.
/// The sort is stable, so equal weights keep MST insertion order.
fn single_linkage(n: usize, mut edges: Vec<Edge>) -> Vec<Merge> {
    edges.sort_by(|a, b| a.weight.total_cmp(&b.weight));

    let mut uf = UnionFind::new(n);
    let mut merges = Vec::with_capacity(edges.len());
    for edge in edges {
        let left = uf.find(edge.a);
        let right = uf.find(edge.b);
        let label = uf.union(left, right);
        merges.push(Merge {
            left,
            right,
            distance: edge.weight,
            size: uf.size[label],
        });
    }
    merges
}

/// A cluster of the condensed tree. Cluster 0 is the root; children always
/// have larger ids than their parent.
#[derive(Debug, Clone)]
struct CondensedCluster {
    parent: Option<usize>,
    /// λ at which the cluster split off its parent.
    birth: f64,
    size: usize,
    children: Vec<usize>,
    /// Points that left this cluster directly, with the λ they left at.
    points: Vec<(usize, f64)>,
}

fn lambda_of(distance: f64) -> f64 {
    1.0 / distance.max(MIN_DISTANCE)
}

/// Walk the single-linkage tree from the root and keep only splits where
/// both sides reach `min_cluster_size`; smaller sides fall out as points.
fn condense(n: usize, merges: &[Merge], min_cluster_size: usize) -> Vec<CondensedCluster> {
    let node_size = |node: usize| if node < n { 1 } else { merges[node - n].size };
    let root = 2 * n - 2;

    let mut clusters = vec![CondensedCluster {
        parent: None,
        birth: 0.0,
        size: n,
        children: Vec::new(),
        points: Vec::new(),
    }];
    let mut stack = vec![(root, 0usize, 0.0f64)];

    while let Some((node, cluster, entered)) = stack.pop() {
        if node < n {
            clusters[cluster].points.push((node, entered));
            continue;
        }

        let merge = merges[node - n];
        let lambda = lambda_of(merge.distance);
        let left_big = node_size(merge.left) >= min_cluster_size;
        let right_big = node_size(merge.right) >= min_cluster_size;

        match (left_big, right_big) {
            (true, true) => {
                let mut spawned = [(merge.left, 0), (merge.right, 0)];
                for (child, id) in spawned.iter_mut() {
                    *id = clusters.len();
                    clusters.push(CondensedCluster {
                        parent: Some(cluster),
                        birth: lambda,
                        size: node_size(*child),
                        children: Vec::new(),
                        points: Vec::new(),
                    });
                    clusters[cluster].children.push(*id);
                }
                for (child, id) in spawned.into_iter().rev() {
                    stack.push((child, id, lambda));
                }
            }
            (true, false) => {
                fall_out(n, merges, merge.right, lambda, &mut clusters[cluster]);
                stack.push((merge.left, cluster, lambda));
            }
            (false, true) => {
                fall_out(n, merges, merge.left, lambda, &mut clusters[cluster]);
                stack.push((merge.right, cluster, lambda));
            }
            (false, false) => {
                fall_out(n, merges, merge.left, lambda, &mut clusters[cluster]);
                fall_out(n, merges, merge.right, lambda, &mut clusters[cluster]);
            }
        }
    }

    clusters
}

/// Record every point under `node` as leaving `cluster` at `lambda`.
fn fall_out(n: usize, merges: &[Merge], node: usize, lambda: f64, cluster: &mut CondensedCluster) {
    let mut stack = vec![node];
    while let Some(node) = stack.pop() {
        if node < n {
            cluster.points.push((node, lambda));
        } else {
            let merge = &merges[node - n];
            stack.push(merge.right);
            stack.push(merge.left);
        }
    }
}

/// Excess of mass: Σ over members of (λ when leaving − λ at birth).
/// Child clusters count their whole population as leaving at their birth.
fn stabilities(tree: &[CondensedCluster]) -> Vec<f64> {
    tree.iter()
        .map(|cluster| {
            let from_points: f64 = cluster
                .points
                .iter()
                .map(|(_, lambda)| lambda - cluster.birth)
                .sum();
            let from_children: f64 = cluster
                .children
                .iter()
                .map(|&c| (tree[c].birth - cluster.birth) * tree[c].size as f64)
                .sum();
            from_points + from_children
        })
        .collect()
}

/// Bottom-up tree cut maximising total stability. The root is never
/// selected; a parent wins ties against its descendants.
fn select_clusters(tree: &[CondensedCluster], stability: &[f64]) -> Vec<bool> {
    let mut selected = vec![false; tree.len()];
    let mut subtree_best = stability.to_vec();

    for c in (1..tree.len()).rev() {
        let children_total: f64 = tree[c].children.iter().map(|&ch| subtree_best[ch]).sum();
        if tree[c].children.is_empty() || stability[c] >= children_total {
            selected[c] = true;
            subtree_best[c] = stability[c];
        } else {
            subtree_best[c] = children_total;
        }
    }

    // Ids increase downward, so an ascending pass sees every ancestor first
    let mut covered = vec![false; tree.len()];
    for c in 1..tree.len() {
        if let Some(parent) = tree[c].parent {
            if selected[parent] || covered[parent] {
                covered[c] = true;
                selected[c] = false;
            }
        }
    }

    selected
}

/// Every point under a selected cluster takes that cluster's output index;
/// output indices follow ascending cluster id.
fn label_points(n: usize, tree: &[CondensedCluster], selected: &[bool]) -> Vec<Option<usize>> {
    let mut labels = vec![None; n];
    let mut out = 0;
    for (c, _) in selected.iter().enumerate().filter(|(_, s)| **s) {
        let mut stack = vec![c];
        while let Some(d) = stack.pop() {
            for &(point, _) in &tree[d].points {
                labels[point] = Some(out);
            }
            stack.extend_from_slice(&tree[d].children);
        }
        out += 1;
    }
    labels
}
