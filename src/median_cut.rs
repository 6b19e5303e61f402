use crate::Pixel;
use crate::group::PixelGroup;

/// Color channel used as a split axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Red,
    Green,
    Blue,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::Red, Axis::Green, Axis::Blue];

    pub fn index(self) -> usize {
        match self {
            Self::Red => 0,
            Self::Green => 1,
            Self::Blue => 2,
        }
    }

    /// The channel value of `pixel` along this axis.
    pub fn value(self, pixel: Pixel) -> u8 {
        match self {
            Self::Red => pixel.r,
            Self::Green => pixel.g,
            Self::Blue => pixel.b,
        }
    }
}

/// Axis-aligned box in RGB space, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min: [u8; 3],
    pub max: [u8; 3],
}

impl Bounds {
    /// The whole RGB cube, [0, 255]³.
    pub const FULL: Bounds = Bounds {
        min: [0, 0, 0],
        max: [255, 255, 255],
    };

    /// Tight bounds around `pixels`, or `None` when empty.
    pub fn of(pixels: &[Pixel]) -> Option<Bounds> {
        let first = pixels.first()?;
        let mut bounds = Bounds {
            min: [first.r, first.g, first.b],
            max: [first.r, first.g, first.b],
        };
        for p in &pixels[1..] {
            for axis in Axis::ALL {
                let i = axis.index();
                let v = axis.value(*p);
                bounds.min[i] = bounds.min[i].min(v);
                bounds.max[i] = bounds.max[i].max(v);
            }
        }
        Some(bounds)
    }

    pub fn extent(&self, axis: Axis) -> u8 {
        let i = axis.index();
        self.max[i].saturating_sub(self.min[i])
    }

    /// Widest axis; ties resolve red, then green, then blue.
    pub fn widest_axis(&self) -> Axis {
        let (r, g, b) = (
            self.extent(Axis::Red),
            self.extent(Axis::Green),
            self.extent(Axis::Blue),
        );
        if r >= g && r >= b {
            Axis::Red
        } else if g >= b {
            Axis::Green
        } else {
            Axis::Blue
        }
    }

    fn max_extent(&self) -> u8 {
        self.extent(self.widest_axis())
    }
}

/// A pixel group together with the box it was cut from.
///
/// `bounds` is the nominal cell of the partition (it starts as the whole
/// cube), not necessarily the tight box around `pixels`.
#[derive(Debug, Clone, PartialEq)]
pub struct CutNode {
    pub pixels: PixelGroup,
    pub bounds: Bounds,
}

impl CutNode {
    pub fn new(pixels: PixelGroup, bounds: Bounds) -> Self {
        Self { pixels, bounds }
    }

    /// A node covering the whole RGB cube.
    pub fn root(pixels: impl Into<PixelGroup>) -> Self {
        Self::new(pixels.into(), Bounds::FULL)
    }
}

/// One split plane, recorded in the order splits were performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cut {
    pub axis: Axis,
    /// Pivot value: pixels at or below it went to `lower`.
    pub value: u8,
    pub lower: Bounds,
    pub upper: Bounds,
}

#[derive(Debug, Clone, Default)]
pub struct MedianCutResult {
    /// Leaf groups in worklist order.
    pub groups: Vec<CutNode>,
    pub cuts: Vec<Cut>,
    /// Deepest split level reached below the initial groups.
    pub depth: usize,
}

impl MedianCutResult {
    pub fn into_groups(self) -> Vec<PixelGroup> {
        self.groups.into_iter().map(|n| n.pixels).collect()
    }
}

/// Arena slot. Internal nodes keep only their children.
#[derive(Debug)]
struct ArenaNode {
    node: Option<CutNode>,
    children: Option<(usize, usize)>,
}

/// Run median cut from a single group covering the whole RGB cube.
pub fn median_cut(pixels: &[Pixel], target_group_count: usize) -> MedianCutResult {
    run(
        vec![CutNode::root(pixels.to_vec())],
        Vec::new(),
        target_group_count,
    )
}

/// Continue median cut from `initial_groups` until there are
/// `target_group_count` groups or nothing is left to split.
///
/// The group with the widest channel spread is split next (first in worklist
/// order on ties). New cuts are appended to `initial_cuts`. A target of zero,
/// or initial groups holding no pixels, returns the input unchanged.
///
/// There is no depth parameter: the worklist replaces recursion, and the
/// deepest split level reached is returned in [`MedianCutResult::depth`].
pub fn run(
    initial_groups: Vec<CutNode>,
    initial_cuts: Vec<Cut>,
    target_group_count: usize,
) -> MedianCutResult {
    let total_pixels: usize = initial_groups.iter().map(|g| g.pixels.len()).sum();
    if target_group_count == 0 || total_pixels == 0 {
        return MedianCutResult {
            groups: initial_groups,
            cuts: initial_cuts,
            depth: 0,
        };
    }

    let mut arena: Vec<ArenaNode> = initial_groups
        .into_iter()
        .map(|node| ArenaNode {
            node: Some(node),
            children: None,
        })
        .collect();
    let roots = arena.len();
    let mut leaves: Vec<usize> = (0..roots).collect();
    let mut cuts = initial_cuts;
    let initial_cut_count = cuts.len();

    while leaves.len() < target_group_count {
        let Some(pos) = widest_leaf(&arena, &leaves) else {
            break; // every group is down to one pixel
        };

        let parent = leaves[pos];
        let Some(node) = arena[parent].node.take() else {
            break;
        };
        let (lower, upper, cut) = split(node);

        let lower_idx = arena.len();
        arena.push(ArenaNode {
            node: Some(lower),
            children: None,
        });
        arena.push(ArenaNode {
            node: Some(upper),
            children: None,
        });
        arena[parent].children = Some((lower_idx, lower_idx + 1));

        leaves[pos] = lower_idx;
        leaves.insert(pos + 1, lower_idx + 1);
        cuts.push(cut);
    }

    let depth = tree_depth(&arena, roots);
    log::debug!(
        "median cut: {} pixels into {} groups ({} new cuts, depth {})",
        total_pixels,
        leaves.len(),
        cuts.len() - initial_cut_count,
        depth
    );

    let groups = leaves
        .into_iter()
        .filter_map(|idx| arena[idx].node.take())
        .collect();

    MedianCutResult {
        groups,
        cuts,
        depth,
    }
}

fn tree_depth(arena: &[ArenaNode], roots: usize) -> usize {
    let mut deepest = 0;
    let mut stack: Vec<(usize, usize)> = (0..roots).map(|idx| (idx, 0)).collect();
    while let Some((idx, level)) = stack.pop() {
        deepest = deepest.max(level);
        if let Some((lower, upper)) = arena[idx].children {
            stack.push((lower, level + 1));
            stack.push((upper, level + 1));
        }
    }
    deepest
}

/// Position in `leaves` of the splittable group with the largest spread.
fn widest_leaf(arena: &[ArenaNode], leaves: &[usize]) -> Option<usize> {
    let mut best: Option<(usize, u8)> = None;
    for (pos, &idx) in leaves.iter().enumerate() {
        let Some(node) = arena[idx].node.as_ref() else {
            continue;
        };
        if node.pixels.len() < 2 {
            continue;
        }
        let Some(spread) = Bounds::of(node.pixels.pixels()).map(|b| b.max_extent()) else {
            continue;
        };
        // Strict comparison keeps the earliest group on ties
        if best.is_none_or(|(_, s)| spread > s) {
            best = Some((pos, spread));
        }
    }
    best.map(|(pos, _)| pos)
}

/// Split a node of at least two pixels at the median of its widest axis.
/// Pixels sharing the pivot's axis value stay together in the lower half.
fn split(node: CutNode) -> (CutNode, CutNode, Cut) {
    let mut pixels = node.pixels.into_pixels();
    let tight = Bounds::of(&pixels).unwrap_or(node.bounds);
    let axis = tight.widest_axis();

    pixels.sort_unstable_by_key(|p| (axis.value(*p), p.r, p.g, p.b));

    let split_idx = pivot_split(&pixels, axis);
    let upper_pixels = pixels.split_off(split_idx);

    let i = axis.index();
    let value = axis.value(pixels[pixels.len() - 1]);
    let upper_start = axis.value(upper_pixels[0]);

    let mut lower_bounds = node.bounds;
    lower_bounds.max[i] = value;
    lower_bounds.min[i] = lower_bounds.min[i].min(value);

    let mut upper_bounds = node.bounds;
    upper_bounds.min[i] = upper_start;
    upper_bounds.max[i] = upper_bounds.max[i].max(upper_start);

    let cut = Cut {
        axis,
        value,
        lower: lower_bounds,
        upper: upper_bounds,
    };

    (
        CutNode::new(pixels.into(), lower_bounds),
        CutNode::new(upper_pixels.into(), upper_bounds),
        cut,
    )
}

/// Split index for pixels sorted along `axis`.
///
/// The pivot is the lower-median pixel. Everything with an axis value at or
/// below the pivot's goes to the lower half. When the pivot's value is the
/// maximum, the split moves down to where that value starts; identical values
/// fall back to the middle index. Always in `1..len`.
fn pivot_split(sorted: &[Pixel], axis: Axis) -> usize {
    let len = sorted.len();
    let pivot = axis.value(sorted[(len - 1) / 2]);
    let above = sorted.partition_point(|p| axis.value(*p) <= pivot);
    if above < len {
        return above;
    }
    match sorted.partition_point(|p| axis.value(*p) < pivot) {
        0 => (len / 2).clamp(1, len - 1),
        start => start,
    }
}
