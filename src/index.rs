//! Nearest-neighbour and radius queries over planar points.
//!
//! [`KdTree`] is a static, implicitly balanced 2-D tree: entries are sorted in
//! place so that the median of every sub-range is the splitting node. It never
//! changes after construction, which keeps queries deterministic. Distance ties
//! resolve to the smallest item id, i.e. the point that was supplied first.

use tracing::debug;

use crate::samples::Sample;

#[derive(Debug, Clone, Copy, PartialEq)]
struct KdEntry {
    item: usize,
    point: [f64; 2],
}

impl KdEntry {
    fn distance_squared(&self, query: [f64; 2]) -> f64 {
        let dx = self.point[0] - query[0];
        let dy = self.point[1] - query[1];
        dx * dx + dy * dy
    }
}

/// Static 2-D k-d tree mapping points to caller-supplied item ids.
#[derive(Debug, Clone, Default)]
pub struct KdTree {
    entries: Vec<KdEntry>,
}

impl KdTree {
    /// Builds a tree from `(item, x, y)` triples. Points with a non-finite
    /// coordinate are skipped.
    pub fn build(points: impl IntoIterator<Item = (usize, f64, f64)>) -> Self {
        let mut entries: Vec<KdEntry> = points
            .into_iter()
            .filter(|(_, x, y)| x.is_finite() && y.is_finite())
            .map(|(item, x, y)| KdEntry {
                item,
                point: [x, y],
            })
            .collect();
        build_recursive(&mut entries, 0);
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Item closest to `(x, y)`; among equally close items, the smallest id.
    ///
    /// Returns `None` only for an empty tree.
    pub fn nearest(&self, x: f64, y: f64) -> Option<usize> {
        let mut best: Option<(f64, usize)> = None;
        self.nearest_in(0, self.entries.len(), 0, [x, y], &mut best);
        best.map(|(_, item)| item)
    }

    /// Items within `radius` of `(x, y)` (inclusive), sorted by id.
    pub fn within_radius(&self, x: f64, y: f64, radius: f64) -> Vec<usize> {
        let mut found = Vec::new();
        self.within_in(0, self.entries.len(), 0, [x, y], radius, &mut found);
        found.sort_unstable();
        found
    }

    fn nearest_in(
        &self,
        lo: usize,
        hi: usize,
        depth: usize,
        query: [f64; 2],
        best: &mut Option<(f64, usize)>,
    ) {
        if lo >= hi {
            return;
        }
        let mid = lo + (hi - lo) / 2;
        let entry = self.entries[mid];

        let d2 = entry.distance_squared(query);
        let better = match *best {
            None => true,
            Some((best_d2, best_item)) => {
                d2 < best_d2 || (d2 == best_d2 && entry.item < best_item)
            }
        };
        if better {
            *best = Some((d2, entry.item));
        }

        let axis = depth % 2;
        let diff = query[axis] - entry.point[axis];
        let (near, far) = if diff < 0.0 {
            ((lo, mid), (mid + 1, hi))
        } else {
            ((mid + 1, hi), (lo, mid))
        };

        self.nearest_in(near.0, near.1, depth + 1, query, best);
        // `<=` keeps equally distant points on the far side in play for the tie-break.
        if best.is_none_or(|(best_d2, _)| diff * diff <= best_d2) {
            self.nearest_in(far.0, far.1, depth + 1, query, best);
        }
    }

    fn within_in(
        &self,
        lo: usize,
        hi: usize,
        depth: usize,
        query: [f64; 2],
        radius: f64,
        found: &mut Vec<usize>,
    ) {
        if lo >= hi {
            return;
        }
        let mid = lo + (hi - lo) / 2;
        let entry = self.entries[mid];

        if entry.distance_squared(query) <= radius * radius {
            found.push(entry.item);
        }

        let axis = depth % 2;
        let diff = query[axis] - entry.point[axis];
        if diff <= radius {
            self.within_in(lo, mid, depth + 1, query, radius, found);
        }
        if diff >= -radius {
            self.within_in(mid + 1, hi, depth + 1, query, radius, found);
        }
    }
}

/// Sorts `entries` so each sub-range's median splits it on the depth's axis.
/// Entries left of a median never exceed it on that axis; entries right of it are never below.
fn build_recursive(entries: &mut [KdEntry], depth: usize) {
    if entries.len() <= 1 {
        return;
    }
    let axis = depth % 2;
    entries.sort_by(|a, b| {
        a.point[axis]
            .total_cmp(&b.point[axis])
            .then_with(|| a.item.cmp(&b.item))
    });
    let mid = entries.len() / 2;
    let (left, rest) = entries.split_at_mut(mid);
    build_recursive(left, depth + 1);
    build_recursive(&mut rest[1..], depth + 1);
}

/// Spatial index over the samples of one aggregation run.
///
/// Query results are positions in the slice the index was built from.
#[derive(Debug, Clone)]
pub struct SampleIndex {
    tree: KdTree,
}

impl SampleIndex {
    /// Indexes every sample with finite coordinates.
    pub fn build<R>(samples: &[Sample<R>]) -> Self {
        let tree = KdTree::build(
            samples
                .iter()
                .enumerate()
                .filter(|(_, s)| s.has_coordinates())
                .map(|(i, s)| (i, s.x, s.y)),
        );
        let skipped = samples.len() - tree.len();
        debug!(indexed = tree.len(), skipped, "Sample index built");
        Self { tree }
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Samples within `radius` of `center`. Every sample inside a shape of that
    /// half-extent around `center` is included; callers filter exactly afterwards.
    pub fn radius_query(&self, center: (f64, f64), radius: f64) -> Vec<usize> {
        self.tree.within_radius(center.0, center.1, radius)
    }

    /// The single closest sample, first-supplied on ties. `None` when empty.
    pub fn nearest(&self, point: (f64, f64)) -> Option<usize> {
        self.tree.nearest(point.0, point.1)
    }
}
