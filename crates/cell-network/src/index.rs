//! Spatial index over mobile regions.
//!
//! An R-tree (via `rstar`) holds the bounding box of each region's coverage
//! polygon.  Queries first collect bounding-box candidates, then run the
//! exact polygon test.  Where regions overlap, the lowest `RegionId` wins,
//! so lookups never depend on tree layout.

use cell_core::{Area, CartesianPoint, Polygon, RegionId};
use rstar::{RTree, RTreeObject, AABB};

#[derive(Clone)]
struct RegionEntry {
    envelope: AABB<[f64; 2]>,
    polygon: Polygon,
    id: RegionId,
}

impl RTreeObject for RegionEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

fn aabb(min: CartesianPoint, max: CartesianPoint) -> AABB<[f64; 2]> {
    AABB::from_corners([min.x, min.y], [max.x, max.y])
}

#[derive(Default)]
pub struct RegionIndex {
    tree: RTree<RegionEntry>,
}

impl RegionIndex {
    /// Bulk-load the index from `(id, coverage)` pairs.
    pub fn build<'a>(regions: impl IntoIterator<Item = (RegionId, &'a Polygon)>) -> Self {
        let entries: Vec<RegionEntry> = regions
            .into_iter()
            .map(|(id, polygon)| {
                let (min, max) = polygon.bounding_box();
                RegionEntry { envelope: aabb(min, max), polygon: polygon.clone(), id }
            })
            .collect();
        Self { tree: RTree::bulk_load(entries) }
    }

    /// The mobile region containing `point`, if any.
    pub fn region_at(&self, point: CartesianPoint) -> Option<RegionId> {
        self.tree
            .locate_in_envelope_intersecting(&AABB::from_point([point.x, point.y]))
            .filter(|entry| entry.polygon.contains(point))
            .map(|entry| entry.id)
            .min()
    }

    /// Every mobile region whose coverage overlaps `area`, ascending by id.
    pub fn regions_intersecting(&self, area: &Area) -> Vec<RegionId> {
        let (min, max) = area.bounding_box();
        let mut ids: Vec<RegionId> = self
            .tree
            .locate_in_envelope_intersecting(&aabb(min, max))
            .filter(|entry| area.intersects_polygon(&entry.polygon))
            .map(|entry| entry.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
