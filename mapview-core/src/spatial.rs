use rstar::{RTree, RTreeObject, AABB};

use crate::feature::SharedFeature;
use crate::geometry::BBox;

/// An entry in the R-tree spatial index, referencing a feature by its
/// position in the layer's draw order.
#[derive(Debug, Clone)]
pub struct SpatialEntry {
    pub feature_index: usize,
    pub bbox: BBox,
}

impl RTreeObject for SpatialEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.bbox.min.x, self.bbox.min.y],
            [self.bbox.max.x, self.bbox.max.y],
        )
    }
}

/// Spatial index used to cull a layer's features to the viewport.
pub struct SpatialIndex {
    tree: RTree<SpatialEntry>,
}

impl SpatialIndex {
    /// Index every feature that has a valid extent. Features without one can
    /// never intersect a viewport and are left out.
    pub fn build(features: &[SharedFeature]) -> Self {
        let entries = features
            .iter()
            .enumerate()
            .filter_map(|(feature_index, feature)| {
                feature.bbox().map(|bbox| SpatialEntry {
                    feature_index,
                    bbox,
                })
            })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Indices of the features intersecting `viewport`, in draw order.
    pub fn query_viewport(&self, viewport: &BBox) -> Vec<usize> {
        let envelope = AABB::from_corners(
            [viewport.min.x, viewport.min.y],
            [viewport.max.x, viewport.max.y],
        );
        let mut found: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|entry| entry.feature_index)
            .collect();
        found.sort_unstable();
        found
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
