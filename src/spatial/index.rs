use geo::Point;
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{RTree, AABB};

use crate::types::RectFeature;

type Entry = GeomWithData<Rectangle<[f64; 2]>, i64>;

/// R-tree over rectangle bounding boxes, keyed by feature id.
pub struct RectIndex {
    tree: RTree<Entry>,
}

impl RectIndex {
    pub fn build(rects: &[RectFeature]) -> Self {
        let entries: Vec<Entry> = rects
            .iter()
            .filter_map(|rect| {
                let b = rect.bounds()?;
                let corners = Rectangle::from_corners([b.min().x, b.min().y], [b.max().x, b.max().y]);
                Some(GeomWithData::new(corners, rect.fid))
            })
            .collect();
        let tree = RTree::bulk_load(entries);
        log::debug!("rectangle index built with {} entries", tree.size());
        Self { tree }
    }

    /// Ids of rectangles whose bounding box touches `point`, ascending.
    pub fn candidates(&self, point: Point<f64>) -> Vec<i64> {
        let envelope = AABB::from_point([point.x(), point.y()]);
        let mut fids: Vec<i64> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|entry| entry.data)
            .collect();
        fids.sort_unstable();
        fids
    }
}
