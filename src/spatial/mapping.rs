use geo::Contains;
use std::collections::{BTreeMap, HashMap};

use super::RectIndex;
use crate::types::{PointFeature, RectFeature};

/// Stable sort by centroid X; rectangles with equal X keep their input order.
pub fn sort_rectangles(mut rects: Vec<RectFeature>) -> Vec<RectFeature> {
    rects.sort_by(|a, b| a.centroid.x().total_cmp(&b.centroid.x()));
    log::info!("Found and sorted {} rectangles", rects.len());
    rects
}

/// Points grouped by the rectangle that contains them.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PointMap {
    by_rect: BTreeMap<i64, Vec<PointFeature>>,
    unassigned: usize,
}

impl PointMap {
    pub fn points_in(&self, rect_fid: i64) -> &[PointFeature] {
        self.by_rect.get(&rect_fid).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn mapped(&self) -> usize {
        self.by_rect.values().map(Vec::len).sum()
    }

    pub fn unassigned(&self) -> usize {
        self.unassigned
    }
}

/// Assigns each point to the lowest-fid rectangle whose interior contains it.
/// Points on a rectangle boundary or outside every rectangle stay unassigned.
pub fn map_points(points: &[PointFeature], rects: &[RectFeature], index: &RectIndex) -> PointMap {
    let by_fid: HashMap<i64, &RectFeature> = rects.iter().map(|r| (r.fid, r)).collect();
    let mut map = PointMap {
        by_rect: rects.iter().map(|r| (r.fid, Vec::new())).collect(),
        unassigned: 0,
    };

    for feature in points {
        let point = feature.point();
        let owner = index
            .candidates(point)
            .into_iter()
            .filter_map(|fid| by_fid.get(&fid))
            .find(|rect| rect.shape.contains(&point));

        match owner {
            Some(rect) => map
                .by_rect
                .entry(rect.fid)
                .or_default()
                .push(feature.clone()),
            None => {
                log::debug!("point {} is not inside any rectangle", feature.fid);
                map.unassigned += 1;
            }
        }
    }

    log::info!("Mapped {} points to rectangles", map.mapped());
    if map.unassigned > 0 {
        log::info!("{} points are outside every rectangle and stay put", map.unassigned);
    }
    map
}
