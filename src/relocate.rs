use thiserror::Error;

use crate::gpkg::blob::{PointShape, WkbPoint};
use crate::spatial::PointMap;
use crate::types::RectFeature;

#[derive(Debug, Error, PartialEq)]
pub enum RelocateError {
    #[error("no rectangles to move points into")]
    NoRectangles,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Move {
    pub point_fid: i64,
    pub source_rect: i64,
    pub target_rect: i64,
    pub from: WkbPoint,
    pub to: WkbPoint,
    pub shape: PointShape,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovePlan {
    pub moves: Vec<Move>,
}

impl MovePlan {
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }
}

/// Moves the points of every rectangle into its successor in `sorted`, wrapping
/// the last one around to the first. Each point keeps its offset from the
/// centroid of the rectangle it leaves.
pub fn plan_moves(sorted: &[RectFeature], map: &PointMap) -> Result<MovePlan, RelocateError> {
    if sorted.is_empty() {
        return Err(RelocateError::NoRectangles);
    }

    let n = sorted.len();
    let mut plan = MovePlan::default();
    for (i, current) in sorted.iter().enumerate() {
        let target = &sorted[(i + 1) % n];
        let points = map.points_in(current.fid);
        if points.is_empty() {
            continue;
        }

        log::info!(
            "Moving {} points from rectangle {} to {}",
            points.len(),
            current.fid,
            target.fid
        );

        for feature in points {
            let from = feature.geometry;
            let offset_x = from.x - current.centroid.x();
            let offset_y = from.y - current.centroid.y();
            let to = from.with_xy(
                target.centroid.x() + offset_x,
                target.centroid.y() + offset_y,
            );
            plan.moves.push(Move {
                point_fid: feature.fid,
                source_rect: current.fid,
                target_rect: target.fid,
                from,
                to,
                shape: feature.shape,
            });
        }
    }
    Ok(plan)
}
