use geo::{BoundingRect, Centroid, MultiPolygon, Point, Rect};

use crate::gpkg::blob::{PointShape, WkbPoint};

/// A GeoPackage feature table resolved through `gpkg_geometry_columns`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureLayer {
    pub table: String,
    pub geometry_column: String,
    pub fid_column: String,
    pub geometry_type: String,
    pub srs_id: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointFeature {
    pub fid: i64,
    pub geometry: WkbPoint,
    /// Written back the way it was read.
    pub shape: PointShape,
}

impl PointFeature {
    pub fn new(fid: i64, geometry: WkbPoint) -> Self {
        Self {
            fid,
            geometry,
            shape: PointShape::Single,
        }
    }

    /// A feature stored as a multipoint holding exactly one point.
    pub fn multi(fid: i64, geometry: WkbPoint) -> Self {
        Self {
            fid,
            geometry,
            shape: PointShape::Multi,
        }
    }

    pub fn point(&self) -> Point<f64> {
        self.geometry.point()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RectFeature {
    pub fid: i64,
    pub shape: MultiPolygon<f64>,
    pub centroid: Point<f64>,
}

impl RectFeature {
    /// `None` for shapes without area, which have no centroid to move around.
    pub fn new(fid: i64, shape: MultiPolygon<f64>) -> Option<Self> {
        let centroid = shape.centroid()?;
        Some(Self {
            fid,
            shape,
            centroid,
        })
    }

    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.shape.bounding_rect()
    }
}
