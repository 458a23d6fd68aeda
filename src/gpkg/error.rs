use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("geometry blob truncated: need {needed} bytes, have {actual}")]
    Truncated { needed: usize, actual: usize },
    #[error("bad geopackage magic: {0:#04x} {1:#04x}")]
    BadMagic(u8, u8),
    #[error("unsupported geopackage binary version: {0}")]
    UnsupportedVersion(u8),
    #[error("invalid envelope indicator: {0}")]
    InvalidEnvelope(u8),
    #[error("extended geopackage geometries are not supported")]
    ExtendedGeometry,
    #[error("invalid wkb byte order: {0}")]
    InvalidByteOrder(u8),
    #[error("unsupported wkb geometry type: {0}")]
    UnsupportedType(u32),
    #[error("{container} cannot hold a {found}")]
    UnexpectedMember {
        container: &'static str,
        found: &'static str,
    },
}

#[derive(Debug, Error)]
pub enum GpkgError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("not a GeoPackage (no gpkg_contents table): {}", .0.display())]
    NotGeoPackage(PathBuf),
    #[error("no feature layers in {}", .0.display())]
    NoFeatureLayers(PathBuf),
    #[error("layer '{0}' not found")]
    LayerNotFound(String),
    #[error("layer '{0}' has no integer primary key")]
    MissingFid(String),
    #[error("feature {fid}: {source}")]
    Geometry { fid: i64, source: GeometryError },
    #[error("feature {fid}: expected {expected}, found {found}")]
    UnexpectedGeometry {
        fid: i64,
        expected: &'static str,
        found: &'static str,
    },
    #[error("feature {0} not found")]
    FeatureNotFound(i64),
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
}
