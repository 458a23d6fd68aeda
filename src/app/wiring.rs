use anyhow::{Context, Result};
use std::path::Path;

use crate::gpkg::GpkgStorage;
use crate::types::{FeatureLayer, PointFeature, RectFeature};

pub fn open_storage(path: &Path) -> Result<GpkgStorage> {
    let storage = GpkgStorage::new(path);
    storage
        .open()
        .with_context(|| format!("opening {}", path.display()))?;
    log::debug!(
        "feature layers in {}: {:?}",
        path.display(),
        storage.feature_layers()?
    );
    Ok(storage)
}

pub fn load_points(
    storage: &GpkgStorage,
    name: Option<&str>,
) -> Result<(FeatureLayer, Vec<PointFeature>)> {
    let layer = storage.layer(name).context("resolving points layer")?;
    let points = storage
        .read_points(&layer)
        .with_context(|| format!("reading points from '{}'", layer.table))?;
    log::info!(
        "Layer '{}' ({}) loaded: {} points",
        layer.table,
        layer.geometry_type,
        points.len()
    );
    Ok((layer, points))
}

pub fn load_rectangles(
    storage: &GpkgStorage,
    name: Option<&str>,
) -> Result<(FeatureLayer, Vec<RectFeature>)> {
    let layer = storage.layer(name).context("resolving rectangles layer")?;
    let rects = storage
        .read_rectangles(&layer)
        .with_context(|| format!("reading rectangles from '{}'", layer.table))?;
    log::info!("Layer '{}' loaded: {} rectangles", layer.table, rects.len());
    Ok((layer, rects))
}
