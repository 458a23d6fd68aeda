use geo::MultiPolygon;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

use super::blob::{self, Envelope, Geometry, PointShape, WkbPoint};
use super::error::GpkgError;
use super::functions;
use crate::types::{FeatureLayer, PointFeature, RectFeature};

pub type Result<T> = std::result::Result<T, GpkgError>;

#[derive(Clone, Debug)]
pub struct GpkgStorage {
    pub path: PathBuf,
}

/// Write transaction on a GeoPackage. Rolled back on drop unless committed.
pub struct GpkgTx {
    conn: Connection,
    finished: bool,
}

pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn db_has_table(conn: &Connection, name: &str) -> rusqlite::Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?1",
            params![name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn db_list_feature_tables(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT table_name FROM gpkg_contents WHERE lower(data_type) = 'features' ORDER BY rowid",
    )?;
    let rows = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(rows)
}

fn db_geometry_column(
    conn: &Connection,
    table: &str,
) -> rusqlite::Result<Option<(String, String, String, i32)>> {
    conn.query_row(
        r#"
        SELECT table_name, column_name, geometry_type_name, srs_id
        FROM gpkg_geometry_columns
        WHERE lower(table_name) = lower(?1)
        "#,
        params![table],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
    )
    .optional()
}

fn db_fid_column(conn: &Connection, table: &str) -> rusqlite::Result<Option<String>> {
    let sql = format!("PRAGMA table_info({})", quote_ident(table));
    let mut stmt = conn.prepare(&sql)?;
    let columns = stmt
        .query_map([], |row| {
            let name: String = row.get(1)?;
            let kind: String = row.get(2)?;
            let pk: i64 = row.get(5)?;
            Ok((name, kind, pk))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(columns
        .into_iter()
        .find(|(_, kind, pk)| *pk > 0 && kind.eq_ignore_ascii_case("INTEGER"))
        .map(|(name, _, _)| name))
}

fn db_load_geometries(
    conn: &Connection,
    layer: &FeatureLayer,
) -> rusqlite::Result<Vec<(i64, Option<Vec<u8>>)>> {
    let sql = format!(
        "SELECT {fid}, {geom} FROM {table} ORDER BY {fid}",
        fid = quote_ident(&layer.fid_column),
        geom = quote_ident(&layer.geometry_column),
        table = quote_ident(&layer.table),
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn db_update_geometry(
    conn: &Connection,
    layer: &FeatureLayer,
    fid: i64,
    blob: &[u8],
) -> rusqlite::Result<usize> {
    let sql = format!(
        "UPDATE {table} SET {geom} = ?1 WHERE {fid} = ?2",
        table = quote_ident(&layer.table),
        geom = quote_ident(&layer.geometry_column),
        fid = quote_ident(&layer.fid_column),
    );
    conn.execute(&sql, params![blob, fid])
}

fn db_layer_extent(conn: &Connection, layer: &FeatureLayer) -> rusqlite::Result<Option<Envelope>> {
    let sql = format!(
        r#"
        SELECT MIN(ST_MinX(g)), MAX(ST_MaxX(g)), MIN(ST_MinY(g)), MAX(ST_MaxY(g))
        FROM (SELECT {geom} AS g FROM {table} WHERE {geom} IS NOT NULL)
        "#,
        geom = quote_ident(&layer.geometry_column),
        table = quote_ident(&layer.table),
    );
    conn.query_row(&sql, [], |row| {
        let min_x: Option<f64> = row.get(0)?;
        let max_x: Option<f64> = row.get(1)?;
        let min_y: Option<f64> = row.get(2)?;
        let max_y: Option<f64> = row.get(3)?;
        Ok(match (min_x, max_x, min_y, max_y) {
            (Some(min_x), Some(max_x), Some(min_y), Some(max_y)) => Some(Envelope {
                min_x,
                max_x,
                min_y,
                max_y,
            }),
            _ => None,
        })
    })
}

fn db_save_extent(
    conn: &Connection,
    table: &str,
    extent: Option<Envelope>,
) -> rusqlite::Result<usize> {
    let (min_x, max_x, min_y, max_y) = match extent {
        Some(e) => (Some(e.min_x), Some(e.max_x), Some(e.min_y), Some(e.max_y)),
        None => (None, None, None, None),
    };
    conn.execute(
        r#"
        UPDATE gpkg_contents
        SET min_x = ?1, max_x = ?2, min_y = ?3, max_y = ?4,
            last_change = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE lower(table_name) = lower(?5)
        "#,
        params![min_x, max_x, min_y, max_y, table],
    )
}

impl GpkgStorage {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection> {
        if !self.path.exists() {
            return Err(GpkgError::NotFound(self.path.clone()));
        }
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(std::time::Duration::from_millis(500))?;
        functions::register(&conn)?;

        if !db_has_table(&conn, "gpkg_contents")? {
            return Err(GpkgError::NotGeoPackage(self.path.clone()));
        }
        Ok(conn)
    }

    /// Checks the file is a readable GeoPackage.
    pub fn open(&self) -> Result<()> {
        self.connect().map(|_| ())
    }

    pub fn feature_layers(&self) -> Result<Vec<String>> {
        let conn = self.connect()?;
        Ok(db_list_feature_tables(&conn)?)
    }

    /// Resolves `name`, or the first feature table when `name` is `None`.
    pub fn layer(&self, name: Option<&str>) -> Result<FeatureLayer> {
        let conn = self.connect()?;
        let table = match name {
            Some(name) => name.to_string(),
            None => {
                let tables = db_list_feature_tables(&conn)?;
                if tables.len() > 1 {
                    log::warn!(
                        "{} holds {} feature layers, using '{}'",
                        self.path.display(),
                        tables.len(),
                        tables[0]
                    );
                }
                tables
                    .into_iter()
                    .next()
                    .ok_or_else(|| GpkgError::NoFeatureLayers(self.path.clone()))?
            }
        };

        let (table, geometry_column, geometry_type, srs_id) = db_geometry_column(&conn, &table)?
            .ok_or_else(|| GpkgError::LayerNotFound(table.clone()))?;
        let fid_column =
            db_fid_column(&conn, &table)?.ok_or_else(|| GpkgError::MissingFid(table.clone()))?;

        Ok(FeatureLayer {
            table,
            geometry_column,
            fid_column,
            geometry_type,
            srs_id,
        })
    }

    fn load_geometries(&self, layer: &FeatureLayer) -> Result<Vec<(i64, Geometry)>> {
        let conn = self.connect()?;
        let mut out = Vec::new();
        for (fid, raw) in db_load_geometries(&conn, layer)? {
            let Some(raw) = raw else {
                log::warn!("{}: feature {} has no geometry, skipped", layer.table, fid);
                continue;
            };
            let decoded =
                blob::decode(&raw).map_err(|source| GpkgError::Geometry { fid, source })?;
            match decoded.geometry {
                Some(g) if !g.is_empty() => out.push((fid, g)),
                _ => log::warn!("{}: feature {} is empty, skipped", layer.table, fid),
            }
        }
        Ok(out)
    }

    /// Point features in fid order. A multipoint is accepted only when it holds one point.
    pub fn read_points(&self, layer: &FeatureLayer) -> Result<Vec<PointFeature>> {
        self.load_geometries(layer)?
            .into_iter()
            .map(|(fid, geometry)| match geometry {
                Geometry::Point(p) => Ok(PointFeature::new(fid, p)),
                Geometry::MultiPoint(ps) if ps.len() == 1 => Ok(PointFeature::multi(fid, ps[0])),
                other => Err(GpkgError::UnexpectedGeometry {
                    fid,
                    expected: "POINT",
                    found: other.type_name(),
                }),
            })
            .collect()
    }

    /// Polygon features in fid order, each normalised to a multipolygon.
    pub fn read_rectangles(&self, layer: &FeatureLayer) -> Result<Vec<RectFeature>> {
        let mut out = Vec::new();
        for (fid, geometry) in self.load_geometries(layer)? {
            let shape = match geometry {
                Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                Geometry::MultiPolygon(mp) => mp,
                other => {
                    return Err(GpkgError::UnexpectedGeometry {
                        fid,
                        expected: "POLYGON",
                        found: other.type_name(),
                    })
                }
            };
            match RectFeature::new(fid, shape) {
                Some(rect) => out.push(rect),
                None => log::warn!("{}: feature {} has no centroid, skipped", layer.table, fid),
            }
        }
        Ok(out)
    }

    pub fn begin_tx(&self) -> Result<GpkgTx> {
        let conn = self.connect()?;
        conn.execute("BEGIN IMMEDIATE", [])?;
        Ok(GpkgTx {
            conn,
            finished: false,
        })
    }
}

impl GpkgTx {
    /// Rewrites the geometry of `fid`, keeping the point or multipoint encoding it had.
    pub fn update_point(
        &self,
        layer: &FeatureLayer,
        fid: i64,
        point: &WkbPoint,
        shape: PointShape,
    ) -> Result<()> {
        let blob = blob::encode(layer.srs_id, point, shape);
        let rows = db_update_geometry(&self.conn, layer, fid, &blob)?;
        if rows == 0 {
            return Err(GpkgError::FeatureNotFound(fid));
        }
        Ok(())
    }

    /// Recomputes the layer extent recorded in `gpkg_contents`.
    pub fn refresh_extent(&self, layer: &FeatureLayer) -> Result<Option<Envelope>> {
        let extent = db_layer_extent(&self.conn, layer)?;
        db_save_extent(&self.conn, &layer.table, extent)?;
        Ok(extent)
    }

    pub fn commit(mut self) -> Result<()> {
        self.conn.execute("COMMIT", [])?;
        self.finished = true;
        Ok(())
    }

    pub fn rollback(mut self) -> Result<()> {
        self.finished = true;
        self.conn.execute("ROLLBACK", [])?;
        Ok(())
    }
}

impl Drop for GpkgTx {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.conn.execute("ROLLBACK", []) {
                log::error!("rollback failed: {}", e);
            }
        }
    }
}
