//! Minimal GeoPackages for tests.

use rusqlite::{params, Connection};
use std::path::Path;

use super::blob::{encode_multipoint, encode_point, WkbPoint};
use super::functions;
use super::sqlite::quote_ident;

pub const SRS_ID: i32 = 4326;

pub fn create_gpkg(path: &Path) -> Connection {
    let conn = Connection::open(path).unwrap();
    functions::register(&conn).unwrap();
    conn.execute_batch(
        r#"
        PRAGMA application_id = 1196444487;
        PRAGMA user_version = 10300;
        CREATE TABLE gpkg_spatial_ref_sys (
            srs_name TEXT NOT NULL,
            srs_id INTEGER PRIMARY KEY,
            organization TEXT NOT NULL,
            organization_coordsys_id INTEGER NOT NULL,
            definition TEXT NOT NULL,
            description TEXT
        );
        INSERT INTO gpkg_spatial_ref_sys VALUES
            ('WGS 84 geodetic', 4326, 'EPSG', 4326, 'GEOGCS["WGS 84"]', NULL);
        CREATE TABLE gpkg_contents (
            table_name TEXT NOT NULL PRIMARY KEY,
            data_type TEXT NOT NULL,
            identifier TEXT UNIQUE,
            description TEXT DEFAULT '',
            last_change DATETIME NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
            min_x DOUBLE,
            min_y DOUBLE,
            max_x DOUBLE,
            max_y DOUBLE,
            srs_id INTEGER
        );
        CREATE TABLE gpkg_geometry_columns (
            table_name TEXT NOT NULL,
            column_name TEXT NOT NULL,
            geometry_type_name TEXT NOT NULL,
            srs_id INTEGER NOT NULL,
            z TINYINT NOT NULL,
            m TINYINT NOT NULL,
            CONSTRAINT pk_geom_cols PRIMARY KEY (table_name, column_name)
        );
        "#,
    )
    .unwrap();
    conn
}

fn add_layer(conn: &Connection, table: &str, geometry_type: &str) {
    conn.execute_batch(&format!(
        "CREATE TABLE {} (fid INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL, geom {}, name TEXT);",
        quote_ident(table),
        geometry_type
    ))
    .unwrap();
    conn.execute(
        "INSERT INTO gpkg_contents (table_name, data_type, identifier, srs_id) VALUES (?1, 'features', ?1, ?2)",
        params![table, SRS_ID],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO gpkg_geometry_columns VALUES (?1, 'geom', ?2, ?3, 0, 0)",
        params![table, geometry_type, SRS_ID],
    )
    .unwrap();
}

fn insert_geometry(conn: &Connection, table: &str, blob: &[u8]) {
    conn.execute(
        &format!("INSERT INTO {} (geom) VALUES (?1)", quote_ident(table)),
        params![blob],
    )
    .unwrap();
}

pub fn add_point_layer(conn: &Connection, table: &str, points: &[(f64, f64)]) {
    add_layer(conn, table, "POINT");
    for (x, y) in points {
        insert_geometry(conn, table, &encode_point(SRS_ID, &WkbPoint::xy(*x, *y)));
    }
}

/// Point layer declared as MULTIPOINT, each feature holding one point.
pub fn add_multipoint_layer(conn: &Connection, table: &str, points: &[(f64, f64)]) {
    add_layer(conn, table, "MULTIPOINT");
    for (x, y) in points {
        insert_geometry(conn, table, &encode_multipoint(SRS_ID, &WkbPoint::xy(*x, *y)));
    }
}

/// Rectangles given as `(min_x, min_y, max_x, max_y)`.
pub fn add_rect_layer(conn: &Connection, table: &str, rects: &[(f64, f64, f64, f64)]) {
    add_layer(conn, table, "MULTIPOLYGON");
    for (min_x, min_y, max_x, max_y) in rects {
        insert_geometry(conn, table, &rect_blob(*min_x, *min_y, *max_x, *max_y));
    }
}

pub fn rect_blob(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Vec<u8> {
    let mut out = vec![b'G', b'P', 0, 0b0000_0011];
    out.extend_from_slice(&SRS_ID.to_le_bytes());
    for v in [min_x, max_x, min_y, max_y] {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out.push(1);
    out.extend_from_slice(&6u32.to_le_bytes());
    out.extend_from_slice(&1u32.to_le_bytes());
    out.push(1);
    out.extend_from_slice(&3u32.to_le_bytes());
    out.extend_from_slice(&1u32.to_le_bytes());
    out.extend_from_slice(&5u32.to_le_bytes());
    let ring = [
        (min_x, min_y),
        (max_x, min_y),
        (max_x, max_y),
        (min_x, max_y),
        (min_x, min_y),
    ];
    for (x, y) in ring {
        out.extend_from_slice(&x.to_le_bytes());
        out.extend_from_slice(&y.to_le_bytes());
    }
    out
}

/// R-tree table and the update trigger GDAL creates alongside it.
pub fn add_rtree(conn: &Connection, table: &str) {
    let rtree = format!("rtree_{table}_geom");
    conn.execute_batch(&format!(
        r#"
        CREATE VIRTUAL TABLE "{rtree}" USING rtree(id, minx, maxx, miny, maxy);
        INSERT INTO "{rtree}"
            SELECT fid, ST_MinX(geom), ST_MaxX(geom), ST_MinY(geom), ST_MaxY(geom)
            FROM "{table}" WHERE geom NOT NULL AND NOT ST_IsEmpty(geom);
        CREATE TRIGGER "{rtree}_update1" AFTER UPDATE OF geom ON "{table}"
        WHEN OLD.fid = NEW.fid AND (NEW.geom NOTNULL AND NOT ST_IsEmpty(NEW.geom))
        BEGIN
            INSERT OR REPLACE INTO "{rtree}" VALUES (
                NEW.fid,
                ST_MinX(NEW.geom), ST_MaxX(NEW.geom),
                ST_MinY(NEW.geom), ST_MaxY(NEW.geom)
            );
        END;
        "#
    ))
    .unwrap();
}
