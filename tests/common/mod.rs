use rusqlite::{params, Connection};
use std::path::Path;
use std::process::Command;

pub const SRS_ID: i32 = 3857;

pub fn base_cmd() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_move-point"));
    cmd.env("DOTENV_PATH", "/nonexistent/.env")
        .env_remove("MOVE_POINT_POINTS")
        .env_remove("MOVE_POINT_RECTS")
        .env_remove("MOVE_POINT_LOG_FILE")
        .env_remove("RUST_LOG");
    cmd
}

fn create_gpkg(path: &Path) -> Connection {
    let conn = Connection::open(path).expect("open gpkg");
    conn.execute_batch(
        r#"
        PRAGMA application_id = 1196444487;
        CREATE TABLE gpkg_contents (
            table_name TEXT NOT NULL PRIMARY KEY,
            data_type TEXT NOT NULL,
            identifier TEXT UNIQUE,
            description TEXT DEFAULT '',
            last_change DATETIME NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
            min_x DOUBLE, min_y DOUBLE, max_x DOUBLE, max_y DOUBLE,
            srs_id INTEGER
        );
        CREATE TABLE gpkg_geometry_columns (
            table_name TEXT NOT NULL,
            column_name TEXT NOT NULL,
            geometry_type_name TEXT NOT NULL,
            srs_id INTEGER NOT NULL,
            z TINYINT NOT NULL,
            m TINYINT NOT NULL,
            PRIMARY KEY (table_name, column_name)
        );
        "#,
    )
    .expect("gpkg schema");
    conn
}

fn add_layer(conn: &Connection, table: &str, geometry_type: &str, blobs: Vec<Vec<u8>>) {
    conn.execute_batch(&format!(
        "CREATE TABLE \"{table}\" (fid INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL, geom {geometry_type});"
    ))
    .expect("feature table");
    conn.execute(
        "INSERT INTO gpkg_contents (table_name, data_type, identifier, srs_id) VALUES (?1, 'features', ?1, ?2)",
        params![table, SRS_ID],
    )
    .expect("gpkg_contents row");
    conn.execute(
        "INSERT INTO gpkg_geometry_columns VALUES (?1, 'geom', ?2, ?3, 0, 0)",
        params![table, geometry_type, SRS_ID],
    )
    .expect("gpkg_geometry_columns row");
    for blob in blobs {
        conn.execute(
            &format!("INSERT INTO \"{table}\" (geom) VALUES (?1)"),
            params![blob],
        )
        .expect("insert feature");
    }
}

fn header(flags: u8) -> Vec<u8> {
    let mut out = vec![b'G', b'P', 0, flags];
    out.extend_from_slice(&SRS_ID.to_le_bytes());
    out
}

pub fn point_blob(x: f64, y: f64) -> Vec<u8> {
    let mut out = header(0b0000_0001);
    out.push(1);
    out.extend_from_slice(&1u32.to_le_bytes());
    out.extend_from_slice(&x.to_le_bytes());
    out.extend_from_slice(&y.to_le_bytes());
    out
}

/// Single-ring polygon blob, the way most GIS tools store a rectangle.
pub fn rect_blob(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Vec<u8> {
    let mut out = header(0b0000_0011);
    for v in [min_x, max_x, min_y, max_y] {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out.push(1);
    out.extend_from_slice(&3u32.to_le_bytes());
    out.extend_from_slice(&1u32.to_le_bytes());
    out.extend_from_slice(&5u32.to_le_bytes());
    for (x, y) in [
        (min_x, min_y),
        (max_x, min_y),
        (max_x, max_y),
        (min_x, max_y),
        (min_x, min_y),
    ] {
        out.extend_from_slice(&x.to_le_bytes());
        out.extend_from_slice(&y.to_le_bytes());
    }
    out
}

pub fn write_points(path: &Path, points: &[(f64, f64)]) {
    let conn = create_gpkg(path);
    let blobs = points.iter().map(|(x, y)| point_blob(*x, *y)).collect();
    add_layer(&conn, "points", "POINT", blobs);
}

pub fn write_rects(path: &Path, rects: &[(f64, f64, f64, f64)]) {
    let conn = create_gpkg(path);
    let blobs = rects
        .iter()
        .map(|(a, b, c, d)| rect_blob(*a, *b, *c, *d))
        .collect();
    add_layer(&conn, "rectangles", "POLYGON", blobs);
}

/// Point coordinates in fid order, read straight from the blob bytes.
pub fn read_points(path: &Path) -> Vec<(f64, f64)> {
    let conn = Connection::open(path).expect("open gpkg");
    let mut stmt = conn
        .prepare("SELECT geom FROM points ORDER BY fid")
        .expect("prepare");
    stmt.query_map([], |row| row.get::<_, Vec<u8>>(0))
        .expect("query")
        .map(|blob| {
            let blob = blob.expect("row");
            let f = |at: usize| f64::from_le_bytes(blob[at..at + 8].try_into().unwrap());
            (f(13), f(21))
        })
        .collect()
}
