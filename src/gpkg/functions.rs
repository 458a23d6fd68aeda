//! Scalar SQL functions that GeoPackage R-tree and geometry-type triggers call.
//!
//! GDAL installs triggers such as `rtree_<table>_<column>_update1` which use
//! `ST_IsEmpty` and `ST_MinX`..`ST_MaxY`. Plain SQLite has none of them, so any
//! geometry update on such a file fails unless they are registered.

use rusqlite::functions::{Context, FunctionFlags};
use rusqlite::types::ValueRef;
use rusqlite::Connection;

use super::blob::{self, Envelope, Header};
use super::error::GeometryError;

fn flags() -> FunctionFlags {
    FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC
}

fn user_error(err: GeometryError) -> rusqlite::Error {
    rusqlite::Error::UserFunctionError(Box::new(err))
}

fn blob_arg<'a>(ctx: &'a Context<'_>) -> Option<&'a [u8]> {
    match ctx.get_raw(0) {
        ValueRef::Blob(b) => Some(b),
        _ => None,
    }
}

fn envelope_value(ctx: &Context<'_>, pick: fn(&Envelope) -> f64) -> rusqlite::Result<Option<f64>> {
    let Some(b) = blob_arg(ctx) else {
        return Ok(None);
    };
    let env = blob::envelope(b).map_err(user_error)?;
    Ok(env.as_ref().map(pick))
}

pub fn register(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function("ST_IsEmpty", 1, flags(), |ctx| {
        let Some(b) = blob_arg(ctx) else {
            return Ok(None::<i64>);
        };
        let header = Header::parse(b).map_err(user_error)?;
        if header.empty {
            return Ok(Some(1));
        }
        let decoded = blob::decode(b).map_err(user_error)?;
        let empty = decoded.geometry.map_or(true, |g| g.is_empty());
        Ok(Some(empty as i64))
    })?;

    conn.create_scalar_function("ST_MinX", 1, flags(), |ctx| {
        envelope_value(ctx, |e| e.min_x)
    })?;
    conn.create_scalar_function("ST_MaxX", 1, flags(), |ctx| {
        envelope_value(ctx, |e| e.max_x)
    })?;
    conn.create_scalar_function("ST_MinY", 1, flags(), |ctx| {
        envelope_value(ctx, |e| e.min_y)
    })?;
    conn.create_scalar_function("ST_MaxY", 1, flags(), |ctx| {
        envelope_value(ctx, |e| e.max_y)
    })?;

    conn.create_scalar_function("ST_SRID", 1, flags(), |ctx| {
        let Some(b) = blob_arg(ctx) else {
            return Ok(None::<i64>);
        };
        let header = Header::parse(b).map_err(user_error)?;
        Ok(Some(header.srs_id as i64))
    })?;

    conn.create_scalar_function("ST_GeometryType", 1, flags(), |ctx| {
        let Some(b) = blob_arg(ctx) else {
            return Ok(None::<String>);
        };
        let decoded = blob::decode(b).map_err(user_error)?;
        Ok(decoded.geometry.map(|g| g.type_name().to_string()))
    })?;

    conn.create_scalar_function("GPKG_IsAssignable", 2, flags(), |ctx| {
        let expected: String = ctx.get(0)?;
        let actual: String = ctx.get(1)?;
        Ok(is_assignable(&expected, &actual) as i64)
    })?;

    Ok(())
}

fn is_assignable(expected: &str, actual: &str) -> bool {
    let expected = expected.to_ascii_uppercase();
    let actual = actual.to_ascii_uppercase();
    if expected == actual || expected == "GEOMETRY" {
        return true;
    }
    matches!(
        (expected.as_str(), actual.as_str()),
        ("SURFACE", "POLYGON")
            | ("CURVE", "LINESTRING")
            | ("MULTISURFACE", "MULTIPOLYGON")
            | ("MULTICURVE", "MULTILINESTRING")
            | ("GEOMETRYCOLLECTION", "MULTIPOINT")
            | ("GEOMETRYCOLLECTION", "MULTILINESTRING")
            | ("GEOMETRYCOLLECTION", "MULTIPOLYGON")
    )
}
