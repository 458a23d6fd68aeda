use geo::{BoundingRect, Coord, LineString, MultiPolygon, Point, Polygon};

use super::error::GeometryError;

pub const GPKG_MAGIC: [u8; 2] = *b"GP";

const HEADER_LEN: usize = 8;
const FLAG_LITTLE_ENDIAN: u8 = 0b0000_0001;
const FLAG_EMPTY: u8 = 0b0001_0000;
const FLAG_EXTENDED: u8 = 0b0010_0000;
const ENVELOPE_SHIFT: u8 = 1;
const ENVELOPE_MASK: u8 = 0b0000_0111;

const WKB_POINT: u32 = 1;
const WKB_POLYGON: u32 = 3;
const WKB_MULTIPOINT: u32 = 4;
const WKB_MULTIPOLYGON: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Xy,
    Xyz,
    Xym,
    Xyzm,
}

impl Dimension {
    fn from_wkb_code(code: u32) -> Option<Self> {
        match code / 1000 {
            0 => Some(Dimension::Xy),
            1 => Some(Dimension::Xyz),
            2 => Some(Dimension::Xym),
            3 => Some(Dimension::Xyzm),
            _ => None,
        }
    }

    fn wkb_offset(self) -> u32 {
        match self {
            Dimension::Xy => 0,
            Dimension::Xyz => 1000,
            Dimension::Xym => 2000,
            Dimension::Xyzm => 3000,
        }
    }

    fn has_z(self) -> bool {
        matches!(self, Dimension::Xyz | Dimension::Xyzm)
    }

    fn has_m(self) -> bool {
        matches!(self, Dimension::Xym | Dimension::Xyzm)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Envelope {
    pub fn of_point(x: f64, y: f64) -> Self {
        Self {
            min_x: x,
            max_x: x,
            min_y: y,
            max_y: y,
        }
    }

    pub fn expand(self, other: Envelope) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            max_x: self.max_x.max(other.max_x),
            min_y: self.min_y.min(other.min_y),
            max_y: self.max_y.max(other.max_y),
        }
    }
}

/// A WKB point with its optional Z and M ordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WkbPoint {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
    pub m: Option<f64>,
}

impl WkbPoint {
    #[cfg(test)]
    pub fn xy(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            z: None,
            m: None,
        }
    }

    pub fn point(&self) -> Point<f64> {
        Point::new(self.x, self.y)
    }

    /// Same Z and M, new planar position.
    pub fn with_xy(&self, x: f64, y: f64) -> Self {
        Self { x, y, ..*self }
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_nan() && self.y.is_nan()
    }

    fn dimension(&self) -> Dimension {
        match (self.z.is_some(), self.m.is_some()) {
            (false, false) => Dimension::Xy,
            (true, false) => Dimension::Xyz,
            (false, true) => Dimension::Xym,
            (true, true) => Dimension::Xyzm,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(WkbPoint),
    MultiPoint(Vec<WkbPoint>),
    Polygon(Polygon<f64>),
    MultiPolygon(MultiPolygon<f64>),
}

impl Geometry {
    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "POINT",
            Geometry::MultiPoint(_) => "MULTIPOINT",
            Geometry::Polygon(_) => "POLYGON",
            Geometry::MultiPolygon(_) => "MULTIPOLYGON",
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Geometry::Point(p) => p.is_empty(),
            Geometry::MultiPoint(ps) => ps.iter().all(WkbPoint::is_empty),
            Geometry::Polygon(p) => p.exterior().0.is_empty(),
            Geometry::MultiPolygon(mp) => mp.0.iter().all(|p| p.exterior().0.is_empty()),
        }
    }

    pub fn envelope(&self) -> Option<Envelope> {
        let rect = match self {
            Geometry::Point(p) if !p.is_empty() => return Some(Envelope::of_point(p.x, p.y)),
            Geometry::Point(_) => return None,
            Geometry::MultiPoint(ps) => {
                return ps
                    .iter()
                    .filter(|p| !p.is_empty())
                    .map(|p| Envelope::of_point(p.x, p.y))
                    .reduce(Envelope::expand)
            }
            Geometry::Polygon(p) => p.bounding_rect()?,
            Geometry::MultiPolygon(mp) => mp.bounding_rect()?,
        };
        Some(Envelope {
            min_x: rect.min().x,
            max_x: rect.max().x,
            min_y: rect.min().y,
            max_y: rect.max().y,
        })
    }
}

/// The fixed part of a GeoPackage binary geometry plus its optional envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub srs_id: i32,
    pub empty: bool,
    pub extended: bool,
    pub envelope: Option<Envelope>,
    wkb_offset: usize,
}

impl Header {
    pub fn parse(blob: &[u8]) -> Result<Self, GeometryError> {
        let mut r = Reader::new(blob);
        let magic = r.take(2)?;
        if magic != GPKG_MAGIC {
            return Err(GeometryError::BadMagic(magic[0], magic[1]));
        }
        let version = r.u8()?;
        if version != 0 {
            return Err(GeometryError::UnsupportedVersion(version));
        }
        let flags = r.u8()?;
        let le = flags & FLAG_LITTLE_ENDIAN != 0;
        let srs_id = r.i32(le)?;

        let indicator = (flags >> ENVELOPE_SHIFT) & ENVELOPE_MASK;
        let doubles = match indicator {
            0 => 0,
            1 => 4,
            2 | 3 => 6,
            4 => 8,
            other => return Err(GeometryError::InvalidEnvelope(other)),
        };
        let envelope = if doubles == 0 {
            None
        } else {
            let min_x = r.f64(le)?;
            let max_x = r.f64(le)?;
            let min_y = r.f64(le)?;
            let max_y = r.f64(le)?;
            r.take((doubles - 4) * 8)?;
            Some(Envelope {
                min_x,
                max_x,
                min_y,
                max_y,
            })
        };

        Ok(Self {
            srs_id,
            empty: flags & FLAG_EMPTY != 0,
            extended: flags & FLAG_EXTENDED != 0,
            envelope,
            wkb_offset: r.pos,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GpkgGeometry {
    pub header: Header,
    /// `None` when the header flags the geometry as empty.
    pub geometry: Option<Geometry>,
}

pub fn decode(blob: &[u8]) -> Result<GpkgGeometry, GeometryError> {
    let header = Header::parse(blob)?;
    if header.extended {
        return Err(GeometryError::ExtendedGeometry);
    }
    if header.empty {
        return Ok(GpkgGeometry {
            header,
            geometry: None,
        });
    }
    let mut r = Reader::new(blob);
    r.pos = header.wkb_offset;
    let geometry = read_wkb(&mut r)?;
    Ok(GpkgGeometry {
        header,
        geometry: Some(geometry),
    })
}

/// Envelope from the header when present, otherwise computed from the body.
pub fn envelope(blob: &[u8]) -> Result<Option<Envelope>, GeometryError> {
    let header = Header::parse(blob)?;
    if header.empty {
        return Ok(None);
    }
    if let Some(env) = header.envelope {
        return Ok(Some(env));
    }
    Ok(decode(blob)?.geometry.and_then(|g| g.envelope()))
}

/// How a point feature is stored: a bare point or a multipoint holding one point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointShape {
    #[default]
    Single,
    Multi,
}

fn write_header(out: &mut Vec<u8>, srs_id: i32) {
    out.extend_from_slice(&GPKG_MAGIC);
    out.push(0);
    out.push(FLAG_LITTLE_ENDIAN);
    out.extend_from_slice(&srs_id.to_le_bytes());
}

fn write_point_wkb(out: &mut Vec<u8>, point: &WkbPoint) {
    out.push(1);
    out.extend_from_slice(&(WKB_POINT + point.dimension().wkb_offset()).to_le_bytes());
    out.extend_from_slice(&point.x.to_le_bytes());
    out.extend_from_slice(&point.y.to_le_bytes());
    if let Some(z) = point.z {
        out.extend_from_slice(&z.to_le_bytes());
    }
    if let Some(m) = point.m {
        out.extend_from_slice(&m.to_le_bytes());
    }
}

/// Little-endian point blob without envelope, the layout GDAL writes for points.
pub fn encode_point(srs_id: i32, point: &WkbPoint) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + 5 + 4 * 8);
    write_header(&mut out, srs_id);
    write_point_wkb(&mut out, point);
    out
}

/// Little-endian multipoint blob holding exactly `point`.
pub fn encode_multipoint(srs_id: i32, point: &WkbPoint) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + 9 + 5 + 4 * 8);
    write_header(&mut out, srs_id);
    out.push(1);
    out.extend_from_slice(&(WKB_MULTIPOINT + point.dimension().wkb_offset()).to_le_bytes());
    out.extend_from_slice(&1u32.to_le_bytes());
    write_point_wkb(&mut out, point);
    out
}

pub fn encode(srs_id: i32, point: &WkbPoint, shape: PointShape) -> Vec<u8> {
    match shape {
        PointShape::Single => encode_point(srs_id, point),
        PointShape::Multi => encode_multipoint(srs_id, point),
    }
}

fn read_wkb(r: &mut Reader<'_>) -> Result<Geometry, GeometryError> {
    let le = match r.u8()? {
        0 => false,
        1 => true,
        other => return Err(GeometryError::InvalidByteOrder(other)),
    };
    let code = r.u32(le)?;
    let dim = Dimension::from_wkb_code(code).ok_or(GeometryError::UnsupportedType(code))?;

    match code % 1000 {
        WKB_POINT => Ok(Geometry::Point(read_point(r, le, dim)?)),
        WKB_POLYGON => Ok(Geometry::Polygon(read_polygon(r, le, dim)?)),
        WKB_MULTIPOINT => {
            let n = r.count(le)?;
            let mut points = Vec::with_capacity(n);
            for _ in 0..n {
                match read_wkb(r)? {
                    Geometry::Point(p) => points.push(p),
                    other => {
                        return Err(GeometryError::UnexpectedMember {
                            container: "MULTIPOINT",
                            found: other.type_name(),
                        })
                    }
                }
            }
            Ok(Geometry::MultiPoint(points))
        }
        WKB_MULTIPOLYGON => {
            let n = r.count(le)?;
            let mut polygons = Vec::with_capacity(n);
            for _ in 0..n {
                match read_wkb(r)? {
                    Geometry::Polygon(p) => polygons.push(p),
                    other => {
                        return Err(GeometryError::UnexpectedMember {
                            container: "MULTIPOLYGON",
                            found: other.type_name(),
                        })
                    }
                }
            }
            Ok(Geometry::MultiPolygon(MultiPolygon::new(polygons)))
        }
        _ => Err(GeometryError::UnsupportedType(code)),
    }
}

fn read_point(r: &mut Reader<'_>, le: bool, dim: Dimension) -> Result<WkbPoint, GeometryError> {
    let x = r.f64(le)?;
    let y = r.f64(le)?;
    let z = if dim.has_z() { Some(r.f64(le)?) } else { None };
    let m = if dim.has_m() { Some(r.f64(le)?) } else { None };
    Ok(WkbPoint { x, y, z, m })
}

fn read_ring(r: &mut Reader<'_>, le: bool, dim: Dimension) -> Result<LineString<f64>, GeometryError> {
    let n = r.count(le)?;
    let mut coords = Vec::with_capacity(n);
    for _ in 0..n {
        let p = read_point(r, le, dim)?;
        coords.push(Coord { x: p.x, y: p.y });
    }
    Ok(LineString::new(coords))
}

fn read_polygon(r: &mut Reader<'_>, le: bool, dim: Dimension) -> Result<Polygon<f64>, GeometryError> {
    let rings = r.count(le)?;
    if rings == 0 {
        return Ok(Polygon::new(LineString::new(Vec::new()), Vec::new()));
    }
    let exterior = read_ring(r, le, dim)?;
    let mut interiors = Vec::with_capacity(rings - 1);
    for _ in 1..rings {
        interiors.push(read_ring(r, le, dim)?);
    }
    Ok(Polygon::new(exterior, interiors))
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], GeometryError> {
        let end = self.pos.checked_add(n).filter(|end| *end <= self.buf.len());
        match end {
            Some(end) => {
                let out = &self.buf[self.pos..end];
                self.pos = end;
                Ok(out)
            }
            None => Err(GeometryError::Truncated {
                needed: self.pos.saturating_add(n),
                actual: self.buf.len(),
            }),
        }
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], GeometryError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, GeometryError> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self, le: bool) -> Result<u32, GeometryError> {
        let b = self.array::<4>()?;
        Ok(if le { u32::from_le_bytes(b) } else { u32::from_be_bytes(b) })
    }

    fn i32(&mut self, le: bool) -> Result<i32, GeometryError> {
        let b = self.array::<4>()?;
        Ok(if le { i32::from_le_bytes(b) } else { i32::from_be_bytes(b) })
    }

    fn f64(&mut self, le: bool) -> Result<f64, GeometryError> {
        let b = self.array::<8>()?;
        Ok(if le { f64::from_le_bytes(b) } else { f64::from_be_bytes(b) })
    }

    /// Element count, bounded by what the remaining bytes could hold.
    fn count(&mut self, le: bool) -> Result<usize, GeometryError> {
        let n = self.u32(le)? as usize;
        let remaining = self.buf.len() - self.pos;
        if n > remaining {
            return Err(GeometryError::Truncated {
                needed: self.pos + n,
                actual: self.buf.len(),
            });
        }
        Ok(n)
    }
}
