//! Well-known binary encoding of assembled areas
//!
//! Output is little-endian with ordinates as `f64` degrees, longitude first. Rings are
//! written with their closing coordinate repeated. The decoder accepts either byte order
//! and is mainly used to check encoded output.

use crate::area::{Area, Polygon};
use crate::ring::Ring;
use crate::{AreaError, Coordinate, Result};
use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Write};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const WKB_BIG_ENDIAN: u8 = 0;
const WKB_LITTLE_ENDIAN: u8 = 1;
const WKB_POLYGON: u32 = 3;
const WKB_MULTIPOLYGON: u32 = 6;

/// Bytes taken by one (lon, lat) pair
const POINT_SIZE: usize = 16;

/// Geometry type to emit
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum WkbVariant {
    /// `Polygon` for a single outer ring, `MultiPolygon` otherwise
    #[default]
    Auto,
    /// Always `MultiPolygon`, even for a single outer ring
    MultiPolygon,
}

/// Rings of one decoded polygon, outer ring first
pub type DecodedPolygon = Vec<Vec<Coordinate>>;

/// Encode an area as WKB
///
/// Fails with [`AreaError::EmptyArea`] if the area has no polygons.
pub fn encode(area: &Area, variant: WkbVariant) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(encoded_len(area, variant));
    write_area(&mut buf, area, variant)?;
    Ok(buf)
}

/// Encode an area as upper-case hex WKB
pub fn encode_hex(area: &Area, variant: WkbVariant) -> Result<String> {
    Ok(to_hex(&encode(area, variant)?))
}

/// Write an area as WKB to any writer
pub fn write_area<W: Write>(writer: &mut W, area: &Area, variant: WkbVariant) -> Result<()> {
    let polygons = area.polygons();
    match (polygons, variant) {
        ([], _) => Err(AreaError::EmptyArea { area: area.id() }),
        ([polygon], WkbVariant::Auto) => write_polygon(writer, polygon),
        _ => {
            writer.write_u8(WKB_LITTLE_ENDIAN)?;
            writer.write_u32::<LittleEndian>(WKB_MULTIPOLYGON)?;
            writer.write_u32::<LittleEndian>(count(polygons.len())?)?;
            for polygon in polygons {
                write_polygon(writer, polygon)?;
            }
            Ok(())
        }
    }
}

fn write_polygon<W: Write>(writer: &mut W, polygon: &Polygon) -> Result<()> {
    writer.write_u8(WKB_LITTLE_ENDIAN)?;
    writer.write_u32::<LittleEndian>(WKB_POLYGON)?;
    writer.write_u32::<LittleEndian>(count(1 + polygon.inners().len())?)?;
    for ring in polygon.rings() {
        write_ring(writer, ring)?;
    }
    Ok(())
}

fn write_ring<W: Write>(writer: &mut W, ring: &Ring) -> Result<()> {
    writer.write_u32::<LittleEndian>(count(ring.coords().len())?)?;
    for coord in ring.coords() {
        writer.write_f64::<LittleEndian>(coord.lon())?;
        writer.write_f64::<LittleEndian>(coord.lat())?;
    }
    Ok(())
}

fn count(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| AreaError::Wkb(format!("count {len} exceeds u32")))
}

fn encoded_len(area: &Area, variant: WkbVariant) -> usize {
    let polygons: usize = area
        .polygons()
        .iter()
        .map(|p| 9 + p.rings().map(|r| 4 + r.coords().len() * POINT_SIZE).sum::<usize>())
        .sum();
    match (area.polygons().len(), variant) {
        (1, WkbVariant::Auto) => polygons,
        _ => 9 + polygons,
    }
}

fn to_hex(bytes: &[u8]) -> String {
    const DIGITS: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        out.push(char::from(DIGITS[usize::from(b >> 4)]));
        out.push(char::from(DIGITS[usize::from(b & 0x0f)]));
    }
    out
}

/// Decode a WKB `Polygon` or `MultiPolygon`
///
/// Returns one entry per polygon. Fails on unknown geometry types, truncated input and
/// trailing bytes.
pub fn decode(bytes: &[u8]) -> Result<Vec<DecodedPolygon>> {
    let mut cursor = Cursor::new(bytes);
    let (order, kind) = read_header(&mut cursor)?;
    let polygons = match kind {
        WKB_POLYGON => vec![read_polygon_body(&mut cursor, order)?],
        WKB_MULTIPOLYGON => {
            let n = order.read_u32(&mut cursor)?;
            let mut polygons = Vec::new();
            for _ in 0..n {
                let (order, kind) = read_header(&mut cursor)?;
                if kind != WKB_POLYGON {
                    return Err(AreaError::Wkb(format!(
                        "expected polygon inside multipolygon, found type {kind}"
                    )));
                }
                polygons.push(read_polygon_body(&mut cursor, order)?);
            }
            polygons
        }
        other => return Err(AreaError::Wkb(format!("unsupported geometry type {other}"))),
    };

    let consumed = cursor.position() as usize;
    if consumed != bytes.len() {
        return Err(AreaError::Wkb(format!(
            "{} trailing bytes",
            bytes.len() - consumed
        )));
    }
    Ok(polygons)
}

/// Decode hex WKB, either case
pub fn decode_hex(hex: &str) -> Result<Vec<DecodedPolygon>> {
    decode(&from_hex(hex)?)
}

fn from_hex(hex: &str) -> Result<Vec<u8>> {
    let digits = hex.as_bytes();
    if digits.len() % 2 != 0 {
        return Err(AreaError::Wkb("odd number of hex digits".into()));
    }
    digits
        .chunks_exact(2)
        .map(|pair| Ok((hex_value(pair[0])? << 4) | hex_value(pair[1])?))
        .collect()
}

fn hex_value(digit: u8) -> Result<u8> {
    match digit {
        b'0'..=b'9' => Ok(digit - b'0'),
        b'a'..=b'f' => Ok(digit - b'a' + 10),
        b'A'..=b'F' => Ok(digit - b'A' + 10),
        _ => Err(AreaError::Wkb(format!(
            "invalid hex digit {:?}",
            char::from(digit)
        ))),
    }
}

#[derive(Clone, Copy)]
enum Endian {
    Big,
    Little,
}

impl Endian {
    fn read_u32<R: Read>(self, reader: &mut R) -> Result<u32> {
        let value = match self {
            Endian::Big => reader.read_u32::<BigEndian>(),
            Endian::Little => reader.read_u32::<LittleEndian>(),
        };
        value.map_err(truncated)
    }

    fn read_f64<R: Read>(self, reader: &mut R) -> Result<f64> {
        let value = match self {
            Endian::Big => reader.read_f64::<BigEndian>(),
            Endian::Little => reader.read_f64::<LittleEndian>(),
        };
        value.map_err(truncated)
    }
}

fn truncated(err: std::io::Error) -> AreaError {
    match err.kind() {
        std::io::ErrorKind::UnexpectedEof => AreaError::Wkb("unexpected end of input".into()),
        _ => AreaError::Io(err),
    }
}

fn read_header(cursor: &mut Cursor<&[u8]>) -> Result<(Endian, u32)> {
    let order = match cursor.read_u8().map_err(truncated)? {
        WKB_BIG_ENDIAN => Endian::Big,
        WKB_LITTLE_ENDIAN => Endian::Little,
        other => return Err(AreaError::Wkb(format!("invalid byte order marker {other}"))),
    };
    let kind = order.read_u32(cursor)?;
    Ok((order, kind))
}

fn remaining(cursor: &Cursor<&[u8]>) -> usize {
    cursor
        .get_ref()
        .len()
        .saturating_sub(cursor.position() as usize)
}

fn read_polygon_body(cursor: &mut Cursor<&[u8]>, order: Endian) -> Result<DecodedPolygon> {
    let ring_count = order.read_u32(cursor)? as usize;
    let mut rings = Vec::with_capacity(ring_count.min(remaining(cursor) / 4));
    for _ in 0..ring_count {
        let point_count = order.read_u32(cursor)? as usize;
        let mut ring = Vec::with_capacity(point_count.min(remaining(cursor) / POINT_SIZE));
        for _ in 0..point_count {
            let lon = order.read_f64(cursor)?;
            let lat = order.read_f64(cursor)?;
            ring.push(Coordinate::from_degrees(lon, lat)?);
        }
        rings.push(ring);
    }
    Ok(rings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AreaId, Role};

    fn ring(points: &[(i32, i32)]) -> Ring {
        let coords = points
            .iter()
            .map(|&(x, y)| Coordinate::from_raw(x, y))
            .collect();
        Ring::new(coords, vec![(1, Role::Outer)], false)
    }

    fn square(min: i32, max: i32) -> Ring {
        ring(&[(min, min), (max, min), (max, max), (min, max), (min, min)])
    }

    fn single() -> Area {
        Area::new(
            AreaId::from_way(1),
            vec![Polygon::new(square(0, 10_000_000), Vec::new())],
        )
    }

    fn multi() -> Area {
        Area::new(
            AreaId::from_relation(1),
            vec![
                Polygon::new(square(0, 100), vec![square(10, 20)]),
                Polygon::new(square(200, 300), Vec::new()),
            ],
        )
    }

    #[test]
    fn test_single_polygon_layout() {
        let bytes = encode(&single(), WkbVariant::Auto).unwrap();
        assert_eq!(bytes.len(), 1 + 4 + 4 + 4 + 5 * POINT_SIZE);
        assert_eq!(&bytes[..9], &[1, 3, 0, 0, 0, 1, 0, 0, 0]);
        assert_eq!(&bytes[9..13], &[5, 0, 0, 0]);
        // Third vertex is (1.0, 1.0)
        let offset = 13 + 2 * POINT_SIZE;
        assert_eq!(&bytes[offset..offset + 8], &1.0f64.to_le_bytes());
    }

    #[test]
    fn test_hex_prefixes() {
        let auto = encode_hex(&single(), WkbVariant::Auto).unwrap();
        assert!(auto.starts_with("0103000000"), "hex: {auto}");

        let forced = encode_hex(&single(), WkbVariant::MultiPolygon).unwrap();
        assert!(forced.starts_with("0106000000010000000103000000"), "hex: {forced}");

        let multi = encode_hex(&multi(), WkbVariant::Auto).unwrap();
        assert!(multi.starts_with("010600000002000000"), "hex: {multi}");
        assert_eq!(multi, multi.to_uppercase());
    }

    #[test]
    fn test_encoded_len_matches() {
        for area in [single(), multi()] {
            for variant in [WkbVariant::Auto, WkbVariant::MultiPolygon] {
                let bytes = encode(&area, variant).unwrap();
                assert_eq!(bytes.len(), encoded_len(&area, variant));
            }
        }
    }

    #[test]
    fn test_decode_multipolygon() {
        let area = multi();
        let decoded = decode(&encode(&area, WkbVariant::Auto).unwrap()).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].len(), 2);
        assert_eq!(decoded[0][1], area.polygons()[0].inners()[0].coords());
        assert_eq!(decoded[1][0], area.polygons()[1].outer().coords());
    }

    #[test]
    fn test_decode_hex_lowercase() {
        let hex = encode_hex(&single(), WkbVariant::Auto).unwrap().to_lowercase();
        let decoded = decode_hex(&hex).unwrap();
        assert_eq!(decoded[0][0], single().polygons()[0].outer().coords());
    }

    #[test]
    fn test_decode_big_endian() {
        let mut bytes = vec![WKB_BIG_ENDIAN];
        bytes.write_u32::<BigEndian>(WKB_POLYGON).unwrap();
        bytes.write_u32::<BigEndian>(1).unwrap();
        bytes.write_u32::<BigEndian>(4).unwrap();
        for (lon, lat) in [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (0.0, 0.0)] {
            bytes.write_f64::<BigEndian>(lon).unwrap();
            bytes.write_f64::<BigEndian>(lat).unwrap();
        }

        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded[0][0][1], Coordinate::from_raw(10_000_000, 0));
    }

    #[test]
    fn test_decode_rejects_malformed_input() {
        let bytes = encode(&single(), WkbVariant::Auto).unwrap();

        assert!(matches!(decode(&bytes[..20]), Err(AreaError::Wkb(_))));

        let mut trailing = bytes.clone();
        trailing.push(0);
        assert!(matches!(decode(&trailing), Err(AreaError::Wkb(_))));

        let mut point = bytes;
        point[1] = 1;
        assert!(matches!(decode(&point), Err(AreaError::Wkb(_))));

        assert!(decode_hex("01030").is_err());
        assert!(decode_hex("zz").is_err());
    }

    #[test]
    fn test_empty_area_is_an_error() {
        let empty = Area::new(AreaId::from_way(7), Vec::new());
        assert!(matches!(
            encode(&empty, WkbVariant::Auto),
            Err(AreaError::EmptyArea { .. })
        ));
    }
}
