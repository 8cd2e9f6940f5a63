use crate::error::{Error, Result};
use geo::{Coord, Geometry, LineString, MultiPolygon, Point, Polygon};

fn write_uint32(res: &mut Vec<u8>, i: u32) {
    res.push(((i >> 24) & 255) as u8);
    res.push(((i >> 16) & 255) as u8);
    res.push(((i >> 8) & 255) as u8);
    res.push((i & 255) as u8);
}

fn write_uint64(res: &mut Vec<u8>, i: u64) {
    res.push(((i >> 56) & 255) as u8);
    res.push(((i >> 48) & 255) as u8);
    res.push(((i >> 40) & 255) as u8);
    res.push(((i >> 32) & 255) as u8);
    res.push(((i >> 24) & 255) as u8);
    res.push(((i >> 16) & 255) as u8);
    res.push(((i >> 8) & 255) as u8);
    res.push((i & 255) as u8);
}

fn write_f64(res: &mut Vec<u8>, f: f64) {
    write_uint64(res, f.to_bits())
}

fn write_coord(res: &mut Vec<u8>, c: &Coord<f64>) {
    write_f64(res, c.x);
    write_f64(res, c.y);
}

fn write_coords(res: &mut Vec<u8>, coords: &[Coord<f64>]) {
    write_uint32(res, coords.len() as u32);
    for c in coords {
        write_coord(res, c);
    }
}

/// Byte-order marker (big endian), geometry type and, when an srid is
/// given, the extended-wkb srid flag and value.
fn prep_ewkb(srid: Option<u32>, ty: u32) -> Vec<u8> {
    let mut res = Vec::new();
    res.push(0);
    match srid {
        None => {
            write_uint32(&mut res, ty);
        }
        Some(s) => {
            write_uint32(&mut res, ty + (32 << 24));
            write_uint32(&mut res, s);
        }
    }
    res
}

pub trait AsEwkb {
    fn as_ewkb(&self, srid: Option<u32>) -> Vec<u8>;
}

impl AsEwkb for Point<f64> {
    fn as_ewkb(&self, srid: Option<u32>) -> Vec<u8> {
        let mut res = prep_ewkb(srid, 1);
        write_f64(&mut res, self.x());
        write_f64(&mut res, self.y());
        res
    }
}

impl AsEwkb for LineString<f64> {
    fn as_ewkb(&self, srid: Option<u32>) -> Vec<u8> {
        let mut res = prep_ewkb(srid, 2);
        write_coords(&mut res, &self.0);
        res
    }
}

impl AsEwkb for Polygon<f64> {
    fn as_ewkb(&self, srid: Option<u32>) -> Vec<u8> {
        let mut res = prep_ewkb(srid, 3);
        write_uint32(&mut res, 1 + self.interiors().len() as u32);
        write_coords(&mut res, &self.exterior().0);
        for ii in self.interiors() {
            write_coords(&mut res, &ii.0);
        }
        res
    }
}

impl AsEwkb for MultiPolygon<f64> {
    fn as_ewkb(&self, srid: Option<u32>) -> Vec<u8> {
        let mut res = prep_ewkb(srid, 6);
        write_uint32(&mut res, self.0.len() as u32);
        for p in self.iter() {
            res.extend(p.as_ewkb(None));
        }
        res
    }
}

const HEX_CHARS: &[u8; 16] = b"0123456789ABCDEF";

pub fn to_hex(data: &[u8]) -> String {
    let mut res = String::with_capacity(data.len() * 2);
    for b in data {
        res.push(HEX_CHARS[(b >> 4) as usize] as char);
        res.push(HEX_CHARS[(b & 15) as usize] as char);
    }
    res
}

pub fn as_ewkb_hex(geom: &Geometry<f64>, srid: Option<u32>) -> Result<String> {
    let data = match geom {
        Geometry::Point(p) => p.as_ewkb(srid),
        Geometry::LineString(l) => l.as_ewkb(srid),
        Geometry::Polygon(p) => p.as_ewkb(srid),
        Geometry::MultiPolygon(mp) => mp.as_ewkb(srid),
        _ => {
            return Err(Error::Wkb(format!("unsupported geometry type")));
        }
    };
    Ok(to_hex(&data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_ewkb_hex() {
        let p = Point::new(1.0, 2.0);
        let wkb = as_ewkb_hex(&Geometry::Point(p), Some(3857)).unwrap();

        assert_eq!(
            wkb,
            "002000000100000F113FF00000000000004000000000000000"
        );
    }

    #[test]
    fn test_point_wkb_no_srid() {
        let p = Point::new(1.0, 2.0);
        let wkb = as_ewkb_hex(&Geometry::Point(p), None).unwrap();

        assert_eq!(wkb, "00000000013FF00000000000004000000000000000");
    }

    #[test]
    fn test_polygon_ewkb() {
        let sq = LineString::new(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 1.0, y: 0.0 },
            Coord { x: 1.0, y: 1.0 },
            Coord { x: 0.0, y: 1.0 },
            Coord { x: 0.0, y: 0.0 },
        ]);
        let p = Polygon::new(sq, Vec::new());
        let data = p.as_ewkb(Some(4326));

        //marker + type|srid flag + srid + ring count + point count + 5 points
        assert_eq!(data.len(), 1 + 4 + 4 + 4 + 4 + 5 * 16);
        assert_eq!(&data[1..5], &[32, 0, 0, 3]);
        assert_eq!(&data[5..9], &[0, 0, 16, 230]);
    }

    #[test]
    fn test_multipolygon_single_part() {
        let sq = LineString::new(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 1.0, y: 0.0 },
            Coord { x: 1.0, y: 1.0 },
            Coord { x: 0.0, y: 1.0 },
            Coord { x: 0.0, y: 0.0 },
        ]);
        let mp = MultiPolygon::new(vec![Polygon::new(sq, Vec::new())]);
        let data = mp.as_ewkb(None);

        assert_eq!(&data[1..5], &[0, 0, 0, 6]);
        assert_eq!(&data[5..9], &[0, 0, 0, 1]);
    }
}
