use crate::elements::{Geometry, Node, Way};
use crate::error::{Error, Result};
use crate::geometry::position::calc_ring_area;
use crate::geometry::wkb::as_ewkb_hex;
use geo::{LineString, Point, Polygon};

pub fn point_geometry(node: &Node, srid: u32) -> Result<Geometry> {
    let geom = geo::Geometry::Point(Point::new(node.lon, node.lat));
    let wkb = as_ewkb_hex(&geom, Some(srid))?;
    Ok(Geometry::new(geom, wkb))
}

pub fn line_string_geometry(way: &Way, srid: u32) -> Result<Geometry> {
    if way.lonlats.len() < 2 {
        return Err(Error::Degenerate(format!(
            "way {} has fewer than two located nodes",
            way.id
        )));
    }
    let geom = geo::Geometry::LineString(LineString::new(way.lonlats.clone()));
    let wkb = as_ewkb_hex(&geom, Some(srid))?;
    Ok(Geometry::new(geom, wkb))
}

pub fn polygon_geometry(way: &Way, srid: u32) -> Result<Geometry> {
    if !way.is_closed() || way.lonlats.len() < 4 {
        return Err(Error::Degenerate(format!("way {} is not a ring", way.id)));
    }
    let mut coords = way.lonlats.clone();
    if calc_ring_area(&coords) < 0.0 {
        coords.reverse();
    }
    let geom = geo::Geometry::Polygon(Polygon::new(LineString::new(coords), Vec::new()));
    let wkb = as_ewkb_hex(&geom, Some(srid))?;
    Ok(Geometry::new(geom, wkb))
}
