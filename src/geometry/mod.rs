mod multipolygon;
mod position;
mod ring;
mod simple;
mod wkb;

pub use multipolygon::{build_rel_geometry, build_rings, prepare_relation, PreparedRelation};
pub use position::{
    calc_ring_area, coords_to_srid, forward, line_intersects, node_to_srid, point_in_poly,
    polygon_contains, pythag, ring_self_intersects, segment_intersects, EARTH_WIDTH,
};
pub use ring::{merge_rings, Ring};
pub use simple::{line_string_geometry, point_geometry, polygon_geometry};
pub use wkb::{as_ewkb_hex, to_hex, AsEwkb};
