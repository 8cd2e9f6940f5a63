use crate::elements::geometry::Geometry;
use crate::elements::tags::Tag;

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: i64,
    pub lon: f64,
    pub lat: f64,
    pub tags: Vec<Tag>,
    pub geom: Option<Geometry>,
}

impl Node {
    pub fn new(id: i64) -> Node {
        Node {
            id: id,
            lon: 0.0,
            lat: 0.0,
            tags: Vec::new(),
            geom: None,
        }
    }

    pub fn with_position(id: i64, lon: f64, lat: f64) -> Node {
        Node {
            id: id,
            lon: lon,
            lat: lat,
            tags: Vec::new(),
            geom: None,
        }
    }
}
