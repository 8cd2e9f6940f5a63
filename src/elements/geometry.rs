/// A finished geometry with its EWKB-hex encoding, ready for the
/// destination inserter.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub geom: geo::Geometry<f64>,
    pub wkb: String,
}

impl Geometry {
    pub fn new(geom: geo::Geometry<f64>, wkb: String) -> Geometry {
        Geometry { geom, wkb }
    }
}
