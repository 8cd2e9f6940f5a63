use crate::elements::geometry::Geometry;
use crate::elements::tags::Tag;
use geo::Coord;

#[derive(Debug, Clone, PartialEq)]
pub struct Way {
    pub id: i64,
    pub tags: Vec<Tag>,
    pub refs: Vec<i64>,
    pub lonlats: Vec<Coord<f64>>,
    pub geom: Option<Geometry>,
}

impl Way {
    pub fn new(id: i64) -> Way {
        Way {
            id: id,
            tags: Vec::new(),
            refs: Vec::new(),
            lonlats: Vec::new(),
            geom: None,
        }
    }

    /// A way is closed iff it has at least four node references and the
    /// first and last coincide.
    pub fn is_closed(&self) -> bool {
        self.refs.len() >= 4 && self.refs[0] == self.refs[self.refs.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_closed() {
        let mut w = Way::new(1);
        w.refs = vec![1, 2, 3, 1];
        assert!(w.is_closed());

        w.refs = vec![1, 2, 1];
        assert!(!w.is_closed());

        w.refs = vec![1, 2, 3, 4];
        assert!(!w.is_closed());
    }
}
