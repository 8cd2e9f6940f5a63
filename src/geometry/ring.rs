use crate::elements::{Tag, Way};
use crate::error::{Error, Result};
use crate::geometry::position::{calc_ring_area, pythag};
use geo::{Coord, LineString, Polygon};
use std::collections::{BTreeMap, BTreeSet};

/// One linear component of a relation geometry: the node sequence of
/// one or more fused ways. `contained_by` and `holes` are indices into
/// the builder's rings vector, assigned during classification.
#[derive(Debug)]
pub struct Ring {
    pub refs: Vec<i64>,
    pub lonlats: Vec<Coord<f64>>,
    pub ways: Vec<i64>,
    pub area: f64,
    pub geom: Option<Polygon<f64>>,
    pub contained_by: Option<usize>,
    pub holes: BTreeSet<usize>,
    pub inserted: BTreeMap<i64, Vec<Tag>>,
}

impl Ring {
    pub fn new(way: &Way) -> Ring {
        Ring {
            refs: way.refs.clone(),
            lonlats: way.lonlats.clone(),
            ways: vec![way.id],
            area: 0.0,
            geom: None,
            contained_by: None,
            holes: BTreeSet::new(),
            inserted: BTreeMap::new(),
        }
    }

    pub fn first_last(&self) -> (i64, i64) {
        (self.refs[0], self.refs[self.refs.len() - 1])
    }

    /// Endpoints coincide; a self-touching fragment counts, whatever
    /// its length.
    pub fn endpoints_coincide(&self) -> bool {
        if self.refs.is_empty() {
            return false;
        }
        let (f, t) = self.first_last();
        f == t
    }

    pub fn is_closed(&self) -> bool {
        self.refs.len() >= 4 && self.endpoints_coincide()
    }

    /// Bridges the endpoint gap by repeating the first node, if the gap
    /// is small enough.
    pub fn try_close(&mut self, max_gap: f64) -> bool {
        let n = self.lonlats.len();
        if n < 3 {
            return false;
        }
        if pythag(&self.lonlats[0], &self.lonlats[n - 1]) <= max_gap {
            self.refs.push(self.refs[0]);
            let p = self.lonlats[0];
            self.lonlats.push(p);
            return true;
        }
        false
    }

    pub fn reverse(&mut self) {
        self.refs.reverse();
        self.lonlats.reverse();
        self.area *= -1.0;
    }

    /// Appends another ring whose first node equals this ring's last,
    /// dropping the shared node.
    fn join(&mut self, other: Ring) {
        self.refs.extend_from_slice(&other.refs[1..]);
        self.lonlats.extend_from_slice(&other.lonlats[1..]);
        self.ways.extend(other.ways);
    }

    /// Builds the ring polygon, normalising the exterior to
    /// anti-clockwise, and records its area.
    pub fn polygonize(&mut self) -> Result<()> {
        if !self.is_closed() {
            return Err(Error::NoRing);
        }
        let a = calc_ring_area(&self.lonlats);
        if a < 0.0 {
            self.reverse();
        }
        self.area = a.abs();
        self.geom = Some(Polygon::new(LineString::new(self.lonlats.clone()), Vec::new()));
        Ok(())
    }

    pub fn min_way_id(&self) -> i64 {
        match self.ways.iter().min() {
            Some(w) => *w,
            None => i64::MAX,
        }
    }

    /// Records every contributing way as consumed, carrying the
    /// relation's tags.
    pub fn mark_inserted(&mut self, tags: &[Tag]) {
        for w in &self.ways {
            self.inserted.insert(*w, tags.to_vec());
        }
    }
}

fn merge_step(rings: &mut Vec<Ring>) -> bool {
    if rings.len() < 2 {
        return false;
    }
    for i in 0..rings.len() - 1 {
        if rings[i].refs.is_empty() || rings[i].endpoints_coincide() {
            continue;
        }
        let (f, t) = rings[i].first_last();
        for j in i + 1..rings.len() {
            if rings[j].refs.is_empty() || rings[j].endpoints_coincide() {
                continue;
            }
            let (g, u) = rings[j].first_last();

            if t == g {
                let zz = rings.remove(j);
                rings[i].join(zz);
                return true;
            } else if t == u {
                let mut zz = rings.remove(j);
                zz.reverse();
                rings[i].join(zz);
                return true;
            } else if f == u {
                let zz = rings.remove(j);
                let me = std::mem::replace(&mut rings[i], zz);
                rings[i].join(me);
                return true;
            } else if f == g {
                let mut zz = rings.remove(j);
                zz.reverse();
                let me = std::mem::replace(&mut rings[i], zz);
                rings[i].join(me);
                return true;
            }
        }
    }
    false
}

/// Fuses open rings head-to-tail until no two remaining rings share an
/// endpoint. The first fusable pair in list order wins each round.
pub fn merge_rings(mut rings: Vec<Ring>) -> Vec<Ring> {
    while merge_step(&mut rings) {}
    rings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn way(id: i64, refs: Vec<i64>, lonlats: Vec<(f64, f64)>) -> Way {
        let mut w = Way::new(id);
        w.refs = refs;
        w.lonlats = lonlats.iter().map(|(x, y)| Coord { x: *x, y: *y }).collect();
        w
    }

    #[test]
    fn test_merge_two_fragments() {
        let a = Ring::new(&way(
            1,
            vec![1, 2, 3],
            vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)],
        ));
        let b = Ring::new(&way(2, vec![3, 4, 1], vec![(1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]));

        let merged = merge_rings(vec![a, b]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].refs, vec![1, 2, 3, 4, 1]);
        assert!(merged[0].is_closed());
        assert_eq!(merged[0].ways, vec![1, 2]);
    }

    #[test]
    fn test_merge_reversed_fragment() {
        //second fragment runs 1 -> 4 -> 3: same endpoints, opposite sense
        let a = Ring::new(&way(
            1,
            vec![1, 2, 3],
            vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)],
        ));
        let b = Ring::new(&way(2, vec![1, 4, 3], vec![(0.0, 0.0), (0.0, 1.0), (1.0, 1.0)]));

        let merged = merge_rings(vec![a, b]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].refs, vec![1, 2, 3, 4, 1]);
        assert!(merged[0].is_closed());
    }

    #[test]
    fn test_merge_start_start() {
        let a = Ring::new(&way(
            1,
            vec![1, 2, 3],
            vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)],
        ));
        let b = Ring::new(&way(2, vec![1, 4, 5], vec![(0.0, 0.0), (0.0, 1.0), (0.0, 2.0)]));

        let merged = merge_rings(vec![a, b]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].refs, vec![5, 4, 1, 2, 3]);
        assert!(!merged[0].is_closed());
    }

    #[test]
    fn test_merge_end_into_start() {
        //b ends where a starts
        let a = Ring::new(&way(
            1,
            vec![1, 2, 3],
            vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)],
        ));
        let b = Ring::new(&way(2, vec![5, 4, 1], vec![(0.0, 2.0), (0.0, 1.0), (0.0, 0.0)]));

        let merged = merge_rings(vec![a, b]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].refs, vec![5, 4, 1, 2, 3]);
    }

    #[test]
    fn test_no_merge_possible() {
        let a = Ring::new(&way(1, vec![1, 2], vec![(0.0, 0.0), (1.0, 0.0)]));
        let b = Ring::new(&way(2, vec![5, 6], vec![(5.0, 5.0), (6.0, 5.0)]));

        let merged = merge_rings(vec![a, b]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_closed_ring_not_a_merge_target() {
        //a touches itself at node 1, b dangles from node 1
        let a = Ring::new(&way(
            1,
            vec![1, 2, 3, 1],
            vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)],
        ));
        let b = Ring::new(&way(2, vec![1, 9], vec![(0.0, 0.0), (9.0, 9.0)]));

        let merged = merge_rings(vec![a, b]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].refs, vec![1, 2, 3, 1]);
    }

    #[test]
    fn test_try_close_within_gap() {
        let mut r = Ring::new(&way(
            1,
            vec![1, 2, 3, 4],
            vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.00005, 0.0)],
        ));
        assert!(!r.is_closed());
        assert!(r.try_close(1e-4));
        assert_eq!(r.refs, vec![1, 2, 3, 4, 1]);
        assert_eq!(r.lonlats[r.lonlats.len() - 1], Coord { x: 0.0, y: 0.0 });
    }

    #[test]
    fn test_try_close_gap_too_large() {
        let mut r = Ring::new(&way(
            1,
            vec![1, 2, 3, 4],
            vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.00005, 0.0)],
        ));
        assert!(!r.try_close(1e-6));
        assert_eq!(r.refs, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_polygonize_normalises_winding() {
        //clockwise square
        let mut r = Ring::new(&way(
            1,
            vec![1, 4, 3, 2, 1],
            vec![
                (0.0, 0.0),
                (0.0, 1.0),
                (1.0, 1.0),
                (1.0, 0.0),
                (0.0, 0.0),
            ],
        ));
        r.polygonize().unwrap();
        assert_eq!(r.area, 1.0);
        assert!(calc_ring_area(&r.lonlats) > 0.0);
        assert!(r.geom.is_some());
    }
}
