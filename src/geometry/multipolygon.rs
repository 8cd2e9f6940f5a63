use crate::elements::{Geometry, Relation, Tag};
use crate::error::{Error, Result};
use crate::geometry::position::{point_in_poly, polygon_contains, ring_self_intersects};
use crate::geometry::ring::{merge_rings, Ring};
use crate::geometry::wkb::as_ewkb_hex;
use geo::{Coord, LineString, MultiPolygon, Polygon};
use std::collections::{BTreeMap, BTreeSet};

/// A relation with its rings built and its effective tags resolved,
/// ready for (or spared from) the geometry build.
pub struct PreparedRelation {
    pub rings: Vec<Ring>,
    pub srid: u32,
}

pub fn prepare_relation(rel: &mut Relation, srid: u32, max_gap: f64) -> Result<PreparedRelation> {
    let rings = build_rings(rel, max_gap)?;

    let outer_way_tags = outer_way_tags(rel, &rings);
    rel.tags = relation_tags(&rel.tags, &outer_way_tags);

    Ok(PreparedRelation {
        rings: rings,
        srid: srid,
    })
}

impl PreparedRelation {
    /// Classifies and assembles the rings into the relation's
    /// (multi)polygon. Returns the contributing way ids with the tags
    /// recorded against them.
    pub fn build(self, rel: &mut Relation) -> Result<BTreeMap<i64, Vec<Tag>>> {
        build_rel_geometry(rel, self.rings, self.srid)
    }
}

fn outer_way_tags(rel: &Relation, rings: &[Ring]) -> Vec<Tag> {
    if rings.is_empty() || rings[0].ways.is_empty() {
        return Vec::new();
    }
    let outer_id = rings[0].ways[0];
    for m in &rel.members {
        if m.mem_ref == outer_id {
            match &m.way {
                Some(w) => {
                    return w.tags.clone();
                }
                None => {}
            }
        }
    }
    Vec::new()
}

/// Builds closed rings from the relation's way members: closed members
/// polygonize directly, fragments are merged head-to-tail and gap
/// closed. The result is sorted by area descending, equal areas by
/// smallest contributing way id.
pub fn build_rings(rel: &Relation, max_gap: f64) -> Result<Vec<Ring>> {
    let mut rings = Vec::new();
    for m in &rel.members {
        match &m.way {
            Some(w) => {
                rings.push(Ring::new(w));
            }
            None => {}
        }
    }

    let mut complete = Vec::new();
    let mut incomplete = Vec::new();
    for mut r in rings {
        if r.is_closed() {
            r.polygonize()?;
            complete.push(r);
        } else {
            incomplete.push(r);
        }
    }

    let mut merged = merge_rings(incomplete);
    if complete.len() + merged.len() == 0 {
        return Err(Error::NoRing);
    }
    for ring in merged.iter_mut() {
        if !ring.is_closed() && !ring.try_close(max_gap) {
            return Err(Error::NoRing);
        }
        ring.polygonize()?;
    }
    complete.extend(merged);

    complete.sort_by(|a, b| {
        b.area
            .partial_cmp(&a.area)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.min_way_id().cmp(&b.min_way_id()))
    });

    Ok(complete)
}

fn relation_tags(rel_tags: &[Tag], _way_tags: &[Tag]) -> Vec<Tag> {
    let mut res = Vec::new();
    for t in rel_tags {
        /*
        if t.key == "name" || t.key == "type" {
            continue;
        }
        */
        res.push(t.clone());
    }
    /*
    if res.is_empty() {
        //relation does not have tags? use way tags
        for t in _way_tags {
            res.push(t.clone());
        }
    } else {
        match get_tag(rel_tags, "name") {
            Some(n) => { crate::elements::set_tag(&mut res, "name", String::from(n)); }
            None => {}
        }
    }
    */
    res
}

/// True if rings[idx] sits at odd nesting depth, walking the
/// contained_by chain to the outermost ring.
fn ring_is_hole(rings: &[Ring], idx: usize) -> bool {
    let mut contained_counter = 0;
    let mut i = idx;
    loop {
        match rings[i].contained_by {
            None => {
                break;
            }
            Some(p) => {
                contained_counter += 1;
                i = p;
            }
        }
    }
    contained_counter % 2 == 1
}

/// Accelerator for repeated containment tests against one ring.
struct PreparedRing {
    bbox: (f64, f64, f64, f64),
    coords: Vec<Coord<f64>>,
}

fn coords_bbox(coords: &[Coord<f64>]) -> (f64, f64, f64, f64) {
    let mut minx = f64::MAX;
    let mut miny = f64::MAX;
    let mut maxx = f64::MIN;
    let mut maxy = f64::MIN;
    for c in coords {
        minx = f64::min(minx, c.x);
        miny = f64::min(miny, c.y);
        maxx = f64::max(maxx, c.x);
        maxy = f64::max(maxy, c.y);
    }
    (minx, miny, maxx, maxy)
}

impl PreparedRing {
    fn new(ring: &Ring) -> Result<PreparedRing> {
        let geom = match &ring.geom {
            Some(g) => g,
            None => {
                return Err(Error::Geometry(String::from("ring geometry missing")));
            }
        };
        let coords = geom.exterior().0.clone();
        let bbox = coords_bbox(&coords);
        Ok(PreparedRing {
            bbox: bbox,
            coords: coords,
        })
    }

    fn contains(&self, other: &[Coord<f64>]) -> bool {
        let ob = coords_bbox(other);
        if ob.0 < self.bbox.0 || ob.1 < self.bbox.1 || ob.2 > self.bbox.2 || ob.3 > self.bbox.3 {
            return false;
        }
        polygon_contains(&self.coords, other)
    }
}

fn polygons_valid(polygons: &[Polygon<f64>]) -> bool {
    for p in polygons {
        let ext = &p.exterior().0;
        if ext.len() < 4 || ext[0] != ext[ext.len() - 1] {
            return false;
        }
        if ring_self_intersects(ext) {
            return false;
        }
        for ii in p.interiors() {
            let hole = &ii.0;
            if hole.len() < 4 || hole[0] != hole[hole.len() - 1] {
                return false;
            }
            if ring_self_intersects(hole) {
                return false;
            }
            if !point_in_poly(ext, &hole[0]) {
                return false;
            }
        }
    }
    true
}

fn normalize_ring(ring: &LineString<f64>) -> Option<LineString<f64>> {
    let mut coords: Vec<Coord<f64>> = Vec::with_capacity(ring.0.len());
    for c in &ring.0 {
        if coords.last() == Some(c) {
            continue;
        }
        coords.push(*c);
    }
    if coords.first() == coords.last() {
        coords.pop();
    }
    if coords.len() < 3 {
        return None;
    }
    let first = coords[0];
    coords.push(first);
    Some(LineString::new(coords))
}

/// Reconstruction pass for geometries that fail the validity check:
/// duplicate consecutive coordinates are dropped, rings re-closed, and
/// degenerate rings discarded.
fn normalize_rings(polygons: Vec<Polygon<f64>>) -> Vec<Polygon<f64>> {
    let mut res = Vec::new();
    for p in polygons {
        let (ext, ints) = p.into_inner();
        match normalize_ring(&ext) {
            None => {}
            Some(e) => {
                let mut interiors = Vec::new();
                for ii in ints {
                    match normalize_ring(&ii) {
                        None => {}
                        Some(i) => {
                            interiors.push(i);
                        }
                    }
                }
                res.push(Polygon::new(e, interiors));
            }
        }
    }
    res
}

/// Classifies the rings as shells and holes and assembles the final
/// (multi)polygon, attaching it with its EWKB-hex to the relation.
/// rings need to be sorted by area (large to small).
pub fn build_rel_geometry(
    rel: &mut Relation,
    mut rings: Vec<Ring>,
    srid: u32,
) -> Result<BTreeMap<i64, Vec<Tag>>> {
    if rings.is_empty() {
        return Err(Error::NoRing);
    }

    let total = rings.len();
    let mut shells: BTreeSet<usize> = BTreeSet::new();
    shells.insert(0);

    for i in 0..total {
        let test_geom = PreparedRing::new(&rings[i])?;
        for j in i + 1..total {
            let inside = {
                let pj = match &rings[j].geom {
                    Some(g) => g,
                    None => {
                        return Err(Error::Geometry(String::from("ring geometry missing")));
                    }
                };
                test_geom.contains(&pj.exterior().0)
            };
            if inside {
                match rings[j].contained_by {
                    Some(p) => {
                        //j is inside a larger ring, remove that
                        //relationship, e.g. j is hole inside a hole
                        rings[p].holes.remove(&j);
                        shells.remove(&j);
                    }
                    None => {}
                }
                rings[j].contained_by = Some(i);
                if ring_is_hole(&rings, j) {
                    rings[i].holes.insert(j);
                } else {
                    shells.insert(j);
                }
            }
        }
        if rings[i].contained_by.is_none() {
            shells.insert(i);
        }
    }

    let rel_tags = rel.tags.clone();
    let shell_idxs: Vec<usize> = shells.iter().cloned().collect();
    let mut polygons = Vec::new();
    for s in shell_idxs {
        let hole_idxs: Vec<usize> = rings[s].holes.iter().cloned().collect();
        let mut interiors = Vec::new();
        for h in hole_idxs {
            rings[h].mark_inserted(&rel_tags);
            let hole_poly = match rings[h].geom.take() {
                Some(g) => g,
                None => {
                    return Err(Error::Geometry(String::from("ring geometry missing")));
                }
            };
            let (mut ext, _) = hole_poly.into_inner();
            ext.0.reverse();
            interiors.push(ext);
        }
        rings[s].mark_inserted(&rel_tags);
        let shell_poly = match rings[s].geom.take() {
            Some(g) => g,
            None => {
                return Err(Error::Geometry(String::from("ring geometry missing")));
            }
        };
        let (ext, _) = shell_poly.into_inner();
        polygons.push(Polygon::new(ext, interiors));
    }

    if !polygons_valid(&polygons) {
        polygons = normalize_rings(polygons);
        if polygons.is_empty() || !polygons_valid(&polygons) {
            return Err(Error::Geometry(String::from(
                "unable to repair invalid geometry",
            )));
        }
    }

    let geometry = if polygons.len() == 1 {
        geo::Geometry::Polygon(polygons.remove(0))
    } else {
        geo::Geometry::MultiPolygon(MultiPolygon::new(polygons))
    };

    let wkb = as_ewkb_hex(&geometry, Some(srid))?;
    rel.geom = Some(Geometry::new(geometry, wkb));

    let mut inserted = BTreeMap::new();
    for r in rings.iter_mut() {
        inserted.append(&mut r.inserted);
    }

    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{get_tag, ElementType, Member, Way};

    fn square_way(id: i64, first_ref: i64, x0: f64, y0: f64, side: f64) -> Way {
        let mut w = Way::new(id);
        w.refs = vec![first_ref, first_ref + 1, first_ref + 2, first_ref + 3, first_ref];
        w.lonlats = vec![
            Coord { x: x0, y: y0 },
            Coord { x: x0 + side, y: y0 },
            Coord { x: x0 + side, y: y0 + side },
            Coord { x: x0, y: y0 + side },
            Coord { x: x0, y: y0 },
        ];
        w
    }

    fn rel_with_ways(ways: Vec<Way>) -> Relation {
        let mut rel = Relation::new(100);
        rel.tags.push(Tag::new(
            String::from("type"),
            String::from("multipolygon"),
        ));
        for w in ways {
            let mut m = Member::new(String::from("outer"), ElementType::Way, w.id);
            m.way = Some(w);
            rel.members.push(m);
        }
        rel
    }

    #[test]
    fn test_single_closed_way() {
        let mut rel = rel_with_ways(vec![square_way(1, 1, 0.0, 0.0, 10.0)]);
        let prep = prepare_relation(&mut rel, 3857, 0.1).unwrap();
        assert_eq!(prep.rings.len(), 1);
        assert_eq!(prep.rings[0].area, 100.0);

        let inserted = prep.build(&mut rel).unwrap();
        assert_eq!(inserted.keys().cloned().collect::<Vec<i64>>(), vec![1]);

        let geom = rel.geom.as_ref().unwrap();
        match &geom.geom {
            geo::Geometry::Polygon(p) => {
                assert_eq!(p.interiors().len(), 0);
                assert_eq!(p.exterior().0.len(), 5);
            }
            g => {
                panic!("expected polygon, got {:?}", g);
            }
        }
        //type 3 with srid flag
        assert!(geom.wkb.starts_with("0020000003"));
    }

    #[test]
    fn test_fragments_merge_into_ring() {
        let mut a = Way::new(1);
        a.refs = vec![1, 2, 3];
        a.lonlats = vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 10.0, y: 0.0 },
            Coord { x: 10.0, y: 10.0 },
        ];
        let mut b = Way::new(2);
        b.refs = vec![3, 4, 1];
        b.lonlats = vec![
            Coord { x: 10.0, y: 10.0 },
            Coord { x: 0.0, y: 10.0 },
            Coord { x: 0.0, y: 0.0 },
        ];

        let rel = rel_with_ways(vec![a, b]);
        let rings = build_rings(&rel, 0.1).unwrap();
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].refs, vec![1, 2, 3, 4, 1]);
        assert_eq!(rings[0].area, 100.0);
        assert_eq!(rings[0].ways, vec![1, 2]);
    }

    #[test]
    fn test_unclosable_relation() {
        let mut a = Way::new(1);
        a.refs = vec![1, 2, 3, 4];
        a.lonlats = vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 10.0, y: 0.0 },
            Coord { x: 10.0, y: 10.0 },
            Coord { x: 0.0, y: 5.0 },
        ];
        let mut rel = rel_with_ways(vec![a]);

        match prepare_relation(&mut rel, 3857, 1e-6) {
            Err(Error::NoRing) => {}
            r => {
                panic!("expected NoRing, got {:?}", r.is_ok());
            }
        }
        assert!(rel.geom.is_none());
    }

    #[test]
    fn test_hole_in_hole() {
        //nested squares: outer shell, middle hole, innermost stands
        //alone again
        let outer = square_way(1, 1, 0.0, 0.0, 10.0);
        let middle = square_way(2, 11, 1.0, 1.0, 6.0);
        let inner = square_way(3, 21, 2.0, 2.0, 3.0);

        let mut rel = rel_with_ways(vec![inner.clone(), outer.clone(), middle.clone()]);
        let prep = prepare_relation(&mut rel, 3857, 0.1).unwrap();

        //sorted area descending
        assert_eq!(prep.rings[0].ways, vec![1]);
        assert_eq!(prep.rings[1].ways, vec![2]);
        assert_eq!(prep.rings[2].ways, vec![3]);

        let inserted = prep.build(&mut rel).unwrap();
        assert_eq!(
            inserted.keys().cloned().collect::<Vec<i64>>(),
            vec![1, 2, 3]
        );

        match &rel.geom.as_ref().unwrap().geom {
            geo::Geometry::MultiPolygon(mp) => {
                assert_eq!(mp.0.len(), 2);
                //annulus first (largest shell), then the inner disc
                assert_eq!(mp.0[0].interiors().len(), 1);
                assert_eq!(mp.0[1].interiors().len(), 0);
            }
            g => {
                panic!("expected multipolygon, got {:?}", g);
            }
        }
    }

    #[test]
    fn test_ring_is_hole_depths() {
        let outer = square_way(1, 1, 0.0, 0.0, 10.0);
        let middle = square_way(2, 11, 1.0, 1.0, 6.0);
        let inner = square_way(3, 21, 2.0, 2.0, 3.0);

        let rel = rel_with_ways(vec![outer, middle, inner]);
        let mut rings = build_rings(&rel, 0.1).unwrap();

        rings[1].contained_by = Some(0);
        rings[2].contained_by = Some(1);

        assert!(!ring_is_hole(&rings, 0)); //depth 0
        assert!(ring_is_hole(&rings, 1)); //depth 1
        assert!(!ring_is_hole(&rings, 2)); //depth 2
    }

    #[test]
    fn test_build_is_idempotent() {
        let ways = vec![
            square_way(1, 1, 0.0, 0.0, 10.0),
            square_way(2, 11, 1.0, 1.0, 6.0),
        ];

        let mut rel_a = rel_with_ways(ways.clone());
        let prep_a = prepare_relation(&mut rel_a, 3857, 0.1).unwrap();
        prep_a.build(&mut rel_a).unwrap();

        let mut rel_b = rel_with_ways(ways);
        let prep_b = prepare_relation(&mut rel_b, 3857, 0.1).unwrap();
        prep_b.build(&mut rel_b).unwrap();

        assert_eq!(
            rel_a.geom.as_ref().unwrap().wkb,
            rel_b.geom.as_ref().unwrap().wkb
        );
    }

    #[test]
    fn test_inserted_tags_propagate() {
        let mut rel = rel_with_ways(vec![square_way(7, 1, 0.0, 0.0, 4.0)]);
        rel.tags
            .push(Tag::new(String::from("landuse"), String::from("forest")));

        let prep = prepare_relation(&mut rel, 3857, 0.1).unwrap();
        let inserted = prep.build(&mut rel).unwrap();

        let tags = inserted.get(&7).unwrap();
        assert!(crate::elements::has_tag_value(tags, "landuse", "forest"));
        assert!(crate::elements::has_tag_value(tags, "type", "multipolygon"));
    }

    #[test]
    fn test_relation_tags_ignore_way_fallback() {
        let way_tags = vec![Tag::new(String::from("natural"), String::from("water"))];
        let res = relation_tags(&[], &way_tags);
        assert!(res.is_empty());

        let rel_tags = vec![Tag::new(String::from("boundary"), String::from("administrative"))];
        let res = relation_tags(&rel_tags, &way_tags);
        assert_eq!(res, rel_tags);
        assert_eq!(get_tag(&res, "natural"), None);
    }

    #[test]
    fn test_equal_area_tie_break() {
        //two disjoint squares of identical area: smallest way id first
        let a = square_way(9, 1, 0.0, 0.0, 5.0);
        let b = square_way(4, 11, 20.0, 20.0, 5.0);

        let rel = rel_with_ways(vec![a, b]);
        let rings = build_rings(&rel, 0.1).unwrap();
        assert_eq!(rings[0].ways, vec![4]);
        assert_eq!(rings[1].ways, vec![9]);
    }
}
