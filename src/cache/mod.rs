use crate::elements::{ElementType, Member, Node, Way};
use crate::error::{Error, Result};
use geo::Coord;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

/// Resolves way node references to coordinates. `NotFound` signals an
/// incomplete extract and is skipped silently by the writers.
pub trait CoordCache: Send + Sync {
    fn fill_way(&self, way: &mut Way) -> Result<()>;
}

/// Resolves relation way members to their ways.
pub trait WayCache: Send + Sync {
    fn fill_members(&self, members: &mut [Member]) -> Result<()>;
}

/// Optional bookkeeping for incremental updates: which relations
/// depend on which ways, which ways on which nodes.
pub trait DiffCache: Send + Sync {
    fn ways_add_from_members(&self, rel_id: i64, members: &[Member]);
    fn coords_add_from_way(&self, way: &Way);
}

/// In-memory coord/way store, filled by the caller before the writers
/// run.
pub struct OsmCache {
    coords: RwLock<BTreeMap<i64, Coord<f64>>>,
    ways: RwLock<BTreeMap<i64, Way>>,
}

impl OsmCache {
    pub fn new() -> OsmCache {
        OsmCache {
            coords: RwLock::new(BTreeMap::new()),
            ways: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn add_node(&self, node: &Node) {
        self.coords.write().unwrap().insert(
            node.id,
            Coord {
                x: node.lon,
                y: node.lat,
            },
        );
    }

    pub fn add_way(&self, way: &Way) {
        self.ways.write().unwrap().insert(way.id, way.clone());
    }
}

impl CoordCache for OsmCache {
    fn fill_way(&self, way: &mut Way) -> Result<()> {
        let coords = self.coords.read().unwrap();
        let mut lonlats = Vec::with_capacity(way.refs.len());
        for r in &way.refs {
            match coords.get(r) {
                Some(c) => {
                    lonlats.push(*c);
                }
                None => {
                    return Err(Error::NotFound);
                }
            }
        }
        way.lonlats = lonlats;
        Ok(())
    }
}

impl WayCache for OsmCache {
    fn fill_members(&self, members: &mut [Member]) -> Result<()> {
        let ways = self.ways.read().unwrap();
        for m in members.iter_mut() {
            if m.mem_type != ElementType::Way {
                continue;
            }
            match ways.get(&m.mem_ref) {
                Some(w) => {
                    m.way = Some(w.clone());
                }
                None => {
                    return Err(Error::NotFound);
                }
            }
        }
        Ok(())
    }
}

/// Way ids already consumed by a relation polygon. Shared read access
/// from the way writer pool, writes from the relation writer.
pub struct InsertedWays {
    ids: RwLock<BTreeSet<i64>>,
}

impl InsertedWays {
    pub fn new() -> InsertedWays {
        InsertedWays {
            ids: RwLock::new(BTreeSet::new()),
        }
    }

    pub fn put(&self, id: i64) -> Result<()> {
        self.ids.write().unwrap().insert(id);
        Ok(())
    }

    pub fn contains(&self, id: i64) -> Result<bool> {
        Ok(self.ids.read().unwrap().contains(&id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_way() {
        let cache = OsmCache::new();
        cache.add_node(&Node::with_position(1, 0.0, 0.0));
        cache.add_node(&Node::with_position(2, 1.0, 0.0));

        let mut w = Way::new(10);
        w.refs = vec![1, 2];
        cache.fill_way(&mut w).unwrap();
        assert_eq!(w.lonlats.len(), 2);
        assert_eq!(w.lonlats[1], Coord { x: 1.0, y: 0.0 });

        w.refs = vec![1, 3];
        match cache.fill_way(&mut w) {
            Err(Error::NotFound) => {}
            r => {
                panic!("expected NotFound, got {:?}", r.is_ok());
            }
        }
    }

    #[test]
    fn test_fill_members_skips_non_ways() {
        let cache = OsmCache::new();
        let mut w = Way::new(10);
        w.refs = vec![1, 2];
        cache.add_way(&w);

        let mut members = vec![
            Member::new(String::from("admin_centre"), ElementType::Node, 5),
            Member::new(String::from("outer"), ElementType::Way, 10),
        ];
        cache.fill_members(&mut members).unwrap();
        assert!(members[0].way.is_none());
        assert_eq!(members[1].way.as_ref().unwrap().id, 10);
    }

    #[test]
    fn test_inserted_ways_idempotent() {
        let iw = InsertedWays::new();
        assert!(!iw.contains(42).unwrap());
        iw.put(42).unwrap();
        iw.put(42).unwrap();
        assert!(iw.contains(42).unwrap());
        assert!(!iw.contains(43).unwrap());
    }
}
