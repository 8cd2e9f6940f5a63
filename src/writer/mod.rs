mod nodes;
mod relations;
mod ways;

pub use nodes::{make_node_writer, NodeWriter};
pub use relations::{make_relation_writer, RelationWriter};
pub use ways::{make_way_writer, WayWriter};

use crate::cache::{CoordCache, DiffCache, InsertedWays, WayCache};
use crate::elements::{Geometry, Node, Relation, Tag, Way};
use crate::error::{Error, Result};
use crate::geometry::point_in_poly;
use crate::mapping::{Mapping, Match};
use crate::message;
use crate::utils::StageLog;

use geo::{BooleanOps, Coord, LineString, MultiPolygon, Polygon};
use std::sync::{Arc, Mutex};

pub enum OtherData {
    Messages(Vec<String>),
    Errors(Vec<(i64, String)>),
}

pub type Timings = crate::utils::Timings<OtherData>;

/// One element presented to the destination inserter; street relations
/// carry no geometry.
pub struct InsertRow<'a> {
    pub id: i64,
    pub tags: &'a [Tag],
    pub geom: Option<&'a Geometry>,
}

/// Destination store. Implementations must be safe for concurrent
/// calls from every writer worker.
pub trait Inserter: Send + Sync {
    fn insert_point(&self, row: InsertRow, matches: &[Match]) -> Result<()>;
    fn insert_line_string(&self, row: InsertRow, matches: &[Match]) -> Result<()>;
    fn insert_polygon(&self, row: InsertRow, matches: &[Match]) -> Result<()>;
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum RowKind {
    Point,
    LineString,
    Polygon,
}

#[derive(Debug, Clone)]
pub struct Row {
    pub kind: RowKind,
    pub table: String,
    pub id: i64,
    pub wkb: Option<String>,
}

/// Inserter that keeps every row in memory; one row per match.
pub struct CollectingInserter {
    rows: Mutex<Vec<Row>>,
}

impl CollectingInserter {
    pub fn new() -> CollectingInserter {
        CollectingInserter {
            rows: Mutex::new(Vec::new()),
        }
    }

    pub fn rows(&self) -> Vec<Row> {
        self.rows.lock().unwrap().clone()
    }

    fn add(&self, kind: RowKind, row: &InsertRow, matches: &[Match]) {
        let mut rows = self.rows.lock().unwrap();
        for m in matches {
            rows.push(Row {
                kind: kind.clone(),
                table: m.table.clone(),
                id: row.id,
                wkb: row.geom.map(|g| g.wkb.clone()),
            });
        }
    }
}

impl Inserter for CollectingInserter {
    fn insert_point(&self, row: InsertRow, matches: &[Match]) -> Result<()> {
        self.add(RowKind::Point, &row, matches);
        Ok(())
    }
    fn insert_line_string(&self, row: InsertRow, matches: &[Match]) -> Result<()> {
        self.add(RowKind::LineString, &row, matches);
        Ok(())
    }
    fn insert_polygon(&self, row: InsertRow, matches: &[Match]) -> Result<()> {
        self.add(RowKind::Polygon, &row, matches);
        Ok(())
    }
}

/// Clips output geometries against a configured region.
pub trait Limiter: Send + Sync {
    fn clip(&self, geom: &geo::Geometry<f64>) -> Result<Vec<geo::Geometry<f64>>>;
}

/// Rectangular region limiter: points are kept or dropped, areal
/// geometries are intersected with the region.
pub struct BboxLimiter {
    poly: Polygon<f64>,
}

impl BboxLimiter {
    pub fn new(minx: f64, miny: f64, maxx: f64, maxy: f64) -> BboxLimiter {
        let ring = LineString::new(vec![
            Coord { x: minx, y: miny },
            Coord { x: maxx, y: miny },
            Coord { x: maxx, y: maxy },
            Coord { x: minx, y: maxy },
            Coord { x: minx, y: miny },
        ]);
        BboxLimiter {
            poly: Polygon::new(ring, Vec::new()),
        }
    }

    fn clip_multi(&self, mp: &MultiPolygon<f64>) -> Vec<geo::Geometry<f64>> {
        let region = MultiPolygon::new(vec![self.poly.clone()]);
        let clipped = mp.intersection(&region);
        clipped
            .0
            .into_iter()
            .map(|p| geo::Geometry::Polygon(p))
            .collect()
    }
}

impl Limiter for BboxLimiter {
    fn clip(&self, geom: &geo::Geometry<f64>) -> Result<Vec<geo::Geometry<f64>>> {
        match geom {
            geo::Geometry::Point(p) => {
                if point_in_poly(&self.poly.exterior().0, &p.0) {
                    Ok(vec![geom.clone()])
                } else {
                    Ok(Vec::new())
                }
            }
            geo::Geometry::Polygon(p) => {
                Ok(self.clip_multi(&MultiPolygon::new(vec![p.clone()])))
            }
            geo::Geometry::MultiPolygon(mp) => Ok(self.clip_multi(mp)),
            _ => Err(Error::Geometry(format!("cannot clip geometry"))),
        }
    }
}

/// Tile expiry sink, fed with the coordinates of every written
/// feature.
pub trait Expireor: Send + Sync {
    fn expire(&self, lon: f64, lat: f64);
}

pub fn expire_nodes(expireor: &dyn Expireor, coords: &[Coord<f64>]) {
    for c in coords {
        expireor.expire(c.x, c.y);
    }
}

/// Collaborators every writer shares.
#[derive(Clone)]
pub struct WriterOptions {
    pub srid: u32,
    pub inserter: Arc<dyn Inserter>,
    pub limiter: Option<Arc<dyn Limiter>>,
    pub expireor: Option<Arc<dyn Expireor>>,
}

impl WriterOptions {
    pub fn new(srid: u32, inserter: Arc<dyn Inserter>) -> WriterOptions {
        WriterOptions {
            srid: srid,
            inserter: inserter,
            limiter: None,
            expireor: None,
        }
    }
}

/// Drives the three writer pools over already-decoded elements.
/// Relations run first so the way writer sees the complete
/// inserted-ways registry.
pub fn process_elements<NI, WI, RI>(
    mapping: &Mapping,
    opts: WriterOptions,
    way_cache: Arc<dyn WayCache>,
    coord_cache: Arc<dyn CoordCache>,
    diff_cache: Option<Arc<dyn DiffCache>>,
    nodes: NI,
    ways: WI,
    relations: RI,
    numchan: usize,
) -> Result<Timings>
where
    NI: Iterator<Item = Node>,
    WI: Iterator<Item = Way>,
    RI: Iterator<Item = Relation>,
{
    let mut lt = StageLog::new();
    let inserted_ways = Arc::new(InsertedWays::new());
    let mut tms = Timings::new();

    let mut rel_pool = make_relation_writer(
        opts.clone(),
        mapping.single_id_space,
        way_cache,
        coord_cache.clone(),
        Arc::new(mapping.polygon_matcher()),
        Arc::new(mapping.relation_matcher()),
        inserted_ways.clone(),
        diff_cache,
        numchan,
    );
    for r in relations {
        rel_pool.feed(r);
    }
    for t in rel_pool.join()? {
        tms.combine(t);
    }
    lt.stage("relations");

    let mut way_pool = make_way_writer(
        opts.clone(),
        coord_cache,
        inserted_ways,
        Arc::new(mapping.line_string_matcher()),
        Arc::new(mapping.polygon_matcher()),
        numchan,
    );
    for w in ways {
        way_pool.feed(w);
    }
    for t in way_pool.join()? {
        tms.combine(t);
    }
    lt.stage("ways");

    let mut node_pool = make_node_writer(opts, Arc::new(mapping.point_matcher()), 1);
    for n in nodes {
        node_pool.feed(n);
    }
    for t in node_pool.join()? {
        tms.combine(t);
    }
    lt.stage("nodes");

    for (w, o) in &tms.others {
        match o {
            OtherData::Messages(mm) => {
                for m in mm {
                    message!("{}: {}", w, m);
                }
            }
            OtherData::Errors(ee) => {
                message!("{}: {} errors", w, ee.len());
            }
        }
    }
    message!("{}\n{}", tms, lt);

    Ok(tms)
}

pub(crate) fn warn_level(what: &str, id: i64, e: &Error, errs: &mut Vec<(i64, String)>) {
    if e.level() > 0 {
        message!("{} {}: {}", what, id, e);
        errs.push((id, e.to_string()));
    }
}
