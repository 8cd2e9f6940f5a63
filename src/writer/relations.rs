use crate::cache::{CoordCache, DiffCache, InsertedWays, WayCache};
use crate::elements::{
    has_tag_value, set_tag, ElementType, Geometry, Relation, REL_ID_OFFSET,
};
use crate::error::Result;
use crate::geometry::{as_ewkb_hex, coords_to_srid, prepare_relation};
use crate::mapping::{select_relation_polygons, TagMatcher};
use crate::message;
use crate::utils::{CpuTimer, Stopwatch};
use crate::workers::{ElementSink, WorkerPool};
use crate::writer::{expire_nodes, warn_level, InsertRow, OtherData, Timings, WriterOptions};

use std::sync::Arc;

/// Assembles multipolygon and boundary relations (and street
/// relations) and inserts the results.
pub struct RelationWriter {
    opts: WriterOptions,
    single_id_space: bool,
    max_gap: f64,
    way_cache: Arc<dyn WayCache>,
    coord_cache: Arc<dyn CoordCache>,
    polygon_matcher: Arc<TagMatcher>,
    street_matcher: Arc<TagMatcher>,
    inserted_ways: Arc<InsertedWays>,
    diff_cache: Option<Arc<dyn DiffCache>>,

    count: usize,
    errs: Vec<(i64, String)>,
    tm: f64,
}

/// Largest endpoint gap the ring closer bridges, roughly 0.1m in
/// either unit.
pub fn default_max_gap(srid: u32) -> f64 {
    if srid == 4326 {
        1e-6
    } else {
        1e-1
    }
}

impl RelationWriter {
    pub fn new(
        opts: WriterOptions,
        single_id_space: bool,
        way_cache: Arc<dyn WayCache>,
        coord_cache: Arc<dyn CoordCache>,
        polygon_matcher: Arc<TagMatcher>,
        street_matcher: Arc<TagMatcher>,
        inserted_ways: Arc<InsertedWays>,
        diff_cache: Option<Arc<dyn DiffCache>>,
    ) -> RelationWriter {
        let max_gap = default_max_gap(opts.srid);
        RelationWriter {
            opts: opts,
            single_id_space: single_id_space,
            max_gap: max_gap,
            way_cache: way_cache,
            coord_cache: coord_cache,
            polygon_matcher: polygon_matcher,
            street_matcher: street_matcher,
            inserted_ways: inserted_ways,
            diff_cache: diff_cache,
            count: 0,
            errs: Vec::new(),
            tm: 0.0,
        }
    }

    fn rel_id(&self, id: i64) -> i64 {
        if !self.single_id_space {
            return -id;
        }
        REL_ID_OFFSET - id
    }

    fn process_street_relation(&mut self, mut r: Relation) {
        let mut streets: Vec<String> = Vec::new();
        let mut houses: Vec<String> = Vec::new();
        for m in &r.members {
            if m.role == "street" && m.mem_type == ElementType::Way {
                streets.push(m.mem_ref.to_string());
            }
            if m.role == "house"
                && (m.mem_type == ElementType::Way || m.mem_type == ElementType::Relation)
            {
                let id = if m.mem_type == ElementType::Relation {
                    m.mem_ref * -1
                } else {
                    m.mem_ref
                };
                houses.push(id.to_string());
            }
        }
        if streets.is_empty() || houses.is_empty() {
            return;
        }

        set_tag(&mut r.tags, "streets", streets.join(", "));
        set_tag(&mut r.tags, "houses", houses.join(", "));

        let matches = self.street_matcher.match_tags(&r.tags);
        let row = InsertRow {
            id: self.rel_id(r.id),
            tags: &r.tags,
            geom: None,
        };
        match self.opts.inserter.insert_point(row, &matches) {
            Err(e) => {
                warn_level("relation", r.id, &e, &mut self.errs);
            }
            Ok(()) => {}
        }
    }

    fn process_relation(&mut self, mut r: Relation) {
        self.count += 1;

        if has_tag_value(&r.tags, "type", "street")
            || has_tag_value(&r.tags, "type", "associatedStreet")
        {
            self.process_street_relation(r);
            return;
        }

        if !(has_tag_value(&r.tags, "type", "boundary")
            || has_tag_value(&r.tags, "type", "multipolygon"))
        {
            return;
        }

        match self.way_cache.fill_members(&mut r.members) {
            Ok(()) => {}
            Err(e) => {
                warn_level("relation", r.id, &e, &mut self.errs);
                return;
            }
        }

        let mut admin_centre: Vec<String> = Vec::new();
        let mut subareas: Vec<String> = Vec::new();
        for m in r.members.iter_mut() {
            if m.role == "admin_centre" && m.mem_type == ElementType::Node {
                admin_centre.push(m.mem_ref.to_string());
            }
            if m.role == "subarea"
                && (m.mem_type == ElementType::Way || m.mem_type == ElementType::Relation)
            {
                let id = if m.mem_type == ElementType::Relation {
                    m.mem_ref * -1
                } else {
                    m.mem_ref
                };
                subareas.push(id.to_string());
            }
            match m.way.as_mut() {
                None => {}
                Some(w) => {
                    match self.coord_cache.fill_way(w) {
                        Ok(()) => {}
                        Err(e) => {
                            warn_level("relation", r.id, &e, &mut self.errs);
                            return;
                        }
                    }
                    coords_to_srid(self.opts.srid, &mut w.lonlats);
                }
            }
        }
        if !admin_centre.is_empty() {
            set_tag(&mut r.tags, "admin_centre", admin_centre.join(", "));
        }
        if !subareas.is_empty() {
            set_tag(&mut r.tags, "subareas", subareas.join(", "));
        }

        //ring building consumes the member geometries; the diff cache
        //needs the full member list afterwards
        let all_members = r.members.clone();

        let prep = match prepare_relation(&mut r, self.opts.srid, self.max_gap) {
            Ok(p) => p,
            Err(e) => {
                warn_level("relation", r.id, &e, &mut self.errs);
                return;
            }
        };

        //check for matches before paying for the geometry
        let matches = self.polygon_matcher.match_tags(&r.tags);
        if matches.is_empty() {
            return;
        }

        let consumed = match prep.build(&mut r) {
            Ok(c) => c,
            Err(e) => {
                r.geom = None;
                warn_level("relation", r.id, &e, &mut self.errs);
                return;
            }
        };

        match &self.opts.limiter {
            Some(lim) => {
                let geom = match &r.geom {
                    Some(g) => g,
                    None => {
                        return;
                    }
                };
                let start = Stopwatch::start();
                let parts = match lim.clip(&geom.geom) {
                    Ok(p) => p,
                    Err(e) => {
                        warn_level("relation", r.id, &e, &mut self.errs);
                        return;
                    }
                };
                let duration = start.elapsed();
                if duration > 60.0 {
                    message!("clipping relation {} took {:.0}s", r.id, duration);
                }
                for g in parts {
                    let wkb = match as_ewkb_hex(&g, Some(self.opts.srid)) {
                        Ok(w) => w,
                        Err(e) => {
                            warn_level("relation", r.id, &e, &mut self.errs);
                            continue;
                        }
                    };
                    let part = Geometry::new(g, wkb);
                    let row = InsertRow {
                        id: self.rel_id(r.id),
                        tags: &r.tags,
                        geom: Some(&part),
                    };
                    match self.opts.inserter.insert_polygon(row, &matches) {
                        Err(e) => {
                            warn_level("relation", r.id, &e, &mut self.errs);
                        }
                        Ok(()) => {}
                    }
                }
            }
            None => {
                let geom = match &r.geom {
                    Some(g) => g,
                    None => {
                        return;
                    }
                };
                let row = InsertRow {
                    id: self.rel_id(r.id),
                    tags: &r.tags,
                    geom: Some(geom),
                };
                match self.opts.inserter.insert_polygon(row, &matches) {
                    Err(e) => {
                        warn_level("relation", r.id, &e, &mut self.errs);
                    }
                    Ok(()) => {}
                }
            }
        }

        for way_id in select_relation_polygons(&self.polygon_matcher, &r) {
            if consumed.contains_key(&way_id) {
                match self.inserted_ways.put(way_id) {
                    Err(e) => {
                        message!("inserted-ways put {}: {}", way_id, e);
                    }
                    Ok(()) => {}
                }
            }
        }

        match &self.diff_cache {
            Some(diff) => {
                diff.ways_add_from_members(r.id, &all_members);
                for m in &all_members {
                    match &m.way {
                        Some(w) => {
                            diff.coords_add_from_way(w);
                        }
                        None => {}
                    }
                }
            }
            None => {}
        }

        match &self.opts.expireor {
            Some(exp) => {
                for m in &all_members {
                    match &m.way {
                        Some(w) => {
                            expire_nodes(exp.as_ref(), &w.lonlats);
                        }
                        None => {}
                    }
                }
            }
            None => {}
        }

        r.geom = None;
    }
}

impl ElementSink for RelationWriter {
    type Elem = Relation;
    type Output = Timings;

    fn handle(&mut self, r: Relation) {
        let tx = CpuTimer::start();
        self.process_relation(r);
        self.tm += tx.elapsed();
    }

    fn done(&mut self) -> Result<Timings> {
        let mut tms = Timings::new();
        tms.add("RelationWriter", self.tm);
        tms.add_other(
            "RelationWriter",
            OtherData::Messages(vec![format!("processed {} relations", self.count)]),
        );
        if !self.errs.is_empty() {
            message!("RelationWriter: {} errors", self.errs.len());
            tms.add_other(
                "RelationWriter",
                OtherData::Errors(std::mem::take(&mut self.errs)),
            );
        }
        Ok(tms)
    }
}

/// Relation writer pool; relations usually take one or two workers.
pub fn make_relation_writer(
    opts: WriterOptions,
    single_id_space: bool,
    way_cache: Arc<dyn WayCache>,
    coord_cache: Arc<dyn CoordCache>,
    polygon_matcher: Arc<TagMatcher>,
    street_matcher: Arc<TagMatcher>,
    inserted_ways: Arc<InsertedWays>,
    diff_cache: Option<Arc<dyn DiffCache>>,
    numchan: usize,
) -> WorkerPool<Relation, Timings> {
    WorkerPool::spawn(numchan, move |_| {
        RelationWriter::new(
            opts.clone(),
            single_id_space,
            way_cache.clone(),
            coord_cache.clone(),
            polygon_matcher.clone(),
            street_matcher.clone(),
            inserted_ways.clone(),
            diff_cache.clone(),
        )
    })
}
