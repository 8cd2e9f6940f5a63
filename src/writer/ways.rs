use crate::cache::{CoordCache, InsertedWays};
use crate::elements::Way;
use crate::error::Result;
use crate::geometry::{coords_to_srid, line_string_geometry, polygon_geometry};
use crate::mapping::TagMatcher;
use crate::message;
use crate::utils::CpuTimer;
use crate::workers::{ElementSink, WorkerPool};
use crate::writer::{warn_level, InsertRow, OtherData, Timings, WriterOptions};

use std::sync::Arc;

/// Resolves way coordinates and inserts linestring and/or polygon rows.
/// Ways consumed by a relation polygon are skipped.
pub struct WayWriter {
    opts: WriterOptions,
    coord_cache: Arc<dyn CoordCache>,
    inserted_ways: Arc<InsertedWays>,
    line_string_matcher: Arc<TagMatcher>,
    polygon_matcher: Arc<TagMatcher>,

    count: usize,
    skipped: usize,
    errs: Vec<(i64, String)>,
    tm: f64,
}

impl WayWriter {
    pub fn new(
        opts: WriterOptions,
        coord_cache: Arc<dyn CoordCache>,
        inserted_ways: Arc<InsertedWays>,
        line_string_matcher: Arc<TagMatcher>,
        polygon_matcher: Arc<TagMatcher>,
    ) -> WayWriter {
        WayWriter {
            opts: opts,
            coord_cache: coord_cache,
            inserted_ways: inserted_ways,
            line_string_matcher: line_string_matcher,
            polygon_matcher: polygon_matcher,
            count: 0,
            skipped: 0,
            errs: Vec::new(),
            tm: 0.0,
        }
    }

    fn process_way(&mut self, mut w: Way) {
        self.count += 1;

        match self.inserted_ways.contains(w.id) {
            Ok(true) => {
                self.skipped += 1;
                return;
            }
            Ok(false) => {}
            Err(e) => {
                warn_level("way", w.id, &e, &mut self.errs);
                return;
            }
        }

        match self.coord_cache.fill_way(&mut w) {
            Ok(()) => {}
            Err(e) => {
                //incomplete extracts are expected, anything else is not
                warn_level("way", w.id, &e, &mut self.errs);
                return;
            }
        }
        coords_to_srid(self.opts.srid, &mut w.lonlats);

        let ls_matches = self.line_string_matcher.match_tags(&w.tags);
        if !ls_matches.is_empty() {
            //work on a copy so this pass cannot interfere with the
            //polygon pass
            let mut way = w.clone();
            match line_string_geometry(&way, self.opts.srid) {
                Err(e) => {
                    warn_level("way", way.id, &e, &mut self.errs);
                }
                Ok(g) => {
                    way.geom = Some(g);
                    let row = InsertRow {
                        id: way.id,
                        tags: &way.tags,
                        geom: way.geom.as_ref(),
                    };
                    match self.opts.inserter.insert_line_string(row, &ls_matches) {
                        Err(e) => {
                            warn_level("way", way.id, &e, &mut self.errs);
                        }
                        Ok(()) => {}
                    }
                }
            }
        }

        if w.is_closed() {
            let poly_matches = self.polygon_matcher.match_tags(&w.tags);
            if !poly_matches.is_empty() {
                let mut way = w.clone();
                match polygon_geometry(&way, self.opts.srid) {
                    Err(e) => {
                        warn_level("way", way.id, &e, &mut self.errs);
                    }
                    Ok(g) => {
                        way.geom = Some(g);
                        let row = InsertRow {
                            id: way.id,
                            tags: &way.tags,
                            geom: way.geom.as_ref(),
                        };
                        match self.opts.inserter.insert_polygon(row, &poly_matches) {
                            Err(e) => {
                                warn_level("way", way.id, &e, &mut self.errs);
                            }
                            Ok(()) => {}
                        }
                    }
                }
            }
        }
    }
}

impl ElementSink for WayWriter {
    type Elem = Way;
    type Output = Timings;

    fn handle(&mut self, w: Way) {
        let tx = CpuTimer::start();
        self.process_way(w);
        self.tm += tx.elapsed();
    }

    fn done(&mut self) -> Result<Timings> {
        let mut tms = Timings::new();
        tms.add("WayWriter", self.tm);
        tms.add_other(
            "WayWriter",
            OtherData::Messages(vec![format!(
                "processed {} ways, {} already in a relation",
                self.count, self.skipped
            )]),
        );
        if !self.errs.is_empty() {
            message!("WayWriter: {} errors", self.errs.len());
            tms.add_other(
                "WayWriter",
                OtherData::Errors(std::mem::take(&mut self.errs)),
            );
        }
        Ok(tms)
    }
}

/// Way writer pool, usually sized to the available cpus.
pub fn make_way_writer(
    opts: WriterOptions,
    coord_cache: Arc<dyn CoordCache>,
    inserted_ways: Arc<InsertedWays>,
    line_string_matcher: Arc<TagMatcher>,
    polygon_matcher: Arc<TagMatcher>,
    numchan: usize,
) -> WorkerPool<Way, Timings> {
    WorkerPool::spawn(numchan, move |_| {
        WayWriter::new(
            opts.clone(),
            coord_cache.clone(),
            inserted_ways.clone(),
            line_string_matcher.clone(),
            polygon_matcher.clone(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::OsmCache;
    use crate::elements::{Node, Tag};
    use crate::mapping::Mapping;
    use crate::writer::{CollectingInserter, RowKind};

    fn way_mapping() -> Mapping {
        let src = r#"{
            "tables": {
                "roads": {
                    "type": "linestring",
                    "mapping": {"highway": ["__any__"]}
                },
                "landusages": {
                    "type": "polygon",
                    "mapping": {"landuse": ["__any__"]}
                }
            }
        }"#;
        Mapping::from_reader(src.as_bytes()).unwrap()
    }

    fn filled_cache() -> Arc<OsmCache> {
        let cache = OsmCache::new();
        cache.add_node(&Node::with_position(1, 0.0, 0.0));
        cache.add_node(&Node::with_position(2, 1.0, 0.0));
        cache.add_node(&Node::with_position(3, 1.0, 1.0));
        cache.add_node(&Node::with_position(4, 0.0, 1.0));
        Arc::new(cache)
    }

    fn writer_for(
        inserter: Arc<CollectingInserter>,
        inserted_ways: Arc<InsertedWays>,
    ) -> WayWriter {
        let mapping = way_mapping();
        WayWriter::new(
            WriterOptions::new(3857, inserter),
            filled_cache(),
            inserted_ways,
            Arc::new(mapping.line_string_matcher()),
            Arc::new(mapping.polygon_matcher()),
        )
    }

    #[test]
    fn test_closed_way_inserts_both_kinds() {
        let inserter = Arc::new(CollectingInserter::new());
        let mut ww = writer_for(inserter.clone(), Arc::new(InsertedWays::new()));

        let mut w = Way::new(42);
        w.refs = vec![1, 2, 3, 4, 1];
        w.tags.push(Tag::new(String::from("highway"), String::from("service")));
        w.tags.push(Tag::new(String::from("landuse"), String::from("grass")));

        ww.handle(w);
        ww.done().unwrap();

        let rows = inserter.rows();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().any(|r| r.kind == RowKind::LineString && r.table == "roads"));
        assert!(rows.iter().any(|r| r.kind == RowKind::Polygon && r.table == "landusages"));
    }

    #[test]
    fn test_consumed_way_is_skipped() {
        let inserter = Arc::new(CollectingInserter::new());
        let registry = Arc::new(InsertedWays::new());
        registry.put(42).unwrap();
        let mut ww = writer_for(inserter.clone(), registry);

        let mut w = Way::new(42);
        w.refs = vec![1, 2, 3, 4, 1];
        w.tags.push(Tag::new(String::from("highway"), String::from("service")));
        w.tags.push(Tag::new(String::from("landuse"), String::from("grass")));

        ww.handle(w);
        ww.done().unwrap();

        assert!(inserter.rows().is_empty());
    }

    #[test]
    fn test_missing_coords_skip_silently() {
        let inserter = Arc::new(CollectingInserter::new());
        let mut ww = writer_for(inserter.clone(), Arc::new(InsertedWays::new()));

        let mut w = Way::new(7);
        w.refs = vec![1, 99];
        w.tags.push(Tag::new(String::from("highway"), String::from("service")));

        ww.handle(w);
        let tms = ww.done().unwrap();

        assert!(inserter.rows().is_empty());
        //NotFound is not reported as an error
        for (_, o) in &tms.others {
            match o {
                OtherData::Errors(ee) => {
                    panic!("unexpected errors: {:?}", ee);
                }
                _ => {}
            }
        }
    }

    #[test]
    fn test_open_way_no_polygon_row() {
        let inserter = Arc::new(CollectingInserter::new());
        let mut ww = writer_for(inserter.clone(), Arc::new(InsertedWays::new()));

        let mut w = Way::new(8);
        w.refs = vec![1, 2, 3];
        w.tags.push(Tag::new(String::from("landuse"), String::from("grass")));

        ww.handle(w);
        ww.done().unwrap();

        assert!(inserter.rows().is_empty());
    }
}
