use crate::elements::Node;
use crate::error::Result;
use crate::geometry::{node_to_srid, point_geometry};
use crate::mapping::TagMatcher;
use crate::message;
use crate::utils::CpuTimer;
use crate::workers::{ElementSink, WorkerPool};
use crate::writer::{warn_level, InsertRow, OtherData, Timings, WriterOptions};

use std::sync::Arc;

/// Matches, projects and inserts tagged nodes as points.
pub struct NodeWriter {
    opts: WriterOptions,
    matcher: Arc<TagMatcher>,

    count: usize,
    errs: Vec<(i64, String)>,
    tm: f64,
}

impl NodeWriter {
    pub fn new(opts: WriterOptions, matcher: Arc<TagMatcher>) -> NodeWriter {
        NodeWriter {
            opts: opts,
            matcher: matcher,
            count: 0,
            errs: Vec::new(),
            tm: 0.0,
        }
    }

    fn process_node(&mut self, mut n: Node) {
        self.count += 1;

        let matches = self.matcher.match_tags(&n.tags);
        if matches.is_empty() {
            return;
        }

        node_to_srid(self.opts.srid, &mut n);

        match &self.opts.expireor {
            Some(exp) => {
                exp.expire(n.lon, n.lat);
            }
            None => {}
        }

        let geom = match point_geometry(&n, self.opts.srid) {
            Ok(g) => g,
            Err(e) => {
                warn_level("node", n.id, &e, &mut self.errs);
                return;
            }
        };
        match &self.opts.limiter {
            Some(lim) => match lim.clip(&geom.geom) {
                Err(e) => {
                    warn_level("node", n.id, &e, &mut self.errs);
                }
                Ok(parts) => {
                    if parts.len() >= 1 {
                        let row = InsertRow {
                            id: n.id,
                            tags: &n.tags,
                            geom: Some(&geom),
                        };
                        match self.opts.inserter.insert_point(row, &matches) {
                            Err(e) => {
                                warn_level("node", n.id, &e, &mut self.errs);
                            }
                            Ok(()) => {}
                        }
                    }
                }
            },
            None => {
                let row = InsertRow {
                    id: n.id,
                    tags: &n.tags,
                    geom: Some(&geom),
                };
                match self.opts.inserter.insert_point(row, &matches) {
                    Err(e) => {
                        warn_level("node", n.id, &e, &mut self.errs);
                    }
                    Ok(()) => {}
                }
            }
        }
    }
}

impl ElementSink for NodeWriter {
    type Elem = Node;
    type Output = Timings;

    fn handle(&mut self, n: Node) {
        let tx = CpuTimer::start();
        self.process_node(n);
        self.tm += tx.elapsed();
    }

    fn done(&mut self) -> Result<Timings> {
        let mut tms = Timings::new();
        tms.add("NodeWriter", self.tm);
        tms.add_other(
            "NodeWriter",
            OtherData::Messages(vec![format!("processed {} nodes", self.count)]),
        );
        if !self.errs.is_empty() {
            message!("NodeWriter: {} errors", self.errs.len());
            tms.add_other(
                "NodeWriter",
                OtherData::Errors(std::mem::take(&mut self.errs)),
            );
        }
        Ok(tms)
    }
}

/// Node writer pool; nodes usually take a single worker.
pub fn make_node_writer(
    opts: WriterOptions,
    matcher: Arc<TagMatcher>,
    numchan: usize,
) -> WorkerPool<Node, Timings> {
    WorkerPool::spawn(numchan, move |_| {
        NodeWriter::new(opts.clone(), matcher.clone())
    })
}
