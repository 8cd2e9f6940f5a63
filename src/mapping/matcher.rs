use crate::elements::{ElementType, Relation, Tag};
use crate::mapping::config::{ElementFilter, Key, Mapping, TableType, Value, ANY_VALUE};

use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Eq, PartialEq, Clone)]
pub struct DestTable {
    pub name: String,
    pub sub_mapping: String,
}

impl DestTable {
    pub fn new(name: &str, sub_mapping: &str) -> DestTable {
        DestTable {
            name: String::from(name),
            sub_mapping: String::from(sub_mapping),
        }
    }
}

/// key -> value -> destination tables, merged over every table of one
/// geometry type.
pub type TagTables = BTreeMap<Key, BTreeMap<Value, Vec<DestTable>>>;

#[derive(Debug, Eq, PartialEq, Clone, Ord, PartialOrd)]
pub struct Match {
    pub table: String,
    pub sub_mapping: String,
}

fn add_from_mapping(tt: &mut TagTables, mapping: &BTreeMap<Key, Vec<Value>>, table: &DestTable) {
    for (key, vals) in mapping {
        for v in vals {
            match tt.get_mut(key) {
                Some(by_val) => match by_val.get_mut(v) {
                    Some(tables) => {
                        tables.push(table.clone());
                    }
                    None => {
                        by_val.insert(v.clone(), vec![table.clone()]);
                    }
                },
                None => {
                    let mut by_val = BTreeMap::new();
                    by_val.insert(v.clone(), vec![table.clone()]);
                    tt.insert(key.clone(), by_val);
                }
            }
        }
    }
}

impl Mapping {
    fn collect_tag_tables(&self, table_type: TableType) -> TagTables {
        let mut tt = TagTables::new();
        for (name, t) in &self.tables {
            if t.table_type != TableType::Geometry && t.table_type != table_type {
                continue;
            }

            add_from_mapping(&mut tt, &t.mapping, &DestTable::new(name, ""));

            for (sub_name, sub) in &t.mappings {
                add_from_mapping(&mut tt, &sub.mapping, &DestTable::new(name, sub_name));
            }

            let type_mapping = match table_type {
                TableType::Point => &t.type_mappings.points,
                TableType::LineString => &t.type_mappings.linestrings,
                TableType::Polygon => &t.type_mappings.polygons,
                TableType::Relation => &t.type_mappings.relations,
                TableType::Geometry => {
                    continue;
                }
            };
            add_from_mapping(&mut tt, type_mapping, &DestTable::new(name, ""));
        }
        tt
    }

    fn matcher(&self, table_type: TableType) -> TagMatcher {
        TagMatcher {
            tag_tables: self.collect_tag_tables(table_type),
            filters: self.element_filters(),
        }
    }

    pub fn point_matcher(&self) -> TagMatcher {
        self.matcher(TableType::Point)
    }

    pub fn line_string_matcher(&self) -> TagMatcher {
        self.matcher(TableType::LineString)
    }

    pub fn polygon_matcher(&self) -> TagMatcher {
        self.matcher(TableType::Polygon)
    }

    /// Matcher over the relation tables, used for street relations.
    pub fn relation_matcher(&self) -> TagMatcher {
        self.matcher(TableType::Relation)
    }
}

pub struct TagMatcher {
    tag_tables: TagTables,
    filters: BTreeMap<String, Vec<ElementFilter>>,
}

impl TagMatcher {
    pub fn match_tags(&self, tags: &[Tag]) -> Vec<Match> {
        let mut dests: Vec<&DestTable> = Vec::new();
        for t in tags {
            match self.tag_tables.get(&t.key) {
                None => {}
                Some(by_val) => {
                    match by_val.get(&t.val) {
                        Some(tables) => {
                            dests.extend(tables.iter());
                        }
                        None => {}
                    }
                    match by_val.get(ANY_VALUE) {
                        Some(tables) => {
                            dests.extend(tables.iter());
                        }
                        None => {}
                    }
                }
            }
        }

        let mut seen = BTreeSet::new();
        let mut res = Vec::new();
        for d in dests {
            if !seen.insert((d.name.clone(), d.sub_mapping.clone())) {
                continue;
            }
            if self.filters_pass(&d.name, tags) {
                res.push(Match {
                    table: d.name.clone(),
                    sub_mapping: d.sub_mapping.clone(),
                });
            }
        }
        res
    }

    fn filters_pass(&self, table: &str, tags: &[Tag]) -> bool {
        match self.filters.get(table) {
            None => true,
            Some(ff) => {
                for f in ff {
                    if !f(tags) {
                        return false;
                    }
                }
                true
            }
        }
    }
}

/// Way members whose own tags hit one of the tables the relation
/// matched: their rows are superseded by the relation polygon.
pub fn select_relation_polygons(matcher: &TagMatcher, rel: &Relation) -> Vec<i64> {
    let rel_matches = matcher.match_tags(&rel.tags);
    if rel_matches.is_empty() {
        return Vec::new();
    }
    let rel_tables: BTreeSet<&str> = rel_matches.iter().map(|m| m.table.as_str()).collect();

    let mut res = Vec::new();
    for m in &rel.members {
        if m.mem_type != ElementType::Way {
            continue;
        }
        match &m.way {
            None => {}
            Some(w) => {
                for wm in matcher.match_tags(&w.tags) {
                    if rel_tables.contains(wm.table.as_str()) {
                        res.push(w.id);
                        break;
                    }
                }
            }
        }
    }
    res
}
