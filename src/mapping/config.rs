use crate::elements::{get_tag, Tag};
use crate::error::Result;
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufReader, Read};

pub type Key = String;
pub type Value = String;

/// Tag value wildcard: any value of the key matches.
pub const ANY_VALUE: &str = "__any__";
/// Filter value wildcard: matches when the key is absent.
pub const NIL_VALUE: &str = "__nil__";

#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum TableType {
    Point,
    LineString,
    Polygon,
    Geometry,
    Relation,
}

impl TableType {
    pub fn as_str(&self) -> &str {
        match self {
            TableType::Point => "point",
            TableType::LineString => "linestring",
            TableType::Polygon => "polygon",
            TableType::Geometry => "geometry",
            TableType::Relation => "",
        }
    }
}

impl Default for TableType {
    fn default() -> TableType {
        TableType::Relation
    }
}

impl Serialize for TableType {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TableType {
    fn deserialize<D>(deserializer: D) -> std::result::Result<TableType, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "point" => Ok(TableType::Point),
            "linestring" => Ok(TableType::LineString),
            "polygon" => Ok(TableType::Polygon),
            "geometry" => Ok(TableType::Geometry),
            _ => Err(serde::de::Error::custom(format!(
                "unknown table type \"{}\"",
                s
            ))),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Column {
    pub name: String,
    #[serde(default)]
    pub key: Key,
    #[serde(default)]
    pub keys: Vec<Key>,
    #[serde(rename = "type")]
    pub col_type: String,
    #[serde(default)]
    pub args: Option<serde_json::Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Filters {
    #[serde(default)]
    pub exclude_tags: Option<Vec<[String; 2]>>,
    #[serde(default)]
    pub include_tags: Option<Vec<[String; 2]>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct SubMapping {
    #[serde(default)]
    pub mapping: BTreeMap<Key, Vec<Value>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct TypeMappings {
    #[serde(default)]
    pub points: BTreeMap<Key, Vec<Value>>,
    #[serde(default)]
    pub linestrings: BTreeMap<Key, Vec<Value>>,
    #[serde(default)]
    pub polygons: BTreeMap<Key, Vec<Value>>,
    #[serde(default)]
    pub relations: BTreeMap<Key, Vec<Value>>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Table {
    #[serde(skip)]
    pub name: String,
    /// Absent means a relation table.
    #[serde(rename = "type", default)]
    pub table_type: TableType,
    #[serde(default)]
    pub mapping: BTreeMap<Key, Vec<Value>>,
    #[serde(default)]
    pub mappings: BTreeMap<String, SubMapping>,
    #[serde(default)]
    pub type_mappings: TypeMappings,
    #[serde(default)]
    pub columns: Vec<Column>,
    //TODO drop the deprecated "fields" spelling once mapping files
    //have migrated
    #[serde(default, rename = "fields")]
    pub old_columns: Option<Vec<Column>>,
    #[serde(default)]
    pub filters: Option<Filters>,
}

impl Table {
    /// Tag keys this table reads beyond its mapping keys.
    pub fn extra_tags(&self) -> BTreeSet<Key> {
        let mut tags = BTreeSet::new();
        for c in &self.columns {
            if !c.key.is_empty() {
                tags.insert(c.key.clone());
            }
            for k in &c.keys {
                tags.insert(k.clone());
            }
        }
        tags
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GeneralizedTable {
    #[serde(skip)]
    pub name: String,
    #[serde(rename = "source")]
    pub source_table_name: String,
    #[serde(default)]
    pub tolerance: f64,
    #[serde(default)]
    pub sql_filter: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Tags {
    #[serde(default)]
    pub load_all: bool,
    #[serde(default)]
    pub exclude: Vec<Key>,
    #[serde(default)]
    pub include: Vec<Key>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Mapping {
    #[serde(default)]
    pub tables: BTreeMap<String, Table>,
    #[serde(default)]
    pub generalized_tables: BTreeMap<String, GeneralizedTable>,
    #[serde(default)]
    pub tags: Tags,
    /// Mangles the overlapping node/way/relation ids to be unique
    /// (nodes positive, ways negative, relations negative offset).
    #[serde(default, rename = "use_single_id_space")]
    pub single_id_space: bool,
}

pub type ElementFilter = Box<dyn Fn(&[Tag]) -> bool + Send + Sync>;

impl Mapping {
    pub fn from_reader<R: Read>(reader: R) -> Result<Mapping> {
        let mut mapping: Mapping = serde_json::from_reader(reader)?;
        mapping.prepare();
        Ok(mapping)
    }

    pub fn from_file(infn: &str) -> Result<Mapping> {
        let ff = File::open(infn)?;
        let fbuf = BufReader::new(ff);
        Mapping::from_reader(fbuf)
    }

    fn prepare(&mut self) {
        for (name, t) in self.tables.iter_mut() {
            t.name = name.clone();
            match t.old_columns.take() {
                Some(cols) => {
                    t.columns = cols;
                }
                None => {}
            }
        }
        for (name, t) in self.generalized_tables.iter_mut() {
            t.name = name.clone();
        }
    }

    pub fn element_filters(&self) -> BTreeMap<String, Vec<ElementFilter>> {
        let mut result: BTreeMap<String, Vec<ElementFilter>> = BTreeMap::new();
        for (name, t) in &self.tables {
            let filters = match &t.filters {
                None => {
                    continue;
                }
                Some(f) => f,
            };
            if let Some(exclude) = &filters.exclude_tags {
                for kv in exclude {
                    let key = kv[0].clone();
                    let val = kv[1].clone();
                    let f: ElementFilter = Box::new(move |tags: &[Tag]| match get_tag(tags, &key) {
                        Some(v) => !(val == ANY_VALUE || v == val),
                        None => val != NIL_VALUE,
                    });
                    result.entry(name.clone()).or_insert_with(Vec::new).push(f);
                }
            }
            if let Some(include) = &filters.include_tags {
                for kv in include {
                    let key = kv[0].clone();
                    let val = kv[1].clone();
                    let f: ElementFilter = Box::new(move |tags: &[Tag]| match get_tag(tags, &key) {
                        Some(v) => val == ANY_VALUE || v == val,
                        None => false,
                    });
                    result.entry(name.clone()).or_insert_with(Vec::new).push(f);
                }
            }
        }
        result
    }
}
