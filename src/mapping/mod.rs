mod config;
mod matcher;

pub use config::{
    Column, ElementFilter, Filters, GeneralizedTable, Key, Mapping, SubMapping, Table, TableType,
    Tags, TypeMappings, Value, ANY_VALUE, NIL_VALUE,
};
pub use matcher::{select_relation_polygons, DestTable, Match, TagMatcher, TagTables};
