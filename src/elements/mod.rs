mod geometry;
mod node;
mod relation;
mod tags;
mod way;

pub use geometry::Geometry;
pub use node::Node;
pub use relation::{ElementType, Member, Relation};
pub use tags::{get_tag, has_tag_value, set_tag, Tag};
pub use way::Way;

/// Offset applied to relation ids in single-id-space mode, keeping them
/// clear of the node and (negated) way id ranges.
pub const REL_ID_OFFSET: i64 = -100_000_000_000_000_000;
