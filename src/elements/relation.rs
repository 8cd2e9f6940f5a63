use crate::elements::geometry::Geometry;
use crate::elements::tags::Tag;
use crate::elements::way::Way;

#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum ElementType {
    Node,
    Way,
    Relation,
}

impl ElementType {
    pub fn from_int(i: u64) -> ElementType {
        match i {
            0 => ElementType::Node,
            1 => ElementType::Way,
            2 => ElementType::Relation,
            _ => {
                panic!("wrong ElementType {}", i);
            }
        }
    }

    pub fn as_int(&self) -> u64 {
        match self {
            ElementType::Node => 0,
            ElementType::Way => 1,
            ElementType::Relation => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub role: String,
    pub mem_type: ElementType,
    pub mem_ref: i64,
    /// Resolved by the way cache before ring building; only ever set
    /// for way members.
    pub way: Option<Way>,
}

impl Member {
    pub fn new(role: String, mem_type: ElementType, mem_ref: i64) -> Member {
        Member {
            role,
            mem_type,
            mem_ref,
            way: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    pub id: i64,
    pub tags: Vec<Tag>,
    pub members: Vec<Member>,
    pub geom: Option<Geometry>,
}

impl Relation {
    pub fn new(id: i64) -> Relation {
        Relation {
            id: id,
            tags: Vec::new(),
            members: Vec::new(),
            geom: None,
        }
    }
}
