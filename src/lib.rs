pub mod error;
pub mod logging;
pub mod utils;
pub mod workers;

pub mod cache;
pub mod elements;
pub mod geometry;
pub mod mapping;
pub mod writer;
