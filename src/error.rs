use std::fmt;

/// Crate wide error type. `level()` drives log suppression in the
/// writers: level 0 errors are expected data-quality conditions
/// (incomplete relations, cache misses) and are dropped silently.
#[derive(Debug)]
pub enum Error {
    NoRing,
    NotFound,
    Degenerate(String),
    Geometry(String),
    Wkb(String),
    InvalidInput(String),
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl Error {
    pub fn level(&self) -> i32 {
        match self {
            Error::NoRing | Error::NotFound | Error::Degenerate(_) => 0,
            _ => 1,
        }
    }
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::convert::From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl std::convert::From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
