//! Helper functions for URLs and dates used by the generator and templates

mod date;
mod url;

pub use date::*;
pub use url::*;
