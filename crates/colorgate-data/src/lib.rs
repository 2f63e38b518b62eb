pub mod loader;
pub mod schema;

pub use loader::{DataLoadError, Format, LoadedLevel, find_level, load_level, parse_level};
