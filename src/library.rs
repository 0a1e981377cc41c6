//! Track catalog and directory import.
//!
//! The `Catalog` owns every `Track` in the current session; the playback
//! session only ever holds an index into it. `scan` builds tracks from a
//! directory on disk.

mod display;
mod model;
mod scan;

pub use display::display_from_fields;
pub use model::{Catalog, Track};
pub use scan::scan;
