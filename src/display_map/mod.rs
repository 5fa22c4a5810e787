//! Display Map - Where lines and view zones end up on screen
//!
//! - **FoldMap**: Hides the lines of collapsed regions
//! - **ZoneMap**: Adds the height reserved by view zones below their anchor lines
//!
//! Both work in buffer lines and content-space pixels; the editor's scroll
//! offset and top margin are applied by the layout system.

mod fold_map;
mod zone_map;

pub use fold_map::*;
pub use zone_map::*;
