//! Contains coordinates, bounding boxes, tile ranges, raster windows and format types.

mod constants;
pub use constants::*;

mod mercator_bbox;
pub use mercator_bbox::*;

mod raster_format;
pub use raster_format::*;

mod raster_window;
pub use raster_window::*;

mod tile_coord;
pub use tile_coord::*;

mod tile_range;
pub use tile_range::*;

mod zoom_range;
pub use zoom_range::*;
