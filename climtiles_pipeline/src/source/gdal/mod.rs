//! GDAL-backed reprojection of arbitrary georeferenced rasters.

mod instance;
mod resample;
mod source;
mod spatial_ref;

pub use resample::ResampleAlg;
pub use source::{GdalReprojector, GdalSource};

use instance::Instance;
use spatial_ref::get_spatial_ref;
