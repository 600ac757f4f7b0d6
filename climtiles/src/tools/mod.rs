pub mod batch;
pub mod build;
pub mod probe;
