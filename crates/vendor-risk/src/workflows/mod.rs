pub mod assessment;
pub mod batch;
