pub mod pipeline;
pub mod view;

#[cfg(feature = "charts")]
pub mod charts;
