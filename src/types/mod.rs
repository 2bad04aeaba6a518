pub mod granularity;
pub mod station;
