pub mod error;
pub mod geocoder;
pub mod place;
