pub mod geocode;
pub mod map;
pub mod model;
pub mod places;
pub mod session;
