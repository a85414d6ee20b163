pub mod sighting;
pub mod summary;
