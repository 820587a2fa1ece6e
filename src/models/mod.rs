pub mod image;
pub mod location;
pub mod prediction;
pub mod property;
pub mod property_type;
pub mod user;
