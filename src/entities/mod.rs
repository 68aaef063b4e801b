//! Entity module - SeaORM table definitions for the relational backend.
//!
//! One table per entity kind plus the `place_amenity` junction table. Every
//! parent/child relation is declared with `ON DELETE CASCADE` so the schema itself
//! removes dependents: states -> cities -> places -> reviews, users -> places/reviews,
//! and junction rows when either a place or an amenity goes away.

pub mod amenity;
pub mod city;
pub mod place;
pub mod place_amenity;
pub mod review;
pub mod state;
pub mod user;

pub use amenity::Entity as AmenityTable;
pub use city::Entity as CityTable;
pub use place::Entity as PlaceTable;
pub use place_amenity::Entity as PlaceAmenityTable;
pub use review::Entity as ReviewTable;
pub use state::Entity as StateTable;
pub use user::Entity as UserTable;
