//! SeaORM entities for the restaurant backend.

pub mod entities;
