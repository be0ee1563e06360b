//! Data model for LAPPS Interchange Format documents as they travel between
//! services: a discriminator plus either raw text or a container of views.

pub mod defs;

pub use defs::*;
