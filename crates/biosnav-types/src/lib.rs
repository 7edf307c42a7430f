//! Shared types for the biosnav console menu engine.

mod keys;
mod option;
mod profile;
mod tag;

pub use keys::*;
pub use option::*;
pub use profile::*;
pub use tag::*;
