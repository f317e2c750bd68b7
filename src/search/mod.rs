//! Vector index loading and the search pipeline built on it.

pub mod ids;
pub mod index;
pub mod locate;
pub mod pipeline;
