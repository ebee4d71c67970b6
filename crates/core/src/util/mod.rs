pub mod scratch;
pub mod stats;

pub use scratch::{sanitize_stem, scratch_file};
pub use stats::{mean, population_std, round_to};
