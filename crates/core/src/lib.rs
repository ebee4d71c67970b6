#![deny(warnings)]

pub mod classifier;
pub mod config;
pub mod decode;
pub mod dsp;
pub mod emotion;
pub mod feedback;
pub mod pipeline;
pub mod util;
pub mod voice;
