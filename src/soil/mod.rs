pub mod matcher;

pub use matcher::{match_soil, SoilMatch, SoilReading};
