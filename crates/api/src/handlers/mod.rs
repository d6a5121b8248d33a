pub mod lyrics;
pub mod music;
