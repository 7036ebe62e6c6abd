pub mod parse;
pub mod process;
pub mod series;
pub mod timestamp;
