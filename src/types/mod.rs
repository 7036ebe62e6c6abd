pub mod activity;
pub mod series;
