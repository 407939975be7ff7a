pub mod params;
pub mod run;
