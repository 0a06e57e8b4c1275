pub mod fetch;
pub mod params;
pub mod run;
