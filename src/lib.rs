pub mod compute;
pub mod config;
pub mod convert;
pub mod finance;
pub mod graph;
pub mod results;
pub mod runner;
