pub mod batch;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod country;
pub mod datacenter;
pub mod error;
pub mod geo;
pub mod mapping;
pub mod pipeline;
pub mod proximity;
pub mod refine;
pub mod report;
pub mod selector;
pub mod util;
