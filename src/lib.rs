pub mod app;
pub mod chrom;
pub mod config;
pub mod domain;
pub mod eclip;
pub mod encode;
pub mod error;
pub mod gtf;
pub mod join;
pub mod metadata;
pub mod output;
pub mod store;
