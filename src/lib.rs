pub mod chrom_sizes;
pub mod config;
pub mod db;
pub mod domain;
pub mod entities;
pub mod error;
pub mod fs_util;
pub mod layout;
pub mod loader;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod study;
pub mod template;
