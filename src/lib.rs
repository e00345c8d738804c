// lib.rs
pub mod bam;
pub mod breakpoint;
pub mod cluster;
pub mod config;
pub mod extract;
pub mod grid;
pub mod output;
pub mod segment;
