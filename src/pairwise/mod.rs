//! Pairwise option space: enumerate every unordered pair of engine options,
//! weight each pair, and persist the table for an external fuzz sampler.

pub mod catalog;
pub mod generator;
pub mod sampler;
pub mod table;
