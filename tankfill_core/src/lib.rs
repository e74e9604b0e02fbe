//! Core rust implementation of tankfill, a crate for placing liquid demands into tanks while
//! minimizing the capacity left stranded in the tightest tanks first.

pub mod allocation;
pub mod configuration;
pub mod io;
pub mod optimize;
