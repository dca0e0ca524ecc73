//! Prebuilt simulations on top of `dsarch_core`, with a command-line driver
//! that runs them and prints their traffic reports.

pub mod cli;

pub mod report;
pub use report::Report;

pub mod simulations;
pub use simulations::SimConfig;
