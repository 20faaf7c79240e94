//! framec CLI (`framec`)
//!
//! Command-line front end for the framec compiler: `run`, `build`, `eval`,
//! and `check`. This crate is the only place in the workspace that depends
//! on a concrete WASM runtime (`wasmi`) — the core compiler (`framec-driver`
//! and below) never references it, per the driver's [`Host`] boundary.
//!
//! [`Host`]: framec_driver::Host

pub mod cli;
pub mod host;

pub use cli::run_cli;
