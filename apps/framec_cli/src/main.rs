//! framec CLI - standalone binary.
//!
//! A thin wrapper around [`framec_cli::run_cli`], handling error display
//! and exit codes. All command logic lives in the library crate.
//!
//! # Exit Codes
//!
//! - `0` - Success
//! - `1` - Error (message printed to stderr)

fn main() {
    if let Err(e) = framec_cli::run_cli() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
