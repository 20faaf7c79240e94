//! framec CLI (`framec`): argument parsing and command dispatch.
//!
//! Command logic lives in small `cmd_*` functions so the library crate
//! stays testable independent of the binary entry point.

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::host::{run_module, StdoutHost};

#[derive(Parser)]
#[command(name = "framec")]
#[command(about = "A compiler for a small WebAssembly-targeting language", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile and immediately run a source file.
    Run {
        /// Path to the source file.
        file: PathBuf,
    },

    /// Compile a source file to a WASM module on disk.
    Build {
        /// Path to the source file.
        file: PathBuf,

        /// Output path for the compiled module. Defaults to the input
        /// file's name with a `.wasm` extension.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Compile and run a source snippet passed directly on the command line.
    Eval {
        /// Source text to compile and run.
        code: String,
    },

    /// Parse and resolve a source file without emitting a module.
    Check {
        /// Path to the source file.
        file: PathBuf,
    },
}

pub fn run_cli() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run { file } => cmd_run(&file),
        Commands::Build { file, output } => cmd_build(&file, output.as_deref()),
        Commands::Eval { code } => cmd_eval(&code),
        Commands::Check { file } => cmd_check(&file),
    }
}

fn compile_file(path: &std::path::Path) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let source = fs::read(path).map_err(|e| format!("reading {}: {e}", path.display()))?;
    let output = framec_driver::compile(&source)
        .map_err(|errors| framec_driver::diagnostic::render_errors(&errors))?;
    for warning in &output.warnings {
        eprintln!("{}", framec_driver::diagnostic::render_warning(warning));
    }
    Ok(output.wasm)
}

fn cmd_run(file: &std::path::Path) -> Result<(), Box<dyn std::error::Error>> {
    let wasm = compile_file(file)?;
    run_module(&wasm, StdoutHost)
}

fn cmd_build(file: &std::path::Path, output: Option<&std::path::Path>) -> Result<(), Box<dyn std::error::Error>> {
    let wasm = compile_file(file)?;
    let out = match output {
        Some(path) => path.to_path_buf(),
        None => file.with_extension("wasm"),
    };
    fs::write(&out, wasm).map_err(|e| format!("writing {}: {e}", out.display()))?;
    println!("wrote {}", out.display());
    Ok(())
}

fn cmd_eval(code: &str) -> Result<(), Box<dyn std::error::Error>> {
    let output = framec_driver::compile(code.as_bytes())
        .map_err(|errors| framec_driver::diagnostic::render_errors(&errors))?;
    for warning in &output.warnings {
        eprintln!("{}", framec_driver::diagnostic::render_warning(warning));
    }
    run_module(&output.wasm, StdoutHost)
}

fn cmd_check(file: &std::path::Path) -> Result<(), Box<dyn std::error::Error>> {
    compile_file(file)?;
    println!("{}: no errors", file.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn build_writes_a_wasm_module_next_to_the_source_by_default() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("main.fc");
        fs::write(&src, "func main() { print(1); }").unwrap();

        cmd_build(&src, None).unwrap();

        let wasm = fs::read(src.with_extension("wasm")).unwrap();
        assert_eq!(&wasm[0..4], b"\0asm");
    }

    #[test]
    fn check_reports_failure_for_an_unresolved_identifier() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("main.fc");
        fs::write(&src, "func main() { print(missing); }").unwrap();

        assert!(cmd_check(&src).is_err());
    }
}
