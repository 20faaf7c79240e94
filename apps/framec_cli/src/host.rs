//! A reference `wasmi`-backed host: the only piece of the workspace that
//! knows how to actually execute a compiled module.
//!
//! `framec-driver` defines what a host *is* ([`framec_driver::Host`]); this
//! module wires that trait to a real WASM engine, instantiating the two
//! imported functions and the `tstack` global every compiled module expects
//! and running `main` exactly once.

use std::error::Error;
use std::fmt;

use framec_driver::Host;
use wasmi::{Caller, Engine, Extern, Func, Global, Linker, Module, Mutability, Store, Value};

/// The default [`Host`]: writes straight to standard output, matching the
/// reference host's documented behavior for `print`/`print_bytes`.
#[derive(Default)]
pub struct StdoutHost;

impl Host for StdoutHost {
    fn print(&mut self, value: i64) {
        println!("{value}");
    }

    fn print_bytes(&mut self, bytes: &[u8]) {
        print!("{}", String::from_utf8_lossy(bytes));
    }
}

#[derive(Debug)]
pub struct RunError(String);

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Error for RunError {}

fn err(message: impl Into<String>) -> Box<dyn Error> {
    Box::new(RunError(message.into()))
}

/// Instantiates `wasm` against a fresh `wasmi` engine, wiring `env.print`,
/// `env.print_bytes`, and the `env.tstack` global to `host`, then calls the
/// module's exported `main` once.
pub fn run_module<H: Host + 'static>(wasm: &[u8], host: H) -> Result<(), Box<dyn Error>> {
    let engine = Engine::default();
    let module = Module::new(&engine, wasm).map_err(|e| err(format!("invalid module: {e}")))?;
    let mut store = Store::new(&engine, host);
    let mut linker = Linker::new(&engine);

    let print = Func::wrap(&mut store, |mut caller: Caller<'_, H>, value: i64| {
        caller.data_mut().print(value);
    });
    linker
        .define("env", "print", print)
        .map_err(|e| err(format!("linking env.print: {e}")))?;

    let print_bytes = Func::wrap(&mut store, |mut caller: Caller<'_, H>, ptr: i32, len: i32| {
        let memory = match caller.get_export("memory") {
            Some(Extern::Memory(m)) => m,
            _ => return,
        };
        let (start, end) = (ptr as usize, ptr as usize + len as usize);
        let bytes = memory.data(&caller)[start..end].to_vec();
        caller.data_mut().print_bytes(&bytes);
    });
    linker
        .define("env", "print_bytes", print_bytes)
        .map_err(|e| err(format!("linking env.print_bytes: {e}")))?;

    let tstack = Global::new(&mut store, Value::I32(0), Mutability::Var);
    linker
        .define("env", "tstack", tstack)
        .map_err(|e| err(format!("linking env.tstack: {e}")))?;

    let instance = linker
        .instantiate(&mut store, &module)
        .and_then(|pre| pre.start(&mut store))
        .map_err(|e| err(format!("instantiation failed: {e}")))?;

    let main = instance
        .get_typed_func::<(), ()>(&store, "main")
        .map_err(|_| err("module does not export a zero-argument 'main'"))?;
    main.call(&mut store, ())
        .map_err(|e| err(format!("trap during execution: {e}")))?;

    Ok(())
}
