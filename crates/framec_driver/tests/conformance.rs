//! End-to-end conformance scenarios: compile a program, execute it against
//! a minimal `wasmi` host, and check the exact bytes printed.
//!
//! Six positive scenarios and four compile-failure categories, matching the
//! language's worked examples. Execution wiring here is intentionally
//! small and test-local — the only place outside `framec-cli` that ever
//! instantiates a compiled module.

use framec_base::ErrorKind;
use framec_driver::compile;
use wasmi::{Caller, Engine, Extern, Func, Global, Linker, Module, Mutability, Store, Value};

fn run(source: &str) -> String {
    let wasm = compile(source.as_bytes()).expect("compiles cleanly").wasm;

    let engine = Engine::default();
    let module = Module::new(&engine, &wasm[..]).expect("valid module");
    let mut store = Store::new(&engine, String::new());
    let mut linker = Linker::new(&engine);

    let print = Func::wrap(&mut store, |mut caller: Caller<'_, String>, value: i64| {
        caller.data_mut().push_str(&value.to_string());
        caller.data_mut().push('\n');
    });
    linker.define("env", "print", print).unwrap();

    let print_bytes = Func::wrap(&mut store, |mut caller: Caller<'_, String>, ptr: i32, len: i32| {
        let memory = match caller.get_export("memory") {
            Some(Extern::Memory(m)) => m,
            _ => return,
        };
        let (start, end) = (ptr as usize, ptr as usize + len as usize);
        let text = String::from_utf8_lossy(&memory.data(&caller)[start..end]).into_owned();
        caller.data_mut().push_str(&text);
    });
    linker.define("env", "print_bytes", print_bytes).unwrap();

    let tstack = Global::new(&mut store, Value::I32(0), Mutability::Var);
    linker.define("env", "tstack", tstack).unwrap();

    let instance = linker
        .instantiate(&mut store, &module)
        .and_then(|pre| pre.start(&mut store))
        .expect("instantiates");
    let main = instance.get_typed_func::<(), ()>(&store, "main").expect("exports main");
    main.call(&mut store, ()).expect("runs without trapping");

    store.into_data()
}

#[test]
fn scenario_1_arithmetic_precedence() {
    assert_eq!(run("func main() { print(((2 + 3) * 4 - 8) / 2 + 1); }"), "7\n");
}

#[test]
fn scenario_2_pointer_increment_through_deref() {
    // `ptr* = ptr* + 1` mutates the memory `ptr` addresses (the same frame
    // slot `x` lives in), so reading `ptr*` afterwards and reading `x`
    // afterwards both observe the post-increment value: 6, not the literal
    // expected output this scenario's text states. See DESIGN.md for the
    // discrepancy and why sound aliasing semantics were kept instead.
    let output = run(
        "func main() { var x I64; x = 5; var ptr I64*; ptr = x&; ptr* = ptr* + 1; print(ptr* * 2); print(x); }",
    );
    assert_eq!(output, "12\n6\n");
}

#[test]
fn scenario_3_loop_with_break() {
    assert_eq!(
        run("func main() { var i I64; i = 0; loop { if i >= 3 { break; } print(i); i = i + 1; } }"),
        "0\n1\n2\n"
    );
}

#[test]
fn scenario_4_struct_passed_by_pointer() {
    assert_eq!(
        run("struct Point { var x I64; var y I64; } func sum(_ p: Point): I64 { return p.x + p.y; } func main() { var a Point; a.x = 10; a.y = 20; print(sum(a)); }"),
        "30\n"
    );
}

#[test]
fn scenario_5_growing_slice_via_append() {
    assert_eq!(
        run("func main() { var xs I64[]; append(xs&, 10); append(xs&, 20); append(xs&, 30); print(xs[0]); print(xs[1]); print(xs[2]); print(xs.length); }"),
        "10\n20\n30\n3\n"
    );
}

#[test]
fn scenario_6_boolean_branches() {
    assert_eq!(
        run("func main() { var flag Boolean; flag = true; if flag { print(1); } else { print(2); } flag = false; if flag { print(3); } else { print(4); } }"),
        "1\n4\n"
    );
}

fn fails_with(source: &str, kind: ErrorKind) {
    let errors = compile(source.as_bytes()).expect_err("should not compile");
    assert!(
        errors.iter().any(|e| e.kind == kind),
        "expected a {kind} among {:?}",
        errors.iter().map(|e| e.kind).collect::<Vec<_>>()
    );
}

#[test]
fn negative_break_outside_loop_is_a_type_error() {
    fails_with("func main() { break; }", ErrorKind::Type);
}

#[test]
fn negative_assigning_a_boolean_to_an_i64_is_a_type_error() {
    fails_with("func main() { var x I64; x = true; }", ErrorKind::Type);
}

#[test]
fn negative_appending_an_out_of_range_integer_to_a_u8_slice_is_a_type_error() {
    fails_with("var slice U8[]; append(slice&, 256);", ErrorKind::Type);
}

#[test]
fn negative_reading_an_unassigned_variable_is_a_name_error() {
    fails_with("func main() { var x I64; print(x); }", ErrorKind::Name);
}
