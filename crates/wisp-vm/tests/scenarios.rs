//! End-to-end interpreter scenarios: source text in, either a successful
//! run with specific stdout out, or a specific diagnostic out.

use std::io::Write;
use std::sync::{Arc, Mutex};

use wisp_vm::{InterpretError, Vm, VmConfig};

/// A `Write` sink backed by a shared buffer, so a test can read back exactly
/// what a `Vm` printed after the fact — spec §8's end-to-end scenarios are
/// defined by literal stdout text, not just pass/fail.
#[derive(Clone, Default)]
struct CapturedOutput(Arc<Mutex<Vec<u8>>>);

impl Write for CapturedOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.0.lock().unwrap().flush()
    }
}

impl CapturedOutput {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).expect("printed output is valid UTF-8")
    }
}

fn vm_with_capture() -> (Vm, CapturedOutput) {
    let capture = CapturedOutput::default();
    let vm = Vm::with_output(VmConfig::default(), Box::new(capture.clone()));
    (vm, capture)
}

#[test]
fn arithmetic_and_print() {
    let (mut vm, out) = vm_with_capture();
    vm.interpret("print 1 + 2 * 3;").unwrap();
    assert_eq!(out.text(), "7\n");
}

#[test]
fn string_interning_gives_identical_literals_equal_identity() {
    let (mut vm, out) = vm_with_capture();
    vm.interpret("print \"hi\" == \"hi\";").unwrap();
    assert_eq!(out.text(), "True\n");
}

#[test]
fn global_variables_survive_across_statements() {
    let (mut vm, out) = vm_with_capture();
    vm.interpret("var greeting = \"hello\"; var name = \"world\"; print greeting + \" \" + name;")
        .unwrap();
    assert_eq!(out.text(), "hello world\n");
}

#[test]
fn undefined_variable_reports_runtime_error_with_source_line() {
    let mut vm = Vm::default();
    let err = vm.interpret("print 1;\nprint undefined_name;").unwrap_err();
    let InterpretError::Runtime(message) = err else {
        panic!("expected a runtime error");
    };
    assert!(message.contains("Undefined variable 'undefined_name'"));
    assert!(message.contains("[line 2]"));
}

#[test]
fn missing_semicolon_is_a_compile_error_not_a_panic() {
    let mut vm = Vm::default();
    let err = vm.interpret("var x = 1 print x;").unwrap_err();
    assert!(matches!(err, InterpretError::Compile(_)));
}

#[test]
fn a_failed_compile_does_not_poison_the_vm_for_the_next_run() {
    let mut vm = Vm::default();
    assert!(vm.interpret("1 +;").is_err());
    assert!(vm.interpret("print 1 + 1;").is_ok());
}

#[test]
fn truthiness_treats_zero_and_empty_string_as_truthy() {
    let (mut vm, out) = vm_with_capture();
    vm.interpret("print !0; print !\"\"; print !None;").unwrap();
    assert_eq!(out.text(), "False\nFalse\nTrue\n");
}

#[test]
fn comparison_chains_and_boolean_literals() {
    let (mut vm, out) = vm_with_capture();
    vm.interpret("print 1 < 2; print 2 <= 2; print 3 > 4; print True; print False;").unwrap();
    assert_eq!(out.text(), "True\nTrue\nFalse\nTrue\nFalse\n");
}
