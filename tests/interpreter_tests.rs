use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use rill::{
    lexer, parser, resolver, run_source, DebugOptions, ErrorCode, ErrorReporter, Interpreter,
    RillError, RunOutcome,
};

/// Capturing stand-in for stdout so tests can assert on printed output.
#[derive(Clone, Default)]
struct SharedOutput(Rc<RefCell<Vec<u8>>>);

impl SharedOutput {
    fn text(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).expect("printed output is utf-8")
    }
}

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn capturing_interpreter() -> (Interpreter, SharedOutput) {
    let output = SharedOutput::default();
    let interpreter = Interpreter::with_output(Box::new(output.clone()));
    (interpreter, output)
}

fn run(source: &str) -> (String, RunOutcome) {
    let (mut interpreter, output) = capturing_interpreter();
    let outcome = run_source(&mut interpreter, source, DebugOptions::default());
    (output.text(), outcome)
}

fn stdout_of(source: &str) -> String {
    let (text, outcome) = run(source);
    match outcome {
        RunOutcome::Completed(ErrorCode::NoError) => text,
        other => panic!("run of {source:?} ended with {other:?}, output so far: {text:?}"),
    }
}

fn exit_code_of(source: &str) -> ErrorCode {
    match run(source).1 {
        RunOutcome::Completed(code) => code,
        RunOutcome::TopLevelReturn(_) => ErrorCode::NoError,
    }
}

/// Run the pipeline without the driver so the runtime error itself is
/// visible to assertions.
fn runtime_error_of(source: &str) -> RillError {
    let mut reporter = ErrorReporter::new();
    let tokens = lexer::scan(source, &mut reporter);
    let program = parser::parse(tokens, &mut reporter);
    assert!(!reporter.had_error(), "{source:?} should scan and parse");

    let (mut interpreter, _output) = capturing_interpreter();
    resolver::resolve(&program, interpreter.locations_mut());
    interpreter
        .interpret(&program)
        .expect_err("expected a runtime error")
}

// Language basics --------------------------------------------------------

#[test]
fn arithmetic_precedence() {
    assert_eq!(stdout_of("print 1 + 2 * 3;"), "7.000000\n");
}

#[test]
fn string_concatenation() {
    assert_eq!(
        stdout_of("var a = \"foo\"; var b = \"bar\"; print a + b;"),
        "foobar\n"
    );
}

#[test]
fn tuple_declaration_destructures() {
    assert_eq!(
        stdout_of("var a, b = 1, 2; print a; print b;"),
        "1.000000\n2.000000\n"
    );
}

#[test]
fn counter_closure_keeps_state() {
    let source = "fun make { var i = 0; fun { i = i + 1; return i; } } \
                  var c = make(); print c(); print c(); print c();";
    assert_eq!(stdout_of(source), "1.000000\n2.000000\n3.000000\n");
}

#[test]
fn for_loop_prints_each_step() {
    assert_eq!(
        stdout_of("for (var i = 0; i < 3; i = i + 1) print i;"),
        "0.000000\n1.000000\n2.000000\n"
    );
}

#[test]
fn tuple_value_destructures_on_declaration() {
    assert_eq!(
        stdout_of("var t = 1, 2, 3; var a, b, c = t; print a + b + c;"),
        "6.000000\n"
    );
}

#[test]
fn send_call_passes_the_receiver() {
    assert_eq!(
        stdout_of("fun id x { return x; } print 5 -> id;"),
        "5.000000\n"
    );
}

// Scoping and logic ------------------------------------------------------

#[test]
fn scope_shadowing() {
    assert_eq!(
        stdout_of("var x = 1; { var x = 2; print x; } print x;"),
        "2.000000\n1.000000\n"
    );
}

#[test]
fn short_circuit_skips_the_right_operand() {
    let source = "var calls = 0; \
                  fun bump { calls = calls + 1; return true; } \
                  var a = false and bump(); \
                  var b = true or bump(); \
                  print calls;";
    assert_eq!(stdout_of(source), "0.000000\n");
}

#[test]
fn non_short_circuit_branch_runs_and_returns_right_value() {
    let source = "var calls = 0; \
                  fun bump { calls = calls + 1; return 7; } \
                  print true and bump(); \
                  print calls;";
    assert_eq!(stdout_of(source), "7.000000\n1.000000\n");
}

#[test]
fn logical_short_circuit_branch_is_boolean() {
    // Truthy left of `or` collapses to `true`; falsy left of `and` to
    // `false`. The other branch passes the right value through untouched.
    assert_eq!(stdout_of("print 1 or 2;"), "true\n");
    assert_eq!(stdout_of("print nil and 2;"), "false\n");
    assert_eq!(stdout_of("print false or 2;"), "2.000000\n");
}

#[test]
fn truthiness_of_values() {
    assert_eq!(stdout_of("print !nil;"), "true\n");
    assert_eq!(stdout_of("print !false;"), "true\n");
    assert_eq!(stdout_of("print !0;"), "false\n");
    assert_eq!(stdout_of("print !\"\";"), "false\n");
}

// Destructuring ----------------------------------------------------------

#[test]
fn single_name_takes_a_tuple_whole() {
    assert_eq!(stdout_of("var a = 1, 2, 3; print a;"), "(1.000000, 2.000000, 3.000000)\n");
}

#[test]
fn missing_elements_bind_to_nil() {
    assert_eq!(stdout_of("var a, b, c = 1, 2; print c;"), "nil\n");
}

#[test]
fn nested_patterns_destructure_nested_tuples() {
    assert_eq!(
        stdout_of("var t = 1, 2; var (a, b) = t; print a + b;"),
        "3.000000\n"
    );
}

#[test]
fn decomposing_a_non_tuple_fails() {
    let error = runtime_error_of("var a, b = 5;");
    assert_eq!(
        error.to_string(),
        "[line 1] Runtime error: can only decompose tuples"
    );
}

#[test]
fn too_many_elements_fail_to_bind() {
    let error = runtime_error_of("var a, b = 1, 2, 3;");
    assert_eq!(
        error.to_string(),
        "[line 1] Runtime error: too many arguments to bind"
    );
}

#[test]
fn assignment_destructures_too() {
    assert_eq!(
        stdout_of("var a; var b; a, b = 3, 4; print a; print b;"),
        "3.000000\n4.000000\n"
    );
}

#[test]
fn assignment_yields_the_assigned_value() {
    assert_eq!(stdout_of("var a; print a = 5;"), "5.000000\n");
}

// Calls ------------------------------------------------------------------

#[test]
fn dot_call_passes_receiver_first() {
    assert_eq!(
        stdout_of("fun id x { return x; } print 7.id;"),
        "7.000000\n"
    );
}

#[test]
fn prefix_dot_calls_with_no_arguments() {
    assert_eq!(stdout_of("fun five { return 5; } print .five;"), "5.000000\n");
}

#[test]
fn send_chain_is_left_associative() {
    let source = "fun inc x { return x + 1; } \
                  fun double x { return x * 2; } \
                  print 3 -> inc -> double;";
    assert_eq!(stdout_of(source), "8.000000\n");
}

#[test]
fn send_with_parenthesized_second_argument() {
    assert_eq!(
        stdout_of("fun add a b { return a + b; } print 5 -> add(3);"),
        "8.000000\n"
    );
}

#[test]
fn tuple_argument_destructures_against_tuple_parameter() {
    assert_eq!(
        stdout_of("fun sum (a, b) { return a + b; } print (3, 4) -> sum;"),
        "7.000000\n"
    );
}

#[test]
fn unsupplied_parameters_default_to_nil() {
    assert_eq!(
        stdout_of("fun second a b { return b; } print second(1);"),
        "nil\n"
    );
}

#[test]
fn surplus_arguments_are_an_error() {
    let error = runtime_error_of("fun id x { return x; } 1 -> id(2);");
    assert_eq!(
        error.to_string(),
        "[line 1] Runtime error: function expects 1 inputs, but receieved 2"
    );
}

#[test]
fn calling_a_non_function_is_an_error() {
    let error = runtime_error_of("var x = 5; x();");
    assert_eq!(
        error.to_string(),
        "[line 1] Runtime error: can only call functions"
    );
}

#[test]
fn falling_off_the_end_returns_nil() {
    assert_eq!(stdout_of("fun noop { var x = 1; } print noop();"), "nil\n");
}

#[test]
fn function_body_tail_expression_is_its_value() {
    assert_eq!(stdout_of("fun three { 3 } print three();"), "3.000000\n");
}

#[test]
fn top_level_recursion_through_the_globals() {
    let source = "fun fact n { if (n < 2) return 1; return n * fact(n - 1); } print fact(5);";
    assert_eq!(stdout_of(source), "120.000000\n");
}

// Scoping and resolution -------------------------------------------------

#[test]
fn closure_captures_the_defining_frame() {
    let source = "{ var x = 42; fun get { return x; } print get(); }";
    assert_eq!(stdout_of(source), "42.000000\n");
}

#[test]
fn sibling_closures_share_one_frame() {
    let source = "fun make { var n = 0; var set = fun v { n = v; return nil; }; \
                  var get = fun { return n; }; return set, get; } \
                  var set, get = make(); set(10); print get();";
    assert_eq!(stdout_of(source), "10.000000\n");
}

#[test]
fn later_global_definitions_are_visible_to_earlier_functions() {
    let source = "fun call { return helper(); } fun helper { return 9; } print call();";
    assert_eq!(stdout_of(source), "9.000000\n");
}

// Equality ---------------------------------------------------------------

#[test]
fn equality_is_structural_for_data() {
    assert_eq!(stdout_of("print 1 == 1;"), "true\n");
    assert_eq!(stdout_of("print \"a\" == \"a\";"), "true\n");
    assert_eq!(stdout_of("print 1 == \"1\";"), "false\n");
    assert_eq!(stdout_of("print nil == nil;"), "true\n");
    assert_eq!(stdout_of("print nil == false;"), "false\n");
    assert_eq!(stdout_of("print (1, 2) == (1, 2);"), "true\n");
    assert_eq!(stdout_of("print 1 != 2;"), "true\n");
}

#[test]
fn functions_compare_by_body_identity() {
    let source = "fun make { fun { return 1; } } \
                  var f = make(); var g = make(); \
                  var h = fun { return 1; }; \
                  print f == g; print f == h;";
    assert_eq!(stdout_of(source), "true\nfalse\n");
}

// Control flow -----------------------------------------------------------

#[test]
fn if_else_branches_on_truthiness() {
    assert_eq!(
        stdout_of("if (1) print \"yes\"; else print \"no\";"),
        "yes\n"
    );
    assert_eq!(
        stdout_of("if (nil) print \"yes\"; else print \"no\";"),
        "no\n"
    );
}

#[test]
fn while_loops_until_falsy() {
    assert_eq!(
        stdout_of("var n = 3; while (n > 0) { print n; n = n - 1; }"),
        "3.000000\n2.000000\n1.000000\n"
    );
}

#[test]
fn return_unwinds_nested_blocks() {
    let source = "fun find { var i = 0; while (true) { if (i == 2) { return i; } i = i + 1; } } \
                  print find();";
    assert_eq!(stdout_of(source), "2.000000\n");
}

#[test]
fn top_level_return_surfaces_its_value() {
    let (_, outcome) = run("return 5;");
    match outcome {
        RunOutcome::TopLevelReturn(value) => assert_eq!(value.to_string(), "5.000000"),
        other => panic!("expected a top-level return, got {other:?}"),
    }
}

// Built-ins --------------------------------------------------------------

#[test]
fn print_with_no_argument_is_a_bare_newline() {
    assert_eq!(stdout_of("print;"), "\n");
}

#[test]
fn print_is_an_ordinary_global_too() {
    assert_eq!(stdout_of("5 -> print;"), "5.000000\n");
    assert_eq!(stdout_of("print(5);"), "5.000000\n");
}

#[test]
fn clock_counts_milliseconds_from_start() {
    assert_eq!(stdout_of("print clock() >= 0;"), "true\n");
}

#[test]
fn read_of_a_non_string_is_nil() {
    assert_eq!(stdout_of("print read(5);"), "nil\n");
}

#[test]
fn read_returns_file_contents() {
    let path = std::env::temp_dir().join("rill_read_test.txt");
    std::fs::write(&path, "contents").expect("write temp file");
    let source = format!("print read(\"{}\");", path.display());
    assert_eq!(stdout_of(&source), "contents\n");
    let _ = std::fs::remove_file(&path);
}

#[test]
fn read_of_a_missing_file_is_empty() {
    assert_eq!(
        stdout_of("print read(\"/no/such/rill/file\") == \"\";"),
        "true\n"
    );
}

// Sessions ---------------------------------------------------------------

#[test]
fn state_persists_across_inputs() {
    let (mut interpreter, output) = capturing_interpreter();
    let first = run_source(&mut interpreter, "var x = 1;", DebugOptions::default());
    assert!(matches!(
        first,
        RunOutcome::Completed(ErrorCode::NoError)
    ));
    let second = run_source(&mut interpreter, "print x;", DebugOptions::default());
    assert!(matches!(
        second,
        RunOutcome::Completed(ErrorCode::NoError)
    ));
    assert_eq!(output.text(), "1.000000\n");
}

#[test]
fn an_error_does_not_poison_the_next_input() {
    let (mut interpreter, output) = capturing_interpreter();
    let first = run_source(&mut interpreter, "print missing;", DebugOptions::default());
    assert!(matches!(
        first,
        RunOutcome::Completed(ErrorCode::RuntimeError)
    ));
    let second = run_source(&mut interpreter, "print 1;", DebugOptions::default());
    assert!(matches!(
        second,
        RunOutcome::Completed(ErrorCode::NoError)
    ));
    assert_eq!(output.text(), "1.000000\n");
}

// Failure categories -----------------------------------------------------

#[test]
fn undefined_variable_reports_with_its_line() {
    let error = runtime_error_of("print a;");
    assert_eq!(
        error.to_string(),
        "[line 1] Runtime error: undefined variable 'a'"
    );
    assert_eq!(exit_code_of("print a;"), ErrorCode::RuntimeError);
}

#[test]
fn runtime_error_lines_follow_the_source() {
    let error = runtime_error_of("var a = 1;\nprint b;");
    assert_eq!(
        error.to_string(),
        "[line 2] Runtime error: undefined variable 'b'"
    );
}

#[test]
fn mixed_operand_addition_is_an_error() {
    let error = runtime_error_of("1 + \"x\";");
    assert_eq!(error.to_string(), "[line 1] Runtime error: bad operand type");
    assert_eq!(exit_code_of("1 + \"x\";"), ErrorCode::RuntimeError);
}

#[test]
fn negating_a_string_is_an_error() {
    let error = runtime_error_of("-\"x\";");
    assert_eq!(error.to_string(), "[line 1] Runtime error: bad operand type");
}

#[test]
fn assigning_an_undeclared_global_is_an_error() {
    let error = runtime_error_of("a = 1;");
    assert_eq!(
        error.to_string(),
        "[line 1] Runtime error: undefined variable 'a'"
    );
}

#[test]
fn parse_errors_skip_evaluation() {
    let (text, outcome) = run("var x = ;");
    assert_eq!(text, "");
    assert!(matches!(
        outcome,
        RunOutcome::Completed(ErrorCode::ParseError)
    ));
}

#[test]
fn scan_errors_skip_evaluation() {
    // The stray character is reported and dropped; the rest still parses,
    // but nothing is evaluated.
    let (text, outcome) = run("var x = 1; @ print x;");
    assert_eq!(text, "");
    assert!(matches!(
        outcome,
        RunOutcome::Completed(ErrorCode::ScanError)
    ));
}

#[test]
fn later_errors_take_over_the_exit_category() {
    // An unterminated string mangles the stream, so the parse error that
    // follows decides the category.
    let (text, outcome) = run("print \"unterminated;");
    assert_eq!(text, "");
    assert!(matches!(
        outcome,
        RunOutcome::Completed(ErrorCode::ParseError)
    ));
}

#[test]
fn tuples_capture_values_not_names() {
    // Rebinding a name does not mutate a tuple it was packed into.
    let source = "var a = 1; var t = a, 2; a = 9; var x, y = t; print x;";
    assert_eq!(stdout_of(source), "1.000000\n");
}

#[test]
fn strings_may_contain_newlines() {
    assert_eq!(stdout_of("print \"a\nb\";"), "a\nb\n");
}
