//! End-to-end pipeline tests over complete expression sources.

use tally::{Session, evaluate};
use tally_config::{Mode, Opts};

fn session() -> Session {
    Session::builder().with_test_emitter().build()
}

/// Evaluates `src` in expression mode, returning the value or the rendered
/// diagnostics.
fn eval(src: &str) -> Result<f64, String> {
    let sess = session();
    evaluate(&sess, src).map_err(|_| {
        sess.emitted_diagnostics().map(|d| d.to_string()).unwrap_or_default()
    })
}

#[track_caller]
fn assert_value(src: &str, expected: f64) {
    match eval(src) {
        Ok(value) => assert!(
            (value - expected).abs() <= 1e-9,
            "{src:?} evaluated to {value}, expected {expected}"
        ),
        Err(err) => panic!("{src:?} failed:\n{err}"),
    }
}

#[track_caller]
fn assert_exact(src: &str, expected: f64) {
    match eval(src) {
        Ok(value) => assert_eq!(value, expected, "{src:?}"),
        Err(err) => panic!("{src:?} failed:\n{err}"),
    }
}

#[track_caller]
fn assert_error(src: &str, code: &str, at: &str) {
    match eval(src) {
        Ok(value) => panic!("{src:?} evaluated to {value}, expected {code}"),
        Err(err) => {
            assert!(err.contains(code), "wrong code for {src:?}:\n{err}");
            assert!(err.contains(at), "wrong location for {src:?}:\n{err}");
        }
    }
}

#[test]
fn reference_scenarios() {
    assert_value(
        "10.5 + 30 - sqrt(PI * 5.2) / 8",
        10.5 + 30.0 - (std::f64::consts::PI * 5.2).sqrt() / 8.0,
    );
    assert_exact("2^3^2", 512.0);
    assert_exact("-4 + 2", -2.0);
    assert_error("10 / 0", "divide-by-zero", "<expr>:1:6");
    assert_error("1.2.3 + 1", "number-multiple-decimal-points", "<expr>:1:4");
    assert_error("sqrt(4", "unbalanced-parentheses", "<expr>:1:6");
    assert_error("1 = 2", "feature-disabled", "<expr>:1:3");
}

#[test]
fn rational_arithmetic_is_exact() {
    assert_exact("1 + 2", 3.0);
    assert_exact("0.5 + 0.25", 0.75);
    assert_exact("3 * 7 - 2", 19.0);
    assert_exact("100.5 - 0.5", 100.0);
}

#[test]
fn precedence_and_associativity() {
    // a + b * c == a + (b * c)
    assert_exact("2 + 3 * 4", 14.0);
    // a - b - c == (a - b) - c
    assert_exact("10 - 4 - 3", 3.0);
    // a ^ b ^ c == a ^ (b ^ c)
    assert_exact("2 ^ 1 ^ 3", 2.0);
    // signs bind tighter than `^`
    assert_exact("-3 ^ 2", 9.0);
}

#[test]
fn parenthesisation_is_idempotent() {
    for src in ["7", "1 + 2 * 3", "sqrt(2)", "-4 + 2", "2^3^2"] {
        let plain = eval(src).unwrap();
        let wrapped = eval(&format!("({src})")).unwrap();
        assert_eq!(plain, wrapped, "({src})");
        let doubly = eval(&format!("(({src}))")).unwrap();
        assert_eq!(plain, doubly, "(({src}))");
    }
}

#[test]
fn every_constant_and_function_reaches_the_result() {
    assert_value("PI + TAU + PHI + EN + EC + OC + GC", {
        std::f64::consts::PI
            + std::f64::consts::TAU
            + 1.618033988749895
            + std::f64::consts::E
            + 0.5772156649015329
            + 0.5671432904097838
            + 0.8346268416740731
    });
    assert_value("sqrt(4) + exp(0) + ln(1) + log10(10)", 4.0);
    assert_value("sin(0) + asin(0) + sinh(0) + cos(0) + acos(1) + cosh(0)", 2.0);
    assert_value("tan(0) + atan(0) + tanh(0)", 0.0);
}

#[test]
fn diagnostics_carry_codes_and_locations() {
    assert_error("10 + pie", "invalid-token", "<expr>:1:6");
    assert_error("1 2", "expected-operator", "<expr>:1:3");
    assert_error("1 + ", "expected-operand", "<expr>:1:3");
    assert_error("sqrt()", "function-requires-argument", "<expr>:1:5");
    assert_error("()", "empty-parentheses", "<expr>:1:1");
    assert_error("", "no-input", "error");
    assert_error("sqrt(1, 2)", "function-wrong-arity", "<expr>:1:5");
}

#[test]
fn multiple_diagnostics_in_source_order() {
    let err = eval("foo + bar").unwrap_err();
    let first = err.find("<expr>:1:1").expect("first diagnostic");
    let second = err.find("<expr>:1:7").expect("second diagnostic");
    assert!(first < second, "{err}");
}

#[test]
fn file_mode_features() {
    let sess = Session::builder()
        .opts(Opts { mode: Mode::File, ..Default::default() })
        .with_test_emitter()
        .build();
    let src = "1 + \\\n    2 * 3 // trailing comment";
    assert_eq!(evaluate(&sess, src), Ok(7.0));
}

#[test]
fn linker_mode_rejects_expressions() {
    let sess = Session::builder()
        .opts(Opts { mode: Mode::Linker, ..Default::default() })
        .with_test_emitter()
        .build();
    assert!(evaluate(&sess, "1 + 1").is_err());
}

#[test]
fn values_survive_deep_nesting() {
    let mut src = String::from("1");
    for _ in 0..200 {
        src = format!("({src})");
    }
    src.push_str(" + 1");
    assert_eq!(eval(&src), Ok(2.0));
}
