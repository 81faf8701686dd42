//! End-to-end scenarios: source text in, artifacts out.

use pretty_assertions::assert_eq;
use simplex::{CollectWriter, ErrorKind, ExecutionReport, Runner};

fn run(source: &str) -> (ExecutionReport, CollectWriter) {
    let mut program = Runner::parse(source, "e2e.sx")
        .expect("parses")
        .analyze()
        .unwrap_or_else(|errors| panic!("analysis failed: {errors:?}"));
    let mut writer = CollectWriter::new();
    let report = program.execute(None, "out", &mut writer);
    (report, writer)
}

/// Runs a program whose single product prints one value, returning its text.
fn eval_to_text(body: &str) -> String {
    let (report, writer) = run(&format!("product \"p\" {{ {body} }}"));
    assert!(report.success(), "evaluation failed: {report:?}");
    let text = &writer.files()["out-p.txt"];
    text.lines().last().expect("at least one result line").to_owned()
}

fn analysis_errors(source: &str) -> Vec<simplex::SimplexError> {
    Runner::parse(source, "e2e.sx")
        .expect("parses")
        .analyze()
        .err()
        .unwrap_or_default()
}

#[test]
fn arithmetic_and_let() {
    assert_eq!(eval_to_text("let x: Int = 3; let y: Int = 4; x * x + y * y"), "25");
}

#[test]
fn conditional_picks_first_truthy_guard() {
    assert_eq!(eval_to_text("if (1 < 2) then 3 else 4"), "3");
    assert_eq!(eval_to_text("if (true) then 1 else 2"), "1");
    assert_eq!(eval_to_text("if (false) then 1 else 2"), "2");
    assert_eq!(eval_to_text("if (false) then 1 elif (true) then 2 else 3"), "2");
}

#[test]
fn conditional_branch_types_must_unify() {
    let errors = analysis_errors("product \"p\" { if (1 < 2) then 3 else \"x\" }");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::Analysis);
}

#[test]
fn data_record_round_trip() {
    let source = "data Pt(x: Float, y: Float); product \"p\" { let p = Pt(1.0, 2.0); p.x + p.y }";
    let (report, writer) = run(source);
    assert!(report.success());
    assert_eq!(writer.files()["out-p.txt"].lines().last().unwrap(), "3.0");
}

#[test]
fn field_update_mutates_in_place() {
    let source = "data Pt(x: Float, y: Float)\n\
                  product \"p\" { let p = Pt(1.0, 2.0); p.x := 5.0; p.x + p.y }";
    let (report, writer) = run(source);
    assert!(report.success());
    assert_eq!(writer.files()["out-p.txt"].lines().last().unwrap(), "7.0");
}

#[test]
fn vector_for_each() {
    assert_eq!(eval_to_text("let v: [Int] = [1, 2, 3]; for i in v { i * i }"), "[1, 4, 9]");
}

#[test]
fn for_each_over_empty_vector_is_empty() {
    assert_eq!(eval_to_text("let v: [Int] = []; for i in v { i * i }"), "[]");
}

/// A never-run loop body still determines the result's element type: the
/// empty `[String]` result binds under a `[String]` annotation even though
/// the input vector is `[Int]`.
#[test]
fn for_each_over_empty_vector_adopts_body_type() {
    let body = "let v: [Int] = []; let r: [String] = for i in v { to_string(i) }; r";
    assert_eq!(eval_to_text(body), "[]");
}

#[test]
fn recursion() {
    let source = "fun fact(n: Int): Int { if (n <= 1) then 1 else n * fact(n - 1) }\n\
                  product \"p\" { fact(5) }";
    let (report, writer) = run(source);
    assert!(report.success());
    assert_eq!(writer.files()["out-p.txt"], "120\n");
}

#[test]
fn unbounded_recursion_is_an_evaluation_error() {
    let source = "fun spin(n: Int): Int { spin(n + 1) }\nproduct \"p\" { spin(0) }";
    let (report, _) = run(source);
    assert!(!report.success());
    let error = report.products[0].error.as_ref().expect("recursion error");
    assert_eq!(error.kind, ErrorKind::Evaluation);
}

#[test]
fn box_product_writes_exactly_one_stl() {
    let (report, writer) = run("product \"box\" { cuboid(1.0, 1.0, 1.0)->move(0.0, 0.0, 0.0) }");
    assert!(report.success());
    assert_eq!(writer.files().keys().collect::<Vec<_>>(), vec!["out-box.stl"]);
}

#[test]
fn empty_product_writes_no_files() {
    let (report, writer) = run("product \"empty\" { }");
    assert!(report.success());
    assert!(writer.files().is_empty());
}

/// Let-bindings shadow: the innermost binding wins.
#[test]
fn let_shadowing() {
    assert_eq!(eval_to_text("let x = 1; let x = 2; x"), "2");
    assert_eq!(eval_to_text("let x = 1; { let x = 2; x }"), "2");
    assert_eq!(eval_to_text("let x = 1; { let x = 2; x }; x"), "1");
    // The initializer of a shadowing let still sees the outer binding.
    assert_eq!(eval_to_text("let x = 10; let x = x + 1; x"), "11");
}

#[test]
fn arithmetic_identities() {
    assert_eq!(eval_to_text("let a = 17; a - a"), "0");
    assert_eq!(eval_to_text("let a = 17; a * 0"), "0");
    assert_eq!(eval_to_text("let a = 17; a + 0"), "17");
    assert_eq!(eval_to_text("let a = 2.5; a + 0.0"), "2.5");
    assert_eq!(eval_to_text("3 + 4"), eval_to_text("4 + 3"));
    assert_eq!(eval_to_text("0.5 + 1.25"), eval_to_text("1.25 + 0.5"));
}

#[test]
fn division_by_zero_reports_evaluation_error() {
    let (report, _) = run("let zero = 0\nproduct \"p\" { 1 / zero }");
    let error = report.products[0].error.as_ref().expect("division error");
    assert_eq!(error.kind, ErrorKind::Evaluation);
    assert_eq!(error.message, "division by zero");
    assert!(error.location.is_some());
}

#[test]
fn while_loop_accumulates() {
    let body = "let n = 0; let total = 0; while (n < 5) { total := total + n; n := n + 1 }; total";
    assert_eq!(eval_to_text(body), "10");
}

#[test]
fn while_with_false_condition_yields_false() {
    assert_eq!(eval_to_text("while (false) { 1 }"), "false");
}

#[test]
fn lambda_captures_environment() {
    let body = "let offset = 10; let add = lambda(x: Int): Int { x + offset }; add(5)";
    assert_eq!(eval_to_text(body), "15");
}

#[test]
fn first_class_functions_pass_as_arguments() {
    let source = "fun twice(f: (Int) -> Int, x: Int): Int { f(f(x)) }\n\
                  fun inc(x: Int): Int { x + 1 }\n\
                  product \"p\" { twice(inc, 3) }";
    let (report, writer) = run(source);
    assert!(report.success(), "{report:?}");
    assert_eq!(writer.files()["out-p.txt"], "5\n");
}

#[test]
fn nested_functions_are_mutually_recursive() {
    let source = "fun parity(n: Int): String {\n\
                    fun even(k: Int): Boolean { if (k == 0) then true else odd(k - 1) }\n\
                    fun odd(k: Int): Boolean { if (k == 0) then false else even(k - 1) }\n\
                    if (even(n)) then \"even\" else \"odd\"\n\
                  }\n\
                  product \"p\" { parity(7) }";
    let (report, writer) = run(source);
    assert!(report.success(), "{report:?}");
    assert_eq!(writer.files()["out-p.txt"], "odd\n");
}

#[test]
fn user_methods_dispatch_on_target_type() {
    let source = "data Pt(x: Float, y: Float)\n\
                  meth Pt.norm(): Float { (self.x * self.x + self.y * self.y)->sqrt() }\n\
                  product \"p\" { Pt(3.0, 4.0)->norm() }";
    let (report, writer) = run(source);
    assert!(report.success(), "{report:?}");
    assert_eq!(writer.files()["out-p.txt"], "5.0\n");
}

/// A user `plus` method makes `+` work on a data type: operators and methods
/// share one namespace per type.
#[test]
fn user_plus_method_drives_the_operator() {
    let source = "data V2(x: Float, y: Float)\n\
                  meth V2.plus(other: V2): V2 { V2(self.x + other.x, self.y + other.y) }\n\
                  product \"p\" { let v = V2(1.0, 2.0) + V2(3.0, 4.0); v.x; v.y }";
    let (report, writer) = run(source);
    assert!(report.success(), "{report:?}");
    assert_eq!(writer.files()["out-p.txt"], "V2(4.0, 6.0)\n4.0\n6.0\n");
}

#[test]
fn short_circuit_does_not_evaluate_second_operand() {
    // The division by zero on the right side must never run.
    let body = "let zero = 0; false and (1 / zero == 1)";
    assert_eq!(eval_to_text(body), "false");
    let body = "let zero = 0; true or (1 / zero == 1)";
    assert_eq!(eval_to_text(body), "true");
}

#[test]
fn string_operations_compose() {
    assert_eq!(eval_to_text("\"ab\" + \"cd\""), "abcd");
    assert_eq!(eval_to_text("\"ab\" * 3"), "ababab");
    assert_eq!(eval_to_text("\"hello\"->length()"), "5");
    assert_eq!(eval_to_text("\"hello\"[1]"), "e");
}

#[test]
fn vector_operations_compose() {
    assert_eq!(eval_to_text("[1, 2] + [3]"), "[1, 2, 3]");
    assert_eq!(eval_to_text("[1, 2, 3]->length()"), "3");
    assert_eq!(eval_to_text("[10, 20, 30][1]"), "20");
    assert_eq!(eval_to_text("[1, 2] == [1, 2]"), "true");
    assert_eq!(eval_to_text("[1, 2] != [2, 1]"), "true");
}

#[test]
fn comparisons_use_three_way_compare() {
    assert_eq!(eval_to_text("1 < 2"), "true");
    assert_eq!(eval_to_text("2 <= 2"), "true");
    assert_eq!(eval_to_text("2 > 2"), "false");
    assert_eq!(eval_to_text("\"abc\" < \"abd\""), "true");
    assert_eq!(eval_to_text("1.5 >= 2.5"), "false");
}

#[test]
fn records_compare_by_identity() {
    let source = "data Pt(x: Float, y: Float)\n\
                  product \"p\" { let a = Pt(1.0, 2.0); let b = Pt(1.0, 2.0); a == a; a == b }";
    let (report, writer) = run(source);
    assert!(report.success());
    let lines: Vec<&str> = writer.files()["out-p.txt"].lines().collect();
    assert_eq!(lines[lines.len() - 2..], ["true", "false"]);
}

#[test]
fn geometry_pipeline_produces_plausible_stl() {
    let source = "let base = cuboid(4.0, 4.0, 1.0)\n\
                  let hole = cylinder(1.0, 3.0)->move(2.0, 2.0, -1.0)\n\
                  product \"plate\" { base->difference(hole) }";
    let (report, writer) = run(source);
    assert!(report.success(), "{report:?}");
    let stl = &writer.files()["out-plate.stl"];
    assert!(stl.starts_with("solid plate\n"));
    assert!(stl.ends_with("endsolid plate\n"));
    assert!(stl.matches("facet normal").count() > 12);
}

#[test]
fn bounds_are_observable_from_programs() {
    let body = "cuboid(2.0, 3.0, 4.0)->move(1.0, 1.0, 1.0)->bounds()";
    assert_eq!(
        eval_to_text(body),
        "[point(1.0, 1.0, 1.0), point(3.0, 4.0, 5.0)]"
    );
}

#[test]
fn polygon_extrusion_yields_a_solid() {
    let source = "let outline = polygon([point(0.0, 0.0, 0.0), point(2.0, 0.0, 0.0), point(2.0, 2.0, 0.0), point(0.0, 2.0, 0.0)])\n\
                  product \"prism\" { outline->extrude(3.0); outline->area() }";
    let (report, writer) = run(source);
    assert!(report.success(), "{report:?}");
    assert!(writer.files().contains_key("out-prism.stl"));
    assert_eq!(writer.files()["out-prism.txt"], "4.0\n");
}

#[test]
fn point_arithmetic() {
    assert_eq!(
        eval_to_text("point(1.0, 2.0, 3.0) + point(1.0, 1.0, 1.0)"),
        "point(2.0, 3.0, 4.0)"
    );
    assert_eq!(eval_to_text("point(1.0, 2.0, 3.0)->y()"), "2.0");
}

#[test]
fn assignment_requires_matching_type() {
    let errors = analysis_errors("product \"p\" { let x: Int = 1; x := \"no\" }");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::TypeMismatch);
}

#[test]
fn undefined_names_fail_analysis_before_execution() {
    let errors = analysis_errors("product \"p\" { missing + 1 }");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::Undefined);
}

#[test]
fn flange_demo_renders() {
    let (report, writer) = run(include_str!("../../../demos/flange.sx"));
    assert!(report.success(), "{report:?}");
    assert!(writer.files().contains_key("out-flange.stl"));
    let info = &writer.files()["out-flange-info.txt"];
    assert!(info.contains("plate diameter: 40.0"));
    assert!(info.contains("bolt circle radius: 14.5"));
}

#[test]
fn dice_demo_renders() {
    let (report, writer) = run(include_str!("../../../demos/dice.sx"));
    assert!(report.success(), "{report:?}");
    let stl = &writer.files()["out-die.stl"];
    assert!(stl.starts_with("solid die\n"));
}
