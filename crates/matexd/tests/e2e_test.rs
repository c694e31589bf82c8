//! End-to-end tests driving the daemon surface the way the editor plugin
//! does: JSON request lines in, JSON response lines out.

use std::io::Cursor;
use std::path::Path;

use matex_algebra::SymbolicEngine;
use matex_core::Session;
use matex_syntax::MacroTable;
use matexd::{MatexSession, Response, handle_request, load_table, serve};

fn session(defs: &str) -> MatexSession {
    Session::new(MacroTable::parse(defs), SymbolicEngine::new())
}

fn request(session: &MatexSession, command: &str, text: &str) -> Response {
    let line = serde_json::json!({"command": command, "text": text, "id": 7}).to_string();
    handle_request(session, &line)
}

/// Sends one request and unwraps a successful response.
fn expect_res(session: &MatexSession, command: &str, text: &str) -> String {
    let response = request(session, command, text);
    assert_eq!(response.command, command, "failed: {}", response.res);
    assert_eq!(response.id, Some(7));
    response.res
}

fn expect_error(session: &MatexSession, command: &str, text: &str) -> String {
    let response = request(session, command, text);
    assert_eq!(response.command, "error");
    assert_eq!(response.id, None);
    response.res
}

#[test]
fn test_el_ops_add_multiple() {
    let text = r"\matrix{1&2\\0&1} \simop{(1) + 3(2)}";
    let res = expect_res(&session(""), "el_ops", text);
    assert_eq!(res, format!("{text}\n\\matrix{{\n1&5\\\\\n0&1\\\\\n}}"));
}

#[test]
fn test_el_ops_swap_rows() {
    let res = expect_res(
        &session(""),
        "el_ops",
        r"\matrix{1&2\\3&4} \simop{(1) \lra (2)}",
    );
    assert!(res.ends_with("\\matrix{\n3&4\\\\\n1&2\\\\\n}"));
}

#[test]
fn test_el_ops_column_scale() {
    let res = expect_res(
        &session(""),
        "el_ops",
        r"\matrix{1&2\\3&4} \arrop{(1col) \cdot 2}",
    );
    assert!(res.ends_with("\\matrix{\n2&2\\\\\n6&4\\\\\n}"));
}

#[test]
fn test_el_ops_sequence_in_order() {
    // Swap first, then scale what is now row 1.
    let res = expect_res(
        &session(""),
        "el_ops",
        r"\matrix{1&2\\3&4} \eqop{(1) \lra (2) \\ (1) \cdot 2}",
    );
    assert!(res.ends_with("\\matrix{\n6&8\\\\\n1&2\\\\\n}"));
}

#[test]
fn test_el_ops_symbolic_scale() {
    let res = expect_res(
        &session(""),
        "el_ops",
        r"\matrix{x&1\\0&x} \simop{(2) \cdot x}",
    );
    assert!(res.ends_with("\\matrix{\nx&1\\\\\n0&x^{2}\\\\\n}"));
}

#[test]
fn test_el_ops_on_augmented_in_lockstep() {
    let res = expect_res(
        &session(""),
        "el_ops",
        r"\ematrix{1&2\\3&4}{5\\6} \simop{(1) \lra (2)}",
    );
    assert!(res.ends_with("\\ematrix{\n3&4\\\\\n1&2\\\\\n}{\n6\\\\\n5\\\\\n}"));
}

#[test]
fn test_simplify_scalar_expression() {
    assert_eq!(expect_res(&session(""), "simplify", "1 + 1"), "2");
}

#[test]
fn test_simplify_determinant_matrix() {
    assert_eq!(
        expect_res(&session(""), "simplify", r"\dmatrix{1&2\\3&4}"),
        "-2"
    );
}

#[test]
fn test_simplify_matrix_sum() {
    let res = expect_res(
        &session(""),
        "simplify",
        r"\matrix{1&2\\3&4} + \matrix{1&0\\0&1}",
    );
    assert_eq!(res, "\\matrix{\n2&2\\\\\n3&5\\\\\n}");
}

#[test]
fn test_simplify_scalar_times_matrix() {
    let res = expect_res(&session(""), "simplify", r"2\matrix{1\\2}");
    assert_eq!(res, "\\matrix{\n2\\\\\n4\\\\\n}");
}

#[test]
fn test_simplify_with_custom_macro() {
    let session = session(r"\newcommand{\f}[2]{#2-#1}");
    assert_eq!(expect_res(&session, "simplify", r"\f{1}{5}"), "4");
}

#[test]
fn test_simplify_transpose_marker() {
    let res = expect_res(&session(""), "simplify", r"\matrix{1&2\\3&4}^T");
    assert_eq!(res, "\\matrix{\n1&3\\\\\n2&4\\\\\n}");
}

#[test]
fn test_simplify_inverse_marker() {
    let res = expect_res(&session(""), "simplify", r"\matrix{2&0\\0&2}^{-1}");
    assert_eq!(res, "\\matrix{\n\\frac{1}{2}&0\\\\\n0&\\frac{1}{2}\\\\\n}");
}

#[test]
fn test_matrix_info() {
    assert_eq!(
        expect_res(&session(""), "matrix_info", r"\matrix{1&2\\3&4}"),
        "det: -2, rank: 2"
    );
}

#[test]
fn test_matrix_info_non_square_reports_zero_det() {
    assert_eq!(
        expect_res(&session(""), "matrix_info", r"\matrix{1&2&3\\4&5&6}"),
        "det: 0, rank: 2"
    );
}

#[test]
fn test_transpose() {
    assert_eq!(
        expect_res(&session(""), "transpose", r"\matrix{1&2\\3&4}"),
        "\\matrix{\n1&3\\\\\n2&4\\\\\n}"
    );
}

#[test]
fn test_inverse() {
    assert_eq!(
        expect_res(&session(""), "inverse", r"\matrix{1&2\\3&4}"),
        "\\matrix{\n-2&1\\\\\n\\frac{3}{2}&-\\frac{1}{2}\\\\\n}"
    );
}

#[test]
fn test_ref_is_fraction_free() {
    assert_eq!(
        expect_res(&session(""), "ref", r"\matrix{1&2\\3&4}"),
        "\\matrix{\n1&2\\\\\n0&-2\\\\\n}"
    );
}

#[test]
fn test_rref_of_augmented_splits_back() {
    assert_eq!(
        expect_res(&session(""), "rref", r"\ematrix{1&2\\3&4}{5\\6}"),
        "\\ematrix{\n1&0\\\\\n0&1\\\\\n}{\n-4\\\\\n\\frac{9}{2}\\\\\n}"
    );
}

#[test]
fn test_multiline_input_normalizes() {
    let res = expect_res(&session(""), "transpose", "\\matrix{1&2\\\\\n3&4}");
    assert_eq!(res, "\\matrix{\n1&3\\\\\n2&4\\\\\n}");
}

#[test]
fn test_transpose_of_augmented_is_an_error() {
    let res = expect_error(&session(""), "transpose", r"\ematrix{1\\2}{3\\4}");
    assert!(res.contains("transpose"), "unexpected message: {res}");
}

#[test]
fn test_inverse_of_singular_matrix_is_an_error() {
    let res = expect_error(&session(""), "inverse", r"\matrix{1&2\\2&4}");
    assert!(res.contains("not invertible"), "unexpected message: {res}");
}

#[test]
fn test_jagged_matrix_is_an_error() {
    let res = expect_error(&session(""), "matrix_info", r"\matrix{1&2\\3}");
    assert!(res.contains("unequal"), "unexpected message: {res}");
}

#[test]
fn test_unknown_selector() {
    let res = expect_error(&session(""), "nope", "x");
    assert_eq!(res, "unknown command: nope");
}

#[test]
fn test_malformed_request_line() {
    let response = handle_request(&session(""), "not json at all");
    assert_eq!(response.command, "error");
    assert!(response.res.contains("malformed request"));
}

#[test]
fn test_errors_do_not_stop_the_stream() {
    let input = concat!(
        r#"{"command": "matrix_info", "text": "\\matrix{1&2\\\\3&4}", "id": 1}"#,
        "\n\n",
        r#"{"command": "nope", "text": "", "id": 2}"#,
        "\n",
        r#"{"command": "simplify", "text": "1 + 1", "id": 3}"#,
        "\n",
    );
    let mut output = Vec::new();
    serve(Cursor::new(input), &mut output, &session("")).unwrap();

    let responses: Vec<Response> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(responses.len(), 3);
    assert_eq!(responses[0].id, Some(1));
    assert_eq!(responses[0].res, "det: -2, rank: 2");
    assert_eq!(responses[1].command, "error");
    assert_eq!(responses[2].id, Some(3));
    assert_eq!(responses[2].res, "2");
}

#[test]
fn test_load_table_missing_file_yields_empty_table() {
    let table = load_table(Path::new("definitely/not/a/real/file.tex"));
    assert!(table.is_empty());
}
