use prettify_relay::extract_output;
use serde_json::json;
use spectral::assert_that;

macro_rules! assert_extracts {
    (
        $(
            $test_name:ident : input => $input:expr, output => $output:expr
        ),+ $(,)?
    ) => {
        $(
            #[test]
            fn $test_name() {
                let expected: Option<&str> = $output;
                let result = extract_output($input);

                assert_that(&result.as_deref()).is_equal_to(expected);
            }
        )+
    }
}

assert_extracts![
    complete_object:
        input => r#"{"output": "hello world"}"#,
        output => Some("hello world"),
    complete_object_decodes_escaped_newline:
        input => r#"{"output":"line1\nline2"}"#,
        output => Some("line1\nline2"),
    empty_input:
        input => "",
        output => None,
    whitespace_input:
        input => "  \n\t ",
        output => None,
    truncated_unterminated_value:
        input => r#"{"output": "hello"#,
        output => None,
    truncated_after_value:
        input => r#"{"output": "Hello \"world\"\nnext","#,
        output => Some("Hello \"world\"\nnext"),
    truncated_empty_value:
        input => r#"{"output": """#,
        output => Some(""),
    marker_is_case_insensitive:
        input => r#"{"OUTPUT": "shout" , "#,
        output => Some("shout"),
    other_escapes_left_encoded:
        input => r#"{"output": "a\tb" "#,
        output => Some(r"a\tb"),
    multiple_markers_end_at_last_quote:
        input => r#"{"output": "first", "output": "sec"#,
        output => Some(r#"first", "output": "#),
    no_marker_in_valid_json:
        input => r#"{"result": "x"}"#,
        output => None,
    no_marker_in_truncated_json:
        input => r#"{"result": "x"#,
        output => None,
    valid_json_with_number_output:
        input => r#"{"output": 42}"#,
        output => None,
    valid_json_with_array_output_is_not_scanned:
        input => r#"{"output": ["a", "b"]}"#,
        output => None,
    valid_json_array_root:
        input => r#"["output", "x"]"#,
        output => None,
    plain_text:
        input => "the model refused to answer",
        output => None,
];

#[test]
fn round_trips_serde_encoded_output() {
    let values = [
        "plain",
        "tabs\tand \"quotes\" and \\ backslashes",
        "multi\nline\r\ncode {\n    body();\n}",
        "unicode: é ü 日本 🚀",
        "",
    ];

    for value in values {
        let encoded = json!({ "output": value, "other": 1 }).to_string();
        assert_that(&extract_output(&encoded)).is_equal_to(Some(value.to_owned()));
    }
}

#[test]
fn growing_stream_prefixes_never_panic() {
    let full = r#"{"output": "fn main() {\n    println!(\"hi\");\n}"}"#;

    for end in (0..=full.len()).filter(|end| full.is_char_boundary(*end)) {
        let _ = extract_output(full.get(..end).unwrap_or_default());
    }

    assert_that(&extract_output(full))
        .is_equal_to(Some("fn main() {\n    println!(\"hi\");\n}".to_owned()));
}
