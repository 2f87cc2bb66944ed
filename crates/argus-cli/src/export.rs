//! Test-suite presentation: delimited rows and output-path derivation.

use std::path::{Path, PathBuf};

use argus_explore::TestCase;

/// Render one row per test case, columns in input-variable declaration
/// order, no header row.
pub fn render_rows(cases: &[TestCase], delimiter: char) -> String {
    let mut out = String::new();
    for case in cases {
        let row: Vec<String> = case.values.iter().map(ToString::to_string).collect();
        out.push_str(&row.join(&delimiter.to_string()));
        out.push('\n');
    }
    out
}

/// Default export location: `output/<input stem>.<extension>` under the
/// working directory.
pub fn derived_output_path(input: &Path, extension: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "test_cases".to_string());
    PathBuf::from("output").join(format!("{stem}.{extension}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use argus_smt::Value;

    fn case(values: Vec<Value>) -> TestCase {
        TestCase { values }
    }

    #[test]
    fn rows_are_delimited_without_a_header() {
        let cases = vec![
            case(vec![Value::Bool(true), Value::Int(0)]),
            case(vec![Value::Bool(false), Value::Int(-3)]),
        ];
        assert_eq!(render_rows(&cases, ','), "true,0\nfalse,-3\n");
        assert_eq!(render_rows(&cases, ';'), "true;0\nfalse;-3\n");
    }

    #[test]
    fn empty_suite_renders_nothing() {
        assert_eq!(render_rows(&[], ','), "");
    }

    #[test]
    fn output_path_is_derived_from_the_input_stem() {
        assert_eq!(
            derived_output_path(Path::new("testfiles/if1.smt2"), "csv"),
            PathBuf::from("output/if1.csv")
        );
        assert_eq!(
            derived_output_path(Path::new("loop"), "json"),
            PathBuf::from("output/loop.json")
        );
    }
}
