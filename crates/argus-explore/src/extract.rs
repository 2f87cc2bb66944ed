//! Model-to-test-case extraction.

use serde::Serialize;

use argus_smt::{Model, Value};

use crate::model::Variable;
use argus_ir::Sort;

/// One concrete test input vector: one value per input variable, in
/// declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestCase {
    pub values: Vec<Value>,
}

/// Convert one solver model into one ordered test case.
///
/// Pure and deterministic: identical inputs always yield an identical test
/// case. An input variable absent from the model has no bearing on any
/// decision, so it receives a fixed generic default.
pub fn extract_test_case(model: &Model, inputs: &[Variable]) -> TestCase {
    let values = inputs
        .iter()
        .map(|input| match model.get(&input.name) {
            Some(value) => value.clone(),
            None => generic_default(input.sort),
        })
        .collect();
    TestCase { values }
}

fn generic_default(sort: Sort) -> Value {
    match sort {
        Sort::Bool => Value::Bool(true),
        Sort::Int => Value::Int(0),
    }
}
