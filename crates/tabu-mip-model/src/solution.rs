// Copyright (c) 2025 Felix Kahle.
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the
// "Software"), to deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE
// LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION
// WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Solution snapshots.
//!
//! A [`Solution`] is a positional snapshot of every proxy in the model; a
//! [`NamedSolution`] keys the same data by proxy name for export. The
//! `name value` text format and the JSON object shape are what the
//! command-line shell writes to `incumbent.sol` and `incumbent.json`.

use crate::proxy::ValueProxy;
use crate::{ScoreValue, VariableValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub variable_value_proxies: Vec<ValueProxy<VariableValue>>,
    pub expression_value_proxies: Vec<ValueProxy<ScoreValue>>,
    pub constraint_value_proxies: Vec<ValueProxy<ScoreValue>>,
    pub violation_value_proxies: Vec<ValueProxy<ScoreValue>>,
    pub objective: ScoreValue,
    pub total_violation: ScoreValue,
    pub is_feasible: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedSolution {
    pub name: String,
    pub objective: ScoreValue,
    pub total_violation: ScoreValue,
    pub is_feasible: bool,
    pub variables: BTreeMap<String, ValueProxy<VariableValue>>,
    pub expressions: BTreeMap<String, ValueProxy<ScoreValue>>,
    pub constraints: BTreeMap<String, ValueProxy<ScoreValue>>,
    pub violations: BTreeMap<String, ValueProxy<ScoreValue>>,
}

impl NamedSolution {
    #[inline]
    pub fn is_feasible(&self) -> bool {
        self.is_feasible
    }

    #[inline]
    pub fn objective(&self) -> ScoreValue {
        self.objective
    }

    /// Writes the `name value` per-line solution format.
    pub fn write_solution<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for (name, proxy) in &self.variables {
            for flat in 0..proxy.number_of_elements() {
                writeln!(writer, "{}{} {}", name, proxy.indices_label(flat), proxy[flat])?;
            }
        }
        Ok(())
    }
}

/// Summary of a model's size, embedded in the status export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub name: String,
    pub number_of_variables: usize,
    pub number_of_constraints: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_solution_format() {
        let mut variables = BTreeMap::new();
        variables.insert(
            "x".to_string(),
            ValueProxy::one_dimensional(0, "x", 2, 1i64),
        );
        variables.insert("y".to_string(), ValueProxy::scalar(1, "y", -4i64));

        let solution = NamedSolution {
            name: "m".to_string(),
            objective: 0.0,
            total_violation: 0.0,
            is_feasible: true,
            variables,
            expressions: BTreeMap::new(),
            constraints: BTreeMap::new(),
            violations: BTreeMap::new(),
        };

        let mut out = Vec::new();
        solution.write_solution(&mut out).expect("write");
        let text = String::from_utf8(out).expect("utf8");
        assert_eq!(text, "x[0] 1\nx[1] 1\ny -4\n");
    }

    #[test]
    fn test_solution_serde_round_trip() {
        let solution = Solution {
            variable_value_proxies: vec![ValueProxy::one_dimensional(0, "x", 3, 2i64)],
            expression_value_proxies: vec![],
            constraint_value_proxies: vec![ValueProxy::scalar(0, "c", 0.5f64)],
            violation_value_proxies: vec![ValueProxy::scalar(0, "c", 0.5f64)],
            objective: 6.0,
            total_violation: 0.5,
            is_feasible: false,
        };
        let json = serde_json::to_string(&solution).expect("serialize");
        let back: Solution = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, solution);
    }
}
