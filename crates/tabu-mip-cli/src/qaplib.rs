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

//! QAPLIB instance reading and model construction.
//!
//! The file format is plain text: the first token is the size `n`, the
//! next `n²` integers are the flow matrix row-major, the next `n²` the
//! distance matrix. Line breaks carry no meaning.

use std::num::ParseIntError;
use std::path::Path;
use std::sync::Arc;
use tabu_mip_model::expr::Expression;
use tabu_mip_model::model::Model;
use tabu_mip_model::mov::{Move, MoveSense};
use tabu_mip_model::var::VariableId;
use tabu_mip_model::{ScoreValue, VariableValue};

#[derive(Debug)]
pub enum QaplibError {
    Io(std::io::Error),
    ParseInt(ParseIntError),
    UnexpectedEof,
    NonPositiveSize,
    Model(tabu_mip_model::err::ModelError),
}

impl From<std::io::Error> for QaplibError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<ParseIntError> for QaplibError {
    fn from(e: ParseIntError) -> Self {
        Self::ParseInt(e)
    }
}

impl From<tabu_mip_model::err::ModelError> for QaplibError {
    fn from(e: tabu_mip_model::err::ModelError) -> Self {
        Self::Model(e)
    }
}

impl std::fmt::Display for QaplibError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use QaplibError::*;
        match self {
            Io(e) => write!(f, "I/O error: {e}"),
            ParseInt(e) => write!(f, "parse-int error: {e}"),
            UnexpectedEof => write!(f, "unexpected end of file while parsing instance"),
            NonPositiveSize => write!(f, "the instance size must be positive"),
            Model(e) => write!(f, "model error: {e}"),
        }
    }
}

impl std::error::Error for QaplibError {}

#[derive(Debug, Clone)]
pub struct QaplibInstance {
    pub size: usize,
    pub flows: Vec<Vec<i64>>,
    pub distances: Vec<Vec<i64>>,
}

impl QaplibInstance {
    pub fn from_path(path: &Path) -> Result<Self, QaplibError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_str(&text)
    }

    pub fn from_str(text: &str) -> Result<Self, QaplibError> {
        let mut tokens = text.split_whitespace();
        let size: i64 = tokens.next().ok_or(QaplibError::UnexpectedEof)?.parse()?;
        if size <= 0 {
            return Err(QaplibError::NonPositiveSize);
        }
        let size = size as usize;

        let mut read_matrix = |tokens: &mut dyn Iterator<Item = &str>| {
            let mut matrix = Vec::with_capacity(size);
            for _ in 0..size {
                let mut row = Vec::with_capacity(size);
                for _ in 0..size {
                    let value: i64 =
                        tokens.next().ok_or(QaplibError::UnexpectedEof)?.parse()?;
                    row.push(value);
                }
                matrix.push(row);
            }
            Ok::<Vec<Vec<i64>>, QaplibError>(matrix)
        };

        let flows = read_matrix(&mut tokens)?;
        let distances = read_matrix(&mut tokens)?;
        Ok(Self {
            size,
            flows,
            distances,
        })
    }
}

/// Builds the assignment model: `x[i][j] = 1` iff facility `i` sits at
/// location `j`, row and column equality-one families, an opaque objective
/// over the induced permutation and a facility-swap move updater.
pub fn build_model(instance: &QaplibInstance, name: &str) -> Result<Model, QaplibError> {
    let n = instance.size;
    let mut model = Model::new(name);
    let x = model.add_shaped_variables("x", &[n, n], 0, 1)?;

    let mut row_specs = Vec::with_capacity(n);
    for i in 0..n {
        row_specs.push(Expression::sum_of(&x[i * n..(i + 1) * n]).eq(1.0));
    }
    model.add_constraints("row", row_specs)?;

    let mut column_specs = Vec::with_capacity(n);
    for j in 0..n {
        let members: Vec<VariableId> = (0..n).map(|i| x[i * n + j]).collect();
        column_specs.push(Expression::sum_of(&members).eq(1.0));
    }
    model.add_constraints("column", column_specs)?;

    // Seed with the identity assignment.
    for i in 0..n {
        model.set_initial_value(x[i * n + i], 1);
    }

    let flows = instance.flows.clone();
    let distances = instance.distances.clone();
    let objective_n = n;
    model.minimize_function(Arc::new(move |mv: &Move, values: &[VariableValue]| {
        let locations = locations_under_move(objective_n, mv, values);
        let mut total = 0i64;
        for i in 0..objective_n {
            for k in 0..objective_n {
                total += flows[i][k] * distances[locations[i]][locations[k]];
            }
        }
        total as ScoreValue
    }));

    let updater_n = n;
    model.register_move_updater(Arc::new(
        move |values: &[VariableValue], out: &mut Vec<Move>| {
            let locations = locations_under_move(updater_n, &Move::noop(), values);
            for i in 0..updater_n {
                for k in (i + 1)..updater_n {
                    let (li, lk) = (locations[i], locations[k]);
                    out.push(
                        Move::new(MoveSense::UserDefined)
                            .with_alteration(VariableId::new(i * updater_n + li), 0)
                            .with_alteration(VariableId::new(i * updater_n + lk), 1)
                            .with_alteration(VariableId::new(k * updater_n + lk), 0)
                            .with_alteration(VariableId::new(k * updater_n + li), 1),
                    );
                }
            }
            Ok(())
        },
    ));

    Ok(model)
}

/// Location of each facility under `mv` applied on top of `values`.
/// Falls back to location 0 when a row carries no one (transient states
/// during evaluation never do once the selections are set up).
fn locations_under_move(n: usize, mv: &Move, values: &[VariableValue]) -> Vec<usize> {
    let mut locations = vec![0usize; n];
    for (i, location) in locations.iter_mut().enumerate() {
        for j in 0..n {
            let id = VariableId::new(i * n + j);
            let value = mv.altered_value(id).unwrap_or(values[id.get()]);
            if value == 1 {
                *location = j;
                break;
            }
        }
    }
    locations
}

#[cfg(test)]
mod tests {
    use super::*;

    const TINY: &str = "3\n0 1 2\n1 0 1\n2 1 0\n\n0 2 1\n2 0 2\n1 2 0\n";

    #[test]
    fn test_parse_tiny_instance() {
        let instance = QaplibInstance::from_str(TINY).expect("parse");
        assert_eq!(instance.size, 3);
        assert_eq!(instance.flows[0], vec![0, 1, 2]);
        assert_eq!(instance.distances[2], vec![1, 2, 0]);
    }

    #[test]
    fn test_truncated_instance_fails() {
        assert!(matches!(
            QaplibInstance::from_str("3\n0 1 2\n1 0"),
            Err(QaplibError::UnexpectedEof)
        ));
    }

    #[test]
    fn test_non_positive_size_fails() {
        assert!(matches!(
            QaplibInstance::from_str("0"),
            Err(QaplibError::NonPositiveSize)
        ));
    }

    #[test]
    fn test_model_shape_and_objective() {
        let instance = QaplibInstance::from_str(TINY).expect("parse");
        let model = build_model(&instance, "tiny").expect("build");
        assert_eq!(model.number_of_variables(), 9);
        assert_eq!(model.number_of_constraints(), 6);
        assert!(model.is_defined_objective());
        assert!(model.move_updater().is_some());
    }

    #[test]
    fn test_swap_updater_proposes_all_pairs() {
        let instance = QaplibInstance::from_str(TINY).expect("parse");
        let model = build_model(&instance, "tiny").expect("build");
        let updater = model.move_updater().expect("updater").clone();
        let mut moves = Vec::new();
        updater(model.current_values(), &mut moves).expect("updater run");
        // 3 facilities: 3 unordered pairs, four alterations each.
        assert_eq!(moves.len(), 3);
        for mv in &moves {
            assert_eq!(mv.alterations.len(), 4);
        }
    }
}
