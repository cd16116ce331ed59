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

use tabu_mip_model::cons::ConstraintClass;
use tabu_mip_model::model::Model;
use tabu_mip_model::mov::{Move, MoveSense};
use tabu_mip_model::var::VariableId;
use tabu_mip_model::{EPSILON, ScoreValue, VariableValue};

/// A two-variable equality `a·x + b·y + c = 0`.
#[derive(Debug, Clone, Copy)]
pub struct AggregationPair {
    pub x: VariableId,
    pub y: VariableId,
    pub coefficient_x: ScoreValue,
    pub coefficient_y: ScoreValue,
    pub constant: ScoreValue,
}

/// From each aggregation constraint, sets one side to the value that
/// satisfies the equality with the other side at its current value.
#[derive(Debug, Clone)]
pub struct AggregationMoveGenerator {
    is_enabled: bool,
    pairs: Vec<AggregationPair>,
}

impl AggregationMoveGenerator {
    pub fn build(model: &Model) -> Self {
        let mut pairs = Vec::new();
        for constraint in model.constraints() {
            if !constraint.is_enabled() || constraint.class() != ConstraintClass::Aggregation {
                continue;
            }
            let terms: Vec<(VariableId, ScoreValue)> = constraint
                .expression()
                .sensitivities()
                .iter()
                .map(|(&v, &c)| (v, c))
                .collect();
            let (x, coefficient_x) = terms[0];
            let (y, coefficient_y) = terms[1];
            if model.variable(x).is_fixed() || model.variable(y).is_fixed() {
                continue;
            }
            if coefficient_x == 0.0 || coefficient_y == 0.0 {
                continue;
            }
            pairs.push(AggregationPair {
                x,
                y,
                coefficient_x,
                coefficient_y,
                constant: constraint.expression().constant_term(),
            });
        }
        Self {
            is_enabled: false,
            pairs,
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.is_enabled
    }

    pub fn enable(&mut self) {
        self.is_enabled = true;
    }

    pub fn disable(&mut self) {
        self.is_enabled = false;
    }

    #[inline]
    pub fn number_of_candidates(&self) -> usize {
        self.pairs.len()
    }

    pub fn generate(&self, model: &Model, out: &mut Vec<Move>) {
        for pair in &self.pairs {
            push_closing_move(model, pair.x, pair.coefficient_x, pair.y, pair.coefficient_y, pair.constant, out);
            push_closing_move(model, pair.y, pair.coefficient_y, pair.x, pair.coefficient_x, pair.constant, out);
        }
    }
}

/// Emits `target ← (-constant - other_coefficient · other_value) /
/// target_coefficient` when that value is integral, in bounds and distinct
/// from the current one.
fn push_closing_move(
    model: &Model,
    target: VariableId,
    target_coefficient: ScoreValue,
    other: VariableId,
    other_coefficient: ScoreValue,
    constant: ScoreValue,
    out: &mut Vec<Move>,
) {
    let other_value = model.variable_value(other) as ScoreValue;
    let raw = (-constant - other_coefficient * other_value) / target_coefficient;
    if (raw - raw.round()).abs() > EPSILON {
        return;
    }
    let value = raw.round() as VariableValue;
    let variable = model.variable(target);
    if value < variable.lower_bound() || value > variable.upper_bound() {
        return;
    }
    if value == model.variable_value(target) {
        return;
    }
    out.push(Move::new(MoveSense::Aggregation).with_alteration(target, value));
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabu_mip_model::expr::Expression;
    use tabu_mip_model::model::SetupConfig;

    #[test]
    fn test_generates_equality_closing_moves() {
        // 2 x + 3 y = 12 with x, y in [0, 10], both at 0.
        let mut model = Model::new("aggregation");
        let x = model.add_scalar_variable("x", 0, 10).expect("x");
        let y = model.add_scalar_variable("y", 0, 10).expect("y");
        model
            .add_constraint(
                "agg",
                (Expression::term(2.0, x) + Expression::term(3.0, y)).eq(12.0),
            )
            .expect("constraint");
        model.minimize(Expression::term(1.0, x) + Expression::term(1.0, y));
        model
            .setup(&SetupConfig {
                is_enabled_presolve: false,
                ..SetupConfig::default()
            })
            .expect("setup");

        let mut generator = AggregationMoveGenerator::build(&model);
        generator.enable();
        assert_eq!(generator.number_of_candidates(), 1);

        let mut moves = Vec::new();
        generator.generate(&model, &mut moves);

        // x = (12 - 3·0)/2 = 6 and y = (12 - 2·0)/3 = 4 are both integral.
        assert_eq!(moves.len(), 2);
        assert!(moves.iter().any(|m| m.altered_value(x) == Some(6)));
        assert!(moves.iter().any(|m| m.altered_value(y) == Some(4)));
        for mv in &moves {
            assert_eq!(mv.sense, MoveSense::Aggregation);
        }
    }

    #[test]
    fn test_skips_non_integral_target() {
        // 2 x + 3 y = 7 from (0, 0): x = 3.5 is skipped, y is not integral
        // either (7/3), so nothing comes out.
        let mut model = Model::new("fractional");
        let x = model.add_scalar_variable("x", 0, 10).expect("x");
        let y = model.add_scalar_variable("y", 0, 10).expect("y");
        model
            .add_constraint(
                "agg",
                (Expression::term(2.0, x) + Expression::term(3.0, y)).eq(7.0),
            )
            .expect("constraint");
        model.minimize(Expression::term(1.0, x));
        model
            .setup(&SetupConfig {
                is_enabled_presolve: false,
                ..SetupConfig::default()
            })
            .expect("setup");

        let mut generator = AggregationMoveGenerator::build(&model);
        generator.enable();
        let mut moves = Vec::new();
        generator.generate(&model, &mut moves);
        assert!(moves.is_empty());
    }
}
