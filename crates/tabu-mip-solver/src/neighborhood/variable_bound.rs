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

use tabu_mip_model::cons::{ConstraintClass, ConstraintSense};
use tabu_mip_model::model::Model;
use tabu_mip_model::mov::{Move, MoveSense};
use tabu_mip_model::var::VariableId;
use tabu_mip_model::{EPSILON, ScoreValue};

/// A binary pair constraint `a·x + b·y + c ⋈ 0`.
#[derive(Debug, Clone, Copy)]
pub struct VariableBoundPair {
    pub x: VariableId,
    pub y: VariableId,
    pub coefficient_x: ScoreValue,
    pub coefficient_y: ScoreValue,
    pub constant: ScoreValue,
    pub sense: ConstraintSense,
}

/// Joint flips of a binary pair that keep its variable-bound constraint
/// satisfied.
#[derive(Debug, Clone)]
pub struct VariableBoundMoveGenerator {
    is_enabled: bool,
    pairs: Vec<VariableBoundPair>,
}

impl VariableBoundMoveGenerator {
    pub fn build(model: &Model) -> Self {
        let mut pairs = Vec::new();
        for constraint in model.constraints() {
            if !constraint.is_enabled() || constraint.class() != ConstraintClass::VariableBound {
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
            pairs.push(VariableBoundPair {
                x,
                y,
                coefficient_x,
                coefficient_y,
                constant: constraint.expression().constant_term(),
                sense: constraint.sense(),
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
            let x_value = model.variable_value(pair.x);
            let y_value = model.variable_value(pair.y);
            let candidates = [
                (1 - x_value, y_value),
                (x_value, 1 - y_value),
                (1 - x_value, 1 - y_value),
            ];
            for (new_x, new_y) in candidates {
                let e = pair.coefficient_x * new_x as ScoreValue
                    + pair.coefficient_y * new_y as ScoreValue
                    + pair.constant;
                let satisfied = match pair.sense {
                    ConstraintSense::Lower => e <= EPSILON,
                    ConstraintSense::Equal => e.abs() <= EPSILON,
                    ConstraintSense::Upper => e >= -EPSILON,
                };
                if !satisfied {
                    continue;
                }
                let mut mv = Move::new(MoveSense::VariableBound);
                if new_x != x_value {
                    mv.push(pair.x, new_x);
                }
                if new_y != y_value {
                    mv.push(pair.y, new_y);
                }
                if !mv.is_empty() {
                    out.push(mv);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabu_mip_model::expr::Expression;
    use tabu_mip_model::model::SetupConfig;

    #[test]
    fn test_only_feasibility_preserving_flips() {
        // 2 x + 3 y <= 4: (1, 0) ok, (0, 1) ok, (1, 1) violates.
        let mut model = Model::new("vb");
        let x = model.add_scalar_variable("x", 0, 1).expect("x");
        let y = model.add_scalar_variable("y", 0, 1).expect("y");
        model
            .add_constraint(
                "vb",
                (Expression::term(2.0, x) + Expression::term(3.0, y)).le(4.0),
            )
            .expect("constraint");
        model.minimize(Expression::term(1.0, x) + Expression::term(1.0, y));
        model
            .setup(&SetupConfig {
                is_enabled_presolve: false,
                ..SetupConfig::default()
            })
            .expect("setup");

        let mut generator = VariableBoundMoveGenerator::build(&model);
        generator.enable();
        assert_eq!(generator.number_of_candidates(), 1);

        // From (0, 0): flips to (1, 0) and (0, 1) keep the constraint; the
        // joint flip to (1, 1) gives 5 > 4 and must not be proposed.
        let mut moves = Vec::new();
        generator.generate(&model, &mut moves);
        assert_eq!(moves.len(), 2);
        for mv in &moves {
            assert_eq!(mv.sense, MoveSense::VariableBound);
            assert_eq!(mv.alterations.len(), 1);
        }
    }
}
