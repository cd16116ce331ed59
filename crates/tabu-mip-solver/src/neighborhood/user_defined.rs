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

use tabu_mip_model::model::Model;
use tabu_mip_model::mov::{Move, MoveSense};

/// Moves proposed by the user-registered updater callback. The callback
/// fills a buffer; this generator tags and sanitizes its output.
#[derive(Debug, Clone, Default)]
pub struct UserDefinedMoveGenerator {
    is_enabled: bool,
}

impl UserDefinedMoveGenerator {
    pub fn new() -> Self {
        Self::default()
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

    /// Tags raw callback moves and drops any that touch fixed variables,
    /// leave bounds, or alter nothing.
    pub fn sanitize(&self, model: &Model, raw: &mut Vec<Move>, out: &mut Vec<Move>) {
        for mut mv in raw.drain(..) {
            mv.sense = MoveSense::UserDefined;
            let mut valid = !mv.is_empty();
            let mut changes_something = false;
            for &(variable, value) in &mv.alterations {
                let v = model.variable(variable);
                if v.is_fixed() || value < v.lower_bound() || value > v.upper_bound() {
                    valid = false;
                    break;
                }
                if model.variable_value(variable) != value {
                    changes_something = true;
                }
            }
            if valid && changes_something {
                out.push(mv);
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
    fn test_sanitize_filters_fixed_and_out_of_bounds() {
        let mut model = Model::new("user");
        let x = model.add_variables("x", 3, 0, 1).expect("variables");
        model.minimize(Expression::sum_of(&x));
        model.fix_variable(x[2], 0);
        model
            .setup(&SetupConfig {
                is_enabled_presolve: false,
                ..SetupConfig::default()
            })
            .expect("setup");

        let generator = UserDefinedMoveGenerator::new();
        let mut raw = vec![
            Move::new(MoveSense::Binary).with_alteration(x[0], 1),
            Move::new(MoveSense::Binary).with_alteration(x[2], 1),
            Move::new(MoveSense::Binary).with_alteration(x[1], 5),
            Move::new(MoveSense::Binary).with_alteration(x[1], 0),
        ];
        let mut out = Vec::new();
        generator.sanitize(&model, &mut raw, &mut out);

        // Only the first survives: fixed variable, out-of-bounds value and
        // the no-op are all dropped.
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].sense, MoveSense::UserDefined);
        assert_eq!(out[0].altered_value(x[0]), Some(1));
    }
}
