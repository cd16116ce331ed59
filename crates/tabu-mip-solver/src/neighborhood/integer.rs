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
use tabu_mip_model::var::{VariableClass, VariableId};

/// Steps each unfixed integer variable by ±1, saturating at its bounds.
#[derive(Debug, Clone)]
pub struct IntegerMoveGenerator {
    is_enabled: bool,
    variable_ids: Vec<VariableId>,
}

impl IntegerMoveGenerator {
    pub fn build(model: &Model) -> Self {
        let variable_ids = model
            .variables()
            .iter()
            .filter(|v| v.class() == VariableClass::Integer && !v.is_fixed())
            .map(|v| v.id())
            .collect();
        Self {
            is_enabled: false,
            variable_ids,
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
        self.variable_ids.len()
    }

    pub fn generate(&self, model: &Model, out: &mut Vec<Move>) {
        for &id in &self.variable_ids {
            let variable = model.variable(id);
            let value = model.variable_value(id);
            if value < variable.upper_bound() {
                out.push(Move::new(MoveSense::Integer).with_alteration(id, value + 1));
            }
            if value > variable.lower_bound() {
                out.push(Move::new(MoveSense::Integer).with_alteration(id, value - 1));
            }
        }
    }
}
