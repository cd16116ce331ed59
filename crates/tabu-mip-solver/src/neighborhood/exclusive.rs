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

/// Members of one mutually-exclusive (set-packing) constraint.
#[derive(Debug, Clone)]
pub struct ExclusiveGroup {
    pub variable_ids: Vec<VariableId>,
}

/// For each mutually-exclusive group, forces one member to 1 and every
/// other currently-set member to 0.
#[derive(Debug, Clone)]
pub struct ExclusiveMoveGenerator {
    is_enabled: bool,
    groups: Vec<ExclusiveGroup>,
}

impl ExclusiveMoveGenerator {
    pub fn build(model: &Model) -> Self {
        let mut groups = Vec::new();
        for constraint in model.constraints() {
            if !constraint.is_enabled() || constraint.class() != ConstraintClass::SetPacking {
                continue;
            }
            let members: Vec<VariableId> = constraint
                .expression()
                .sensitivities()
                .keys()
                .copied()
                .collect();
            if members.iter().any(|&m| model.variable(m).is_fixed()) {
                continue;
            }
            groups.push(ExclusiveGroup {
                variable_ids: members,
            });
        }
        Self {
            is_enabled: false,
            groups,
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
        self.groups.len()
    }

    pub fn generate(&self, model: &Model, out: &mut Vec<Move>) {
        for group in &self.groups {
            for &chosen in &group.variable_ids {
                let mut mv = Move::new(MoveSense::Exclusive);
                if model.variable_value(chosen) != 1 {
                    mv.push(chosen, 1);
                }
                for &other in &group.variable_ids {
                    if other != chosen && model.variable_value(other) != 0 {
                        mv.push(other, 0);
                    }
                }
                if !mv.is_empty() {
                    out.push(mv);
                }
            }
        }
    }
}
