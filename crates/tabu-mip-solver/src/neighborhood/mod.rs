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

//! The neighborhood: one generator per move kind, reused buffers, and the
//! improvability pre-filter.
//!
//! Structural generators (aggregation, precedence, variable bound,
//! exclusive) read their tables from the constraint classification done at
//! model setup. The outer controller toggles them on stagnation and back
//! off on incumbent improvement; basic kinds stay under their option flags.

pub mod aggregation;
pub mod binary;
pub mod chain;
pub mod exclusive;
pub mod integer;
pub mod precedence;
pub mod selection;
pub mod user_defined;
pub mod variable_bound;

pub use aggregation::AggregationMoveGenerator;
pub use binary::BinaryMoveGenerator;
pub use chain::ChainMoveGenerator;
pub use exclusive::ExclusiveMoveGenerator;
pub use integer::IntegerMoveGenerator;
pub use precedence::PrecedenceMoveGenerator;
pub use selection::SelectionMoveGenerator;
pub use user_defined::UserDefinedMoveGenerator;
pub use variable_bound::VariableBoundMoveGenerator;

use fixedbitset::FixedBitSet;
use tabu_mip_model::cons::ConstraintSense;
use tabu_mip_model::model::{Model, MoveUpdater};
use tabu_mip_model::mov::Move;

pub struct Neighborhood {
    binary: BinaryMoveGenerator,
    integer: IntegerMoveGenerator,
    selection: SelectionMoveGenerator,
    aggregation: AggregationMoveGenerator,
    precedence: PrecedenceMoveGenerator,
    variable_bound: VariableBoundMoveGenerator,
    exclusive: ExclusiveMoveGenerator,
    chain: ChainMoveGenerator,
    user_defined: UserDefinedMoveGenerator,
    updater: Option<MoveUpdater>,
    move_buffer: Vec<Move>,
    raw_user_buffer: Vec<Move>,
}

impl std::fmt::Debug for Neighborhood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Neighborhood")
            .field("binary_candidates", &self.binary.number_of_candidates())
            .field("integer_candidates", &self.integer.number_of_candidates())
            .field(
                "structural_candidates",
                &self.number_of_structural_candidates(),
            )
            .field("chain_buffer", &self.chain.len())
            .finish()
    }
}

impl Neighborhood {
    /// Builds every generator table from the model after its setup.
    pub fn build(model: &Model, chain_move_capacity: usize) -> Self {
        Self {
            binary: BinaryMoveGenerator::build(model),
            integer: IntegerMoveGenerator::build(model),
            selection: SelectionMoveGenerator::new(),
            aggregation: AggregationMoveGenerator::build(model),
            precedence: PrecedenceMoveGenerator::build(model),
            variable_bound: VariableBoundMoveGenerator::build(model),
            exclusive: ExclusiveMoveGenerator::build(model),
            chain: ChainMoveGenerator::new(chain_move_capacity),
            user_defined: UserDefinedMoveGenerator::new(),
            updater: model.move_updater().cloned(),
            move_buffer: Vec::new(),
            raw_user_buffer: Vec::new(),
        }
    }

    pub fn binary(&self) -> &BinaryMoveGenerator {
        &self.binary
    }
    pub fn binary_mut(&mut self) -> &mut BinaryMoveGenerator {
        &mut self.binary
    }
    pub fn integer(&self) -> &IntegerMoveGenerator {
        &self.integer
    }
    pub fn integer_mut(&mut self) -> &mut IntegerMoveGenerator {
        &mut self.integer
    }
    pub fn selection(&self) -> &SelectionMoveGenerator {
        &self.selection
    }
    pub fn selection_mut(&mut self) -> &mut SelectionMoveGenerator {
        &mut self.selection
    }
    pub fn aggregation(&self) -> &AggregationMoveGenerator {
        &self.aggregation
    }
    pub fn aggregation_mut(&mut self) -> &mut AggregationMoveGenerator {
        &mut self.aggregation
    }
    pub fn precedence(&self) -> &PrecedenceMoveGenerator {
        &self.precedence
    }
    pub fn precedence_mut(&mut self) -> &mut PrecedenceMoveGenerator {
        &mut self.precedence
    }
    pub fn variable_bound(&self) -> &VariableBoundMoveGenerator {
        &self.variable_bound
    }
    pub fn variable_bound_mut(&mut self) -> &mut VariableBoundMoveGenerator {
        &mut self.variable_bound
    }
    pub fn exclusive(&self) -> &ExclusiveMoveGenerator {
        &self.exclusive
    }
    pub fn exclusive_mut(&mut self) -> &mut ExclusiveMoveGenerator {
        &mut self.exclusive
    }
    pub fn chain(&self) -> &ChainMoveGenerator {
        &self.chain
    }
    pub fn chain_mut(&mut self) -> &mut ChainMoveGenerator {
        &mut self.chain
    }
    pub fn user_defined(&self) -> &UserDefinedMoveGenerator {
        &self.user_defined
    }
    pub fn user_defined_mut(&mut self) -> &mut UserDefinedMoveGenerator {
        &mut self.user_defined
    }

    /// Candidates the structural generators could emit.
    pub fn number_of_structural_candidates(&self) -> usize {
        self.aggregation.number_of_candidates()
            + self.precedence.number_of_candidates()
            + self.variable_bound.number_of_candidates()
            + self.exclusive.number_of_candidates()
    }

    /// Seeds the chain buffer with an accepted multi-variable move.
    pub fn register_chain_move(&mut self, mv: &Move) {
        self.chain.register(mv);
    }

    /// Regenerates the candidate list into the reused buffer.
    ///
    /// An error from the user-defined updater aborts the refresh and is
    /// surfaced to the caller.
    pub fn update_moves(&mut self, model: &Model) -> Result<(), String> {
        self.move_buffer.clear();
        if self.binary.is_enabled() {
            self.binary.generate(model, &mut self.move_buffer);
        }
        if self.integer.is_enabled() {
            self.integer.generate(model, &mut self.move_buffer);
        }
        if self.selection.is_enabled() {
            self.selection.generate(model, &mut self.move_buffer);
        }
        if self.aggregation.is_enabled() {
            self.aggregation.generate(model, &mut self.move_buffer);
        }
        if self.precedence.is_enabled() {
            self.precedence.generate(model, &mut self.move_buffer);
        }
        if self.variable_bound.is_enabled() {
            self.variable_bound.generate(model, &mut self.move_buffer);
        }
        if self.exclusive.is_enabled() {
            self.exclusive.generate(model, &mut self.move_buffer);
        }
        if self.chain.is_enabled() {
            self.chain.generate(model, &mut self.move_buffer);
        }
        if self.user_defined.is_enabled()
            && let Some(updater) = &self.updater
        {
            self.raw_user_buffer.clear();
            updater(model.current_values(), &mut self.raw_user_buffer)?;
            self.user_defined
                .sanitize(model, &mut self.raw_user_buffer, &mut self.move_buffer);
        }
        Ok(())
    }

    /// The candidates produced by the last [`update_moves`](Self::update_moves).
    #[inline]
    pub fn moves(&self) -> &[Move] {
        &self.move_buffer
    }
}

/// Marks the enabled, violated constraints in `out` (indexed by constraint
/// id). Scratch for [`is_improvable_move`].
pub fn collect_violated_constraints(model: &Model, out: &mut FixedBitSet) {
    out.clear();
    for constraint in model.constraints() {
        if constraint.is_enabled() && constraint.is_violated() {
            out.insert(constraint.id().get());
        }
    }
}

/// Cheap sign-based pre-filter: keeps a move iff some alteration can lower
/// the minimized objective or shrink a currently-violated constraint. Never
/// discards an improving move; nonlinear models bypass the filter.
pub fn is_improvable_move(model: &Model, mv: &Move, violated: &FixedBitSet) -> bool {
    if !model.is_linear() {
        return true;
    }
    let sign = model.sign();
    for &(variable, new_value) in &mv.alterations {
        let v = model.variable(variable);
        let delta = (new_value - model.variable_value(variable)) as f64;
        if delta == 0.0 {
            continue;
        }
        if model.is_defined_objective() && sign * v.objective_sensitivity() * delta < 0.0 {
            return true;
        }
        for &constraint_id in v.related_constraints() {
            if !violated.contains(constraint_id.get()) {
                continue;
            }
            let constraint = model.constraint(constraint_id);
            let coefficient = v.constraint_sensitivity(constraint_id);
            let wanted_direction = match constraint.sense() {
                ConstraintSense::Lower => -1.0,
                ConstraintSense::Upper => 1.0,
                ConstraintSense::Equal => {
                    if constraint.constraint_value() > 0.0 {
                        -1.0
                    } else {
                        1.0
                    }
                }
            };
            if coefficient * delta * wanted_direction > 0.0 {
                return true;
            }
        }
    }
    false
}
