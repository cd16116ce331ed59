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

pub mod cons;
pub mod err;
pub mod expr;
pub mod model;
pub mod mov;
pub mod presolve;
pub mod proxy;
pub mod score;
pub mod selection;
pub mod solution;
pub mod var;

/// Decision variables take integral values.
pub type VariableValue = i64;

/// Expression, score and penalty accumulators are floating point.
pub type ScoreValue = f64;

/// Tolerance under which a violation counts as zero.
pub const EPSILON: ScoreValue = 1e-5;

pub mod prelude {
    pub use crate::cons::{Constraint, ConstraintClass, ConstraintId, ConstraintSense};
    pub use crate::err::ModelError;
    pub use crate::expr::Expression;
    pub use crate::model::{Model, ModelSummary, OptimizationSense, SetupConfig};
    pub use crate::mov::{Move, MoveSense};
    pub use crate::proxy::ValueProxy;
    pub use crate::score::SolutionScore;
    pub use crate::selection::{Selection, SelectionMode};
    pub use crate::solution::{NamedSolution, Solution};
    pub use crate::var::{Variable, VariableClass, VariableId};
    pub use crate::{EPSILON, ScoreValue, VariableValue};
}
