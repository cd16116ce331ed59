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

//! The model: authoritative state and the incremental evaluation kernel.
//!
//! Entities live in arena vectors indexed by dense ids; relationships are
//! parallel index maps rebuilt once at [`Model::setup`] and read-only
//! afterwards. Evaluating a move never mutates the model; applying one is a
//! separate step that keeps every cached value consistent with what a full
//! [`Model::update`] would recompute.

use crate::cons::{Constraint, ConstraintClass, ConstraintId, ConstraintSpec, violation_of};
use crate::err::{
    CapacityExceededError, InconsistentInitialValueError, InvalidNameError, ModelError,
    NoDecisionVariablesError,
};
use crate::expr::{Expression, ExpressionFunction};
use crate::mov::Move;
use crate::proxy::ValueProxy;
use crate::selection::{Selection, SelectionMode};
use crate::solution::{NamedSolution, Solution};
use crate::var::{Variable, VariableClass, VariableId};
use crate::{EPSILON, ScoreValue, VariableValue};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::sync::Arc;

pub use crate::solution::ModelSummary;

/// Upper bound on the number of proxies of each entity kind.
pub const PROXY_CAPACITY: usize = 10_000;

/// User callback that fills `out` with candidate moves for the current
/// variable values. Errors surface to the controller and abort the phase.
pub type MoveUpdater =
    Arc<dyn Fn(&[VariableValue], &mut Vec<Move>) -> Result<(), String> + Send + Sync>;

/// End-of-phase user callback.
pub type PhaseCallback = Box<dyn FnMut() + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptimizationSense {
    Minimize,
    Maximize,
}

impl OptimizationSense {
    /// Multiplier that turns the raw objective into a minimization value.
    #[inline]
    pub fn sign(&self) -> ScoreValue {
        match self {
            OptimizationSense::Minimize => 1.0,
            OptimizationSense::Maximize => -1.0,
        }
    }
}

/// Shape metadata of an entity proxy; `first..first + len` is the dense id
/// range of its elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyMeta {
    pub(crate) id: usize,
    pub(crate) name: String,
    pub(crate) shape: Vec<usize>,
    pub(crate) first: usize,
    pub(crate) len: usize,
}

impl ProxyMeta {
    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn make_proxy<T: Clone>(&self, fill: T) -> ValueProxy<T> {
        ValueProxy::shaped(self.id, self.name.clone(), &self.shape, fill)
    }
}

/// Setup switches owned by the model layer. The solver maps its option
/// record onto this before calling [`Model::setup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetupConfig {
    pub is_enabled_presolve: bool,
    pub is_enabled_initial_value_correction: bool,
    pub selection_mode: SelectionMode,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            is_enabled_presolve: true,
            is_enabled_initial_value_correction: true,
            selection_mode: SelectionMode::None,
        }
    }
}

pub struct Model {
    pub(crate) name: String,
    pub(crate) variables: Vec<Variable>,
    pub(crate) variable_values: Vec<VariableValue>,
    pub(crate) variable_proxies: Vec<ProxyMeta>,
    pub(crate) constraints: Vec<Constraint>,
    pub(crate) constraint_proxies: Vec<ProxyMeta>,
    pub(crate) expressions: Vec<Expression>,
    pub(crate) expression_proxies: Vec<ProxyMeta>,
    pub(crate) nonlinear_constraint_ids: Vec<ConstraintId>,
    pub(crate) objective_expression: Expression,
    pub(crate) objective_sense: OptimizationSense,
    pub(crate) is_objective_defined: bool,
    pub(crate) objective_value: ScoreValue,
    pub(crate) selections: Vec<Selection>,
    pub(crate) is_linear: bool,
    pub(crate) is_solved: bool,
    pub(crate) move_updater: Option<MoveUpdater>,
    pub(crate) phase_callback: Option<PhaseCallback>,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.name)
            .field("number_of_variables", &self.variables.len())
            .field("number_of_constraints", &self.constraints.len())
            .field("is_linear", &self.is_linear)
            .field("is_solved", &self.is_solved)
            .finish()
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new("model")
    }
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: Vec::new(),
            variable_values: Vec::new(),
            variable_proxies: Vec::new(),
            constraints: Vec::new(),
            constraint_proxies: Vec::new(),
            expressions: Vec::new(),
            expression_proxies: Vec::new(),
            nonlinear_constraint_ids: Vec::new(),
            objective_expression: Expression::new(),
            objective_sense: OptimizationSense::Minimize,
            is_objective_defined: false,
            objective_value: 0.0,
            selections: Vec::new(),
            is_linear: true,
            is_solved: false,
            move_updater: None,
            phase_callback: None,
        }
    }

    fn verify_name(name: &str) -> Result<(), ModelError> {
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(InvalidNameError::new(name).into());
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Construction
    // ---------------------------------------------------------------

    fn add_variable_proxy(
        &mut self,
        name: &str,
        shape: &[usize],
        lower_bound: VariableValue,
        upper_bound: VariableValue,
    ) -> Result<Vec<VariableId>, ModelError> {
        Self::verify_name(name)?;
        if self.variable_proxies.len() >= PROXY_CAPACITY {
            return Err(
                CapacityExceededError::new(self.variable_proxies.len() + 1, PROXY_CAPACITY).into(),
            );
        }

        let proxy_id = self.variable_proxies.len();
        let first = self.variables.len();
        let len: usize = shape.iter().product();
        let mut ids = Vec::with_capacity(len);
        for flat in 0..len {
            let id = VariableId::new(first + flat);
            self.variables
                .push(Variable::new(id, proxy_id, flat, lower_bound, upper_bound));
            self.variable_values.push(lower_bound.max(0).min(upper_bound));
            ids.push(id);
        }
        self.variable_proxies.push(ProxyMeta {
            id: proxy_id,
            name: name.to_string(),
            shape: shape.to_vec(),
            first,
            len,
        });
        Ok(ids)
    }

    pub fn add_scalar_variable(
        &mut self,
        name: &str,
        lower_bound: VariableValue,
        upper_bound: VariableValue,
    ) -> Result<VariableId, ModelError> {
        let ids = self.add_variable_proxy(name, &[1], lower_bound, upper_bound)?;
        Ok(ids[0])
    }

    pub fn add_variables(
        &mut self,
        name: &str,
        len: usize,
        lower_bound: VariableValue,
        upper_bound: VariableValue,
    ) -> Result<Vec<VariableId>, ModelError> {
        self.add_variable_proxy(name, &[len], lower_bound, upper_bound)
    }

    pub fn add_shaped_variables(
        &mut self,
        name: &str,
        shape: &[usize],
        lower_bound: VariableValue,
        upper_bound: VariableValue,
    ) -> Result<Vec<VariableId>, ModelError> {
        self.add_variable_proxy(name, shape, lower_bound, upper_bound)
    }

    /// Registers a named expression for reporting; returns its proxy id.
    pub fn add_expression(
        &mut self,
        name: &str,
        expression: Expression,
    ) -> Result<usize, ModelError> {
        Self::verify_name(name)?;
        if self.expression_proxies.len() >= PROXY_CAPACITY {
            return Err(
                CapacityExceededError::new(self.expression_proxies.len() + 1, PROXY_CAPACITY)
                    .into(),
            );
        }
        let proxy_id = self.expression_proxies.len();
        self.expression_proxies.push(ProxyMeta {
            id: proxy_id,
            name: name.to_string(),
            shape: vec![1],
            first: proxy_id,
            len: 1,
        });
        self.expressions.push(expression);
        Ok(proxy_id)
    }

    pub fn add_constraint(
        &mut self,
        name: &str,
        spec: ConstraintSpec,
    ) -> Result<ConstraintId, ModelError> {
        Self::verify_name(name)?;
        if self.constraint_proxies.len() >= PROXY_CAPACITY {
            return Err(
                CapacityExceededError::new(self.constraint_proxies.len() + 1, PROXY_CAPACITY)
                    .into(),
            );
        }
        let id = ConstraintId::new(self.constraints.len());
        let proxy_id = self.constraint_proxies.len();
        self.constraint_proxies.push(ProxyMeta {
            id: proxy_id,
            name: name.to_string(),
            shape: vec![1],
            first: id.get(),
            len: 1,
        });
        self.constraints
            .push(Constraint::new(id, proxy_id, 0, name, spec.expression, spec.sense));
        Ok(id)
    }

    /// Registers a family of constraints under one 1-D proxy, e.g. the row
    /// constraints of an assignment model. Penalty containers and exports
    /// treat the family as one group.
    pub fn add_constraints(
        &mut self,
        name: &str,
        specs: Vec<ConstraintSpec>,
    ) -> Result<Vec<ConstraintId>, ModelError> {
        Self::verify_name(name)?;
        if self.constraint_proxies.len() >= PROXY_CAPACITY {
            return Err(
                CapacityExceededError::new(self.constraint_proxies.len() + 1, PROXY_CAPACITY)
                    .into(),
            );
        }
        let proxy_id = self.constraint_proxies.len();
        let first = self.constraints.len();
        let len = specs.len().max(1);
        self.constraint_proxies.push(ProxyMeta {
            id: proxy_id,
            name: name.to_string(),
            shape: vec![len],
            first,
            len,
        });
        let mut ids = Vec::with_capacity(specs.len());
        for (flat, spec) in specs.into_iter().enumerate() {
            let id = ConstraintId::new(self.constraints.len());
            self.constraints.push(Constraint::new(
                id,
                proxy_id,
                flat,
                format!("{}[{}]", name, flat),
                spec.expression,
                spec.sense,
            ));
            ids.push(id);
        }
        Ok(ids)
    }

    pub fn minimize(&mut self, expression: Expression) {
        self.objective_expression = expression;
        self.objective_sense = OptimizationSense::Minimize;
        self.is_objective_defined = true;
    }

    pub fn maximize(&mut self, expression: Expression) {
        self.objective_expression = expression;
        self.objective_sense = OptimizationSense::Maximize;
        self.is_objective_defined = true;
    }

    pub fn minimize_function(&mut self, function: ExpressionFunction) {
        self.minimize(Expression::from_function(function));
    }

    pub fn maximize_function(&mut self, function: ExpressionFunction) {
        self.maximize(Expression::from_function(function));
    }

    pub fn set_initial_value(&mut self, id: VariableId, value: VariableValue) {
        self.variable_values[id.get()] = value;
    }

    pub fn fix_variable(&mut self, id: VariableId, value: VariableValue) {
        self.variables[id.get()].fix_to(value);
        self.variable_values[id.get()] = value;
    }

    pub fn set_bounds(&mut self, id: VariableId, lower_bound: VariableValue, upper_bound: VariableValue) {
        self.variables[id.get()].set_bounds(lower_bound, upper_bound);
    }

    pub fn register_move_updater(&mut self, updater: MoveUpdater) {
        self.move_updater = Some(updater);
    }

    pub fn register_phase_callback(&mut self, callback: PhaseCallback) {
        self.phase_callback = Some(callback);
    }

    /// Invoked by the controller at phase boundaries.
    pub fn run_phase_callback(&mut self) {
        if let Some(callback) = self.phase_callback.as_mut() {
            callback();
        }
    }

    // ---------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    #[inline]
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    #[inline]
    pub fn variable(&self, id: VariableId) -> &Variable {
        &self.variables[id.get()]
    }

    #[inline]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    #[inline]
    pub fn constraint(&self, id: ConstraintId) -> &Constraint {
        &self.constraints[id.get()]
    }

    #[inline]
    pub fn selections(&self) -> &[Selection] {
        &self.selections
    }

    #[inline]
    pub fn current_values(&self) -> &[VariableValue] {
        &self.variable_values
    }

    #[inline]
    pub fn variable_value(&self, id: VariableId) -> VariableValue {
        self.variable_values[id.get()]
    }

    #[inline]
    pub fn objective_value(&self) -> ScoreValue {
        self.objective_value
    }

    #[inline]
    pub fn sign(&self) -> ScoreValue {
        self.objective_sense.sign()
    }

    #[inline]
    pub fn is_minimization(&self) -> bool {
        self.objective_sense == OptimizationSense::Minimize
    }

    #[inline]
    pub fn is_defined_objective(&self) -> bool {
        self.is_objective_defined
    }

    #[inline]
    pub fn is_linear(&self) -> bool {
        self.is_linear
    }

    #[inline]
    pub fn is_solved(&self) -> bool {
        self.is_solved
    }

    pub fn set_is_solved(&mut self, is_solved: bool) {
        self.is_solved = is_solved;
    }

    #[inline]
    pub fn move_updater(&self) -> Option<&MoveUpdater> {
        self.move_updater.as_ref()
    }

    #[inline]
    pub fn number_of_variables(&self) -> usize {
        self.variables.len()
    }

    #[inline]
    pub fn number_of_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn number_of_unfixed_variables(&self) -> usize {
        self.variables.iter().filter(|v| !v.is_fixed()).count()
    }

    pub fn number_of_selection_variables(&self) -> usize {
        self.variables
            .iter()
            .filter(|v| v.class() == VariableClass::Selection)
            .count()
    }

    /// Full label of a variable, e.g. `x[2, 0]`.
    pub fn variable_label(&self, id: VariableId) -> String {
        let variable = &self.variables[id.get()];
        let meta = &self.variable_proxies[variable.proxy_id()];
        let proxy = meta.make_proxy(0u8);
        format!("{}{}", meta.name(), proxy.indices_label(variable.flat_index()))
    }

    pub fn export_summary(&self) -> ModelSummary {
        ModelSummary {
            name: self.name.clone(),
            number_of_variables: self.variables.len(),
            number_of_constraints: self.constraints.len(),
        }
    }

    /// A proxy vector parallel to the variable proxies, filled with `fill`.
    pub fn generate_variable_parameter_proxies<T: Clone>(&self, fill: T) -> Vec<ValueProxy<T>> {
        self.variable_proxies
            .iter()
            .map(|meta| meta.make_proxy(fill.clone()))
            .collect()
    }

    /// A proxy vector parallel to the constraint proxies, filled with `fill`.
    pub fn generate_constraint_parameter_proxies<T: Clone>(&self, fill: T) -> Vec<ValueProxy<T>> {
        self.constraint_proxies
            .iter()
            .map(|meta| meta.make_proxy(fill.clone()))
            .collect()
    }

    // ---------------------------------------------------------------
    // Setup
    // ---------------------------------------------------------------

    /// One-time preparation before search: back-references, sensitivities,
    /// presolve, categorization, classification, selection extraction and
    /// initial-value verification. Search phases never alter the results.
    pub fn setup(&mut self, config: &SetupConfig) -> Result<(), ModelError> {
        if self.variables.is_empty() {
            return Err(NoDecisionVariablesError.into());
        }

        self.setup_variable_related_constraints();
        self.setup_linearity();
        self.setup_objective_sensitivities();

        if config.is_enabled_presolve {
            self.presolve()?;
        }

        self.categorize_variables();
        for constraint in self.constraints.iter_mut() {
            constraint.classify(&self.variables);
        }
        self.extract_selections(config.selection_mode);
        self.verify_and_correct_initial_values(config.is_enabled_initial_value_correction)?;

        self.update();
        Ok(())
    }

    fn setup_variable_related_constraints(&mut self) {
        for variable in self.variables.iter_mut() {
            variable.clear_related_constraints();
        }
        self.nonlinear_constraint_ids.clear();
        for constraint in &self.constraints {
            if !constraint.expression().is_linear() {
                self.nonlinear_constraint_ids.push(constraint.id());
                continue;
            }
            for (&variable, &coefficient) in constraint.expression().sensitivities() {
                self.variables[variable.get()]
                    .register_related_constraint(constraint.id(), coefficient);
            }
        }
    }

    fn setup_linearity(&mut self) {
        self.is_linear = self.nonlinear_constraint_ids.is_empty()
            && self.objective_expression.is_linear();
    }

    fn setup_objective_sensitivities(&mut self) {
        for variable in self.variables.iter_mut() {
            variable.set_objective_sensitivity(0.0);
        }
        if !self.objective_expression.is_linear() {
            return;
        }
        for (&variable, &coefficient) in self.objective_expression.sensitivities() {
            self.variables[variable.get()].set_objective_sensitivity(coefficient);
        }
    }

    fn categorize_variables(&mut self) {
        for variable in self.variables.iter_mut() {
            if variable.has_binary_bounds() {
                variable.set_class(VariableClass::Binary);
            } else {
                variable.set_class(VariableClass::Integer);
            }
        }
    }

    fn extract_selections(&mut self, mode: SelectionMode) {
        if mode == SelectionMode::None {
            return;
        }

        let mut candidates: Vec<(ConstraintId, Vec<VariableId>)> = self
            .constraints
            .iter()
            .filter(|c| {
                c.is_enabled()
                    && c.class() == ConstraintClass::SetPartitioning
                    && c.expression().number_of_terms() >= 2
                    && c.expression()
                        .sensitivities()
                        .keys()
                        .all(|&v| !self.variables[v.get()].is_fixed())
            })
            .map(|c| {
                (
                    c.id(),
                    c.expression().sensitivities().keys().copied().collect(),
                )
            })
            .collect();

        match mode {
            SelectionMode::None => unreachable!(),
            SelectionMode::Defined => {}
            SelectionMode::Larger => {
                candidates.sort_by_key(|(_, members)| std::cmp::Reverse(members.len()));
            }
            SelectionMode::Independent => {
                let mut appearance = vec![0usize; self.variables.len()];
                for (_, members) in &candidates {
                    for member in members {
                        appearance[member.get()] += 1;
                    }
                }
                candidates.retain(|(_, members)| {
                    members.iter().all(|m| appearance[m.get()] == 1)
                });
            }
        }

        let mut used = vec![false; self.variables.len()];
        for (constraint_id, members) in candidates {
            if members.iter().any(|m| used[m.get()]) {
                continue;
            }
            let selection_index = self.selections.len();
            for &member in &members {
                used[member.get()] = true;
                self.variables[member.get()].set_selection_index(selection_index);
            }
            self.constraints[constraint_id.get()].disable();
            self.selections
                .push(Selection::new(constraint_id, members));
        }
    }

    fn verify_and_correct_initial_values(
        &mut self,
        is_enabled_correction: bool,
    ) -> Result<(), ModelError> {
        for index in 0..self.variables.len() {
            let value = self.variable_values[index];
            let variable = &self.variables[index];
            if value >= variable.lower_bound() && value <= variable.upper_bound() {
                continue;
            }
            if !is_enabled_correction {
                return Err(InconsistentInitialValueError::new(
                    self.variable_label(variable.id()),
                    format!(
                        "outside the bounds [{}, {}]",
                        variable.lower_bound(),
                        variable.upper_bound()
                    ),
                    value,
                )
                .into());
            }
            let clamped = value
                .max(variable.lower_bound())
                .min(variable.upper_bound());
            tracing::warn!(
                "Initial value {} of {} was corrected to {}.",
                value,
                self.variable_label(variable.id()),
                clamped
            );
            self.variable_values[index] = clamped;
        }

        for selection_index in 0..self.selections.len() {
            let members: Vec<VariableId> =
                self.selections[selection_index].variable_ids().to_vec();

            let fixed_ones: Vec<VariableId> = members
                .iter()
                .copied()
                .filter(|m| {
                    self.variables[m.get()].is_fixed() && self.variable_values[m.get()] == 1
                })
                .collect();
            if fixed_ones.len() > 1 {
                return Err(InconsistentInitialValueError::new(
                    self.variable_label(fixed_ones[1]),
                    "multiple fixed selection members are one",
                    1,
                )
                .into());
            }

            let selected: Vec<VariableId> = members
                .iter()
                .copied()
                .filter(|m| self.variable_values[m.get()] == 1)
                .collect();

            match selected.len() {
                1 => {}
                0 => {
                    if !is_enabled_correction {
                        return Err(InconsistentInitialValueError::new(
                            self.variable_label(members[0]),
                            "no selection member is one",
                            0,
                        )
                        .into());
                    }
                    let chosen = members
                        .iter()
                        .copied()
                        .find(|m| !self.variables[m.get()].is_fixed())
                        .unwrap_or(members[0]);
                    self.variable_values[chosen.get()] = 1;
                    tracing::warn!(
                        "Selection member {} was set to one.",
                        self.variable_label(chosen)
                    );
                }
                _ => {
                    if !is_enabled_correction {
                        return Err(InconsistentInitialValueError::new(
                            self.variable_label(selected[1]),
                            "multiple selection members are one",
                            1,
                        )
                        .into());
                    }
                    let keep = fixed_ones.first().copied().unwrap_or(selected[0]);
                    for member in selected {
                        if member != keep {
                            self.variable_values[member.get()] = 0;
                            tracing::warn!(
                                "Selection member {} was zeroed.",
                                self.variable_label(member)
                            );
                        }
                    }
                }
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Evaluation kernel
    // ---------------------------------------------------------------

    /// Recomputes every cached expression, constraint and objective value
    /// from the current variable values.
    pub fn update(&mut self) {
        let noop = Move::noop();
        for index in 0..self.expressions.len() {
            let value = self.expressions[index].evaluate(&noop, &self.variable_values);
            self.expressions[index].set_value(value);
        }
        for index in 0..self.constraints.len() {
            let value = self.constraints[index]
                .expression()
                .evaluate(&noop, &self.variable_values);
            self.constraints[index].update_from_value(value);
        }
        self.objective_value = if self.is_objective_defined {
            self.objective_expression.evaluate(&noop, &self.variable_values)
        } else {
            0.0
        };
    }

    /// Scores `mv` from scratch over every enabled constraint. Does not
    /// mutate the model; scoring the same move twice is bit-identical.
    pub fn evaluate(
        &self,
        mv: &Move,
        local_penalty: &[ValueProxy<ScoreValue>],
        global_penalty: &[ValueProxy<ScoreValue>],
    ) -> crate::score::SolutionScore {
        let values = &self.variable_values;
        let objective = if self.is_objective_defined {
            self.objective_expression.evaluate(mv, values)
        } else {
            0.0
        };

        let mut total_violation = 0.0;
        let mut local = 0.0;
        let mut global = 0.0;
        let mut is_feasible = true;
        let mut decreased = false;

        for constraint in &self.constraints {
            if !constraint.is_enabled() {
                continue;
            }
            let e = constraint.expression().evaluate(mv, values);
            let violation = violation_of(constraint.sense(), e);
            if violation > EPSILON {
                is_feasible = false;
            }
            if violation < constraint.violation_value() {
                decreased = true;
            }
            total_violation += violation;
            local += local_penalty[constraint.proxy_id()][constraint.flat_index()] * violation;
            global += global_penalty[constraint.proxy_id()][constraint.flat_index()] * violation;
        }

        self.assemble_score(objective, total_violation, local, global, is_feasible, decreased)
    }

    /// Scores `mv` as `baseline` plus the deltas of the constraints it
    /// touches. `baseline` must have been computed against the current state
    /// with the same penalty containers.
    pub fn evaluate_with_baseline(
        &self,
        mv: &Move,
        baseline: &crate::score::SolutionScore,
        local_penalty: &[ValueProxy<ScoreValue>],
        global_penalty: &[ValueProxy<ScoreValue>],
    ) -> crate::score::SolutionScore {
        let values = &self.variable_values;
        let objective = if !self.is_objective_defined {
            0.0
        } else if self.objective_expression.is_linear() {
            self.objective_value + self.objective_expression.linear_delta(mv, values)
        } else {
            self.objective_expression.evaluate(mv, values)
        };

        let mut touched: SmallVec<[ConstraintId; 16]> = SmallVec::new();
        if let Some(related) = &mv.related_constraints {
            touched.extend(related.iter().copied());
        } else {
            for &(variable, _) in &mv.alterations {
                for &constraint in self.variables[variable.get()].related_constraints() {
                    if !touched.contains(&constraint) {
                        touched.push(constraint);
                    }
                }
            }
        }
        for &constraint in &self.nonlinear_constraint_ids {
            if !touched.contains(&constraint) {
                touched.push(constraint);
            }
        }

        let mut total_violation = baseline.total_violation;
        let mut local = baseline.local_penalty;
        let mut global = baseline.global_penalty;
        let mut decreased = false;

        for &constraint_id in &touched {
            let constraint = &self.constraints[constraint_id.get()];
            if !constraint.is_enabled() {
                continue;
            }
            let e = if constraint.expression().is_linear() {
                constraint.constraint_value() + constraint.expression().linear_delta(mv, values)
            } else {
                constraint.expression().evaluate(mv, values)
            };
            let violation = violation_of(constraint.sense(), e);
            let old = constraint.violation_value();
            if violation < old {
                decreased = true;
            }
            let coefficient_index = (constraint.proxy_id(), constraint.flat_index());
            total_violation += violation - old;
            local += local_penalty[coefficient_index.0][coefficient_index.1] * (violation - old);
            global += global_penalty[coefficient_index.0][coefficient_index.1] * (violation - old);
        }

        let total_violation = total_violation.max(0.0);
        let is_feasible = total_violation <= EPSILON;
        let mut score = self.assemble_score(
            objective,
            total_violation,
            local.max(0.0),
            global.max(0.0),
            is_feasible,
            decreased,
        );
        // With a baseline, constraint improvability is defined on totals.
        score.is_constraint_improvable = score.total_violation < baseline.total_violation;
        score
    }

    fn assemble_score(
        &self,
        objective: ScoreValue,
        total_violation: ScoreValue,
        local_penalty: ScoreValue,
        global_penalty: ScoreValue,
        is_feasible: bool,
        decreased: bool,
    ) -> crate::score::SolutionScore {
        let sign = self.sign();
        let minimized = sign * objective;
        let is_objective_improvable = if !self.is_objective_defined {
            false
        } else if self.objective_expression.is_linear() {
            minimized < sign * self.objective_value
        } else {
            true
        };
        crate::score::SolutionScore {
            objective,
            total_violation,
            local_penalty,
            global_penalty,
            local_augmented_objective: minimized + local_penalty,
            global_augmented_objective: minimized + global_penalty,
            is_objective_improvable,
            is_constraint_improvable: decreased,
            is_feasible,
        }
    }

    /// Applies `mv`: writes the altered values and refreshes the caches of
    /// every constraint the altered variables influence. A move is applied
    /// entirely or not at all; there is no partial state.
    pub fn apply(&mut self, mv: &Move) {
        let objective_delta = if self.is_objective_defined
            && self.objective_expression.is_linear()
        {
            self.objective_expression.linear_delta(mv, &self.variable_values)
        } else {
            0.0
        };

        let mut touched: SmallVec<[ConstraintId; 16]> = SmallVec::new();
        for &(variable, _) in &mv.alterations {
            for &constraint in self.variables[variable.get()].related_constraints() {
                if !touched.contains(&constraint) {
                    touched.push(constraint);
                }
            }
        }
        for &constraint in &self.nonlinear_constraint_ids {
            if !touched.contains(&constraint) {
                touched.push(constraint);
            }
        }

        for &(variable, value) in &mv.alterations {
            self.variable_values[variable.get()] = value;
        }

        let noop = Move::noop();
        for &constraint_id in &touched {
            let value = self.constraints[constraint_id.get()]
                .expression()
                .evaluate(&noop, &self.variable_values);
            self.constraints[constraint_id.get()].update_from_value(value);
        }

        self.objective_value = if !self.is_objective_defined {
            0.0
        } else if self.objective_expression.is_linear() {
            self.objective_value + objective_delta
        } else {
            self.objective_expression.evaluate(&noop, &self.variable_values)
        };
    }

    // ---------------------------------------------------------------
    // Import / export
    // ---------------------------------------------------------------

    pub fn export_solution(&self) -> Solution {
        let mut variable_value_proxies = Vec::with_capacity(self.variable_proxies.len());
        for meta in &self.variable_proxies {
            let mut proxy = meta.make_proxy(0 as VariableValue);
            proxy
                .values_mut()
                .copy_from_slice(&self.variable_values[meta.first..meta.first + meta.len]);
            variable_value_proxies.push(proxy);
        }

        let expression_value_proxies = self
            .expression_proxies
            .iter()
            .map(|meta| {
                let mut proxy = meta.make_proxy(0.0 as ScoreValue);
                proxy[0] = self.expressions[meta.first].value();
                proxy
            })
            .collect();

        let mut constraint_value_proxies = Vec::with_capacity(self.constraint_proxies.len());
        let mut violation_value_proxies = Vec::with_capacity(self.constraint_proxies.len());
        for meta in &self.constraint_proxies {
            let mut value_proxy = meta.make_proxy(0.0 as ScoreValue);
            let mut violation_proxy = meta.make_proxy(0.0 as ScoreValue);
            for flat in 0..meta.len {
                let constraint = &self.constraints[meta.first + flat];
                value_proxy[flat] = constraint.constraint_value();
                violation_proxy[flat] = constraint.violation_value();
            }
            constraint_value_proxies.push(value_proxy);
            violation_value_proxies.push(violation_proxy);
        }

        let total_violation: ScoreValue = self
            .constraints
            .iter()
            .filter(|c| c.is_enabled())
            .map(|c| c.violation_value())
            .sum();
        let is_feasible = self
            .constraints
            .iter()
            .filter(|c| c.is_enabled())
            .all(|c| c.violation_value() <= EPSILON);

        Solution {
            variable_value_proxies,
            expression_value_proxies,
            constraint_value_proxies,
            violation_value_proxies,
            objective: self.objective_value,
            total_violation,
            is_feasible,
        }
    }

    /// Overwrites the current variable values from a solution snapshot.
    /// Caches are stale until the next [`Model::update`].
    pub fn import_variable_values(&mut self, proxies: &[ValueProxy<VariableValue>]) {
        debug_assert_eq!(proxies.len(), self.variable_proxies.len());
        for (meta, proxy) in self.variable_proxies.iter().zip(proxies.iter()) {
            debug_assert_eq!(meta.len, proxy.number_of_elements());
            self.variable_values[meta.first..meta.first + meta.len]
                .copy_from_slice(proxy.values());
        }
    }

    pub fn convert_to_named_solution(&self, solution: &Solution) -> NamedSolution {
        let mut variables = BTreeMap::new();
        for (meta, proxy) in self
            .variable_proxies
            .iter()
            .zip(solution.variable_value_proxies.iter())
        {
            variables.insert(meta.name.clone(), proxy.clone());
        }
        let mut expressions = BTreeMap::new();
        for (meta, proxy) in self
            .expression_proxies
            .iter()
            .zip(solution.expression_value_proxies.iter())
        {
            expressions.insert(meta.name.clone(), proxy.clone());
        }
        let mut constraints = BTreeMap::new();
        let mut violations = BTreeMap::new();
        for ((meta, value_proxy), violation_proxy) in self
            .constraint_proxies
            .iter()
            .zip(solution.constraint_value_proxies.iter())
            .zip(solution.violation_value_proxies.iter())
        {
            constraints.insert(meta.name.clone(), value_proxy.clone());
            violations.insert(meta.name.clone(), violation_proxy.clone());
        }

        NamedSolution {
            name: self.name.clone(),
            objective: solution.objective,
            total_violation: solution.total_violation,
            is_feasible: solution.is_feasible,
            variables,
            expressions,
            constraints,
            violations,
        }
    }

    /// Names of the variable proxies, in proxy order.
    pub fn variable_proxy_names(&self) -> Vec<String> {
        self.variable_proxies
            .iter()
            .map(|meta| meta.name.clone())
            .collect()
    }

    /// Names of the constraint proxies, in proxy order.
    pub fn constraint_proxy_names(&self) -> Vec<String> {
        self.constraint_proxies
            .iter()
            .map(|meta| meta.name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mov::MoveSense;

    fn penalties(model: &Model, fill: ScoreValue) -> Vec<ValueProxy<ScoreValue>> {
        model.generate_constraint_parameter_proxies(fill)
    }

    fn simple_model() -> (Model, Vec<VariableId>) {
        let mut model = Model::new("simple");
        let x = model.add_variables("x", 3, 0, 10).expect("variables");
        let c = (Expression::term(1.0, x[0]) + Expression::term(2.0, x[1])).le(8.0);
        model.add_constraint("c0", c).expect("constraint");
        let c = Expression::sum_of(&x).ge(1.0);
        model.add_constraint("c1", c).expect("constraint");
        model.minimize(Expression::sum_of(&x));
        (model, x)
    }

    #[test]
    fn test_invalid_names_are_rejected() {
        let mut model = Model::new("m");
        assert!(matches!(
            model.add_variables("bad name", 2, 0, 1),
            Err(ModelError::InvalidName(_))
        ));
        assert!(matches!(
            model.add_constraint(
                "also bad",
                Expression::constant(0.0).eq(0.0)
            ),
            Err(ModelError::InvalidName(_))
        ));
    }

    #[test]
    fn test_setup_on_empty_model_fails() {
        let mut model = Model::new("empty");
        assert!(matches!(
            model.setup(&SetupConfig::default()),
            Err(ModelError::NoDecisionVariables(_))
        ));
    }

    #[test]
    fn test_setup_builds_sensitivities() {
        let (mut model, x) = simple_model();
        model
            .setup(&SetupConfig {
                is_enabled_presolve: false,
                ..SetupConfig::default()
            })
            .expect("setup");

        let v0 = model.variable(x[0]);
        assert_eq!(v0.objective_sensitivity(), 1.0);
        assert_eq!(v0.related_constraints().len(), 2);
        assert_eq!(v0.constraint_sensitivity(ConstraintId::new(0)), 1.0);
        assert_eq!(
            model.variable(x[1]).constraint_sensitivity(ConstraintId::new(0)),
            2.0
        );
        assert_eq!(
            model.variable(x[2]).constraint_sensitivity(ConstraintId::new(0)),
            0.0
        );
        assert!(model.is_linear());
    }

    #[test]
    fn test_update_and_full_evaluate_agree() {
        let (mut model, x) = simple_model();
        model
            .setup(&SetupConfig {
                is_enabled_presolve: false,
                ..SetupConfig::default()
            })
            .expect("setup");
        model.set_initial_value(x[0], 4);
        model.set_initial_value(x[1], 3);
        model.update();

        // c0: 4 + 6 - 8 = 2 violated; c1: 7 - 1 = 6 satisfied
        assert_eq!(model.constraint(ConstraintId::new(0)).constraint_value(), 2.0);
        assert_eq!(model.constraint(ConstraintId::new(0)).violation_value(), 2.0);
        assert_eq!(model.constraint(ConstraintId::new(1)).violation_value(), 0.0);
        assert_eq!(model.objective_value(), 7.0);

        let local = penalties(&model, 10.0);
        let global = penalties(&model, 100.0);
        let score = model.evaluate(&Move::noop(), &local, &global);
        assert_eq!(score.objective, 7.0);
        assert_eq!(score.total_violation, 2.0);
        assert_eq!(score.local_penalty, 20.0);
        assert_eq!(score.global_penalty, 200.0);
        assert_eq!(score.local_augmented_objective, 27.0);
        assert_eq!(score.global_augmented_objective, 207.0);
        assert!(!score.is_feasible);
    }

    #[test]
    fn test_incremental_evaluation_matches_full() {
        let (mut model, x) = simple_model();
        model
            .setup(&SetupConfig {
                is_enabled_presolve: false,
                ..SetupConfig::default()
            })
            .expect("setup");
        model.set_initial_value(x[0], 4);
        model.set_initial_value(x[1], 3);
        model.update();

        let local = penalties(&model, 10.0);
        let global = penalties(&model, 100.0);
        let baseline = model.evaluate(&Move::noop(), &local, &global);

        let mv = Move::new(MoveSense::Integer)
            .with_alteration(x[1], 1)
            .with_alteration(x[2], 5);
        let full = model.evaluate(&mv, &local, &global);
        let incremental = model.evaluate_with_baseline(&mv, &baseline, &local, &global);

        assert!((full.objective - incremental.objective).abs() < 1e-9);
        assert!((full.total_violation - incremental.total_violation).abs() < 1e-9);
        assert!((full.local_penalty - incremental.local_penalty).abs() < 1e-9);
        assert!(
            (full.local_augmented_objective - incremental.local_augmented_objective).abs() < 1e-9
        );
        assert_eq!(full.is_feasible, incremental.is_feasible);

        // Evaluation must not mutate the model.
        assert_eq!(model.variable_value(x[1]), 3);
        assert_eq!(model.objective_value(), 7.0);
    }

    #[test]
    fn test_apply_keeps_caches_consistent_with_update() {
        let (mut model, x) = simple_model();
        model
            .setup(&SetupConfig {
                is_enabled_presolve: false,
                ..SetupConfig::default()
            })
            .expect("setup");

        let mv = Move::new(MoveSense::Integer)
            .with_alteration(x[0], 6)
            .with_alteration(x[1], 2);
        model.apply(&mv);

        let cached_c0 = model.constraint(ConstraintId::new(0)).constraint_value();
        let cached_objective = model.objective_value();
        model.update();
        assert!((cached_c0 - model.constraint(ConstraintId::new(0)).constraint_value()).abs() < 1e-9);
        assert!((cached_objective - model.objective_value()).abs() < 1e-9);
    }

    #[test]
    fn test_apply_then_inverse_restores_caches() {
        let (mut model, x) = simple_model();
        model
            .setup(&SetupConfig {
                is_enabled_presolve: false,
                ..SetupConfig::default()
            })
            .expect("setup");
        model.set_initial_value(x[0], 2);
        model.update();

        let before_objective = model.objective_value();
        let before_c0 = model.constraint(ConstraintId::new(0)).constraint_value();

        let mv = Move::new(MoveSense::Integer)
            .with_alteration(x[0], 9)
            .with_alteration(x[2], 1);
        let inverse = mv.inverse(model.current_values());
        model.apply(&mv);
        model.apply(&inverse);

        assert!((model.objective_value() - before_objective).abs() < 1e-9);
        assert!(
            (model.constraint(ConstraintId::new(0)).constraint_value() - before_c0).abs() < 1e-9
        );
        assert_eq!(model.variable_value(x[0]), 2);
        assert_eq!(model.variable_value(x[2]), 0);
    }

    #[test]
    fn test_export_import_round_trip() {
        let (mut model, x) = simple_model();
        model
            .setup(&SetupConfig {
                is_enabled_presolve: false,
                ..SetupConfig::default()
            })
            .expect("setup");
        model.set_initial_value(x[0], 1);
        model.set_initial_value(x[1], 2);
        model.set_initial_value(x[2], 3);
        model.update();

        let exported = model.export_solution();

        model.set_initial_value(x[0], 0);
        model.set_initial_value(x[1], 0);
        model.set_initial_value(x[2], 0);
        model.update();

        model.import_variable_values(&exported.variable_value_proxies);
        model.update();
        let re_exported = model.export_solution();
        assert_eq!(re_exported, exported);
    }

    #[test]
    fn test_named_solution_uses_proxy_names() {
        let (mut model, _) = simple_model();
        model
            .setup(&SetupConfig {
                is_enabled_presolve: false,
                ..SetupConfig::default()
            })
            .expect("setup");
        model.update();
        let named = model.convert_to_named_solution(&model.export_solution());
        assert!(named.variables.contains_key("x"));
        assert!(named.constraints.contains_key("c0"));
        assert!(named.violations.contains_key("c1"));
        assert_eq!(named.name, "simple");
    }

    #[test]
    fn test_selection_extraction_defined_mode() {
        let mut model = Model::new("sel");
        let x = model.add_variables("x", 4, 0, 1).expect("variables");
        model
            .add_constraint("partition", Expression::sum_of(&x).eq(1.0))
            .expect("constraint");
        model.minimize(Expression::sum_of(&x));
        model
            .setup(&SetupConfig {
                is_enabled_presolve: false,
                is_enabled_initial_value_correction: true,
                selection_mode: SelectionMode::Defined,
            })
            .expect("setup");

        assert_eq!(model.selections().len(), 1);
        assert!(!model.constraint(ConstraintId::new(0)).is_enabled());
        assert_eq!(model.number_of_selection_variables(), 4);
        // Correction selected exactly one member.
        let ones: i64 = x.iter().map(|&v| model.variable_value(v)).sum();
        assert_eq!(ones, 1);
    }

    #[test]
    fn test_initial_value_correction_clamps() {
        let mut model = Model::new("clamp");
        let x = model.add_scalar_variable("x", 0, 5).expect("variable");
        model.minimize(Expression::term(1.0, x));
        model.set_initial_value(x, 42);
        model
            .setup(&SetupConfig {
                is_enabled_presolve: false,
                ..SetupConfig::default()
            })
            .expect("setup");
        assert_eq!(model.variable_value(x), 5);
    }

    #[test]
    fn test_initial_value_error_without_correction() {
        let mut model = Model::new("strict");
        let x = model.add_scalar_variable("x", 0, 5).expect("variable");
        model.minimize(Expression::term(1.0, x));
        model.set_initial_value(x, 42);
        let result = model.setup(&SetupConfig {
            is_enabled_presolve: false,
            is_enabled_initial_value_correction: false,
            selection_mode: SelectionMode::None,
        });
        assert!(matches!(
            result,
            Err(ModelError::InconsistentInitialValue(_))
        ));
    }

    #[test]
    fn test_nonlinear_objective_marks_model_nonlinear() {
        let mut model = Model::new("nl");
        let x = model.add_variables("x", 2, 0, 3).expect("variables");
        let ids = x.clone();
        model.minimize_function(Arc::new(move |mv, values| {
            ids.iter()
                .map(|&v| {
                    let value = mv.altered_value(v).unwrap_or(values[v.get()]);
                    (value * value) as ScoreValue
                })
                .sum()
        }));
        model
            .setup(&SetupConfig {
                is_enabled_presolve: false,
                ..SetupConfig::default()
            })
            .expect("setup");
        assert!(!model.is_linear());

        model.set_initial_value(x[0], 2);
        model.set_initial_value(x[1], 3);
        model.update();
        assert_eq!(model.objective_value(), 13.0);

        let local = penalties(&model, 1.0);
        let global = penalties(&model, 1.0);
        let score = model.evaluate(&Move::noop(), &local, &global);
        // Nonlinear objectives are always considered improvable.
        assert!(score.is_objective_improvable);
    }

    #[test]
    fn test_maximization_sign_in_augmented_objective() {
        let mut model = Model::new("max");
        let x = model.add_variables("x", 2, 0, 1).expect("variables");
        model.maximize(Expression::sum_of(&x));
        model
            .setup(&SetupConfig {
                is_enabled_presolve: false,
                ..SetupConfig::default()
            })
            .expect("setup");
        model.set_initial_value(x[0], 1);
        model.set_initial_value(x[1], 1);
        model.update();

        let local = penalties(&model, 1.0);
        let global = penalties(&model, 1.0);
        let score = model.evaluate(&Move::noop(), &local, &global);
        assert_eq!(score.objective, 2.0);
        assert_eq!(score.global_augmented_objective, -2.0);
    }
}
