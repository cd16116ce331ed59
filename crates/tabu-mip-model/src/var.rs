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

use crate::cons::ConstraintId;
use crate::{ScoreValue, VariableValue};
use std::collections::BTreeMap;

/// Stable arena index of a variable. Ids are dense and assigned in creation
/// order across all variable proxies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VariableId(usize);

impl VariableId {
    #[inline]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn get(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for VariableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VariableId({})", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableClass {
    Binary,
    Integer,
    Selection,
}

/// A bounded integer decision variable.
///
/// The current value lives in the model's contiguous value store, not here;
/// the variable carries the static data: bounds, fixedness, classification
/// and the sensitivity caches built at setup.
#[derive(Debug, Clone)]
pub struct Variable {
    id: VariableId,
    proxy_id: usize,
    flat_index: usize,
    lower_bound: VariableValue,
    upper_bound: VariableValue,
    is_fixed: bool,
    class: VariableClass,
    selection_index: Option<usize>,
    objective_sensitivity: ScoreValue,
    constraint_sensitivities: BTreeMap<ConstraintId, ScoreValue>,
    related_constraints: Vec<ConstraintId>,
}

impl Variable {
    pub fn new(
        id: VariableId,
        proxy_id: usize,
        flat_index: usize,
        lower_bound: VariableValue,
        upper_bound: VariableValue,
    ) -> Self {
        Self {
            id,
            proxy_id,
            flat_index,
            lower_bound,
            upper_bound,
            is_fixed: false,
            class: VariableClass::Integer,
            selection_index: None,
            objective_sensitivity: 0.0,
            constraint_sensitivities: BTreeMap::new(),
            related_constraints: Vec::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> VariableId {
        self.id
    }

    #[inline]
    pub fn proxy_id(&self) -> usize {
        self.proxy_id
    }

    #[inline]
    pub fn flat_index(&self) -> usize {
        self.flat_index
    }

    #[inline]
    pub fn lower_bound(&self) -> VariableValue {
        self.lower_bound
    }

    #[inline]
    pub fn upper_bound(&self) -> VariableValue {
        self.upper_bound
    }

    pub fn set_bounds(&mut self, lower_bound: VariableValue, upper_bound: VariableValue) {
        debug_assert!(lower_bound <= upper_bound);
        self.lower_bound = lower_bound;
        self.upper_bound = upper_bound;
    }

    #[inline]
    pub fn is_fixed(&self) -> bool {
        self.is_fixed
    }

    /// Collapses the bounds onto `value` and marks the variable fixed.
    pub fn fix_to(&mut self, value: VariableValue) {
        self.lower_bound = value;
        self.upper_bound = value;
        self.is_fixed = true;
    }

    #[inline]
    pub fn class(&self) -> VariableClass {
        self.class
    }

    pub fn set_class(&mut self, class: VariableClass) {
        self.class = class;
    }

    #[inline]
    pub fn selection_index(&self) -> Option<usize> {
        self.selection_index
    }

    pub fn set_selection_index(&mut self, index: usize) {
        self.selection_index = Some(index);
        self.class = VariableClass::Selection;
    }

    #[inline]
    pub fn objective_sensitivity(&self) -> ScoreValue {
        self.objective_sensitivity
    }

    pub fn set_objective_sensitivity(&mut self, sensitivity: ScoreValue) {
        self.objective_sensitivity = sensitivity;
    }

    /// Coefficient of this variable in constraint `id`, zero if absent.
    #[inline]
    pub fn constraint_sensitivity(&self, id: ConstraintId) -> ScoreValue {
        self.constraint_sensitivities.get(&id).copied().unwrap_or(0.0)
    }

    #[inline]
    pub fn related_constraints(&self) -> &[ConstraintId] {
        &self.related_constraints
    }

    pub fn register_related_constraint(&mut self, id: ConstraintId, coefficient: ScoreValue) {
        if self
            .constraint_sensitivities
            .insert(id, coefficient)
            .is_none()
        {
            self.related_constraints.push(id);
        }
    }

    pub fn clear_related_constraints(&mut self) {
        self.constraint_sensitivities.clear();
        self.related_constraints.clear();
    }

    /// `true` iff bounds admit exactly the values {0, 1}.
    #[inline]
    pub fn has_binary_bounds(&self) -> bool {
        self.lower_bound == 0 && self.upper_bound == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_variable_defaults() {
        let v = Variable::new(VariableId::new(4), 1, 2, -3, 3);
        assert_eq!(v.id().get(), 4);
        assert_eq!(v.proxy_id(), 1);
        assert_eq!(v.flat_index(), 2);
        assert_eq!(v.lower_bound(), -3);
        assert_eq!(v.upper_bound(), 3);
        assert!(!v.is_fixed());
        assert_eq!(v.class(), VariableClass::Integer);
        assert_eq!(v.objective_sensitivity(), 0.0);
        assert!(v.related_constraints().is_empty());
    }

    #[test]
    fn test_fix_collapses_bounds() {
        let mut v = Variable::new(VariableId::new(0), 0, 0, 0, 10);
        v.fix_to(7);
        assert!(v.is_fixed());
        assert_eq!(v.lower_bound(), 7);
        assert_eq!(v.upper_bound(), 7);
    }

    #[test]
    fn test_related_constraints_deduplicate() {
        let mut v = Variable::new(VariableId::new(0), 0, 0, 0, 1);
        v.register_related_constraint(ConstraintId::new(3), 2.0);
        v.register_related_constraint(ConstraintId::new(5), -1.0);
        v.register_related_constraint(ConstraintId::new(3), 4.0);
        assert_eq!(v.related_constraints().len(), 2);
        assert_eq!(v.constraint_sensitivity(ConstraintId::new(3)), 4.0);
        assert_eq!(v.constraint_sensitivity(ConstraintId::new(5)), -1.0);
        assert_eq!(v.constraint_sensitivity(ConstraintId::new(9)), 0.0);
    }

    #[test]
    fn test_binary_bounds_detection() {
        let v = Variable::new(VariableId::new(0), 0, 0, 0, 1);
        assert!(v.has_binary_bounds());
        let v = Variable::new(VariableId::new(0), 0, 0, 0, 2);
        assert!(!v.has_binary_bounds());
    }
}
