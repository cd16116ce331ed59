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
use crate::var::VariableId;
use serde::{Deserialize, Serialize};

/// How set-partitioning constraints are promoted to selection groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SelectionMode {
    /// No extraction.
    None,
    /// Extract candidates greedily in definition order.
    Defined,
    /// Extract only candidates sharing no variable with another candidate.
    Independent,
    /// Extract candidates greedily, largest group first.
    Larger,
}

/// A maximal set of binary variables covered by an equality-1
/// set-partitioning constraint, of which exactly one is selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    constraint_id: ConstraintId,
    variable_ids: Vec<VariableId>,
}

impl Selection {
    pub fn new(constraint_id: ConstraintId, variable_ids: Vec<VariableId>) -> Self {
        Self {
            constraint_id,
            variable_ids,
        }
    }

    #[inline]
    pub fn constraint_id(&self) -> ConstraintId {
        self.constraint_id
    }

    #[inline]
    pub fn variable_ids(&self) -> &[VariableId] {
        &self.variable_ids
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.variable_ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.variable_ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_accessors() {
        let members = vec![VariableId::new(0), VariableId::new(3), VariableId::new(7)];
        let s = Selection::new(ConstraintId::new(2), members.clone());
        assert_eq!(s.constraint_id(), ConstraintId::new(2));
        assert_eq!(s.variable_ids(), members.as_slice());
        assert_eq!(s.len(), 3);
        assert!(!s.is_empty());
    }
}
