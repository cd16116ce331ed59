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

//! The three-incumbent holder.
//!
//! Tracks the best local-augmented, best global-augmented and best strictly
//! feasible solutions. `try_update` returns a bitmask of which incumbents a
//! score improved; the controller reads that mask to drive its adaptation.
//! All stored objectives are minimization values.

use tabu_mip_model::model::Model;
use tabu_mip_model::score::SolutionScore;
use tabu_mip_model::solution::Solution;

pub mod update_status {
    pub const NO_UPDATE: u32 = 0;
    pub const LOCAL_AUGMENTED_INCUMBENT_UPDATE: u32 = 1;
    pub const GLOBAL_AUGMENTED_INCUMBENT_UPDATE: u32 = 2;
    pub const FEASIBLE_INCUMBENT_UPDATE: u32 = 4;
}

#[derive(Debug, Clone)]
pub struct IncumbentHolder {
    is_found_feasible_solution: bool,
    local_augmented_incumbent_solution: Solution,
    global_augmented_incumbent_solution: Solution,
    feasible_incumbent_solution: Solution,
    local_augmented_incumbent_objective: f64,
    global_augmented_incumbent_objective: f64,
    feasible_incumbent_objective: f64,
    local_augmented_incumbent_score: SolutionScore,
    global_augmented_incumbent_score: SolutionScore,
    feasible_incumbent_score: SolutionScore,
}

impl Default for IncumbentHolder {
    fn default() -> Self {
        Self::new()
    }
}

impl IncumbentHolder {
    pub fn new() -> Self {
        Self {
            is_found_feasible_solution: false,
            local_augmented_incumbent_solution: Solution::default(),
            global_augmented_incumbent_solution: Solution::default(),
            feasible_incumbent_solution: Solution::default(),
            local_augmented_incumbent_objective: f64::INFINITY,
            global_augmented_incumbent_objective: f64::INFINITY,
            feasible_incumbent_objective: f64::INFINITY,
            local_augmented_incumbent_score: SolutionScore::default(),
            global_augmented_incumbent_score: SolutionScore::default(),
            feasible_incumbent_score: SolutionScore::default(),
        }
    }

    /// Offers `score` for all three incumbents, exporting the model's
    /// solution at most once and only when some criterion improves.
    pub fn try_update(&mut self, model: &Model, score: &SolutionScore) -> u32 {
        let mut status = update_status::NO_UPDATE;
        let mut solution: Option<Solution> = None;

        if score.local_augmented_objective < self.local_augmented_incumbent_objective {
            status += update_status::LOCAL_AUGMENTED_INCUMBENT_UPDATE;
            let exported = solution.get_or_insert_with(|| model.export_solution());
            self.local_augmented_incumbent_solution = exported.clone();
            self.local_augmented_incumbent_score = *score;
            self.local_augmented_incumbent_objective = score.local_augmented_objective;
        }

        if score.global_augmented_objective < self.global_augmented_incumbent_objective {
            status += update_status::GLOBAL_AUGMENTED_INCUMBENT_UPDATE;
            let exported = solution.get_or_insert_with(|| model.export_solution());
            self.global_augmented_incumbent_solution = exported.clone();
            self.global_augmented_incumbent_score = *score;
            self.global_augmented_incumbent_objective = score.global_augmented_objective;
        }

        if score.is_feasible {
            self.is_found_feasible_solution = true;
            let minimized = model.sign() * score.objective;
            if minimized < self.feasible_incumbent_objective {
                status += update_status::FEASIBLE_INCUMBENT_UPDATE;
                let exported = solution.get_or_insert_with(|| model.export_solution());
                self.feasible_incumbent_solution = exported.clone();
                self.feasible_incumbent_score = *score;
                self.feasible_incumbent_objective = minimized;
            }
        }
        status
    }

    /// Offers an already-exported solution, e.g. when merging a phase
    /// result into the controller's holder.
    pub fn try_update_solution(&mut self, solution: &Solution, score: &SolutionScore, sign: f64) -> u32 {
        let mut status = update_status::NO_UPDATE;

        if score.local_augmented_objective < self.local_augmented_incumbent_objective {
            status += update_status::LOCAL_AUGMENTED_INCUMBENT_UPDATE;
            self.local_augmented_incumbent_solution = solution.clone();
            self.local_augmented_incumbent_score = *score;
            self.local_augmented_incumbent_objective = score.local_augmented_objective;
        }

        if score.global_augmented_objective < self.global_augmented_incumbent_objective {
            status += update_status::GLOBAL_AUGMENTED_INCUMBENT_UPDATE;
            self.global_augmented_incumbent_solution = solution.clone();
            self.global_augmented_incumbent_score = *score;
            self.global_augmented_incumbent_objective = score.global_augmented_objective;
        }

        if score.is_feasible {
            self.is_found_feasible_solution = true;
            let minimized = sign * score.objective;
            if minimized < self.feasible_incumbent_objective {
                status += update_status::FEASIBLE_INCUMBENT_UPDATE;
                self.feasible_incumbent_solution = solution.clone();
                self.feasible_incumbent_score = *score;
                self.feasible_incumbent_objective = minimized;
            }
        }
        status
    }

    /// Forgets the phase-scoped local-augmented incumbent objective so the
    /// next phase starts its own race.
    pub fn reset_local_augmented_incumbent(&mut self) {
        self.local_augmented_incumbent_objective = f64::INFINITY;
    }

    #[inline]
    pub fn is_found_feasible_solution(&self) -> bool {
        self.is_found_feasible_solution
    }

    #[inline]
    pub fn local_augmented_incumbent_solution(&self) -> &Solution {
        &self.local_augmented_incumbent_solution
    }

    #[inline]
    pub fn global_augmented_incumbent_solution(&self) -> &Solution {
        &self.global_augmented_incumbent_solution
    }

    #[inline]
    pub fn feasible_incumbent_solution(&self) -> &Solution {
        &self.feasible_incumbent_solution
    }

    /// As a minimization value.
    #[inline]
    pub fn local_augmented_incumbent_objective(&self) -> f64 {
        self.local_augmented_incumbent_objective
    }

    /// As a minimization value.
    #[inline]
    pub fn global_augmented_incumbent_objective(&self) -> f64 {
        self.global_augmented_incumbent_objective
    }

    /// As a minimization value.
    #[inline]
    pub fn feasible_incumbent_objective(&self) -> f64 {
        self.feasible_incumbent_objective
    }

    #[inline]
    pub fn local_augmented_incumbent_score(&self) -> &SolutionScore {
        &self.local_augmented_incumbent_score
    }

    #[inline]
    pub fn global_augmented_incumbent_score(&self) -> &SolutionScore {
        &self.global_augmented_incumbent_score
    }

    #[inline]
    pub fn feasible_incumbent_score(&self) -> &SolutionScore {
        &self.feasible_incumbent_score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabu_mip_model::expr::Expression;
    use tabu_mip_model::model::SetupConfig;

    fn scored(local: f64, global: f64, objective: f64, feasible: bool) -> SolutionScore {
        SolutionScore {
            objective,
            local_augmented_objective: local,
            global_augmented_objective: global,
            is_feasible: feasible,
            ..SolutionScore::default()
        }
    }

    fn model() -> Model {
        let mut model = Model::new("holder");
        let x = model.add_variables("x", 2, 0, 1).expect("variables");
        model.minimize(Expression::sum_of(&x));
        model
            .setup(&SetupConfig {
                is_enabled_presolve: false,
                ..SetupConfig::default()
            })
            .expect("setup");
        model
    }

    #[test]
    fn test_first_update_sets_all_three() {
        let model = model();
        let mut holder = IncumbentHolder::new();
        let status = holder.try_update(&model, &scored(5.0, 6.0, 5.0, true));
        assert_eq!(
            status,
            update_status::LOCAL_AUGMENTED_INCUMBENT_UPDATE
                + update_status::GLOBAL_AUGMENTED_INCUMBENT_UPDATE
                + update_status::FEASIBLE_INCUMBENT_UPDATE
        );
        assert!(holder.is_found_feasible_solution());
        assert_eq!(holder.local_augmented_incumbent_objective(), 5.0);
        assert_eq!(holder.global_augmented_incumbent_objective(), 6.0);
        assert_eq!(holder.feasible_incumbent_objective(), 5.0);
    }

    #[test]
    fn test_worse_score_updates_nothing() {
        let model = model();
        let mut holder = IncumbentHolder::new();
        holder.try_update(&model, &scored(5.0, 6.0, 5.0, true));
        let status = holder.try_update(&model, &scored(7.0, 8.0, 7.0, false));
        assert_eq!(status, update_status::NO_UPDATE);
        assert_eq!(holder.global_augmented_incumbent_objective(), 6.0);
    }

    #[test]
    fn test_incumbent_objectives_are_monotone() {
        let model = model();
        let mut holder = IncumbentHolder::new();
        let sequence = [
            scored(9.0, 9.0, 9.0, false),
            scored(4.0, 7.0, 4.0, true),
            scored(6.0, 5.0, 6.0, false),
            scored(3.0, 3.0, 3.0, true),
        ];
        let mut last_global = f64::INFINITY;
        let mut last_feasible = f64::INFINITY;
        for score in sequence {
            holder.try_update(&model, &score);
            assert!(holder.global_augmented_incumbent_objective() <= last_global);
            assert!(holder.feasible_incumbent_objective() <= last_feasible);
            last_global = holder.global_augmented_incumbent_objective();
            last_feasible = holder.feasible_incumbent_objective();
        }
        assert_eq!(holder.global_augmented_incumbent_objective(), 3.0);
        assert_eq!(holder.feasible_incumbent_objective(), 3.0);
    }

    #[test]
    fn test_reset_local_reopens_only_local_race() {
        let model = model();
        let mut holder = IncumbentHolder::new();
        holder.try_update(&model, &scored(5.0, 6.0, 5.0, false));
        holder.reset_local_augmented_incumbent();
        let status = holder.try_update(&model, &scored(5.5, 7.0, 5.5, false));
        assert_eq!(status, update_status::LOCAL_AUGMENTED_INCUMBENT_UPDATE);
        assert_eq!(holder.local_augmented_incumbent_objective(), 5.5);
        assert_eq!(holder.global_augmented_incumbent_objective(), 6.0);
    }
}
