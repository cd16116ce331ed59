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

//! Short- and long-term search memory.
//!
//! The short-term memory records the iteration at which each variable was
//! last altered; tabu status is `iteration - last_update < tenure`. The
//! long-term memory counts alterations per variable and feeds the bias
//! metric the controller uses as a diversity proxy.

use rand::Rng;
use tabu_mip_model::model::Model;
use tabu_mip_model::mov::Move;
use tabu_mip_model::proxy::ValueProxy;

/// Sufficiently negative so `iteration - last_update` is large and finite
/// for never-touched variables.
pub const INITIAL_LAST_UPDATE_ITERATION: i64 = -1_000;

#[derive(Debug, Clone)]
pub struct Memory {
    last_update_iterations: Vec<ValueProxy<i64>>,
    update_counts: Vec<ValueProxy<i64>>,
    total_update_count: i64,
}

impl Memory {
    pub fn new(model: &Model) -> Self {
        Self {
            last_update_iterations: model
                .generate_variable_parameter_proxies(INITIAL_LAST_UPDATE_ITERATION),
            update_counts: model.generate_variable_parameter_proxies(0i64),
            total_update_count: 0,
        }
    }

    #[inline]
    pub fn last_update_iterations(&self) -> &[ValueProxy<i64>] {
        &self.last_update_iterations
    }

    #[inline]
    pub fn update_counts(&self) -> &[ValueProxy<i64>] {
        &self.update_counts
    }

    #[inline]
    pub fn total_update_count(&self) -> i64 {
        self.total_update_count
    }

    /// Last-update iteration of one variable.
    #[inline]
    pub fn last_update_iteration_of(
        &self,
        model: &Model,
        variable: tabu_mip_model::var::VariableId,
    ) -> i64 {
        let v = model.variable(variable);
        self.last_update_iterations[v.proxy_id()][v.flat_index()]
    }

    /// Records `mv` as applied at `iteration`.
    pub fn update(&mut self, model: &Model, mv: &Move, iteration: i64) {
        for &(variable, _) in &mv.alterations {
            let v = model.variable(variable);
            self.last_update_iterations[v.proxy_id()][v.flat_index()] = iteration;
            self.update_counts[v.proxy_id()][v.flat_index()] += 1;
            self.total_update_count += 1;
        }
    }

    /// Like [`update`](Self::update) but jitters the recorded iteration
    /// uniformly within `±width`, spreading tabu expirations.
    pub fn update_randomized<R: Rng>(
        &mut self,
        model: &Model,
        mv: &Move,
        iteration: i64,
        width: usize,
        rng: &mut R,
    ) {
        if width == 0 {
            self.update(model, mv, iteration);
            return;
        }
        let width = width as i64;
        for &(variable, _) in &mv.alterations {
            let v = model.variable(variable);
            let jitter = rng.random_range(-width..width);
            self.last_update_iterations[v.proxy_id()][v.flat_index()] = iteration + jitter;
            self.update_counts[v.proxy_id()][v.flat_index()] += 1;
            self.total_update_count += 1;
        }
    }

    pub fn reset_last_update_iterations(&mut self) {
        for proxy in self.last_update_iterations.iter_mut() {
            proxy.fill(INITIAL_LAST_UPDATE_ITERATION);
        }
    }

    /// `Σ (update_count / total)²`: high when updates concentrate on few
    /// variables, low when spread out.
    pub fn bias(&self) -> f64 {
        if self.total_update_count == 0 {
            return 0.0;
        }
        let total = self.total_update_count as f64;
        let mut result = 0.0;
        for proxy in &self.update_counts {
            for &count in proxy.values() {
                let frequency = count as f64 / total;
                result += frequency * frequency;
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use tabu_mip_model::expr::Expression;
    use tabu_mip_model::model::SetupConfig;
    use tabu_mip_model::mov::MoveSense;
    use tabu_mip_model::var::VariableId;

    fn model_with_variables(n: usize) -> (Model, Vec<VariableId>) {
        let mut model = Model::new("memory");
        let x = model.add_variables("x", n, 0, 1).expect("variables");
        model.minimize(Expression::sum_of(&x));
        model
            .setup(&SetupConfig {
                is_enabled_presolve: false,
                ..SetupConfig::default()
            })
            .expect("setup");
        (model, x)
    }

    #[test]
    fn test_initial_state() {
        let (model, x) = model_with_variables(4);
        let memory = Memory::new(&model);
        assert_eq!(memory.total_update_count(), 0);
        assert_eq!(memory.bias(), 0.0);
        assert_eq!(
            memory.last_update_iteration_of(&model, x[0]),
            INITIAL_LAST_UPDATE_ITERATION
        );
    }

    #[test]
    fn test_update_records_iteration_and_counts() {
        let (model, x) = model_with_variables(4);
        let mut memory = Memory::new(&model);

        let mv = Move::new(MoveSense::Binary).with_alteration(x[1], 1);
        memory.update(&model, &mv, 5);
        assert_eq!(memory.last_update_iteration_of(&model, x[1]), 5);
        assert_eq!(memory.total_update_count(), 1);

        let swap = Move::new(MoveSense::Selection)
            .with_alteration(x[1], 0)
            .with_alteration(x[2], 1);
        memory.update(&model, &swap, 9);
        assert_eq!(memory.last_update_iteration_of(&model, x[1]), 9);
        assert_eq!(memory.last_update_iteration_of(&model, x[2]), 9);
        assert_eq!(memory.total_update_count(), 3);
    }

    #[test]
    fn test_bias_concentration() {
        let (model, x) = model_with_variables(4);
        let mut memory = Memory::new(&model);

        // All updates on one variable: bias is 1.
        for i in 0..8 {
            let mv = Move::new(MoveSense::Binary).with_alteration(x[0], i % 2);
            memory.update(&model, &mv, i);
        }
        assert!((memory.bias() - 1.0).abs() < 1e-12);

        // Spread evenly: bias drops toward 1/n.
        let (model, x) = model_with_variables(4);
        let mut memory = Memory::new(&model);
        for (i, &v) in x.iter().enumerate() {
            let mv = Move::new(MoveSense::Binary).with_alteration(v, 1);
            memory.update(&model, &mv, i as i64);
        }
        assert!((memory.bias() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_randomized_update_stays_within_width() {
        let (model, x) = model_with_variables(2);
        let mut memory = Memory::new(&model);
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let mv = Move::new(MoveSense::Binary).with_alteration(x[0], 1);
        memory.update_randomized(&model, &mv, 100, 5, &mut rng);
        let recorded = memory.last_update_iteration_of(&model, x[0]);
        assert!((95..105).contains(&recorded));
        assert_eq!(memory.total_update_count(), 1);
    }

    #[test]
    fn test_reset_restores_initial_iterations() {
        let (model, x) = model_with_variables(2);
        let mut memory = Memory::new(&model);
        let mv = Move::new(MoveSense::Binary).with_alteration(x[0], 1);
        memory.update(&model, &mv, 3);
        memory.reset_last_update_iterations();
        assert_eq!(
            memory.last_update_iteration_of(&model, x[0]),
            INITIAL_LAST_UPDATE_ITERATION
        );
        // Long-term memory survives the reset.
        assert_eq!(memory.total_update_count(), 1);
    }
}
