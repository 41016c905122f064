//! Transition count matrices and their connectivity.

use ndarray::{Array1, Array2};
use rayon::prelude::*;

use crate::error::MsmError;

/// K×K matrix of observed `(i → j)` transition counts at a fixed lag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountMatrix {
    counts: Array2<u64>,
}

impl CountMatrix {
    /// Wraps an existing square count matrix.
    ///
    /// # Errors
    ///
    /// - [`MsmError::EmptyData`] if the matrix has no states.
    /// - [`MsmError::InvalidConfig`] if it is not square.
    pub fn new(counts: Array2<u64>) -> Result<Self, MsmError> {
        let (r, c) = counts.dim();
        if r == 0 {
            return Err(MsmError::EmptyData);
        }
        if r != c {
            return Err(MsmError::InvalidConfig {
                reason: format!("count matrix must be square, got {r}x{c}"),
            });
        }
        Ok(Self { counts })
    }

    /// Counts `(s[t], s[t + lag])` pairs over every sequence.
    ///
    /// With `sliding_window` every start `t` is used; otherwise only
    /// `t = 0, lag, 2·lag, …` (statistically independent pairs). Sequences
    /// are counted in parallel and the per-sequence matrices summed.
    ///
    /// # Errors
    ///
    /// - [`MsmError::InvalidLag`] if `lag == 0`.
    /// - [`MsmError::EmptyData`] if `n_states == 0`.
    /// - [`MsmError::StateOutOfRange`] if a label is `>= n_states`.
    pub fn from_sequences(
        sequences: &[Vec<usize>],
        n_states: usize,
        lag: usize,
        sliding_window: bool,
    ) -> Result<Self, MsmError> {
        if lag == 0 {
            return Err(MsmError::InvalidLag { lag });
        }
        if n_states == 0 {
            return Err(MsmError::EmptyData);
        }
        if let Some(&state) = sequences.iter().flatten().find(|&&s| s >= n_states) {
            return Err(MsmError::StateOutOfRange { state, n_states });
        }

        let step = if sliding_window { 1 } else { lag };
        let counts = sequences
            .par_iter()
            .map(|seq| {
                let mut local = Array2::<u64>::zeros((n_states, n_states));
                if seq.len() > lag {
                    for t in (0..seq.len() - lag).step_by(step) {
                        local[[seq[t], seq[t + lag]]] += 1;
                    }
                }
                local
            })
            .reduce(
                || Array2::<u64>::zeros((n_states, n_states)),
                |a, b| a + b,
            );
        Ok(Self { counts })
    }

    /// Number of states.
    pub fn n_states(&self) -> usize {
        self.counts.nrows()
    }

    /// Count of `i → j` transitions.
    pub fn get(&self, i: usize, j: usize) -> u64 {
        self.counts[[i, j]]
    }

    /// Total number of counted transitions.
    pub fn total(&self) -> u64 {
        self.counts.sum()
    }

    /// Outgoing counts per state.
    pub fn row_sums(&self) -> Array1<u64> {
        self.counts.sum_axis(ndarray::Axis(1))
    }

    /// The raw count matrix.
    pub fn as_array(&self) -> &Array2<u64> {
        &self.counts
    }

    /// Counts as floating point, for the estimators.
    pub fn to_f64(&self) -> Array2<f64> {
        self.counts.mapv(|c| c as f64)
    }

    /// Strongly connected components of the graph with an edge `i → j`
    /// wherever `C_ij > 0`, largest first.
    pub fn connected_components(&self) -> Vec<Vec<usize>> {
        let adjacency = self.counts.mapv(|c| c > 0);
        let mut components = strongly_connected_components(&adjacency);
        components.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        components
    }

    /// Checks that every state can reach every other state.
    ///
    /// A state with no outgoing or no incoming counts forms its own
    /// component, so this also rejects sink and source states.
    ///
    /// # Errors
    ///
    /// Returns [`MsmError::Disconnected`] if there is more than one strongly
    /// connected component.
    pub fn check_connected(&self) -> Result<(), MsmError> {
        let components = self.connected_components();
        if components.len() > 1 {
            return Err(MsmError::Disconnected {
                n_components: components.len(),
                largest: components[0].len(),
            });
        }
        Ok(())
    }
}

/// Kosaraju's algorithm with explicit stacks; components are returned with
/// sorted members.
fn strongly_connected_components(adjacency: &Array2<bool>) -> Vec<Vec<usize>> {
    let n = adjacency.nrows();

    // Pass 1: finishing order on the forward graph.
    let mut visited = vec![false; n];
    let mut order = Vec::with_capacity(n);
    for root in 0..n {
        if visited[root] {
            continue;
        }
        visited[root] = true;
        let mut stack = vec![(root, 0usize)];
        while let Some(top) = stack.last_mut() {
            let (node, start) = *top;
            if let Some(child) = (start..n).find(|&j| adjacency[[node, j]] && !visited[j]) {
                top.1 = child + 1;
                visited[child] = true;
                stack.push((child, 0));
            } else {
                order.push(node);
                stack.pop();
            }
        }
    }

    // Pass 2: collect components on the transposed graph in reverse order.
    let mut assigned = vec![false; n];
    let mut components = Vec::new();
    for &root in order.iter().rev() {
        if assigned[root] {
            continue;
        }
        assigned[root] = true;
        let mut component = vec![root];
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            for j in 0..n {
                if adjacency[[j, node]] && !assigned[j] {
                    assigned[j] = true;
                    component.push(j);
                    stack.push(j);
                }
            }
        }
        component.sort_unstable();
        components.push(component);
    }
    components
}
