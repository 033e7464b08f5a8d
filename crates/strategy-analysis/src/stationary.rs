//! Long-run state distribution under noise
//!
//! Every recorded move is flipped independently with probability `noise`.
//! The resulting Markov chain over states is ergodic for any noise in
//! (0, 1), so its stationary vector is unique.

use serde::{Deserialize, Serialize};
use crate::config::{validate_noise, AnalysisConfig, PayoffMatrix};
use crate::error::{Error, Result};
use crate::strategy::{Move, Strategy};

const PIVOT_TOLERANCE: f64 = 1e-12;

/// Column-stochastic one-round transition matrix.
///
/// `u[i][j]` is the probability of moving from state `j` to state `i` when
/// `focal` plays history 0 and `opponent` plays every other history.
pub fn transition_matrix(focal: &Strategy, opponent: &Strategy, noise: f64) -> Result<Vec<Vec<f64>>> {
    validate_noise(noise)?;
    let space = focal.space();
    if opponent.space() != space {
        return Err(Error::SpaceMismatch { expected: space.size(), got: opponent.space().size() });
    }
    let n = space.size();
    let histories = space.histories() as i32;
    let mut u = vec![vec![0.0; n]; n];
    for from in space.states() {
        let intended = focal.step_with(from, opponent);
        for to in space.states() {
            if let Some(flips) = to.last_round_difference(&intended) {
                let flips = flips as i32;
                u[to.id()][from.id()] = noise.powi(flips) * (1.0 - noise).powi(histories - flips);
            }
        }
    }
    Ok(u)
}

/// Solve `x = U x` with `sum(x) = 1`
pub fn solve(u: &[Vec<f64>]) -> Result<Vec<f64>> {
    let n = u.len();
    if n == 0 {
        return Ok(Vec::new());
    }
    let mut a: Vec<Vec<f64>> = u
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut row = row.clone();
            row[i] -= 1.0;
            row
        })
        .collect();
    a[n - 1] = vec![1.0; n];
    let mut b = vec![0.0; n];
    b[n - 1] = 1.0;
    gaussian_elimination(a, b)
}

/// Gaussian elimination with partial pivoting
fn gaussian_elimination(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>> {
    let n = b.len();
    for column in 0..n {
        let pivot = (column..n)
            .max_by(|&i, &j| a[i][column].abs().total_cmp(&a[j][column].abs()))
            .unwrap_or(column);
        if a[pivot][column].abs() < PIVOT_TOLERANCE {
            return Err(Error::SingularSystem { column });
        }
        a.swap(column, pivot);
        b.swap(column, pivot);

        for row in (column + 1)..n {
            let factor = a[row][column] / a[column][column];
            if factor == 0.0 {
                continue;
            }
            for k in column..n {
                a[row][k] -= factor * a[column][k];
            }
            b[row] -= factor * b[column];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Ok(x)
}

pub fn stationary_distribution(focal: &Strategy, opponent: &Strategy, noise: f64) -> Result<Vec<f64>> {
    solve(&transition_matrix(focal, opponent, noise)?)
}

/// Long-run frequency of each last-round outcome, from the focal view
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OutcomeFrequencies {
    pub mutual_cooperation: f64,
    /// Focal cooperated, opponent defected
    pub exploited: f64,
    /// Focal defected, opponent cooperated
    pub exploiting: f64,
    pub mutual_defection: f64,
}

impl OutcomeFrequencies {
    /// Per-round (focal, opponent) payoff
    pub fn expected_payoffs(&self, payoffs: &PayoffMatrix) -> (f64, f64) {
        [
            (self.mutual_cooperation, Move::Cooperate, Move::Cooperate),
            (self.exploited, Move::Cooperate, Move::Defect),
            (self.exploiting, Move::Defect, Move::Cooperate),
            (self.mutual_defection, Move::Defect, Move::Defect),
        ]
        .into_iter()
        .fold((0.0, 0.0), |(fa, fb), (p, a, b)| {
            let (sa, sb) = payoffs.scores(a, b);
            (fa + p * sa, fb + p * sb)
        })
    }

    pub fn total(&self) -> f64 {
        self.mutual_cooperation + self.exploited + self.exploiting + self.mutual_defection
    }
}

/// Sum a distribution over states sharing the same last round
pub fn outcome_frequencies(focal: &Strategy, distribution: &[f64]) -> OutcomeFrequencies {
    let mut out = OutcomeFrequencies::default();
    for (s, p) in focal.space().states().zip(distribution) {
        let slot = match (s.last(0), s.last(1)) {
            (Move::Cooperate, Move::Cooperate) => &mut out.mutual_cooperation,
            (Move::Cooperate, Move::Defect) => &mut out.exploited,
            (Move::Defect, Move::Cooperate) => &mut out.exploiting,
            (Move::Defect, Move::Defect) => &mut out.mutual_defection,
        };
        *slot += p;
    }
    out
}

/// Stationary outcome frequencies for a pairing under `config`
pub fn long_run(focal: &Strategy, opponent: &Strategy, config: &AnalysisConfig) -> Result<OutcomeFrequencies> {
    config.validate()?;
    let distribution = stationary_distribution(focal, opponent, config.noise)?;
    Ok(outcome_frequencies(focal, &distribution))
}
