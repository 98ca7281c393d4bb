//! Deterministic D'Hondt baseline simulation.
//!
//! The MILP treats rounds before the first contested seat as fixed
//! history; this simulator supplies that history. It never touches the
//! solver.

use crate::error::ConfigError;

/// Result of a greedy highest-averages simulation over `num_seats`
/// rounds.
///
/// Party identity is positional: callers index parties in a fixed
/// (lexicographic) order and pass votes in that order.
#[derive(Debug, Clone)]
pub struct Baseline {
    winners: Vec<usize>,
    seats_entering: Vec<Vec<u32>>,
}

impl Baseline {
    /// Run the simulation for one district. `parties` and `votes` run
    /// parallel; `district` and the party names only feed diagnostics.
    ///
    /// Quotient ties are broken by the lowest party index, so the
    /// outcome is a deterministic function of the input order.
    pub fn simulate(
        district: &str,
        parties: &[String],
        votes: &[f64],
        num_seats: u32,
    ) -> Result<Baseline, ConfigError> {
        if votes.is_empty() {
            return Err(ConfigError::NoParties {
                district: district.to_string(),
            });
        }
        if num_seats == 0 {
            return Err(ConfigError::ZeroSeats {
                district: district.to_string(),
            });
        }
        for (party, &count) in votes.iter().enumerate() {
            if count < 0.0 {
                return Err(ConfigError::NegativeVotes {
                    district: district.to_string(),
                    party: parties[party].clone(),
                    votes: count,
                });
            }
        }

        let num_parties = votes.len();
        let mut quotients: Vec<f64> = votes.to_vec();
        let mut wins: Vec<u32> = vec![0; num_parties];
        let mut winners: Vec<usize> = Vec::with_capacity(num_seats as usize);
        // Row r holds seats per party entering round r+1; row 0 is all
        // zeros.
        let mut seats_entering: Vec<Vec<u32>> = Vec::with_capacity(num_seats as usize + 1);
        seats_entering.push(wins.clone());

        for _ in 0..num_seats {
            let mut current = 0;
            for candidate in 1..num_parties {
                if quotients[current] < quotients[candidate] {
                    current = candidate;
                }
            }
            winners.push(current);
            wins[current] += 1;
            quotients[current] = votes[current] / (wins[current] as f64 + 1.0);
            seats_entering.push(wins.clone());
        }

        Ok(Baseline {
            winners,
            seats_entering,
        })
    }

    /// Per-round winners, round 1 first.
    pub fn winners(&self) -> &[usize] {
        &self.winners
    }

    /// Total rounds won by a party.
    pub fn wins(&self, party: usize) -> u32 {
        self.winners.iter().filter(|&&w| w == party).count() as u32
    }

    /// Seats held by each party entering 1-based round `round`
    /// (i.e. after `round - 1` rounds). `round` may be `num_seats + 1`
    /// for the final tally.
    pub fn seats_entering(&self, round: u32) -> &[u32] {
        assert!(round >= 1, "rounds are 1-based");
        &self.seats_entering[(round - 1) as usize]
    }

    pub fn num_rounds(&self) -> u32 {
        self.winners.len() as u32
    }
}
