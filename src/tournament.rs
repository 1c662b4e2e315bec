use tracing::debug;

use crate::draw::{draw_index, RandomSource};
use crate::error::{WheelError, WheelResult};
use crate::types::{Participant, RoundResult, MIN_TOURNAMENT_POOL};

/// Cooperative stop check, consulted once between rounds.
pub trait CancelCheck {
    fn should_cancel(&mut self) -> bool;
}

impl<F: FnMut() -> bool> CancelCheck for F {
    fn should_cancel(&mut self) -> bool {
        self()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NeverCancel;

impl CancelCheck for NeverCancel {
    fn should_cancel(&mut self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TournamentOutcome {
    Completed,
    Cancelled,
}

/// Shrinks a pool one random draw at a time until a single participant is
/// left. The drawn participant of each round is the one removed; the last
/// one standing is the survivor.
#[derive(Debug, Clone)]
pub struct EliminationTournament {
    pool: Vec<Participant>,
    rounds: Vec<RoundResult>,
}

impl EliminationTournament {
    pub fn new(pool: Vec<Participant>) -> WheelResult<Self> {
        if pool.len() < MIN_TOURNAMENT_POOL {
            return Err(WheelError::invalid(format!(
                "tournament needs at least {MIN_TOURNAMENT_POOL} participants, got {}",
                pool.len()
            )));
        }
        Ok(EliminationTournament {
            pool,
            rounds: Vec::new(),
        })
    }

    pub fn pool(&self) -> &[Participant] {
        &self.pool
    }

    pub fn rounds(&self) -> &[RoundResult] {
        &self.rounds
    }

    pub fn is_finished(&self) -> bool {
        self.pool.len() == 1
    }

    pub fn survivor(&self) -> Option<&Participant> {
        if self.is_finished() {
            self.pool.first()
        } else {
            None
        }
    }

    /// Rounds still to play before a survivor is known.
    pub fn rounds_left(&self) -> usize {
        self.pool.len().saturating_sub(1)
    }

    /// Play one round. Returns `Ok(None)` once the survivor is known.
    pub fn next_round<R: RandomSource + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> WheelResult<Option<RoundResult>> {
        if self.is_finished() {
            return Ok(None);
        }
        let winner_index = draw_index(rng, self.pool.len())?;
        let winner = self.pool.remove(winner_index);
        let result = RoundResult {
            round: self.rounds.len() + 1,
            winner_index,
            winner,
            remaining_pool: self.pool.clone(),
        };
        debug!(
            round = result.round,
            index = winner_index,
            label = %result.winner.label,
            remaining = self.pool.len(),
            "elimination round drawn"
        );
        self.rounds.push(result.clone());
        Ok(Some(result))
    }

    /// Play every remaining round, asking `cancel` between rounds. This is
    /// the synchronous driver for callers with nothing to animate; the wheel
    /// session steps `next_round` itself so it can wait between rounds, and
    /// consults the same `CancelCheck` on its gate.
    pub fn run<R, C>(&mut self, rng: &mut R, cancel: &mut C) -> WheelResult<TournamentOutcome>
    where
        R: RandomSource + ?Sized,
        C: CancelCheck + ?Sized,
    {
        while !self.is_finished() {
            if !self.rounds.is_empty() && cancel.should_cancel() {
                return Ok(TournamentOutcome::Cancelled);
            }
            self.next_round(rng)?;
        }
        Ok(TournamentOutcome::Completed)
    }
}

/// Single draw used to bring one participant back into play. The minimum
/// pool size for this step is caller policy.
pub fn draw_reinstatement<R: RandomSource + ?Sized>(
    pool: &[Participant],
    rng: &mut R,
) -> WheelResult<(usize, Participant)> {
    let index = draw_index(rng, pool.len())?;
    Ok((index, pool[index].clone()))
}
