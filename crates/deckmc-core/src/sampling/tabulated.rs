use super::proposal::{Pmf, Proposal};
use super::source::RandomSource;
use crate::model::{Card, DECK_SIZE};
use thiserror::Error;

/// Allowed deviation of a user-supplied table's total mass from one.
pub const MASS_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Error, PartialEq)]
pub enum ProposalError {
    #[error("probability for {card} must be finite and non-negative, got {value}")]
    InvalidProbability { card: Card, value: f64 },
    #[error("probabilities sum to {total}, expected 1")]
    MassMismatch { total: f64 },
}

/// Proposal backed by an explicit 52-entry PMF, validated on construction.
///
/// Cards with zero mass are never drawn; weighting strategies reject them if they show up anyway.
#[derive(Debug, Clone, PartialEq)]
pub struct TabulatedProposal {
    table: [f64; DECK_SIZE],
    cumulative: [f64; DECK_SIZE],
}

impl TabulatedProposal {
    pub fn new(table: [f64; DECK_SIZE]) -> Result<Self, ProposalError> {
        let mut cumulative = [0.0; DECK_SIZE];
        let mut running = 0.0;
        for (id, value) in table.iter().copied().enumerate() {
            if !value.is_finite() || value < 0.0 {
                return Err(ProposalError::InvalidProbability {
                    card: Card::from_id_wrapping(id),
                    value,
                });
            }
            running += value;
            cumulative[id] = running;
        }

        if (running - 1.0).abs() > MASS_TOLERANCE {
            return Err(ProposalError::MassMismatch { total: running });
        }

        Ok(Self { table, cumulative })
    }

    /// Builds the table by evaluating `f` on every card.
    pub fn from_fn<F: FnMut(Card) -> f64>(mut f: F) -> Result<Self, ProposalError> {
        let mut table = [0.0; DECK_SIZE];
        for (id, slot) in table.iter_mut().enumerate() {
            *slot = f(Card::from_id_wrapping(id));
        }
        Self::new(table)
    }

    /// Copies any PMF into a table, e.g. to freeze a closed-form proposal.
    pub fn from_pmf<P: Pmf + ?Sized>(pmf: &P) -> Result<Self, ProposalError> {
        Self::from_fn(|card| pmf.pmf(card))
    }

    fn last_supported(&self) -> usize {
        self.table
            .iter()
            .rposition(|value| *value > 0.0)
            .unwrap_or(DECK_SIZE - 1)
    }
}

impl Pmf for TabulatedProposal {
    fn pmf(&self, card: Card) -> f64 {
        self.table[card.id()]
    }
}

impl Proposal for TabulatedProposal {
    type Output = Card;

    fn name(&self) -> &'static str {
        "tabulated"
    }

    fn draw<R: RandomSource + ?Sized>(&self, rng: &mut R) -> Card {
        let total = self.cumulative[DECK_SIZE - 1];
        let target = rng.next_unit() * total;
        let mut id = self.cumulative.partition_point(|edge| *edge <= target);
        if id >= DECK_SIZE {
            id = self.last_supported();
        }
        Card::from_id_wrapping(id)
    }
}
