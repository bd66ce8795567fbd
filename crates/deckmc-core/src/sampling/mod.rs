//! Proposal distributions and the random source they draw from.
//!
//! - `source`: the injectable [`RandomSource`] seam, implemented for every `rand::Rng`.
//! - `proposal`: closed-form samplers (uniform, face-biased, red-biased, tagged mixture).
//! - `tabulated`: user-supplied PMFs validated at construction.

mod proposal;
mod source;
mod tabulated;

pub use proposal::{
    FACE_BRANCH_PROBABILITY, FaceBiased, MultiProposal, Pmf, PmfConvention, Proposal, RedBiased,
    TARGET_PMF, Uniform, total_mass,
};
pub use source::RandomSource;
pub use tabulated::{MASS_TOLERANCE, ProposalError, TabulatedProposal};
