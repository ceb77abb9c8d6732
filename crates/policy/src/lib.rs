//! Transfer protection policy and the decision engine that applies it.
//!
//! Core principle: **when in doubt, let the transfer through.** Every missing
//! handle, unresolvable item or ambiguous menu row classifies as unprotected.

pub mod decision;
mod error;
mod policy;

pub use decision::{
    Classification, Decision, Protection, classify_protection, evaluate_transfer,
    is_exempt_container, should_block,
};
pub use error::{Error, Result};
pub use policy::{DEFAULT_POLICY, DEFAULT_POLICY_FILE, LEGACY_POLICY_FILE, Policy, PolicySource};
