//! Cross-bookmaker fixture matching: name normalisation and correlation.

pub mod correlator;
pub mod normalize;

pub use correlator::{correlate, MatchGroup};
pub use normalize::{canonicalize, has_women_marker, same_team, CanonicalName};
