//! Bozorth3 fingerprint minutia matcher.
//!
//! Computes an integer similarity score between two minutia templates:
//! invariant edge descriptors are built per template, compatible edges are
//! joined into candidate pairs, pairs are grown into geometrically
//! consistent clusters under an injective endpoint association, and
//! mutually compatible clusters are combined into the final score.
//!
//! Scores are reproduced exactly against the reference matcher, including
//! several of its quirks; see the individual modules for the details that
//! are part of that contract.

pub use find_edges::{find_edges, limit_edges};
pub use match_edges::match_edges_into_pairs;
pub use matching::{match_score, match_templates, BozorthState};
pub use pair_holder::PairHolder;
pub use parsing::{load_minutiae, RawMinutia, TemplateError};
pub use template::Template;
pub use types::{BetaOrder, Edge, Endpoint, Format, Minutia, MinutiaKind, Pair};

mod associations;
mod clusters;
pub mod consts;
mod find_edges;
mod groups;
mod match_edges;
mod matching;
mod math;
mod pair_holder;
pub mod parsing;
mod template;
pub mod types;
