// Analysis results: boundary normalization, presentation and aggregates.
// Pure derivations only; nothing in here talks to the network.

pub mod normalize;
pub mod presenter;
pub mod report;
pub mod stats;
