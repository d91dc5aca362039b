// Market regime scoring module
pub mod flow;
pub mod label;
pub mod normalize;
pub mod scorer;
pub mod weights;

pub use flow::{cumulative_flow, investor_flow, InvestorFlow, InvestorTotals};
pub use label::{LabelThresholds, RegimeLabel};
pub use normalize::{Anchor, Curve, Normalization, NEUTRAL_SCORE};
pub use scorer::{RegimeInputs, RegimeScorer, RegimeSnapshot};
pub use weights::{Component, RegimeComponents, RegimeWeights};
