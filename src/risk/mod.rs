//! Risk scoring: accuracy heuristic + classifier blend → ordinal risk level.

mod engine;

pub use engine::{HeuristicScore, RiskAssessment, RiskEngine, RiskLevel};
