#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/carhart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod covariance;
pub mod error;
pub mod metrics;
pub mod optimizer;
pub mod returns;

pub use covariance::{
    CovarianceError, CovarianceEstimator, SampleCovariance, StandardizedCovariance,
};
pub use error::{Result, RiskError};
pub use metrics::{
    PortfolioMetrics, RiskAnalytics, RiskConfig, expected_shortfall, historical_var,
};
pub use optimizer::{OptimizationError, OptimizerConfig, Portfolio, PortfolioOptimizer};
pub use returns::{ReturnMatrix, interpolate_gaps};
