#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/carhart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod carhart;
pub mod error;
pub mod linalg;
pub mod ols;
pub mod screening;

pub use carhart::{
    CoefficientStats, ModelDiagnostics, RegressionBatch, RegressionCache, RegressionEngine,
    RegressionKey, RegressionResult, Regressor,
};
pub use error::{RegressionError, Result, ScreeningError};
pub use ols::{OlsFit, fit_ols};
pub use screening::{Acceptance, ScreeningConfig, ScreeningFilter, ScreeningOutcome, Thresholds};
