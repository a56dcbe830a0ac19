#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/carhart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod builder;
pub mod config;
pub mod error;
pub mod excess;
pub mod momentum;
pub mod size;
pub mod traits;
pub mod value;

pub use builder::{FactorBuilder, MarketFactors, SecurityFactors};
pub use config::{FactorConfig, SmbMeasure};
pub use error::{FactorError, Result};
pub use excess::{ExcessReturnConfig, ExcessReturnFactor, excess_returns};
pub use momentum::{MomentumConfig, MomentumFactor, trailing_momentum};
pub use size::{SizeConfig, SizeFactor};
pub use traits::{MarketFactor, SecurityFactor, StyleFactor};
pub use value::{HmlBreakdown, ValueConfig, ValueFactor};
