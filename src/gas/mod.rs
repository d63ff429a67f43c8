// src/gas/mod.rs
//! Fee/gas estimation subsystem: snapshot cache, upstream providers and
//! the adaptive estimator.

pub mod estimator;
pub mod provider;
pub mod snapshot;

pub use estimator::{FeeStrategy, GasEstimate, GasEstimator, OperationProfile};
pub use provider::{GasDataProvider, HttpGasProvider, SyntheticGasProvider};
pub use snapshot::{GasSnapshotStore, NetworkGasSnapshot};
