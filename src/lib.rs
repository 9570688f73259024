//! # wifipos
//! WiFi fingerprint positioning.
//!
//! A query fingerprint (observed BSSIDs with RSSI) is scored against every
//! stored reference fingerprint, shard by shard in parallel, and the best
//! ranked candidates vote on the position label. The [`engine`] is the core;
//! [`persistence`], [`auth`] and [`server`] wrap it into the HTTP service.

pub use crate::utils::error::{Error, Result};

pub mod auth;
pub mod config;
pub mod engine;
pub mod metrics;
pub mod persistence;
pub mod server;
pub mod utils;

pub use crate::engine::{estimate_position, EngineConfig, Estimator};
pub use crate::persistence::{DatasetProvider, MemoryProvider, SqliteProvider};
pub use crate::utils::types::{
    CandidateScore, PositionEstimate, PositionReport, QueryFingerprint, ReferenceRecord,
    SignalObservation,
};
