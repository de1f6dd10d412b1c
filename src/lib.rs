//! Builds and solves mixed-integer linear programs that dispatch a fleet of
//! mobile and stationary batteries against tariffs, site loads, flex
//! markets, and charging-point constraints.

pub mod config;
pub mod domain;
pub mod error;
pub mod horizon;
pub mod model;
pub mod optimizer;
pub mod result;
pub mod solver;

pub use config::FleetConfig;
pub use domain::{AssetStatus, Battery, BatteryKind, ChargingPoint, Grid, Site};
pub use error::{ConfigError, FleetError, SolveError, SolveErrorKind, ValidationError};
pub use horizon::Horizon;
pub use optimizer::{FleetOptimizer, FleetSnapshot};
pub use result::{AggregatedRow, BatteryRow, FleetResult, GridTotals, PoolResult, SiteRow, SolveStatus};
