use thiserror::Error;

/// Malformed registrations: series-length mismatches, out-of-bounds energy
/// targets, illegal attribute combinations, dangling references.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("battery {battery_id}: {field} ({value}) outside bounds [{min}, {max}]")]
    EnergyOutOfBounds {
        battery_id: u32,
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("battery {battery_id}: capacity must be positive, got {value}")]
    NonPositiveCapacity { battery_id: u32, value: f64 },

    #[error("battery {battery_id}: efficiency {field} must be in (0, 1], got {value}")]
    InvalidEfficiency {
        battery_id: u32,
        field: &'static str,
        value: f64,
    },

    #[error(
        "battery {battery_id}: power_charge_min is only permitted when power_discharge_max = 0"
    )]
    IncompatiblePowerSettings { battery_id: u32 },

    #[error("battery {battery_id}: connection schedule length {actual} does not match horizon length {expected}")]
    ConnectionLengthMismatch {
        battery_id: u32,
        actual: usize,
        expected: usize,
    },

    #[error("series '{name}' has length {actual}, expected {expected}")]
    SeriesLengthMismatch {
        name: &'static str,
        actual: usize,
        expected: usize,
    },

    #[error("battery {battery_id} references unknown charging point {cp_id}")]
    UnknownChargingPoint { battery_id: u32, cp_id: u32 },

    #[error("battery {battery_id}: single_continuous_session_allowed requires a connection schedule with at most one contiguous session")]
    MultipleChargingSessions { battery_id: u32 },

    #[error("fleet has no registered batteries")]
    EmptyFleet,

    #[error("no horizon could be derived: register at least one time series")]
    EmptyHorizon,

    #[error("datetime index is not strictly increasing")]
    NonMonotonicIndex,

    #[error("datetime index length {actual} does not match horizon length {expected}")]
    IndexLengthMismatch { actual: usize, expected: usize },

    #[error("grid limit {name} must be non-negative, got {value}")]
    NegativeGridLimit { name: &'static str, value: f64 },

    #[error("grid efficiency {name} must be in (0, 1], got {value}")]
    InvalidGridEfficiency { name: &'static str, value: f64 },

    #[error("site id must be non-negative, got {0}")]
    NegativeSiteId(i64),

    #[error("charging point count must be non-negative, got {0}")]
    NegativeChargingPointCount(i64),

    #[error("charging-point booking interval is invalid: start must precede end")]
    InvalidBookingInterval,

    #[error("charging point {0} is already booked over the requested interval")]
    BookingConflict(u32),

    #[error("step size dt must be strictly positive, got {0}")]
    NonPositiveStep(f64),
}

/// Incompatible feature-flag combinations detected at `optimize()` time.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("marketed flex volumes were registered without flex prices")]
    MarketedFlexWithoutPrices,

    #[error("symmetrical_flex requires flex prices to be registered")]
    SymmetricalFlexWithoutPrices,

    #[error("allow_curtailment requires a site load series to be registered")]
    CurtailmentWithoutSiteLoad,

    #[error("limit_as_penalty was set but no site or grid limits are registered")]
    LimitPenaltyWithoutLimits,
}

/// The terminal status a solve can report, per the solver harness (C6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveErrorKind {
    Infeasible,
    Unbounded,
    Timeout,
    SolverFailure,
}

impl std::fmt::Display for SolveErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Infeasible => "INFEASIBLE",
            Self::Unbounded => "UNBOUNDED",
            Self::Timeout => "TIMEOUT",
            Self::SolverFailure => "SOLVER_FAILURE",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("solve failed with status {kind}: {message}")]
pub struct SolveError {
    pub kind: SolveErrorKind,
    pub message: String,
}

impl SolveError {
    pub fn new(kind: SolveErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Invariant violations discovered after a nominally successful solve. These
/// should never occur; surfacing them beats panicking on a caller's behalf.
#[derive(Debug, Error, PartialEq)]
#[error("internal invariant violated: {0}")]
pub struct InternalError(pub String);

/// Top-level error returned from the fleet optimizer's public API.
#[derive(Debug, Error)]
pub enum FleetError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Solve(#[from] SolveError),
    #[error(transparent)]
    Internal(#[from] InternalError),
}

pub type FleetResultT<T> = std::result::Result<T, FleetError>;
