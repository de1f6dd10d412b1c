use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A physical charging point: rated power, expected efficiencies, and an
/// interval-booking timeline over the datetime axis. Booking is an
/// auxiliary feature of the asset contract, not consumed by the MILP model
/// itself, which instead assigns batteries to charging points through the
/// `x[b,c,t]` variable family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargingPoint {
    pub asset_id: u32,
    pub charging_power_kw: f64,
    pub discharging_power_kw: f64,
    pub expected_charging_efficiency: f64,
    pub expected_discharging_efficiency: f64,
    /// Number of batteries this charging point can serve simultaneously.
    pub capacity: u32,
    #[serde(skip, default)]
    bookings: Vec<(DateTime<Utc>, DateTime<Utc>)>,
}

impl ChargingPoint {
    pub fn new(
        asset_id: u32,
        charging_power_kw: f64,
        discharging_power_kw: f64,
        expected_charging_efficiency: f64,
        expected_discharging_efficiency: f64,
    ) -> Self {
        Self {
            asset_id,
            charging_power_kw,
            discharging_power_kw,
            expected_charging_efficiency,
            expected_discharging_efficiency,
            capacity: 1,
            bookings: Vec::new(),
        }
    }

    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn is_available(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        !self
            .bookings
            .iter()
            .any(|&(booked_start, booked_end)| start < booked_end && booked_start < end)
    }

    /// Accepted iff the interval is fully free; accepted bookings compose by
    /// union (adjacent or overlapping free intervals both succeed, but any
    /// overlap with an existing booking is rejected).
    pub fn book(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), ValidationError> {
        if start >= end {
            return Err(ValidationError::InvalidBookingInterval);
        }
        if !self.is_available(start, end) {
            return Err(ValidationError::BookingConflict(self.asset_id));
        }
        self.bookings.push((start, end));
        self.bookings.sort_by_key(|&(s, _)| s);
        Ok(())
    }

    pub fn reset(&mut self) {
        self.bookings.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> ChargingPoint {
        ChargingPoint::new(1741, 65.0, 60.0, 0.95, 0.95)
    }

    fn ts(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn creation_carries_fields() {
        let cp = sample();
        assert_eq!(cp.asset_id, 1741);
        assert_eq!(cp.charging_power_kw, 65.0);
        assert_eq!(cp.discharging_power_kw, 60.0);
    }

    #[test]
    fn available_before_booking() {
        assert!(sample().is_available(ts(10), ts(12)));
    }

    #[test]
    fn booking_blocks_the_interval() {
        let mut cp = sample();
        cp.book(ts(10), ts(12)).unwrap();
        assert!(!cp.is_available(ts(10), ts(12)));
        assert!(!cp.is_available(ts(11), ts(13)));
    }

    #[test]
    fn reset_clears_bookings() {
        let mut cp = sample();
        cp.book(ts(10), ts(12)).unwrap();
        cp.reset();
        assert!(cp.is_available(ts(10), ts(12)));
    }

    #[test]
    fn overlapping_booking_is_rejected() {
        let mut cp = sample();
        cp.book(ts(10), ts(12)).unwrap();
        assert!(cp.book(ts(11), ts(13)).is_err());
    }

    #[test]
    fn adjacent_bookings_compose() {
        let mut cp = sample();
        cp.book(ts(10), ts(12)).unwrap();
        assert!(cp.book(ts(12), ts(14)).is_ok());
    }
}
