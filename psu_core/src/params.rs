//! Learned gauge parameters.
use chrono::{DateTime, Utc};

/// Learned MAX17055 parameters, as raw 16-bit register contents.
///
/// Two records are equal when their four capacity/coefficient registers
/// match; the timestamp and cycle count are ignored.
#[derive(Debug, Clone, Copy)]
pub struct LearnedParams {
    pub calibrated_on: Option<DateTime<Utc>>,
    pub r_comp_0: u16,
    pub temp_co: u16,
    pub full_cap_rep: u16,
    pub full_cap_nom: u16,
    pub cycles: u16,
}

impl LearnedParams {
    pub const fn new(
        r_comp_0: u16,
        temp_co: u16,
        full_cap_rep: u16,
        full_cap_nom: u16,
        cycles: u16,
    ) -> Self {
        Self {
            calibrated_on: None,
            r_comp_0,
            temp_co,
            full_cap_rep,
            full_cap_nom,
            cycles,
        }
    }

    #[must_use]
    pub fn stamped(mut self, at: DateTime<Utc>) -> Self {
        self.calibrated_on = Some(at);
        self
    }

    /// Stamp with the current time unless a timestamp is already present.
    #[must_use]
    pub fn stamped_if_missing(self) -> Self {
        match self.calibrated_on {
            Some(_) => self,
            None => self.stamped(Utc::now()),
        }
    }
}

impl PartialEq for LearnedParams {
    fn eq(&self, other: &Self) -> bool {
        self.r_comp_0 == other.r_comp_0
            && self.temp_co == other.temp_co
            && self.full_cap_rep == other.full_cap_rep
            && self.full_cap_nom == other.full_cap_nom
    }
}

impl Eq for LearnedParams {}

impl std::fmt::Display for LearnedParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "r_comp_0={} temp_co={} full_cap_rep={} full_cap_nom={} cycles={}",
            self.r_comp_0, self.temp_co, self.full_cap_rep, self.full_cap_nom, self.cycles
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn equality_ignores_timestamp_and_cycles() {
        let a = LearnedParams::new(156, 9278, 3471, 1933, 100);
        let b = LearnedParams::new(156, 9278, 3471, 1933, 250)
            .stamped(Utc.with_ymd_and_hms(2021, 1, 2, 9, 34, 48).unwrap());
        assert_eq!(a, b);
    }

    #[test]
    fn any_coefficient_difference_breaks_equality() {
        let base = LearnedParams::new(156, 9278, 3471, 1933, 100);
        for changed in [
            LearnedParams { r_comp_0: 157, ..base },
            LearnedParams { temp_co: 9279, ..base },
            LearnedParams { full_cap_rep: 3470, ..base },
            LearnedParams { full_cap_nom: 1934, ..base },
        ] {
            assert_ne!(base, changed);
        }
    }

    #[test]
    fn stamping_keeps_existing_timestamp() {
        let at = Utc.with_ymd_and_hms(2020, 6, 1, 0, 0, 0).unwrap();
        let p = LearnedParams::new(1, 2, 3, 4, 5).stamped(at).stamped_if_missing();
        assert_eq!(p.calibrated_on, Some(at));
        assert!(LearnedParams::new(1, 2, 3, 4, 5).stamped_if_missing().calibrated_on.is_some());
    }
}
