/// Result of a bond sufficiency check.
///
/// Shift start may not proceed unless [`BondGate::Permitted`] is returned.
#[derive(Clone, Debug, PartialEq)]
pub enum BondGate {
    /// Balance covers the requirement. `percent` is `None` when no bond is
    /// required at all.
    Permitted { percent: Option<f64> },
    /// Balance is below the requirement.
    Blocked { percent: f64 },
}

impl BondGate {
    pub fn is_permitted(&self) -> bool {
        matches!(self, BondGate::Permitted { .. })
    }

    pub fn is_blocked(&self) -> bool {
        !self.is_permitted()
    }

    /// Balance as a percentage of the requirement, if one is configured.
    pub fn percent(&self) -> Option<f64> {
        match self {
            BondGate::Permitted { percent } => *percent,
            BondGate::Blocked { percent } => Some(*percent),
        }
    }
}

/// Evaluate a driver's bond against the requirement (both in minor units).
///
/// `balance / required * 100 >= 100` is decided on integers as
/// `balance >= required`, so the 100% boundary is exact. A requirement of
/// zero (or less) means no bond is configured and always permits.
pub fn check_bond(balance_cents: i64, required_cents: i64) -> BondGate {
    if required_cents <= 0 {
        return BondGate::Permitted { percent: None };
    }
    let percent = balance_cents as f64 * 100.0 / required_cents as f64;
    if balance_cents >= required_cents {
        BondGate::Permitted {
            percent: Some(percent),
        }
    } else {
        BondGate::Blocked { percent }
    }
}

pub fn can_start_shift(balance_cents: i64, required_cents: i64) -> bool {
    check_bond(balance_cents, required_cents).is_permitted()
}
