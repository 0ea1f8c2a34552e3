//! Order status transition rules.

use std::str::FromStr;

use super::errors::DomainError;
use super::order::OrderStatus;

/// Which status changes are accepted.
///
/// `Strict` accepts exactly the forward lifecycle
/// `PENDING -> CONFIRMED -> SHIPPED -> DELIVERED` one step at a time, plus
/// cancellation from any non-terminal status.
///
/// `Lenient` keeps the legacy guard: it only refuses transitions out of a
/// terminal status and the `SHIPPED -> CONFIRMED` regression. Everything else,
/// including skipping states, is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    #[default]
    Strict,
    Lenient,
}

impl TransitionPolicy {
    pub fn allows(self, from: OrderStatus, to: OrderStatus) -> bool {
        use OrderStatus::*;

        if from.is_terminal() {
            return false;
        }
        match self {
            TransitionPolicy::Strict => matches!(
                (from, to),
                (Pending, Confirmed)
                    | (Confirmed, Shipped)
                    | (Shipped, Delivered)
                    | (Pending | Confirmed | Shipped, Cancelled)
            ),
            TransitionPolicy::Lenient => !matches!((from, to), (Shipped, Confirmed)),
        }
    }

    pub fn check(self, from: OrderStatus, to: OrderStatus) -> Result<(), DomainError> {
        if self.allows(from, to) {
            Ok(())
        } else {
            Err(DomainError::InvalidTransition { from, to })
        }
    }
}

impl FromStr for TransitionPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(TransitionPolicy::Strict),
            "lenient" => Ok(TransitionPolicy::Lenient),
            other => Err(DomainError::InvalidInput(format!(
                "unknown transition policy '{}'",
                other
            ))),
        }
    }
}
