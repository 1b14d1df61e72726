//! Maps `Box<dyn Error>` from trait boundaries to typed `BalanceError`.
//!
//! The traits in `balancer_traits` use `Box<dyn Error + Send + Sync>`; this
//! module converts those to our typed error enum, with an optional
//! feature-gated path for `balancer_hardware::HwError` downcasting.

use crate::error::BalanceError;
use balancer_traits::Axis;

/// Map a failed read of `what` (a measurement or bound) to a typed error.
pub fn map_read_error(what: &str, e: &(dyn std::error::Error + 'static)) -> BalanceError {
    if let Some(be) = e.downcast_ref::<BalanceError>() {
        return be.clone();
    }
    BalanceError::Unavailable(format!("{what}: {e}"))
}

/// Map a failed setpoint write to a typed error.
///
/// Attempts to downcast known hardware error types first; anything else is
/// treated as a rejection of the write.
pub fn map_write_error(axis: Axis, value: i64, e: &(dyn std::error::Error + 'static)) -> BalanceError {
    if let Some(be) = e.downcast_ref::<BalanceError>() {
        return be.clone();
    }

    // Feature-gated: a poisoned or offline device is unavailable, not rejecting
    #[cfg(feature = "hardware-errors")]
    {
        use balancer_hardware::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Unavailable(_) | HwError::Poisoned => {
                    BalanceError::Unavailable(format!("{axis} setpoint: {hw}"))
                }
                HwError::OutOfRange { .. } => BalanceError::WriteRejected {
                    axis,
                    value,
                    reason: hw.to_string(),
                },
            };
        }
    }

    BalanceError::WriteRejected {
        axis,
        value,
        reason: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_errors_become_unavailable_with_context() {
        let e = std::io::Error::other("no frame");
        match map_read_error("meter active power", &e) {
            BalanceError::Unavailable(msg) => {
                assert!(msg.contains("meter active power"));
                assert!(msg.contains("no frame"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn typed_errors_pass_through() {
        let e = BalanceError::Empty;
        assert_eq!(map_read_error("x", &e), BalanceError::Empty);
        assert_eq!(map_write_error(Axis::Active, 1, &e), BalanceError::Empty);
    }

    #[test]
    fn unknown_write_errors_are_rejections() {
        let e = std::io::Error::other("busy");
        assert_eq!(
            map_write_error(Axis::Reactive, 42, &e),
            BalanceError::WriteRejected {
                axis: Axis::Reactive,
                value: 42,
                reason: "busy".into()
            }
        );
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn hardware_out_of_range_is_rejection_and_offline_is_unavailable() {
        use balancer_hardware::HwError;
        let e = HwError::OutOfRange {
            value: 9,
            min: -5,
            max: 5,
        };
        assert!(matches!(
            map_write_error(Axis::Active, 9, &e),
            BalanceError::WriteRejected { value: 9, .. }
        ));
        let e = HwError::Unavailable("storage");
        assert!(matches!(
            map_write_error(Axis::Active, 0, &e),
            BalanceError::Unavailable(_)
        ));
    }
}
