use balancer_traits::Axis;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BalanceError {
    /// A measurement or bound has no valid current value.
    #[error("unavailable: {0}")]
    Unavailable(String),
    /// A setpoint dispatch was refused by the storage device.
    #[error("{axis} setpoint {value} rejected: {reason}")]
    WriteRejected {
        axis: Axis,
        value: i64,
        reason: String,
    },
    /// Average requested on a window that holds no samples.
    #[error("sample window is empty")]
    Empty,
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
