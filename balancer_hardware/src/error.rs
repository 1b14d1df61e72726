use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("{0} has no valid value")]
    Unavailable(&'static str),
    #[error("setpoint {value} outside accepted range [{min}, {max}]")]
    OutOfRange { value: i64, min: i64, max: i64 },
    #[error("device lock poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, HwError>;
