//! Human-readable error descriptions and structured JSON error formatting.

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    use balancer_core::error::{BalanceError, BuildError};

    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values passed to the controller builder.\nHow to fix: Edit the config file, then rerun. See etc/balancer.toml for a sample."
            ),
        };
    }

    if let Some(be) = err.downcast_ref::<BalanceError>() {
        return match be {
            BalanceError::Unavailable(what) => format!(
                "What happened: A reading had no valid value ({what}).\nLikely causes: Meter or storage offline, or communication lost.\nHow to fix: Check the device connection; re-run with --log-level=debug for per-reading detail."
            ),
            BalanceError::WriteRejected { axis, value, reason } => format!(
                "What happened: The storage device rejected a {axis} setpoint of {value} ({reason}).\nLikely causes: Setpoint beyond the device limit, or write limits set wider than the device accepts.\nHow to fix: Check sim.hard_limit_w and sim.write_min_w/write_max_w against the device rating."
            ),
            BalanceError::Empty => "What happened: A smoothing window was averaged before it held any sample.\nLikely causes: Internal sequencing error.\nHow to fix: Re-run with --log-level=debug and report the log.".to_string(),
        };
    }

    // String-based heuristics for errors coming from config loading
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("load profile csv must have headers") {
        return "Invalid headers in load profile CSV. Expected 'active,reactive'.".to_string();
    }

    if lower.starts_with("read config") {
        return format!(
            "What happened: The config file could not be read.\nLikely causes: Wrong --config path or missing permissions.\nHow to fix: Pass --config <FILE> pointing at a readable TOML file. Original: {msg}"
        );
    }

    if lower.starts_with("parse config") {
        return format!(
            "What happened: The config file is not valid TOML for this program.\nLikely causes: Syntax error, wrong value type, or misspelled section.\nHow to fix: Compare against etc/balancer.toml. Original: {msg}"
        );
    }

    if lower.contains("must be") || lower.contains("unreasonably large") {
        return format!(
            "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes per error kind; anything untyped returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    use balancer_core::error::{BalanceError, BuildError};
    if let Some(be) = err.downcast_ref::<BalanceError>() {
        return match be {
            BalanceError::Unavailable(_) => 3,
            BalanceError::WriteRejected { .. } => 4,
            BalanceError::Empty => 5,
        };
    }
    if err.downcast_ref::<BuildError>().is_some() {
        return 6;
    }
    1
}

fn reason_name(err: &eyre::Report) -> &'static str {
    use balancer_core::error::{BalanceError, BuildError};
    match err.downcast_ref::<BalanceError>() {
        Some(BalanceError::Unavailable(_)) => "Unavailable",
        Some(BalanceError::WriteRejected { .. }) => "WriteRejected",
        Some(BalanceError::Empty) => "Empty",
        None if err.downcast_ref::<BuildError>().is_some() => "InvalidConfig",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use balancer_core::error::BalanceError;
    use serde_json::json;

    let msg = humanize(err);
    if let Some(BalanceError::WriteRejected { axis, value, .. }) =
        err.downcast_ref::<BalanceError>()
    {
        return json!({
            "reason": reason_name(err),
            "details": { "axis": axis.name(), "value": value },
            "message": msg,
        })
        .to_string();
    }

    json!({ "reason": reason_name(err), "message": msg }).to_string()
}
