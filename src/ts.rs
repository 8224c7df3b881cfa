use crate::error::CliError;
use chrono::{DateTime, Utc};

pub fn parse_rfc3339(ts: &str, label: &str) -> Result<DateTime<Utc>, CliError> {
    let t = ts.trim();
    if t.is_empty() {
        return Err(CliError::usage(format!("Invalid {}: (empty)", label)));
    }
    DateTime::parse_from_rfc3339(t)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| CliError::usage(format!("Invalid {}: {}", label, ts)))
}

/// `--now` beats `HARD75_NOW`, which beats the system clock.
pub fn resolve_now(cli_now: Option<&str>) -> Result<DateTime<Utc>, CliError> {
    if let Some(t) = cli_now {
        return parse_rfc3339(t, "now");
    }

    if let Ok(t) = std::env::var("HARD75_NOW") {
        let tt = t.trim();
        if !tt.is_empty() {
            return parse_rfc3339(tt, "now");
        }
    }

    Ok(Utc::now())
}
