use crate::types::time::{Nanos, TimeBound};

/// Renders `target` relative to `now`, e.g. `in 1.500s` or `2.000s ago`.
pub fn relative_to(target: TimeBound, now: Nanos) -> String {
    match target {
        TimeBound::Never => "never".to_string(),
        TimeBound::Forever => "forever".to_string(),
        TimeBound::At(at) => {
            let delta = i128::from(at) - i128::from(now);
            let secs = delta.unsigned_abs() as f64 / 1e9;
            if delta >= 0 {
                format!("in {secs:.3}s")
            } else {
                format!("{secs:.3}s ago")
            }
        },
    }
}
