//! Formatting helpers shared by the library and the CLI.

use std::time::Duration;

/// Formats a batch's total execution time, omitting leading zero units
/// (e.g., "1h 2m 5s", "2m 0s", "0.42s").
#[must_use]
pub fn format_total_time(elapsed: Duration) -> String {
    let total_seconds = elapsed.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{hours}h {minutes}m {secs}s")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{:.2}s", elapsed.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_total_time() {
        assert_eq!(format_total_time(Duration::from_secs(3725)), "1h 2m 5s");
        assert_eq!(format_total_time(Duration::from_secs(120)), "2m 0s");
        assert_eq!(format_total_time(Duration::from_millis(420)), "0.42s");
    }
}
