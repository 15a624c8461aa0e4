//! # Wall clock
//!
//! The only place the framework reads real time. Wall-clock values land
//! exclusively in fields the determinism fingerprint projects out.

use chrono::{SecondsFormat, Utc};

/// Current wall-clock time as an ISO-8601 / RFC 3339 UTC string.
pub fn wall_clock_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// The ISO stamp with `:` and `.` replaced by `-`, safe for directory names.
pub fn wall_clock_path_stamp() -> String {
    wall_clock_iso().replace([':', '.'], "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_stamp_has_no_separators() {
        let stamp = wall_clock_path_stamp();
        assert!(!stamp.contains(':'));
        assert!(!stamp.contains('.'));
        assert!(stamp.ends_with('Z'));
    }
}
