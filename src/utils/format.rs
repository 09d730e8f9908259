//! Duration formatting helpers shared by the engine and the countdown

/// Split a number of seconds into whole minutes and leftover seconds.
///
/// Negative input is treated as zero.
pub fn seconds_to_time_parts(total_seconds: i64) -> (u64, u64) {
    let clamped = total_seconds.max(0) as u64;
    (clamped / 60, clamped % 60)
}

/// Format seconds as `MM:SS`.
///
/// Minutes are not wrapped at 60, so a three hour phase renders as `180:00`.
pub fn format_duration(total_seconds: i64) -> String {
    let (minutes, seconds) = seconds_to_time_parts(total_seconds);
    format!("{:02}:{:02}", minutes, seconds)
}

/// Whole seconds left in `remaining_ms`, rounded up so `00:00` only shows at the end.
pub fn ceil_seconds(remaining_ms: u64) -> u64 {
    remaining_ms.div_ceil(1000)
}
