use std::fmt::Write;
use std::time::Duration;

/// Renders a duration as `H:MM:SS[.ffffff]`, the form trial logs carry in
/// their `elapsed_time` column. Sub-microsecond precision is dropped and the
/// fraction is omitted when it is zero. Durations of a day or more get a
/// `"N day(s), "` prefix.
pub fn format_elapsed(d: Duration) -> String {
    let micros = d.as_micros();
    let total_secs = micros / 1_000_000;
    let frac = micros % 1_000_000;
    let days = total_secs / 86_400;
    let rem = total_secs % 86_400;
    let (h, m, s) = (rem / 3600, rem % 3600 / 60, rem % 60);

    let mut out = String::with_capacity(16);
    if days > 0 {
        let plural = if days == 1 { "" } else { "s" };
        let _ = write!(out, "{days} day{plural}, ");
    }
    let _ = write!(out, "{h}:{m:02}:{s:02}");
    if frac != 0 {
        let _ = write!(out, ".{frac:06}");
    }
    out
}
