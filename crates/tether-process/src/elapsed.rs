use std::sync::OnceLock;

use regex::Regex;

fn elapsed_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[0-9]+(?:-[0-9]+)?(?::[0-9]+)+").expect("valid elapsed regex"))
}

/// Parses the `etime` column of `ps` (`[[dd-]hh:]mm:ss`) into seconds.
///
/// The first time-shaped token in `raw` wins, so the `ELAPSED` header line
/// can be passed through as is. Three fields read as hours, minutes and
/// seconds; two as minutes and seconds. A day prefix (`dd-`) is only valid on
/// the hours field; missing days count as zero.
pub fn parse_elapsed(raw: &str) -> Option<u64> {
    let token = elapsed_re().find(raw)?.as_str();
    let parts: Vec<&str> = token.split(':').collect();

    let (days, hours, minutes, seconds) = match parts.as_slice() {
        [head, min, sec] => {
            let (days, hours) = match head.split_once('-') {
                Some((d, h)) => (d, h),
                None => ("0", *head),
            };
            (days, hours, *min, *sec)
        }
        [min, sec] if !min.contains('-') => ("0", "0", *min, *sec),
        _ => return None,
    };

    let days: u64 = days.parse().ok()?;
    let hours: u64 = hours.parse().ok()?;
    let minutes: u64 = minutes.parse().ok()?;
    let seconds: u64 = seconds.parse().ok()?;

    days.checked_mul(86_400)?
        .checked_add(hours.checked_mul(3_600)?)?
        .checked_add(minutes.checked_mul(60)?)?
        .checked_add(seconds)
}
