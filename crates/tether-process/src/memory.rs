use std::sync::OnceLock;

use regex::Regex;

use crate::tokenize::tokenize;

/// Host memory as reported by `free -m`, in MiB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemorySnapshot {
    pub total: u64,
    pub used: u64,
    pub free: u64,
}

impl MemorySnapshot {
    /// Reads the `Mem:` row (second line) of `free -m` output.
    ///
    /// Returns `None` when that row is missing. Unparseable numbers read as 0.
    pub fn parse_free(raw: &str) -> Option<Self> {
        let row = raw.lines().nth(1)?;
        let fields = tokenize(row.trim_end_matches('\r'), None);
        let total = fields.get(1)?;

        let num = |v: Option<&String>| v.and_then(|s| s.trim().parse::<u64>().ok()).unwrap_or(0);
        Some(Self {
            total: num(Some(total)),
            used: num(fields.get(2)),
            free: num(fields.get(3)),
        })
    }

    /// `total - free`, the figure reported as usage.
    pub fn usage(&self) -> u64 {
        self.total.saturating_sub(self.free)
    }

    /// `part` as a percentage of `total`, rounded to 2 decimals.
    pub fn percent_of_total(&self, part: u64) -> f64 {
        if self.total == 0 || part == 0 {
            return 0.0;
        }
        round2(part as f64 * 100.0 / self.total as f64)
    }
}

fn xmx_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)xmx([0-9]+)([gm])").expect("valid xmx regex"))
}

/// Heap ceiling in MiB from a `-Xmx<n>[g|m]` token in a command line.
pub fn parse_xmx_mb(command: &str) -> Option<u64> {
    let caps = xmx_re().captures(command)?;
    let value: u64 = caps.get(1)?.as_str().parse().ok()?;
    let unit = caps.get(2)?.as_str();
    if unit.eq_ignore_ascii_case("g") {
        Some(value.saturating_mul(1024))
    } else {
        Some(value)
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FREE_OUTPUT: &str = "\
               total        used        free      shared  buff/cache   available
Mem:            7975        2871        3210         187        1893        4633
Swap:           2047           0        2047
";

    #[test]
    fn parses_mem_row() {
        let snap = MemorySnapshot::parse_free(FREE_OUTPUT).expect("snapshot");
        assert_eq!(
            snap,
            MemorySnapshot {
                total: 7975,
                used: 2871,
                free: 3210
            }
        );
        assert_eq!(snap.usage(), 4765);
    }

    #[test]
    fn percentages_round_to_two_decimals() {
        let snap = MemorySnapshot::parse_free(FREE_OUTPUT).expect("snapshot");
        assert_eq!(snap.percent_of_total(snap.usage()), 59.75);
        assert_eq!(snap.percent_of_total(snap.free), 40.25);
    }

    #[test]
    fn zero_total_does_not_divide() {
        let snap = MemorySnapshot::default();
        assert_eq!(snap.percent_of_total(10), 0.0);
    }

    #[test]
    fn missing_row_is_none() {
        assert_eq!(MemorySnapshot::parse_free("total used free\n"), None);
        assert_eq!(MemorySnapshot::parse_free("header\nMem:\n"), None);
    }

    #[test]
    fn xmx_units() {
        assert_eq!(parse_xmx_mb("java -Xmx2G -jar server.jar"), Some(2048));
        assert_eq!(parse_xmx_mb("java -Xms512M -Xmx1536m -jar server.jar"), Some(1536));
        assert_eq!(parse_xmx_mb("java -jar server.jar"), None);
    }
}
