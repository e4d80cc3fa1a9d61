use crate::tokenize::tokenize;

/// Column positions in `ps aux` style output.
///
/// `command` is also the split bound: everything from that column on is one
/// field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub pid: usize,
    pub cpu: usize,
    pub memory: usize,
    pub command: usize,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            pid: 1,
            cpu: 2,
            memory: 3,
            command: 10,
        }
    }
}

/// One line of process-listing output, split into positional fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessRecord {
    fields: Vec<String>,
    layout: ColumnLayout,
}

impl ProcessRecord {
    pub fn parse(line: &str, layout: ColumnLayout) -> Self {
        let line = line.trim_end_matches('\r');
        Self {
            fields: tokenize(line, Some(layout.command)),
            layout,
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }

    pub fn pid_field(&self) -> Option<&str> {
        self.field(self.layout.pid)
    }

    /// Numeric pid; a missing or garbled field reads as 0.
    pub fn pid(&self) -> u32 {
        self.pid_field().map(parse_u32_lenient).unwrap_or(0)
    }

    pub fn cpu(&self) -> f64 {
        self.field(self.layout.cpu).map(parse_f64_lenient).unwrap_or(0.0)
    }

    pub fn memory(&self) -> f64 {
        self.field(self.layout.memory)
            .map(parse_f64_lenient)
            .unwrap_or(0.0)
    }

    pub fn command(&self) -> Option<&str> {
        self.field(self.layout.command)
    }
}

/// Result of scanning process-listing output.
///
/// `malformed` holds lines that did not look like a process line at all. That
/// is a data-quality signal, separate from "no such process".
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Lookup {
    pub record: Option<ProcessRecord>,
    pub malformed: Vec<String>,
}

impl Lookup {
    pub fn is_malformed(&self) -> bool {
        !self.malformed.is_empty()
    }
}

/// Looks at the first line of `raw` and returns it when its command column
/// contains `name`.
pub fn find_by_name(name: &str, raw: &str, layout: ColumnLayout) -> Lookup {
    let line = raw.lines().next().unwrap_or_default();
    let record = ProcessRecord::parse(line, layout);

    let Some(command) = record.command() else {
        return Lookup {
            record: None,
            malformed: vec![line.to_string()],
        };
    };

    if !command.contains(name) {
        return Lookup::default();
    }

    Lookup {
        record: Some(record),
        malformed: Vec::new(),
    }
}

/// Returns the first line of `raw` whose pid column equals `pid`.
///
/// Lines without a pid column are skipped and reported; blank lines are
/// skipped silently.
pub fn find_by_pid(pid: u32, raw: &str, layout: ColumnLayout) -> Lookup {
    let mut lookup = Lookup::default();

    for line in raw.lines() {
        if line.trim().is_empty() {
            continue;
        }

        let record = ProcessRecord::parse(line, layout);
        match record.pid_field() {
            Some(field) if !field.trim().is_empty() => {}
            _ => {
                lookup.malformed.push(line.to_string());
                continue;
            }
        }

        if record.pid() == pid {
            lookup.record = Some(record);
            return lookup;
        }
    }

    lookup
}

/// True for the `grep` pipeline (and its parent shell) that a process search
/// leaves behind in its own output.
pub fn is_search_artifact(command: &str) -> bool {
    command
        .split_whitespace()
        .any(|token| token == "grep" || token.ends_with("/grep"))
}

fn parse_u32_lenient(raw: &str) -> u32 {
    raw.trim().parse::<u32>().unwrap_or(0)
}

fn parse_f64_lenient(raw: &str) -> f64 {
    let raw = raw.trim();
    // Some locales print a decimal comma.
    raw.parse::<f64>()
        .or_else(|_| raw.replace(',', ".").parse::<f64>())
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}
