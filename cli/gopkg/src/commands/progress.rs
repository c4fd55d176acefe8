//! Download progress on stderr.

use std::io::{IsTerminal, Write};

use gopkg_registry::ProgressReporter;

/// Rewrites one status line while stderr is a terminal; otherwise prints
/// only completed downloads.
pub struct StderrProgress {
    interactive: bool,
}

impl Default for StderrProgress {
    fn default() -> Self {
        StderrProgress {
            interactive: std::io::stderr().is_terminal(),
        }
    }
}

impl ProgressReporter for StderrProgress {
    fn advanced(&self, module: &str, version: &str, received: u64, total: Option<u64>) {
        if !self.interactive {
            return;
        }
        let line = match total {
            Some(t) if t > 0 => format!("{} / {}", human_size(received), human_size(t)),
            _ => human_size(received),
        };
        let mut err = std::io::stderr().lock();
        let _ = write!(err, "\r\x1b[2K  downloading {module}@{version}  {line}");
        let _ = err.flush();
    }

    fn finished(&self, module: &str, version: &str) {
        let mut err = std::io::stderr().lock();
        if self.interactive {
            let _ = write!(err, "\r\x1b[2K");
        }
        let _ = writeln!(err, "  downloaded {module}@{version}");
    }
}

pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
