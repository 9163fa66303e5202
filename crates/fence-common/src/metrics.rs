//! Prometheus-style text exposition helpers
//!
//! Each sample is one `name value` line preceded by `# HELP` and
//! `# TYPE` comments, so the output stays parseable by splitting sample
//! lines on whitespace. No exporter dependency; callers assemble the
//! full page from these helpers.

use std::fmt::Write;

/// Append a counter sample with its HELP/TYPE framing
pub fn render_counter(out: &mut String, name: &str, help: &str, value: u64) {
    let _ = writeln!(out, "# HELP {} {}", name, help);
    let _ = writeln!(out, "# TYPE {} counter", name);
    let _ = writeln!(out, "{} {}", name, value);
}

/// Append a gauge sample with its HELP/TYPE framing
pub fn render_gauge(out: &mut String, name: &str, help: &str, value: u64) {
    let _ = writeln!(out, "# HELP {} {}", name, help);
    let _ = writeln!(out, "# TYPE {} gauge", name);
    let _ = writeln!(out, "{} {}", name, value);
}
