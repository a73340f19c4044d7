//! Operator-facing status report.
//!
//! [`render`] is a pure function from a message kind and text to a styled
//! line. The kind-to-style table is the exhaustive `match` in
//! [`MessageKind::style`]; styling is forced on so the same input always
//! yields the same bytes. [`Report`] collects rendered lines, echoes each one
//! to its sink as it is produced, and hands back the whole transcript.

use console::Style;
use std::io::Write;

// ============================================================================
// Rendering
// ============================================================================

/// The fixed set of status line kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Info,
    Success,
    Warning,
    Error,
    Heading,
}

impl MessageKind {
    /// Leading symbol of a rendered line.
    pub fn symbol(self) -> &'static str {
        match self {
            MessageKind::Info => "ℹ",
            MessageKind::Success => "✓",
            MessageKind::Warning => "⚠",
            MessageKind::Error => "✗",
            MessageKind::Heading => "==>",
        }
    }

    fn style(self) -> Style {
        let style = match self {
            MessageKind::Info => Style::new().cyan(),
            MessageKind::Success => Style::new().green(),
            MessageKind::Warning => Style::new().yellow(),
            MessageKind::Error => Style::new().red().bold(),
            MessageKind::Heading => Style::new().blue().bold(),
        };
        style.force_styling(true)
    }
}

/// Render one status line.
pub fn render(kind: MessageKind, text: &str) -> String {
    let style = kind.style();
    match kind {
        // Headings and errors carry the style over the whole line.
        MessageKind::Heading | MessageKind::Error => {
            format!("{} {}", style.apply_to(kind.symbol()), style.apply_to(text))
        }
        _ => format!("{} {}", style.apply_to(kind.symbol()), text),
    }
}

/// Render an indented remediation hint shown under an error or warning.
pub fn render_hint(text: &str) -> String {
    format!("  {} {}", Style::new().dim().force_styling(true).apply_to("→"), text)
}

/// Render a numbered list, one line per step, starting at 1.
pub fn render_steps<S: AsRef<str>>(steps: &[S]) -> Vec<String> {
    steps
        .iter()
        .enumerate()
        .map(|(i, step)| {
            format!(
                "  {} {}",
                Style::new()
                    .bold()
                    .force_styling(true)
                    .apply_to(format!("{}.", i + 1)),
                step.as_ref()
            )
        })
        .collect()
}

// ============================================================================
// Report
// ============================================================================

/// Accumulates rendered lines and echoes them to a sink.
pub struct Report {
    lines: Vec<String>,
    sink: Box<dyn Write + Send>,
}

impl Report {
    /// Report that echoes to `sink`.
    pub fn new(sink: Box<dyn Write + Send>) -> Self {
        Self {
            lines: Vec::new(),
            sink,
        }
    }

    /// Report that echoes to standard output.
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    /// Report that only keeps the transcript.
    pub fn silent() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Render and record a status line.
    pub fn emit(&mut self, kind: MessageKind, text: impl AsRef<str>) {
        let line = render(kind, text.as_ref());
        self.push(line);
    }

    /// Record a remediation hint.
    pub fn hint(&mut self, text: impl AsRef<str>) {
        let line = render_hint(text.as_ref());
        self.push(line);
    }

    /// Record captured tool output, indented under the preceding line.
    pub fn detail(&mut self, text: impl AsRef<str>) {
        for line in text.as_ref().lines().filter(|l| !l.trim().is_empty()) {
            self.push(format!("    {}", line.trim_end()));
        }
    }

    /// Record a numbered list of steps.
    pub fn steps<S: AsRef<str>>(&mut self, steps: &[S]) {
        for line in render_steps(steps) {
            self.push(line);
        }
    }

    /// Record an empty separator line.
    pub fn blank(&mut self) {
        self.push(String::new());
    }

    /// Lines recorded so far.
    #[cfg(test)]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// The whole report, newline separated.
    pub fn into_transcript(mut self) -> String {
        let _ = self.sink.flush();
        self.lines.join("\n")
    }

    fn push(&mut self, line: String) {
        // A closed stdout must not abort the run; the transcript keeps the line.
        if let Err(e) = writeln!(self.sink, "{}", line) {
            tracing::debug!("report sink write failed: {}", e);
        }
        self.lines.push(line);
    }
}

impl std::fmt::Debug for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Report")
            .field("lines", &self.lines.len())
            .finish()
    }
}
