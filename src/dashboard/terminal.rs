//! Terminal View
//!
//! Plain-text implementations of the dashboard surface for the CLI.
//! Charts are drawn as horizontal bar lists scaled to a fixed width.
//!
//! The surface traits cannot fail, so the first write error is held and
//! later writes are skipped until it is taken with `take_error` (or
//! returned from [`TerminalView::print_summary`]).

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};

use super::charts::{ChartKind, ChartRenderer, ChartSpec};
use super::view::{ButtonState, DashboardView, PredictionDisplay};

const BAR_WIDTH: usize = 40;
const LABEL_WIDTH: usize = 32;

/// Line writer that keeps the first error
struct Lines<W: Write> {
    out: W,
    error: Option<io::Error>,
}

impl<W: Write> Lines<W> {
    fn new(out: W) -> Self {
        Self { out, error: None }
    }

    fn line(&mut self, args: fmt::Arguments<'_>) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = self.out.write_fmt(args).and_then(|_| self.out.write_all(b"\n")) {
            self.error = Some(e);
        }
    }

    fn take_error(&mut self) -> io::Result<()> {
        match self.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Writes view updates as lines of text
pub struct TerminalView<W: Write> {
    out: Lines<W>,
    /// Element text, kept so the summary can be printed in a stable order
    text: BTreeMap<String, String>,
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Lines::new(out),
            text: BTreeMap::new(),
        }
    }

    pub fn text(&self, element: &str) -> Option<&str> {
        self.text.get(element).map(String::as_str)
    }

    /// Print every element's current text. Fails with the first write
    /// error seen by this view, including earlier updates.
    pub fn print_summary(&mut self) -> io::Result<()> {
        self.out.line(format_args!("== Dashboard =="));
        for (element, text) in &self.text {
            self.out.line(format_args!("{:<18} {}", element, text));
        }
        self.take_error()
    }

    /// The first write error since the last call, if any
    pub fn take_error(&mut self) -> io::Result<()> {
        self.out.take_error()
    }

    pub fn into_inner(self) -> W {
        self.out.out
    }
}

impl<W: Write> DashboardView for TerminalView<W> {
    fn set_text(&mut self, element: &str, text: &str) {
        self.text.insert(element.to_string(), text.to_string());
    }

    fn set_datalist(&mut self, list: &str, options: &[String]) {
        tracing::debug!(list, options = options.len(), "Autocomplete list updated");
    }

    fn set_loading(&mut self, active: bool) {
        if active {
            self.out.line(format_args!("Loading dashboard data..."));
        }
    }

    fn show_error(&mut self, message: &str) {
        self.out.line(format_args!("error: {}", message));
    }

    fn hide_error(&mut self) {}

    fn set_predict_button(&mut self, state: ButtonState) {
        if state == ButtonState::Busy {
            self.out.line(format_args!("{}", state.label()));
        }
    }

    fn show_prediction(&mut self, display: &PredictionDisplay) {
        self.out.line(format_args!("Completion probability: {}", display.probability));
        self.out.line(format_args!("Predicted outcome:      {}", display.outcome));
        self.out.line(format_args!("Confidence:             {}", display.confidence));
        if !display.factors.is_empty() {
            self.out.line(format_args!("Influencing factors:"));
            for factor in &display.factors {
                self.out.line(format_args!("  - {}", factor));
            }
        }
    }
}

/// Draws charts as text bars
pub struct TerminalRenderer<W: Write> {
    out: Lines<W>,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Lines::new(out),
        }
    }

    /// The first write error since the last call, if any
    pub fn take_error(&mut self) -> io::Result<()> {
        self.out.take_error()
    }

    pub fn into_inner(self) -> W {
        self.out.out
    }
}

impl<W: Write> ChartRenderer for TerminalRenderer<W> {
    fn plot(&mut self, _container: &str, chart: &ChartSpec) {
        self.out.line(format_args!("\n{}", chart.kind.title()));

        let max = (0..chart.values.len())
            .filter_map(|i| chart.values.number_at(i))
            .fold(0.0_f64, f64::max);

        for i in 0..chart.labels.len().min(chart.values.len()) {
            let label = chart.labels.text_at(i).unwrap_or_default();
            let value = chart.values.number_at(i).unwrap_or(0.0);
            let bar = if max > 0.0 {
                ((value / max) * BAR_WIDTH as f64).round() as usize
            } else {
                0
            };

            self.out.line(format_args!(
                "  {:<width$} {:<bar_width$} {}",
                truncate(&label, LABEL_WIDTH),
                "#".repeat(bar),
                chart.values.text_at(i).unwrap_or_default(),
                width = LABEL_WIDTH,
                bar_width = BAR_WIDTH,
            ));
        }
    }

    fn placeholder(&mut self, container: &str, _markup: &str) {
        let title = ChartKind::ALL
            .iter()
            .find(|kind| kind.container_id() == container)
            .map(|kind| kind.title())
            .unwrap_or(container);

        self.out.line(format_args!(
            "{}: chart will appear here once the backend is running (civic311-api)",
            title
        ));
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
        cut.push('…');
        cut
    }
}
