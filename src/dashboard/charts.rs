//! Chart Mapping
//!
//! Maps the named payload groups onto chart-library calls. The mapping is
//! pure pass-through: labels and values reach the renderer exactly as they
//! arrived in the payload.

use plotly::common::{Font, Line, Marker, Mode, Orientation, Title};
use plotly::layout::{Axis as PlotAxis, Margin as PlotMargin};
use plotly::{Bar, Configuration, Layout, Pie, Plot, Scatter};
use serde::Serialize;
use serde_json::{Number, Value};
use std::collections::BTreeMap;

use super::payload::DashboardData;

/// Dashboard color palette
pub mod palette {
    pub const PRIMARY: &str = "#6366f1";
    pub const SECONDARY: &str = "#8b5cf6";
    pub const SUCCESS: &str = "#10b981";
    pub const WARNING: &str = "#f59e0b";
    pub const ERROR: &str = "#ef4444";
    pub const TEXT: &str = "#ffffff";
    pub const BACKGROUND: &str = "#0f0f23";
    pub const GRID: &str = "#374151";
}

/// Markup substituted into every chart container when the backend is down
pub const PLACEHOLDER_MARKUP: &str = r#"<div class="chart-placeholder" style="display: flex; flex-direction: column; align-items: center; justify-content: center; height: 200px; color: #9ca3af; text-align: center; padding: 20px;">
  <div style="font-size: 48px; margin-bottom: 16px;">📊</div>
  <div style="font-size: 16px; font-weight: 600; margin-bottom: 8px;">Chart will appear here</div>
  <div style="font-size: 14px; opacity: 0.8;">Start the civic311 backend to load 311 service request data</div>
  <div style="font-size: 12px; opacity: 0.6; margin-top: 8px;">Run: civic311-api</div>
</div>"#;

/// The seven dashboard charts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChartKind {
    TimeSeries,
    Ward,
    Status,
    ServiceTypes,
    Division,
    HourlyPattern,
    FeatureImportance,
}

impl ChartKind {
    /// All charts in page order
    pub const ALL: [ChartKind; 7] = [
        ChartKind::TimeSeries,
        ChartKind::Ward,
        ChartKind::Status,
        ChartKind::ServiceTypes,
        ChartKind::Division,
        ChartKind::HourlyPattern,
        ChartKind::FeatureImportance,
    ];

    /// Id of the container element the chart is drawn into
    pub fn container_id(&self) -> &'static str {
        match self {
            ChartKind::TimeSeries => "timeSeriesChart",
            ChartKind::Ward => "wardChart",
            ChartKind::Status => "statusChart",
            ChartKind::ServiceTypes => "serviceTypesChart",
            ChartKind::Division => "divisionChart",
            ChartKind::HourlyPattern => "hourlyPatternChart",
            ChartKind::FeatureImportance => "featureImportanceChart",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ChartKind::TimeSeries => "Daily Requests",
            ChartKind::Ward => "Requests by Ward",
            ChartKind::Status => "Request Status",
            ChartKind::ServiceTypes => "Top Service Types",
            ChartKind::Division => "Requests by Division",
            ChartKind::HourlyPattern => "Hourly Pattern",
            ChartKind::FeatureImportance => "Feature Importance",
        }
    }
}

/// One ordered sequence of a chart group
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Series {
    Text(Vec<String>),
    /// JSON numbers exactly as they arrived, integer or not
    Number(Vec<Number>),
    Float(Vec<f64>),
}

impl Series {
    pub fn len(&self) -> usize {
        match self {
            Series::Text(v) => v.len(),
            Series::Number(v) => v.len(),
            Series::Float(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element as display text
    pub fn text_at(&self, index: usize) -> Option<String> {
        match self {
            Series::Text(v) => v.get(index).cloned(),
            Series::Number(v) => v.get(index).map(|n| n.to_string()),
            Series::Float(v) => v.get(index).map(|n| n.to_string()),
        }
    }

    /// Element as a number; text elements have none
    pub fn number_at(&self, index: usize) -> Option<f64> {
        match self {
            Series::Text(_) => None,
            Series::Number(v) => v.get(index).and_then(Number::as_f64),
            Series::Float(v) => v.get(index).copied(),
        }
    }

    /// Elements as JSON values, for handing to a trace unchanged
    fn to_values(&self) -> Vec<Value> {
        match self {
            Series::Text(v) => v.iter().cloned().map(Value::String).collect(),
            Series::Number(v) => v.iter().cloned().map(Value::Number).collect(),
            Series::Float(v) => v.iter().map(|&n| Value::from(n)).collect(),
        }
    }

    fn to_text(&self) -> Vec<String> {
        (0..self.len()).filter_map(|i| self.text_at(i)).collect()
    }
}

/// How a chart draws its trace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceStyle {
    /// Lines with markers, labels on x
    Line,
    /// Vertical bars, labels on x
    Bar,
    /// Horizontal bars, labels on y
    HorizontalBar,
    Pie,
}

/// An axis title and whether it draws grid lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Axis {
    pub title: &'static str,
    pub grid: bool,
}

impl Axis {
    const fn grid(title: &'static str) -> Self {
        Self { title, grid: true }
    }

    const fn plain(title: &'static str) -> Self {
        Self { title, grid: false }
    }

    fn to_plotly(self) -> PlotAxis {
        let axis = PlotAxis::new()
            .title(Title::with_text(self.title))
            .color(palette::TEXT);
        if self.grid {
            axis.grid_color(palette::GRID)
        } else {
            axis
        }
    }
}

/// Plot margins in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Margin {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl Margin {
    const fn new(top: u32, right: u32, bottom: u32, left: u32) -> Self {
        Self { top, right, bottom, left }
    }

    fn to_plotly(self) -> PlotMargin {
        PlotMargin::new()
            .top(self.top as usize)
            .right(self.right as usize)
            .bottom(self.bottom as usize)
            .left(self.left as usize)
    }
}

/// Everything a renderer needs to draw one chart
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub style: TraceStyle,
    pub name: Option<&'static str>,
    pub labels: Series,
    pub values: Series,
    pub colors: Vec<&'static str>,
    pub x_axis: Option<Axis>,
    pub y_axis: Option<Axis>,
    pub margin: Margin,
}

impl ChartSpec {
    /// Build the chart for `kind`, or `None` if its group is absent
    pub fn from_payload(kind: ChartKind, data: &DashboardData) -> Option<Self> {
        let spec = match kind {
            ChartKind::TimeSeries => {
                let group = data.time_series.as_ref()?;
                Self {
                    kind,
                    style: TraceStyle::Line,
                    name: Some("Daily Requests"),
                    labels: Series::Text(group.dates.clone()),
                    values: Series::Number(group.counts.clone()),
                    colors: vec![palette::PRIMARY],
                    x_axis: Some(Axis::grid("Date")),
                    y_axis: Some(Axis::grid("Number of Requests")),
                    margin: Margin::new(20, 20, 60, 60),
                }
            }
            ChartKind::Ward => {
                let group = data.ward_distribution.as_ref()?;
                Self {
                    kind,
                    style: TraceStyle::HorizontalBar,
                    name: Some("Ward Requests"),
                    labels: Series::Text(group.wards.clone()),
                    values: Series::Number(group.counts.clone()),
                    colors: vec![palette::SECONDARY],
                    x_axis: Some(Axis::grid("Number of Requests")),
                    y_axis: Some(Axis::plain("Ward")),
                    margin: Margin::new(20, 20, 60, 200),
                }
            }
            ChartKind::Status => {
                let group = data.status_distribution.as_ref()?;
                Self {
                    kind,
                    style: TraceStyle::Pie,
                    name: None,
                    labels: Series::Text(group.statuses.clone()),
                    values: Series::Number(group.counts.clone()),
                    colors: vec![palette::SUCCESS, palette::ERROR, palette::WARNING],
                    x_axis: None,
                    y_axis: None,
                    margin: Margin::new(20, 20, 20, 20),
                }
            }
            ChartKind::ServiceTypes => {
                let group = data.service_types.as_ref()?;
                Self {
                    kind,
                    style: TraceStyle::HorizontalBar,
                    name: Some("Service Types"),
                    labels: Series::Text(group.types.clone()),
                    values: Series::Number(group.counts.clone()),
                    colors: vec![palette::PRIMARY],
                    x_axis: Some(Axis::grid("Number of Requests")),
                    y_axis: Some(Axis::plain("Service Type")),
                    margin: Margin::new(20, 20, 60, 180),
                }
            }
            ChartKind::Division => {
                let group = data.division_distribution.as_ref()?;
                Self {
                    kind,
                    style: TraceStyle::Bar,
                    name: Some("Division Requests"),
                    labels: Series::Text(group.divisions.clone()),
                    values: Series::Number(group.counts.clone()),
                    colors: vec![palette::SECONDARY],
                    x_axis: Some(Axis::plain("Division")),
                    y_axis: Some(Axis::grid("Number of Requests")),
                    margin: Margin::new(20, 20, 100, 60),
                }
            }
            ChartKind::HourlyPattern => {
                let group = data.hourly_pattern.as_ref()?;
                Self {
                    kind,
                    style: TraceStyle::Line,
                    name: Some("Hourly Pattern"),
                    labels: Series::Number(group.hours.clone()),
                    values: Series::Number(group.counts.clone()),
                    colors: vec![palette::PRIMARY],
                    x_axis: Some(Axis::grid("Hour of Day")),
                    y_axis: Some(Axis::grid("Number of Requests")),
                    margin: Margin::new(20, 20, 60, 60),
                }
            }
            ChartKind::FeatureImportance => {
                let group = data.feature_importance.as_ref()?;
                Self {
                    kind,
                    style: TraceStyle::HorizontalBar,
                    name: Some("Feature Importance"),
                    labels: Series::Text(group.features.clone()),
                    values: Series::Float(group.importance.clone()),
                    colors: vec![palette::SUCCESS],
                    x_axis: Some(Axis::grid("Importance Score")),
                    y_axis: Some(Axis::plain("Features")),
                    margin: Margin::new(20, 20, 60, 180),
                }
            }
        };

        Some(spec)
    }

    /// The chart as a Plotly plot: one trace, the dark layout, responsive
    pub fn plot(&self) -> Plot {
        let color = self.colors.first().copied().unwrap_or(palette::PRIMARY);
        let mut plot = Plot::new();

        match self.style {
            TraceStyle::Line => {
                let mut trace = Scatter::new(self.labels.to_values(), self.values.to_values())
                    .mode(Mode::LinesMarkers)
                    .line(Line::new().color(color).width(3.0))
                    .marker(Marker::new().color(color).size(6));
                if let Some(name) = self.name {
                    trace = trace.name(name);
                }
                plot.add_trace(trace);
            }
            TraceStyle::Bar => {
                let mut trace = Bar::new(self.labels.to_values(), self.values.to_values())
                    .marker(Marker::new().color(color));
                if let Some(name) = self.name {
                    trace = trace.name(name);
                }
                plot.add_trace(trace);
            }
            TraceStyle::HorizontalBar => {
                let mut trace = Bar::new(self.values.to_values(), self.labels.to_values())
                    .orientation(Orientation::Horizontal)
                    .marker(Marker::new().color(color));
                if let Some(name) = self.name {
                    trace = trace.name(name);
                }
                plot.add_trace(trace);
            }
            TraceStyle::Pie => {
                let mut trace = Pie::new(self.values.to_values()).labels(self.labels.to_text());
                if let Some(name) = self.name {
                    trace = trace.name(name);
                }
                plot.add_trace(trace);
            }
        }

        let mut layout = Layout::new()
            .paper_background_color(palette::BACKGROUND)
            .plot_background_color(palette::BACKGROUND)
            .font(Font::new().color(palette::TEXT))
            .margin(self.margin.to_plotly());
        if let Some(axis) = self.x_axis {
            layout = layout.x_axis(axis.to_plotly());
        }
        if let Some(axis) = self.y_axis {
            layout = layout.y_axis(axis.to_plotly());
        }
        if self.style == TraceStyle::Pie {
            layout = layout.colorway(self.colors.clone());
        }

        plot.set_layout(layout);
        plot.set_configuration(Configuration::new().responsive(true));
        plot
    }

    /// The `newPlot` arguments for this chart
    pub fn to_plotly(&self) -> PlotlyFigure {
        PlotlyFigure::from_plot(&self.plot())
    }
}

/// Arguments of a Plotly `newPlot(container, data, layout, config)` call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotlyFigure {
    pub data: Vec<Value>,
    pub layout: Value,
    pub config: Value,
}

impl PlotlyFigure {
    /// Split a serialized plot into its `newPlot` arguments
    pub fn from_plot(plot: &Plot) -> Self {
        let mut plot = serde_json::to_value(plot).unwrap_or(Value::Null);

        let data = match plot["data"].take() {
            Value::Array(traces) => traces,
            _ => Vec::new(),
        };

        Self {
            data,
            layout: plot["layout"].take(),
            config: plot["config"].take(),
        }
    }
}

/// Chart library surface
pub trait ChartRenderer {
    /// Whether the page has a container with this id
    fn has_container(&self, _container: &str) -> bool {
        true
    }

    /// Draw a chart into a container, replacing its content
    fn plot(&mut self, container: &str, chart: &ChartSpec);

    /// Replace a container's content with static markup
    fn placeholder(&mut self, container: &str, markup: &str);
}

/// Render every chart whose group is present. Returns the number drawn.
pub fn render_all<R: ChartRenderer + ?Sized>(data: &DashboardData, renderer: &mut R) -> usize {
    let mut rendered = 0;

    for kind in ChartKind::ALL {
        let container = kind.container_id();
        if !renderer.has_container(container) {
            tracing::error!(container, "Chart container not found");
            continue;
        }

        match ChartSpec::from_payload(kind, data) {
            Some(spec) => {
                tracing::debug!(container, points = spec.labels.len(), "Rendering chart");
                renderer.plot(container, &spec);
                rendered += 1;
            }
            None => tracing::warn!(container, "Chart group missing from payload, skipping"),
        }
    }

    tracing::info!("Rendered {} of {} charts", rendered, ChartKind::ALL.len());
    rendered
}

/// Put the "start the backend" placeholder into every chart container
pub fn show_placeholders<R: ChartRenderer + ?Sized>(renderer: &mut R) {
    tracing::warn!("Showing chart placeholders (backend not available)");

    for kind in ChartKind::ALL {
        let container = kind.container_id();
        if renderer.has_container(container) {
            renderer.placeholder(container, PLACEHOLDER_MARKUP);
        }
    }
}

/// Renderer that records Plotly figures per container
#[derive(Debug, Default)]
pub struct PlotlyRenderer {
    pub figures: BTreeMap<String, PlotlyFigure>,
    pub placeholders: BTreeMap<String, String>,
}

impl PlotlyRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// All figures as one JSON object keyed by container id
    pub fn to_json(&self) -> Value {
        serde_json::to_value(&self.figures).unwrap_or(Value::Null)
    }
}

impl ChartRenderer for PlotlyRenderer {
    fn plot(&mut self, container: &str, chart: &ChartSpec) {
        self.placeholders.remove(container);
        self.figures.insert(container.to_string(), chart.to_plotly());
    }

    fn placeholder(&mut self, container: &str, markup: &str) {
        self.figures.remove(container);
        self.placeholders.insert(container.to_string(), markup.to_string());
    }
}
