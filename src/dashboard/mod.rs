//! Dashboard Consumer
//!
//! The dashboard page logic, independent of any particular page or chart
//! library.
//!
//! ## Architecture
//!
//! - **Payload**: wire types for the two API calls
//! - **Charts**: payload groups → chart specs → [`ChartRenderer`]
//! - **View**: the page surface ([`DashboardView`]) and form validation
//! - **Client**: [`DashboardApi`] and its reqwest implementation
//! - **Controller**: [`Dashboard`], which sequences the above
//!
//! ## Flow
//!
//! 1. KPI cards are written from fixed values
//! 2. The payload is fetched once
//! 3. Each present chart group is rendered; a failed fetch shows placeholders
//! 4. Prediction submissions are validated, posted, and displayed

pub mod charts;
mod client;
mod controller;
pub mod kpi;
pub mod payload;
pub mod terminal;
pub mod view;

pub use charts::{
    render_all, show_placeholders, ChartKind, ChartRenderer, ChartSpec, PlotlyFigure,
    PlotlyRenderer, Series, TraceStyle,
};
pub use client::{
    ClientConfig, ClientError, DashboardApi, HttpDashboardClient, LoadedDashboard,
    DEFAULT_API_BASE,
};
pub use controller::{Dashboard, PredictionOutcome};
pub use payload::{
    CategoricalValues, DashboardData, DashboardResponse, DisplayValue, PredictionForm,
    PredictionResponse, PredictionResult,
};
pub use terminal::{TerminalRenderer, TerminalView};
pub use view::{ButtonState, DashboardView, FormError, PredictionDisplay};
