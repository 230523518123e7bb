//! Dashboard Controller
//!
//! Runs the dashboard's straight-line procedures: write the KPI cards, load
//! the payload once, render charts (or placeholders), fill the autocomplete
//! lists, and handle prediction submissions.

use chrono::{DateTime, Local, NaiveDateTime};

use super::charts::{render_all, show_placeholders, ChartRenderer};
use super::client::{ClientError, DashboardApi};
use super::kpi::{apply_kpis, last_updated_text};
use super::payload::{DashboardData, PredictionForm, PredictionResult};
use super::view::{
    elements, ButtonState, DashboardView, PredictionDisplay, STATUS_CONNECTED, STATUS_UNAVAILABLE,
};

/// What happened to a prediction submission
#[derive(Debug)]
pub enum PredictionOutcome {
    /// Result received and displayed
    Displayed(PredictionResult),
    /// Form incomplete; no request was sent
    Invalid(String),
    /// Request sent and failed
    Failed(ClientError),
}

/// The dashboard page: an API, a view, and a chart renderer
pub struct Dashboard<A, V, R> {
    api: A,
    view: V,
    renderer: R,
    /// Last successfully loaded payload
    data: Option<DashboardData>,
    /// Whether the last load reached the backend
    connected: bool,
}

impl<A, V, R> Dashboard<A, V, R>
where
    A: DashboardApi,
    V: DashboardView,
    R: ChartRenderer,
{
    pub fn new(api: A, view: V, renderer: R) -> Self {
        Self {
            api,
            view,
            renderer,
            data: None,
            connected: false,
        }
    }

    /// Page startup: KPI cards first, then the one data load
    pub async fn init(&mut self, now: DateTime<Local>) -> Result<(), ClientError> {
        tracing::info!("Initializing dashboard");
        apply_kpis(&mut self.view, &now);
        let result = self.load().await;
        tracing::info!("Dashboard initialization complete");
        result
    }

    /// Fetch the payload and render it, or fall back to placeholders
    pub async fn load(&mut self) -> Result<(), ClientError> {
        self.view.set_loading(true);

        let result = self.api.dashboard_data().await;
        let outcome = match result {
            Ok(loaded) => {
                tracing::info!("Dashboard data loaded from backend");
                self.data = Some(loaded.data);
                self.connected = true;

                self.render_all_charts();
                self.populate_dropdowns();
                self.update_data_status(STATUS_CONNECTED, loaded.last_updated.as_deref());
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Backend not available");
                self.data = None;
                self.connected = false;

                show_placeholders(&mut self.renderer);
                self.update_data_status(STATUS_UNAVAILABLE, None);
                Err(e)
            }
        };

        self.view.set_loading(false);
        outcome
    }

    /// Render every chart whose group is in the loaded payload
    pub fn render_all_charts(&mut self) -> usize {
        match &self.data {
            Some(data) => render_all(data, &mut self.renderer),
            None => {
                tracing::warn!("No data available for charts");
                0
            }
        }
    }

    /// Fill the prediction form's autocomplete lists from the payload
    pub fn populate_dropdowns(&mut self) {
        let Some(data) = &self.data else {
            return;
        };

        if let Some(group) = &data.service_types {
            self.view.set_datalist(elements::SERVICE_TYPE_LIST, &group.types);
        }
        if let Some(group) = &data.ward_distribution {
            self.view.set_datalist(elements::WARD_LIST, &group.wards);
        }
        if let Some(group) = &data.division_distribution {
            self.view.set_datalist(elements::DIVISION_LIST, &group.divisions);
        }
    }

    /// Validate, post, and display a prediction request
    pub async fn submit_prediction(&mut self, form: &PredictionForm) -> PredictionOutcome {
        if let Err(e) = form.validate() {
            let message = e.to_string();
            self.view.show_error(&message);
            return PredictionOutcome::Invalid(message);
        }

        self.view.set_predict_button(ButtonState::Busy);

        let outcome = match self.api.predict_completion(form).await {
            Ok(result) => {
                tracing::info!(prediction = %result.prediction, "Prediction received");
                self.view.show_prediction(&PredictionDisplay::from(&result));
                PredictionOutcome::Displayed(result)
            }
            Err(e) => {
                tracing::error!(error = %e, "Prediction request failed");
                self.view.show_error(&format!("Prediction failed: {}", e));
                PredictionOutcome::Failed(e)
            }
        };

        self.view.set_predict_button(ButtonState::Idle);
        outcome
    }

    /// Close the error modal
    pub fn dismiss_error(&mut self) {
        self.view.hide_error();
    }

    pub fn data(&self) -> Option<&DashboardData> {
        self.data.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Give back the view and renderer
    pub fn into_parts(self) -> (A, V, R) {
        (self.api, self.view, self.renderer)
    }

    fn update_data_status(&mut self, status: &str, last_updated: Option<&str>) {
        self.view.set_text(elements::DATA_STATUS, status);

        if let Some(stamp) = last_updated {
            let text = match parse_timestamp(stamp) {
                Some(at) => last_updated_text(&at),
                None => format!("Last updated: {}", stamp),
            };
            self.view.set_text(elements::LAST_UPDATED, &text);
        }
    }
}

/// Read a server timestamp: RFC 3339, or naive ISO 8601 in local time
fn parse_timestamp(stamp: &str) -> Option<DateTime<Local>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(stamp) {
        return Some(dt.with_timezone(&Local));
    }

    NaiveDateTime::parse_from_str(stamp, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .and_then(|naive| naive.and_local_timezone(Local).earliest())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::charts::{ChartKind, ChartSpec, Series, PLACEHOLDER_MARKUP};
    use crate::dashboard::client::LoadedDashboard;
    use crate::dashboard::payload::*;
    use async_trait::async_trait;
    use serde_json::Number;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    // ---------- test doubles ----------

    enum DataReply {
        Ok(LoadedDashboard),
        Status(u16),
        Malformed,
        Backend(&'static str),
    }

    struct StubApi {
        data: DataReply,
        prediction: Mutex<Option<Result<PredictionResult, ClientError>>>,
        data_calls: AtomicUsize,
        predict_calls: AtomicUsize,
    }

    impl StubApi {
        fn with_data(data: DataReply) -> Self {
            Self {
                data,
                prediction: Mutex::new(None),
                data_calls: AtomicUsize::new(0),
                predict_calls: AtomicUsize::new(0),
            }
        }

        fn with_prediction(self, reply: Result<PredictionResult, ClientError>) -> Self {
            *self.prediction.lock().unwrap() = Some(reply);
            self
        }
    }

    #[async_trait]
    impl DashboardApi for StubApi {
        async fn dashboard_data(&self) -> Result<LoadedDashboard, ClientError> {
            self.data_calls.fetch_add(1, Ordering::SeqCst);
            match &self.data {
                DataReply::Ok(loaded) => Ok(loaded.clone()),
                DataReply::Status(status) => Err(ClientError::Status {
                    status: *status,
                    message: None,
                }),
                DataReply::Malformed => Err(ClientError::Decode("expected value".to_string())),
                DataReply::Backend(msg) => Err(ClientError::Backend(msg.to_string())),
            }
        }

        async fn predict_completion(
            &self,
            _form: &PredictionForm,
        ) -> Result<PredictionResult, ClientError> {
            self.predict_calls.fetch_add(1, Ordering::SeqCst);
            self.prediction
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(ClientError::Unavailable))
        }
    }

    #[derive(Default)]
    struct RecordingView {
        text: HashMap<String, String>,
        datalists: HashMap<String, Vec<String>>,
        loading_changes: Vec<bool>,
        error: Option<String>,
        buttons: Vec<ButtonState>,
        prediction: Option<PredictionDisplay>,
    }

    impl DashboardView for RecordingView {
        fn set_text(&mut self, element: &str, text: &str) {
            self.text.insert(element.to_string(), text.to_string());
        }
        fn set_datalist(&mut self, list: &str, options: &[String]) {
            self.datalists.insert(list.to_string(), options.to_vec());
        }
        fn set_loading(&mut self, active: bool) {
            self.loading_changes.push(active);
        }
        fn show_error(&mut self, message: &str) {
            self.error = Some(message.to_string());
        }
        fn hide_error(&mut self) {
            self.error = None;
        }
        fn set_predict_button(&mut self, state: ButtonState) {
            self.buttons.push(state);
        }
        fn show_prediction(&mut self, display: &PredictionDisplay) {
            self.prediction = Some(display.clone());
        }
    }

    #[derive(Default)]
    struct RecordingRenderer {
        plots: Vec<(String, ChartSpec)>,
        placeholders: Vec<(String, String)>,
    }

    impl ChartRenderer for RecordingRenderer {
        fn plot(&mut self, container: &str, chart: &ChartSpec) {
            self.plots.push((container.to_string(), chart.clone()));
        }
        fn placeholder(&mut self, container: &str, markup: &str) {
            self.placeholders.push((container.to_string(), markup.to_string()));
        }
    }

    fn numbers(values: &[u64]) -> Vec<Number> {
        values.iter().copied().map(Number::from).collect()
    }

    fn text(values: &[&str]) -> Series {
        Series::Text(values.iter().map(|v| v.to_string()).collect())
    }

    fn full_payload() -> DashboardData {
        DashboardData {
            generated_at: Some("2025-06-01T08:00:00".to_string()),
            time_series: Some(TimeSeries {
                dates: vec!["2025-05-30".into(), "2025-05-31".into()],
                counts: numbers(&[120, 98]),
            }),
            ward_distribution: Some(WardDistribution {
                wards: vec!["Spadina-Fort York (10)".into(), "Toronto Centre (13)".into()],
                counts: numbers(&[540, 410]),
            }),
            status_distribution: Some(StatusDistribution {
                statuses: vec!["Completed".into(), "Cancelled".into(), "In-progress".into()],
                counts: numbers(&[700, 100, 50]),
            }),
            service_types: Some(ServiceTypes {
                types: vec!["Noise".into(), "Graffiti".into()],
                counts: numbers(&[300, 120]),
            }),
            division_distribution: Some(DivisionDistribution {
                divisions: vec!["Solid Waste Management".into()],
                counts: numbers(&[620]),
            }),
            hourly_pattern: Some(HourlyPattern {
                hours: (0..24u64).map(Number::from).collect(),
                counts: (0..24u64).map(|h| Number::from(h * 3)).collect(),
            }),
            feature_importance: Some(FeatureImportance {
                features: vec!["Hour".into(), "Month".into()],
                importance: vec![0.3125, 0.1874],
            }),
            ..Default::default()
        }
    }

    fn loaded(data: DashboardData) -> DataReply {
        DataReply::Ok(LoadedDashboard {
            data,
            last_updated: Some("2025-06-01T08:00:00".to_string()),
        })
    }

    fn dashboard(api: StubApi) -> Dashboard<StubApi, RecordingView, RecordingRenderer> {
        Dashboard::new(api, RecordingView::default(), RecordingRenderer::default())
    }

    fn plotted<'a>(renderer: &'a RecordingRenderer, container: &str) -> Option<&'a ChartSpec> {
        renderer
            .plots
            .iter()
            .find(|(c, _)| c == container)
            .map(|(_, spec)| spec)
    }

    // ---------- load ----------

    #[tokio::test]
    async fn test_well_formed_payload_renders_all_seven_charts() {
        let mut dash = dashboard(StubApi::with_data(loaded(full_payload())));
        dash.load().await.unwrap();

        let renderer = dash.renderer();
        assert_eq!(renderer.plots.len(), 7);
        assert!(renderer.placeholders.is_empty());

        let ts = plotted(renderer, "timeSeriesChart").unwrap();
        assert_eq!(ts.labels, text(&["2025-05-30", "2025-05-31"]));
        assert_eq!(ts.values, Series::Number(numbers(&[120, 98])));

        let wards = plotted(renderer, "wardChart").unwrap();
        assert_eq!(wards.labels, text(&["Spadina-Fort York (10)", "Toronto Centre (13)"]));
        assert_eq!(wards.values, Series::Number(numbers(&[540, 410])));

        let status = plotted(renderer, "statusChart").unwrap();
        assert_eq!(status.labels, text(&["Completed", "Cancelled", "In-progress"]));
        assert_eq!(status.values, Series::Number(numbers(&[700, 100, 50])));

        let types = plotted(renderer, "serviceTypesChart").unwrap();
        assert_eq!(types.labels, text(&["Noise", "Graffiti"]));
        assert_eq!(types.values, Series::Number(numbers(&[300, 120])));

        let divisions = plotted(renderer, "divisionChart").unwrap();
        assert_eq!(divisions.labels, text(&["Solid Waste Management"]));
        assert_eq!(divisions.values, Series::Number(numbers(&[620])));

        let hourly = plotted(renderer, "hourlyPatternChart").unwrap();
        let hours: Vec<u64> = (0..24).collect();
        let hourly_counts: Vec<u64> = (0..24).map(|h| h * 3).collect();
        assert_eq!(hourly.labels, Series::Number(numbers(&hours)));
        assert_eq!(hourly.values, Series::Number(numbers(&hourly_counts)));

        let features = plotted(renderer, "featureImportanceChart").unwrap();
        assert_eq!(features.labels, text(&["Hour", "Month"]));
        assert_eq!(features.values, Series::Float(vec![0.3125, 0.1874]));

        assert!(dash.is_connected());
        assert_eq!(dash.view().text["dataStatus"], "Connected to Backend");
        assert_eq!(dash.view().loading_changes, vec![true, false]);
    }

    #[tokio::test]
    async fn test_missing_group_skips_only_that_chart() {
        let mut data = full_payload();
        data.division_distribution = None;

        let mut dash = dashboard(StubApi::with_data(loaded(data)));
        dash.load().await.unwrap();

        let renderer = dash.renderer();
        assert_eq!(renderer.plots.len(), 6);
        assert!(plotted(renderer, "divisionChart").is_none());
        for kind in ChartKind::ALL {
            if kind != ChartKind::Division {
                assert!(plotted(renderer, kind.container_id()).is_some(), "{:?}", kind);
            }
        }
        assert!(renderer.placeholders.is_empty());
    }

    async fn assert_placeholders_only(reply: DataReply) {
        let mut dash = dashboard(StubApi::with_data(reply));
        assert!(dash.load().await.is_err());

        let renderer = dash.renderer();
        assert!(renderer.plots.is_empty());
        assert_eq!(renderer.placeholders.len(), 7);
        for (kind, (container, markup)) in ChartKind::ALL.iter().zip(&renderer.placeholders) {
            assert_eq!(container, kind.container_id());
            assert_eq!(markup, PLACEHOLDER_MARKUP);
        }

        assert!(dash.data().is_none());
        assert!(!dash.is_connected());
        assert_eq!(dash.view().text["dataStatus"], "Backend Not Available");
        assert_eq!(dash.view().loading_changes, vec![true, false]);
    }

    #[tokio::test]
    async fn test_non_2xx_shows_placeholders() {
        assert_placeholders_only(DataReply::Status(500)).await;
    }

    #[tokio::test]
    async fn test_malformed_response_shows_placeholders() {
        assert_placeholders_only(DataReply::Malformed).await;
    }

    #[tokio::test]
    async fn test_application_error_shows_placeholders() {
        assert_placeholders_only(DataReply::Backend("Dashboard data not available")).await;
    }

    #[tokio::test]
    async fn test_failed_reload_drops_previous_payload() {
        let mut dash = dashboard(StubApi::with_data(loaded(full_payload())));
        dash.load().await.unwrap();
        assert!(dash.data().is_some());

        let (_, view, renderer) = dash.into_parts();
        let mut dash = Dashboard::new(StubApi::with_data(DataReply::Status(502)), view, renderer);
        assert!(dash.load().await.is_err());
        assert!(dash.data().is_none());
    }

    #[tokio::test]
    async fn test_dropdowns_populated_from_payload() {
        let mut dash = dashboard(StubApi::with_data(loaded(full_payload())));
        dash.load().await.unwrap();

        let lists = &dash.view().datalists;
        assert_eq!(lists["serviceTypeList"], vec!["Noise", "Graffiti"]);
        assert_eq!(lists["wardList"].len(), 2);
        assert_eq!(lists["divisionList"], vec!["Solid Waste Management"]);
    }

    #[tokio::test]
    async fn test_init_sets_kpis_then_loads() {
        let api = StubApi::with_data(loaded(full_payload()));
        let mut dash = dashboard(api);
        dash.init(Local::now()).await.unwrap();

        assert_eq!(dash.view().text["totalRequests"], "15,420");
        assert_eq!(dash.view().text["dataStatus"], "Connected to Backend");
        assert!(dash.view().text["lastUpdated"].starts_with("Last updated: 2025-06-01"));

        // The payload is fetched exactly once
        let (api, _, _) = dash.into_parts();
        assert_eq!(api.data_calls.load(Ordering::SeqCst), 1);
    }

    // ---------- prediction ----------

    #[tokio::test]
    async fn test_empty_required_field_blocks_request() {
        for form in [
            PredictionForm::new("Noise", "", "Bylaw"),
            PredictionForm::new("", "Ward 1", "Bylaw"),
            PredictionForm::new("Noise", "Ward 1", ""),
        ] {
            let mut dash = dashboard(StubApi::with_data(DataReply::Status(500)));
            let outcome = dash.submit_prediction(&form).await;

            assert!(matches!(outcome, PredictionOutcome::Invalid(_)));
            assert_eq!(
                dash.view().error.as_deref(),
                Some("Please fill in Service Type, Ward, and Division")
            );
            assert!(dash.view().buttons.is_empty());

            let (api, _, _) = dash.into_parts();
            assert_eq!(api.predict_calls.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test]
    async fn test_successful_prediction_is_displayed() {
        let result = PredictionResult {
            completion_probability: serde_json::from_str("73").unwrap(),
            prediction: "Completed".to_string(),
            confidence: serde_json::from_str("88").unwrap(),
            factors: vec!["Weekday".to_string(), "Morning".to_string()],
        };
        let api = StubApi::with_data(DataReply::Status(500)).with_prediction(Ok(result));
        let mut dash = dashboard(api);

        let form = PredictionForm::new("Noise", "Ward 1", "Bylaw").time_of_day("morning");
        let outcome = dash.submit_prediction(&form).await;
        assert!(matches!(outcome, PredictionOutcome::Displayed(_)));

        let shown = dash.view().prediction.clone().unwrap();
        assert_eq!(shown.probability, "73%");
        assert_eq!(shown.outcome, "Completed");
        assert_eq!(shown.confidence, "88%");
        assert_eq!(shown.factors, vec!["Weekday".to_string(), "Morning".to_string()]);
        assert_eq!(dash.view().buttons, vec![ButtonState::Busy, ButtonState::Idle]);
        assert!(dash.view().error.is_none());
    }

    #[tokio::test]
    async fn test_failed_prediction_shows_modal_and_restores_button() {
        let api = StubApi::with_data(DataReply::Status(500)).with_prediction(Err(
            ClientError::Status {
                status: 500,
                message: None,
            },
        ));
        let mut dash = dashboard(api);

        let outcome = dash
            .submit_prediction(&PredictionForm::new("Noise", "Ward 1", "Bylaw"))
            .await;
        assert!(matches!(outcome, PredictionOutcome::Failed(_)));
        assert_eq!(
            dash.view().error.as_deref(),
            Some("Prediction failed: HTTP error! status: 500")
        );
        assert_eq!(dash.view().buttons.last(), Some(&ButtonState::Idle));
        assert!(dash.view().prediction.is_none());

        dash.dismiss_error();
        assert!(dash.view().error.is_none());
    }
}
