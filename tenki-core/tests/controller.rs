//! End-to-end tests of the presentation controller against mock APIs.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tenki_core::{
    Coordinates, CurrentConditions, DailyForecastEntry, FetchError, GeocodingClient,
    LocationError, LocationProvider, LocationSensor, Origin, PlaceLabel, PositionOptions,
    PresentationController, Severity, TriggerState, View, WeatherProvider, WeatherReport,
    WidgetState,
    location::{FixedSensor, UnsupportedSensor},
    messages,
    provider::open_meteo::OpenMeteoProvider,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Records every rendered state.
#[derive(Default)]
struct RecordingView {
    frames: Mutex<Vec<WidgetState>>,
}

impl View for RecordingView {
    fn render(&self, state: &WidgetState) {
        self.frames.lock().push(state.clone());
    }
}

impl RecordingView {
    fn statuses(&self) -> Vec<(String, Severity)> {
        let mut out: Vec<(String, Severity)> = Vec::new();
        for frame in self.frames.lock().iter() {
            if let Some(status) = &frame.status {
                let entry = (status.message.clone(), status.severity);
                if out.last() != Some(&entry) {
                    out.push(entry);
                }
            }
        }
        out
    }

    fn triggers(&self) -> Vec<TriggerState> {
        self.frames.lock().iter().map(WidgetState::trigger).collect()
    }
}

#[derive(Debug)]
struct FailingSensor(LocationError);

#[async_trait]
impl LocationSensor for FailingSensor {
    async fn current_position(&self, _: &PositionOptions) -> Result<Coordinates, LocationError> {
        Err(self.0.clone())
    }
}

/// Sensor whose answer can be swapped between calls.
#[derive(Debug)]
struct ScriptedSensor(Mutex<Result<Coordinates, LocationError>>);

#[async_trait]
impl LocationSensor for ScriptedSensor {
    async fn current_position(&self, _: &PositionOptions) -> Result<Coordinates, LocationError> {
        self.0.lock().clone()
    }
}

/// Provider that answers after a latitude-dependent delay.
#[derive(Debug)]
struct DelayedProvider;

#[async_trait]
impl WeatherProvider for DelayedProvider {
    async fn fetch_weather(&self, coords: Coordinates) -> Result<WeatherReport, FetchError> {
        tokio::time::sleep(Duration::from_millis(coords.latitude as u64)).await;
        Ok(WeatherReport {
            current: CurrentConditions {
                temperature_c: coords.latitude,
                weather_code: 0,
                wind_speed_kmh: 1.0,
                observed_at: "2026-10-19T12:00:00".parse().unwrap(),
            },
            daily: vec![DailyForecastEntry {
                date: "2026-10-19".parse().unwrap(),
                max_temp_c: 20.0,
                min_temp_c: 10.0,
                weather_code: 0,
            }],
        })
    }
}

fn forecast_body() -> serde_json::Value {
    serde_json::json!({
        "current_weather": {
            "temperature": 18.6,
            "windspeed": 11.4,
            "weathercode": 61,
            "time": "2026-10-19T15:00"
        },
        "daily": {
            "time": ["2026-10-19", "2026-10-20", "2026-10-21"],
            "weathercode": [61, 2, 95],
            "temperature_2m_max": [20.4, 22.5, 18.0],
            "temperature_2m_min": [14.5, 13.2, 12.0]
        }
    })
}

async fn mount_forecast(server: &MockServer, status: u16, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

fn geocoder(server: &MockServer) -> GeocodingClient {
    GeocodingClient::new(
        format!("{}/v1/search", server.uri()),
        format!("{}/v1/reverse", server.uri()),
        "ja",
    )
}

fn controller(
    server: &MockServer,
    sensor: Arc<dyn LocationSensor>,
) -> (PresentationController, Arc<RecordingView>) {
    let view = Arc::new(RecordingView::default());
    let forecast_url = format!("{}/v1/forecast", server.uri());
    let weather = Arc::new(OpenMeteoProvider::with_base_url(forecast_url));
    let location =
        LocationProvider::new(sensor, PositionOptions::single_shot(), geocoder(server));
    let controller = PresentationController::new(weather, geocoder(server), location, view.clone());
    (controller, view)
}

#[tokio::test]
async fn sensor_lookup_renders_weather_with_reverse_label() {
    let server = MockServer::start().await;
    mount_forecast(&server, 200, forecast_body()).await;
    Mock::given(method("GET"))
        .and(path("/v1/reverse"))
        .and(query_param("latitude", "48.8566"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": [{
                "name": "Paris", "admin1": "Ile-de-France", "country": "France",
                "latitude": 48.85, "longitude": 2.35
            }]
        })))
        .mount(&server)
        .await;

    let sensor = Arc::new(FixedSensor(Coordinates::new(48.8566, 2.3522)));
    let (controller, view) = controller(&server, sensor);

    assert_eq!(controller.trigger().label(), messages::TRIGGER_FIRST_USE);
    controller.locate().await;

    let state = controller.state();
    let current = state.current.as_ref().expect("weather panel should be visible");
    assert_eq!(current.place, "Paris・Ile-de-France・France");
    assert_eq!(current.temperature, 19);
    assert_eq!(current.wind_speed, 11);
    assert_eq!(current.description, "弱い雨");
    assert_eq!(current.observed_at, "2026/10/19 15:00");

    assert_eq!(
        view.statuses(),
        vec![
            (messages::LOCATING.to_string(), Severity::Info),
            (messages::FETCHING_WEATHER.to_string(), Severity::Info),
            (messages::SHOWING_LATEST.to_string(), Severity::Success),
        ]
    );
    assert!(view.triggers().contains(&TriggerState::Busy));
    assert_eq!(controller.trigger(), TriggerState::Idle { has_succeeded: true });
    assert_eq!(controller.trigger().label(), messages::TRIGGER_REFETCH);
}

#[tokio::test]
async fn only_first_two_forecast_days_are_shown_in_order() {
    let server = MockServer::start().await;
    mount_forecast(&server, 200, forecast_body()).await;

    let (controller, _view) = controller(&server, Arc::new(UnsupportedSensor));
    let label = PlaceLabel::from_parts("Kyoto", Some("Kyoto"), Some("Japan"));
    controller.lookup(Coordinates::new(35.0116, 135.7681), Some(label), Origin::Search).await;

    let state = controller.state();
    assert_eq!(state.forecast.len(), 2);
    assert_eq!(state.forecast[0].date, "10月19日(月)");
    assert_eq!(state.forecast[0].description, "弱い雨");
    assert_eq!((state.forecast[0].max_temp, state.forecast[0].min_temp), (20, 15));
    assert_eq!(state.forecast[1].date, "10月20日(火)");
    assert_eq!(state.forecast[1].description, "一部曇り");
    assert_eq!(state.current.unwrap().place, "Kyoto・Japan");
}

#[tokio::test]
async fn supplied_label_skips_reverse_lookup() {
    let server = MockServer::start().await;
    mount_forecast(&server, 200, forecast_body()).await;
    Mock::given(method("GET"))
        .and(path("/v1/reverse"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (controller, _view) = controller(&server, Arc::new(UnsupportedSensor));
    let label = PlaceLabel::from_parts("Oslo", None, Some("Norway"));
    controller.lookup(Coordinates::new(59.91, 10.75), Some(label), Origin::Search).await;

    assert_eq!(controller.state().current.unwrap().place, "Oslo・Norway");
}

#[tokio::test]
async fn failed_fetch_keeps_previous_weather() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_forecast(&server, 500, serde_json::json!({ "error": true })).await;

    let (controller, view) = controller(&server, Arc::new(UnsupportedSensor));
    let label = || Some(PlaceLabel::from_parts("Kyoto", None, Some("Japan")));

    controller.lookup(Coordinates::new(35.0, 135.7), label(), Origin::Search).await;
    let before = controller.state();

    controller.lookup(Coordinates::new(35.0, 135.7), label(), Origin::Search).await;
    let after = controller.state();

    assert_eq!(after.current, before.current);
    assert_eq!(after.forecast, before.forecast);
    assert_eq!(after.weather_revision, before.weather_revision);

    let (message, severity) = view.statuses().pop().unwrap();
    assert_eq!(message, messages::WEATHER_FAILED);
    assert_eq!(severity, Severity::Error);
}

#[tokio::test]
async fn missing_daily_section_reports_failure_without_rendering() {
    let server = MockServer::start().await;
    let mut body = forecast_body();
    body.as_object_mut().unwrap().remove("daily");
    mount_forecast(&server, 200, body).await;

    let (controller, _view) = controller(&server, Arc::new(UnsupportedSensor));
    let label = Some(PlaceLabel::from_parts("X", None, None));
    controller.lookup(Coordinates::new(1.0, 2.0), label, Origin::Search).await;

    let state = controller.state();
    assert!(!state.weather_visible());
    assert!(state.forecast.is_empty());
    assert_eq!(state.status.unwrap().severity, Severity::Error);
}

#[tokio::test]
async fn refetch_wording_survives_a_later_sensor_failure() {
    let server = MockServer::start().await;
    mount_forecast(&server, 200, forecast_body()).await;

    let sensor = Arc::new(ScriptedSensor(Mutex::new(Ok(Coordinates::new(10.0, 20.0)))));
    let (controller, view) = controller(&server, sensor.clone());

    controller.locate().await;
    assert_eq!(controller.trigger().label(), messages::TRIGGER_REFETCH);

    *sensor.0.lock() = Err(LocationError::PermissionDenied);
    controller.locate().await;

    assert_eq!(controller.trigger(), TriggerState::Idle { has_succeeded: true });
    assert_eq!(controller.trigger().label(), messages::TRIGGER_REFETCH);

    let status = controller.state().status.unwrap();
    assert_eq!(status.message, messages::location_failed(&LocationError::PermissionDenied));
    assert_eq!(status.severity, Severity::Warning);
    assert_eq!(view.triggers().last(), Some(&TriggerState::Idle { has_succeeded: true }));
}

#[tokio::test]
async fn sensor_failure_before_any_success_keeps_first_use_wording() {
    let server = MockServer::start().await;

    for err in [
        LocationError::PermissionDenied,
        LocationError::PositionUnavailable("no fix".into()),
        LocationError::Other("boom".into()),
    ] {
        let (controller, _view) = controller(&server, Arc::new(FailingSensor(err.clone())));
        controller.locate().await;

        assert_eq!(controller.trigger(), TriggerState::Idle { has_succeeded: false });
        assert_eq!(controller.state().status.unwrap().message, messages::location_failed(&err));
    }
}

#[tokio::test]
async fn unsupported_sensor_is_reported_without_fetching() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (controller, _view) = controller(&server, Arc::new(UnsupportedSensor));
    controller.locate().await;

    let status = controller.state().status.unwrap();
    assert_eq!(
        status.message,
        messages::location_failed(&LocationError::Unsupported(String::new()))
    );
    assert_eq!(controller.trigger(), TriggerState::Idle { has_succeeded: false });
}

#[tokio::test]
async fn search_with_zero_matches_is_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    let (controller, _view) = controller(&server, Arc::new(UnsupportedSensor));
    controller.search("Atlantis").await;

    let state = controller.state();
    let status = state.status.unwrap();
    assert_eq!(status.message, messages::no_candidates("Atlantis"));
    assert_eq!(status.severity, Severity::Warning);
    assert!(state.candidates.is_empty());
}

#[tokio::test]
async fn search_http_error_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (controller, _view) = controller(&server, Arc::new(UnsupportedSensor));
    controller.search("Atlantis").await;

    let status = controller.state().status.unwrap();
    assert_eq!(status.message, messages::SEARCH_FAILED);
    assert_eq!(status.severity, Severity::Error);
    assert_ne!(status.message, messages::no_candidates("Atlantis"));
}

#[tokio::test]
async fn blank_search_is_rejected_locally() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (controller, _view) = controller(&server, Arc::new(UnsupportedSensor));
    controller.search("   ").await;

    assert_eq!(controller.state().status.unwrap().message, messages::EMPTY_QUERY);
}

#[tokio::test]
async fn selecting_a_candidate_uses_its_label_and_clears_the_list() {
    let server = MockServer::start().await;
    mount_forecast(&server, 200, forecast_body()).await;
    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .and(query_param("name", "Kyoto"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": [
                { "name": "Kyoto", "admin1": "Kyoto", "country": "Japan",
                  "latitude": 35.02107, "longitude": 135.75385 },
                { "name": "Kyotamba", "admin1": "Kyoto", "country": "Japan",
                  "latitude": 35.16, "longitude": 135.42 }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/reverse"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (controller, _view) = controller(&server, Arc::new(UnsupportedSensor));
    controller.search("Kyoto").await;

    let state = controller.state();
    assert_eq!(state.candidates.len(), 2);
    assert_eq!(state.status.unwrap().message, messages::choose_candidate(2));

    assert!(!controller.select_candidate(5).await);
    assert!(controller.select_candidate(0).await);

    let state = controller.state();
    assert!(state.candidates.is_empty());
    assert_eq!(state.current.unwrap().place, "Kyoto・Japan");
    // Search-originated lookups leave the trigger alone.
    assert!(!state.sensor_succeeded);
}

#[tokio::test(start_paused = true)]
async fn stale_lookup_does_not_overwrite_newer_result() {
    let server_free_geocoder =
        GeocodingClient::new("http://127.0.0.1:1/search", "http://127.0.0.1:1/reverse", "ja");
    let view = Arc::new(RecordingView::default());
    let location = LocationProvider::new(
        Arc::new(UnsupportedSensor),
        PositionOptions::single_shot(),
        server_free_geocoder.clone(),
    );
    let controller = PresentationController::new(
        Arc::new(DelayedProvider),
        server_free_geocoder,
        location,
        view.clone(),
    );

    let slow = controller.lookup(
        Coordinates::new(80.0, 0.0),
        Some(PlaceLabel::from_parts("Slow", None, None)),
        Origin::Search,
    );
    let fast = async {
        tokio::time::sleep(Duration::from_millis(5)).await;
        controller
            .lookup(
                Coordinates::new(20.0, 0.0),
                Some(PlaceLabel::from_parts("Fast", None, None)),
                Origin::Search,
            )
            .await;
    };
    tokio::join!(slow, fast);

    let state = controller.state();
    let current = state.current.unwrap();
    assert_eq!(current.place, "Fast");
    assert_eq!(current.temperature, 20);
    assert_eq!(state.weather_revision, 1);
    assert_eq!(state.status.unwrap().severity, Severity::Success);
}
