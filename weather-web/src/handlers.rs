//! Request handlers. Every recoverable failure becomes a notice plus a
//! redirect to the home page.

use std::sync::Arc;

use axum::{
    Form,
    extract::{State, rejection::FormRejection},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::{error, info, warn};
use weather_core::{City, Observation, chart};

use crate::{
    app::AppState,
    error::AppError,
    notice::{self, Notice},
};

#[derive(Debug, Deserialize)]
pub struct AddCityForm {
    #[serde(default)]
    pub city: String,
}

pub async fn home(State(state): State<AppState>, jar: CookieJar) -> Response {
    let (jar, notice) = notice::take(jar);

    match state.views.home(notice.as_ref(), state.config.max_city_length) {
        Ok(html) => (jar, Html(html)).into_response(),
        Err(err) => template_failure(err),
    }
}

pub async fn add_city(
    State(state): State<AppState>,
    jar: CookieJar,
    form: Result<Form<AddCityForm>, FormRejection>,
) -> Response {
    // A body that is not a urlencoded form has no `city` field.
    let city = match form {
        Ok(Form(form)) => form.city,
        Err(rejection) => {
            warn!(error = %rejection, "Unreadable city form");
            String::new()
        }
    };

    match submit_city(&state, &city).await {
        Ok(saved) => {
            let message = format!("Weather data for {} added successfully!", saved.city);
            notice::redirect_home(jar, Notice::success(message)).into_response()
        }
        Err(err) => fail(jar, err),
    }
}

pub async fn weather(State(state): State<AppState>, jar: CookieJar) -> Response {
    let records = match list_all(&state).await {
        Ok(records) => records,
        Err(err) => return fail(jar, err),
    };

    let (jar, notice) = notice::take(jar);
    match state.views.weather(notice.as_ref(), &records) {
        Ok(html) => (jar, Html(html)).into_response(),
        Err(err) => template_failure(err),
    }
}

pub async fn plot(State(state): State<AppState>, jar: CookieJar) -> Response {
    match render_plot(&state).await {
        Ok(png) => ([(header::CONTENT_TYPE, "image/png")], png).into_response(),
        Err(err) => fail(jar, err),
    }
}

/// Validate, check the credential, fetch, then store. Each step short-circuits.
async fn submit_city(state: &AppState, raw: &str) -> Result<Observation, AppError> {
    let city = City::parse(raw, state.config.max_city_length)?;
    let provider = state.provider.as_ref().ok_or(AppError::NotConfigured)?;

    let conditions = provider
        .current_conditions(&city)
        .await
        .map_err(|source| AppError::Fetch { city: city.to_string(), source })?;

    let store = Arc::clone(&state.store);
    let name = city.to_string();
    let saved = tokio::task::spawn_blocking(move || store.append(&city, &conditions))
        .await?
        .map_err(|source| AppError::Save { city: name, source })?;

    info!(city = %saved.city, id = saved.id, temperature = saved.temperature, "City added");
    Ok(saved)
}

async fn list_all(state: &AppState) -> Result<Vec<Observation>, AppError> {
    let store = Arc::clone(&state.store);
    tokio::task::spawn_blocking(move || store.list_all())
        .await?
        .map_err(AppError::Read)
}

async fn render_plot(state: &AppState) -> Result<Vec<u8>, AppError> {
    let limit = state.config.plot_max_entries;

    let store = Arc::clone(&state.store);
    let recent = tokio::task::spawn_blocking(move || store.list_recent(limit))
        .await?
        .map_err(AppError::Read)?;

    if recent.is_empty() {
        return Err(AppError::NoData);
    }

    let bars: Vec<(String, f64)> = recent.into_iter().map(|o| (o.city, o.temperature)).collect();
    let title = format!("City Temperatures (Latest {limit} Entries)");
    let path = state.config.plot_path();

    // The response carries the rendered bytes, never a re-read of the shared file.
    let png = tokio::task::spawn_blocking(move || chart::render_bar_chart(&bars, &title, &path)).await??;
    Ok(png)
}

fn fail(jar: CookieJar, err: AppError) -> Response {
    if err.is_user_error() {
        warn!(error = %err, "Request rejected");
    } else {
        error!(error = %err, "Request failed");
    }
    notice::redirect_home(jar, err.notice()).into_response()
}

fn template_failure(err: tera::Error) -> Response {
    error!(error = ?err, "Failed to render template");
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{AppState, router};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, header::CONTENT_TYPE};
    use http_body_util::BodyExt;
    use tempfile::TempDir;
    use tower::ServiceExt;
    use weather_core::{Conditions, Config, FetchError, RecordStore, WeatherProvider};

    #[derive(Debug)]
    enum StubProvider {
        Sunny,
        CityNotFound,
    }

    #[async_trait]
    impl WeatherProvider for StubProvider {
        async fn current_conditions(&self, _city: &City) -> Result<Conditions, FetchError> {
            match self {
                StubProvider::Sunny => Ok(Conditions {
                    temperature: 20.5,
                    humidity: 65,
                    description: "sunny".to_string(),
                }),
                StubProvider::CityNotFound => {
                    Err(FetchError::Status { status: 404, body: "city not found".to_string() })
                }
            }
        }
    }

    struct Harness {
        state: AppState,
        dir: TempDir,
    }

    impl Harness {
        fn new(provider: Option<StubProvider>) -> Self {
            let store = RecordStore::open_in_memory().unwrap();
            store.initialize().unwrap();
            Self::with_store(provider, store)
        }

        fn with_store(provider: Option<StubProvider>, store: RecordStore) -> Self {
            Self::build(provider, store, |dir| dir.join("static"))
        }

        fn with_static_dir(
            provider: Option<StubProvider>,
            static_dir: fn(&std::path::Path) -> std::path::PathBuf,
        ) -> Self {
            let store = RecordStore::open_in_memory().unwrap();
            store.initialize().unwrap();
            Self::build(provider, store, static_dir)
        }

        fn build(
            provider: Option<StubProvider>,
            store: RecordStore,
            static_dir: fn(&std::path::Path) -> std::path::PathBuf,
        ) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let config = Config { static_dir: static_dir(dir.path()), ..Config::default() };
            let provider = provider.map(|p| Arc::new(p) as Arc<dyn WeatherProvider>);
            let state = AppState::new(config, store, provider).unwrap();
            Self { state, dir }
        }

        async fn send(&self, request: Request<Body>) -> Response {
            router(self.state.clone()).oneshot(request).await.unwrap()
        }

        async fn get(&self, uri: &str) -> Response {
            self.send(Request::get(uri).body(Body::empty()).unwrap()).await
        }

        async fn post_city(&self, city: &str) -> Response {
            let body = format!("city={}", urlencoding::encode(city));
            self.send(
                Request::post("/add_city")
                    .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
        }

        /// Follow a redirect home the way a browser would, carrying the notice cookie.
        async fn follow(&self, response: Response) -> String {
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            assert_eq!(response.headers()[header::LOCATION], "/");

            let cookie = notice_cookie(&response).expect("redirect should carry a notice");
            let request = Request::get("/").header(header::COOKIE, cookie).body(Body::empty()).unwrap();
            let home = self.send(request).await;
            assert_eq!(home.status(), StatusCode::OK);
            body_text(home).await
        }

        fn records(&self) -> Vec<Observation> {
            self.state.store.list_all().unwrap()
        }
    }

    fn notice_cookie(response: &Response) -> Option<String> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with("notice="))
            .and_then(|v| v.split(';').next())
            .map(str::to_string)
    }

    async fn body_text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn home_page_loads() {
        let h = Harness::new(None);

        let res = h.get("/").await;

        assert_eq!(res.status(), StatusCode::OK);
        assert!(body_text(res).await.contains("Weather App"));
    }

    #[tokio::test]
    async fn home_page_loads_with_records() {
        let h = Harness::new(Some(StubProvider::Sunny));
        h.post_city("London").await;

        assert_eq!(h.get("/").await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn weather_page_loads() {
        let h = Harness::new(None);

        let res = h.get("/weather").await;

        assert_eq!(res.status(), StatusCode::OK);
        assert!(body_text(res).await.contains("Weather Data"));
    }

    #[tokio::test]
    async fn add_empty_city() {
        let h = Harness::new(Some(StubProvider::Sunny));

        let page = h.follow(h.post_city("   ").await).await;

        assert!(page.contains("Please enter a city name"));
        assert!(h.records().is_empty());
    }

    #[tokio::test]
    async fn missing_city_field_counts_as_empty() {
        let h = Harness::new(Some(StubProvider::Sunny));
        let request = Request::post("/add_city")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::empty())
            .unwrap();

        let page = h.follow(h.send(request).await).await;

        assert!(page.contains("Please enter a city name"));
    }

    #[tokio::test]
    async fn non_form_body_counts_as_empty() {
        let h = Harness::new(Some(StubProvider::Sunny));
        let request = Request::post("/add_city")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"city":"London"}"#))
            .unwrap();

        let page = h.follow(h.send(request).await).await;

        assert!(page.contains("Please enter a city name"));
        assert!(h.records().is_empty());
    }

    #[tokio::test]
    async fn add_long_city_name() {
        let h = Harness::new(Some(StubProvider::Sunny));

        let page = h.follow(h.post_city(&"a".repeat(100)).await).await;

        assert!(page.contains("City name too long"));
        assert!(h.records().is_empty());
    }

    #[tokio::test]
    async fn add_city_without_api_key() {
        let h = Harness::new(None);

        let page = h.follow(h.post_city("London").await).await;

        assert!(page.contains("API not configured"));
        assert!(h.records().is_empty());
    }

    #[tokio::test]
    async fn add_city_stores_observation() {
        let h = Harness::new(Some(StubProvider::Sunny));

        let page = h.follow(h.post_city("Test City").await).await;

        assert!(page.contains("Weather data for Test City added successfully!"));
        let records = h.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].city, "Test City");
        assert_eq!(records[0].temperature, 20.5);
        assert_eq!(records[0].humidity, 65);
        assert_eq!(records[0].description, "sunny");
    }

    #[tokio::test]
    async fn fetch_failure_stores_nothing() {
        let h = Harness::new(Some(StubProvider::CityNotFound));

        let page = h.follow(h.post_city("Atlantis").await).await;

        assert!(page.contains("Could not fetch weather data for Atlantis"));
        assert!(h.records().is_empty());
    }

    #[tokio::test]
    async fn save_failure_is_reported() {
        // No table: the insert fails after a successful fetch.
        let store = RecordStore::open_in_memory().unwrap();
        let h = Harness::with_store(Some(StubProvider::Sunny), store);

        let page = h.follow(h.post_city("London").await).await;

        assert!(page.contains("Could not save weather data for London."));
    }

    #[tokio::test]
    async fn notice_is_cleared_once_shown() {
        let h = Harness::new(None);
        let redirect = h.post_city("").await;
        let cookie = notice_cookie(&redirect).unwrap();

        let home = h
            .send(Request::get("/").header(header::COOKIE, cookie).body(Body::empty()).unwrap())
            .await;

        let removal = notice_cookie(&home).expect("home should expire the notice");
        assert_eq!(removal, "notice=");
        let set_cookie = home.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(set_cookie.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn weather_lists_newest_first() {
        let h = Harness::new(Some(StubProvider::Sunny));
        h.post_city("Older").await;
        h.post_city("Newer").await;

        let page = body_text(h.get("/weather").await).await;

        let newer = page.find("Newer").unwrap();
        let older = page.find("Older").unwrap();
        assert!(newer < older);
    }

    #[tokio::test]
    async fn weather_store_error_redirects_home() {
        let store = RecordStore::open_in_memory().unwrap();
        let h = Harness::with_store(None, store);

        let page = h.follow(h.get("/weather").await).await;

        assert!(page.contains("Error retrieving weather data"));
    }

    #[tokio::test]
    async fn plot_without_data_redirects() {
        let h = Harness::new(None);

        let page = h.follow(h.get("/plot").await).await;

        assert!(page.contains("No weather data available for plotting"));
        assert!(!h.dir.path().join("static").join("plot.png").exists());
    }

    #[tokio::test]
    async fn plot_returns_png() {
        let h = Harness::new(Some(StubProvider::Sunny));
        h.post_city("London").await;
        h.post_city("Paris").await;

        let res = h.get("/plot").await;

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[header::CONTENT_TYPE], "image/png");
        let png = res.into_body().collect().await.unwrap().to_bytes();
        assert!(png.starts_with(&[0x89, b'P', b'N', b'G']));
        assert_eq!(std::fs::read(h.state.config.plot_path()).unwrap(), png.to_vec());
    }

    #[tokio::test]
    async fn plot_render_error_redirects() {
        // The static directory would have to be created below a regular file.
        let h = Harness::with_static_dir(Some(StubProvider::Sunny), |dir| {
            dir.join("blocker").join("static")
        });
        std::fs::write(h.dir.path().join("blocker"), b"not a directory").unwrap();
        h.post_city("London").await;

        let page = h.follow(h.get("/plot").await).await;

        assert!(page.contains("Error generating temperature plot"));
    }
}
