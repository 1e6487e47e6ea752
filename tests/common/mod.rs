//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use serde_json::{Value, json};

use gardu_monitor::measure::Month;
use gardu_monitor::ops::registry;
use gardu_monitor::store::Store;
use gardu_monitor::substation::SubstationFields;

/// Month used by every fixture.
pub const MONTH: &str = "2024-05";

pub fn month() -> Month {
    Month::parse(MONTH).unwrap()
}

/// Minimal substation with a gardu number and rated power.
pub fn substation(no_gardu: &str, daya: &str) -> SubstationFields {
    SubstationFields {
        no_gardu: no_gardu.into(),
        daya: daya.into(),
        ulp: "ULP KOTA".into(),
        nama_lokasi: format!("Lokasi {no_gardu}"),
        ..SubstationFields::default()
    }
}

/// Store with KB-001 (100 kVA, id 1) and KB-002 (200 kVA, id 2), both with
/// placeholder rows for [`MONTH`].
pub fn seeded_store() -> Store {
    let store = Store::open_in_memory().unwrap();
    seed(&store);
    store
}

pub fn seed(store: &Store) {
    let month = month();
    store
        .write(|c| {
            registry::create(c, &substation("KB-001", "100"), &month, "t0")?;
            registry::create(c, &substation("KB-002", "200 kVA"), &month, "t0")?;
            Ok(())
        })
        .unwrap();
}

/// One bulk-write row for [`MONTH`] with equal phase currents.
pub fn reading(substation_id: i64, row_name: &str, current: f64, pp: f64) -> Value {
    json!({
        "substationId": substation_id,
        "row_name": row_name,
        "month": MONTH,
        "r": current,
        "s": current,
        "t": current,
        "pp": pp,
    })
}

#[cfg(feature = "api")]
pub mod api {
    use std::sync::Arc;

    use axum::Router;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, Response, StatusCode};
    use serde_json::Value;
    use tower::util::ServiceExt;

    use gardu_monitor::api::{AppState, router};
    use gardu_monitor::config::AppConfig;
    use gardu_monitor::store::Store;

    pub fn app_with(store: Store, config: AppConfig) -> Router {
        router(Arc::new(AppState::new(store, config)))
    }

    pub fn app() -> Router {
        app_with(super::seeded_store(), AppConfig::default())
    }

    pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    pub fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
    }

    /// Sends `req` and returns the status and the body parsed as JSON
    /// (`Value::Null` for empty bodies).
    pub async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = body_bytes(response).await;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }
}
