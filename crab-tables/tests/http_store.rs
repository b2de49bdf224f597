// crab-tables/tests/http_store.rs
// HttpTableStore against a local axum store

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use crab_tables::{
    HttpTableStore, InMemoryTableStore, ItemLine, ManualClock, TableEngine, TableError, TableKind,
    TableRecord, TableStore,
};
use rust_decimal::Decimal;
use shared::error::{ApiResponse, AppError, AppResult, ErrorCode};
use shared::models::{ReplaceItemsRequest, SessionSnapshot, SessionStarted, StartSessionRequest};
use std::sync::Arc;
use std::time::Duration;

const T0: i64 = 1_700_000_000_000;
const TOKEN: &str = "test-token";

async fn list_tables(
    State(store): State<InMemoryTableStore>,
    headers: HeaderMap,
) -> AppResult<ApiResponse<Vec<TableRecord>>> {
    let expected = format!("Bearer {TOKEN}");
    if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some(expected.as_str()) {
        return Err(AppError::new(ErrorCode::NotAuthenticated));
    }
    Ok(ApiResponse::success(store.fetch_all().await?))
}

async fn start_session(
    State(store): State<InMemoryTableStore>,
    Path(label): Path<String>,
    Json(req): Json<StartSessionRequest>,
) -> AppResult<ApiResponse<SessionStarted>> {
    let started = store
        .start_session(&label, &req.server_id, &req.server_name)
        .await?;
    Ok(ApiResponse::success(started))
}

async fn stop_session(
    State(store): State<InMemoryTableStore>,
    Path(label): Path<String>,
) -> AppResult<ApiResponse<SessionSnapshot>> {
    Ok(ApiResponse::success(store.stop_session(&label).await?))
}

async fn fetch_items(
    State(store): State<InMemoryTableStore>,
    Path(label): Path<String>,
) -> AppResult<ApiResponse<Vec<ItemLine>>> {
    Ok(ApiResponse::success(store.fetch_items(&label).await?))
}

async fn replace_items(
    State(store): State<InMemoryTableStore>,
    Path(label): Path<String>,
    Json(req): Json<ReplaceItemsRequest>,
) -> AppResult<ApiResponse<()>> {
    store.replace_items(&label, &req.items).await?;
    Ok(ApiResponse::ok())
}

async fn force_free(
    State(store): State<InMemoryTableStore>,
    Path(label): Path<String>,
) -> AppResult<ApiResponse<()>> {
    store.force_free(&label).await?;
    Ok(ApiResponse::ok())
}

async fn rate_per_minute(
    State(store): State<InMemoryTableStore>,
) -> AppResult<ApiResponse<Decimal>> {
    Ok(ApiResponse::success(store.rate_per_minute().await?))
}

fn router(store: InMemoryTableStore) -> Router {
    Router::new()
        .route("/api/tables", get(list_tables))
        .route("/api/tables/{label}/session", post(start_session))
        .route("/api/tables/{label}/session/stop", post(stop_session))
        .route("/api/tables/{label}/items", get(fetch_items).put(replace_items))
        .route("/api/tables/{label}/force-free", post(force_free))
        .route("/api/settings/rate-per-minute", get(rate_per_minute))
        .with_state(store)
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

struct Fixture {
    backend: InMemoryTableStore,
    clock: ManualClock,
    client: HttpTableStore,
}

async fn fixture() -> Fixture {
    let clock = ManualClock::new(T0);
    let backend = InMemoryTableStore::with_clock(Decimal::new(50, 2), Arc::new(clock.clone()))
        .with_table("Billiard 3", TableKind::Billiard)
        .with_table("Bar 5", TableKind::Bar);
    let url = serve(router(backend.clone())).await;
    let client = HttpTableStore::new(&url, Duration::from_secs(5))
        .unwrap()
        .with_token(TOKEN);
    Fixture {
        backend,
        clock,
        client,
    }
}

#[tokio::test]
async fn test_fetch_all_and_rate() {
    let f = fixture().await;
    let tables = f.client.fetch_all().await.unwrap();
    assert_eq!(tables.len(), 2);
    assert_eq!(tables[0].label, "Billiard 3");
    assert_eq!(tables[1].kind, TableKind::Bar);
    assert_eq!(f.client.rate_per_minute().await.unwrap(), Decimal::new(50, 2));
}

#[tokio::test]
async fn test_missing_token_is_rejected() {
    let f = fixture().await;
    let anonymous = HttpTableStore::new(f.client.base_url().as_str(), Duration::from_secs(5)).unwrap();
    let err = anonymous.fetch_all().await.unwrap_err();
    // 401 envelope decodes to the auth code, not a transport failure
    match err {
        TableError::Unavailable(msg) => assert!(msg.starts_with("[1001]"), "got {msg}"),
        other => panic!("expected Unavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn test_session_round_trip_over_http() {
    let f = fixture().await;
    let started = f
        .client
        .start_session("Billiard 3", "srv1", "Alice")
        .await
        .unwrap();
    assert_eq!(started.start_time, T0);

    let lines = vec![
        ItemLine::new(1, "Coffee", 2, Decimal::new(350, 2)),
        ItemLine::new(2, "Water", 1, Decimal::ZERO),
    ];
    f.client.replace_items("Billiard 3", &lines).await.unwrap();
    assert_eq!(f.client.fetch_items("Billiard 3").await.unwrap(), lines);

    let snapshot = f.client.stop_session("Billiard 3").await.unwrap();
    assert_eq!(snapshot.session_id, started.session_id);
    assert_eq!(snapshot.items, lines);
    assert!(!f.backend.record("Billiard 3").unwrap().occupied);
}

#[tokio::test]
async fn test_error_codes_map_to_variants() {
    let f = fixture().await;
    f.client.start_session("Bar 5", "srv1", "Alice").await.unwrap();

    assert_eq!(
        f.client.start_session("Bar 5", "srv2", "Bob").await.unwrap_err(),
        TableError::AlreadyOccupied("Bar 5".into())
    );
    assert_eq!(
        f.client.stop_session("Billiard 3").await.unwrap_err(),
        TableError::NoActiveSession("Billiard 3".into())
    );
    assert_eq!(
        f.client.fetch_items("Pool 9").await.unwrap_err(),
        TableError::NotFound("Pool 9".into())
    );

    f.backend.set_available(false);
    assert!(matches!(
        f.client.rate_per_minute().await,
        Err(TableError::Unavailable(_))
    ));
}

#[tokio::test]
async fn test_unreachable_store_is_unavailable() {
    // Bind then drop to get a port nobody listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = HttpTableStore::new(&format!("http://{addr}"), Duration::from_secs(1)).unwrap();
    assert!(matches!(
        client.fetch_all().await,
        Err(TableError::Unavailable(_))
    ));
}

#[tokio::test]
async fn test_non_envelope_body_is_unavailable() {
    let app = Router::new().route("/api/tables", get(|| async { "upstream gone" }));
    let url = serve(app).await;
    let client = HttpTableStore::new(&url, Duration::from_secs(5)).unwrap();
    assert!(matches!(
        client.fetch_all().await,
        Err(TableError::Unavailable(_))
    ));
}

#[tokio::test]
async fn test_engine_over_http() {
    let f = fixture().await;
    let engine = TableEngine::builder(Arc::new(f.client.clone()))
        .clock(Arc::new(f.clock.clone()))
        .live_mode(false)
        .start();
    engine.refresh().await.unwrap();

    engine
        .start_session("Billiard 3", "srv1", "Alice")
        .await
        .unwrap();
    engine
        .replace_items(
            "Billiard 3",
            vec![ItemLine::new(1, "Coffee", 2, Decimal::new(350, 2))],
        )
        .await
        .unwrap();
    f.clock.advance_minutes(17);

    let bill = engine.stop_session("Billiard 3").await.unwrap();
    assert_eq!(bill.total_time_minutes, 17);
    assert_eq!(bill.total_amount, Decimal::new(1550, 2));

    // Orphan on the backend, recovered through HTTP
    f.backend.orphan("Bar 5").unwrap();
    engine.refresh().await.unwrap();
    assert!(engine.stop_session("Bar 5").await.unwrap_err().offers_recovery());
    let offer = engine.pending_recovery("Bar 5").unwrap();
    engine.force_free(offer.confirm()).await.unwrap();
    assert!(!f.backend.record("Bar 5").unwrap().occupied);

    engine.shutdown().await;
}
