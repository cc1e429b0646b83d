use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get};
use axum::{Json, Router};
use mercato_store::domain::{LineItem, OrderStatus, PurchaseOrder, PurchaseOrderData};
use mercato_store::engine::ErrorKind;
use mercato_store::sdk::{GatewayConfig, HttpGateway};
use mercato_store::{EntityStore, MemoryNotifier, NotificationLevel};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

const TOKEN: &str = "secret";

#[derive(Default)]
struct FakeApi {
    rows: Vec<Value>,
    next_id: u64,
}

type Shared = Arc<Mutex<FakeApi>>;
type Reply = (StatusCode, Json<Value>);

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", TOKEN))
        .unwrap_or(false)
}

fn unauthorized() -> Reply {
    (StatusCode::UNAUTHORIZED, Json(json!({ "message": "missing token" })))
}

fn not_found(id: u64) -> Reply {
    (StatusCode::NOT_FOUND, Json(json!({ "message": format!("order {} not found", id) })))
}

async fn list(State(api): State<Shared>, headers: HeaderMap) -> Reply {
    if !authorized(&headers) {
        return unauthorized();
    }
    let api = api.lock().unwrap();
    (StatusCode::OK, Json(Value::Array(api.rows.clone())))
}

async fn create(State(api): State<Shared>, headers: HeaderMap, Json(mut body): Json<Value>) -> Reply {
    if !authorized(&headers) {
        return unauthorized();
    }
    if body["supplierId"].as_u64().unwrap_or(0) == 0 {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "message": "invalid purchase order",
                "errors": { "supplierId": ["must reference a supplier"] }
            })),
        );
    }
    let mut api = api.lock().unwrap();
    api.next_id += 1;
    let id = api.next_id;
    body["id"] = json!(id);
    body["orderNumber"] = json!(format!("PO-{:04}", id));
    api.rows.push(body.clone());
    (StatusCode::CREATED, Json(body))
}

async fn fetch(State(api): State<Shared>, headers: HeaderMap, Path(id): Path<u64>) -> Reply {
    if !authorized(&headers) {
        return unauthorized();
    }
    let api = api.lock().unwrap();
    match api.rows.iter().find(|r| r["id"] == json!(id)) {
        Some(row) => (StatusCode::OK, Json(row.clone())),
        None => not_found(id),
    }
}

/// Answers with only the fields it was sent plus the id and order number.
async fn update(
    State(api): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(body): Json<Value>,
) -> Reply {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut api = api.lock().unwrap();
    let Some(row) = api.rows.iter_mut().find(|r| r["id"] == json!(id)) else {
        return not_found(id);
    };
    let mut reply = json!({ "id": id, "orderNumber": row["orderNumber"].clone() });
    for (key, value) in body.as_object().cloned().unwrap_or_default() {
        row[key.as_str()] = value.clone();
        reply[key.as_str()] = value;
    }
    (StatusCode::OK, Json(reply))
}

async fn remove(State(api): State<Shared>, headers: HeaderMap, Path(id): Path<u64>) -> Reply {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut api = api.lock().unwrap();
    let before = api.rows.len();
    api.rows.retain(|r| r["id"] != json!(id));
    if api.rows.len() == before {
        return not_found(id);
    }
    (StatusCode::OK, Json(Value::Null))
}

async fn remove_many(State(api): State<Shared>, headers: HeaderMap, Json(ids): Json<Vec<u64>>) -> Reply {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut api = api.lock().unwrap();
    api.rows
        .retain(|r| !ids.iter().any(|id| r["id"] == json!(id)));
    (StatusCode::OK, Json(Value::Null))
}

async fn spawn_api(seed: Vec<Value>) -> (String, Shared) {
    let next_id = seed.len() as u64;
    let api: Shared = Arc::new(Mutex::new(FakeApi { rows: seed, next_id }));

    let app = Router::new()
        .route("/purchase-orders", get(list).post(create))
        .route("/purchase-orders/delete-many", delete(remove_many))
        .route("/purchase-orders/:id", get(fetch).put(update).delete(remove))
        .with_state(api.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/", addr), api)
}

fn seed_rows() -> Vec<Value> {
    vec![
        json!({ "id": 1, "orderNumber": "PO-0001", "supplierId": 3, "status": "DRAFT", "notes": "fragile" }),
        json!({ "id": 2, "orderNumber": "PO-0002", "supplierId": 3, "status": "PENDING" }),
    ]
}

fn store_for(
    base_url: &str,
    token: Option<&str>,
) -> (Arc<EntityStore<PurchaseOrder>>, Arc<MemoryNotifier>) {
    let mut config = GatewayConfig::new(base_url);
    if let Some(token) = token {
        config = config.with_token(token);
    }
    let gateway = Arc::new(HttpGateway::<PurchaseOrder>::new(&config).unwrap());
    let notifier = Arc::new(MemoryNotifier::new());
    let store = Arc::new(EntityStore::<PurchaseOrder>::new(gateway, notifier.clone()));
    (store, notifier)
}

#[tokio::test]
async fn test_http_store_lifecycle() {
    let (url, api) = spawn_api(seed_rows()).await;
    let (store, notifier) = store_for(&url, Some(TOKEN));

    store.init().await;
    assert_eq!(store.ids(), vec![1, 2]);
    assert!(store.error().is_none());

    store
        .create(PurchaseOrderData {
            supplier_id: 8,
            status: OrderStatus::Draft,
            items: Some(vec![LineItem {
                product_id: 5,
                quantity: 3,
                unit_price: 2.0,
            }]),
            notes: None,
        })
        .await;
    assert_eq!(store.ids(), vec![1, 2, 3]);
    let created = store.get(&3).unwrap();
    assert_eq!(created.order_number.as_deref(), Some("PO-0003"));
    assert_eq!(created.amount(), 6.0);

    store
        .update(
            1,
            PurchaseOrderData {
                supplier_id: 3,
                status: OrderStatus::Shipped,
                items: None,
                notes: None,
            },
        )
        .await;
    let shipped = store.get(&1).unwrap();
    assert_eq!(shipped.status, OrderStatus::Shipped);
    assert_eq!(shipped.notes.as_deref(), Some("fragile"));

    store.find_one(2).await;
    assert_eq!(store.count(), 3);

    store.set_selection([1, 2, 3]);
    store.delete(2).await;
    assert_eq!(store.selected_ids(), vec![1, 3]);

    store.delete_selected().await;
    assert_eq!(store.count(), 0);
    assert!(store.selected_ids().is_empty());
    assert!(api.lock().unwrap().rows.is_empty());

    assert!(notifier
        .levels()
        .iter()
        .all(|l| *l == NotificationLevel::Success));
    assert_eq!(notifier.sent().len(), 4);

    // Reloading an unchanged dataset gives the same collection.
    store.find_all().await;
    let first = store.items();
    store.find_all().await;
    assert_eq!(store.items(), first);
}

#[tokio::test]
async fn test_validation_error_surfaces_fields() {
    let (url, _api) = spawn_api(seed_rows()).await;
    let (store, notifier) = store_for(&url, Some(TOKEN));
    store.init().await;

    store
        .create(PurchaseOrderData {
            supplier_id: 0,
            status: OrderStatus::Draft,
            items: None,
            notes: None,
        })
        .await;

    assert_eq!(store.count(), 2);
    let err = store.error().unwrap();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert_eq!(err.message, "invalid purchase order");
    assert_eq!(err.fields["supplierId"], vec!["must reference a supplier".to_string()]);
    assert_eq!(notifier.levels(), vec![NotificationLevel::Error]);
}

#[tokio::test]
async fn test_missing_token_is_a_server_error() {
    let (url, _api) = spawn_api(seed_rows()).await;
    let (store, notifier) = store_for(&url, None);

    store.init().await;

    assert_eq!(store.count(), 0);
    let err = store.error().unwrap();
    assert_eq!(err.kind, ErrorKind::Server);
    assert_eq!(err.status, Some(401));
    assert!(!store.loading());
    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn test_unreachable_api_is_a_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (store, notifier) = store_for(&format!("http://{}", addr), Some(TOKEN));
    store.delete(1).await;

    let err = store.error().unwrap();
    assert_eq!(err.kind, ErrorKind::Network);
    assert_eq!(notifier.levels(), vec![NotificationLevel::Error]);
}

#[tokio::test]
async fn test_concurrent_creates_are_all_applied() {
    let (url, api) = spawn_api(seed_rows()).await;
    let (store, _) = store_for(&url, Some(TOKEN));
    store.init().await;

    let creates = (0..3).map(|i| {
        store.create(PurchaseOrderData {
            supplier_id: 10 + i,
            status: OrderStatus::Pending,
            items: None,
            notes: None,
        })
    });
    futures::future::join_all(creates).await;

    let mut ids = store.ids();
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    assert!(!store.loading());
    assert_eq!(api.lock().unwrap().rows.len(), 5);
}
