//! Shared test utilities: in-memory database, seeded reference data, a mock
//! evidence gateway and request helpers for exercising the router.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tower::ServiceExt;
use uuid::Uuid;
use vistoria_api::services::gateway::{EvidenceGateway, UploadedAsset};
use vistoria_api::AppState;
use vistoria_common::{Error, Result};

/// Gateway stub that never leaves the process. Counts uploads and hands back
/// deterministic asset references.
pub struct MockGateway {
    uploads: AtomicUsize,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            uploads: AtomicUsize::new(0),
        }
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EvidenceGateway for MockGateway {
    async fn upload(&self, buffer: Vec<u8>, folder: &str) -> Result<UploadedAsset> {
        if buffer.is_empty() {
            return Err(Error::Upstream("empty upload".to_string()));
        }
        let n = self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(UploadedAsset {
            public_id: format!("{}/mock-{}", folder, n),
            url: format!("https://mock.gateway.test/{}/mock-{}.jpg", folder, n),
            bytes: buffer.len() as i64,
            format: Some("jpg".to_string()),
            width: Some(640),
            height: Some(480),
        })
    }

    async fn delete(&self, _public_id: &str) -> Result<()> {
        Ok(())
    }
}

/// Ids of the seeded reference data every test can lean on
pub struct Seed {
    pub fiscal_id: Uuid,
    pub gestor_id: Uuid,
    pub admin_id: Uuid,
    pub team_id: Uuid,
    pub collaborator_id: Uuid,
    pub checklist_id: Uuid,
    /// Four active checklist items in sort order; only the second requires a
    /// photo on non-conformity
    pub item_ids: Vec<Uuid>,
}

/// In-memory application state with seeded users, team, collaborator and a
/// four-item checklist
pub async fn test_state() -> (AppState, Arc<MockGateway>, Seed) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    vistoria_common::db::init_schema(&pool).await.unwrap();

    let seed = seed_reference_data(&pool).await;

    let gateway = Arc::new(MockGateway::new());
    let state = AppState::new(pool, gateway.clone());
    (state, gateway, seed)
}

async fn seed_reference_data(pool: &SqlitePool) -> Seed {
    let fiscal_id = Uuid::new_v4();
    let gestor_id = Uuid::new_v4();
    let admin_id = Uuid::new_v4();
    for (id, name, email, role) in [
        (fiscal_id, "Fiscal de Campo", "fiscal@example.com", "FISCAL"),
        (gestor_id, "Gestora de Obras", "gestor@example.com", "GESTOR"),
        (admin_id, "Administrador", "admin@example.com", "ADMIN"),
    ] {
        sqlx::query("INSERT INTO users (guid, name, email, role) VALUES (?, ?, ?, ?)")
            .bind(id.to_string())
            .bind(name)
            .bind(email)
            .bind(role)
            .execute(pool)
            .await
            .unwrap();
    }

    let team_id = Uuid::new_v4();
    sqlx::query("INSERT INTO teams (guid, name) VALUES (?, ?)")
        .bind(team_id.to_string())
        .bind("Equipe Norte")
        .execute(pool)
        .await
        .unwrap();

    let collaborator_id = Uuid::new_v4();
    sqlx::query("INSERT INTO collaborators (guid, name) VALUES (?, ?)")
        .bind(collaborator_id.to_string())
        .bind("João da Silva")
        .execute(pool)
        .await
        .unwrap();

    let checklist_id = Uuid::new_v4();
    sqlx::query("INSERT INTO checklists (guid, module, name) VALUES (?, ?, ?)")
        .bind(checklist_id.to_string())
        .bind("SEGURANCA_TRABALHO")
        .bind("Checklist de Segurança")
        .execute(pool)
        .await
        .unwrap();

    let titles = [
        ("Uso de EPI", 0i64),
        ("Sinalização da área", 1),
        ("Organização do canteiro", 0),
        ("Treinamento em dia", 0),
    ];
    let mut item_ids = Vec::new();
    for (sort_order, (title, requires_photo)) in titles.iter().enumerate() {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO checklist_items \
             (guid, checklist_id, title, sort_order, requires_photo_on_non_conformity) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(checklist_id.to_string())
        .bind(title)
        .bind(sort_order as i64)
        .bind(requires_photo)
        .execute(pool)
        .await
        .unwrap();
        item_ids.push(id);
    }

    Seed {
        fiscal_id,
        gestor_id,
        admin_id,
        team_id,
        collaborator_id,
        checklist_id,
        item_ids,
    }
}

/// Send a JSON request with identity headers and parse the JSON response
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    user: Option<(Uuid, &str)>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((user_id, role)) = user {
        builder = builder
            .header("x-user-id", user_id.to_string())
            .header("x-user-role", role);
    }

    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Count rows in a table, optionally filtered by inspection
pub async fn count_rows(pool: &SqlitePool, table: &str, inspection_id: Option<Uuid>) -> i64 {
    let sql = match inspection_id {
        Some(_) => format!("SELECT COUNT(*) FROM {} WHERE inspection_id = ?", table),
        None => format!("SELECT COUNT(*) FROM {}", table),
    };
    let mut query = sqlx::query_scalar::<_, i64>(&sql);
    if let Some(id) = inspection_id {
        query = query.bind(id.to_string());
    }
    query.fetch_one(pool).await.unwrap()
}
