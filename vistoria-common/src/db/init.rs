//! Database initialization
//!
//! Creates the SQLite database and full schema on first run. All table
//! creation is idempotent (`CREATE TABLE IF NOT EXISTS`), so startup is safe
//! against existing databases.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection pool and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    init_schema(&pool).await?;

    Ok(pool)
}

/// Create the full schema on an existing pool.
///
/// Exposed separately so integration tests can run against in-memory
/// databases.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    // Foreign keys are off by default in SQLite
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    // WAL allows concurrent readers while the sync path writes
    sqlx::query("PRAGMA journal_mode = WAL").execute(pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(pool).await?;

    create_users_table(pool).await?;
    create_teams_table(pool).await?;
    create_collaborators_table(pool).await?;
    create_team_collaborators_table(pool).await?;
    create_checklists_table(pool).await?;
    create_checklist_sections_table(pool).await?;
    create_checklist_items_table(pool).await?;
    create_inspections_table(pool).await?;
    create_inspection_collaborators_table(pool).await?;
    create_inspection_items_table(pool).await?;
    create_evidences_table(pool).await?;
    create_signatures_table(pool).await?;
    create_pending_adjustments_table(pool).await?;

    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            role TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_teams_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS teams (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_collaborators_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS collaborators (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_team_collaborators_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS team_collaborators (
            team_id TEXT NOT NULL REFERENCES teams(guid),
            collaborator_id TEXT NOT NULL REFERENCES collaborators(guid),
            PRIMARY KEY (team_id, collaborator_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_checklists_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS checklists (
            guid TEXT PRIMARY KEY,
            module TEXT NOT NULL,
            name TEXT NOT NULL,
            description TEXT,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_checklist_sections_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS checklist_sections (
            guid TEXT PRIMARY KEY,
            checklist_id TEXT NOT NULL REFERENCES checklists(guid) ON DELETE CASCADE,
            name TEXT NOT NULL,
            sort_order INTEGER NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_checklist_sections_checklist \
         ON checklist_sections(checklist_id, sort_order)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_checklist_items_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS checklist_items (
            guid TEXT PRIMARY KEY,
            checklist_id TEXT NOT NULL REFERENCES checklists(guid),
            section_id TEXT REFERENCES checklist_sections(guid),
            title TEXT NOT NULL,
            description TEXT,
            sort_order INTEGER NOT NULL,
            requires_photo_on_non_conformity INTEGER NOT NULL DEFAULT 1,
            active INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_checklist_items_checklist \
         ON checklist_items(checklist_id, sort_order)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_inspections_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS inspections (
            guid TEXT PRIMARY KEY,
            external_id TEXT,
            module TEXT NOT NULL,
            checklist_id TEXT NOT NULL REFERENCES checklists(guid),
            team_id TEXT NOT NULL REFERENCES teams(guid),
            service_description TEXT NOT NULL,
            location_description TEXT,
            status TEXT NOT NULL DEFAULT 'RASCUNHO',
            score_percent REAL,
            created_by_user_id TEXT NOT NULL REFERENCES users(guid),
            finalized_at TIMESTAMP,
            created_offline INTEGER NOT NULL DEFAULT 0,
            synced_at TIMESTAMP,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Sync idempotency key: unique among non-null values only
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_inspections_external_id \
         ON inspections(external_id) WHERE external_id IS NOT NULL",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_inspections_module ON inspections(module)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_inspections_status ON inspections(status)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_inspections_team ON inspections(team_id)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_inspections_created_by ON inspections(created_by_user_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_inspection_collaborators_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS inspection_collaborators (
            inspection_id TEXT NOT NULL REFERENCES inspections(guid),
            collaborator_id TEXT NOT NULL REFERENCES collaborators(guid),
            PRIMARY KEY (inspection_id, collaborator_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_inspection_items_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS inspection_items (
            guid TEXT PRIMARY KEY,
            inspection_id TEXT NOT NULL REFERENCES inspections(guid),
            checklist_item_id TEXT NOT NULL REFERENCES checklist_items(guid),
            answer TEXT,
            notes TEXT,
            resolved_at TIMESTAMP,
            resolved_by_user_id TEXT REFERENCES users(guid),
            resolution_notes TEXT,
            resolution_evidence_path TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (inspection_id, checklist_item_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_inspection_items_inspection \
         ON inspection_items(inspection_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_evidences_table(pool: &SqlitePool) -> Result<()> {
    // file_path/file_name/mime_type/size are legacy local-storage columns,
    // kept readable for the sync dedupe matcher but no longer written
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS evidences (
            guid TEXT PRIMARY KEY,
            inspection_id TEXT NOT NULL REFERENCES inspections(guid),
            inspection_item_id TEXT REFERENCES inspection_items(guid),
            file_path TEXT,
            file_name TEXT,
            mime_type TEXT,
            size INTEGER,
            cloudinary_public_id TEXT,
            url TEXT,
            bytes INTEGER,
            format TEXT,
            width INTEGER,
            height INTEGER,
            uploaded_by_user_id TEXT NOT NULL REFERENCES users(guid),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_evidences_inspection ON evidences(inspection_id)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_evidences_item ON evidences(inspection_item_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_signatures_table(pool: &SqlitePool) -> Result<()> {
    // One signature per inspection, enforced here; both the lifecycle and
    // sync paths upsert against this constraint
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS signatures (
            guid TEXT PRIMARY KEY,
            inspection_id TEXT NOT NULL UNIQUE REFERENCES inspections(guid),
            signer_name TEXT NOT NULL,
            signer_role_label TEXT NOT NULL DEFAULT 'Lider/Encarregado',
            image_path TEXT,
            cloudinary_public_id TEXT,
            url TEXT,
            signed_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_pending_adjustments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pending_adjustments (
            guid TEXT PRIMARY KEY,
            inspection_id TEXT NOT NULL UNIQUE REFERENCES inspections(guid),
            status TEXT NOT NULL DEFAULT 'PENDENTE',
            resolved_at TIMESTAMP,
            resolved_by_user_id TEXT REFERENCES users(guid),
            resolution_notes TEXT,
            resolution_evidence_path TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
