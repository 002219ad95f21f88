//! Sign-off signature persistence
//!
//! One signature per inspection (UNIQUE on inspection_id); both the lifecycle
//! and sync paths write through the same upsert.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;
use vistoria_common::Result;

use super::parse_uuid;

/// Default role label for the signer when the client does not send one
pub const DEFAULT_SIGNER_ROLE_LABEL: &str = "Lider/Encarregado";

/// Sign-off signature captured at the end of a field visit
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Signature {
    pub id: Uuid,
    pub inspection_id: Uuid,
    pub signer_name: String,
    pub signer_role_label: String,
    pub image_path: Option<String>,
    pub cloudinary_public_id: Option<String>,
    pub url: Option<String>,
    pub signed_at: DateTime<Utc>,
}

/// Upsert payload for a signature
#[derive(Debug, Clone)]
pub struct NewSignature {
    pub inspection_id: Uuid,
    pub signer_name: String,
    pub signer_role_label: String,
    pub cloudinary_public_id: Option<String>,
    pub url: Option<String>,
    pub signed_at: DateTime<Utc>,
}

/// Load the signature of an inspection, if any
pub async fn fetch_for_inspection(
    conn: &mut SqliteConnection,
    inspection_id: Uuid,
) -> Result<Option<Signature>> {
    let row = sqlx::query(
        r#"
        SELECT guid, inspection_id, signer_name, signer_role_label, image_path,
               cloudinary_public_id, url, signed_at
        FROM signatures
        WHERE inspection_id = ?
        "#,
    )
    .bind(inspection_id.to_string())
    .fetch_optional(conn)
    .await?;

    match row {
        Some(row) => {
            let guid: String = row.get("guid");
            let inspection_id: String = row.get("inspection_id");
            Ok(Some(Signature {
                id: parse_uuid(&guid)?,
                inspection_id: parse_uuid(&inspection_id)?,
                signer_name: row.get("signer_name"),
                signer_role_label: row.get("signer_role_label"),
                image_path: row.get("image_path"),
                cloudinary_public_id: row.get("cloudinary_public_id"),
                url: row.get("url"),
                signed_at: row.get("signed_at"),
            }))
        }
        None => Ok(None),
    }
}

/// Create or overwrite the signature of an inspection.
///
/// When the incoming reference carries no URL/public id, the existing values
/// are retained rather than nulled (offline clients may resend metadata only).
pub async fn upsert(conn: &mut SqliteConnection, new: &NewSignature) -> Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO signatures (
            guid, inspection_id, signer_name, signer_role_label,
            cloudinary_public_id, url, signed_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(inspection_id) DO UPDATE SET
            signer_name = excluded.signer_name,
            signer_role_label = excluded.signer_role_label,
            cloudinary_public_id = COALESCE(excluded.cloudinary_public_id, cloudinary_public_id),
            url = COALESCE(excluded.url, url),
            signed_at = excluded.signed_at
        "#,
    )
    .bind(id.to_string())
    .bind(new.inspection_id.to_string())
    .bind(&new.signer_name)
    .bind(&new.signer_role_label)
    .bind(&new.cloudinary_public_id)
    .bind(&new.url)
    .bind(new.signed_at)
    .execute(conn)
    .await?;

    Ok(id)
}
