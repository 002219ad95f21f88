//! Evidence gateway: external image hosting for photos and signatures
//!
//! The core never stores binary assets itself. Uploads go to a
//! Cloudinary-compatible HTTP API which returns a durable URL plus an asset
//! id; only those references are persisted. Gateway failures are surfaced as
//! upstream-dependency errors and never swallowed.

use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use vistoria_common::config::GatewayConfig;
use vistoria_common::{Error, Result};

/// Durable asset reference returned by a successful upload
#[derive(Debug, Clone)]
pub struct UploadedAsset {
    pub public_id: String,
    pub url: String,
    pub bytes: i64,
    pub format: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
}

/// Narrow interface the core consumes for binary assets
#[async_trait]
pub trait EvidenceGateway: Send + Sync {
    /// Upload an image buffer into `folder`, returning its durable reference
    async fn upload(&self, buffer: Vec<u8>, folder: &str) -> Result<UploadedAsset>;

    /// Delete a previously uploaded asset
    async fn delete(&self, public_id: &str) -> Result<()>;
}

/// Cloudinary-backed gateway using signed uploads.
///
/// Credentials come from `CLOUDINARY_URL`; when unset, every call fails with
/// an upstream error while the rest of the service keeps working.
pub struct CloudinaryGateway {
    config: Option<GatewayConfig>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct CloudinaryUploadResponse {
    public_id: String,
    secure_url: String,
    bytes: i64,
    format: Option<String>,
    width: Option<i64>,
    height: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct CloudinaryDestroyResponse {
    result: String,
}

impl CloudinaryGateway {
    pub fn new(config: Option<GatewayConfig>) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn config(&self) -> Result<&GatewayConfig> {
        self.config
            .as_ref()
            .ok_or_else(|| Error::Upstream("CLOUDINARY_URL is not configured".to_string()))
    }

    /// SHA-256 request signature over the sorted parameter string
    fn sign(params: &str, api_secret: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(params.as_bytes());
        hasher.update(api_secret.as_bytes());
        hex_encode(&hasher.finalize())
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[async_trait]
impl EvidenceGateway for CloudinaryGateway {
    async fn upload(&self, buffer: Vec<u8>, folder: &str) -> Result<UploadedAsset> {
        let config = self.config()?;
        let timestamp = chrono::Utc::now().timestamp();

        // Signature covers the sorted non-file parameters
        let to_sign = format!("folder={}&timestamp={}", folder, timestamp);
        let signature = Self::sign(&to_sign, &config.api_secret);

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(buffer).file_name("evidence"),
            )
            .text("api_key", config.api_key.clone())
            .text("timestamp", timestamp.to_string())
            .text("folder", folder.to_string())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        let url = format!(
            "https://api.cloudinary.com/v1_1/{}/image/upload",
            config.cloud_name
        );

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("evidence gateway upload failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upstream(format!(
                "evidence gateway upload failed: HTTP {status}: {body}"
            )));
        }

        let parsed: CloudinaryUploadResponse = response
            .json()
            .await
            .map_err(|e| Error::Upstream(format!("evidence gateway returned bad payload: {e}")))?;

        Ok(UploadedAsset {
            public_id: parsed.public_id,
            url: parsed.secure_url,
            bytes: parsed.bytes,
            format: parsed.format,
            width: parsed.width,
            height: parsed.height,
        })
    }

    async fn delete(&self, public_id: &str) -> Result<()> {
        let config = self.config()?;
        let timestamp = chrono::Utc::now().timestamp();

        let to_sign = format!("public_id={}&timestamp={}", public_id, timestamp);
        let signature = Self::sign(&to_sign, &config.api_secret);

        let url = format!(
            "https://api.cloudinary.com/v1_1/{}/image/destroy",
            config.cloud_name
        );

        let response = self
            .client
            .post(&url)
            .form(&[
                ("public_id", public_id),
                ("api_key", config.api_key.as_str()),
                ("timestamp", &timestamp.to_string()),
                ("signature", &signature),
                ("signature_algorithm", "sha256"),
            ])
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("evidence gateway delete failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(Error::Upstream(format!(
                "evidence gateway delete failed: HTTP {status}"
            )));
        }

        let parsed: CloudinaryDestroyResponse = response
            .json()
            .await
            .map_err(|e| Error::Upstream(format!("evidence gateway returned bad payload: {e}")))?;

        if parsed.result != "ok" && parsed.result != "not found" {
            return Err(Error::Upstream(format!(
                "evidence gateway delete rejected: {}",
                parsed.result
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_deterministic_hex() {
        let sig = CloudinaryGateway::sign("folder=vistoria&timestamp=1700000000", "secret");
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(
            sig,
            CloudinaryGateway::sign("folder=vistoria&timestamp=1700000000", "secret")
        );
    }

    #[tokio::test]
    async fn unconfigured_gateway_fails_upstream() {
        let gateway = CloudinaryGateway::new(None);
        let err = gateway.upload(vec![1, 2, 3], "vistoria").await.unwrap_err();
        assert!(matches!(err, Error::Upstream(_)));
    }
}
