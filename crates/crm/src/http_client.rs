//! HTTP implementation of the CRM boundary.
//!
//! Authentication is the OAuth refresh-token flow: a long-lived refresh
//! token is exchanged at the accounts endpoint for a short-lived access
//! token, cached with its expiry behind an `RwLock` and refreshed a minute
//! early. All data calls carry `Authorization: Zoho-oauthtoken <token>`.
//!
//! Search endpoints return 204 for "no matches"; that is an empty list,
//! not an error.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use crmpilot_core::crm::{CrmClient, EntityKind, Record};
use crmpilot_core::error::CrmError;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// OAuth credentials and endpoints for the remote CRM.
#[derive(Clone)]
pub struct CrmCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    /// Data API domain, e.g. `https://www.zohoapis.com`
    pub api_domain: String,
    /// Token endpoint domain, e.g. `https://accounts.zoho.com`
    pub accounts_domain: String,
}

struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// HTTP client for the remote CRM.
pub struct HttpCrmClient {
    credentials: CrmCredentials,
    client: reqwest::Client,
    token: RwLock<Option<CachedToken>>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<i64>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct DataEnvelope {
    #[serde(default)]
    data: Vec<Value>,
}

impl HttpCrmClient {
    pub fn new(credentials: CrmCredentials) -> Result<Self, CrmError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| CrmError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            credentials,
            client,
            token: RwLock::new(None),
        })
    }

    /// Get a valid access token, refreshing if missing or within a minute
    /// of expiry.
    async fn access_token(&self) -> Result<String, CrmError> {
        {
            let guard = self.token.read().await;
            if let Some(cached) = guard.as_ref() {
                if cached.expires_at > Utc::now() + Duration::seconds(60) {
                    return Ok(cached.access_token.clone());
                }
            }
        }

        let mut guard = self.token.write().await;
        // Another task may have refreshed while we waited for the lock
        if let Some(cached) = guard.as_ref() {
            if cached.expires_at > Utc::now() + Duration::seconds(60) {
                return Ok(cached.access_token.clone());
            }
        }

        debug!("Refreshing CRM access token");
        let url = format!("{}/oauth/v2/token", self.credentials.accounts_domain);
        let response = self
            .client
            .post(&url)
            .query(&[
                ("refresh_token", self.credentials.refresh_token.as_str()),
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| CrmError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| CrmError::InvalidResponse(format!("token response: {e}")))?;

        if let Some(err) = body.error {
            return Err(CrmError::AuthenticationFailed(err));
        }
        let access_token = body.access_token.ok_or_else(|| {
            CrmError::AuthenticationFailed(format!("no access token in response (status {status})"))
        })?;
        let expires_in = body.expires_in.unwrap_or(3600);

        let token = access_token.clone();
        *guard = Some(CachedToken {
            access_token,
            expires_at: Utc::now() + Duration::seconds(expires_in),
        });
        Ok(token)
    }

    fn data_url(&self, path: &str) -> String {
        format!("{}/crm/v2/{path}", self.credentials.api_domain)
    }

    /// Run a GET that returns a `{"data": [...]}` envelope. 204 means an
    /// empty result set.
    async fn get_data(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<Record>, CrmError> {
        let token = self.access_token().await?;
        let response = self
            .client
            .get(self.data_url(path))
            .header("Authorization", format!("Zoho-oauthtoken {token}"))
            .query(query)
            .send()
            .await
            .map_err(|e| CrmError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status == 204 {
            return Ok(Vec::new());
        }
        if status == 401 {
            return Err(CrmError::AuthenticationFailed("access token rejected".into()));
        }
        if status != 200 {
            let message = response.text().await.unwrap_or_default();
            warn!(status, path, "CRM request failed");
            return Err(CrmError::ApiError {
                status_code: status,
                message,
            });
        }

        let envelope: DataEnvelope = response
            .json()
            .await
            .map_err(|e| CrmError::InvalidResponse(e.to_string()))?;
        Ok(envelope
            .data
            .into_iter()
            .filter_map(|v| match v {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect())
    }

    /// Run a POST/PUT that sends a `{"data": [fields]}` envelope and
    /// returns the per-record result details.
    async fn send_data(
        &self,
        method: reqwest::Method,
        path: &str,
        fields: Record,
    ) -> Result<Value, CrmError> {
        let token = self.access_token().await?;
        let body = serde_json::json!({ "data": [Value::Object(fields)] });
        let response = self
            .client
            .request(method, self.data_url(path))
            .header("Authorization", format!("Zoho-oauthtoken {token}"))
            .json(&body)
            .send()
            .await
            .map_err(|e| CrmError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status == 401 {
            return Err(CrmError::AuthenticationFailed("access token rejected".into()));
        }
        // Record writes answer 200/201/202 with a per-record status envelope
        if status != 200 && status != 201 && status != 202 {
            let message = response.text().await.unwrap_or_default();
            warn!(status, path, "CRM write failed");
            return Err(CrmError::ApiError {
                status_code: status,
                message,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| CrmError::InvalidResponse(e.to_string()))?;
        let detail = body["data"][0].clone();
        if detail["status"] == "error" {
            return Err(CrmError::ApiError {
                status_code: status,
                message: detail["message"].as_str().unwrap_or("unknown error").to_string(),
            });
        }
        Ok(detail)
    }

    fn extract_record_id(detail: &Value) -> Result<String, CrmError> {
        detail["details"]["id"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| CrmError::InvalidResponse("no record id in write response".into()))
    }
}

#[async_trait]
impl CrmClient for HttpCrmClient {
    async fn get_record(&self, kind: EntityKind, id: &str) -> Result<Record, CrmError> {
        let records = self
            .get_data(&format!("{}/{id}", kind.api_name()), &[])
            .await?;
        records
            .into_iter()
            .next()
            .ok_or_else(|| CrmError::RecordNotFound {
                module: kind.api_name().to_string(),
                id: id.to_string(),
            })
    }

    async fn create_record(&self, kind: EntityKind, fields: Record) -> Result<String, CrmError> {
        let detail = self
            .send_data(reqwest::Method::POST, kind.api_name(), fields)
            .await?;
        Self::extract_record_id(&detail)
    }

    async fn update_record(
        &self,
        kind: EntityKind,
        id: &str,
        fields: Record,
    ) -> Result<(), CrmError> {
        self.send_data(
            reqwest::Method::PUT,
            &format!("{}/{id}", kind.api_name()),
            fields,
        )
        .await?;
        Ok(())
    }

    async fn delete_record(&self, kind: EntityKind, id: &str) -> Result<(), CrmError> {
        let token = self.access_token().await?;
        let response = self
            .client
            .delete(self.data_url(&format!("{}/{id}", kind.api_name())))
            .header("Authorization", format!("Zoho-oauthtoken {token}"))
            .send()
            .await
            .map_err(|e| CrmError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status == 404 {
            return Err(CrmError::RecordNotFound {
                module: kind.api_name().to_string(),
                id: id.to_string(),
            });
        }
        if status != 200 {
            let message = response.text().await.unwrap_or_default();
            return Err(CrmError::ApiError {
                status_code: status,
                message,
            });
        }
        Ok(())
    }

    async fn list_records(&self, kind: EntityKind, limit: usize) -> Result<Vec<Record>, CrmError> {
        let per_page = limit.min(200).to_string();
        self.get_data(kind.api_name(), &[("per_page", per_page.as_str())])
            .await
    }

    async fn search_records(
        &self,
        kind: EntityKind,
        criteria: &str,
    ) -> Result<Vec<Record>, CrmError> {
        self.get_data(
            &format!("{}/search", kind.api_name()),
            &[("criteria", criteria)],
        )
        .await
    }

    async fn search_by_email(
        &self,
        kind: EntityKind,
        email: &str,
    ) -> Result<Vec<Record>, CrmError> {
        self.get_data(&format!("{}/search", kind.api_name()), &[("email", email)])
            .await
    }

    async fn search_by_phone(
        &self,
        kind: EntityKind,
        phone: &str,
    ) -> Result<Vec<Record>, CrmError> {
        self.get_data(&format!("{}/search", kind.api_name()), &[("phone", phone)])
            .await
    }

    async fn search_by_word(&self, kind: EntityKind, word: &str) -> Result<Vec<Record>, CrmError> {
        self.get_data(&format!("{}/search", kind.api_name()), &[("word", word)])
            .await
    }

    async fn tasks_for_record(
        &self,
        kind: EntityKind,
        record_id: &str,
    ) -> Result<Vec<Record>, CrmError> {
        // Tasks link back through What_Id for most modules, Who_Id for
        // contact-shaped ones
        let field = match kind {
            EntityKind::Contacts | EntityKind::Leads => "Who_Id",
            _ => "What_Id",
        };
        self.search_records(EntityKind::Tasks, &format!("({field}.id:equals:{record_id})"))
            .await
    }

    async fn create_task(&self, fields: Record) -> Result<String, CrmError> {
        self.create_record(EntityKind::Tasks, fields).await
    }

    async fn convert_lead(&self, lead_id: &str) -> Result<Record, CrmError> {
        let token = self.access_token().await?;
        let body = serde_json::json!({ "data": [{}] });
        let response = self
            .client
            .post(self.data_url(&format!("Leads/{lead_id}/actions/convert")))
            .header("Authorization", format!("Zoho-oauthtoken {token}"))
            .json(&body)
            .send()
            .await
            .map_err(|e| CrmError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 && status != 202 {
            let message = response.text().await.unwrap_or_default();
            return Err(CrmError::ApiError {
                status_code: status,
                message,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| CrmError::InvalidResponse(e.to_string()))?;
        match body["data"][0].clone() {
            Value::Object(map) => Ok(map),
            _ => Err(CrmError::InvalidResponse(
                "no conversion details in response".into(),
            )),
        }
    }

    async fn health_check(&self) -> Result<(), CrmError> {
        // A token refresh plus a minimal read proves both auth and data access
        self.get_data("Leads", &[("per_page", "1")]).await?;
        Ok(())
    }
}
