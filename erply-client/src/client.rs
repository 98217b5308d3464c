use crate::error::ClientError;
use async_trait::async_trait;
use crm::domain::{RESPONSE_STATUS_ERROR, RESPONSE_STATUS_OK};
use crm::error::ALREADY_DELETED_CODE;
use crm::{BulkResponse, BulkStatus, CallOptions, CustomerDirectory, DirectoryError, FieldMap};
use serde::Deserialize;
use serde_json::Value;
use shared::config::ErplyCredentials;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Erply error codes meaning the session key is no longer usable.
const SESSION_EXPIRED_CODES: [i64; 3] = [1054, 1055, 1056];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestName {
    GetCustomers,
    SaveCustomer,
    DeleteCustomer,
}

impl RequestName {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestName::GetCustomers => "getCustomers",
            RequestName::SaveCustomer => "saveCustomer",
            RequestName::DeleteCustomer => "deleteCustomer",
        }
    }
}

#[derive(Clone, Debug)]
pub struct ClientSettings {
    pub session_length: Duration,
    /// Refresh the session this long before it expires
    pub session_refresh_margin: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            session_length: Duration::from_secs(3600),
            session_refresh_margin: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug)]
struct Session {
    key: String,
    expires_at: Instant,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyUserRecord {
    session_key: String,
    #[serde(default)]
    session_length: Option<u64>,
}

#[derive(Deserialize)]
struct VerifyUserResponse {
    status: BulkStatus,
    #[serde(default)]
    records: Option<Vec<VerifyUserRecord>>,
}

/// Customer directory backed by the Erply bulk API.
pub struct ErplyClient {
    http: reqwest::Client,
    endpoint: String,
    credentials: ErplyCredentials,
    settings: ClientSettings,
    session: RwLock<Option<Session>>,
}

impl ErplyClient {
    pub fn new(credentials: ErplyCredentials, settings: ClientSettings) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .build()?;

        Ok(Self {
            endpoint: endpoint_for(&credentials),
            http,
            credentials,
            settings,
            session: RwLock::new(None),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn session_key(&self) -> Result<String, ClientError> {
        let margin = self.settings.session_refresh_margin;
        let is_fresh = |s: &&Session| s.expires_at > Instant::now() + margin;

        if let Some(session) = (*self.session.read().await).as_ref().filter(is_fresh) {
            return Ok(session.key.clone());
        }

        let mut guard = self.session.write().await;
        // Another request may have refreshed while we waited for the lock
        if let Some(session) = (*guard).as_ref().filter(is_fresh) {
            return Ok(session.key.clone());
        }

        let session = self.verify_user().await?;
        let key = session.key.clone();
        *guard = Some(session);
        Ok(key)
    }

    async fn verify_user(&self) -> Result<Session, ClientError> {
        let session_length = self.settings.session_length.as_secs().to_string();
        let form = [
            ("request", "verifyUser"),
            ("clientCode", self.credentials.client_code.as_str()),
            ("username", self.credentials.username.as_str()),
            ("password", self.credentials.password.as_str()),
            ("sessionLength", session_length.as_str()),
        ];

        let body = self
            .http
            .post(&self.endpoint)
            .form(&form)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        let response: VerifyUserResponse = serde_json::from_slice(&body)?;
        if response.status.response_status != RESPONSE_STATUS_OK {
            return Err(ClientError::Authentication(format!(
                "verifyUser failed with code {}",
                response.status.error_code
            )));
        }

        let record = response
            .records
            .and_then(|records| records.into_iter().next())
            .ok_or_else(|| ClientError::Authentication("verifyUser returned no session".into()))?;

        let lifetime = record
            .session_length
            .map(Duration::from_secs)
            .unwrap_or(self.settings.session_length);
        info!(client_code = %self.credentials.client_code, "Established Erply session");

        Ok(Session {
            key: record.session_key,
            expires_at: Instant::now() + lifetime,
        })
    }

    async fn forget_session(&self) {
        *self.session.write().await = None;
    }

    async fn send_bulk(
        &self,
        name: RequestName,
        items: &[FieldMap],
        opts: &CallOptions,
    ) -> Result<BulkResponse, ClientError> {
        let session_key = self.session_key().await?;
        let requests = build_requests(name, items);

        let mut form: Vec<(&str, &str)> = vec![
            ("clientCode", self.credentials.client_code.as_str()),
            ("sessionKey", session_key.as_str()),
            ("requests", requests.as_str()),
        ];
        form.extend(opts.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        debug!(request = name.as_str(), items = items.len(), "sending Erply bulk request");
        let body = self
            .http
            .post(&self.endpoint)
            .form(&form)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        let result = decode_bulk(name, &body);
        let session_rejected = matches!(
            &result,
            Err(ClientError::Api { code, .. }) if SESSION_EXPIRED_CODES.contains(code)
        );
        if session_rejected {
            warn!("Erply session rejected, dropping cached session key");
            self.forget_session().await;
        }
        result
    }
}

/// Default endpoint is per-account: `https://{clientCode}.erply.com/api/`.
pub fn endpoint_for(credentials: &ErplyCredentials) -> String {
    match &credentials.base_url {
        Some(url) => url.clone(),
        None => format!("https://{}.erply.com/api/", credentials.client_code),
    }
}

/// Serializes items as the `requests` form field, tagging each with its name and position.
pub fn build_requests(name: RequestName, items: &[FieldMap]) -> String {
    let requests: Vec<Value> = items
        .iter()
        .enumerate()
        .map(|(id, item)| {
            let mut request = FieldMap::new();
            request.insert("requestName".into(), Value::from(name.as_str()));
            request.insert("requestID".into(), Value::from(id));
            for (k, v) in item {
                request.insert(k.clone(), v.clone());
            }
            Value::Object(request)
        })
        .collect();
    Value::Array(requests).to_string()
}

/// Decodes a bulk body. Envelope errors become `ClientError::Api`; per-item errors stay in
/// the response, except a delete whose only failures are missing items.
pub fn decode_bulk(name: RequestName, body: &[u8]) -> Result<BulkResponse, ClientError> {
    let response: BulkResponse = serde_json::from_slice(body)?;

    if response.status.response_status == RESPONSE_STATUS_ERROR || response.status.error_code != 0 {
        return Err(ClientError::Api {
            code: response.status.error_code,
            field: response.status.error_field.clone(),
            response: Some(Box::new(response)),
        });
    }

    if name == RequestName::DeleteCustomer {
        let only_missing = {
            let mut failed = response.failed_items().peekable();
            failed.peek().is_some()
                && failed.all(|(_, item)| item.status.error_code == ALREADY_DELETED_CODE)
        };
        if only_missing {
            return Err(ClientError::Api {
                code: ALREADY_DELETED_CODE,
                field: Some(crm::domain::fields::CUSTOMER_ID.to_string()),
                response: Some(Box::new(response)),
            });
        }
    }

    Ok(response)
}

#[async_trait]
impl CustomerDirectory for ErplyClient {
    async fn get_customers_bulk(
        &self,
        filters: &[FieldMap],
        opts: &CallOptions,
    ) -> Result<BulkResponse, DirectoryError> {
        Ok(self.send_bulk(RequestName::GetCustomers, filters, opts).await?)
    }

    async fn save_customer_bulk(
        &self,
        items: &[FieldMap],
        opts: &CallOptions,
    ) -> Result<BulkResponse, DirectoryError> {
        Ok(self.send_bulk(RequestName::SaveCustomer, items, opts).await?)
    }

    async fn delete_customer_bulk(
        &self,
        items: &[FieldMap],
        opts: &CallOptions,
    ) -> Result<BulkResponse, DirectoryError> {
        Ok(self.send_bulk(RequestName::DeleteCustomer, items, opts).await?)
    }
}

impl std::fmt::Debug for ErplyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErplyClient")
            .field("endpoint", &self.endpoint)
            .field("credentials", &self.credentials)
            .finish()
    }
}
