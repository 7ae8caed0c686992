use reqwest::multipart::{Form, Part};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use url::Url;

use crate::api::Action;

/// What every client call resolves to, whatever the server sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn failure(error: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            message: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Invalid API URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Fold a raw server envelope into an [`ApiResponse`].
///
/// On success the `data` member is the payload when present; otherwise every
/// field except `status` and `message` is. Anything else is a failure carrying
/// the server's message.
pub fn normalize<T: DeserializeOwned>(raw: Value) -> ApiResponse<T> {
    let Value::Object(mut fields) = raw else {
        return ApiResponse::failure("Operation failed");
    };

    let succeeded = fields.get("status").and_then(Value::as_str) == Some("success");
    let message = fields
        .remove("message")
        .and_then(|m| m.as_str().map(str::to_string))
        .filter(|m| !m.is_empty());

    if !succeeded {
        return ApiResponse::failure(message.unwrap_or_else(|| "Operation failed".to_string()));
    }

    fields.remove("status");
    let payload = match fields.remove("data") {
        Some(data) => data,
        None => Value::Object(fields),
    };

    match serde_json::from_value(payload) {
        Ok(data) => ApiResponse {
            success: true,
            data: Some(data),
            message,
            error: None,
        },
        Err(e) => ApiResponse::failure(format!("Unexpected response shape: {}", e)),
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadedMedia {
    pub url: String,
    #[serde(default)]
    pub mime: Option<String>,
}

/// Client for the single-endpoint action API. Holds the session cookie
/// between calls; nothing is retried.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    endpoint: Url,
    root: Url,
}

impl ApiClient {
    /// `endpoint` is the full action URL, e.g. `https://host/api.php`.
    pub fn new(endpoint: &str) -> Result<Self, ClientError> {
        let endpoint = Url::parse(endpoint)?;
        let root = Url::parse(&format!("{}/", endpoint.origin().ascii_serialization()))?;
        let http = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(ApiClient {
            http,
            endpoint,
            root,
        })
    }

    /// Resolve a possibly relative URL against the API origin. Unparseable
    /// input is returned unchanged.
    pub fn to_absolute_url(&self, url: &str) -> String {
        self.root
            .join(url)
            .map(String::from)
            .unwrap_or_else(|_| url.to_string())
    }

    pub fn action_url(&self, action: Action, query: &[(&str, String)]) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("action", action.as_str());
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        url
    }

    fn unreachable(&self, err: &reqwest::Error) -> String {
        format!(
            "Failed to reach API at {} (CORS / server offline): {}",
            self.root.origin().ascii_serialization(),
            err
        )
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value, String> {
        let response = request.send().await.map_err(|e| {
            tracing::warn!("API request failed: {}", e);
            self.unreachable(&e)
        })?;
        let status = response.status();

        match response.json::<Value>().await {
            Ok(raw) => Ok(raw),
            Err(_) if !status.is_success() => Err(format!("HTTP error! status: {}", status.as_u16())),
            Err(e) => Err(format!("Malformed response: {}", e)),
        }
    }

    async fn call<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResponse<T> {
        match self.send(request).await {
            Ok(raw) => normalize(raw),
            Err(error) => ApiResponse::failure(error),
        }
    }

    async fn post<T: DeserializeOwned>(&self, action: Action, body: Value) -> ApiResponse<T> {
        let request = self.http.post(self.action_url(action, &[])).json(&body);
        self.call(request).await
    }

    async fn get<T: DeserializeOwned>(
        &self,
        action: Action,
        query: &[(&str, String)],
    ) -> ApiResponse<T> {
        self.call(self.http.get(self.action_url(action, query))).await
    }

    /// `body` merged with `{key: id}`; a non-object body is replaced.
    fn with_id<B: Serialize>(key: &str, id: i64, body: &B) -> Result<Value, String> {
        let mut fields = match serde_json::to_value(body).map_err(|e| e.to_string())? {
            Value::Object(fields) => fields,
            _ => Map::new(),
        };
        fields.insert(key.to_string(), json!(id));
        Ok(Value::Object(fields))
    }

    // -- accounts --

    pub async fn login(&self, email: &str, password: &str) -> ApiResponse<Value> {
        self.post(Action::Login, json!({ "email": email, "password": password }))
            .await
    }

    pub async fn register<B: Serialize>(&self, data: &B) -> ApiResponse<Value> {
        match serde_json::to_value(data) {
            Ok(body) => self.post(Action::Register, body).await,
            Err(e) => ApiResponse::failure(e.to_string()),
        }
    }

    pub async fn add_role(
        &self,
        user_id: i64,
        role: &str,
        business_name: Option<&str>,
    ) -> ApiResponse<Value> {
        let mut body = json!({ "user_id": user_id, "role": role });
        if let Some(name) = business_name {
            body["business_name"] = json!(name);
        }
        self.post(Action::AddRole, body).await
    }

    pub async fn logout(&self) -> ApiResponse<Value> {
        self.post(Action::Logout, json!({})).await
    }

    pub async fn update_user<U: Serialize>(&self, user_id: i64, updates: &U) -> ApiResponse<Value> {
        match Self::with_id("id", user_id, updates) {
            Ok(body) => self.post(Action::UpdateUser, body).await,
            Err(e) => ApiResponse::failure(e),
        }
    }

    // -- campaigns --

    pub async fn get_campaigns(&self, partner_id: i64) -> ApiResponse<Vec<Value>> {
        self.get(Action::GetCampaigns, &[("partner_id", partner_id.to_string())])
            .await
    }

    pub async fn create_campaign<B: Serialize>(&self, campaign: &B) -> ApiResponse<Value> {
        match serde_json::to_value(campaign) {
            Ok(body) => self.post(Action::CreateCampaign, body).await,
            Err(e) => ApiResponse::failure(e.to_string()),
        }
    }

    pub async fn update_campaign<U: Serialize>(&self, id: i64, updates: &U) -> ApiResponse<Value> {
        match Self::with_id("id", id, updates) {
            Ok(body) => self.post(Action::UpdateCampaign, body).await,
            Err(e) => ApiResponse::failure(e),
        }
    }

    pub async fn delete_campaign(&self, id: i64) -> ApiResponse<Value> {
        self.post(Action::DeleteCampaign, json!({ "id": id })).await
    }

    // -- analytics --

    pub async fn manual_add_scan(
        &self,
        partner_id: i64,
        influencer_id: i64,
        source: &str,
        revenue: i64,
    ) -> ApiResponse<Value> {
        let body = json!({
            "partner_id": partner_id,
            "influencer_id": influencer_id,
            "source": source,
            "revenue": revenue,
        });
        self.post(Action::ManualAddScan, body).await
    }

    pub async fn get_partner_dashboard(&self, user_id: i64) -> ApiResponse<Value> {
        self.get(Action::GetPartnerDashboard, &[("user_id", user_id.to_string())])
            .await
    }

    pub async fn get_influencer_dashboard(&self, user_id: i64) -> ApiResponse<Value> {
        self.get(
            Action::GetInfluencerDashboard,
            &[("user_id", user_id.to_string())],
        )
        .await
    }

    pub async fn seed_analytics(&self, user_id: i64) -> ApiResponse<Value> {
        self.post(Action::SeedAnalytics, json!({ "user_id": user_id }))
            .await
    }

    // -- media --

    /// Upload one file as multipart field `file`. The returned URL is made
    /// absolute against the API origin.
    pub async fn upload_media(&self, file_name: &str, bytes: Vec<u8>) -> ApiResponse<UploadedMedia> {
        let mime = mime_guess::from_path(file_name).first_or_octet_stream();
        let part = match Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime.essence_str())
        {
            Ok(part) => part,
            Err(e) => return ApiResponse::failure(format!("Upload failed: {}", e)),
        };
        let request = self
            .http
            .post(self.action_url(Action::UploadMedia, &[]))
            .multipart(Form::new().part("file", part));

        let raw = match self.send(request).await {
            Ok(raw) => raw,
            Err(error) => return ApiResponse::failure(error),
        };
        if raw.get("status").and_then(Value::as_str) != Some("success") {
            let message = raw
                .get("message")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .unwrap_or("Upload failed");
            return ApiResponse::failure(message);
        }

        match normalize::<UploadedMedia>(raw) {
            ApiResponse {
                data: Some(mut media),
                message,
                ..
            } => {
                media.url = self.to_absolute_url(&media.url);
                ApiResponse {
                    success: true,
                    data: Some(media),
                    message,
                    error: None,
                }
            }
            failed => failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_with_data_member_uses_it() {
        let response: ApiResponse<Vec<i64>> =
            normalize(json!({ "status": "success", "data": [1, 2], "message": "ok" }));
        assert!(response.success);
        assert_eq!(response.data, Some(vec![1, 2]));
        assert_eq!(response.message.as_deref(), Some("ok"));
        assert_eq!(response.error, None);
    }

    #[test]
    fn success_without_data_uses_remaining_fields() {
        let response: ApiResponse<Value> =
            normalize(json!({ "status": "success", "user_id": 7, "roles": ["merchant"] }));
        assert_eq!(
            response.data,
            Some(json!({ "user_id": 7, "roles": ["merchant"] }))
        );
    }

    #[test]
    fn failure_carries_message_or_default() {
        let response: ApiResponse<Value> =
            normalize(json!({ "status": "error", "message": "Invalid credentials" }));
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("Invalid credentials"));

        let response: ApiResponse<Value> = normalize(json!({ "message": "" }));
        assert_eq!(response.error.as_deref(), Some("Operation failed"));

        let response: ApiResponse<Value> = normalize(json!([1, 2, 3]));
        assert_eq!(response.error.as_deref(), Some("Operation failed"));
    }

    #[test]
    fn banner_is_not_a_success() {
        let response: ApiResponse<Value> =
            normalize(json!({ "message": "VibeCheck Omni-API Online" }));
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("VibeCheck Omni-API Online"));
    }

    #[test]
    fn relative_urls_resolve_against_origin() {
        let client = ApiClient::new("https://api.example.com/backend/api.php").unwrap();
        assert_eq!(
            client.to_absolute_url("/uploads/a.png"),
            "https://api.example.com/uploads/a.png"
        );
        assert_eq!(
            client.to_absolute_url("uploads/a.png"),
            "https://api.example.com/uploads/a.png"
        );
        assert_eq!(
            client.to_absolute_url("https://cdn.example.com/x.png"),
            "https://cdn.example.com/x.png"
        );
    }

    #[test]
    fn action_url_appends_query() {
        let client = ApiClient::new("http://localhost:8080/api.php").unwrap();
        let url = client.action_url(Action::GetCampaigns, &[("partner_id", "4".into())]);
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/api.php?action=get_campaigns&partner_id=4"
        );
    }

    #[test]
    fn with_id_merges_into_object() {
        let body = ApiClient::with_id("id", 3, &json!({ "title": "x" })).unwrap();
        assert_eq!(body, json!({ "title": "x", "id": 3 }));
        let body = ApiClient::with_id("id", 3, &"not an object").unwrap();
        assert_eq!(body, json!({ "id": 3 }));
    }

    #[tokio::test]
    async fn unreachable_server_is_reported() {
        // port 9 (discard) is not listening in test environments
        let client = ApiClient::new("http://127.0.0.1:9/api.php").unwrap();
        let response = client.get_campaigns(1).await;
        assert!(!response.success);
        assert!(response
            .error
            .unwrap()
            .starts_with("Failed to reach API at http://127.0.0.1:9"));
    }
}
