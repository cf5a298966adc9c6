use async_trait::async_trait;
use reqwest::Client;

use crate::core::errors::TransportError;
use crate::core::sheets::{HttpMethod, HttpRequestDescriptor, HttpResponse, SheetsTransport};
use crate::infra::google::http_support::{retry_after, transport_error};

/// Sends built spreadsheet requests with reqwest. Status codes are passed
/// through untouched; the service decides what they mean.
pub struct ReqwestSheetsTransport {
    client: Client,
}

impl ReqwestSheetsTransport {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestSheetsTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SheetsTransport for ReqwestSheetsTransport {
    async fn send(&self, request: &HttpRequestDescriptor) -> Result<HttpResponse, TransportError> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let retry_after = retry_after(response.headers());
        let body = response.text().await.map_err(transport_error)?;

        Ok(HttpResponse {
            status,
            retry_after,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn sends_method_headers_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/spreadsheets/id/values/Sheet1!A%3AG:append"))
            .and(query_param("valueInputOption", "RAW"))
            .and(header("authorization", "Bearer t"))
            .and(body_json(json!({"values": [["a"]]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let request = HttpRequestDescriptor {
            method: HttpMethod::Post,
            url: format!(
                "{}/spreadsheets/id/values/Sheet1!A%3AG:append?valueInputOption=RAW",
                server.uri()
            ),
            headers: vec![
                ("Authorization".to_string(), "Bearer t".to_string()),
                ("Content-Type".to_string(), "application/json".to_string()),
            ],
            body: Some(json!({"values": [["a"]]})),
        };

        let response = ReqwestSheetsTransport::new().send(&request).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&response.body).unwrap(),
            json!({"ok": true})
        );
    }

    #[tokio::test]
    async fn passes_error_status_and_retry_after_through() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "3"))
            .mount(&server)
            .await;

        let request = HttpRequestDescriptor {
            method: HttpMethod::Get,
            url: format!("{}/spreadsheets/id/values/A1", server.uri()),
            headers: vec![],
            body: None,
        };

        let response = ReqwestSheetsTransport::new().send(&request).await.unwrap();
        assert_eq!(response.status, 429);
        assert_eq!(response.retry_after, Some(Duration::from_secs(3)));
    }
}
