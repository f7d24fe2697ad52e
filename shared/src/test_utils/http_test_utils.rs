use axum::response::Response;
use http_body_util::BodyExt;

/// Collects a response body and parses it as JSON
pub async fn response_to_json(response: Response) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("response body should be readable")
        .to_bytes();

    if bytes.is_empty() {
        return serde_json::Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        panic!(
            "response body is not JSON ({}): {}",
            e,
            String::from_utf8_lossy(&bytes)
        )
    })
}
