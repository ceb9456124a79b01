//! Minimal blocking JSON-over-HTTP calls via libcurl.
//!
//! Runs in the current thread; call from `spawn_blocking` if used from async code.

use std::time::Duration;

/// HTTP response: status code and raw body.
#[derive(Debug)]
pub(crate) struct JsonResponse {
    pub code: u32,
    pub body: Vec<u8>,
}

impl JsonResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

/// Sends `body` as JSON with the given method ("POST", "PATCH", ...).
pub(crate) fn send_json(
    method: &str,
    url: &str,
    bearer: Option<&str>,
    body: &[u8],
) -> Result<JsonResponse, curl::Error> {
    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.connect_timeout(Duration::from_secs(15))?;
    easy.timeout(Duration::from_secs(30))?;
    easy.post(true)?;
    if method != "POST" {
        easy.custom_request(method)?;
    }
    easy.post_fields_copy(body)?;

    let mut list = curl::easy::List::new();
    list.append("Content-Type: application/json")?;
    list.append("Accept: application/json")?;
    if let Some(token) = bearer {
        list.append(&format!("Authorization: Bearer {}", token.trim()))?;
    }
    easy.http_headers(list)?;

    let mut out = Vec::new();
    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            out.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()?;
    }

    let code = easy.response_code()?;
    Ok(JsonResponse { code, body: out })
}
