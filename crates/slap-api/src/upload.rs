use axum::{Extension, Json, extract::State, response::IntoResponse};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;

use slap_types::api::{UploadRequest, UploadResponse};

use crate::error::ApiError;
use crate::middleware::Claims;
use crate::state::AppState;

/// POST /upload — forward a data-URL image to the image host and hand the
/// durable URL back. The client then attaches that URL to a post, comment
/// or message; nothing is persisted here, so a failed upload leaves no
/// trace.
pub async fn upload_image(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    Json(req): Json<UploadRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = data_url_payload(&req.image_base64)?;

    let image_url = state
        .imgur
        .upload_base64(payload)
        .await
        .map_err(ApiError::Upstream)?;

    Ok(Json(UploadResponse { image_url }))
}

/// The image host wants the bare base64, without the
/// "data:image/...;base64," prefix. Reject anything that is not an image
/// data URL or whose payload does not decode, before going upstream.
fn data_url_payload(data_url: &str) -> Result<&str, ApiError> {
    if !data_url.starts_with("data:image") {
        return Err(ApiError::validation(
            "image data missing or not a data URL",
        ));
    }
    let payload = data_url
        .split_once(',')
        .map(|(_, payload)| payload)
        .ok_or_else(|| ApiError::validation("malformed image data URL"))?;
    B64.decode(payload)
        .map_err(|_| ApiError::validation("image payload is not valid base64"))?;
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_an_image_data_url() {
        // "hi" in base64
        let payload = data_url_payload("data:image/png;base64,aGk=").unwrap();
        assert_eq!(payload, "aGk=");
    }

    #[test]
    fn rejects_non_image_payloads() {
        assert!(data_url_payload("data:text/plain;base64,aGk=").is_err());
        assert!(data_url_payload("aGk=").is_err());
    }

    #[test]
    fn rejects_payloads_that_do_not_decode() {
        assert!(data_url_payload("data:image/png;base64,!!notbase64!!").is_err());
        assert!(data_url_payload("data:image/png").is_err());
    }
}
