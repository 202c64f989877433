use crate::{
    error::AppError,
    models::{find_by_code, CreatedLink, LinkMap, LinkRecord},
    qr::{self, QrDelivery},
    shortcode::short_code,
    AppState, QR_ROUTE,
};
use askama::Template;
use axum::{
    extract::{Form, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::{collections::btree_map::Entry, sync::Arc};

// ── Template ───────────────────────────────────────────────────────────────

#[derive(Template, Default)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub error: Option<String>,
    pub created: Option<CreatedLink>,
}

// ── Form ───────────────────────────────────────────────────────────────────

/// Both fields are optional at the extractor level so a missing field
/// re-renders the form instead of failing with 422.
#[derive(Deserialize)]
pub struct SubmitForm {
    property_name: Option<String>,
    destination_url: Option<String>,
}

// ── Handlers ───────────────────────────────────────────────────────────────

/// GET /
pub async fn form() -> IndexTemplate {
    IndexTemplate::default()
}

/// POST /
///
/// Create a link for a new property name, or point an existing one at a new
/// destination. The short code and any cached QR image of an existing record
/// are kept as they are.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    Form(form): Form<SubmitForm>,
) -> Result<Response, AppError> {
    let destination_url = non_blank(form.destination_url).map(|url| url.trim().to_owned());
    let (Some(property_name), Some(destination_url)) =
        (non_blank(form.property_name), destination_url)
    else {
        return Ok(IndexTemplate {
            error: Some("Both fields are required!".into()),
            created: None,
        }
        .into_response());
    };

    let _guard = state.write_lock.lock().await;
    let mut links = state.store.load().await;

    if !links.contains_key(&property_name) {
        warn_on_collision(&links, &property_name);
    }

    let record = match links.entry(property_name.clone()) {
        Entry::Occupied(entry) => {
            let record = entry.into_mut();
            record.destination_url = destination_url;
            tracing::info!("Updated '{}' -> {}", property_name, record.destination_url);
            record
        }
        Entry::Vacant(entry) => {
            let code = short_code(entry.key());
            tracing::info!("Created '{}' as {} -> {}", property_name, code, destination_url);
            entry.insert(LinkRecord {
                short_url: code,
                destination_url,
                qr_code_base64: None,
            })
        }
    };
    let code = record.short_url.clone();

    let qr_src = match state.config.qr_delivery {
        QrDelivery::Inline => {
            let encoded = match &record.qr_code_base64 {
                Some(existing) => existing.clone(),
                None => {
                    let fresh = state.qr.render_base64(&code)?;
                    record.qr_code_base64 = Some(fresh.clone());
                    fresh
                }
            };
            qr::data_uri(&encoded)
        }
        QrDelivery::File => {
            state
                .qr
                .write_png_if_missing(&state.config.qr_dir, &code)
                .await?;
            format!("{QR_ROUTE}/{code}.png")
        }
    };

    let outcome = state.store.save(&links).await?;

    Ok(IndexTemplate {
        error: None,
        created: Some(CreatedLink {
            public_link: state.config.short_link(&code),
            short_code: code,
            qr_src,
            sync_warning: outcome.warning(),
        }),
    }
    .into_response())
}

// ── Private helpers ────────────────────────────────────────────────────────

/// `None` for a missing or whitespace-only field. A present value is
/// returned untouched: property names are exact keys.
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Log when a new property name hashes to a code another record already
/// holds. The new record is still inserted; redirects resolve to whichever
/// record the scan reaches first.
fn warn_on_collision(links: &LinkMap, property_name: &str) {
    let code = short_code(property_name);
    if let Some((other, _)) = find_by_code(links, &code) {
        tracing::warn!(
            "Short code {} for '{}' collides with existing property '{}'",
            code,
            property_name,
            other
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_fields_count_as_missing() {
        assert_eq!(non_blank(None), None);
        assert_eq!(non_blank(Some(String::new())), None);
        assert_eq!(non_blank(Some("   \t".into())), None);
        assert_eq!(non_blank(Some("  blog ".into())), Some("  blog ".into()));
    }

    #[test]
    fn form_template_renders_error() {
        let html = IndexTemplate {
            error: Some("Both fields are required!".into()),
            created: None,
        }
        .render()
        .unwrap();
        assert!(html.contains("Both fields are required!"));
        assert!(html.contains("name=\"property_name\""));
        assert!(html.contains("name=\"destination_url\""));
    }

    #[test]
    fn confirmation_template_shows_link_and_image() {
        let html = IndexTemplate {
            error: None,
            created: Some(CreatedLink {
                short_code: "126ac9".into(),
                public_link: "https://go.example.com/126ac9".into(),
                qr_src: "/static/qrcodes/126ac9.png".into(),
                sync_warning: Some("push failed".into()),
            }),
        }
        .render()
        .unwrap();
        assert!(html.contains("126ac9"));
        assert!(html.contains("href=\"https://go.example.com/126ac9\""));
        assert!(html.contains("src=\"/static/qrcodes/126ac9.png\""));
        assert!(html.contains("push failed"));
    }
}
