use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One shortened link, keyed by its property name in a [`LinkMap`].
///
/// Field names match the persisted JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub short_url: String,
    pub destination_url: String,
    /// Base64 PNG of the QR code. Only populated under inline delivery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr_code_base64: Option<String>,
}

/// Property name → record. The whole map is loaded and saved as a unit.
pub type LinkMap = BTreeMap<String, LinkRecord>;

/// First record whose short code equals `code`.
///
/// Codes are not guaranteed unique, so this is a scan rather than an index.
pub fn find_by_code<'a>(links: &'a LinkMap, code: &str) -> Option<(&'a String, &'a LinkRecord)> {
    links.iter().find(|(_, record)| record.short_url == code)
}

/// What the confirmation view shows after a successful submission.
#[derive(Debug, Clone)]
pub struct CreatedLink {
    pub short_code: String,
    pub public_link: String,
    /// `src` attribute for the QR `<img>`: a static path or a data URI.
    pub qr_src: String,
    /// Set when the mapping was written locally but remote sync failed.
    pub sync_warning: Option<String>,
}
