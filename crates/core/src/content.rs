//! Per-type ad content schemas and boundary validation.
//!
//! Content arrives from the admin API as a loose JSON document and is
//! validated into a tagged union before anything is persisted. Required
//! fields missing for the declared type reject the whole write; unknown
//! fields are dropped.

use serde::{Deserialize, Serialize};

use crate::error::{AdError, AdResult};
use crate::types::AdType;

/// Validated, type-dependent content payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AdContent {
    Banner {
        image_url: String,
        link_url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alt_text: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        width: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        height: Option<u32>,
    },
    Popup {
        title: String,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image_url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        button_text: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        button_url: Option<String>,
        /// Seconds before the popup opens.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        delay: Option<u32>,
        /// Display frequency key, e.g. "session" or "daily".
        #[serde(default, skip_serializing_if = "Option::is_none")]
        frequency: Option<String>,
    },
    Sidebar {
        html: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        css: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        js: Option<String>,
    },
    Inline {
        html: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        css: Option<String>,
        /// Insertion hint, e.g. "after_paragraph_1".
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<String>,
    },
    Video {
        video_url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        poster_url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        autoplay: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        controls: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        width: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        height: Option<u32>,
    },
}

impl AdContent {
    pub fn ad_type(&self) -> AdType {
        match self {
            AdContent::Banner { .. } => AdType::Banner,
            AdContent::Popup { .. } => AdType::Popup,
            AdContent::Sidebar { .. } => AdType::Sidebar,
            AdContent::Inline { .. } => AdType::Inline,
            AdContent::Video { .. } => AdType::Video,
        }
    }
}

/// Validate a raw content document against the schema for `ad_type`.
pub fn validate_content(ad_type: AdType, raw: &serde_json::Value) -> AdResult<AdContent> {
    let content = match ad_type {
        AdType::Banner => AdContent::Banner {
            image_url: require_str(ad_type, raw, "image_url")?,
            link_url: require_str(ad_type, raw, "link_url")?,
            alt_text: opt_str(raw, "alt_text"),
            title: opt_str(raw, "title"),
            width: opt_u32(raw, "width"),
            height: opt_u32(raw, "height"),
        },
        AdType::Popup => AdContent::Popup {
            title: require_str(ad_type, raw, "title")?,
            message: require_str(ad_type, raw, "message")?,
            image_url: opt_str(raw, "image_url"),
            button_text: opt_str(raw, "button_text"),
            button_url: opt_str(raw, "button_url"),
            delay: opt_u32(raw, "delay"),
            frequency: opt_str(raw, "frequency"),
        },
        AdType::Sidebar => AdContent::Sidebar {
            html: require_str(ad_type, raw, "html")?,
            css: opt_str(raw, "css"),
            js: opt_str(raw, "js"),
        },
        AdType::Inline => AdContent::Inline {
            html: require_str(ad_type, raw, "html")?,
            css: opt_str(raw, "css"),
            position: opt_str(raw, "position"),
        },
        AdType::Video => AdContent::Video {
            video_url: require_str(ad_type, raw, "video_url")?,
            poster_url: opt_str(raw, "poster_url"),
            autoplay: opt_bool(raw, "autoplay"),
            controls: opt_bool(raw, "controls"),
            width: opt_u32(raw, "width"),
            height: opt_u32(raw, "height"),
        },
    };
    Ok(content)
}

fn require_str(ad_type: AdType, raw: &serde_json::Value, field: &str) -> AdResult<String> {
    raw.get(field)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| AdError::MissingContentField {
            ad_type: ad_type.as_str(),
            field: field.to_owned(),
        })
}

fn opt_str(raw: &serde_json::Value, field: &str) -> Option<String> {
    raw.get(field).and_then(|v| v.as_str()).map(str::to_owned)
}

fn opt_u32(raw: &serde_json::Value, field: &str) -> Option<u32> {
    raw.get(field).and_then(|v| v.as_u64()).map(|n| n as u32)
}

fn opt_bool(raw: &serde_json::Value, field: &str) -> Option<bool> {
    raw.get(field).and_then(|v| v.as_bool())
}
