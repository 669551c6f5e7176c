//! User-agent and request metadata sniffing for event rows.
//!
//! Substring heuristics only. Good enough for the per-impression device
//! breakdown; anything needing accuracy should parse on the analytics side.

use adserve_core::types::{DeviceInfo, LocationInfo};

pub fn device_info(user_agent: &str) -> DeviceInfo {
    let is_tablet = user_agent.contains("iPad") || user_agent.contains("Tablet");
    let is_mobile = !is_tablet
        && (user_agent.contains("Mobile")
            || user_agent.contains("Android")
            || user_agent.contains("iPhone"));

    DeviceInfo {
        is_mobile,
        is_tablet,
        is_desktop: !is_mobile && !is_tablet,
        browser: browser(user_agent).to_string(),
        os: operating_system(user_agent).to_string(),
    }
}

/// GeoIP enrichment is a production concern; the engine only keeps the raw
/// client ip alongside a timezone placeholder.
pub fn location_info(ip_address: &str) -> LocationInfo {
    LocationInfo {
        ip: ip_address.to_string(),
        country: None,
        city: None,
        timezone: "UTC".to_string(),
    }
}

fn browser(ua: &str) -> &'static str {
    // Edge and Chrome UAs both carry "Chrome"; Chrome UAs carry "Safari".
    if ua.contains("Edg") {
        "Edge"
    } else if ua.contains("Chrome") {
        "Chrome"
    } else if ua.contains("Firefox") {
        "Firefox"
    } else if ua.contains("Safari") {
        "Safari"
    } else {
        "Other"
    }
}

fn operating_system(ua: &str) -> &'static str {
    if ua.contains("Windows") {
        "Windows"
    } else if ua.contains("Android") {
        "Android"
    } else if ua.contains("iPhone") || ua.contains("iPad") || ua.contains("iOS") {
        "iOS"
    } else if ua.contains("Mac") {
        "macOS"
    } else if ua.contains("Linux") {
        "Linux"
    } else {
        "Other"
    }
}
