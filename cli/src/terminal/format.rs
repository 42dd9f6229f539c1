use colored::*;
use motorlink_common::device::{DiscoveredDevice, ResponseBody};

use crate::terminal::colors;

pub type Detail = (String, ColoredString);

const PREVIEW_WIDTH: usize = 44;

pub fn device_to_details(device: &DiscoveredDevice, selected: bool) -> Vec<Detail> {
    let mut details: Vec<Detail> = vec![
        ("IPv4".to_string(), device.ip.to_string().color(colors::IPV4_ADDR)),
        (
            "Endpoint".to_string(),
            format!("{} {}", device.method, device.endpoint).color(colors::TEXT_DEFAULT),
        ),
        ("Reply".to_string(), response_preview(&device.response).dimmed()),
    ];

    if selected {
        details.push(("Role".to_string(), "auto-detected".color(colors::SELECTED).bold()));
    }

    details
}

/// One line of the body, cut to fit next to the tree.
pub fn response_preview(body: &ResponseBody) -> String {
    let flat: String = match body {
        ResponseBody::Json(value) => value.to_string(),
        ResponseBody::Text(text) => text.split_whitespace().collect::<Vec<_>>().join(" "),
    };

    if flat.chars().count() <= PREVIEW_WIDTH {
        return flat;
    }

    let cut: String = flat.chars().take(PREVIEW_WIDTH - 1).collect();
    format!("{cut}…")
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
