use colored::*;
use indicatif::ProgressStyle;
use tracing::{Span, info_span};
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::terminal::colors;

const TICK_STRINGS: &[&str] = &[
    "▁▁▁▁▁",
    "▁▂▂▂▁",
    "▁▄▂▄▁",
    "▂▄▆▄▂",
    "▄▆█▆▄",
    "▂▄▆▄▂",
    "▁▄▂▄▁",
    "▁▂▂▂▁",
];

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.blue} {msg} {elapsed:.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(TICK_STRINGS)
}

/// A span that renders as a spinner while a sweep runs inside it.
pub fn discovery_span() -> Span {
    let span = info_span!("discovery", indicatif.pb_show = true);
    span.pb_set_style(&spinner_style());
    span.pb_set_message(&format!("{}", "Sweeping for motor controllers...".color(colors::TEXT_DEFAULT)));
    span
}

pub fn report_discovery_progress(span: &Span, count: usize) {
    let noun = if count == 1 { "response" } else { "responses" };
    span.pb_set_message(&format!(
        "{}",
        format!(
            "Identified {} so far...",
            format!("{count} qualifying {noun}").green().bold()
        )
        .color(colors::TEXT_DEFAULT)
    ));
}
