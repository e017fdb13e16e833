//! `no-insecure-transport`: plaintext `http://` and `ws://` endpoints.

use aegis_core::types::Severity;

use super::context::VisitContext;
use super::finding::{Finding, FindingSink};
use super::traits::{Rule, RuleCategory, RuleMeta};
use crate::tree::NodeKind;

pub static META: RuleMeta = RuleMeta {
    id: "no-insecure-transport",
    category: RuleCategory::Transport,
    default_severity: Severity::Warning,
    description: "Network endpoints must use TLS (https://, wss://).",
    messages: &[
        ("httpDetected", "Insecure HTTP URL '{url}'; use https:// instead."),
        ("wsDetected", "Insecure WebSocket URL '{url}'; use wss:// instead."),
    ],
    whole_program: false,
};

/// XML namespace identifiers look like URLs but are never fetched.
const NAMESPACE_PREFIXES: &[&str] = &["http://www.w3.org/", "http://schemas.xmlsoap.org/"];

const MAX_URL_DISPLAY: usize = 80;

pub struct NoInsecureTransport;

fn starts_with_ci(text: &str, prefix: &str) -> bool {
    text.len() >= prefix.len()
        && text.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

fn display_url(text: &str) -> String {
    let url = text.split_whitespace().next().unwrap_or(text);
    if url.chars().count() > MAX_URL_DISPLAY {
        let mut short: String = url.chars().take(MAX_URL_DISPLAY).collect();
        short.push('…');
        short
    } else {
        url.to_string()
    }
}

impl Rule for NoInsecureTransport {
    fn meta(&self) -> &'static RuleMeta {
        &META
    }

    fn node_kinds(&self) -> &'static [NodeKind] {
        &[NodeKind::StringLiteral, NodeKind::TemplateLiteral]
    }

    fn visit(&self, ctx: &VisitContext<'_>, sink: &mut FindingSink) {
        let Some(text) = ctx.text() else {
            return;
        };
        let text = text.trim_start();

        let message_id = if starts_with_ci(text, "http://") {
            if NAMESPACE_PREFIXES.iter().any(|p| starts_with_ci(text, p)) {
                return;
            }
            "httpDetected"
        } else if starts_with_ci(text, "ws://") {
            "wsDetected"
        } else {
            return;
        };

        // A literal passed straight to a call is reported on the call.
        let span = match ctx.direct_call_parent() {
            Some(call) => ctx.tree.span(call),
            None => ctx.span(),
        };
        let fix = if message_id == "httpDetected" {
            "Use https://"
        } else {
            "Use wss://"
        };
        sink.report(
            Finding::new(message_id, span)
                .with("url", display_url(text))
                .fix(fix),
        );
    }
}
