use super::Connector;
use mg_protocol::run_models::{AnimationManifest, AnimationStyle};
use std::fmt::Write;

/// `id` of the injected `<style>` element.
pub const STYLE_ELEMENT_ID: &str = "mermaid-gif-motion";

fn pulse_scale(style: AnimationStyle) -> Option<f64> {
    match style {
        AnimationStyle::Default => Some(1.02),
        AnimationStyle::Presentation => Some(1.05),
        AnimationStyle::Minimal => None,
    }
}

/// Builds the `<style>` element animating `connectors`.
pub(super) fn style_block(connectors: &[Connector], manifest: &AnimationManifest) -> String {
    let duration = manifest.duration;
    let mut css = String::new();

    for (index, connector) in connectors.iter().enumerate() {
        let _ = writeln!(
            css,
            "[data-flow-id=\"{id}\"] {{ stroke-dasharray: {dash:.3} {gap:.3} !important; \
             stroke-dashoffset: {length:.3}; animation: mg-flow-{index} {duration:.3}s linear infinite; }}",
            id = connector.flow_id,
            dash = connector.dash,
            gap = connector.gap,
            length = connector.length,
        );
        let _ = writeln!(
            css,
            "@keyframes mg-flow-{index} {{ from {{ stroke-dashoffset: {length:.3}; }} to {{ stroke-dashoffset: 0; }} }}",
            length = connector.length,
        );
    }

    if let Some(scale) = pulse_scale(manifest.style) {
        let _ = writeln!(
            css,
            ".node rect, .node circle, .node polygon, .node path {{ transform-box: fill-box; \
             transform-origin: center; animation: mg-pulse {duration:.3}s ease-in-out infinite; }}"
        );
        let _ = writeln!(
            css,
            "@keyframes mg-pulse {{ 0%, 100% {{ transform: scale(1); }} 50% {{ transform: scale({scale:.2}); }} }}"
        );
    }

    format!("<style id=\"{STYLE_ELEMENT_ID}\">\n{css}</style>")
}
