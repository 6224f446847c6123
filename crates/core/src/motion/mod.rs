//! Motion injection for rendered diagrams.
//!
//! Every connector (flowchart link, class relation, state transition, ER
//! relationship, sequence message) gets a dash pattern proportional to its
//! own length and a `stroke-dashoffset` animation whose cycle equals the
//! manifest duration. With dash = 0.15 L and gap = 0.05 L, one offset sweep
//! from L to 0 moves exactly five dash periods, so the last frame of a
//! cycle matches the first and the loop is seamless on every edge.
//!
//! Injection is plain text editing of the SVG markup: each connector gets a
//! `data-flow-id` attribute and a `<style>` block is inserted right after
//! the `<svg>` root tag.

pub mod geometry;
mod styles;

use lazy_static::lazy_static;
use mg_protocol::run_models::AnimationManifest;
use regex::Regex;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info, warn};

pub use styles::STYLE_ELEMENT_ID;

/// Fraction of the connector length drawn as dash.
pub const DASH_RATIO: f64 = 0.15;
/// Fraction of the connector length left as gap.
pub const GAP_RATIO: f64 = 0.05;
/// Connectors shorter than this are not animated.
const MIN_LENGTH: f64 = 0.5;

/// Class tokens marking connector elements across diagram families.
const CONNECTOR_CLASSES: &[&str] = &[
    "flowchart-link",
    "relation",
    "transition",
    "relationshipLine",
];
const CONNECTOR_CLASS_PREFIXES: &[&str] = &["messageLine"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MotionError {
    #[error("document has no <svg> root element")]
    NoSvgRoot,
    #[error("no animatable connectors found in the document")]
    NoConnectors,
}

/// One animated connector.
#[derive(Debug, Clone, PartialEq)]
pub struct Connector {
    pub flow_id: String,
    pub length: f64,
    pub dash: f64,
    pub gap: f64,
}

/// Result of a successful injection.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedDocument {
    pub markup: String,
    pub connectors: Vec<Connector>,
}

lazy_static! {
    /// Opening tag of a `<path>` or `<line>` element.
    static ref ELEMENT: Regex = Regex::new(r"<(path|line)\b[^>]*>").unwrap();

    /// `name="value"` or `name='value'` attribute pair.
    static ref ATTRIBUTE: Regex =
        Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap();

    static ref SVG_ROOT: Regex = Regex::new(r"<svg\b[^>]*>").unwrap();
}

fn attributes(tag: &str) -> HashMap<&str, &str> {
    ATTRIBUTE
        .captures_iter(tag)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str();
            let value = caps.get(2).or_else(|| caps.get(3))?.as_str();
            Some((name, value))
        })
        .collect()
}

fn is_connector(class_attr: &str) -> bool {
    class_attr.split_whitespace().any(|token| {
        CONNECTOR_CLASSES.contains(&token)
            || CONNECTOR_CLASS_PREFIXES
                .iter()
                .any(|prefix| token.starts_with(prefix))
    })
}

fn number(attrs: &HashMap<&str, &str>, name: &str) -> f64 {
    attrs
        .get(name)
        .and_then(|v| v.trim().trim_end_matches("px").parse().ok())
        .unwrap_or(0.0)
}

/// Measures an element, or `None` when it is not a measurable connector.
fn connector_length(element: &str, tag: &str) -> Option<f64> {
    let attrs = attributes(tag);
    if !is_connector(attrs.get("class").copied().unwrap_or_default()) {
        return None;
    }

    match element {
        "path" => {
            let d = attrs.get("d")?;
            let length = geometry::path_length(d);
            if length.is_none() {
                warn!(d = %d, "skipping connector with unparseable path data");
            }
            length
        }
        _ => Some(geometry::line_length(
            number(&attrs, "x1"),
            number(&attrs, "y1"),
            number(&attrs, "x2"),
            number(&attrs, "y2"),
        )),
    }
}

/// Injects flow animation into `svg` according to `manifest`.
///
/// Fails with [`MotionError::NoConnectors`] when nothing in the document
/// can be animated.
pub fn inject_motion(
    svg: &str,
    manifest: &AnimationManifest,
) -> Result<AnnotatedDocument, MotionError> {
    let root = SVG_ROOT.find(svg).ok_or(MotionError::NoSvgRoot)?;

    let mut markup = String::with_capacity(svg.len() + 1024);
    let mut connectors = Vec::new();
    let mut cursor = 0;

    for caps in ELEMENT.captures_iter(svg) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let Some(length) = connector_length(name.as_str(), whole.as_str()) else {
            continue;
        };
        if !length.is_finite() || length < MIN_LENGTH {
            debug!(length, "skipping degenerate connector");
            continue;
        }

        let flow_id = format!("flow-{}", connectors.len());
        // Insert the marker attribute right after the tag name
        markup.push_str(&svg[cursor..name.end()]);
        markup.push_str(&format!(" data-flow-id=\"{flow_id}\""));
        cursor = name.end();

        connectors.push(Connector {
            flow_id,
            length,
            dash: length * DASH_RATIO,
            gap: length * GAP_RATIO,
        });
    }
    markup.push_str(&svg[cursor..]);

    if connectors.is_empty() {
        return Err(MotionError::NoConnectors);
    }

    // The root tag precedes every connector, so its offset is unchanged
    let style = styles::style_block(&connectors, manifest);
    markup.insert_str(root.end(), &style);

    info!(
        connectors = connectors.len(),
        duration = manifest.duration,
        style = %manifest.style,
        "motion injected"
    );
    Ok(AnnotatedDocument { markup, connectors })
}
