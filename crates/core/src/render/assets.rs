//! Embedded host pages and scripts for the browser sandbox.
//!
//! Files live in the crate's `assets/` directory and are compiled into the
//! binary with `rust-embed`, so the pipeline does not depend on files next
//! to the executable. With the `debug-embed` feature they are read from
//! disk in debug builds.

use rust_embed::RustEmbed;

#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/assets"]
pub struct HostAssets;

/// Get asset content by path.
pub fn get_asset(path: &str) -> Option<String> {
    HostAssets::get(path).map(|file| String::from_utf8_lossy(file.data.as_ref()).to_string())
}

fn asset_or_empty(path: &str) -> String {
    get_asset(path).unwrap_or_default()
}

/// Host page that loads the Mermaid library from `script_url`.
pub fn render_host_html(script_url: &str) -> String {
    asset_or_empty("render_host.html").replace("{{MERMAID_SCRIPT_URL}}", script_url)
}

/// Expression that waits for the library, renders `source` and resolves to
/// `{ success, svg, error }`.
pub fn render_script(source: &str, load_timeout_ms: u64) -> String {
    // A JSON string literal is a valid JS string literal
    let source_json = serde_json::Value::String(source.to_string()).to_string();
    asset_or_empty("render.js")
        .replace("{{LOAD_TIMEOUT_MS}}", &load_timeout_ms.to_string())
        .replace("{{SOURCE_JSON}}", &source_json)
}

/// Page that shows `document` centered with `padding` pixels on each side.
pub fn capture_host_html(document: &str, padding: u32) -> String {
    asset_or_empty("capture_host.html")
        .replace("{{PADDING}}", &padding.to_string())
        .replace("{{DOCUMENT}}", document)
}
