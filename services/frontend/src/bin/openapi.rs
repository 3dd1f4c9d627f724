//! services/frontend/src/bin/openapi.rs
//!
//! Writes the OpenAPI document of the leaf-scan view API: the detection
//! workspace (file selection, camera control, submission), preview bytes,
//! disease articles, and the history page and CSV export.
//!
//! Usage: `openapi [PATH]`, defaulting to `openapi.json`.

use frontend_lib::web::rest::ApiDoc;
use utoipa::OpenApi;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "openapi.json".to_string());
    let document = ApiDoc::openapi().to_pretty_json()?;
    std::fs::write(&path, document)?;
    println!("Leaf-scan view API document written to {}", path);
    Ok(())
}
