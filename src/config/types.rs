use serde::Deserialize;

use crate::args::{HttpMethod, OutputFormat};

/// Contents of `volley.toml` / `volley.json`. Every field is optional; flags
/// and `VOLLEY_*` variables win over the file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub url: Option<String>,
    pub method: Option<HttpMethod>,
    pub payload: Option<serde_json::Value>,
    #[serde(alias = "authHeader")]
    pub auth_header: Option<String>,
    #[serde(alias = "totalRequests")]
    pub requests: Option<u64>,
    pub concurrency: Option<u64>,
    pub output_format: Option<OutputFormat>,
    pub export_json: Option<String>,
}
