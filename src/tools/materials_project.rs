//! Materials Project summary lookup (DFT-calculated properties).

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::Tool;
use crate::core::config::service::{get_str, get_u64};
use crate::core::errors::AppError;

const API_BASE: &str = "https://api.materialsproject.org";

const SUMMARY_FIELDS: &str = "material_id,formula_pretty,band_gap,formation_energy_per_atom,\
                              energy_per_atom,is_stable,symmetry,density,volume,nsites,elements";

pub struct MaterialsProjectTool {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl MaterialsProjectTool {
    pub fn new(config: &Value) -> Self {
        let timeout = get_u64(config, &["tools", "materials_project_timeout_secs"], 30);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key: get_str(config, &["secrets", "materials_project_api_key"])
                .map(|s| s.to_string())
                .filter(|s| !s.trim().is_empty()),
            base_url: API_BASE.to_string(),
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch_summary(&self, formula: &str, api_key: &str) -> Result<Value, AppError> {
        let url = format!(
            "{}/materials/summary/?formula={}&_fields={}",
            self.base_url,
            urlencoding::encode(formula),
            SUMMARY_FIELDS
        );

        let response = self
            .client
            .get(&url)
            .header("X-API-KEY", api_key)
            .send()
            .await
            .map_err(|err| AppError::Unavailable(format!("Materials Project request failed: {}", err)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Unavailable(format!(
                "Materials Project returned HTTP {}",
                status
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|err| AppError::Internal(format!("Invalid Materials Project response: {}", err)))
    }
}

#[async_trait]
impl Tool for MaterialsProjectTool {
    fn name(&self) -> &str {
        "materials_project"
    }

    fn description(&self) -> &str {
        "Look up DFT-calculated properties from the Materials Project database. Input: an exact \
         chemical formula (e.g. \"Cu2O\"), optionally followed by \"property:<name>\" \
         (e.g. \"Cu2O property:band_gap\")."
    }

    async fn call(&self, input: &str) -> Result<String, AppError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(
                "Materials Project API key is not configured. Set MATERIALS_PROJECT_API_KEY or \
                 add secrets.materials_project_api_key to secrets.yml."
                    .to_string(),
            );
        };

        let Some(query) = parse_input(input) else {
            return Ok(
                "Error: provide a chemical formula, e.g. \"Cu2O\" or \"Cu2O property:band_gap\"."
                    .to_string(),
            );
        };

        let body = self.fetch_summary(&query.formula, api_key).await?;
        Ok(format_summary(&query, &body))
    }
}

#[derive(Debug, PartialEq)]
pub struct MaterialsQuery {
    pub formula: String,
    pub property: Option<String>,
}

/// Parse "Formula" or "Formula property:name" (order-insensitive).
pub fn parse_input(input: &str) -> Option<MaterialsQuery> {
    let mut formula = None;
    let mut property = None;

    for token in input.split_whitespace() {
        if let Some(name) = token.strip_prefix("property:") {
            if !name.is_empty() {
                property = Some(name.to_lowercase());
            }
        } else if formula.is_none() {
            formula = Some(token.trim_matches(|c| c == '"' || c == '\'').to_string());
        }
    }

    formula
        .filter(|f| !f.is_empty())
        .map(|formula| MaterialsQuery { formula, property })
}

/// Pick the most relevant entry and render it. Stable entries win; ties
/// break on lowest formation energy per atom.
pub fn format_summary(query: &MaterialsQuery, body: &Value) -> String {
    let empty = Vec::new();
    let entries = body
        .get("data")
        .and_then(|d| d.as_array())
        .unwrap_or(&empty);

    if entries.is_empty() {
        return format!(
            "No Materials Project entries found for formula '{}'. Check the formula spelling \
             (element symbols are case-sensitive).",
            query.formula
        );
    }

    let best = select_best(entries);
    let mut lines = vec![format!(
        "Materials Project data for {} ({} entr{} found, showing the most stable):",
        query.formula,
        entries.len(),
        if entries.len() == 1 { "y" } else { "ies" }
    )];

    if let Some(property) = &query.property {
        match best.get(property.as_str()) {
            Some(value) if !value.is_null() => {
                lines.push(format!("Requested {}: {}", property, render_value(value)));
            }
            _ => {
                lines.push(format!(
                    "Requested property '{}' is not available for this entry.",
                    property
                ));
            }
        }
    }

    for (label, key) in [
        ("material_id", "material_id"),
        ("formula", "formula_pretty"),
        ("band_gap (eV)", "band_gap"),
        ("formation_energy_per_atom (eV/atom)", "formation_energy_per_atom"),
        ("energy_per_atom (eV/atom)", "energy_per_atom"),
        ("is_stable", "is_stable"),
        ("density (g/cm^3)", "density"),
        ("volume (A^3)", "volume"),
        ("nsites", "nsites"),
        ("elements", "elements"),
    ] {
        if let Some(value) = best.get(key) {
            if !value.is_null() {
                lines.push(format!("{}: {}", label, render_value(value)));
            }
        }
    }

    if let Some(symmetry) = best.get("symmetry") {
        if let Some(system) = symmetry.get("crystal_system").and_then(|s| s.as_str()) {
            lines.push(format!("crystal system: {}", system));
        }
        if let Some(symbol) = symmetry.get("symbol").and_then(|s| s.as_str()) {
            lines.push(format!("space group: {}", symbol));
        }
    }

    lines.push("Note: DFT-calculated values, not experimental measurements.".to_string());
    lines.join("\n")
}

fn select_best(entries: &[Value]) -> &Value {
    let mut best = &entries[0];
    let mut best_key = sort_key(best);

    for entry in &entries[1..] {
        let key = sort_key(entry);
        if key < best_key {
            best = entry;
            best_key = key;
        }
    }

    best
}

/// (unstable-flag, formation energy): stable first, then lowest energy.
fn sort_key(entry: &Value) -> (bool, f64) {
    let unstable = !entry
        .get("is_stable")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let formation_energy = entry
        .get("formation_energy_per_atom")
        .and_then(|v| v.as_f64())
        .unwrap_or(f64::MAX);
    (unstable, formation_energy)
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(render_value)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}
