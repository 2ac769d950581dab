// crates/research-providers/src/seed_list.rs
// ============================================================================
// Module: Seed List Provider
// Description: Paste and CSV seed ingestion into discovery payloads.
// Purpose: Turn user-supplied company lists into the common payload schema.
// Dependencies: csv, research-core, serde
// ============================================================================

//! ## Overview
//! The seed-list provider accepts two request modes: `paste` (structured
//! items) and `csv` (a CSV document with name/url/location columns). URLs
//! canonicalize through the engine canonicalizer, evidence entries are built
//! per URL, and the company list sorts case-insensitively before hashing so
//! the same seed list always lands on one content hash.

// ============================================================================
// SECTION: Imports
// ============================================================================

use research_core::DiscoveryCompany;
use research_core::DiscoveryEvidence;
use research_core::DiscoveryPayload;
use research_core::DiscoveryRunContext;
use research_core::EngineError;
use research_core::ProviderResult;
use research_core::canonicalize;
use research_core::interfaces::DiscoveryProvider;
use research_core::interfaces::ProviderContext;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Request Schema
// ============================================================================

/// Evidence entry supplied with a seed item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SeedEvidence {
    /// Evidence URL.
    pub url: String,
    /// Human-readable label.
    #[serde(default)]
    pub label: Option<String>,
    /// Evidence kind.
    #[serde(default)]
    pub kind: Option<String>,
    /// Evidence snippet.
    #[serde(default)]
    pub snippet: Option<String>,
}

/// One pasted seed item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SeedItem {
    /// Company name.
    pub name: String,
    /// Primary website URL.
    #[serde(default)]
    pub website_url: Option<String>,
    /// Additional URLs.
    #[serde(default)]
    pub urls: Vec<String>,
    /// Headquarters country.
    #[serde(default)]
    pub hq_country: Option<String>,
    /// Headquarters city.
    #[serde(default)]
    pub hq_city: Option<String>,
    /// Sector classification.
    #[serde(default)]
    pub sector: Option<String>,
    /// Subsector classification.
    #[serde(default)]
    pub subsector: Option<String>,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Evidence entries.
    #[serde(default)]
    pub evidence: Vec<SeedEvidence>,
}

/// Seed-list provider request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SeedListRequest {
    /// Request mode: `paste` (default) or `csv`.
    #[serde(default)]
    pub mode: Option<String>,
    /// Items for paste mode.
    #[serde(default)]
    pub items: Vec<SeedItem>,
    /// CSV document for csv mode.
    #[serde(default)]
    pub csv_text: Option<String>,
    /// Label recorded on generated evidence.
    #[serde(default)]
    pub source_label: Option<String>,
    /// Free-form notes echoed in the run context.
    #[serde(default)]
    pub notes: Option<String>,
}

// ============================================================================
// SECTION: Provider
// ============================================================================

/// Stable provider key.
pub const KEY: &str = "seed_list";
/// Model label carried in payloads.
const MODEL: &str = "seed_list_v1";

/// Provider ingesting pasted or CSV seed lists.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeedListProvider;

impl SeedListProvider {
    /// Creates the provider.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl DiscoveryProvider for SeedListProvider {
    fn key(&self) -> &str {
        KEY
    }

    fn version(&self) -> &str {
        "1"
    }

    fn run(&self, _ctx: &ProviderContext, request: &Value) -> Result<ProviderResult, EngineError> {
        let request: SeedListRequest = serde_json::from_value(request.clone())
            .map_err(|err| EngineError::Validation(format!("seed list request: {err}")))?;
        let mode = request.mode.clone().unwrap_or_else(|| "paste".to_string());

        let (companies, raw_text) = if mode == "csv" && request.csv_text.is_some() {
            let csv_text = request.csv_text.clone().unwrap_or_default();
            (
                parse_csv(&csv_text, request.source_label.as_deref())?,
                csv_text,
            )
        } else {
            let raw = serde_json::to_string(&request)
                .map_err(|err| EngineError::Validation(err.to_string()))?;
            (parse_paste(&request), raw)
        };

        let mut payload = DiscoveryPayload::new(KEY, Some(MODEL.to_string()));
        payload.run_context = Some(DiscoveryRunContext {
            query: Some(format!("seed_list:{mode}")),
            geo: Vec::new(),
            industry: Vec::new(),
            notes: request.notes.clone(),
        });
        payload.companies = companies;
        payload.sort_companies();

        Ok(ProviderResult {
            payload: Some(payload),
            provider: KEY.to_string(),
            model: Some(MODEL.to_string()),
            version: "1".to_string(),
            source_type: Some("provider_json".to_string()),
            raw_input_text: Some(raw_text),
            raw_input_meta: Some(json!({
                "mode": mode,
                "source_label": request.source_label,
            })),
            envelope: None,
            error: None,
        })
    }
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Normalizes optional text: trimmed, empty becomes none.
fn normalize_text(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|text| !text.is_empty()).map(ToString::to_string)
}

/// Canonicalizes a URL, falling back to the trimmed input.
fn normalize_url(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    canonicalize(trimmed, "http").ok().or_else(|| Some(trimmed.to_string()))
}

/// Parses paste-mode items.
fn parse_paste(request: &SeedListRequest) -> Vec<DiscoveryCompany> {
    let mut companies = Vec::new();
    for item in &request.items {
        let Some(name) = normalize_text(Some(&item.name)) else {
            continue;
        };

        let mut urls: Vec<String> = Vec::new();
        if let Some(url) = item.website_url.as_deref().and_then(normalize_url_opt) {
            urls.push(url);
        }
        for url in &item.urls {
            if let Some(url) = normalize_url(url)
                && !urls.contains(&url)
            {
                urls.push(url);
            }
        }

        let mut evidence = Vec::new();
        for entry in &item.evidence {
            let Some(url) = normalize_url(&entry.url) else {
                continue;
            };
            evidence.push(DiscoveryEvidence {
                url,
                label: normalize_text(entry.label.as_deref())
                    .or_else(|| request.source_label.clone())
                    .or_else(|| Some("Seed list".to_string())),
                kind: entry.kind.clone().or_else(|| Some("homepage".to_string())),
                snippet: normalize_text(entry.snippet.as_deref()),
            });
        }
        for url in &urls {
            evidence.push(DiscoveryEvidence {
                url: url.clone(),
                label: request.source_label.clone().or_else(|| Some("Seed list".to_string())),
                kind: Some("homepage".to_string()),
                snippet: normalize_text(item.description.as_deref()),
            });
        }

        companies.push(DiscoveryCompany {
            name,
            website_url: urls.first().cloned(),
            hq_country: normalize_text(item.hq_country.as_deref()),
            hq_city: normalize_text(item.hq_city.as_deref()),
            sector: normalize_text(item.sector.as_deref()),
            subsector: normalize_text(item.subsector.as_deref()),
            description: normalize_text(item.description.as_deref()),
            confidence: None,
            evidence,
        });
    }
    companies
}

/// Adapter making `normalize_url` usable with `Option::and_then`.
fn normalize_url_opt(value: &str) -> Option<String> {
    normalize_url(value)
}

/// Parses csv-mode documents.
fn parse_csv(
    csv_text: &str,
    source_label: Option<&str>,
) -> Result<Vec<DiscoveryCompany>, EngineError> {
    let normalized = csv_text.trim();
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(normalized.as_bytes());
    let headers = reader
        .headers()
        .map_err(|err| EngineError::Validation(format!("seed csv headers: {err}")))?
        .clone();
    let column = |name: &str| headers.iter().position(|header| header.eq_ignore_ascii_case(name));
    let name_col = column("name");
    let url_col = column("url").or_else(|| column("website_url"));
    let country_col = column("hq_country");
    let city_col = column("hq_city");
    let sector_col = column("sector");
    let subsector_col = column("subsector");
    let description_col = column("description");
    let label_col = column("label");

    let mut companies = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|err| EngineError::Validation(format!("seed csv row: {err}")))?;
        let field = |col: Option<usize>| col.and_then(|idx| record.get(idx)).map(str::trim);
        let Some(name) = field(name_col).filter(|name| !name.is_empty()) else {
            continue;
        };
        let url = field(url_col).and_then(normalize_url_opt);
        let description = normalize_text(field(description_col));

        let mut evidence = Vec::new();
        if let Some(url) = &url {
            evidence.push(DiscoveryEvidence {
                url: url.clone(),
                label: normalize_text(field(label_col))
                    .or_else(|| source_label.map(ToString::to_string))
                    .or_else(|| Some("Seed list".to_string())),
                kind: Some("homepage".to_string()),
                snippet: description.clone(),
            });
        }

        companies.push(DiscoveryCompany {
            name: name.to_string(),
            website_url: url,
            hq_country: normalize_text(field(country_col)),
            hq_city: normalize_text(field(city_col)),
            sector: normalize_text(field(sector_col)),
            subsector: normalize_text(field(subsector_col)),
            description,
            confidence: None,
            evidence,
        });
    }
    Ok(companies)
}
