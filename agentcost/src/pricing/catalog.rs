//! Baseline pricing catalog.
//!
//! A catalog entry is the seed for a `default`-origin price quote plus an
//! optional `downgrade_to` hint naming a cheaper model the optimizer may
//! suggest. The built-in catalog ships embedded in the binary; deployments
//! can point `pricing.catalog_url` at a JSON document of the same shape to
//! track an external source, with the embedded copy as fallback.

use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};
use url::Url;

/// One model's baseline pricing and downgrade hint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub model_name: String,
    pub provider: Option<String>,
    pub input_price_per_token: Decimal,
    pub output_price_per_token: Decimal,
    #[serde(default)]
    pub downgrade_to: Option<String>,
}

static BUILTIN_CATALOG: Lazy<Vec<CatalogEntry>> = Lazy::new(|| {
    serde_json::from_str(include_str!("default_catalog.json")).expect("embedded default catalog is valid JSON")
});

/// The catalog compiled into the binary.
pub fn builtin() -> &'static [CatalogEntry] {
    &BUILTIN_CATALOG
}

/// Fetch a catalog from a remote URL, falling back to the embedded copy on
/// any failure. The remote document must be a JSON array of entries in the
/// same shape as `default_catalog.json`.
#[instrument(skip_all, fields(url = %url))]
pub async fn fetch_or_builtin(url: &Url) -> Vec<CatalogEntry> {
    match fetch(url).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!("failed to fetch remote pricing catalog, using embedded defaults: {e:#}");
            builtin().to_vec()
        }
    }
}

async fn fetch(url: &Url) -> anyhow::Result<Vec<CatalogEntry>> {
    let response = reqwest::get(url.clone()).await?.error_for_status()?;
    let entries: Vec<CatalogEntry> = response.json().await?;
    anyhow::ensure!(!entries.is_empty(), "remote catalog is empty");
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_parses_and_is_nonempty() {
        let catalog = builtin();
        assert!(!catalog.is_empty());
        assert!(catalog.iter().any(|e| e.model_name == "gpt-4"));
    }

    #[test]
    fn downgrade_hints_point_at_models_in_the_catalog() {
        let catalog = builtin();
        for entry in catalog {
            if let Some(target) = &entry.downgrade_to {
                assert!(
                    catalog.iter().any(|e| &e.model_name == target),
                    "{} names unknown downgrade target {target}",
                    entry.model_name
                );
            }
        }
    }

    #[test]
    fn downgrade_targets_are_cheaper() {
        let catalog = builtin();
        for entry in catalog {
            if let Some(target) = &entry.downgrade_to {
                let target = catalog.iter().find(|e| &e.model_name == target).unwrap();
                assert!(
                    target.output_price_per_token < entry.output_price_per_token,
                    "{} downgrade target is not cheaper",
                    entry.model_name
                );
            }
        }
    }
}
