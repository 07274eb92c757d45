//! Service configuration.
//!
//! The shipper/consignee identity and trade metadata printed on every invoice
//! used to be constants baked into the page templates. They live in a JSON
//! config file instead so the composers stay data-driven; a built-in default
//! is used when no file is present.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// One party block as printed on the invoices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Party {
    pub name: String,
    pub company: String,
    /// Street/locality lines, printed in order.
    pub address_lines: Vec<String>,
    pub phone: String,
    #[serde(default)]
    pub email: String,
    /// GSTIN / tax registration, printed on the shipper block only.
    #[serde(default)]
    pub tax_id: String,
}

/// Fixed trade metadata for the summary invoice's key/value panel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeTerms {
    /// Short code prefixed to synthesized summary invoice numbers.
    pub sender_code: String,
    pub terms_of_trade: String,
    pub ad_code: String,
    pub iec: String,
    #[serde(default = "not_applicable")]
    pub place_of_receipt: String,
    #[serde(default = "not_applicable")]
    pub port_of_loading: String,
    #[serde(default = "not_applicable")]
    pub port_of_discharge: String,
    #[serde(default = "not_applicable")]
    pub reason_for_export: String,
    #[serde(default = "not_applicable")]
    pub place_of_supply: String,
}

fn not_applicable() -> String {
    "N/A".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub shipper: Party,
    pub consignee: Party,
    pub trade: TradeTerms,
    /// Directory the generated PDFs and archive are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("generated/invoices")
}

impl AppConfig {
    /// Load config from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;
        let config: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config: {:?}", path))?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise fall back to the built-in default.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let config = Self::load(path)?;
            info!("Loaded config from {:?}", path);
            Ok(config)
        } else {
            info!("No config at {:?}, using built-in default", path);
            Ok(create_default_config())
        }
    }
}

/// Built-in default matching the reference exporter identity.
pub fn create_default_config() -> AppConfig {
    AppConfig {
        shipper: Party {
            name: "Mitul Sanghvi".to_string(),
            company: "Fabrics and More".to_string(),
            address_lines: vec![
                "RAMANI COMPUND OPP HP PETROL".to_string(),
                "PUMP,SV ROAD".to_string(),
                "DAHISAR E".to_string(),
                "MUMBAI MH 400068 IN".to_string(),
            ],
            phone: "7021460762".to_string(),
            email: String::new(),
            tax_id: "27CTWPR7908H1ZQ".to_string(),
        },
        consignee: Party {
            name: "Cozy Corner Patios LLC".to_string(),
            company: "Cozy Corner Patios LLC".to_string(),
            address_lines: vec![
                "1499 W 120th Ave".to_string(),
                "Unit 110".to_string(),
                "Westminster CO 80241 US".to_string(),
            ],
            phone: "7206277225".to_string(),
            email: "cozycornerpatios@gmail.com".to_string(),
            tax_id: String::new(),
        },
        trade: TradeTerms {
            sender_code: "FAM".to_string(),
            terms_of_trade: "CIF".to_string(),
            ad_code: "6390614-291009".to_string(),
            iec: "CTWPR7908H".to_string(),
            place_of_receipt: not_applicable(),
            port_of_loading: not_applicable(),
            port_of_discharge: not_applicable(),
            reason_for_export: not_applicable(),
            place_of_supply: not_applicable(),
        },
        output_dir: default_output_dir(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_identity() {
        let config = create_default_config();
        assert_eq!(config.shipper.company, "Fabrics and More");
        assert_eq!(config.trade.sender_code, "FAM");
        assert!(!config.consignee.address_lines.is_empty());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = create_default_config();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.shipper.tax_id, config.shipper.tax_id);
        assert_eq!(parsed.output_dir, config.output_dir);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let json = r#"{
            "shipper": {"name": "A", "company": "B", "address_lines": [], "phone": ""},
            "consignee": {"name": "C", "company": "D", "address_lines": [], "phone": ""},
            "trade": {"sender_code": "XY", "terms_of_trade": "FOB", "ad_code": "1", "iec": "2"}
        }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.trade.place_of_supply, "N/A");
        assert_eq!(config.output_dir, default_output_dir());
    }
}
