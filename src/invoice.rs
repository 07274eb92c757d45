//! Row normalization: raw sheet rows into fully-defaulted invoice records.
//!
//! Pure functions, no I/O. Every field has a default substitute, so
//! normalization never fails on missing or malformed input — it degrades.

use chrono::NaiveDate;

use crate::sheet::RawRecord;

// Column names expected in the uploaded table (case-sensitive, matching the
// reference workbook layout). Absent columns fall back to defaults.
pub const COL_INVOICE_NUMBER: &str = "Invoice Number";
pub const COL_AWB_NUMBER: &str = "House AWB No.";
pub const COL_EXPORT_REFERENCE: &str = "Reference_1";
pub const COL_INVOICE_DATE: &str = "Invoice Date";
pub const COL_RECIPIENT_NAME: &str = "Recipient_Contact Name";
pub const COL_RECIPIENT_ADDRESS1: &str = "Recipient_Address Line 1";
pub const COL_RECIPIENT_ADDRESS2: &str = "Recipient_Address Line 2";
pub const COL_RECIPIENT_CITY: &str = "Recipient_City";
pub const COL_RECIPIENT_STATE: &str = "Recipient_State";
pub const COL_RECIPIENT_POSTAL: &str = "Recipient_Postal code";
pub const COL_RECIPIENT_COUNTRY: &str = "Recipient_Country";
pub const COL_RECIPIENT_PHONE: &str = "Recipient_Phone Number";
pub const COL_RECIPIENT_EMAIL: &str = "Recipient_Email";
pub const COL_COMMODITY: &str = "COMMODITY";
pub const COL_ORIGIN_STATE: &str = "St. of Origin of goods";
pub const COL_ORIGIN_DISTRICT: &str = "Dis. Of Origin of goods";
pub const COL_HS_CODE: &str = "HS CODE 1";
pub const COL_COUNTRY_OF_MANUFACTURE: &str = "Country of Manufacture";
pub const COL_NET_WEIGHT: &str = "UNIT_Weight 1";
pub const COL_QUANTITY: &str = "QUANTITY 1";
pub const COL_UOM: &str = "UOM1";
pub const COL_UNIT_VALUE: &str = "UNIT_VALUE 1";
pub const COL_INVOICE_VALUE: &str = "Invoice Value";
pub const COL_CURRENCY: &str = "CURRENCY";
pub const COL_FREIGHT_CHARGES: &str = "Freight_charges";
pub const COL_SHIPMENT_WEIGHT: &str = "Total Shipment weight";

/// Identifier-like columns that get the trailing-".0" spreadsheet artifact strip.
pub const IDENTIFIER_COLUMNS: &[&str] = &[
    COL_INVOICE_NUMBER,
    COL_RECIPIENT_POSTAL,
    COL_EXPORT_REFERENCE,
    COL_AWB_NUMBER,
];

/// One fully-defaulted invoice row, ready for document composition.
#[derive(Debug, Clone)]
pub struct NormalizedInvoiceRow {
    pub invoice_number: String,
    pub awb_number: String,
    pub export_reference: String,
    /// Canonical "DD Mon YY" display form.
    pub invoice_date: String,

    pub recipient_name: String,
    pub recipient_address1: String,
    pub recipient_address2: String,
    pub recipient_city: String,
    pub recipient_state: String,
    pub recipient_postal_code: String,
    pub recipient_country_code: String,
    pub recipient_phone: String,
    pub recipient_email: String,

    pub description: String,
    pub origin_state: String,
    pub origin_district: String,
    pub hs_code: String,
    pub manufacture_country: String,
    pub net_weight: f64,
    pub quantity: i64,
    pub unit_of_measure: String,
    pub unit_value: f64,
    pub invoice_value: f64,
    pub currency_code: String,
    pub freight_charges: f64,
    /// Per-row weight used by the summary document (distinct from the
    /// per-item net weight on the child invoice).
    pub shipment_weight: f64,
}

impl NormalizedInvoiceRow {
    pub fn total_invoice_amount(&self) -> f64 {
        self.invoice_value + self.freight_charges
    }

    /// Recipient address lines with empty lines filtered out.
    pub fn recipient_address_lines(&self) -> Vec<String> {
        let city_line = format!(
            "{} {} {} {}",
            self.recipient_city,
            self.recipient_state,
            self.recipient_postal_code,
            self.recipient_country_code
        )
        .trim()
        .to_string();

        [
            self.recipient_address1.clone(),
            self.recipient_address2.clone(),
            city_line,
        ]
        .into_iter()
        .filter(|line| !line.is_empty())
        .collect()
    }
}

/// Field accessor with default substitution.
fn text_field(record: &RawRecord<'_>, name: &str, default: &str) -> String {
    record
        .field(name)
        .map(|v| v.to_string())
        .unwrap_or_else(|| default.to_string())
}

/// Numeric coercion falls back to the default on parse failure.
fn float_field(record: &RawRecord<'_>, name: &str, default: f64) -> f64 {
    record
        .field(name)
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(default)
}

fn int_field(record: &RawRecord<'_>, name: &str, default: i64) -> i64 {
    record
        .field(name)
        .and_then(|v| {
            // Quantities sometimes arrive as "3.0"
            v.parse::<i64>().ok().or_else(|| {
                v.parse::<f64>()
                    .ok()
                    .filter(|f| f.fract() == 0.0)
                    .map(|f| f as i64)
            })
        })
        .unwrap_or(default)
}

/// Take the substring before the first '-'. "US-United States" -> "US";
/// values without a '-' pass through unchanged.
pub fn truncate_code(value: &str) -> &str {
    value.split('-').next().unwrap_or(value)
}

/// Strip a literal "-INDIA" suffix if present. Exact-string match only:
/// "CHINA-INDIA" -> "CHINA", but "INDIA" stays "INDIA".
pub fn strip_india_suffix(value: &str) -> &str {
    value.strip_suffix("-INDIA").unwrap_or(value)
}

/// Format a date encoded as the decimal number M(M)DDYYYY into "DD Mon YY".
/// Missing, non-numeric, or non-calendar input yields `today` instead.
pub fn format_invoice_date(raw: Option<&str>, today: NaiveDate) -> String {
    let fallback = today.format("%d %b %y").to_string();

    let Some(raw) = raw else {
        return fallback;
    };
    // Excel may deliver "5092025.0"; go through f64 to tolerate it.
    let Some(numeric) = raw
        .parse::<i64>()
        .ok()
        .or_else(|| raw.parse::<f64>().ok().map(|f| f as i64))
    else {
        return fallback;
    };

    let mut digits = numeric.to_string();
    if digits.len() == 7 {
        digits.insert(0, '0');
    }
    if digits.len() != 8 {
        return fallback;
    }

    let (Ok(month), Ok(day), Ok(year)) = (
        digits[0..2].parse::<u32>(),
        digits[2..4].parse::<u32>(),
        digits[4..8].parse::<i32>(),
    ) else {
        return fallback;
    };

    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(date) => date.format("%d %b %y").to_string(),
        None => fallback,
    }
}

/// Derive a filesystem-safe PDF filename from the AWB number, falling back to
/// the invoice number when the AWB is absent or the "N/A" placeholder.
pub fn derive_filename(awb_number: &str, invoice_number: &str) -> String {
    if !awb_number.is_empty() && awb_number != "N/A" {
        let base: String = awb_number.replace(['/', '\\'], "_");
        format!("{}.pdf", base)
    } else {
        format!("invoice_{}.pdf", invoice_number)
    }
}

/// Normalize one raw row. Never fails; every field degrades to its default.
pub fn normalize(record: &RawRecord<'_>, today: NaiveDate) -> NormalizedInvoiceRow {
    let country_raw = text_field(record, COL_RECIPIENT_COUNTRY, "");
    let currency_raw = text_field(record, COL_CURRENCY, "USD");
    let manufacture_raw = text_field(record, COL_COUNTRY_OF_MANUFACTURE, "");

    NormalizedInvoiceRow {
        invoice_number: text_field(record, COL_INVOICE_NUMBER, ""),
        awb_number: text_field(record, COL_AWB_NUMBER, "N/A"),
        export_reference: text_field(record, COL_EXPORT_REFERENCE, ""),
        invoice_date: format_invoice_date(record.field(COL_INVOICE_DATE), today),

        recipient_name: text_field(record, COL_RECIPIENT_NAME, ""),
        recipient_address1: text_field(record, COL_RECIPIENT_ADDRESS1, ""),
        recipient_address2: text_field(record, COL_RECIPIENT_ADDRESS2, ""),
        recipient_city: text_field(record, COL_RECIPIENT_CITY, ""),
        recipient_state: text_field(record, COL_RECIPIENT_STATE, ""),
        recipient_postal_code: text_field(record, COL_RECIPIENT_POSTAL, ""),
        recipient_country_code: truncate_code(&country_raw).to_string(),
        recipient_phone: text_field(record, COL_RECIPIENT_PHONE, ""),
        recipient_email: text_field(record, COL_RECIPIENT_EMAIL, ""),

        description: text_field(record, COL_COMMODITY, ""),
        origin_state: text_field(record, COL_ORIGIN_STATE, ""),
        origin_district: text_field(record, COL_ORIGIN_DISTRICT, ""),
        hs_code: text_field(record, COL_HS_CODE, ""),
        manufacture_country: strip_india_suffix(&manufacture_raw).to_string(),
        net_weight: float_field(record, COL_NET_WEIGHT, 0.0).max(0.0),
        quantity: int_field(record, COL_QUANTITY, 0).max(0),
        unit_of_measure: text_field(record, COL_UOM, ""),
        unit_value: float_field(record, COL_UNIT_VALUE, 0.0),
        invoice_value: float_field(record, COL_INVOICE_VALUE, 0.0),
        currency_code: truncate_code(&currency_raw).to_string(),
        freight_charges: float_field(record, COL_FREIGHT_CHARGES, 0.0),
        shipment_weight: float_field(record, COL_SHIPMENT_WEIGHT, 0.0),
    }
}

/// All normalized rows from one upload, plus the aggregates the summary
/// document prints.
#[derive(Debug, Clone, Default)]
pub struct InvoiceSet {
    pub rows: Vec<NormalizedInvoiceRow>,
}

impl InvoiceSet {
    pub fn package_count(&self) -> usize {
        self.rows.len()
    }

    /// Exact arithmetic sum over all rows' invoice values, at input precision.
    pub fn total_value(&self) -> f64 {
        self.rows.iter().map(|r| r.invoice_value).sum()
    }

    pub fn total_weight(&self) -> f64 {
        self.rows.iter().map(|r| r.shipment_weight).sum()
    }

    /// Currency code of the first row, or "USD" when empty.
    pub fn currency_code(&self) -> &str {
        self.rows
            .first()
            .map(|r| r.currency_code.as_str())
            .filter(|c| !c.is_empty())
            .unwrap_or("USD")
    }
}
