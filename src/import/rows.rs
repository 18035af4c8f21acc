//! CSV row parsing and per-row validation

use std::collections::HashSet;
use std::io::Read;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{ImportError, RowError};
use crate::util::money::parse_cents;

/// Validated rows plus every row-level problem found
#[derive(Debug)]
pub struct Parsed<T> {
    pub rows: Vec<T>,
    pub errors: Vec<RowError>,
    pub processed: usize,
}

/// Read every data row, lowercasing headers and trimming fields. Row numbers
/// are 1-based and exclude the header line.
pub fn parse_rows<R, T, F>(
    input: impl Read,
    required: &[&'static str],
    mut validate: F,
) -> Result<Parsed<T>, ImportError>
where
    R: DeserializeOwned,
    F: FnMut(R) -> Result<T, String>,
{
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(input);

    let headers: csv::StringRecord = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_ascii_lowercase().replace(' ', "_"))
        .collect();
    let missing: Vec<String> = required
        .iter()
        .filter(|column| !headers.iter().any(|h| h == **column))
        .map(|column| column.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ImportError::MissingColumns(missing));
    }

    let mut parsed = Parsed {
        rows: Vec::new(),
        errors: Vec::new(),
        processed: 0,
    };

    for (index, record) in reader.records().enumerate() {
        let row = index + 1;
        parsed.processed += 1;
        let outcome = record
            .map_err(|e| e.to_string())
            .and_then(|record| record.deserialize::<R>(Some(&headers)).map_err(|e| e.to_string()))
            .and_then(&mut validate);
        match outcome {
            Ok(value) => parsed.rows.push(value),
            Err(message) => parsed.errors.push(RowError { row, message }),
        }
    }

    Ok(parsed)
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn money_field(name: &str, value: Option<String>) -> Result<Option<i64>, String> {
    match blank_to_none(value) {
        None => Ok(None),
        Some(raw) => match parse_cents(&raw) {
            Some(cents) if cents >= 0 => Ok(Some(cents)),
            Some(_) => Err(format!("{} cannot be negative", name)),
            None => Err(format!("{} '{}' is not a valid amount", name, raw)),
        },
    }
}

fn count_field(name: &str, value: Option<String>) -> Result<Option<i64>, String> {
    match blank_to_none(value) {
        None => Ok(None),
        Some(raw) => match raw.parse::<i64>() {
            Ok(n) if n >= 0 => Ok(Some(n)),
            Ok(_) => Err(format!("{} cannot be negative", name)),
            Err(_) => Err(format!("{} '{}' is not a whole number", name, raw)),
        },
    }
}

fn text_field(name: &str, value: Option<String>, max: usize) -> Result<String, String> {
    let value = blank_to_none(value).ok_or_else(|| format!("{} is required", name))?;
    if value.chars().count() > max {
        return Err(format!("{} cannot exceed {} characters", name, max));
    }
    Ok(value)
}

#[derive(Debug, Deserialize)]
pub struct ProductCsvRow {
    #[serde(default)]
    sku: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    variant_title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    product_type: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    price: Option<String>,
    #[serde(default)]
    cost: Option<String>,
    #[serde(default, alias = "inventory_quantity")]
    quantity: Option<String>,
    #[serde(default)]
    reorder_point: Option<String>,
    #[serde(default)]
    reorder_quantity: Option<String>,
}

/// Product record in the shape `batch_import_products` expects
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRecord {
    pub sku: String,
    pub title: String,
    pub variant_title: Option<String>,
    pub description: Option<String>,
    pub product_type: Option<String>,
    pub status: String,
    pub price: Option<i64>,
    pub cost: Option<i64>,
    pub inventory_quantity: i64,
    pub reorder_point: Option<i64>,
    pub reorder_quantity: Option<i64>,
}

pub const PRODUCT_COLUMNS: &[&str] = &["sku", "title"];

const PRODUCT_STATUSES: [&str; 3] = ["active", "draft", "archived"];

/// Validator for product rows; also rejects SKUs repeated within the file
pub fn product_validator() -> impl FnMut(ProductCsvRow) -> Result<ProductRecord, String> {
    let mut seen = HashSet::new();
    move |row| {
        let sku = text_field("sku", row.sku, 100)?;
        if !seen.insert(sku.to_ascii_lowercase()) {
            return Err(format!("duplicate sku '{}'", sku));
        }
        let title = text_field("title", row.title, 255)?;
        let status = blank_to_none(row.status)
            .map(|s| s.to_ascii_lowercase())
            .unwrap_or_else(|| "active".to_string());
        if !PRODUCT_STATUSES.contains(&status.as_str()) {
            return Err(format!("status '{}' must be active, draft or archived", status));
        }

        Ok(ProductRecord {
            sku,
            title,
            variant_title: blank_to_none(row.variant_title),
            description: blank_to_none(row.description),
            product_type: blank_to_none(row.product_type),
            status,
            price: money_field("price", row.price)?,
            cost: money_field("cost", row.cost)?,
            inventory_quantity: count_field("quantity", row.quantity)?.unwrap_or(0),
            reorder_point: count_field("reorder_point", row.reorder_point)?,
            reorder_quantity: count_field("reorder_quantity", row.reorder_quantity)?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SupplierCsvRow {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default, alias = "lead_time_days")]
    default_lead_time_days: Option<String>,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SupplierRecord {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub default_lead_time_days: Option<i32>,
    pub notes: Option<String>,
}

pub const SUPPLIER_COLUMNS: &[&str] = &["name"];

pub fn supplier_validator() -> impl FnMut(SupplierCsvRow) -> Result<SupplierRecord, String> {
    let mut seen = HashSet::new();
    move |row| {
        let name = text_field("name", row.name, 255)?;
        if !seen.insert(name.to_lowercase()) {
            return Err(format!("duplicate supplier '{}'", name));
        }
        let email = blank_to_none(row.email);
        if let Some(email) = &email {
            if !validator::validate_email(email.as_str()) {
                return Err(format!("email '{}' is not valid", email));
            }
        }
        let lead_time = match count_field("default_lead_time_days", row.default_lead_time_days)? {
            Some(days) if days > 365 => {
                return Err("default_lead_time_days must be between 0 and 365".to_string())
            }
            other => other.map(|d| d as i32),
        };

        Ok(SupplierRecord {
            name,
            email,
            phone: blank_to_none(row.phone),
            default_lead_time_days: lead_time,
            notes: blank_to_none(row.notes),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn products(csv: &str) -> Parsed<ProductRecord> {
        parse_rows(csv.as_bytes(), PRODUCT_COLUMNS, product_validator()).unwrap()
    }

    #[test]
    fn valid_products_parse_to_cents() {
        let parsed = products(
            "SKU,Title,Price,Cost,Quantity,Reorder Point\n\
             MUG-01,Coffee Mug,12.50,4.00,30,10\n\
             MUG-02,Travel Mug,$19.99,,0,\n",
        );

        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        assert_eq!(parsed.processed, 2);
        assert_eq!(parsed.rows[0].price, Some(1250));
        assert_eq!(parsed.rows[0].reorder_point, Some(10));
        assert_eq!(parsed.rows[1].price, Some(1999));
        assert_eq!(parsed.rows[1].cost, None);
        assert_eq!(parsed.rows[1].status, "active");
    }

    #[test]
    fn row_errors_are_numbered_from_one() {
        let parsed = products(
            "sku,title,price,quantity\n\
             A-1,Good,1.00,5\n\
             ,Missing sku,1.00,5\n\
             A-3,Bad price,abc,5\n\
             A-4,Negative,1.00,-2\n\
             A-1,Duplicate,1.00,1\n",
        );

        let rows: Vec<usize> = parsed.errors.iter().map(|e| e.row).collect();
        assert_eq!(rows, vec![2, 3, 4, 5]);
        assert_eq!(parsed.errors[0].message, "sku is required");
        assert!(parsed.errors[1].message.contains("not a valid amount"));
        assert!(parsed.errors[2].message.contains("cannot be negative"));
        assert!(parsed.errors[3].message.contains("duplicate sku"));
        assert_eq!(parsed.rows.len(), 1);
    }

    #[test]
    fn missing_columns_fail_the_file() {
        let err = parse_rows("name,price\nMug,1.00\n".as_bytes(), PRODUCT_COLUMNS, product_validator())
            .unwrap_err();
        match err {
            ImportError::MissingColumns(columns) => assert_eq!(columns, vec!["sku", "title"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn suppliers_validate_email_and_lead_time() {
        let parsed = parse_rows(
            "name,email,lead_time_days\n\
             Acme,orders@acme.test,14\n\
             Bad Mail,not-an-email,3\n\
             Slow,,400\n"
                .as_bytes(),
            SUPPLIER_COLUMNS,
            supplier_validator(),
        )
        .unwrap();

        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].default_lead_time_days, Some(14));
        let rows: Vec<usize> = parsed.errors.iter().map(|e| e.row).collect();
        assert_eq!(rows, vec![2, 3]);
    }
}
