//! Bulk CSV import of products and suppliers

pub mod rows;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use self::rows::{
    parse_rows, product_validator, supplier_validator, Parsed, PRODUCT_COLUMNS, SUPPLIER_COLUMNS,
};
use crate::store::supabase::SupabaseError;
use crate::store::suppliers::NewSupplier;
use crate::store::{ProductStore, SupplierStore};

/// Rows written per database call
pub const BATCH_SIZE: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Products,
    Suppliers,
}

impl DataType {
    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Products => "products",
            DataType::Suppliers => "suppliers",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "products" => Ok(DataType::Products),
            "suppliers" => Ok(DataType::Suppliers),
            other => Err(ImportError::UnknownDataType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    pub row: usize,
    pub message: String,
}

/// Data rows of the batch whose write failed. Batches before it stay
/// committed, nothing after it was attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedBatch {
    pub first_row: usize,
    pub last_row: usize,
}

impl FailedBatch {
    fn at(index: usize, len: usize) -> Self {
        let first_row = index * BATCH_SIZE + 1;
        Self {
            first_row,
            last_row: first_row + len - 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub data_type: DataType,
    pub dry_run: bool,
    pub processed: usize,
    pub written: usize,
    pub errors: Vec<RowError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_batch: Option<FailedBatch>,
}

impl ImportReport {
    /// True when a batch write failed after validation passed
    pub fn is_partial(&self) -> bool {
        self.failed_batch.is_some()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Unsupported data type '{0}', expected products or suppliers")]
    UnknownDataType(String),

    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("The file contains no data rows")]
    Empty,

    #[error("Could not read CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// Parses, validates and writes import files
#[derive(Clone)]
pub struct Importer {
    products: ProductStore,
    suppliers: SupplierStore,
}

impl Importer {
    pub fn new(products: ProductStore, suppliers: SupplierStore) -> Self {
        Self { products, suppliers }
    }

    /// Any invalid row blocks the whole write; the report then lists every
    /// problem found. Dry runs validate only. A failed batch stops the write
    /// and the report names the rows that were not written.
    pub async fn import(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        data_type: DataType,
        data: &[u8],
        dry_run: bool,
    ) -> Result<ImportReport, ImportError> {
        let mut written = 0;
        let mut failed_batch = None;
        let (processed, errors) = match data_type {
            DataType::Products => {
                let parsed = parse_rows(data, PRODUCT_COLUMNS, product_validator())?;
                if should_write(&parsed, dry_run)? {
                    for (index, batch) in parsed.rows.chunks(BATCH_SIZE).enumerate() {
                        if let Err(e) = self.products.import_batch(company_id, user_id, batch).await {
                            failed_batch = Some(batch_failed(company_id, data_type, index, batch.len(), &e));
                            break;
                        }
                        written += batch.len();
                    }
                }
                (parsed.processed, parsed.errors)
            }
            DataType::Suppliers => {
                let parsed = parse_rows(data, SUPPLIER_COLUMNS, supplier_validator())?;
                if should_write(&parsed, dry_run)? {
                    let rows: Vec<NewSupplier> = parsed
                        .rows
                        .into_iter()
                        .map(|r| NewSupplier {
                            company_id,
                            name: r.name,
                            email: r.email,
                            phone: r.phone,
                            default_lead_time_days: r.default_lead_time_days,
                            notes: r.notes,
                        })
                        .collect();
                    for (index, batch) in rows.chunks(BATCH_SIZE).enumerate() {
                        if let Err(e) = self.suppliers.upsert_many(batch).await {
                            failed_batch = Some(batch_failed(company_id, data_type, index, batch.len(), &e));
                            break;
                        }
                        written += batch.len();
                    }
                }
                (parsed.processed, parsed.errors)
            }
        };

        info!(
            company_id = %company_id,
            data_type = %data_type,
            dry_run,
            processed,
            written,
            errors = errors.len(),
            partial = failed_batch.is_some(),
            "CSV import finished"
        );

        Ok(ImportReport {
            data_type,
            dry_run,
            processed,
            written,
            errors,
            error: failed_batch.as_ref().map(|b| {
                format!(
                    "Import stopped at rows {}-{}, {} earlier rows were saved",
                    b.first_row, b.last_row, written
                )
            }),
            failed_batch,
        })
    }
}

fn batch_failed(
    company_id: Uuid,
    data_type: DataType,
    index: usize,
    len: usize,
    err: &SupabaseError,
) -> FailedBatch {
    let batch = FailedBatch::at(index, len);
    error!(
        company_id = %company_id,
        data_type = %data_type,
        first_row = batch.first_row,
        last_row = batch.last_row,
        error = %err,
        "Import batch write failed"
    );
    batch
}

fn should_write<T>(parsed: &Parsed<T>, dry_run: bool) -> Result<bool, ImportError> {
    if parsed.processed == 0 {
        return Err(ImportError::Empty);
    }
    Ok(parsed.errors.is_empty() && !dry_run)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::Config;
    use crate::store::SupabaseClient;

    fn importer(server: &MockServer) -> Importer {
        let client = SupabaseClient::new(&Config::for_tests(&server.uri()));
        Importer::new(ProductStore::new(client.clone()), SupplierStore::new(client))
    }

    #[test]
    fn data_type_parsing() {
        assert_eq!("Products".parse::<DataType>().unwrap(), DataType::Products);
        assert_eq!(" suppliers ".parse::<DataType>().unwrap(), DataType::Suppliers);
        assert!("orders".parse::<DataType>().is_err());
    }

    #[tokio::test]
    async fn products_are_written_in_batches() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/batch_import_products"))
            .respond_with(ResponseTemplate::new(204))
            .expect(2)
            .mount(&server)
            .await;

        let mut csv = String::from("sku,title,price,quantity\n");
        for i in 0..(BATCH_SIZE + 20) {
            csv.push_str(&format!("SKU-{i},Product {i},9.99,{i}\n"));
        }

        let report = importer(&server)
            .import(Uuid::new_v4(), Uuid::new_v4(), DataType::Products, csv.as_bytes(), false)
            .await
            .unwrap();

        assert_eq!(report.processed, BATCH_SIZE + 20);
        assert_eq!(report.written, BATCH_SIZE + 20);
        assert!(report.errors.is_empty());
    }

    #[tokio::test]
    async fn failed_batch_keeps_the_written_count() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/batch_import_products"))
            .respond_with(ResponseTemplate::new(204))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/batch_import_products"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "boom"})))
            .expect(1)
            .mount(&server)
            .await;

        let mut csv = String::from("sku,title,price,quantity\n");
        for i in 0..(BATCH_SIZE * 2 + 20) {
            csv.push_str(&format!("SKU-{i},Product {i},9.99,{i}\n"));
        }

        let report = importer(&server)
            .import(Uuid::new_v4(), Uuid::new_v4(), DataType::Products, csv.as_bytes(), false)
            .await
            .unwrap();

        assert!(report.is_partial());
        assert_eq!(report.written, BATCH_SIZE);
        assert_eq!(
            report.failed_batch,
            Some(FailedBatch { first_row: BATCH_SIZE + 1, last_row: BATCH_SIZE * 2 })
        );
        let body = serde_json::to_value(&report).unwrap();
        assert_eq!(body["failedBatch"]["firstRow"], BATCH_SIZE + 1);
        assert!(body["error"].as_str().unwrap().contains("500 earlier rows were saved"));
    }

    #[tokio::test]
    async fn invalid_rows_block_the_write() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        let csv = "sku,title,price\nA,Good,1.00\nB,,2.00\n";
        let report = importer(&server)
            .import(Uuid::new_v4(), Uuid::new_v4(), DataType::Products, csv.as_bytes(), false)
            .await
            .unwrap();

        assert_eq!(report.written, 0);
        assert_eq!(report.errors, vec![RowError { row: 2, message: "title is required".to_string() }]);
        let body = serde_json::to_value(&report).unwrap();
        assert_eq!(body["dataType"], "products");
        assert_eq!(body["dryRun"], false);
        assert!(body.get("failedBatch").is_none());
    }

    #[tokio::test]
    async fn dry_run_writes_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let report = importer(&server)
            .import(
                Uuid::new_v4(),
                Uuid::new_v4(),
                DataType::Suppliers,
                b"name,email\nAcme,sales@acme.test\n",
                true,
            )
            .await
            .unwrap();
        assert!(report.dry_run);
        assert_eq!(report.processed, 1);
        assert_eq!(report.written, 0);
    }

    #[tokio::test]
    async fn suppliers_upsert_on_name() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/suppliers"))
            .and(query_param("on_conflict", "company_id,name"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let report = importer(&server)
            .import(
                Uuid::new_v4(),
                Uuid::new_v4(),
                DataType::Suppliers,
                b"Name,Lead Time Days\nAcme,7\nGlobex,14\n",
                false,
            )
            .await
            .unwrap();
        assert_eq!(report.written, 2);
    }

    #[tokio::test]
    async fn header_only_file_is_empty() {
        let server = MockServer::start().await;
        let err = importer(&server)
            .import(Uuid::new_v4(), Uuid::new_v4(), DataType::Products, b"sku,title\n", false)
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::Empty));
    }
}
