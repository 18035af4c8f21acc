//! CSV import (multipart upload) and CSV export downloads

use axum::{
    extract::{Extension, Multipart, State},
    http::{header, StatusCode},
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tracing::warn;

use crate::app::AppState;
use crate::export::ExportKind;
use crate::http::error::AppError;
use crate::http::extract::{Json, Path};
use crate::http::middleware::AuthenticatedUser;
use crate::import::{DataType, ImportReport};

fn truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

/// Fields of an import upload
#[derive(Debug, Default)]
struct ImportForm {
    data_type: Option<String>,
    dry_run: bool,
    file: Option<Vec<u8>>,
}

async fn read_form(mut multipart: Multipart) -> Result<ImportForm, AppError> {
    let mut form = ImportForm::default();
    let bad = |e: axum::extract::multipart::MultipartError| AppError::BadRequest(e.body_text());

    while let Some(field) = multipart.next_field().await.map_err(bad)? {
        match field.name() {
            Some("dataType") => form.data_type = Some(field.text().await.map_err(bad)?),
            Some("dryRun") => form.dry_run = truthy(&field.text().await.map_err(bad)?),
            Some("file") => form.file = Some(field.bytes().await.map_err(bad)?.to_vec()),
            _ => {}
        }
    }
    Ok(form)
}

pub async fn import_csv(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    WithRejection(multipart, _): WithRejection<Multipart, AppError>,
) -> Result<(StatusCode, Json<ImportReport>), AppError> {
    auth.require_manager()?;
    if !state.rate_limits.check_import(auth.user_id) {
        warn!(user_id = %auth.user_id, "Import rate limit exceeded");
        return Err(AppError::RateLimited);
    }

    let form = read_form(multipart).await?;
    let data_type: DataType = form
        .data_type
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("dataType is required".to_string()))?
        .parse()?;
    let file = form
        .file
        .filter(|f| !f.is_empty())
        .ok_or_else(|| AppError::BadRequest("A CSV file is required".to_string()))?;

    let report = state
        .importer
        .import(auth.company_id, auth.user_id, data_type, &file, form.dry_run)
        .await?;
    // partial writes keep the report so the client knows which rows landed
    let status = if report.is_partial() {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::OK
    };
    Ok((status, Json(report)))
}

pub async fn export_csv(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(kind): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let kind: ExportKind = kind.parse()?;
    let file = state.exporter.export(auth.company_id, kind).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file.filename),
            ),
        ],
        file.body,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dry_run_flags() {
        assert!(truthy("true"));
        assert!(truthy(" YES "));
        assert!(truthy("1"));
        assert!(!truthy("false"));
        assert!(!truthy(""));
    }
}
