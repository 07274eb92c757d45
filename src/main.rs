//! Invoice Press - spreadsheet-to-commercial-invoice PDF generation server.

mod archive;
mod child_invoice;
mod config;
mod generate;
mod invoice;
mod mother_invoice;
mod pdf;
mod sheet;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use config::AppConfig;
use generate::GenerationReport;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<AppConfig>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "invoice_press=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load config
    let config_path = std::env::var("INVOICE_PRESS_CONFIG").unwrap_or_else(|_| "config.json".into());
    let config = AppConfig::load_or_default(std::path::Path::new(&config_path))?;
    std::fs::create_dir_all(&config.output_dir)?;
    info!("Output directory: {:?}", config.output_dir);

    let state = AppState {
        config: Arc::new(config),
    };

    // Build router
    let app = Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/generate", post(generate_invoices))
        .route("/invoices/:filename", get(serve_invoice))
        .route("/download/child-invoices-zip", get(download_archive))
        .route("/download/mother-invoice", get(download_mother_invoice))
        .layer(DefaultBodyLimit::max(50 * 1024 * 1024)) // 50MB
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    // Run server
    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
    info!("Server listening on http://0.0.0.0:3000");
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Minimal upload form.
async fn index() -> Html<&'static str> {
    Html(
        r#"<!doctype html>
<html>
<head><title>Invoice Press</title></head>
<body>
  <h1>Invoice Press</h1>
  <p>Upload a recipient/invoice spreadsheet (.csv, .xls, .xlsx, .xlsm).</p>
  <form action="/generate" method="post" enctype="multipart/form-data">
    <input type="file" name="file" required>
    <button type="submit">Generate invoices</button>
  </form>
  <p>After generating: <a href="/download/mother-invoice">mother invoice</a> |
     <a href="/download/child-invoices-zip">child invoices (zip)</a></p>
</body>
</html>"#,
    )
}

/// Upload a spreadsheet and generate all invoice documents.
async fn generate_invoices(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<GenerationReport>, (StatusCode, String)> {
    // Read the uploaded file
    let mut filename = String::new();
    let mut file_data = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Multipart error: {}", e)))?
    {
        if field.name() == Some("file") {
            filename = field.file_name().unwrap_or("upload").to_string();
            file_data = field
                .bytes()
                .await
                .map_err(|e| (StatusCode::BAD_REQUEST, format!("Failed to read file: {}", e)))?
                .to_vec();
            break;
        }
    }

    if file_data.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "No file uploaded".to_string()));
    }

    info!("Received file: {} ({} bytes)", filename, file_data.len());

    // Clear previous run's artifacts, then run the pipeline off the async runtime
    let config = state.config.clone();
    let report = tokio::task::spawn_blocking(move || {
        generate::clear_output_dir(&config.output_dir)
            .map_err(|e| generate::DatasetError::Unreadable(format!("{:#}", e)))?;
        generate::run(&filename, &file_data, &config)
    })
    .await
    .map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Generation task failed: {}", e),
        )
    })?
    .map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;

    info!(
        "Generation complete: {} files, {} warnings",
        report.files.len(),
        report.warnings.len()
    );
    Ok(Json(report))
}

/// Serve one generated artifact inline.
async fn serve_invoice(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, (StatusCode, String)> {
    serve_file(&state, &filename, false).await
}

/// Download the archive of all child invoices.
async fn download_archive(State(state): State<AppState>) -> Result<Response, (StatusCode, String)> {
    serve_file(&state, archive::ARCHIVE_FILENAME, true).await
}

/// Download the mother invoice.
async fn download_mother_invoice(
    State(state): State<AppState>,
) -> Result<Response, (StatusCode, String)> {
    serve_file(&state, mother_invoice::SUMMARY_FILENAME, true).await
}

// ============================================================================
// Helper functions
// ============================================================================

async fn serve_file(
    state: &AppState,
    filename: &str,
    attachment: bool,
) -> Result<Response, (StatusCode, String)> {
    // No path traversal out of the output directory
    if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
        return Err((StatusCode::BAD_REQUEST, "Invalid filename".to_string()));
    }

    let path = state.config.output_dir.join(filename);
    let bytes = tokio::fs::read(&path).await.map_err(|_| {
        (
            StatusCode::NOT_FOUND,
            format!("{} not found. Please regenerate invoices.", filename),
        )
    })?;

    let content_type = if filename.ends_with(".zip") {
        "application/zip"
    } else {
        "application/pdf"
    };
    let disposition = if attachment {
        format!("attachment; filename=\"{}\"", filename)
    } else {
        "inline".to_string()
    };

    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}
