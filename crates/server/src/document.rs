//! Quote document export.
//!
//! Quotes are rendered to HTML with Tera and converted to PDF with
//! `wkhtmltopdf` when it is installed. Without it the HTML is returned for
//! printing from the browser.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use quotewise_core::config::{resolve_quote_template, ExportConfig, QUOTE_TEMPLATE_NAMES};
use quotewise_core::cpq::pricing::{format_usd, price_with_lines};
use quotewise_core::domain::quote::{QuoteRecord, QUOTE_VALIDITY_DAYS};
use serde::Serialize;
use tera::{Context, Tera};
use tokio::process::Command;
use tracing::{error, info, warn};

const DOCUMENT_TITLE: &str = "Product Quote";
const VENDOR_NAME: &str = "Codeium";

/// Registers the `usd` filter: `amount | usd` renders `$13,000.00`.
pub fn register_template_filters(tera: &mut Tera) {
    tera.register_filter("usd", tera_usd_filter);
}

fn tera_usd_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let amount = match value {
        tera::Value::Number(number) => number
            .as_u64()
            .ok_or_else(|| tera::Error::msg("usd filter expects a whole, non-negative amount"))?,
        tera::Value::Null => 0,
        _ => return Err(tera::Error::msg("usd filter expects a number")),
    };
    Ok(tera::Value::String(format!("{}.00", format_usd(amount))))
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("template error: {0}")]
    Template(String),
    #[error("conversion error: {0}")]
    Conversion(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    Pdf,
    Html,
}

#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    async fn render_quote(&self, record: &QuoteRecord) -> Result<RenderedDocument, RenderError>;

    fn output_mode(&self) -> OutputMode;
}

#[derive(Clone, Debug)]
pub struct TeraDocumentRenderer {
    tera: Tera,
    template_name: &'static str,
    wkhtmltopdf_path: Option<PathBuf>,
}

impl TeraDocumentRenderer {
    /// Loads templates from `export.template_dir` when set, otherwise the bundled template.
    pub fn from_config(config: &ExportConfig) -> Result<Self, RenderError> {
        let (tera, template_name) = match &config.template_dir {
            Some(dir) => load_template_dir(dir)?,
            None => (embedded_templates()?, QUOTE_TEMPLATE_NAMES[0]),
        };
        let wkhtmltopdf_path = match &config.wkhtmltopdf_path {
            Some(path) if path.is_file() => Some(path.clone()),
            Some(path) => {
                warn!(
                    event_name = "system.export.wkhtmltopdf_path_invalid",
                    correlation_id = "bootstrap",
                    path = %path.display(),
                    "configured wkhtmltopdf path does not exist - quote documents will be served as printable HTML"
                );
                None
            }
            None => locate_wkhtmltopdf(),
        };

        match &wkhtmltopdf_path {
            Some(path) => info!(
                event_name = "system.export.wkhtmltopdf_found",
                correlation_id = "bootstrap",
                path = %path.display(),
                "wkhtmltopdf found"
            ),
            None if config.wkhtmltopdf_path.is_some() => {}
            None => warn!(
                event_name = "system.export.wkhtmltopdf_missing",
                correlation_id = "bootstrap",
                "wkhtmltopdf not found in PATH - quote documents will be served as printable HTML"
            ),
        }

        Ok(Self { tera, template_name, wkhtmltopdf_path })
    }

    #[cfg(test)]
    pub fn html_only() -> Result<Self, RenderError> {
        Ok(Self {
            tera: embedded_templates()?,
            template_name: QUOTE_TEMPLATE_NAMES[0],
            wkhtmltopdf_path: None,
        })
    }

    pub fn render_html(&self, record: &QuoteRecord) -> Result<String, RenderError> {
        let pricing = price_with_lines(record.licenses());

        let mut context = Context::new();
        context.insert("title", DOCUMENT_TITLE);
        context.insert("vendor_name", VENDOR_NAME);
        context.insert("quote", record);
        context.insert("lines", &pricing.lines);
        context.insert("total", &record.total_cost());
        context.insert("notes", &quote_notes());

        self.tera.render(self.template_name, &context).map_err(|e| RenderError::Template(e.to_string()))
    }

    async fn convert_html_to_pdf(
        &self,
        html: &str,
        wkhtmltopdf_path: &Path,
    ) -> Result<Vec<u8>, RenderError> {
        let temp_dir = std::env::temp_dir();
        let html_path = temp_dir.join(format!("quote_{}.html", uuid::Uuid::new_v4()));
        let pdf_path = temp_dir.join(format!("quote_{}.pdf", uuid::Uuid::new_v4()));

        tokio::fs::write(&html_path, html).await?;

        let output = Command::new(wkhtmltopdf_path)
            .args(["--page-size", "A4", "--encoding", "utf-8", "--quiet"])
            .args(["--margin-top", "10mm", "--margin-bottom", "10mm"])
            .args(["--margin-left", "10mm", "--margin-right", "10mm"])
            .arg(&html_path)
            .arg(&pdf_path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        let result = match output {
            Ok(output) if output.status.success() => {
                tokio::fs::read(&pdf_path).await.map_err(RenderError::from)
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr).to_string();
                error!(event_name = "export.wkhtmltopdf_failed", stderr = %stderr, "wkhtmltopdf failed");
                Err(RenderError::Conversion(stderr))
            }
            Err(error) => Err(RenderError::Io(error)),
        };

        let _ = tokio::fs::remove_file(&html_path).await;
        let _ = tokio::fs::remove_file(&pdf_path).await;

        result
    }
}

#[async_trait]
impl DocumentRenderer for TeraDocumentRenderer {
    async fn render_quote(&self, record: &QuoteRecord) -> Result<RenderedDocument, RenderError> {
        let html = self.render_html(record)?;

        let Some(wkhtmltopdf) = &self.wkhtmltopdf_path else {
            return Ok(RenderedDocument::Html(html));
        };

        match self.convert_html_to_pdf(&html, wkhtmltopdf).await {
            Ok(bytes) => {
                info!(
                    event_name = "export.pdf_generated",
                    quote_id = %record.quote_id(),
                    size = bytes.len(),
                    "quote PDF generated"
                );
                Ok(RenderedDocument::Pdf(bytes))
            }
            Err(error) => {
                warn!(
                    event_name = "export.pdf_fallback_html",
                    quote_id = %record.quote_id(),
                    error = %error,
                    "PDF conversion failed, falling back to HTML"
                );
                Ok(RenderedDocument::Html(html))
            }
        }
    }

    fn output_mode(&self) -> OutputMode {
        if self.wkhtmltopdf_path.is_some() {
            OutputMode::Pdf
        } else {
            OutputMode::Html
        }
    }
}

fn quote_notes() -> Vec<String> {
    vec![
        format!("This quote is valid for {QUOTE_VALIDITY_DAYS} days from the date of issue."),
        "All prices are in USD and exclude applicable taxes.".to_string(),
        "Licenses are billed annually.".to_string(),
    ]
}

fn load_template_dir(dir: &Path) -> Result<(Tera, &'static str), RenderError> {
    let template_name = resolve_quote_template(dir).ok_or_else(|| {
        RenderError::Template(format!(
            "none of {} found in {}",
            QUOTE_TEMPLATE_NAMES.join(", "),
            dir.display()
        ))
    })?;

    let pattern = format!("{}/**/*.tera", dir.display());
    let mut tera = Tera::new(&pattern).map_err(|e| RenderError::Template(e.to_string()))?;
    tera.autoescape_on(vec![".html.tera"]);
    register_template_filters(&mut tera);
    if !tera.get_template_names().any(|name| name == template_name) {
        return Err(RenderError::Template(format!(
            "`{template_name}` was not registered from {}",
            dir.display()
        )));
    }
    Ok((tera, template_name))
}

fn embedded_templates() -> Result<Tera, RenderError> {
    let mut tera = Tera::default();
    tera.autoescape_on(vec![".html.tera"]);
    register_template_filters(&mut tera);
    tera.add_raw_template(
        QUOTE_TEMPLATE_NAMES[0],
        include_str!("../../../templates/quotes/quote.html.tera"),
    )
    .map_err(|e| RenderError::Template(e.to_string()))?;
    Ok(tera)
}

pub fn locate_wkhtmltopdf() -> Option<PathBuf> {
    which::which("wkhtmltopdf").ok()
}

/// Rendered quote, PDF when conversion succeeded.
pub enum RenderedDocument {
    Pdf(Vec<u8>),
    Html(String),
}

impl RenderedDocument {
    pub fn into_response(self, filename: &str) -> Response {
        match self {
            RenderedDocument::Pdf(bytes) => (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "application/pdf".to_string()),
                    (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
                ],
                Body::from(bytes),
            )
                .into_response(),
            RenderedDocument::Html(html) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8".to_string())],
                Body::from(html),
            )
                .into_response(),
        }
    }
}
