//! Downloadable health report: plain text and PDF rendering, and export to disk.
//!
//! PDF output uses the builtin Helvetica font, which only covers the
//! WinAnsi character set. Documents with other scripts are refused as PDF
//! (`ReportExportError::UnsupportedScript`) and must be exported as text.

use std::io::BufWriter;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use printpdf::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::actions::MEDICAL_DISCLAIMER;
use crate::pipeline::flows::{ReportContext, ReportResult};

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const TOP_MM: f32 = 280.0;
const BOTTOM_MM: f32 = 20.0;
const LEFT_MM: f32 = 20.0;
const WRAP_CHARS: usize = 90;

#[derive(Debug, thiserror::Error)]
pub enum ReportExportError {
    #[error("PDF generation failed: {0}")]
    Pdf(String),

    #[error("PDF export does not support the script used in this {language} report, use the text format")]
    UnsupportedScript { language: String },

    #[error("Cannot write report: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Text,
    Pdf,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Pdf => "pdf",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Text => "text/plain; charset=utf-8",
            Self::Pdf => "application/pdf",
        }
    }
}

/// A generated report plus the consultation it summarizes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReportDocument {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub report: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ReportContext>,
    pub language: String,
    pub generated_at: DateTime<Utc>,
}

impl HealthReportDocument {
    pub fn new(result: ReportResult, context: Option<ReportContext>, language: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            report: result.report,
            context,
            language: language.to_string(),
            generated_at: Utc::now(),
        }
    }

    pub fn title(&self) -> String {
        format!("{} - Health Report", crate::config::APP_NAME)
    }

    pub fn filename(&self, format: ReportFormat) -> String {
        let id = self.id.simple().to_string();
        format!(
            "seva-health-report-{}-{}.{}",
            self.generated_at.format("%Y%m%d-%H%M%S"),
            &id[..8],
            format.extension()
        )
    }

    /// Whether every character the PDF would draw exists in the builtin fonts.
    pub fn pdf_compatible(&self) -> bool {
        let summary = self.summary_lines();
        std::iter::once(self.report.as_str())
            .chain(std::iter::once(self.language.as_str()))
            .chain(summary.iter().map(|(_, value)| value.as_str()))
            .all(|text| text.chars().all(is_win_ansi))
    }

    fn summary_lines(&self) -> Vec<(&'static str, String)> {
        let Some(ctx) = &self.context else {
            return Vec::new();
        };
        vec![
            ("Symptoms", ctx.symptoms.clone()),
            ("Preliminary diagnosis", ctx.diagnosis.clone()),
            ("Risk level", ctx.risk_level.to_string()),
            ("Recommendation", ctx.recommendation.clone()),
        ]
    }

    pub fn to_text(&self) -> String {
        let mut out = format!(
            "{}\nGenerated: {}\nLanguage: {}\n\n",
            self.title(),
            self.generated_at.format("%Y-%m-%d %H:%M UTC"),
            self.language
        );
        let summary = self.summary_lines();
        if !summary.is_empty() {
            for (label, value) in summary {
                out.push_str(&format!("{label}: {value}\n"));
            }
            out.push('\n');
        }
        out.push_str(self.report.trim());
        out.push_str("\n\n");
        out.push_str(MEDICAL_DISCLAIMER);
        out.push('\n');
        out
    }

    /// A4 PDF, word-wrapped, continuing onto new pages as needed.
    pub fn to_pdf(&self) -> Result<Vec<u8>, ReportExportError> {
        if !self.pdf_compatible() {
            return Err(ReportExportError::UnsupportedScript {
                language: self.language.clone(),
            });
        }
        let title = self.title();
        let mut pdf = PdfWriter::new(&title)?;

        pdf.line(&title, 14.0, 0.0, true);
        pdf.gap(2.0);
        pdf.line(
            &format!("Generated: {}", self.generated_at.format("%Y-%m-%d %H:%M UTC")),
            9.0,
            0.0,
            false,
        );
        pdf.line(&format!("Language: {}", self.language), 9.0, 0.0, false);
        pdf.gap(6.0);

        let summary = self.summary_lines();
        if !summary.is_empty() {
            pdf.line("CONSULTATION SUMMARY:", 11.0, 0.0, true);
            pdf.gap(1.5);
            for (label, value) in summary {
                pdf.paragraph(&format!("{label}: {value}"), 9.0, 5.0);
            }
            pdf.gap(6.0);
        }

        pdf.line("REPORT:", 11.0, 0.0, true);
        pdf.gap(1.5);
        for paragraph in self.report.lines() {
            pdf.paragraph(paragraph, 9.0, 5.0);
        }

        pdf.gap(8.0);
        pdf.paragraph(MEDICAL_DISCLAIMER, 8.0, 0.0);

        pdf.finish()
    }

    pub fn render(&self, format: ReportFormat) -> Result<Vec<u8>, ReportExportError> {
        match format {
            ReportFormat::Text => Ok(self.to_text().into_bytes()),
            ReportFormat::Pdf => self.to_pdf(),
        }
    }

    /// Render and write into `dir` (created if missing). Returns the file path.
    pub fn export(&self, dir: &Path, format: ReportFormat) -> Result<PathBuf, ReportExportError> {
        let bytes = self.render(format)?;
        self.save_rendered(dir, format, &bytes)
    }

    /// Write already-rendered bytes under this document's file name.
    pub fn save_rendered(
        &self,
        dir: &Path,
        format: ReportFormat,
        bytes: &[u8],
    ) -> Result<PathBuf, ReportExportError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(self.filename(format));
        std::fs::write(&path, bytes)?;
        tracing::info!(path = %path.display(), format = format.extension(), "Report exported");
        Ok(path)
    }
}

/// Cursor over a printpdf document that starts a new page when full.
struct PdfWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    font: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
}

impl PdfWriter {
    fn new(title: &str) -> Result<Self, ReportExportError> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
        let layer = doc.get_page(page).get_layer(layer);
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ReportExportError::Pdf(format!("font error: {e}")))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| ReportExportError::Pdf(format!("font error: {e}")))?;
        Ok(Self {
            doc,
            layer,
            font,
            bold,
            y: TOP_MM,
        })
    }

    fn line(&mut self, text: &str, size: f32, indent: f32, bold: bool) {
        let height = size * 0.5;
        if self.y - height < BOTTOM_MM {
            let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = TOP_MM;
        }
        let font = if bold { &self.bold } else { &self.font };
        self.layer.use_text(text, size, Mm(LEFT_MM + indent), Mm(self.y), font);
        self.y -= height;
    }

    fn paragraph(&mut self, text: &str, size: f32, indent: f32) {
        for line in wrap_text(text, WRAP_CHARS) {
            self.line(&line, size, indent, false);
        }
    }

    fn gap(&mut self, mm: f32) {
        self.y -= mm;
    }

    fn finish(self) -> Result<Vec<u8>, ReportExportError> {
        let mut buf = BufWriter::new(Vec::new());
        self.doc
            .save(&mut buf)
            .map_err(|e| ReportExportError::Pdf(format!("save error: {e}")))?;
        buf.into_inner()
            .map_err(|e| ReportExportError::Pdf(format!("buffer error: {e}")))
    }
}

/// Characters Helvetica can draw: printable Latin-1 plus the WinAnsi
/// punctuation block at 0x80-0x9F.
fn is_win_ansi(c: char) -> bool {
    const WIN_ANSI_EXTRA: &[u32] = &[
        0x20AC, 0x201A, 0x0192, 0x201E, 0x2026, 0x2020, 0x2021, 0x02C6, 0x2030, 0x0160, 0x2039,
        0x0152, 0x017D, 0x2018, 0x2019, 0x201C, 0x201D, 0x2022, 0x2013, 0x2014, 0x02DC, 0x2122,
        0x0161, 0x203A, 0x0153, 0x017E, 0x0178,
    ];
    let code = c as u32;
    matches!(code, 0x09 | 0x0A | 0x0D | 0x20..=0x7E | 0xA0..=0xFF) || WIN_ANSI_EXTRA.contains(&code)
}

/// Word-wrap on whitespace, counting characters rather than bytes.
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let len = current.chars().count();
        if len + word.chars().count() + 1 > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
