//! Report rendering.

use std::path::Path;

use async_trait::async_trait;
use emberline_core::{PdfRenderer, PipelineError, Report};
use tracing::debug;

/// Renders a report to a file at the requested path.
///
/// Until a proper PDF engine is wired in, the output is a plain-text
/// rendition of the section structure, which keeps the fulfillment path
/// (render, attach, delete) fully exercised end to end.
pub struct FileRenderer;

impl FileRenderer {
    fn render_text(report: &Report) -> String {
        let mut out = format!("{}\nPrepared for {}\n", report.title, report.client_name);
        for section in &report.sections {
            out.push_str(&format!("\n== {} ==\n{}\n", section.heading, section.body));
        }
        out
    }
}

#[async_trait]
impl PdfRenderer for FileRenderer {
    async fn render(&self, report: &Report, path: &Path) -> Result<(), PipelineError> {
        let text = Self::render_text(report);
        tokio::fs::write(path, text.as_bytes())
            .await
            .map_err(|e| PipelineError::Render(format!("{}: {e}", path.display())))?;
        debug!(path = %path.display(), sections = report.sections.len(), "report rendered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emberline_core::ReportSection;

    fn report() -> Report {
        Report {
            title: "Resilience Deep Dive".to_string(),
            client_name: "buyer@example.com".to_string(),
            sections: vec![ReportSection {
                heading: "Executive Summary".to_string(),
                body: "All clear.".to_string(),
            }],
        }
    }

    #[tokio::test]
    async fn renders_every_section_to_the_target_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");

        FileRenderer.render(&report(), &path).await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("Resilience Deep Dive"));
        assert!(written.contains("== Executive Summary =="));
    }

    #[tokio::test]
    async fn unwritable_path_is_a_render_error() {
        let path = Path::new("/nonexistent/dir/report.pdf");
        let err = FileRenderer.render(&report(), path).await.unwrap_err();
        assert!(matches!(err, PipelineError::Render(_)));
    }
}
