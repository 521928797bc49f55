//! PDF text extraction for uploaded document batches

use crate::config::ParseFailurePolicy;
use crate::error::{Error, Result};
use crate::types::response::{DocumentSummary, SkippedDocument};
use crate::types::UploadedDocument;

/// Concatenated text of a batch, with per-document details
#[derive(Debug, Clone, Default)]
pub struct RawText {
    /// All pages of all documents, in upload and page order
    pub text: String,
    /// Documents that contributed to `text`
    pub documents: Vec<DocumentSummary>,
    /// Documents dropped under the skip policy
    pub skipped: Vec<SkippedDocument>,
}

impl RawText {
    /// Length in characters
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Text extracted from a single PDF
struct ExtractedPdf {
    text: String,
    pages: u32,
}

/// Extracts plain text from uploaded PDFs
#[derive(Debug, Clone, Default)]
pub struct DocumentLoader {
    policy: ParseFailurePolicy,
}

impl DocumentLoader {
    /// Create a loader with the given batch failure policy
    pub fn new(policy: ParseFailurePolicy) -> Self {
        Self { policy }
    }

    /// Batch failure policy
    pub fn policy(&self) -> ParseFailurePolicy {
        self.policy
    }

    /// Extract text from every page of every document, in order.
    ///
    /// Blocking; call from `spawn_blocking` inside async code.
    pub fn load(&self, documents: &[UploadedDocument]) -> Result<RawText> {
        if documents.is_empty() {
            return Err(Error::EmptyDocumentSet);
        }

        let mut raw = RawText::default();

        for doc in documents {
            let extracted = match Self::extract_pdf(&doc.filename, &doc.data) {
                Ok(extracted) => extracted,
                Err(e) if self.policy == ParseFailurePolicy::Skip => {
                    tracing::warn!("Skipping {}: {}", doc.filename, e);
                    raw.skipped.push(SkippedDocument {
                        filename: doc.filename.clone(),
                        error: e.to_string(),
                    });
                    continue;
                }
                Err(e) => return Err(e),
            };

            tracing::info!(
                "Extracted {} pages ({} chars) from {}",
                extracted.pages,
                extracted.text.chars().count(),
                doc.filename
            );

            raw.documents.push(DocumentSummary {
                filename: doc.filename.clone(),
                content_hash: doc.content_hash(),
                file_size: doc.size() as u64,
                pages: extracted.pages,
                characters: extracted.text.chars().count(),
            });
            raw.text.push_str(&extracted.text);
        }

        if raw.documents.is_empty() {
            // Every document was skipped
            let first = raw.skipped.first();
            return Err(Error::file_parse(
                first.map(|s| s.filename.as_str()).unwrap_or("batch"),
                first
                    .map(|s| s.error.as_str())
                    .unwrap_or("no document could be parsed"),
            ));
        }

        if raw.text.trim().is_empty() {
            return Err(Error::NoTextExtracted);
        }

        Ok(raw)
    }

    /// Extract text page by page, falling back to whole-document extraction
    fn extract_pdf(filename: &str, data: &[u8]) -> Result<ExtractedPdf> {
        let doc = lopdf::Document::load_mem(data)
            .map_err(|e| Error::file_parse(filename, format!("Failed to load PDF: {}", e)))?;

        let pages = doc.get_pages();
        let (mut text, failures) =
            join_pages(pages.keys().map(|&n| (n, doc.extract_text(&[n]))));

        for failure in &failures {
            tracing::warn!("Could not extract {} of {}", failure, filename);
        }

        if text.trim().is_empty() && !pages.is_empty() {
            tracing::debug!("Per-page extraction produced no text for {}, trying pdf-extract", filename);
            match pdf_extract::extract_text_from_mem(data) {
                Ok(whole) => push_page(&mut text, &whole),
                Err(e) => tracing::warn!("pdf-extract failed for {}: {}", filename, e),
            }
        }

        if text.trim().is_empty() {
            if let Some(first) = failures.first() {
                return Err(Error::file_parse(
                    filename,
                    format!(
                        "text extraction failed on {} of {} pages ({})",
                        failures.len(),
                        pages.len(),
                        first
                    ),
                ));
            }
        }

        Ok(ExtractedPdf {
            text,
            pages: pages.len() as u32,
        })
    }
}

/// Join extracted pages in order, collecting a message per failed page
fn join_pages<E: std::fmt::Display>(
    pages: impl IntoIterator<Item = (u32, std::result::Result<String, E>)>,
) -> (String, Vec<String>) {
    let mut text = String::new();
    let mut failures = Vec::new();

    for (page_number, result) in pages {
        match result {
            Ok(page_text) => push_page(&mut text, &page_text),
            Err(e) => failures.push(format!("page {}: {}", page_number, e)),
        }
    }

    (text, failures)
}

/// Append a page, keeping pages newline separated
fn push_page(text: &mut String, page: &str) {
    let page = page.replace('\0', "");
    if page.trim().is_empty() {
        return;
    }
    text.push_str(&page);
    if !page.ends_with('\n') {
        text.push('\n');
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    /// Build a PDF with one text line per page
    pub(crate) fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for line in pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*line)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_empty_set_rejected() {
        let loader = DocumentLoader::default();
        assert!(matches!(loader.load(&[]), Err(Error::EmptyDocumentSet)));
    }

    #[test]
    fn test_pages_in_order_across_documents() {
        let docs = vec![
            UploadedDocument::new("a.pdf", pdf_with_pages(&["Alpha first", "Alpha second"])),
            UploadedDocument::new("b.pdf", pdf_with_pages(&["Bravo only"])),
        ];

        let raw = DocumentLoader::default().load(&docs).unwrap();

        let first = raw.text.find("Alpha first").unwrap();
        let second = raw.text.find("Alpha second").unwrap();
        let third = raw.text.find("Bravo only").unwrap();
        assert!(first < second && second < third);

        assert_eq!(raw.documents.len(), 2);
        assert_eq!(raw.documents[0].pages, 2);
        assert_eq!(raw.documents[1].pages, 1);
        assert!(raw.skipped.is_empty());
    }

    #[test]
    fn test_corrupt_document_aborts_by_default() {
        let docs = vec![
            UploadedDocument::new("good.pdf", pdf_with_pages(&["Fine"])),
            UploadedDocument::new("broken.pdf", b"definitely not a pdf".to_vec()),
        ];

        match DocumentLoader::default().load(&docs) {
            Err(Error::FileParse { filename, .. }) => assert_eq!(filename, "broken.pdf"),
            other => panic!("expected parse error, got {:?}", other.map(|r| r.text)),
        }
    }

    #[test]
    fn test_corrupt_document_skipped_under_skip_policy() {
        let docs = vec![
            UploadedDocument::new("broken.pdf", b"definitely not a pdf".to_vec()),
            UploadedDocument::new("good.pdf", pdf_with_pages(&["Still here"])),
        ];

        let raw = DocumentLoader::new(ParseFailurePolicy::Skip).load(&docs).unwrap();
        assert!(raw.text.contains("Still here"));
        assert_eq!(raw.skipped.len(), 1);
        assert_eq!(raw.skipped[0].filename, "broken.pdf");
    }

    #[test]
    fn test_all_skipped_is_an_error() {
        let docs = vec![UploadedDocument::new("broken.pdf", b"nope".to_vec())];
        let result = DocumentLoader::new(ParseFailurePolicy::Skip).load(&docs);
        assert!(matches!(result, Err(Error::FileParse { .. })));
    }

    #[test]
    fn test_join_pages_reports_failed_pages() {
        let pages = vec![
            (1, Ok("one".to_string())),
            (2, Err("unknown font")),
            (3, Ok("three".to_string())),
        ];
        let (text, failures) = join_pages(pages);

        assert_eq!(text, "one\nthree\n");
        assert_eq!(failures, vec!["page 2: unknown font".to_string()]);
    }

    #[test]
    fn test_push_page_separates_pages() {
        let mut text = String::new();
        push_page(&mut text, "one");
        push_page(&mut text, "   ");
        push_page(&mut text, "two\n");
        assert_eq!(text, "one\ntwo\n");
    }
}
