//! Built-in Typst markup for the report.
//!
//! The document is a preamble followed by one page per series. Pages use
//! `{{PLACEHOLDER}}` substitution.

const PREAMBLE: &str = r#"#set document(title: "{{DOCUMENT_TITLE}}")
#set page(paper: "a4", margin: (x: 1.2cm, y: 1.2cm))
#set text(size: 8pt)

"#;

const PAGE: &str = r#"#heading(level: 1, "{{PAGE_TITLE}}")
{{SUMMARY_TABLE}}
{{PANELS}}
"#;

const PAGE_BREAK: &str = "#pagebreak()\n";

pub fn preamble() -> &'static str {
    PREAMBLE
}

pub fn page() -> &'static str {
    PAGE
}

pub fn page_break() -> &'static str {
    PAGE_BREAK
}
