//! XMP metadata packets for produced documents.
//!
//! Generates the XML metadata stream referenced from the catalog. In PDF/A
//! mode the packet additionally carries the `pdfaid` part and conformance
//! the archive validator looks for.

use super::conformance::PdfALevel;

/// XMP namespace URIs
const NS_X: &str = "adobe:ns:meta/";
const NS_RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
const NS_DC: &str = "http://purl.org/dc/elements/1.1/";
const NS_XMP: &str = "http://ns.adobe.com/xap/1.0/";
const NS_PDF: &str = "http://ns.adobe.com/pdf/1.3/";
const NS_PDFAID: &str = "http://www.aiim.org/pdfa/ns/id/";

/// XMP packet builder.
#[derive(Debug, Clone, Default)]
pub struct XmpWriter {
    title: Option<String>,
    creator: Option<String>,
    creator_tool: Option<String>,
    producer: Option<String>,
    keywords: Option<String>,
    create_date: Option<String>,
    pdfa: Option<PdfALevel>,
}

impl XmpWriter {
    /// Create an empty packet builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the document title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the author.
    pub fn creator(mut self, creator: impl Into<String>) -> Self {
        self.creator = Some(creator.into());
        self
    }

    /// Set the creating tool.
    pub fn creator_tool(mut self, tool: impl Into<String>) -> Self {
        self.creator_tool = Some(tool.into());
        self
    }

    /// Set the producer.
    pub fn producer(mut self, producer: impl Into<String>) -> Self {
        self.producer = Some(producer.into());
        self
    }

    /// Set the keyword list.
    pub fn keywords(mut self, keywords: impl Into<String>) -> Self {
        self.keywords = Some(keywords.into());
        self
    }

    /// Set the creation date (ISO 8601).
    pub fn create_date(mut self, date: impl Into<String>) -> Self {
        self.create_date = Some(date.into());
        self
    }

    /// Claim PDF/A conformance at the given level.
    pub fn pdfa(mut self, level: PdfALevel) -> Self {
        self.pdfa = Some(level);
        self
    }

    /// Build the packet bytes for the metadata stream.
    pub fn build(&self) -> Vec<u8> {
        let mut xml = String::new();
        xml.push_str(r#"<?xpacket begin="" id="W5M0MpCehiHzreSzNTczkc9d"?>"#);
        xml.push('\n');
        xml.push_str(&format!(r#"<x:xmpmeta xmlns:x="{}">"#, NS_X));
        xml.push('\n');
        xml.push_str(&format!(r#"  <rdf:RDF xmlns:rdf="{}">"#, NS_RDF));
        xml.push('\n');
        xml.push_str("    <rdf:Description rdf:about=\"\"\n");
        xml.push_str(&format!("        xmlns:dc=\"{}\"\n", NS_DC));
        xml.push_str(&format!("        xmlns:xmp=\"{}\"\n", NS_XMP));
        xml.push_str(&format!("        xmlns:pdf=\"{}\"\n", NS_PDF));
        xml.push_str(&format!("        xmlns:pdfaid=\"{}\">\n", NS_PDFAID));

        if let Some(title) = &self.title {
            xml.push_str("      <dc:title>\n        <rdf:Alt>\n");
            xml.push_str(&format!(
                "          <rdf:li xml:lang=\"x-default\">{}</rdf:li>\n",
                escape_xml(title)
            ));
            xml.push_str("        </rdf:Alt>\n      </dc:title>\n");
        }

        if let Some(creator) = &self.creator {
            xml.push_str("      <dc:creator>\n        <rdf:Seq>\n");
            xml.push_str(&format!(
                "          <rdf:li>{}</rdf:li>\n",
                escape_xml(creator)
            ));
            xml.push_str("        </rdf:Seq>\n      </dc:creator>\n");
        }

        if let Some(tool) = &self.creator_tool {
            xml.push_str(&format!(
                "      <xmp:CreatorTool>{}</xmp:CreatorTool>\n",
                escape_xml(tool)
            ));
        }

        if let Some(date) = &self.create_date {
            xml.push_str(&format!(
                "      <xmp:CreateDate>{}</xmp:CreateDate>\n",
                escape_xml(date)
            ));
        }

        if let Some(producer) = &self.producer {
            xml.push_str(&format!(
                "      <pdf:Producer>{}</pdf:Producer>\n",
                escape_xml(producer)
            ));
        }

        if let Some(keywords) = &self.keywords {
            xml.push_str(&format!(
                "      <pdf:Keywords>{}</pdf:Keywords>\n",
                escape_xml(keywords)
            ));
        }

        if let Some(level) = self.pdfa {
            xml.push_str(&format!("      <pdfaid:part>{}</pdfaid:part>\n", level.xmp_part()));
            xml.push_str(&format!(
                "      <pdfaid:conformance>{}</pdfaid:conformance>\n",
                level.xmp_conformance()
            ));
        }

        xml.push_str("    </rdf:Description>\n");
        xml.push_str("  </rdf:RDF>\n");
        xml.push_str("</x:xmpmeta>\n");

        // Padding so later in-place editors can grow the packet.
        for _ in 0..20 {
            xml.push_str("                                                  \n");
        }
        xml.push_str(r#"<?xpacket end="w"?>"#);

        xml.into_bytes()
    }
}

/// Escape special XML characters.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
