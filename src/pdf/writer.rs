//! PDF document writer.
//!
//! Assembles the complete document: header, page tree, per-page content and
//! image objects, text font, outline, XMP metadata, optional PDF/A output
//! intent, info dictionary, xref table and trailer.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use md5::{Digest, Md5};

use crate::error::{Error, Result};
use crate::structure::StructureNode;

use super::conformance::PdfALevel;
use super::content::ContentStreamBuilder;
use super::font::TextFont;
use super::image::ImageXObject;
use super::object::{Object, ObjectRef};
use super::outline::build_outline;
use super::syntax::{self, dict, int, media_box, name, reference, text};
use super::xmp::XmpWriter;

/// Packaged sRGB IEC61966-2.1 profile for the PDF/A output intent.
const SRGB_ICC: &[u8] = include_bytes!("../../resources/sRGB.icc");

/// Document-level metadata for the info dictionary and the XMP packet.
#[derive(Debug, Clone, Default)]
pub struct DocumentMetadata {
    /// Document title
    pub title: String,
    /// Author (the descriptive person)
    pub author: String,
    /// Optional creator
    pub creator: Option<String>,
    /// Optional keyword list
    pub keywords: Option<String>,
    /// Producing tool
    pub producer: String,
}

/// One page queued for writing.
pub struct DocumentPage {
    /// Page width in PDF units (1 px = 1 unit)
    pub width: f32,
    /// Page height in PDF units
    pub height: f32,
    /// Background image covering the page
    pub image: ImageXObject,
    /// Content stream (text layer + image placement)
    pub content: ContentStreamBuilder,
}

/// What `save` produced; the stamper needs these to append an update.
#[derive(Debug, Clone)]
pub struct WrittenPdf {
    /// Location of the written file
    pub path: PathBuf,
    /// Object id of the info dictionary
    pub info_id: u32,
    /// Object id of the catalog
    pub root_id: u32,
    /// Trailer `Size` (highest object number + 1)
    pub trailer_size: u32,
    /// Byte offset of the xref table
    pub startxref: usize,
    /// File identifier bytes from the trailer `ID`
    pub file_id: Vec<u8>,
    /// Info entries as written (merged by the stamper on update)
    pub info_entries: Vec<(String, String)>,
    /// Number of pages written
    pub page_count: usize,
    /// Whether an outline was attached
    pub outline_attached: bool,
}

/// Builds one PDF document.
pub struct DocumentWriter {
    metadata: DocumentMetadata,
    conformance: Option<PdfALevel>,
    pages: Vec<DocumentPage>,
}

impl DocumentWriter {
    /// Create a writer; `conformance` switches PDF/A mode on.
    pub fn new(metadata: DocumentMetadata, conformance: Option<PdfALevel>) -> Self {
        Self {
            metadata,
            conformance,
            pages: Vec::new(),
        }
    }

    /// Queue a page. Pages appear in the order they are added.
    pub fn add_page(&mut self, page: DocumentPage) {
        self.pages.push(page);
    }

    /// Number of queued pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Assemble and write the document; returns the handle the stamper uses.
    pub fn save(
        self,
        path: &Path,
        font: &TextFont,
        outline_tree: Option<&StructureNode>,
    ) -> Result<WrittenPdf> {
        let (bytes, mut written) = self.finish(font, outline_tree)?;
        std::fs::write(path, bytes)?;
        written.path = path.to_path_buf();
        Ok(written)
    }

    /// Assemble the document bytes.
    fn finish(
        self,
        font: &TextFont,
        outline_tree: Option<&StructureNode>,
    ) -> Result<(Vec<u8>, WrittenPdf)> {
        if self.pages.is_empty() {
            return Err(Error::Pdf("document has no pages".to_string()));
        }

        let version = self
            .conformance
            .map(|c| c.pdf_version())
            .unwrap_or("1.7");

        let mut next_obj_id: u32 = 1;
        let mut alloc = move || {
            let id = next_obj_id;
            next_obj_id += 1;
            id
        };

        let mut objects: Vec<(u32, Object)> = Vec::new();

        let catalog_id = alloc();
        let pages_id = alloc();

        let (font_id, font_objects) = font.build_objects(&mut alloc);
        objects.extend(font_objects);

        // Page objects: dict + content stream + image XObject each.
        let page_ids: Vec<(u32, u32, u32)> = self
            .pages
            .iter()
            .map(|_| (alloc(), alloc(), alloc()))
            .collect();
        let page_refs: Vec<ObjectRef> = page_ids
            .iter()
            .map(|(page_id, _, _)| ObjectRef::new(*page_id, 0))
            .collect();

        for (page, (page_id, content_id, image_id)) in self.pages.into_iter().zip(&page_ids) {
            let resources = dict(vec![
                (
                    "Font",
                    dict(vec![(super::font::FONT_RESOURCE, reference(font_id))]),
                ),
                ("XObject", dict(vec![("Im1", reference(*image_id))])),
            ]);

            let page_obj = dict(vec![
                ("Type", name("Page")),
                ("Parent", reference(pages_id)),
                ("MediaBox", media_box(page.width as f64, page.height as f64)),
                ("Contents", reference(*content_id)),
                ("Resources", resources),
            ]);
            objects.push((*page_id, page_obj));

            objects.push((
                *content_id,
                Object::Stream {
                    dict: Default::default(),
                    data: page.content.build(),
                },
            ));
            objects.push((*image_id, page.image.into_stream()));
        }

        // Outline from the structure tree.
        let outline = outline_tree.and_then(|tree| build_outline(tree, &page_refs, &mut alloc));
        let outline_attached = outline.is_some();

        // XMP metadata stream.
        let metadata_id = alloc();
        let mut xmp = XmpWriter::new()
            .title(&self.metadata.title)
            .creator(&self.metadata.author)
            .producer(&self.metadata.producer)
            .create_date(Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string());
        if let Some(creator) = &self.metadata.creator {
            xmp = xmp.creator_tool(creator);
        }
        if let Some(keywords) = &self.metadata.keywords {
            xmp = xmp.keywords(keywords);
        }
        if let Some(level) = self.conformance {
            xmp = xmp.pdfa(level);
        }
        let mut metadata_dict = HashMap::new();
        metadata_dict.insert("Type".to_string(), Object::Name("Metadata".to_string()));
        metadata_dict.insert("Subtype".to_string(), Object::Name("XML".to_string()));
        objects.push((
            metadata_id,
            Object::Stream {
                dict: metadata_dict,
                data: xmp.build(),
            },
        ));

        // Output intent with the packaged sRGB profile.
        let output_intent_ref = self.conformance.map(|_| {
            let icc_id = alloc();
            let mut icc_dict = HashMap::new();
            icc_dict.insert("N".to_string(), Object::Integer(3));
            objects.push((
                icc_id,
                Object::Stream {
                    dict: icc_dict,
                    data: SRGB_ICC.to_vec(),
                },
            ));

            let intent_id = alloc();
            let intent = dict(vec![
                ("Type", name("OutputIntent")),
                ("S", name("GTS_PDFA1")),
                ("OutputConditionIdentifier", text("sRGB IEC61966-2.1")),
                ("Info", text("sRGB IEC61966-2.1")),
                ("DestOutputProfile", reference(icc_id)),
            ]);
            objects.push((intent_id, intent));
            ObjectRef::new(intent_id, 0)
        });

        // Info dictionary.
        let info_id = alloc();
        let creation_date = Utc::now().format("D:%Y%m%d%H%M%SZ").to_string();
        let mut info_entries: Vec<(String, String)> = vec![
            ("Title".to_string(), self.metadata.title.clone()),
            ("Author".to_string(), self.metadata.author.clone()),
            ("Producer".to_string(), self.metadata.producer.clone()),
            ("CreationDate".to_string(), creation_date),
        ];
        if let Some(creator) = &self.metadata.creator {
            info_entries.push(("Creator".to_string(), creator.clone()));
        }
        if let Some(keywords) = &self.metadata.keywords {
            info_entries.push(("Keywords".to_string(), keywords.clone()));
        }
        objects.push((info_id, info_dict(&info_entries)));

        // Pages and catalog.
        let pages_obj = dict(vec![
            ("Type", name("Pages")),
            (
                "Kids",
                Object::Array(page_refs.iter().map(|r| Object::Reference(*r)).collect()),
            ),
            ("Count", int(page_refs.len() as i64)),
        ]);
        objects.push((pages_id, pages_obj));

        let mut catalog_entries = vec![
            ("Type", name("Catalog")),
            ("Pages", reference(pages_id)),
            ("Metadata", reference(metadata_id)),
        ];
        if let Some(outline) = &outline {
            catalog_entries.push(("Outlines", Object::Reference(outline.root_ref)));
            catalog_entries.push(("PageMode", name("UseOutlines")));
        }
        if let Some(intent_ref) = output_intent_ref {
            catalog_entries.push((
                "OutputIntents",
                Object::Array(vec![Object::Reference(intent_ref)]),
            ));
        }
        objects.push((catalog_id, dict(catalog_entries)));

        if let Some(outline) = outline {
            objects.extend(outline.objects);
        }

        // Serialize body in object-number order.
        objects.sort_by_key(|(id, _)| *id);
        let trailer_size = objects.last().map(|(id, _)| id + 1).unwrap_or(1);

        let mut output = Vec::new();
        writeln!(output, "%PDF-{}", version)?;
        output.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");

        let mut xref_offsets: Vec<(u32, usize)> = Vec::with_capacity(objects.len());
        for (id, obj) in &objects {
            xref_offsets.push((*id, output.len()));
            output.extend_from_slice(&syntax::indirect_object(*id, 0, obj));
        }

        // File identifier over the body bytes.
        let file_id: Vec<u8> = Md5::digest(&output).to_vec();

        let xref_start = output.len();
        writeln!(output, "xref")?;
        writeln!(output, "0 {}", trailer_size)?;
        writeln!(output, "0000000000 65535 f ")?;
        for (_, offset) in &xref_offsets {
            writeln!(output, "{:010} 00000 n ", offset)?;
        }

        let trailer = dict(vec![
            ("Size", int(trailer_size as i64)),
            ("Root", reference(catalog_id)),
            ("Info", reference(info_id)),
            (
                "ID",
                Object::Array(vec![
                    Object::String(file_id.clone()),
                    Object::String(file_id.clone()),
                ]),
            ),
        ]);
        writeln!(output, "trailer")?;
        output.extend_from_slice(&syntax::render(&trailer));
        writeln!(output)?;
        writeln!(output, "startxref")?;
        writeln!(output, "{}", xref_start)?;
        write!(output, "%%EOF")?;

        let written = WrittenPdf {
            path: PathBuf::new(),
            info_id,
            root_id: catalog_id,
            trailer_size,
            startxref: xref_start,
            file_id,
            info_entries,
            page_count: page_refs.len(),
            outline_attached,
        };
        Ok((output, written))
    }
}

/// Build an info dictionary from string entries.
pub(crate) fn info_dict(entries: &[(String, String)]) -> Object {
    let map: HashMap<String, Object> = entries
        .iter()
        .map(|(k, v)| (k.clone(), Object::String(v.as_bytes().to_vec())))
        .collect();
    Object::Dictionary(map)
}
