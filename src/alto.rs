//! ALTO OCR parsing.
//!
//! Streams one per-page ALTO file into an [`OcrPage`]: the page box plus the
//! recognised text lines with their pixel bounds. Only `TextLine` elements
//! carrying all four of `HPOS`/`VPOS`/`WIDTH`/`HEIGHT` survive; the line
//! text is the `CONTENT` of its `String` children joined by single spaces.

use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Error, Result};
use crate::model::{OcrPage, PixelBox, TextLine};

/// Read and parse one ALTO file.
pub fn read_alto(path: &Path) -> Result<OcrPage> {
    let xml = std::fs::read_to_string(path)?;
    parse_alto(&xml, &path.display().to_string())
}

/// Parse ALTO XML into an [`OcrPage`].
pub fn parse_alto(xml: &str, source: &str) -> Result<OcrPage> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut page_width: Option<u32> = None;
    let mut page_height: Option<u32> = None;
    let mut lines: Vec<TextLine> = Vec::new();

    // State of the TextLine currently being collected.
    let mut current_bounds: Option<PixelBox> = None;
    let mut current_words: Vec<String> = Vec::new();

    let mut buf = Vec::new();
    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| Error::Parse {
            source_file: source.to_string(),
            reason: e.to_string(),
        })?;

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                match e.local_name().as_ref() {
                    b"Page" => {
                        page_width = dimension_attr(e, b"WIDTH");
                        page_height = dimension_attr(e, b"HEIGHT");
                    }
                    b"TextLine" => {
                        current_bounds = text_line_bounds(e);
                        current_words.clear();
                    }
                    b"String" => {
                        if current_bounds.is_some() {
                            if let Some(content) = string_attr(e, b"CONTENT") {
                                let content = content.trim();
                                if !content.is_empty() {
                                    current_words.push(content.to_string());
                                }
                            }
                        }
                    }
                    _ => {}
                }
                // Self-closing TextLine elements carry no strings.
                if matches!(event, Event::Empty(_)) && e.local_name().as_ref() == b"TextLine" {
                    current_bounds = None;
                }
            }
            Event::End(ref e) if e.local_name().as_ref() == b"TextLine" => {
                if let Some(bounds) = current_bounds.take() {
                    let text = current_words.join(" ");
                    if !text.is_empty() {
                        lines.push(TextLine { text, bounds });
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    let page_width = page_width.ok_or_else(|| Error::Parse {
        source_file: source.to_string(),
        reason: "ALTO Page element lacks WIDTH".to_string(),
    })?;
    let page_height = page_height.ok_or_else(|| Error::Parse {
        source_file: source.to_string(),
        reason: "ALTO Page element lacks HEIGHT".to_string(),
    })?;

    // Parse-time invariant: bounds lie within the page box.
    for line in &mut lines {
        line.bounds = line.bounds.clamp_to(page_width, page_height);
    }

    Ok(OcrPage {
        page_width,
        page_height,
        lines,
    })
}

/// Read a numeric attribute, tolerating the fractional values some OCR
/// engines emit.
fn dimension_attr(e: &BytesStart<'_>, name: &[u8]) -> Option<u32> {
    string_attr(e, name)
        .and_then(|v| v.parse::<f32>().ok())
        .map(|v| v.max(0.0).round() as u32)
}

fn string_attr(e: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    e.attributes()
        .filter_map(|a| a.ok())
        .find(|a| a.key.local_name().as_ref() == name)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

fn text_line_bounds(e: &BytesStart<'_>) -> Option<PixelBox> {
    Some(PixelBox::new(
        dimension_attr(e, b"HPOS")?,
        dimension_attr(e, b"VPOS")?,
        dimension_attr(e, b"WIDTH")?,
        dimension_attr(e, b"HEIGHT")?,
    ))
}
