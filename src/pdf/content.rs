//! PDF content stream builder.
//!
//! Emits the operator sequences a derivative page needs: the invisible OCR
//! text layer (under-layer) and the full-page image placement drawn over it.

use std::io::Write;

use super::font::EncodedText;

/// Operations that can be added to a content stream.
#[derive(Debug, Clone)]
enum ContentOp {
    /// Save graphics state (q)
    SaveState,
    /// Restore graphics state (Q)
    RestoreState,
    /// Set transformation matrix (cm)
    Transform(f32, f32, f32, f32, f32, f32),
    /// Paint XObject (Do)
    PaintXObject(String),
    /// Begin text object (BT)
    BeginText,
    /// End text object (ET)
    EndText,
    /// Set text rendering mode (Tr)
    SetRenderMode(u8),
    /// Set font and size (Tf)
    SetFont(String, f32),
    /// Set text matrix (Tm)
    SetTextMatrix(f32, f32, f32, f32, f32, f32),
    /// Show literal text (Tj)
    ShowLiteral(Vec<u8>),
    /// Show hex-encoded glyphs (Tj)
    ShowHex(String),
}

/// Builder for one page's content stream.
#[derive(Debug, Clone, Default)]
pub struct ContentStreamBuilder {
    ops: Vec<ContentOp>,
}

impl ContentStreamBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Paint a named image XObject covering `width x height` at the origin.
    pub fn draw_image(&mut self, name: &str, width: f32, height: f32) -> &mut Self {
        self.ops.push(ContentOp::SaveState);
        self.ops
            .push(ContentOp::Transform(width, 0.0, 0.0, height, 0.0, 0.0));
        self.ops.push(ContentOp::PaintXObject(name.to_string()));
        self.ops.push(ContentOp::RestoreState);
        self
    }

    /// Show one invisible text chunk with its baseline at `(x, y)`.
    pub fn draw_hidden_text(
        &mut self,
        font: &str,
        size: f32,
        x: f32,
        y: f32,
        text: EncodedText,
    ) -> &mut Self {
        self.ops.push(ContentOp::BeginText);
        self.ops.push(ContentOp::SetRenderMode(3));
        self.ops.push(ContentOp::SetFont(font.to_string(), size));
        self.ops
            .push(ContentOp::SetTextMatrix(1.0, 0.0, 0.0, 1.0, x, y));
        match text {
            EncodedText::Literal(bytes) => self.ops.push(ContentOp::ShowLiteral(bytes)),
            EncodedText::Hex(hex) => self.ops.push(ContentOp::ShowHex(hex)),
        }
        self.ops.push(ContentOp::EndText);
        self
    }

    /// Render the collected operators as stream bytes.
    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for op in &self.ops {
            match op {
                ContentOp::SaveState => writeln!(out, "q").unwrap(),
                ContentOp::RestoreState => writeln!(out, "Q").unwrap(),
                ContentOp::Transform(a, b, c, d, e, f) => writeln!(
                    out,
                    "{} {} {} {} {} {} cm",
                    num(*a),
                    num(*b),
                    num(*c),
                    num(*d),
                    num(*e),
                    num(*f)
                )
                .unwrap(),
                ContentOp::PaintXObject(name) => writeln!(out, "/{} Do", name).unwrap(),
                ContentOp::BeginText => writeln!(out, "BT").unwrap(),
                ContentOp::EndText => writeln!(out, "ET").unwrap(),
                ContentOp::SetRenderMode(mode) => writeln!(out, "{} Tr", mode).unwrap(),
                ContentOp::SetFont(name, size) => {
                    writeln!(out, "/{} {} Tf", name, num(*size)).unwrap()
                }
                ContentOp::SetTextMatrix(a, b, c, d, e, f) => writeln!(
                    out,
                    "{} {} {} {} {} {} Tm",
                    num(*a),
                    num(*b),
                    num(*c),
                    num(*d),
                    num(*e),
                    num(*f)
                )
                .unwrap(),
                ContentOp::ShowLiteral(bytes) => {
                    out.push(b'(');
                    for &byte in bytes {
                        match byte {
                            b'(' => out.extend_from_slice(b"\\("),
                            b')' => out.extend_from_slice(b"\\)"),
                            b'\\' => out.extend_from_slice(b"\\\\"),
                            _ => out.push(byte),
                        }
                    }
                    out.extend_from_slice(b") Tj\n");
                }
                ContentOp::ShowHex(hex) => writeln!(out, "{} Tj", hex).unwrap(),
            }
        }
        out
    }

    /// True when nothing has been drawn yet.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Format a coordinate: integers stay integral, fractions keep two places.
fn num(v: f32) -> String {
    if v.fract() == 0.0 {
        format!("{}", v as i64)
    } else {
        let s = format!("{:.2}", v);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}
