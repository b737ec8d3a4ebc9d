//! In-place info stamping.
//!
//! After the document is closed, extra info entries (the custom headers) are
//! merged by appending an incremental update: a replacement info object, an
//! xref section covering it, and a trailer chaining back via `Prev`. The
//! original bytes stay untouched.

use std::io::Write;

use crate::error::Result;

use super::object::Object;
use super::syntax::{self, dict, int, reference};
use super::writer::{info_dict, WrittenPdf};

/// Merge `extra` entries into the document's info dictionary on disk.
///
/// Existing entries are kept; an extra entry with a known key replaces it.
pub fn merge_info(written: &WrittenPdf, extra: &[(String, String)]) -> Result<()> {
    if extra.is_empty() {
        return Ok(());
    }

    let mut entries = written.info_entries.clone();
    for (key, value) in extra {
        if let Some(slot) = entries.iter_mut().find(|(k, _)| k == key) {
            slot.1 = value.clone();
        } else {
            entries.push((key.clone(), value.clone()));
        }
    }

    let base = std::fs::metadata(&written.path)?.len() as usize;

    let mut update = Vec::new();
    writeln!(update)?;
    let info_offset = base + update.len();
    update.extend_from_slice(&syntax::indirect_object(
        written.info_id,
        0,
        &info_dict(&entries),
    ));

    let xref_offset = base + update.len();
    writeln!(update, "xref")?;
    writeln!(update, "{} 1", written.info_id)?;
    writeln!(update, "{:010} 00000 n ", info_offset)?;

    let trailer = dict(vec![
        ("Size", int(written.trailer_size as i64)),
        ("Root", reference(written.root_id)),
        ("Info", reference(written.info_id)),
        ("Prev", int(written.startxref as i64)),
        (
            "ID",
            Object::Array(vec![
                Object::String(written.file_id.clone()),
                Object::String(written.file_id.clone()),
            ]),
        ),
    ]);
    writeln!(update, "trailer")?;
    update.extend_from_slice(&syntax::render(&trailer));
    writeln!(update)?;
    writeln!(update, "startxref")?;
    writeln!(update, "{}", xref_offset)?;
    write!(update, "%%EOF")?;

    let mut file = std::fs::OpenOptions::new().append(true).open(&written.path)?;
    file.write_all(&update)?;
    Ok(())
}
