//! PDF syntax emission.
//!
//! The document writer keeps everything in the [`Object`] model and renders
//! it to bytes here. Only the constructs derivative documents emit are
//! covered; dictionaries render with sorted keys, so two runs over the same
//! holding produce byte-identical object bodies.

use std::collections::HashMap;

use super::object::{Object, ObjectRef};

/// Render an object's body.
pub fn render(obj: &Object) -> Vec<u8> {
    let mut out = Vec::new();
    render_into(obj, &mut out);
    out
}

/// Wrap an object into an indirect definition (`id gen obj ... endobj`).
pub fn indirect_object(id: u32, gen: u16, obj: &Object) -> Vec<u8> {
    let mut out = format!("{} {} obj\n", id, gen).into_bytes();
    render_into(obj, &mut out);
    out.extend_from_slice(b"\nendobj\n");
    out
}

fn render_into(obj: &Object, out: &mut Vec<u8>) {
    match obj {
        Object::Null => out.extend_from_slice(b"null"),
        Object::Boolean(true) => out.extend_from_slice(b"true"),
        Object::Boolean(false) => out.extend_from_slice(b"false"),
        Object::Integer(v) => out.extend_from_slice(v.to_string().as_bytes()),
        Object::Real(v) => push_number(out, *v),
        Object::String(bytes) => push_string(out, bytes),
        Object::Name(n) => push_name(out, n),
        Object::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b' ');
                }
                render_into(item, out);
            }
            out.push(b']');
        }
        Object::Dictionary(entries) => push_dict(out, entries),
        Object::Stream { dict, data } => {
            // Length always reflects the payload; no caller pre-sets it.
            let mut dict = dict.clone();
            dict.insert("Length".to_string(), Object::Integer(data.len() as i64));
            push_dict(out, &dict);
            out.extend_from_slice(b"\nstream\n");
            out.extend_from_slice(data);
            out.extend_from_slice(b"\nendstream");
        }
        Object::Reference(r) => {
            out.extend_from_slice(format!("{} {} R", r.id, r.gen).as_bytes())
        }
    }
}

/// Page coordinates never need more than three decimals; integral values
/// render without a fraction.
fn push_number(out: &mut Vec<u8>, value: f64) {
    let rounded = (value * 1000.0).round() / 1000.0;
    if rounded == rounded.trunc() {
        out.extend_from_slice((rounded as i64).to_string().as_bytes());
    } else {
        out.extend_from_slice(rounded.to_string().as_bytes());
    }
}

/// Plain-ASCII metadata renders as a literal string with `( ) \` escaped.
/// Anything else (UTF-8 titles and names, the binary file identifier)
/// renders as a hex string.
fn push_string(out: &mut Vec<u8>, bytes: &[u8]) {
    let plain_ascii = bytes.iter().all(|b| (0x20..=0x7E).contains(b));
    if !plain_ascii {
        out.push(b'<');
        for b in bytes {
            out.extend_from_slice(format!("{:02X}", b).as_bytes());
        }
        out.push(b'>');
        return;
    }

    out.push(b'(');
    for &b in bytes {
        if matches!(b, b'(' | b')' | b'\\') {
            out.push(b'\\');
        }
        out.push(b);
    }
    out.push(b')');
}

/// Delimiter bytes, `#`, and anything outside printable ASCII escape as
/// `#XX`. The custom info headers carry spaces and rely on this.
fn push_name(out: &mut Vec<u8>, name: &str) {
    out.push(b'/');
    for b in name.bytes() {
        let delimiter = matches!(
            b,
            b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%' | b'#'
        );
        if delimiter || b <= 0x20 || b > 0x7E {
            out.extend_from_slice(format!("#{:02X}", b).as_bytes());
        } else {
            out.push(b);
        }
    }
}

fn push_dict(out: &mut Vec<u8>, dict: &HashMap<String, Object>) {
    let mut entries: Vec<(&String, &Object)> = dict.iter().collect();
    entries.sort_by_key(|(key, _)| *key);

    out.extend_from_slice(b"<<");
    for (i, (key, value)) in entries.into_iter().enumerate() {
        if i > 0 {
            out.push(b' ');
        }
        push_name(out, key);
        out.push(b' ');
        render_into(value, out);
    }
    out.extend_from_slice(b">>");
}

/// Name object.
pub fn name(s: &str) -> Object {
    Object::Name(s.to_string())
}

/// String object from text.
pub fn text(s: &str) -> Object {
    Object::String(s.as_bytes().to_vec())
}

/// Integer object.
pub fn int(v: i64) -> Object {
    Object::Integer(v)
}

/// Reference to an indirect object. The writer allocates every object
/// fresh, so generations are always zero.
pub fn reference(id: u32) -> Object {
    Object::Reference(ObjectRef::new(id, 0))
}

/// Dictionary from key/value pairs.
pub fn dict(entries: Vec<(&str, Object)>) -> Object {
    Object::Dictionary(
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
    )
}

/// Media box of a pixel-sized page: derivative pages sit at the origin
/// with zero margins, so only the extent varies.
pub fn media_box(width: f64, height: f64) -> Object {
    Object::Array(vec![
        Object::Integer(0),
        Object::Integer(0),
        Object::Real(width),
        Object::Real(height),
    ])
}
