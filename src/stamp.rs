//! Watermark stamping.
//!
//! Every page gets one extra content stream that draws the configured text,
//! rotated about an anchor taken from that page's own MediaBox. Existing page
//! content is bracketed by `q`/`Q` so whatever graphics state it leaves behind
//! cannot shift or recolor the stamp.

use crate::{config::Watermark, error::PipelineError};
use lopdf::{
    content::{Content, Operation},
    dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat,
};
use tracing::debug;

/// Resource name of the stamp font inside each page's `/Font` dictionary.
pub const FONT_RESOURCE: &str = "FStamp";
/// Resource name of the opacity state inside each page's `/ExtGState` dictionary.
pub const GSTATE_RESOURCE: &str = "GSStamp";

// Guards the /Parent walk against cyclic page trees.
const MAX_INHERIT_DEPTH: usize = 32;

#[derive(Debug, Clone)]
pub struct Stamped {
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

/// Page rectangle in default user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub llx: f64,
    pub lly: f64,
    pub urx: f64,
    pub ury: f64,
}

impl PageBox {
    pub fn width(&self) -> f64 {
        self.urx - self.llx
    }

    pub fn height(&self) -> f64 {
        self.ury - self.lly
    }

    /// Where the stamp's text origin lands on this page.
    pub fn anchor(&self, spec: &Watermark) -> (f64, f64) {
        (
            self.llx + self.width() * spec.x_ratio as f64,
            self.lly + self.height() * spec.y_ratio as f64,
        )
    }

    fn from_object(doc: &Document, obj: &Object) -> Option<Self> {
        let arr = resolve(doc, obj)?.as_array().ok()?;
        if arr.len() != 4 {
            return None;
        }
        let mut v = [0f64; 4];
        for (slot, item) in v.iter_mut().zip(arr) {
            *slot = number(resolve(doc, item)?)?;
        }
        Some(Self {
            llx: v[0].min(v[2]),
            lly: v[1].min(v[3]),
            urx: v[0].max(v[2]),
            ury: v[1].max(v[3]),
        })
    }
}

/// Parses `pdf_bytes`, stamps `spec` onto every page, and re-serializes.
pub fn stamp_pdf(pdf_bytes: &[u8], spec: &Watermark) -> Result<Stamped, PipelineError> {
    let mut doc =
        Document::load_mem(pdf_bytes).map_err(|e| PipelineError::Parse(e.to_string()))?;

    // A page-less document is still well formed; it passes through unstamped.
    let pages: Vec<(u32, ObjectId)> = doc.get_pages().into_iter().collect();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => Object::Name(spec.font.as_bytes().to_vec()),
        "Encoding" => "WinAnsiEncoding",
    });
    let gs_id = doc.add_object(dictionary! {
        "Type" => "ExtGState",
        "ca" => Object::Real(spec.opacity),
        "CA" => Object::Real(spec.opacity),
    });
    let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let restore_id = doc.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));

    for (page_num, page_id) in &pages {
        let media = page_box(&doc, *page_id).ok_or_else(|| {
            PipelineError::Parse(format!("page {page_num} has no usable MediaBox"))
        })?;
        let (x, y) = media.anchor(spec);
        debug!(
            "stamping page {} ({}x{}) at ({:.2}, {:.2})",
            page_num,
            media.width(),
            media.height(),
            x,
            y
        );

        let mut content = watermark_content(spec, x, y)
            .encode()
            .map_err(|e| PipelineError::Parse(format!("encoding stamp content: {e}")))?;
        content.push(b'\n');
        let stamp_id = doc.add_object(Stream::new(Dictionary::new(), content));

        merge_resources(&mut doc, *page_id, font_id, gs_id)?;

        let existing = existing_contents(&doc, *page_id)?;
        let mut contents = Vec::with_capacity(existing.len() + 3);
        if !existing.is_empty() {
            contents.push(Object::Reference(save_id));
            contents.extend(existing);
            contents.push(Object::Reference(restore_id));
        }
        contents.push(Object::Reference(stamp_id));
        page_dict_mut(&mut doc, *page_id)?.set("Contents", Object::Array(contents));
    }

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| PipelineError::Parse(format!("serializing stamped document: {e}")))?;

    Ok(Stamped {
        bytes: output,
        page_count: pages.len(),
    })
}

/// Content operations that draw one rotated, translucent copy of the text at `(x, y)`.
pub fn watermark_content(spec: &Watermark, x: f64, y: f64) -> Content {
    let theta = (spec.rotation_degrees as f64).to_radians();
    let (sin, cos) = theta.sin_cos();
    let [r, g, b] = spec.color;

    Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new("gs", vec![Object::Name(GSTATE_RESOURCE.as_bytes().to_vec())]),
            Operation::new(
                "rg",
                vec![Object::Real(r), Object::Real(g), Object::Real(b)],
            ),
            Operation::new(
                "cm",
                vec![
                    Object::Real(cos as f32),
                    Object::Real(sin as f32),
                    Object::Real(-sin as f32),
                    Object::Real(cos as f32),
                    Object::Real(x as f32),
                    Object::Real(y as f32),
                ],
            ),
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![
                    Object::Name(FONT_RESOURCE.as_bytes().to_vec()),
                    Object::Real(spec.font_size),
                ],
            ),
            Operation::new("Td", vec![0.into(), 0.into()]),
            Operation::new(
                "Tj",
                vec![Object::String(
                    spec.text.as_bytes().to_vec(),
                    StringFormat::Literal,
                )],
            ),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ],
    }
}

/// MediaBox of `page_id`, following `/Parent` when the page inherits it.
pub fn page_box(doc: &Document, page_id: ObjectId) -> Option<PageBox> {
    let mut node = page_id;
    for _ in 0..MAX_INHERIT_DEPTH {
        let dict = doc.get_object(node).ok()?.as_dict().ok()?;
        if let Ok(obj) = dict.get(b"MediaBox") {
            return PageBox::from_object(doc, obj);
        }
        node = dict.get(b"Parent").ok()?.as_reference().ok()?;
    }
    None
}

fn effective_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    let mut node = page_id;
    for _ in 0..MAX_INHERIT_DEPTH {
        let Some(dict) = doc.get_object(node).ok().and_then(|o| o.as_dict().ok()) else {
            break;
        };
        if let Ok(obj) = dict.get(b"Resources") {
            return resolve(doc, obj)
                .and_then(|o| o.as_dict().ok())
                .cloned()
                .unwrap_or_else(Dictionary::new);
        }
        match dict.get(b"Parent").and_then(Object::as_reference) {
            Ok(parent) => node = parent,
            Err(_) => break,
        }
    }
    Dictionary::new()
}

fn sub_dict(doc: &Document, resources: &Dictionary, key: &[u8]) -> Dictionary {
    resources
        .get(key)
        .ok()
        .and_then(|o| resolve(doc, o))
        .and_then(|o| o.as_dict().ok())
        .cloned()
        .unwrap_or_else(Dictionary::new)
}

/// Gives the page its own resource dictionary: the inherited one plus the stamp font and state.
fn merge_resources(
    doc: &mut Document,
    page_id: ObjectId,
    font_id: ObjectId,
    gs_id: ObjectId,
) -> Result<(), PipelineError> {
    let mut resources = effective_resources(doc, page_id);

    let mut fonts = sub_dict(doc, &resources, b"Font");
    fonts.set(FONT_RESOURCE, Object::Reference(font_id));
    resources.set("Font", Object::Dictionary(fonts));

    let mut states = sub_dict(doc, &resources, b"ExtGState");
    states.set(GSTATE_RESOURCE, Object::Reference(gs_id));
    resources.set("ExtGState", Object::Dictionary(states));

    page_dict_mut(doc, page_id)?.set("Resources", Object::Dictionary(resources));
    Ok(())
}

/// The page's content stream references, flattened to a list.
fn existing_contents(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>, PipelineError> {
    let page = doc
        .get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|e| PipelineError::Parse(e.to_string()))?;

    match page.get(b"Contents") {
        Err(_) => Ok(Vec::new()),
        Ok(Object::Array(items)) => Ok(items.clone()),
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => Ok(items.clone()),
            Ok(_) => Ok(vec![Object::Reference(*id)]),
            Err(e) => Err(PipelineError::Parse(format!(
                "dangling page content reference {id:?}: {e}"
            ))),
        },
        Ok(_) => Err(PipelineError::Parse(
            "page /Contents is neither a stream reference nor an array".into(),
        )),
    }
}

fn page_dict_mut(doc: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary, PipelineError> {
    doc.get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| PipelineError::Parse(e.to_string()))
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}
