// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Stamping the signature into the PDF.
//!
//! The image becomes an image XObject registered in page 1's resources and
//! is drawn by a content stream appended after the page's own content. The
//! existing content is wrapped in `q`/`Q` first so any graphics state it
//! leaves behind cannot skew the stamp.

use crate::error::SignError;
use crate::models::mark::MarkFormat;
use crate::util::geometry::PagePlacement;
use image::ImageFormat;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

/// Embed `image` on the first page of `pdf` at `at` and serialize the result.
pub fn embed_mark(
    pdf: &[u8],
    image: &[u8],
    format: &MarkFormat,
    at: PagePlacement,
) -> Result<Vec<u8>, SignError> {
    let mut doc = Document::load_mem(pdf)?;
    let page_id = *doc
        .get_pages()
        .get(&1)
        .ok_or_else(|| SignError::EmbedFailure("document has no pages".into()))?;

    let image_id = match format {
        MarkFormat::Png => embed_png(&mut doc, image)?,
        MarkFormat::Jpeg => embed_jpeg(&mut doc, image)?,
        MarkFormat::Unsupported(mime) => {
            return Err(SignError::EmbedFailure(format!(
                "{mime} images cannot be embedded, use PNG or JPEG"
            )))
        }
    };

    let name = register_xobject(&mut doc, page_id, image_id)?;
    append_drawing(&mut doc, page_id, &name, at)?;

    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    log::info!(
        "Embedded signature as /{} at ({:.1}, {:.1}) size {:.1}x{:.1}",
        String::from_utf8_lossy(&name),
        at.x,
        at.y,
        at.width,
        at.height
    );
    Ok(out)
}

/// Decode the PNG and store it as flate-compressed RGB with a soft mask
/// carrying the alpha channel. Opaque images get no mask.
fn embed_png(doc: &mut Document, bytes: &[u8]) -> Result<ObjectId, SignError> {
    let img = image::load_from_memory_with_format(bytes, ImageFormat::Png)?.to_rgba8();
    let (width, height) = img.dimensions();

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    let mut alpha = Vec::with_capacity((width * height) as usize);
    for pixel in img.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel[3]);
    }

    let mut image_dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
    };

    if alpha.iter().any(|&a| a != u8::MAX) {
        let mut smask = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            alpha,
        );
        smask.compress()?;
        let smask_id = doc.add_object(smask);
        image_dict.set("SMask", smask_id);
    }

    let mut stream = Stream::new(image_dict, rgb);
    stream.compress()?;
    Ok(doc.add_object(stream))
}

/// JPEG data goes in as-is behind a DCTDecode filter.
fn embed_jpeg(doc: &mut Document, bytes: &[u8]) -> Result<ObjectId, SignError> {
    let header = jpeg_header(bytes)
        .ok_or_else(|| SignError::EmbedFailure("not a readable JPEG".into()))?;

    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => header.width as i64,
        "Height" => header.height as i64,
        "BitsPerComponent" => header.precision as i64,
        "Filter" => "DCTDecode",
    };
    match header.components {
        1 => dict.set("ColorSpace", "DeviceGray"),
        3 => dict.set("ColorSpace", "DeviceRGB"),
        4 => {
            // Adobe CMYK JPEGs store inverted samples
            dict.set("ColorSpace", "DeviceCMYK");
            dict.set(
                "Decode",
                (0..8).map(|i| Object::Integer(if i % 2 == 0 { 1 } else { 0 })).collect::<Vec<_>>(),
            );
        }
        n => {
            return Err(SignError::EmbedFailure(format!(
                "JPEG with {n} colour components"
            )))
        }
    }

    let stream = Stream::new(dict, bytes.to_vec()).with_compression(false);
    Ok(doc.add_object(stream))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct JpegHeader {
    width: u16,
    height: u16,
    precision: u8,
    components: u8,
}

/// Scan JPEG markers up to the first start-of-frame segment.
fn jpeg_header(bytes: &[u8]) -> Option<JpegHeader> {
    if !bytes.starts_with(&[0xFF, 0xD8]) {
        return None;
    }

    let mut pos = 2;
    loop {
        if *bytes.get(pos)? != 0xFF {
            return None;
        }
        // Fill bytes
        while *bytes.get(pos + 1)? == 0xFF {
            pos += 1;
        }
        let marker = *bytes.get(pos + 1)?;
        pos += 2;

        // Standalone markers carry no length
        if marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
            continue;
        }

        let length = u16::from_be_bytes([*bytes.get(pos)?, *bytes.get(pos + 1)?]) as usize;
        let is_frame = matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_frame {
            let segment = bytes.get(pos + 2..pos + 8)?;
            let header = JpegHeader {
                precision: segment[0],
                height: u16::from_be_bytes([segment[1], segment[2]]),
                width: u16::from_be_bytes([segment[3], segment[4]]),
                components: segment[5],
            };
            return (header.width > 0 && header.height > 0).then_some(header);
        }
        if marker == 0xDA || length < 2 {
            return None;
        }
        pos += length;
    }
}

/// Resolve a dictionary that may sit behind a reference, returning a copy.
fn resolve_dict(doc: &Document, obj: &Object) -> Result<Dictionary, SignError> {
    match obj {
        Object::Dictionary(dict) => Ok(dict.clone()),
        Object::Reference(id) => Ok(doc.get_dictionary(*id)?.clone()),
        _ => Err(SignError::EmbedFailure("malformed resource dictionary".into())),
    }
}

/// The page's effective resources, following inheritance up the page tree.
fn page_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary, SignError> {
    let mut current = Some(page_id);
    while let Some(id) = current {
        let dict = doc.get_dictionary(id)?;
        if let Ok(resources) = dict.get(b"Resources") {
            return resolve_dict(doc, resources);
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }
    Ok(Dictionary::new())
}

/// Add the image to the page's XObject resources under a fresh name.
///
/// Resources are copied onto the page itself so pages sharing an inherited
/// or referenced dictionary are left untouched.
fn register_xobject(
    doc: &mut Document,
    page_id: ObjectId,
    image_id: ObjectId,
) -> Result<Vec<u8>, SignError> {
    let mut resources = page_resources(doc, page_id)?;
    let mut xobjects = match resources.get(b"XObject") {
        Ok(obj) => resolve_dict(doc, obj)?,
        Err(_) => Dictionary::new(),
    };

    let name = (0..)
        .map(|n| format!("Sig{n}").into_bytes())
        .find(|candidate| !xobjects.has(candidate))
        .ok_or_else(|| SignError::EmbedFailure("no free XObject name".into()))?;

    xobjects.set(name.clone(), image_id);
    resources.set("XObject", xobjects);
    doc.get_object_mut(page_id)
        .and_then(|obj| obj.as_dict_mut())?
        .set("Resources", resources);
    Ok(name)
}

/// Object ids of the page's current content streams, in order.
fn content_ids(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>, SignError> {
    let page = doc.get_dictionary(page_id)?;
    let ids = match page.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id)? {
            Object::Array(items) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(items)) => items.clone(),
        Ok(_) => return Err(SignError::EmbedFailure("malformed page contents".into())),
        Err(_) => Vec::new(),
    };
    Ok(ids)
}

fn append_drawing(
    doc: &mut Document,
    page_id: ObjectId,
    name: &[u8],
    at: PagePlacement,
) -> Result<(), SignError> {
    let existing = content_ids(doc, page_id)?;

    let open = Content {
        operations: vec![Operation::new("q", vec![])],
    };
    let draw = Content {
        operations: vec![
            Operation::new("Q", vec![]),
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(at.width as f32),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(at.height as f32),
                    Object::Real(at.x as f32),
                    Object::Real(at.y as f32),
                ],
            ),
            Operation::new("Do", vec![Object::Name(name.to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };

    // Viewers concatenate the content array, so every stream we add is
    // delimited by newlines on the sides that touch existing content.
    let mut open_bytes = open.encode()?;
    open_bytes.push(b'\n');
    let mut draw_bytes = vec![b'\n'];
    draw_bytes.extend(draw.encode()?);
    draw_bytes.push(b'\n');

    let open_id = doc.add_object(Stream::new(Dictionary::new(), open_bytes));
    let draw_id = doc.add_object(Stream::new(Dictionary::new(), draw_bytes));

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(open_id));
    contents.extend(existing);
    contents.push(Object::Reference(draw_id));

    doc.get_object_mut(page_id)
        .and_then(|obj| obj.as_dict_mut())?
        .set("Contents", contents);
    Ok(())
}
