// Minimal markup scanner.
//
// The document is walked as a borrowed `&str`; every step hands back the
// element it found together with the remaining input, so no cursor ever
// outlives the buffer it points into. Quotes are only significant inside a
// tag, never in text content between tags.

use crate::error::SvgPenError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Svg,
    Group,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Line,
    Polyline,
    Polygon,
    Rect,
    Circle,
    Ellipse,
    Path,
}

impl ShapeKind {
    pub fn name(self) -> &'static str {
        match self {
            ShapeKind::Line => "line",
            ShapeKind::Polyline => "polyline",
            ShapeKind::Polygon => "polygon",
            ShapeKind::Rect => "rect",
            ShapeKind::Circle => "circle",
            ShapeKind::Ellipse => "ellipse",
            ShapeKind::Path => "path",
        }
    }
}

impl ContainerKind {
    pub fn name(self) -> &'static str {
        match self {
            ContainerKind::Svg => "svg",
            ContainerKind::Group => "g",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Container(ContainerKind),
    Shape(ShapeKind),
    Unrecognized,
    End,
}

impl ElementKind {
    fn from_name(name: &str) -> ElementKind {
        match name {
            "svg" => ElementKind::Container(ContainerKind::Svg),
            "g" => ElementKind::Container(ContainerKind::Group),
            "line" => ElementKind::Shape(ShapeKind::Line),
            "polyline" => ElementKind::Shape(ShapeKind::Polyline),
            "polygon" => ElementKind::Shape(ShapeKind::Polygon),
            "rect" => ElementKind::Shape(ShapeKind::Rect),
            "circle" => ElementKind::Shape(ShapeKind::Circle),
            "ellipse" => ElementKind::Shape(ShapeKind::Ellipse),
            "path" => ElementKind::Shape(ShapeKind::Path),
            _ => ElementKind::Unrecognized,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ElementKind::Container(c) => c.name(),
            ElementKind::Shape(s) => s.name(),
            ElementKind::Unrecognized => "unrecognized",
            ElementKind::End => "end",
        }
    }
}

/// One element pulled from the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element<'a> {
    pub kind: ElementKind,
    /// Raw text between the element name and the tag terminator.
    pub attributes: &'a str,
    /// Everything between the open and the matching close tag; empty for
    /// self-closing elements.
    pub content: &'a str,
}

impl<'a> Element<'a> {
    fn end() -> Self {
        Self {
            kind: ElementKind::End,
            attributes: "",
            content: "",
        }
    }
}

/// Like `haystack[start..].find(needle)`, but skips over `"..."` and `'...'`
/// spans. Returns an absolute index.
pub fn find_unquoted(haystack: &str, needle: &str, start: usize) -> Result<Option<usize>, SvgPenError> {
    let bytes = haystack.as_bytes();
    let mut i = start;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'"' || b == b'\'' {
            let Some(len) = haystack[i + 1..].find(b as char) else {
                return Err(SvgPenError::markup(format!(
                    "quotation started but never ended: {}",
                    excerpt(&haystack[i..])
                )));
            };
            i += len + 2;
            continue;
        }
        if bytes[i..].starts_with(needle.as_bytes()) {
            return Ok(Some(i));
        }
        i += 1;
    }
    Ok(None)
}

/// Reads the next element. Returns `ElementKind::End` once no `<` is left.
/// Unknown tags (including stray close tags, declarations and processing
/// instructions) come back as `Unrecognized` with the remaining input
/// starting right after their `>`.
pub fn take_next_element(input: &str) -> Result<(Element<'_>, &str), SvgPenError> {
    let Some(open) = input.find('<') else {
        return Ok((Element::end(), ""));
    };
    let tag = &input[open + 1..];
    let Some(close) = find_unquoted(tag, ">", 0)? else {
        return Err(SvgPenError::markup(format!(
            "element is missing its terminator: {}",
            excerpt(&input[open..])
        )));
    };
    let after_tag = &tag[close + 1..];

    let name = tag_name(tag);
    let kind = ElementKind::from_name(name);
    if kind == ElementKind::Unrecognized {
        log::trace!("skipping <{}>", name);
        let element = Element {
            kind,
            attributes: &tag[name.len()..close],
            content: "",
        };
        return Ok((element, after_tag));
    }

    let inner = tag[name.len()..close].trim();
    let (attributes, self_closing) = match inner.strip_suffix('/') {
        Some(attrs) => (attrs.trim_end(), true),
        None => (inner, false),
    };
    if self_closing {
        let element = Element {
            kind,
            attributes,
            content: "",
        };
        return Ok((element, after_tag));
    }

    let (content_end, rest_start) = find_matching_close(after_tag, name)?;
    let element = Element {
        kind,
        attributes,
        content: &after_tag[..content_end],
    };
    Ok((element, &after_tag[rest_start..]))
}

/// Finds the close tag matching an already opened `<name ...>` at the start of
/// `body`, counting nested elements of the same name. Returns the offset of the
/// close tag and the offset just past it.
pub fn find_matching_close(body: &str, name: &str) -> Result<(usize, usize), SvgPenError> {
    let mut depth = 0usize;
    let mut i = 0;
    while let Some(rel) = body[i..].find('<') {
        let lt = i + rel;
        let Some(gt) = find_unquoted(body, ">", lt + 1)? else {
            return Err(SvgPenError::markup(format!(
                "element is missing its terminator: {}",
                excerpt(&body[lt..])
            )));
        };
        let tag = &body[lt + 1..gt];
        if let Some(closing) = tag.strip_prefix('/') {
            if tag_name(closing) == name {
                if depth == 0 {
                    return Ok((lt, gt + 1));
                }
                depth -= 1;
            }
        } else if tag_name(tag) == name && !tag.trim_end().ends_with('/') {
            depth += 1;
        }
        i = gt + 1;
    }
    Err(SvgPenError::markup(format!("<{name}> is never closed")))
}

fn tag_name(tag: &str) -> &str {
    let end = tag
        .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
        .unwrap_or(tag.len());
    // A close tag keeps its slash: "/g" never matches a known element.
    if end == 0 && tag.starts_with('/') {
        let len = tag[1..]
            .find(|c: char| c.is_whitespace() || c == '>')
            .map_or(tag.len(), |n| n + 1);
        return &tag[..len];
    }
    &tag[..end]
}

/// Raw value of attribute `name` (without quotes). The name has to stand on
/// its own: `cx` does not match inside `rcx`.
pub fn get_attribute<'a>(attributes: &'a str, name: &str) -> Option<&'a str> {
    let bytes = attributes.as_bytes();
    let mut start = 0;
    while let Ok(Some(at)) = find_unquoted(attributes, name, start) {
        start = at + 1;
        let boundary_before = at == 0 || matches!(bytes[at - 1], b' ' | b',' | b'\t' | b'\n' | b'\r');
        if !boundary_before {
            continue;
        }
        let after = attributes[at + name.len()..].trim_start();
        let Some(value) = after.strip_prefix('=') else {
            continue;
        };
        let value = value.trim_start();
        let quote = value.chars().next()?;
        if quote != '"' && quote != '\'' {
            continue;
        }
        let body = &value[1..];
        return body.find(quote).map(|end| &body[..end]);
    }
    None
}

/// Prepares a raw file for interpretation: drops `<!-- ... -->` comments and
/// folds line breaks and tabs inside quoted attribute values into spaces.
pub fn preprocess(source: &str) -> String {
    let mut stripped = String::with_capacity(source.len());
    let mut rest = source;
    while let Some(open) = rest.find("<!--") {
        stripped.push_str(&rest[..open]);
        match rest[open + 4..].find("-->") {
            Some(close) => rest = &rest[open + 4 + close + 3..],
            None => {
                rest = "";
                break;
            }
        }
    }
    stripped.push_str(rest);

    let mut out = String::with_capacity(stripped.len());
    let mut in_tag = false;
    let mut quote: Option<char> = None;
    for ch in stripped.chars() {
        match (in_tag, quote, ch) {
            (true, Some(q), c) if c == q => quote = None,
            (true, Some(_), '\n' | '\r' | '\t') => {
                out.push(' ');
                continue;
            }
            (true, None, '"' | '\'') => quote = Some(ch),
            (true, None, '>') => in_tag = false,
            (false, _, '<') => in_tag = true,
            _ => {}
        }
        out.push(ch);
    }
    out
}

fn excerpt(text: &str) -> String {
    const MAX: usize = 40;
    match text.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{:?}...", &text[..idx]),
        None => format!("{text:?}"),
    }
}
