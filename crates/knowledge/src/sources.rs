//! Source text and citations handed to the model.

use crate::types::Document;

/// Replace line breaks with spaces so each source stays on one line.
pub fn nonewlines(text: &str) -> String {
    text.replace(['\n', '\r'], " ")
}

/// Split a path into stem and extension the way file names are usually
/// read: the extension starts at the last dot of the final component,
/// unless that dot leads the component.
pub(crate) fn split_extension(path: &str) -> (&str, &str) {
    let name_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    match path[name_start..].rfind('.') {
        Some(dot) if path[name_start..][..dot].chars().any(|c| c != '.') => {
            path.split_at(name_start + dot)
        }
        _ => (path, ""),
    }
}

/// Citation label for a source page.
///
/// Image citations use the page name as-is. Otherwise a rendered page
/// `name-<n>.png` points back into the PDF as `name.pdf#page=<n>`.
pub fn get_citation(sourcepage: &str, use_image_citation: bool) -> String {
    if use_image_citation {
        return sourcepage.to_string();
    }

    let (stem, extension) = split_extension(sourcepage);
    if !extension.eq_ignore_ascii_case(".png") {
        return sourcepage.to_string();
    }

    match stem.rsplit_once('-') {
        Some((name, page)) => match page.parse::<u32>() {
            Ok(page) => format!("{}.pdf#page={}", name, page),
            Err(_) => sourcepage.to_string(),
        },
        None => sourcepage.to_string(),
    }
}

/// One `citation: text` line per result.
///
/// With captions, the caption texts stand in for the full content.
pub fn get_sources_content(
    results: &[Document],
    use_semantic_captions: bool,
    use_image_citation: bool,
) -> Vec<String> {
    results
        .iter()
        .map(|doc| {
            let citation = get_citation(doc.sourcepage.as_deref().unwrap_or_default(), use_image_citation);
            let text = if use_semantic_captions {
                doc.captions
                    .iter()
                    .map(|caption| caption.text.as_deref().unwrap_or_default())
                    .collect::<Vec<_>>()
                    .join(" . ")
            } else {
                doc.content.clone().unwrap_or_default()
            };
            format!("{}: {}", citation, nonewlines(&text))
        })
        .collect()
}
