//! Local file naming for downloaded papers.

use std::path::MAIN_SEPARATOR;

/// Make sure the download directory ends with a path separator so that
/// file names can be appended to it directly. An empty directory is the
/// current one.
pub fn normalize_download_dir(dir: &str) -> String {
    if dir.is_empty() {
        format!(".{}", MAIN_SEPARATOR)
    } else if dir.ends_with(MAIN_SEPARATOR) || dir.ends_with('/') {
        dir.to_string()
    } else {
        format!("{}{}", dir, MAIN_SEPARATOR)
    }
}

/// Replace every character outside `[A-Za-z0-9.-]` with a single space.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                ' '
            }
        })
        .collect()
}

/// Number of decimal digits needed to print `total`.
pub fn ordinal_width(total: usize) -> usize {
    total.max(1).to_string().len()
}

/// Build the local path of a paper PDF.
///
/// The ordinal is zero padded to the width of the total entry count so that
/// lexicographic order of the files matches the order inside the BibTeX file.
pub fn pdf_file_name(download_dir: &str, ordinal: usize, total: usize, title: &str) -> String {
    format!(
        "{}{:0width$}-{}.pdf",
        download_dir,
        ordinal,
        sanitize_file_name(title),
        width = ordinal_width(total)
    )
}
