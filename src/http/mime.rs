//! Content-Type for files served by the static fallback.

use std::path::Path;

use mime_guess::mime;

/// Guesses the Content-Type of `path` from its extension. Textual types are
/// labelled UTF-8, since that is what front-end sources are written in.
pub fn from_path(path: &Path) -> String {
    let guess = mime_guess::from_path(path).first_or_octet_stream();

    let textual = guess.type_() == mime::TEXT
        || guess.subtype() == mime::JAVASCRIPT
        || guess.subtype() == mime::JSON;

    if textual && guess.get_param(mime::CHARSET).is_none() {
        format!("{guess}; charset=utf-8")
    } else {
        guess.to_string()
    }
}
