//! HTML field extraction.
//!
//! Pages are parsed with `scraper` (html5ever), which tolerates malformed and
//! truncated markup, and queried for `<input>` attributes instead of matching
//! raw text, so attribute order and formatting do not matter.

use std::collections::HashMap;

use scraper::{Html, Selector};
use tracing::{debug, instrument};

/// Hidden-field identifiers mapped to their values.
pub type TokenMap = HashMap<String, String>;

/// Name of the one-time login form field.
pub const NONCE_FIELD: &str = "nonce";

/// Errors raised by HTML extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// A CSS selector failed to compile.
    #[error("invalid selector '{selector}': {reason}")]
    Selector {
        /// The selector source.
        selector: &'static str,
        /// Parser message.
        reason: String,
    },
}

fn selector(css: &'static str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|error| ExtractError::Selector {
        selector: css,
        reason: error.to_string(),
    })
}

/// Collects `(id, value)` pairs from every hidden `<input>` in `html`.
///
/// Inputs missing an `id` or `value`, or carrying an empty one, are skipped.
/// When an id repeats, the first occurrence wins.
///
/// # Errors
///
/// Returns [`ExtractError::Selector`] only if the built-in selector fails to compile.
#[instrument(level = "debug", skip(html), fields(bytes = html.len()))]
pub fn extract_tokens(html: &str) -> Result<TokenMap, ExtractError> {
    let document = Html::parse_document(html);
    let inputs = selector("input")?;

    let mut tokens = TokenMap::new();
    let mut skipped = 0_usize;
    for element in document.select(&inputs) {
        let attrs = element.value();
        let hidden = attrs
            .attr("type")
            .is_some_and(|kind| kind.trim().eq_ignore_ascii_case("hidden"));
        if !hidden {
            continue;
        }

        match (attrs.attr("id"), attrs.attr("value")) {
            (Some(id), Some(value)) if !id.is_empty() && !value.is_empty() => {
                if tokens.contains_key(id) {
                    debug!(id, "duplicate hidden field id; keeping first");
                } else {
                    tokens.insert(id.to_string(), value.to_string());
                }
            }
            _ => skipped += 1,
        }
    }

    debug!(tokens = tokens.len(), skipped, "extracted hidden fields");
    Ok(tokens)
}

/// Returns the value of the login form's `nonce` input, if present and non-empty.
///
/// # Errors
///
/// Returns [`ExtractError::Selector`] only if the built-in selector fails to compile.
pub fn extract_nonce(html: &str) -> Result<Option<String>, ExtractError> {
    extract_input_value(html, NONCE_FIELD)
}

/// Returns the `value` of the first `<input name="{name}">` carrying a non-empty value.
///
/// # Errors
///
/// Returns [`ExtractError::Selector`] only if the built-in selector fails to compile.
pub fn extract_input_value(html: &str, name: &str) -> Result<Option<String>, ExtractError> {
    let document = Html::parse_document(html);
    let inputs = selector("input[name]")?;

    Ok(document
        .select(&inputs)
        .filter(|element| element.value().attr("name") == Some(name))
        .find_map(|element| {
            element
                .value()
                .attr("value")
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        }))
}
