use lazy_static::lazy_static;
use marquee_domain::{Error, Pipeline, format_datetime, parse_datetime};
use regex::Regex;
use tracing::{debug, warn};

lazy_static! {
    static ref ISO_DATE: Regex = Regex::new(r#"ISODate\(\s*(?:"([^"]*)"|'([^']*)')\s*\)"#).unwrap();
    static ref FENCE: Regex = Regex::new(r"```[A-Za-z]*").unwrap();
}

/// Turns translator output into an executable [`Pipeline`].
///
/// Only literal values are accepted: the text is never evaluated as code.
pub fn sanitize(raw: &str) -> Result<Pipeline, Error> {
    let cleaned = clean(raw)?;
    let parse_error = |reason: String| Error::Parse {
        original: raw.to_string(),
        cleaned: cleaned.clone(),
        reason,
    };

    let value = match marquee_literal::parse(&cleaned) {
        Ok(value) => value,
        Err(literal_error) => serde_json::from_str(&cleaned).map_err(|json_error| {
            warn!(pipeline = %cleaned, %literal_error, %json_error, "Could not parse pipeline");
            parse_error(literal_error.to_string())
        })?,
    };

    let pipeline = Pipeline::try_from(value).map_err(|e| parse_error(e.to_string()))?;
    debug!(%pipeline, "Sanitized pipeline");
    Ok(pipeline)
}

fn clean(raw: &str) -> Result<String, Error> {
    let text = rewrite_dates(raw)?;
    let text = FENCE.replace_all(&text, "");
    let text = text.replace(['\n', '\r'], " ").replace("mongodb", "");
    let text = match text.split_once("Output:") {
        Some((_, after)) => after.to_string(),
        None => text,
    };
    Ok(text.trim().to_string())
}

/// Rewrites `ISODate("...")` into the canonical `Date("<rfc3339>")`.
fn rewrite_dates(raw: &str) -> Result<String, Error> {
    let mut rewritten = String::with_capacity(raw.len());
    let mut last = 0;
    for caps in ISO_DATE.captures_iter(raw) {
        let (Some(whole), Some(value)) = (caps.get(0), caps.get(1).or_else(|| caps.get(2))) else {
            continue;
        };
        let date = canonical_date(value.as_str()).ok_or_else(|| {
            warn!(date = value.as_str(), "Unrecognized date literal");
            Error::Parse {
                original: raw.to_string(),
                cleaned: raw.to_string(),
                reason: format!("invalid date '{}'", value.as_str()),
            }
        })?;
        rewritten.push_str(&raw[last..whole.start()]);
        rewritten.push_str(&format!("Date(\"{date}\")"));
        last = whole.end();
    }
    rewritten.push_str(&raw[last..]);
    Ok(rewritten)
}

fn canonical_date(value: &str) -> Option<String> {
    if let Some(date) = parse_datetime(value) {
        return Some(format_datetime(&date));
    }
    // Older prompts produced a stray trailing character after the timestamp.
    let mut chars = value.chars();
    chars.next_back();
    parse_datetime(chars.as_str()).map(|date| format_datetime(&date))
}
