//! Pull SQL text out of free-form model responses.
//!
//! Models wrap SQL in markdown fences or surround it with prose. Extraction
//! only picks the text to validate; it never makes a statement safer.

/// Best-effort SQL from a model response.
///
/// Tried in order: a ```` ```sql ```` fence, any ```` ``` ```` fence, everything
/// from the first `SELECT`/`WITH` line to the end of the response, and finally
/// the whole response trimmed.
///
/// Text is never cut after a statement separator; whatever follows one stays
/// in the candidate so the validator sees it.
pub fn extract_sql(response: &str) -> String {
    if let Some(body) = fenced(response, true) {
        return body;
    }
    if let Some(body) = fenced(response, false) {
        return body;
    }
    if let Some(body) = statement_lines(response) {
        return body;
    }
    response.trim().to_string()
}

fn fenced(response: &str, tagged: bool) -> Option<String> {
    let mut search = response;
    while let Some(open) = search.find("```") {
        let after = &search[open + 3..];
        let close = after.find("```")?;
        let inner = &after[..close];

        let tag_len = inner
            .char_indices()
            .find(|(_, c)| c.is_whitespace())
            .map(|(i, _)| i)
            .unwrap_or(inner.len());
        let is_sql = inner[..tag_len].eq_ignore_ascii_case("sql") && tag_len < inner.len();

        if tagged && !is_sql {
            search = &after[close + 3..];
            continue;
        }

        let body = if is_sql { &inner[tag_len..] } else { inner };
        let body = body.trim();
        if !body.is_empty() {
            return Some(body.to_string());
        }
        search = &after[close + 3..];
    }
    None
}

fn statement_lines(response: &str) -> Option<String> {
    let lines: Vec<&str> = response.lines().collect();
    let start = lines.iter().position(|line| {
        line.split_whitespace()
            .next()
            .map(|w| w.eq_ignore_ascii_case("select") || w.eq_ignore_ascii_case("with"))
            .unwrap_or(false)
    })?;

    let body = lines[start..].join("\n");
    let body = body.trim();
    (!body.is_empty()).then(|| body.to_string())
}
