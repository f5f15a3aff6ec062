use sentiment_core::{PipelineError, PipelineResult, ResponseTolerance, SentimentLabel};
use std::collections::HashSet;

/// Parse a generation response back into sentiment labels and enforce the
/// row-count contract.
///
/// The external model's output is unreliable, so this is a correctness
/// boundary: malformed lines are skipped; a parsed count below
/// `min_ratio` × expected is accepted with a warning (best-effort degraded
/// output); a parsed count above `max_ratio` × expected signals malformed
/// generation and rejects the batch; duplicate (post_id, comment_id) rows
/// keep their first occurrence.
pub fn parse_response(
    text: &str,
    expected: usize,
    tolerance: &ResponseTolerance,
) -> PipelineResult<Vec<SentimentLabel>> {
    let mut parsed = Vec::new();
    let mut malformed = 0usize;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("```") || line.starts_with("post_id|") {
            continue;
        }

        match parse_line(line) {
            Some(label) => parsed.push(label),
            None => malformed += 1,
        }
    }

    if malformed > 0 {
        tracing::debug!(malformed, "skipped unparseable response lines");
    }

    if parsed.is_empty() {
        return Err(PipelineError::Validation(format!(
            "response contained no parseable rows (expected {expected})"
        )));
    }

    if parsed.len() as f64 > expected as f64 * tolerance.max_ratio {
        return Err(PipelineError::Validation(format!(
            "response carried {} rows for {} inputs, over the {:.0}% tolerance",
            parsed.len(),
            expected,
            tolerance.max_ratio * 100.0
        )));
    }

    if (parsed.len() as f64) < expected as f64 * tolerance.min_ratio {
        tracing::warn!(
            parsed = parsed.len(),
            expected,
            "labeling response is short; accepting best-effort output"
        );
    }

    let mut seen = HashSet::new();
    let deduped: Vec<SentimentLabel> = parsed
        .into_iter()
        .filter(|label| seen.insert((label.post_id.clone(), label.comment_id.clone())))
        .collect();

    Ok(deduped)
}

fn parse_line(line: &str) -> Option<SentimentLabel> {
    let fields: Vec<&str> = line.split('|').map(str::trim).collect();
    let [post_id, comment_id, crypto, future, emotion, subjective] = fields.as_slice() else {
        return None;
    };
    if post_id.is_empty() || comment_id.is_empty() {
        return None;
    }

    Some(SentimentLabel {
        post_id: post_id.to_string(),
        comment_id: comment_id.to_string(),
        crypto_sentiment: crypto.to_lowercase().parse().ok()?,
        future_sentiment: future.to_lowercase().parse().ok()?,
        emotion: emotion.to_lowercase().parse().ok()?,
        subjective: subjective.to_lowercase().parse().ok()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentiment_core::Sentiment;

    fn tolerance() -> ResponseTolerance {
        ResponseTolerance::default()
    }

    #[test]
    fn well_formed_response_parses_every_row() {
        let text = "p1|c1|positive|neutral|hope|yes\np1|c2|negative|negative|fear|no\n";
        let labels = parse_response(text, 2, &tolerance()).unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[0].crypto_sentiment, Sentiment::Positive);
        assert_eq!(labels[1].comment_id, "c2");
    }

    #[test]
    fn chatter_and_fences_are_ignored() {
        let text = "```\npost_id|comment_id|crypto_sentiment|future_sentiment|emotion|subjective\np1|c1|Positive|Neutral|Hope|Yes\n```\n";
        let labels = parse_response(text, 1, &tolerance()).unwrap();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].crypto_sentiment, Sentiment::Positive);
    }

    #[test]
    fn over_count_beyond_tolerance_rejects_the_batch() {
        // 13 rows for 10 expected stays inside the 120% tolerance; 13 rows
        // for 5 expected is malformed generation.
        let mut lines = Vec::new();
        for i in 0..13 {
            lines.push(format!("p1|c{i}|positive|neutral|hope|yes"));
        }
        let text = lines.join("\n");

        assert!(parse_response(&text, 10, &tolerance()).is_ok());
        let err = parse_response(&text, 5, &tolerance()).unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }

    #[test]
    fn short_response_is_accepted_best_effort() {
        let text = "p1|c1|positive|neutral|hope|yes";
        let labels = parse_response(text, 10, &tolerance()).unwrap();
        assert_eq!(labels.len(), 1);
    }

    #[test]
    fn duplicates_keep_first_occurrence() {
        let text = "p1|c1|positive|neutral|hope|yes\np1|c1|negative|negative|fear|no";
        let labels = parse_response(text, 2, &tolerance()).unwrap();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].crypto_sentiment, Sentiment::Positive);
    }

    #[test]
    fn malformed_lines_are_skipped_not_fatal() {
        let text = "garbage without pipes\np1|c1|positive|neutral|hope|yes\np1|c2|bullish|neutral|hope|yes\np1|c3|positive|neutral";
        let labels = parse_response(text, 3, &tolerance()).unwrap();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].comment_id, "c1");
    }

    #[test]
    fn fully_unparseable_response_is_an_error() {
        let err = parse_response("I cannot label these rows.", 4, &tolerance()).unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }
}
