use sentiment_store::UnlabeledRow;

const INSTRUCTION: &str = "\
You are labeling cryptocurrency discussion rows with sentiment.

For every input row below, output exactly one line in this format:
post_id|comment_id|crypto_sentiment|future_sentiment|emotion|subjective

Permitted values:
- crypto_sentiment: negative, neutral, positive
- future_sentiment: negative, neutral, positive (expectation about future prices)
- emotion: happiness, hope, anger, sadness, fear, neutral
- subjective: yes, no

Copy post_id and comment_id from the input row unchanged. Output the rows in
the same order as the input, one line per row, with no commentary before or
after. The number of output rows must match the number of input rows.";

/// Pipes and newlines are the row/column delimiters, so they cannot survive
/// inside a field.
fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '|' | '\n' | '\r' => ' ',
            other => other,
        })
        .collect()
}

/// Build the single text request for one batch: fixed instruction plus the
/// batch's rows as a tabular block.
pub fn build_prompt(rows: &[UnlabeledRow]) -> String {
    let mut prompt = String::from(INSTRUCTION);
    prompt.push_str("\n\nInput rows (post_id|comment_id|score|title|text):\n");
    for row in rows {
        prompt.push_str(&format!(
            "{}|{}|{}|{}|{}\n",
            row.post_id,
            row.comment_id,
            row.score,
            sanitize(&row.title),
            sanitize(&row.body),
        ));
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(comment_id: &str, body: &str) -> UnlabeledRow {
        UnlabeledRow {
            post_id: "p1".to_string(),
            comment_id: comment_id.to_string(),
            title: "Bitcoin discussion".to_string(),
            body: body.to_string(),
            score: 7,
        }
    }

    #[test]
    fn prompt_carries_one_line_per_row() {
        let prompt = build_prompt(&[row("c1", "going up"), row("c2", "going down")]);
        assert!(prompt.contains("p1|c1|7|Bitcoin discussion|going up"));
        assert!(prompt.contains("p1|c2|7|Bitcoin discussion|going down"));
        assert!(prompt.contains("must match the number of input rows"));
    }

    #[test]
    fn delimiters_inside_content_are_stripped() {
        let prompt = build_prompt(&[row("c1", "multi\nline|with pipes")]);
        assert!(prompt.contains("p1|c1|7|Bitcoin discussion|multi line with pipes"));
    }
}
