//! Prompt construction for condensation and grounded answers.

use crate::models::Match;

/// Delimiter between retrieved passages in the context block.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Exact reply the model is told to give when the context does not cover the
/// question.
pub const REFUSAL: &str = "Based on my writings, I don't have a specific answer to that.";

/// Prompt asking the model to rewrite a paragraph as one short quote.
pub fn condense_prompt(author: &str, paragraph: &str) -> String {
    format!(
        "Rewrite the following {author} paragraph as one concise quote (max {max} words). \
         Keep {author}'s voice. Remove line-breaks and extra quotes.\n\n\
         Paragraph:\n\"\"\"{paragraph}\"\"\"",
        author = author,
        max = super::text::MAX_QUOTE_WORDS,
        paragraph = paragraph,
    )
}

/// Join the passage text of each match, in search order.
///
/// Matches without a `metadata.text` passage are skipped.
pub fn build_context(matches: &[Match]) -> String {
    matches
        .iter()
        .filter_map(Match::text)
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

/// Grounded prompt: answer only from `context`, refuse with [`REFUSAL`]
/// otherwise, and quote the source verbatim.
pub fn answer_prompt(author: &str, context: &str, question: &str) -> String {
    format!(
        "==INSTRUCTIONS==\n\
         - Only answer using the CONTEXT pieces provided below, which are taken from {author}'s writings and speeches.\n\
         - If the information required for the question is not present in the CONTEXT, reply precisely:\n    \
         \"{refusal}\"\n\
         - Emulate {author}'s tone: clear, practical, reflective and direct.\n\
         - Be concise, quoting or paraphrasing CONTEXT sentences when relevant.\n\
         - If multiple CONTEXT pieces are relevant, combine them into one clear response, but do not invent facts.\n\
         - Wrap any direct quotes from the CONTEXT in \u{201C}quotation marks.\u{201D}\n\
         - Keep the formatting suitable for display in a chat bubble.\n\n\
         ==CONTEXT==\n{context}\n\n\
         ==USER QUESTION==\n{question}\n\n\
         ==ANSWER==",
        author = author,
        refusal = REFUSAL,
        context = context,
        question = question,
    )
}
