//! Grounded-context rendering for a chat layer.
//!
//! Turns ranked results into the text block an upstream language-model
//! caller pastes into its prompt. Nothing here talks to a model.

use docrank_core::models::SearchResult;

/// Shown to the model as the answer when the context does not cover the question.
pub const NOT_AVAILABLE: &str = "Information not available in knowledge base";

/// Render results as `[Document: ..]`, `[Relevance: ..%]`, chunk text,
/// separated by blank lines, in the given order.
pub fn build_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|r| {
            format!(
                "[Document: {}]\n[Relevance: {:.2}%]\n{}",
                r.document.file_name,
                r.similarity * 100.0,
                r.chunk.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Wrap a context block and a question in answer-only-from-context instructions.
pub fn grounded_prompt(context: &str, question: &str) -> String {
    format!(
        "You are an AI assistant with access to a knowledge base.\n\
         \n\
         CRITICAL INSTRUCTIONS:\n\
         - Answer ONLY based on the context provided below\n\
         - If the answer is not in the context, clearly state \"{}\"\n\
         - DO NOT add your own knowledge or assumptions\n\
         - Cite the document name where the information was found\n\
         \n\
         CONTEXT FROM KNOWLEDGE BASE:\n\
         {}\n\
         \n\
         USER QUESTION:\n\
         {}\n\
         \n\
         YOUR ANSWER (based on context):",
        NOT_AVAILABLE, context, question
    )
}

/// Markdown listing of project-documentation hits.
///
/// Keeps only results whose file name starts with `prefix` and shows the
/// name without it. Returns `None` when nothing matches.
pub fn render_project_docs(query: &str, results: &[SearchResult], prefix: &str) -> Option<String> {
    let docs: Vec<&SearchResult> = results
        .iter()
        .filter(|r| r.document.file_name.starts_with(prefix))
        .collect();
    if docs.is_empty() {
        return None;
    }

    let mut out = format!("## Documentation: {}\n\n", query);
    for r in docs {
        let name = r
            .document
            .file_name
            .strip_prefix(prefix)
            .unwrap_or(&r.document.file_name);
        let percent = (r.similarity * 100.0) as u32;
        out.push_str(&format!("### {} ({}% match)\n{}\n\n", name, percent, r.chunk.text));
    }
    Some(out)
}
