//! Prompt builders for every AI study operation

/// Longest document excerpt sent for a summary
pub const SUMMARY_INPUT_CHARS: usize = 8000;
/// Longest document excerpt sent for quizzes and flashcards
pub const STUDY_AID_INPUT_CHARS: usize = 6000;
/// Per-document context for semantic search
pub const SEARCH_CONTEXT_CHARS: usize = 2000;
pub const SUGGESTION_DOCUMENTS: usize = 5;
pub const SUGGESTION_CONTEXT_CHARS: usize = 500;

/// A document as seen by search and suggestions: `(id, title, text)`
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentExcerpt {
    pub id: i64,
    pub title: String,
    pub content: String,
}

impl DocumentExcerpt {
    pub fn new(id: i64, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            content: content.into(),
        }
    }
}

/// First `max` characters of `text`
pub fn head_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

/// `text` cut to `max` characters, marked with `...` when cut
pub fn truncate_with_ellipsis(text: &str, max: usize) -> String {
    let head = head_chars(text, max);
    if head.len() < text.len() {
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

pub fn summary(text: &str) -> String {
    format!(
        "Provide a brief, clear summary (max 200 words) of the following text. \n\n\
         IMPORTANT: Do not use asterisks (*) or bullet points with asterisks in your response. \
         Use numbered lists (1. 2. 3.) or dashes (-) instead.\n\n\
         Text to summarize:\n{}",
        truncate_with_ellipsis(text, SUMMARY_INPUT_CHARS)
    )
}

pub fn quiz(text: &str) -> String {
    format!(
        r#"
    Generate a 5-question multiple-choice quiz from this text. Use this exact JSON format:
    {{
      "questions": [
        {{
          "question": "Question text?",
          "options": ["Option A", "Option B", "Option C", "Option D"],
          "answer": "Option A"
        }}
      ]
    }}

    IMPORTANT: Do not use asterisks (*) anywhere in the quiz questions or options. Use plain text formatting only.

    Text:
    {}
    "#,
        truncate_with_ellipsis(text, STUDY_AID_INPUT_CHARS)
    )
}

pub fn flashcards(text: &str) -> String {
    format!(
        r#"
    Create 5 flashcards from this text. Use this exact JSON format:
    {{
      "flashcards": [
        {{ "front": "Term or Question", "back": "Definition or Answer" }}
      ]
    }}

    IMPORTANT: Do not use asterisks (*) anywhere in the flashcard content. Use plain text formatting only.

    Text:
    {}
    "#,
        truncate_with_ellipsis(text, STUDY_AID_INPUT_CHARS)
    )
}

pub fn answer(context: &str, question: &str) -> String {
    format!(
        "Based on the following context, please answer the question.\n\n\
         IMPORTANT: Do not use asterisks (*) in your response. \
         Use numbered lists (1. 2. 3.) or dashes (-) for formatting instead.\n\n\
         Context: {}\n\nQuestion: {}",
        context, question
    )
}

pub fn search(documents: &[DocumentExcerpt], query: &str) -> String {
    let mut context = String::new();
    for doc in documents {
        context.push_str(&format!(
            "\n\n--- Document ID: {} | Title: {} ---\n{}",
            doc.id,
            doc.title,
            head_chars(&doc.content, SEARCH_CONTEXT_CHARS)
        ));
    }

    format!(
        r#"
        You are a smart search assistant. Search through the following documents and find the most relevant information for the user's query.

        User Query: "{query}"

        Documents to search through:
        {context}

        Please provide:
        1. A list of relevant document IDs (in order of relevance)
        2. For each relevant document, provide:
           - Document title
           - A brief snippet (1-2 sentences) showing why it's relevant
           - A relevance score (1-10, where 10 is most relevant)

        IMPORTANT: Do not use asterisks (*) anywhere in your response. Use plain text formatting only.

        Format your response as JSON:
        {{
            "results": [
                {{
                    "document_id": "1",
                    "title": "Document Title",
                    "snippet": "Relevant text snippet that matches the query...",
                    "relevance_score": 8
                }}
            ],
            "total_found": 2,
            "search_summary": "Brief summary of what was found"
        }}
        "#
    )
}

pub fn suggestions(documents: &[DocumentExcerpt], partial_query: &str) -> String {
    let mut context = String::new();
    for doc in documents.iter().take(SUGGESTION_DOCUMENTS) {
        context.push_str(&format!(
            "\n--- {} ---\n{}",
            doc.title,
            head_chars(&doc.content, SUGGESTION_CONTEXT_CHARS)
        ));
    }

    format!(
        r#"
        Based on the following documents and the user's partial input, suggest 5-8 relevant search queries that the user might want to search for.

        User's partial input: "{partial_query}"

        Document content:
        {context}

        Generate suggestions that:
        1. Start with or contain the user's input
        2. Are relevant to the document content
        3. Are complete, meaningful search queries
        4. Help users discover content in their documents

        IMPORTANT: Do not use asterisks (*) in the suggestions. Use plain text only.

        Format as JSON array:
        {{
            "suggestions": [
                "machine learning algorithms",
                "neural network architecture",
                "data preprocessing techniques"
            ]
        }}

        Only return suggestions that would be useful for searching these specific documents.
        "#
    )
}
