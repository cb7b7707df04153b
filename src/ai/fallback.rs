//! Deterministic study aids used when the model is unavailable
//!
//! Every function here is pure and total: it produces a usable result for
//! any input, including empty text.

use super::content::{FlashcardContent, FlashcardDraft, QuizContent, QuizQuestion, SearchHit, SearchResults};
use super::prompts::{DocumentExcerpt, head_chars};
use std::collections::BTreeSet;

const SUMMARY_WORD_TARGET: usize = 50;
const SUMMARY_MAX_CHARS: usize = 500;
const STUDY_AID_COUNT: usize = 5;
const QUESTION_TOPIC_CHARS: usize = 50;
const MAX_SEARCH_SCORE: i64 = 10;
const MAX_SEARCH_RESULTS: usize = 10;
const SNIPPET_CONTEXT_CHARS: usize = 50;
const SNIPPET_PREVIEW_CHARS: usize = 100;
const SUGGESTION_DOCUMENTS: usize = 5;
const SUGGESTION_CONTENT_CHARS: usize = 500;
const MAX_SUGGESTIONS: usize = 6;
const STOPWORDS: &[&str] = &["the", "and", "for", "with", "from", "this", "that"];

pub const UNANSWERED: &str = "I'm unable to provide a specific answer at the moment. \
     Please try again later or refer to the document content directly.";

/// First sentences of the text, roughly fifty words
pub fn summary(text: &str) -> String {
    let mut sentences = Vec::new();
    let mut word_count = 0;

    for sentence in text.split('.') {
        if word_count >= SUMMARY_WORD_TARGET {
            break;
        }
        let trimmed = sentence.trim();
        if !trimmed.is_empty() {
            sentences.push(trimmed);
            word_count += trimmed.split_whitespace().count();
        }
    }

    let mut summary = format!("{}.", sentences.join(". "));
    if summary.chars().count() > SUMMARY_MAX_CHARS {
        summary = format!("{}...", head_chars(&summary, SUMMARY_MAX_CHARS));
    }
    format!("Basic Summary (AI unavailable): {}", summary)
}

fn generic_question() -> QuizQuestion {
    QuizQuestion {
        question: "What is the main topic of this document?".to_string(),
        options: vec![
            "Technology and innovation".to_string(),
            "Business and management".to_string(),
            "Science and research".to_string(),
            "Education and learning".to_string(),
        ],
        answer: "Education and learning".to_string(),
    }
}

pub fn quiz(text: &str) -> QuizContent {
    let mut questions: Vec<QuizQuestion> = text
        .split('.')
        .take(STUDY_AID_COUNT)
        .filter(|sentence| !sentence.trim().is_empty())
        // The topic keeps the sentence's leading whitespace
        .map(|sentence| QuizQuestion {
            question: format!(
                "What is discussed in this text about {}...?",
                head_chars(sentence, QUESTION_TOPIC_CHARS)
            ),
            options: vec![
                "It is explained in detail".to_string(),
                "It is briefly mentioned".to_string(),
                "It is not discussed".to_string(),
                "It is only referenced".to_string(),
            ],
            answer: "It is explained in detail".to_string(),
        })
        .collect();

    questions.resize_with(STUDY_AID_COUNT, generic_question);
    QuizContent {
        questions,
        fallback_mode: true,
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn flashcards(text: &str) -> FlashcardContent {
    let lowered = text.to_lowercase();
    let mut flashcards: Vec<FlashcardDraft> = lowered
        .split_whitespace()
        .filter(|word| word.chars().count() > 4 && word.chars().all(char::is_alphabetic))
        .take(STUDY_AID_COUNT)
        .map(|word| {
            let term = title_case(word);
            FlashcardDraft {
                front: format!("What is {}?", term),
                back: format!("{} is a concept discussed in this document.", term),
            }
        })
        .collect();

    flashcards.resize_with(STUDY_AID_COUNT, || FlashcardDraft {
        front: "What is the main topic?".to_string(),
        back: "The main topic is discussed throughout this document.".to_string(),
    });
    FlashcardContent {
        flashcards,
        fallback_mode: true,
    }
}

/// Keyword-overlap answer naming the question words found in the context
pub fn answer(context: &str, question: &str) -> String {
    let context = context.to_lowercase();
    let question = question.to_lowercase();
    let matching: Vec<&str> = question
        .split_whitespace()
        .filter(|word| word.chars().count() > 2 && context.contains(word))
        .collect();

    if matching.is_empty() {
        UNANSWERED.to_string()
    } else {
        format!(
            "Based on the document content, information about {} is discussed. \
             Please refer to the document for detailed information.",
            matching.join(", ")
        )
    }
}

/// Lowercase one char at a time so char offsets match the original text
fn lower_per_char(text: &str) -> String {
    text.chars()
        .map(|c| c.to_lowercase().next().unwrap_or(c))
        .collect()
}

fn preview(content: &str) -> String {
    if content.chars().count() > SNIPPET_PREVIEW_CHARS {
        format!("{}...", head_chars(content, SNIPPET_PREVIEW_CHARS))
    } else {
        content.to_string()
    }
}

/// Text around the first match at char offset `start`
fn snippet_around(content: &str, start: usize, match_chars: usize) -> String {
    let total = content.chars().count();
    let from = start.saturating_sub(SNIPPET_CONTEXT_CHARS);
    let to = (start + match_chars + SNIPPET_CONTEXT_CHARS).min(total);

    let mut snippet: String = content.chars().skip(from).take(to - from).collect();
    if from > 0 {
        snippet.insert_str(0, "...");
    }
    if to < total {
        snippet.push_str("...");
    }
    snippet
}

/// Substring scoring over titles and contents
pub fn text_search(documents: &[DocumentExcerpt], query: &str) -> SearchResults {
    let query_lower = lower_per_char(query);
    let query_chars = query_lower.chars().count();
    let mut results = Vec::new();

    for doc in documents {
        let title_lower = lower_per_char(&doc.title);
        let content_lower = lower_per_char(&doc.content);
        let mut score = 0;

        if title_lower.contains(&query_lower) {
            score += 5;
        }

        let snippet = match content_lower.find(&query_lower) {
            Some(byte_index) => {
                score += 3;
                let start = content_lower[..byte_index].chars().count();
                snippet_around(&doc.content, start, query_chars)
            }
            None => {
                score += query_lower
                    .split_whitespace()
                    .filter(|word| word.chars().count() > 2 && content_lower.contains(word))
                    .count() as i64;
                preview(&doc.content)
            }
        };

        if score > 0 {
            results.push(SearchHit {
                document_id: doc.id.to_string(),
                title: doc.title.clone(),
                snippet,
                relevance_score: score.min(MAX_SEARCH_SCORE),
                document_url: None,
            });
        }
    }

    results.sort_by(|a, b| b.relevance_score.cmp(&a.relevance_score));
    let total_found = results.len();
    results.truncate(MAX_SEARCH_RESULTS);

    SearchResults {
        results,
        total_found,
        search_summary: format!(
            "Found {} documents using basic text search (AI search unavailable)",
            total_found
        ),
    }
}

/// Completions built from document vocabulary, padded with generic phrases
pub fn suggestions(documents: &[DocumentExcerpt], partial_query: &str) -> Vec<String> {
    let partial_lower = partial_query.to_lowercase();
    let mut terms = BTreeSet::new();

    for doc in documents.iter().take(SUGGESTION_DOCUMENTS) {
        let title = doc.title.to_lowercase();
        let content = head_chars(&doc.content, SUGGESTION_CONTENT_CHARS).to_lowercase();
        for word in title.split_whitespace().chain(content.split_whitespace()) {
            if word.chars().count() > 3 && !STOPWORDS.contains(&word) {
                terms.insert(word.to_string());
            }
        }
    }

    let mut suggestions: Vec<String> = Vec::new();
    for term in &terms {
        let suggestion = if let Some(rest) = term.strip_prefix(partial_lower.as_str()) {
            format!("{}{}", partial_query, rest)
        } else if term.contains(&partial_lower) {
            term.clone()
        } else {
            continue;
        };
        if !suggestions.contains(&suggestion) {
            suggestions.push(suggestion);
        }
    }

    for generic in ["concepts", "examples", "methods", "techniques"] {
        if suggestions.len() >= MAX_SUGGESTIONS {
            break;
        }
        suggestions.push(format!("{} {}", partial_query, generic));
    }

    suggestions.truncate(MAX_SUGGESTIONS);
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_summary_takes_sentences_until_fifty_words() {
        let sentence = "one two three four five six seven eight nine ten";
        let text = format!("{s}. {s}. {s}. {s}. {s}. {s}. {s}.", s = sentence);
        let summary = summary(&text);
        assert!(summary.starts_with("Basic Summary (AI unavailable): one two"));
        // five sentences of ten words reach the target
        assert_eq!(summary.matches("ten").count(), 5);
        assert!(summary.ends_with("ten."));
    }

    #[test]
    fn test_summary_of_empty_text() {
        assert_eq!(summary(""), "Basic Summary (AI unavailable): .");
    }

    #[test]
    fn test_summary_is_cut_at_500_chars() {
        let text = "x".repeat(800);
        let summary = summary(&text);
        let body = summary.strip_prefix("Basic Summary (AI unavailable): ").unwrap();
        assert_eq!(body.chars().count(), 503);
        assert!(body.ends_with("..."));
    }

    #[test]
    fn test_quiz_uses_sentences_and_pads() {
        let quiz = quiz("Cells divide by mitosis. DNA stores genetic information");
        assert!(quiz.fallback_mode);
        assert_eq!(quiz.questions.len(), 5);
        assert_eq!(
            quiz.questions[0].question,
            "What is discussed in this text about Cells divide by mitosis...?"
        );
        assert_eq!(quiz.questions[0].options.len(), 4);
        assert_eq!(quiz.questions[0].answer, "It is explained in detail");
        assert_eq!(
            quiz.questions[1].question,
            "What is discussed in this text about  DNA stores genetic information...?"
        );
        assert_eq!(quiz.questions[2].question, "What is the main topic of this document?");
        assert_eq!(quiz.questions[4].answer, "Education and learning");
    }

    #[test]
    fn test_quiz_topic_is_cut_before_trimming() {
        let text = format!("Intro.{}{}", " ".repeat(10), "b".repeat(60));
        let quiz = quiz(&text);
        assert_eq!(
            quiz.questions[1].question,
            format!(
                "What is discussed in this text about {}{}...?",
                " ".repeat(10),
                "b".repeat(40)
            )
        );
    }

    #[test]
    fn test_quiz_topic_is_fifty_chars() {
        let long = "a".repeat(80);
        let quiz = quiz(&long);
        assert_eq!(
            quiz.questions[0].question,
            format!("What is discussed in this text about {}...?", "a".repeat(50))
        );
    }

    #[test]
    fn test_flashcards_pick_long_alphabetic_words() {
        let cards = flashcards("The mitochondria, organelle ATP3 produces energy within cell");
        assert!(cards.fallback_mode);
        assert_eq!(cards.flashcards.len(), 5);
        assert_eq!(cards.flashcards[0].front, "What is Organelle?");
        assert_eq!(
            cards.flashcards[0].back,
            "Organelle is a concept discussed in this document."
        );
        assert_eq!(cards.flashcards[1].front, "What is Produces?");
        assert_eq!(cards.flashcards[2].front, "What is Energy?");
        assert_eq!(cards.flashcards[3].front, "What is Within?");
        assert_eq!(cards.flashcards[4].front, "What is the main topic?");
    }

    #[test]
    fn test_answer_lists_matching_words() {
        let answer = answer(
            "Photosynthesis happens in the chloroplast.",
            "How does photosynthesis happen in plants",
        );
        assert_eq!(
            answer,
            "Based on the document content, information about photosynthesis, happen is discussed. \
             Please refer to the document for detailed information."
        );
    }

    #[test]
    fn test_answer_without_overlap() {
        assert_eq!(answer("Cells and tissues.", "Who won the war?"), UNANSWERED);
    }

    fn docs() -> Vec<DocumentExcerpt> {
        vec![
            DocumentExcerpt::new(1, "Cell Biology", "Cells are the basic unit of life."),
            DocumentExcerpt::new(2, "History", "The war ended. Biology was not discussed."),
            DocumentExcerpt::new(3, "Cooking", "Recipes for bread."),
        ]
    }

    #[test]
    fn test_text_search_scores_title_and_content() {
        let results = text_search(&docs(), "biology");
        assert_eq!(results.total_found, 2);
        assert_eq!(results.results[0].document_id, "1");
        assert_eq!(results.results[0].relevance_score, 5);
        assert_eq!(results.results[1].document_id, "2");
        assert_eq!(results.results[1].relevance_score, 3);
        assert_eq!(
            results.search_summary,
            "Found 2 documents using basic text search (AI search unavailable)"
        );
    }

    #[test]
    fn test_text_search_word_overlap_uses_preview() {
        let results = text_search(&docs(), "bread baking recipes");
        assert_eq!(results.total_found, 1);
        let hit = &results.results[0];
        assert_eq!(hit.document_id, "3");
        assert_eq!(hit.relevance_score, 2);
        assert_eq!(hit.snippet, "Recipes for bread.");
    }

    #[test]
    fn test_text_search_snippet_window() {
        let content = format!("{}needle{}", "a".repeat(60), "b".repeat(60));
        let docs = vec![DocumentExcerpt::new(7, "Haystack", content)];
        let hit = &text_search(&docs, "NEEDLE").results[0];
        assert_eq!(hit.snippet, format!("...{}needle{}...", "a".repeat(50), "b".repeat(50)));
    }

    #[test]
    fn test_text_search_handles_non_ascii_offsets() {
        let docs = vec![DocumentExcerpt::new(1, "Notes", "Ünïcödé text about İstanbul cells")];
        let hit = &text_search(&docs, "cells").results[0];
        assert!(hit.snippet.ends_with("cells"));
    }

    #[test]
    fn test_suggestions_complete_and_pad() {
        let docs = vec![DocumentExcerpt::new(
            1,
            "Cellular Biology",
            "Cells and subcellular structures. Cellular respiration.",
        )];
        let suggestions = suggestions(&docs, "Cell");
        assert_eq!(
            suggestions,
            vec![
                "Cells",
                "Cellular",
                "subcellular",
                "Cell concepts",
                "Cell examples",
                "Cell methods",
            ]
        );
    }

    #[test]
    fn test_suggestions_without_documents_are_generic() {
        assert_eq!(
            suggestions(&[], "ai"),
            vec!["ai concepts", "ai examples", "ai methods", "ai techniques"]
        );
    }

    proptest! {
        #[test]
        fn prop_fallbacks_always_produce_five_items(text in ".{0,400}") {
            prop_assert_eq!(quiz(&text).questions.len(), 5);
            prop_assert_eq!(flashcards(&text).flashcards.len(), 5);
        }

        #[test]
        fn prop_search_results_are_bounded_and_sorted(query in "[a-z ]{3,12}", bodies in proptest::collection::vec("[a-z .]{0,200}", 0..15)) {
            let docs: Vec<_> = bodies.iter().enumerate()
                .map(|(i, body)| DocumentExcerpt::new(i as i64, format!("Doc {i}"), body.clone()))
                .collect();
            let results = text_search(&docs, &query);
            prop_assert!(results.results.len() <= 10);
            prop_assert!(results.total_found >= results.results.len());
            prop_assert!(results.results.windows(2).all(|w| w[0].relevance_score >= w[1].relevance_score));
            prop_assert!(results.results.iter().all(|hit| (1..=10).contains(&hit.relevance_score)));
        }

        #[test]
        fn prop_suggestions_never_exceed_six(partial in "[a-z]{2,6}") {
            let docs = vec![DocumentExcerpt::new(1, "Title words here", "content words appear in this text body")];
            prop_assert!(suggestions(&docs, &partial).len() <= 6);
        }
    }
}
