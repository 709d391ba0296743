//! Museum assistant: question classification, catalog context, prompt
//! assembly and answer formatting around a generative model.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{
    conversations::{ConversationState, ConversationStore},
    gemini::LanguageModel,
    museums::MuseumsService,
};
use crate::{
    error::{AppError, AppResult},
    models::Museum,
    recommend::tfidf,
};

pub const MAX_BULLETS: usize = 6;
pub const MAX_BULLET_WORDS: usize = 25;
pub const MAX_ANSWER_WORDS: usize = 90;
/// Catalog entries handed to the model as context
pub const MAX_CONTEXT_MUSEUMS: usize = 5;
/// Score given to a question mentioning a museum by name
const NAME_MATCH_SCORE: u32 = 10;

/// Answer returned when the model cannot be reached
pub const FALLBACK_ANSWER: &str = "• I can help you find museums by city, state or type\n\
• I can share history, collections and highlights of Indian museums\n\
• I can suggest museums that match your interests\n\
• I can help with visiting hours, tickets and planning a visit\n\
• Please try your question again in a moment";

const PERSONA: &str = "You are PixelPast's museum expert, a friendly guide to the museums of India. \
Answer accurately and concisely. Reply as at most 6 short bullet points, each under 25 words, \
90 words in total. Do not invent opening hours or prices; suggest checking with the museum instead.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionType {
    Search,
    Artwork,
    History,
    Exhibition,
    Operations,
    Education,
    Visiting,
    Comparison,
    Recommendation,
    Technique,
    Culture,
    Science,
    General,
}

impl QuestionType {
    /// Classified categories in tie-break order
    const CLASSIFIED: [QuestionType; 12] = [
        QuestionType::Search,
        QuestionType::Artwork,
        QuestionType::History,
        QuestionType::Exhibition,
        QuestionType::Operations,
        QuestionType::Education,
        QuestionType::Visiting,
        QuestionType::Comparison,
        QuestionType::Recommendation,
        QuestionType::Technique,
        QuestionType::Culture,
        QuestionType::Science,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Search => "search",
            QuestionType::Artwork => "artwork",
            QuestionType::History => "history",
            QuestionType::Exhibition => "exhibition",
            QuestionType::Operations => "operations",
            QuestionType::Education => "education",
            QuestionType::Visiting => "visiting",
            QuestionType::Comparison => "comparison",
            QuestionType::Recommendation => "recommendation",
            QuestionType::Technique => "technique",
            QuestionType::Culture => "culture",
            QuestionType::Science => "science",
            QuestionType::General => "general",
        }
    }

    fn keywords(&self) -> &'static [&'static str] {
        match self {
            QuestionType::Search => &["find", "search", "looking for", "show me", "where is", "list", "which museum", "which museums"],
            QuestionType::Artwork => &["painting", "paintings", "artwork", "artworks", "sculpture", "sculptures", "artist", "masterpiece", "miniature", "portrait"],
            QuestionType::History => &["history", "historical", "ancient", "heritage", "dynasty", "empire", "colonial", "century", "war", "freedom struggle"],
            QuestionType::Exhibition => &["exhibition", "exhibitions", "exhibit", "exhibits", "gallery", "galleries", "collection", "collections", "display"],
            QuestionType::Operations => &["hours", "timing", "timings", "open", "closed", "ticket", "tickets", "price", "fee", "fees", "entry", "booking", "parking"],
            QuestionType::Education => &["learn", "education", "educational", "school", "student", "students", "workshop", "research", "study"],
            QuestionType::Visiting => &["visit", "visiting", "tour", "tours", "guide", "guided", "trip", "plan", "how to reach", "directions"],
            QuestionType::Comparison => &["compare", "comparison", "versus", "vs", "difference", "better than"],
            QuestionType::Recommendation => &["recommend", "recommendation", "suggest", "suggestion", "best", "top", "must see", "should i"],
            QuestionType::Technique => &["technique", "techniques", "method", "style", "medium", "restoration", "conservation", "craft"],
            QuestionType::Culture => &["culture", "cultural", "tradition", "traditional", "festival", "religion", "religious", "tribal", "folk"],
            QuestionType::Science => &["science", "scientific", "technology", "space", "physics", "dinosaur", "fossil", "natural history", "planetarium"],
            QuestionType::General => &[],
        }
    }

    fn guidance(&self) -> &'static str {
        match self {
            QuestionType::Search => "The visitor is looking for museums. Name matching museums with their city.",
            QuestionType::Artwork => "Focus on notable artworks, artists and what makes them significant.",
            QuestionType::History => "Give the key historical context and dates.",
            QuestionType::Exhibition => "Describe the main galleries and collections worth seeing.",
            QuestionType::Operations => "Give practical visiting information and advise confirming details with the museum.",
            QuestionType::Education => "Highlight learning opportunities for students and curious visitors.",
            QuestionType::Visiting => "Help plan the visit: what to see first, how long to spend, nearby museums.",
            QuestionType::Comparison => "Compare the options point by point.",
            QuestionType::Recommendation => "Recommend specific museums and say briefly why each fits.",
            QuestionType::Technique => "Explain the artistic or scientific technique in plain words.",
            QuestionType::Culture => "Explain the cultural and traditional significance.",
            QuestionType::Science => "Explain the science simply and point to relevant exhibits.",
            QuestionType::General => "Answer helpfully about museums and heritage.",
        }
    }
}

/// Subject areas tracked as visitor interests
const SUBJECT_AREAS: [(&str, &[&str]); 7] = [
    ("art", &["art", "painting", "paintings", "sculpture", "artist", "artwork", "gallery"]),
    ("history", &["history", "historical", "ancient", "heritage", "dynasty", "empire"]),
    ("science", &["science", "scientific", "technology", "space", "physics", "planetarium"]),
    ("archaeology", &["archaeology", "archaeological", "excavation", "artifact", "artifacts", "relic"]),
    ("culture", &["culture", "cultural", "tradition", "festival", "folk", "tribal"]),
    ("nature", &["nature", "natural", "wildlife", "dinosaur", "fossil", "botanical"]),
    ("military", &["military", "war", "army", "navy", "weapons"]),
];

fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Keyword hits; phrases match as substrings, single words as whole words
fn hits(lower: &str, tokens: &HashSet<String>, keywords: &[&str]) -> usize {
    keywords
        .iter()
        .filter(|k| {
            if k.contains(' ') {
                lower.contains(*k)
            } else {
                tokens.contains(**k)
            }
        })
        .count()
}

pub fn classify(question: &str) -> QuestionType {
    let lower = question.to_lowercase();
    let tokens: HashSet<String> = words(question).into_iter().collect();

    let mut best = QuestionType::General;
    let mut best_hits = 0;
    for kind in QuestionType::CLASSIFIED {
        let count = hits(&lower, &tokens, kind.keywords());
        if count > best_hits {
            best = kind;
            best_hits = count;
        }
    }
    best
}

pub fn infer_interests(question: &str) -> Vec<String> {
    let lower = question.to_lowercase();
    let tokens: HashSet<String> = words(question).into_iter().collect();
    SUBJECT_AREAS
        .iter()
        .filter(|(_, keywords)| hits(&lower, &tokens, keywords) > 0)
        .map(|(area, _)| area.to_string())
        .collect()
}

/// Catalog entries mentioned by or overlapping with the question, best first
pub fn relevant_museums<'a>(catalog: &'a [Museum], question: &str) -> Vec<&'a Museum> {
    let lower = question.to_lowercase();
    let question_tokens: HashSet<String> = tfidf::tokenize(question)
        .into_iter()
        .filter(|t| t != "museum" && t != "museums")
        .collect();

    let mut scored: Vec<(u32, &Museum)> = catalog
        .iter()
        .filter_map(|museum| {
            let name = museum.name.trim().to_lowercase();
            let mut score = if !name.is_empty() && lower.contains(&name) {
                NAME_MATCH_SCORE
            } else {
                0
            };

            let indexed: HashSet<String> = tfidf::tokenize(&format!(
                "{} {} {} {} {}",
                museum.name, museum.city, museum.state, museum.museum_type, museum.category
            ))
            .into_iter()
            .collect();
            score += question_tokens.intersection(&indexed).count() as u32;

            (score > 0).then_some((score, museum))
        })
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().take(MAX_CONTEXT_MUSEUMS).map(|(_, m)| m).collect()
}

pub fn build_prompt(kind: QuestionType, museums: &[&Museum], state: &ConversationState, question: &str) -> String {
    let mut prompt = String::new();
    prompt.push_str(PERSONA);
    prompt.push_str("\n\nQuestion type: ");
    prompt.push_str(kind.as_str());
    prompt.push_str(". ");
    prompt.push_str(kind.guidance());

    if !museums.is_empty() {
        prompt.push_str("\n\nRelevant museums from the PixelPast catalog:\n");
        for museum in museums {
            prompt.push_str(&format!(
                "- {} ({}, {}): {}",
                museum.name, museum.city, museum.state, museum.museum_type
            ));
            if !museum.established.is_empty() {
                prompt.push_str(&format!(", established {}", museum.established));
            }
            prompt.push('\n');
        }
    }

    if !state.turns.is_empty() {
        prompt.push_str("\nRecent conversation:\n");
        for turn in &state.turns {
            prompt.push_str(&format!("Visitor: {}\nAssistant: {}\n", turn.question, turn.answer));
        }
    }

    if !state.interests.is_empty() {
        prompt.push_str(&format!("\nVisitor interests: {}\n", state.interests.join(", ")));
    }

    prompt.push_str("\nVisitor question: ");
    prompt.push_str(question);
    prompt
}

fn strip_marker(line: &str) -> &str {
    let line = line.trim_start_matches(|c: char| c == '#' || c.is_whitespace());
    let line = line.trim_start_matches(['-', '*', '•', '·']).trim_start();
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        let stripped = rest
            .strip_prefix('.')
            .or_else(|| rest.strip_prefix(')'))
            .filter(|s| s.is_empty() || s.starts_with(char::is_whitespace));
        if let Some(stripped) = stripped {
            return stripped.trim_start();
        }
    }
    line
}

fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().map_or(true, |n| n.is_whitespace()) {
            let sentence = current.trim().to_string();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            current.clear();
        }
    }
    let rest = current.trim();
    if !rest.is_empty() {
        sentences.push(rest.to_string());
    }
    sentences
}

/// Reshape model output into at most [`MAX_BULLETS`] bullets of at most
/// [`MAX_BULLET_WORDS`] words, [`MAX_ANSWER_WORDS`] words overall
pub fn format_answer(raw: &str) -> String {
    let cleaned = raw.replace("**", "");
    let mut points: Vec<String> = cleaned
        .lines()
        .map(strip_marker)
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();

    if points.len() == 1 {
        points = split_sentences(&points[0]);
    }

    let mut remaining = MAX_ANSWER_WORDS;
    let mut bullets = Vec::new();
    for point in points.into_iter().take(MAX_BULLETS) {
        if remaining == 0 {
            break;
        }
        let limit = MAX_BULLET_WORDS.min(remaining);
        let kept: Vec<&str> = point.split_whitespace().take(limit).collect();
        if kept.is_empty() {
            continue;
        }
        remaining -= kept.len();
        bullets.push(format!("• {}", kept.join(" ")));
    }

    if bullets.is_empty() {
        return FALLBACK_ANSWER.to_string();
    }
    bullets.join("\n")
}

/// Assistant over a conversation store.
///
/// Requests of one session are answered one at a time, so concurrent
/// questions cannot overwrite each other's turn. The lock is per process;
/// several instances sharing a Redis store do not coordinate.
#[derive(Clone)]
pub struct AssistantService {
    model: Arc<dyn LanguageModel>,
    conversations: Arc<dyn ConversationStore>,
    museums: MuseumsService,
    session_locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl AssistantService {
    pub fn new(model: Arc<dyn LanguageModel>, conversations: Arc<dyn ConversationStore>, museums: MuseumsService) -> Self {
        Self {
            model,
            conversations,
            museums,
            session_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    async fn lock_session(&self, session_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.session_locks.lock().await;
            // locks nobody holds or waits on
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(session_id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Answer a visitor question within one conversation session
    pub async fn answer(&self, session_id: &str, question: &str) -> AppResult<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::Validation("Message is required".to_string()));
        }

        let _session = self.lock_session(session_id).await;
        let mut state = match self.conversations.load(session_id).await {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!("Conversation state unavailable, starting fresh: {}", e);
                ConversationState::default()
            }
        };

        let kind = classify(question);
        let catalog = match self.museums.list().await {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::warn!("Catalog unavailable for assistant context: {}", e);
                Vec::new()
            }
        };
        let museums = relevant_museums(&catalog, question);
        let prompt = build_prompt(kind, &museums, &state, question);
        tracing::debug!(kind = kind.as_str(), museums = museums.len(), "Assistant prompt built");

        let answer = match self.model.generate(&prompt).await {
            Ok(raw) => format_answer(&raw),
            Err(e) => {
                tracing::warn!("Language model call failed: {}", e);
                FALLBACK_ANSWER.to_string()
            }
        };

        state.record(kind.as_str(), &infer_interests(question), question, &answer);
        if let Err(e) = self.conversations.save(session_id, &state).await {
            tracing::warn!("Failed to save conversation state: {}", e);
        }
        Ok(answer)
    }

    pub async fn reset(&self, session_id: &str) -> AppResult<()> {
        self.conversations.reset(session_id).await
    }
}
