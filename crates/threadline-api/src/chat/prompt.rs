use threadline_llm::{Content, ContentPart, Message};
use threadline_persist::{models::DEFAULT_THREAD_TITLE, MessageRole};

use crate::routes::chat::ChatMessageInput;

pub const SYSTEM_PROMPT: &str = "You are Threadline, a helpful and knowledgeable assistant. \
Answer clearly and accurately. Use Markdown for structure, fenced code blocks with a language \
tag for code, and keep answers as short as the question allows. If you are unsure, say so.";

/// Alternate persona selected with `isTheoMode`
pub const THEO_SYSTEM_PROMPT: &str = "You are Theo, a blunt senior engineer who has shipped a lot \
of web apps. Give opinionated, practical advice. Prefer simple solutions, call out over-engineering, \
and back claims with concrete examples. Keep the tone casual and skip the pleasantries.";

pub const TITLE_PROMPT: &str = "Write a short title (at most six words) for a conversation that \
starts with the user's message below. Reply with the title only: no quotes, no trailing \
punctuation, no preamble.";

const MAX_TITLE_CHARS: usize = 80;

pub fn system_prompt(theo_mode: bool) -> &'static str {
    if theo_mode {
        THEO_SYSTEM_PROMPT
    } else {
        SYSTEM_PROMPT
    }
}

/// Provider messages for a turn: system prompt, then the client's history.
/// Image attachments ride on the last user message as `image_url` parts.
pub fn build_messages(
    system_prompt: &str,
    history: &[ChatMessageInput],
    image_urls: &[String],
) -> Vec<Message> {
    let last_user = history.iter().rposition(|m| m.role == MessageRole::User);

    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(Message::system(system_prompt));

    for (idx, input) in history.iter().enumerate() {
        match input.role {
            MessageRole::User if Some(idx) == last_user && !image_urls.is_empty() => {
                let mut parts = vec![ContentPart::text(input.content.clone())];
                parts.extend(image_urls.iter().map(ContentPart::image));
                messages.push(Message::human(Content::Parts(parts)));
            }
            MessageRole::User => messages.push(Message::human(input.content.clone())),
            // The client echoes empty placeholders of earlier failed turns
            MessageRole::Assistant if input.content.trim().is_empty() => {}
            MessageRole::Assistant => messages.push(Message::ai(input.content.clone())),
            MessageRole::System => messages.push(Message::system(input.content.clone())),
        }
    }

    messages
}

/// Text of the most recent user message
pub fn last_user_text(history: &[ChatMessageInput]) -> Option<&str> {
    history
        .iter()
        .rev()
        .find(|m| m.role == MessageRole::User)
        .map(|m| m.content.trim())
        .filter(|c| !c.is_empty())
}

/// Normalize model output into a thread title
pub fn clean_title(raw: &str) -> String {
    let line = raw.trim().lines().next().unwrap_or_default().trim();

    let line = match line.split_once(':') {
        Some((prefix, rest)) if prefix.trim().eq_ignore_ascii_case("title") => rest.trim(),
        _ => line,
    };

    let stripped = line
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '*' | '#'))
        .trim()
        .trim_end_matches(['.', '!', ':'])
        .trim();

    let title: String = stripped.chars().take(MAX_TITLE_CHARS).collect();
    let title = title.trim();

    if title.is_empty() {
        DEFAULT_THREAD_TITLE.to_string()
    } else {
        title.to_string()
    }
}
