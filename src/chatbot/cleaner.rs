//! Text cleanup for everything the bot sends: markdown/link normalization,
//! paragraph reflow and bullet normalization. Pure functions, no I/O.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Target paragraph length when grouping long prose.
const WORDS_PER_PARAGRAPH: usize = 40;

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)```.*?```").unwrap());
static INLINE_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`[^`\n]+`").unwrap());
static TABLE_ROW: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^[ \t]*\|.+\|.*$").unwrap());
static TRAILING_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+\n").unwrap());
static EXCESS_NEWLINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());
static SENTENCE_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]\s+").unwrap());
static BULLET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(?:[•\-]|\*)\s+(.*)$").unwrap());
static MARKDOWN_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\[\]]+?)\]\(<?(https?://[^\s)>]+)>?\)").unwrap());
static ANGLE_URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<https?://[^\s>]+>").unwrap());
static BARE_URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"https?://\S+").unwrap());
static SOURCES_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)(?:📚\s*(?:แหล่งอ้างอิง|sources?)|^[ \t]*(?:แหล่งอ้างอิง|sources?))\s*:[ \t]*").unwrap());

const BLOCK_MARKER: &str = "__BLOCK_";

/// Full cleanup pass applied to every outgoing text.
pub fn clean_output_text(text: &str) -> String {
    let (text, blocks) = preserve_blocks(text);
    let text = TRAILING_SPACE.replace_all(&text, "\n");
    let text = EXCESS_NEWLINES.replace_all(&text, "\n\n");
    let text = reflow_lines(&text);
    let text = group_paragraphs(&text);
    restore_blocks(&text, &blocks).trim().to_string()
}

/// Normalize bullet markers to "• ". Code fences pass through untouched.
pub fn format_response_markdown(text: &str) -> String {
    let mut in_fence = false;
    text.lines()
        .map(|raw| {
            let line = raw.trim();
            if line.starts_with("```") {
                in_fence = !in_fence;
                return line.to_string();
            }
            if in_fence {
                return raw.to_string();
            }
            match BULLET.captures(line) {
                Some(caps) if !line.starts_with("**") => format!("• {}", caps[1].trim()),
                _ => line.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Everything model output goes through before it reaches a user.
pub fn postprocess(text: &str) -> String {
    clean_output_text(&format_response_markdown(&strip_links(text)))
}

/// Reduce markdown links to their text, drop bare URLs and source labels.
pub fn strip_links(text: &str) -> String {
    let text = MARKDOWN_LINK.replace_all(text, "$1");
    let text = ANGLE_URL.replace_all(&text, "");
    let text = BARE_URL.replace_all(&text, "");
    SOURCES_LABEL.replace_all(&text, "").into_owned()
}

/// Strip line breaks from a URL.
pub fn clean_url(url: &str) -> String {
    url.chars().filter(|c| *c != '\n' && *c != '\r').collect()
}

fn preserve_blocks(raw: &str) -> (String, Vec<String>) {
    let mut blocks = Vec::new();
    let mut text = raw.to_string();
    for re in [&*CODE_FENCE, &*INLINE_CODE, &*TABLE_ROW] {
        text = re
            .replace_all(&text, |caps: &Captures| {
                let key = format!("{BLOCK_MARKER}{}__", blocks.len());
                blocks.push(caps[0].to_string());
                key
            })
            .into_owned();
    }
    (text, blocks)
}

fn restore_blocks(text: &str, blocks: &[String]) -> String {
    let mut text = text.to_string();
    // Later blocks may contain earlier placeholders (inline code inside a table row).
    for (i, block) in blocks.iter().enumerate().rev() {
        text = text.replace(&format!("{BLOCK_MARKER}{i}__"), block);
    }
    text
}

fn is_thai(c: char) -> bool {
    ('\u{0E01}'..='\u{0E5B}').contains(&c)
}

/// A line ending like this is a deliberate break.
fn ends_cleanly(line: &str) -> bool {
    match line.chars().last() {
        Some(c) => c.is_ascii_alphanumeric() || is_thai(c) || matches!(c, '.' | '!' | '?' | ')'),
        None => true,
    }
}

/// A line starting like this begins its own block (list, heading, quote, emoji line).
fn starts_block(line: &str) -> bool {
    if line.starts_with(BLOCK_MARKER) {
        return true;
    }
    match line.chars().next() {
        Some(c) => {
            matches!(c, '-' | '*' | '•' | '#' | '>' | '|' | ':' | '<')
                || c.is_ascii_digit()
                || !(c.is_alphanumeric() || c.is_whitespace() || is_thai(c))
        }
        None => true,
    }
}

/// Join soft-wrapped lines back into one.
fn reflow_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev: Option<&str> = None;
    for line in text.split('\n') {
        if let Some(p) = prev {
            let soft = !p.is_empty() && !line.is_empty() && !ends_cleanly(p) && !starts_block(line);
            out.push(if soft { ' ' } else { '\n' });
        }
        out.push_str(line);
        prev = Some(line);
    }
    out
}

/// Break single-line prose longer than a paragraph at sentence boundaries.
fn group_paragraphs(text: &str) -> String {
    text.split("\n\n")
        .map(|para| {
            if para.contains('\n') || para.split_whitespace().count() <= WORDS_PER_PARAGRAPH {
                return para.to_string();
            }
            let mut sentences = Vec::new();
            let mut last = 0;
            for m in SENTENCE_END.find_iter(para) {
                sentences.push(para[last..m.start() + 1].trim());
                last = m.end();
            }
            sentences.push(para[last..].trim());

            let mut paragraphs: Vec<String> = Vec::new();
            let mut current = String::new();
            let mut words = 0;
            for sentence in sentences.into_iter().filter(|s| !s.is_empty()) {
                let n = sentence.split_whitespace().count();
                if words > 0 && words + n > WORDS_PER_PARAGRAPH {
                    paragraphs.push(std::mem::take(&mut current));
                    words = 0;
                }
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(sentence);
                words += n;
            }
            if !current.is_empty() {
                paragraphs.push(current);
            }
            paragraphs.join("\n\n")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
