use crate::models::Article;
use crate::services::{translate_or_original, Translator};

const PENCIL: &str = "\u{270F}\u{FE0F}";
const CALENDAR: &str = "\u{1F5D3}\u{FE0F}";
const LINK: &str = "\u{1F517}";
const DATE_FORMAT: &str = "%Y/%m/%d, %H:%M";

/// Characters Telegram MarkdownV2 requires escaped outside entities.
const SPECIAL_CHARS: &[char] = &[
    '\\', '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.',
    '!', '\'',
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Language {
    pub code: String,
    pub flag: &'static str,
}

impl Language {
    pub fn from_code(code: &str) -> Self {
        let code = code.trim().to_lowercase();
        let flag = match code.as_str() {
            "it" => "\u{1F1EE}\u{1F1F9}",
            "en" => "\u{1F1FA}\u{1F1F8}",
            "de" => "\u{1F1E9}\u{1F1EA}",
            "fr" => "\u{1F1EB}\u{1F1F7}",
            "es" => "\u{1F1EA}\u{1F1F8}",
            "pt" => "\u{1F1F5}\u{1F1F9}",
            "nl" => "\u{1F1F3}\u{1F1F1}",
            _ => "\u{1F3F3}\u{FE0F}",
        };
        Self { code, flag }
    }
}

/// Renders articles as two-language MarkdownV2 messages.
pub struct MessageFormatter {
    primary: Language,
    secondary: Language,
}

impl MessageFormatter {
    pub fn new(primary: Language, secondary: Language) -> Self {
        Self { primary, secondary }
    }

    pub async fn render(&self, article: &Article, translator: &dyn Translator) -> String {
        let primary_title = translate_or_original(translator, &article.title, &self.primary.code).await;
        let secondary_title =
            translate_or_original(translator, &article.title, &self.secondary.code).await;
        let primary_summary =
            translate_or_original(translator, &article.summary, &self.primary.code).await;
        let secondary_summary =
            translate_or_original(translator, &article.summary, &self.secondary.code).await;

        format!(
            "{pf} {pt}\n{sf} {st}\n\n{PENCIL} {author}\n{CALENDAR} {date}\n\n{pf} {ps}\n\n{sf} {ss}\n\n{LINK} {link}",
            pf = self.primary.flag,
            sf = self.secondary.flag,
            pt = escape_markdown_v2(&primary_title),
            st = escape_markdown_v2(&secondary_title),
            author = escape_markdown_v2(&article.author),
            date = escape_markdown_v2(&article.published_at.format(DATE_FORMAT).to_string()),
            ps = escape_markdown_v2(&primary_summary),
            ss = escape_markdown_v2(&secondary_summary),
            link = markdown_link(&article.title, &article.link),
        )
    }
}

pub fn escape_markdown_v2(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() * 2);
    for ch in text.chars() {
        if SPECIAL_CHARS.contains(&ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// `[title](url)`; inside the URL part only `)` and `\` need escaping.
fn markdown_link(title: &str, url: &str) -> String {
    let url = url.trim().replace('\\', "\\\\").replace(')', "\\)");
    format!("[{}]({})", escape_markdown_v2(title), url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::NoopTranslator;
    use chrono::NaiveDate;

    fn article() -> Article {
        Article {
            title: "Field day 2026!".into(),
            author: "iu2frl.it".into(),
            published_at: NaiveDate::from_ymd_opt(2026, 10, 5)
                .unwrap()
                .and_hms_opt(9, 7, 0)
                .unwrap(),
            summary: "Meet us at the park (bring a radio).".into(),
            link: "https://example.com/field-day_(2026)".into(),
            checksum: "c".into(),
        }
    }

    #[test]
    fn escapes_every_special_character() {
        assert_eq!(escape_markdown_v2("a_b*c.d!"), "a\\_b\\*c\\.d\\!");
        assert_eq!(escape_markdown_v2("it's"), "it\\'s");
        assert_eq!(escape_markdown_v2("plain text"), "plain text");
    }

    #[test]
    fn link_escapes_closing_paren_in_url() {
        assert_eq!(
            markdown_link("A.B", "https://x.y/a_(b)"),
            "[A\\.B](https://x.y/a_(b\\))"
        );
    }

    #[test]
    fn unknown_language_gets_white_flag() {
        assert_eq!(Language::from_code("IT").code, "it");
        assert_eq!(Language::from_code("xx").flag, "\u{1F3F3}\u{FE0F}");
    }

    #[tokio::test]
    async fn message_layout_is_fixed() {
        let formatter = MessageFormatter::new(Language::from_code("it"), Language::from_code("en"));
        let message = formatter.render(&article(), &NoopTranslator).await;
        let it = "\u{1F1EE}\u{1F1F9}";
        let us = "\u{1F1FA}\u{1F1F8}";

        let expected = format!(
            "{it} Field day 2026\\!\n{us} Field day 2026\\!\n\n{PENCIL} iu2frl\\.it\n{CALENDAR} 2026/10/05, 09:07\n\n{it} Meet us at the park \\(bring a radio\\)\\.\n\n{us} Meet us at the park \\(bring a radio\\)\\.\n\n{LINK} [Field day 2026\\!](https://example.com/field-day_(2026\\))"
        );
        assert_eq!(message, expected);
    }
}
