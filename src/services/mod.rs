mod telegram;
mod translator;

pub use telegram::TelegramSink;
pub use translator::{translate_or_original, GoogleTranslator, NoopTranslator, Translator};
