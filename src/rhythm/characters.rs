//! Character feed assigning target keys to non-silent units.

const FALLBACK_TEXT: &str = "fj";

/// Cycles through a practice text, handing out one character per sounding slot.
///
/// Whitespace is skipped so every target is a visible key.
#[derive(Debug, Clone)]
pub struct CharacterFeed {
    characters: Vec<char>,
    cursor: usize,
}

impl CharacterFeed {
    pub fn new(text: &str) -> Self {
        let mut characters: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
        if characters.is_empty() {
            log::warn!(
                "[CharacterFeed] Practice text has no usable characters, using {:?}",
                FALLBACK_TEXT
            );
            characters = FALLBACK_TEXT.chars().collect();
        }
        Self {
            characters,
            cursor: 0,
        }
    }

    /// Next character of the text, wrapping at the end.
    pub fn next_char(&mut self) -> char {
        let c = self.characters[self.cursor];
        self.cursor = (self.cursor + 1) % self.characters.len();
        c
    }

    /// Characters handed out so far, modulo the text length.
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}
