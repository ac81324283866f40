use crate::{Error, Result};
use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref RE: Regex = Regex::new(r"\w+").expect("valid regex");
}

static IDENTITY: Identity = Identity;

/// Reduces a lower-cased word to its root form. Must not fail.
pub trait Stem: Send + Sync {
    fn stem<'a>(&self, word: &'a str) -> Cow<'a, str>;
}

/// Leaves words untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Stem for Identity {
    fn stem<'a>(&self, word: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(word)
    }
}

impl Stem for Stemmer {
    fn stem<'a>(&self, word: &'a str) -> Cow<'a, str> {
        Stemmer::stem(self, word)
    }
}

/// Map a config name to a Snowball algorithm. `None` means no stemming.
fn algorithm(name: &str) -> Result<Option<Algorithm>> {
    let algorithm = match name.trim().to_lowercase().as_str() {
        "" | "none" | "identity" => return Ok(None),
        "arabic" => Algorithm::Arabic,
        "danish" => Algorithm::Danish,
        "dutch" => Algorithm::Dutch,
        "english" => Algorithm::English,
        "finnish" => Algorithm::Finnish,
        "french" => Algorithm::French,
        "german" => Algorithm::German,
        "greek" => Algorithm::Greek,
        "hungarian" => Algorithm::Hungarian,
        "italian" => Algorithm::Italian,
        "norwegian" => Algorithm::Norwegian,
        "portuguese" => Algorithm::Portuguese,
        "romanian" => Algorithm::Romanian,
        "russian" => Algorithm::Russian,
        "spanish" => Algorithm::Spanish,
        "swedish" => Algorithm::Swedish,
        "tamil" => Algorithm::Tamil,
        "turkish" => Algorithm::Turkish,
        other => return Err(Error::config(format!("unknown stemmer \"{other}\""))),
    };
    Ok(Some(algorithm))
}

/// Splits text into normalized word tokens.
///
/// The same tokenizer must be used for indexing and querying, otherwise
/// query words never match indexed terms.
#[derive(Clone)]
pub struct Tokenizer {
    stemmer: Arc<dyn Stem>,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(Identity)
    }
}

impl fmt::Debug for Tokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tokenizer").finish_non_exhaustive()
    }
}

impl Tokenizer {
    pub fn new<S: Stem + 'static>(stemmer: S) -> Self {
        Self { stemmer: Arc::new(stemmer) }
    }

    /// Build from a stemmer name as found in the config ("none", "english", ...).
    pub fn from_name(name: &str) -> Result<Self> {
        Ok(match algorithm(name)? {
            Some(algorithm) => Self::new(Stemmer::create(algorithm)),
            None => Self::default(),
        })
    }

    /// Lazily tokenize `text`. Calling it again on the same text yields the same tokens.
    pub fn tokenize(&self, text: &str) -> Tokens<'_> {
        Tokens::new(text, self.stemmer.as_ref())
    }
}

/// Tokenize without stemming.
pub fn tokenize(text: &str) -> Tokens<'static> {
    Tokens::new(text, &IDENTITY)
}

/// Iterator over the tokens of one text.
///
/// The text is normalized as a whole before word runs are matched, since
/// compatibility expansions may introduce separators.
pub struct Tokens<'s> {
    text: String,
    pos: usize,
    stemmer: &'s dyn Stem,
}

impl<'s> Tokens<'s> {
    fn new(text: &str, stemmer: &'s dyn Stem) -> Self {
        Self { text: text.nfkc().collect::<String>().to_lowercase(), pos: 0, stemmer }
    }
}

impl Iterator for Tokens<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let word = RE.find_at(&self.text, self.pos)?;
        self.pos = word.end();
        let word = word.as_str();
        let root = self.stemmer.stem(word);
        // a root of nothing is useless, keep the word itself
        Some(if root.is_empty() { word.to_string() } else { root.into_owned() })
    }
}
