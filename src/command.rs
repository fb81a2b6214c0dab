//! Command text parsing
//!
//! Turns the text a user typed after the `!` marker into [`ImageParams`].
//! The text is read like a command line: shell-style quoting, named options
//! with a single leading dash, and `-key=value` accepted as `-key value`.
//!
//! ```text
//! -prompt "a red bicycle" -negative "people, cars" -seed 42 -cfgscale 7.5
//! ```

use thiserror::Error;

/// Prompt used when the command carries no `-prompt` option
pub const DEFAULT_PROMPT: &str = "smiley face";

/// Seed used when the command carries no `-seed` option
pub const DEFAULT_SEED: u32 = 0;

/// Guidance scale used when the command carries no `-cfgscale` option
pub const DEFAULT_CFG_SCALE: f32 = 8.0;

/// Largest seed the image model accepts
pub const MAX_SEED: u32 = 2_147_483_646;

/// Guidance scale bounds accepted by the image model
pub const CFG_SCALE_RANGE: std::ops::RangeInclusive<f32> = 1.1..=10.0;

/// Longest prompt (in characters) forwarded to the model
pub const MAX_PROMPT_CHARS: usize = 512;

/// Prompts with fewer characters than this are ignored
const MIN_PROMPT_CHARS: usize = 3;

/// Structured image generation parameters
#[derive(Debug, Clone, PartialEq)]
pub struct ImageParams {
    /// Text prompt; `None` means there is nothing to generate
    pub prompt: Option<String>,
    /// What the image should not contain
    pub negative_prompt: Option<String>,
    /// Random noise seed
    pub seed: u32,
    /// How strongly the image should adhere to the prompt
    pub cfg_scale: f32,
}

impl Default for ImageParams {
    fn default() -> Self {
        Self {
            prompt: Some(DEFAULT_PROMPT.to_string()),
            negative_prompt: None,
            seed: DEFAULT_SEED,
            cfg_scale: DEFAULT_CFG_SCALE,
        }
    }
}

/// Result of parsing a command
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCommand {
    /// Parameters with defaults and validation applied
    pub params: ImageParams,
    /// Arguments that matched no option, in input order
    pub unknown: Vec<String>,
}

/// Reasons a command cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// A quote was opened and never closed
    #[error("unterminated {0} quote")]
    UnterminatedQuote(char),

    /// The text ends with a lone backslash
    #[error("dangling escape at end of input")]
    DanglingEscape,

    /// An option was given without a value
    #[error("option -{0} expects a value")]
    MissingValue(&'static str),

    /// An option value is not a number or out of range
    #[error("invalid value for -{option}: {value:?}")]
    InvalidValue {
        /// Option name without the dash
        option: &'static str,
        /// Value as typed
        value: String,
    },
}

/// Options understood by the parser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Opt {
    Prompt,
    Negative,
    Seed,
    CfgScale,
}

impl Opt {
    const ALL: [Self; 4] = [Self::Prompt, Self::Negative, Self::Seed, Self::CfgScale];

    const fn name(self) -> &'static str {
        match self {
            Self::Prompt => "prompt",
            Self::Negative => "negative",
            Self::Seed => "seed",
            Self::CfgScale => "cfgscale",
        }
    }

    /// Resolve an option by full name or unambiguous prefix
    fn lookup(name: &str) -> Option<Self> {
        if name.is_empty() {
            return None;
        }
        if let Some(exact) = Self::ALL.into_iter().find(|o| o.name() == name) {
            return Some(exact);
        }
        let mut candidates = Self::ALL.into_iter().filter(|o| o.name().starts_with(name));
        match (candidates.next(), candidates.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        }
    }
}

/// Parse command text into image parameters
///
/// Parsing is total: any input yields either parameters or a
/// [`CommandError`], never a panic.
///
/// # Errors
///
/// Returns an error on unbalanced quoting, an option without a value, or a
/// seed / guidance scale that is not a number in the accepted range.
pub fn parse_command(text: &str) -> Result<ParsedCommand, CommandError> {
    let words = split_words(&normalize_chat_text(text))?;
    let words = normalize_assignments(words);

    let mut prompt: Option<String> = None;
    let mut negative: Option<String> = None;
    let mut seed: Option<String> = None;
    let mut cfg_scale: Option<String> = None;
    let mut unknown = Vec::new();

    let mut words = words.into_iter();
    while let Some(word) = words.next() {
        let opt = if looks_like_option(&word) {
            Opt::lookup(&word[1..])
        } else {
            None
        };
        let Some(opt) = opt else {
            unknown.push(word);
            continue;
        };

        let value = match words.next() {
            Some(value) if !looks_like_option(&value) => value,
            _ => return Err(CommandError::MissingValue(opt.name())),
        };

        let slot = match opt {
            Opt::Prompt => &mut prompt,
            Opt::Negative => &mut negative,
            Opt::Seed => &mut seed,
            Opt::CfgScale => &mut cfg_scale,
        };
        *slot = Some(value);
    }

    let params = ImageParams {
        prompt: accept_text(Some(prompt.unwrap_or_else(|| DEFAULT_PROMPT.to_string()))),
        negative_prompt: accept_text(negative),
        seed: seed.map_or(Ok(DEFAULT_SEED), |v| parse_seed(&v))?,
        cfg_scale: cfg_scale.map_or(Ok(DEFAULT_CFG_SCALE), |v| parse_cfg_scale(&v))?,
    };

    Ok(ParsedCommand { params, unknown })
}

/// Undo the text rewriting Slack applies to messages
///
/// Slack HTML-escapes `&`, `<` and `>` and clients may send typographic
/// quotes, which would otherwise break quoting.
fn normalize_chat_text(text: &str) -> String {
    text.replace(['\u{201c}', '\u{201d}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// A word produced by [`split_words`]
#[derive(Debug, PartialEq, Eq)]
struct Word {
    text: String,
    /// Some character of the word was quoted or escaped
    literal: bool,
}

/// Split text into words with POSIX shell quoting rules
fn split_words(input: &str) -> Result<Vec<Word>, CommandError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut literal = false;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_word {
                    words.push(Word {
                        text: std::mem::take(&mut current),
                        literal: std::mem::take(&mut literal),
                    });
                    in_word = false;
                }
            }
            '\'' => {
                in_word = true;
                literal = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(ch) => current.push(ch),
                        None => return Err(CommandError::UnterminatedQuote('\'')),
                    }
                }
            }
            '"' => {
                in_word = true;
                literal = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(ch @ ('"' | '\\')) => current.push(ch),
                            Some(ch) => {
                                current.push('\\');
                                current.push(ch);
                            }
                            None => return Err(CommandError::UnterminatedQuote('"')),
                        },
                        Some(ch) => current.push(ch),
                        None => return Err(CommandError::UnterminatedQuote('"')),
                    }
                }
            }
            '\\' => {
                in_word = true;
                literal = true;
                match chars.next() {
                    Some(ch) => current.push(ch),
                    None => return Err(CommandError::DanglingEscape),
                }
            }
            _ => {
                in_word = true;
                current.push(c);
            }
        }
    }

    if in_word {
        words.push(Word {
            text: current,
            literal,
        });
    }

    Ok(words)
}

/// Rewrite `-key=value`, `-key = value` and `-key =value` as `-key value`
///
/// Quoted or escaped words are values as typed, so `-prompt "=^.^="` keeps
/// its leading `=`.
fn normalize_assignments(words: Vec<Word>) -> Vec<String> {
    let mut out = Vec::with_capacity(words.len());
    let mut after_option = false;

    for Word { text: word, literal } in words {
        if looks_like_option(&word) {
            if let Some((name, value)) = word.split_once('=') {
                out.push(name.to_string());
                after_option = value.is_empty();
                if !after_option {
                    out.push(value.to_string());
                }
            } else {
                out.push(word);
                after_option = true;
            }
            continue;
        }

        if after_option && !literal {
            if word == "=" {
                continue;
            }
            if let Some(rest) = word.strip_prefix('=') {
                out.push(rest.to_string());
                after_option = false;
                continue;
            }
        }

        after_option = false;
        out.push(word);
    }

    out
}

/// Whether a word is an option rather than a value
///
/// Words with whitespace are always values, so a quoted prompt such as
/// `"-abstract art"` is never mistaken for an option.
fn looks_like_option(word: &str) -> bool {
    let mut chars = word.chars();
    chars.next() == Some('-')
        && chars.next().is_some_and(char::is_alphabetic)
        && !word.contains(char::is_whitespace)
}

/// Apply the minimum length and truncation rules to a prompt
fn accept_text(value: Option<String>) -> Option<String> {
    let value = value?;
    if value.chars().count() < MIN_PROMPT_CHARS {
        return None;
    }
    Some(value.chars().take(MAX_PROMPT_CHARS).collect())
}

fn parse_seed(value: &str) -> Result<u32, CommandError> {
    value
        .parse::<u32>()
        .ok()
        .filter(|seed| *seed <= MAX_SEED)
        .ok_or_else(|| CommandError::InvalidValue {
            option: Opt::Seed.name(),
            value: value.to_string(),
        })
}

fn parse_cfg_scale(value: &str) -> Result<f32, CommandError> {
    value
        .parse::<f32>()
        .ok()
        .filter(|scale| CFG_SCALE_RANGE.contains(scale))
        .ok_or_else(|| CommandError::InvalidValue {
            option: Opt::CfgScale.name(),
            value: value.to_string(),
        })
}
