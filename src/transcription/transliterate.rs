//! Script conversion applied to finished captions.
//!
//! The transliterate task asks the model for Hindi in Devanagari and then
//! romanizes every segment here. Text that is already Latin passes through
//! unchanged, so running the conversion twice gives the same result.

/// Writing schemes the captions can be converted between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Devanagari,
    /// Informal Latin spelling of Hindi ("Hinglish")
    Roman,
}

pub trait Transliterator: Send + Sync {
    fn name(&self) -> &'static str;

    /// False when no conversion backend is present; callers then keep the
    /// text as it is.
    fn is_available(&self) -> bool {
        true
    }

    fn transliterate(&self, text: &str, from: Scheme, to: Scheme) -> String;
}

/// Pass-through used when no transliteration backend is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTransliterator;

impl Transliterator for NoopTransliterator {
    fn name(&self) -> &'static str {
        "none"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn transliterate(&self, text: &str, _from: Scheme, _to: Scheme) -> String {
        text.to_string()
    }
}

/// Table-driven Devanagari to Roman converter.
///
/// Drops the inherent vowel at word ends (Hindi schwa deletion), so
/// "नमस्ते" becomes "namaste" and "आज" becomes "aaj".
#[derive(Debug, Default, Clone, Copy)]
pub struct DevanagariRomanizer;

const VIRAMA: char = '\u{094D}';
const NUKTA: char = '\u{093C}';

fn consonant(c: char) -> Option<&'static str> {
    Some(match c {
        'क' => "k",
        'ख' => "kh",
        'ग' => "g",
        'घ' => "gh",
        'ङ' => "ng",
        'च' => "ch",
        'छ' => "chh",
        'ज' => "j",
        'झ' => "jh",
        'ञ' => "ny",
        'ट' => "t",
        'ठ' => "th",
        'ड' => "d",
        'ढ' => "dh",
        'ण' => "n",
        'त' => "t",
        'थ' => "th",
        'द' => "d",
        'ध' => "dh",
        'न' => "n",
        'प' => "p",
        'फ' => "ph",
        'ब' => "b",
        'भ' => "bh",
        'म' => "m",
        'य' => "y",
        'र' => "r",
        'ल' => "l",
        'ळ' => "l",
        'व' => "v",
        'श' => "sh",
        'ष' => "sh",
        'स' => "s",
        'ह' => "h",
        // precomposed nukta forms
        '\u{0958}' => "q",
        '\u{0959}' => "kh",
        '\u{095A}' => "gh",
        '\u{095B}' => "z",
        '\u{095C}' => "r",
        '\u{095D}' => "rh",
        '\u{095E}' => "f",
        '\u{095F}' => "y",
        _ => return None,
    })
}

/// Consonant followed by a combining nukta
fn nukta_form(c: char) -> Option<&'static str> {
    Some(match c {
        'क' => "q",
        'ख' => "kh",
        'ग' => "gh",
        'ज' => "z",
        'ड' => "r",
        'ढ' => "rh",
        'फ' => "f",
        _ => return None,
    })
}

fn independent_vowel(c: char) -> Option<&'static str> {
    Some(match c {
        'अ' => "a",
        'आ' => "aa",
        'इ' => "i",
        'ई' => "ee",
        'उ' => "u",
        'ऊ' => "oo",
        'ऋ' => "ri",
        'ए' => "e",
        'ऐ' => "ai",
        'ओ' => "o",
        'औ' => "au",
        'ऑ' => "o",
        'ॐ' => "om",
        _ => return None,
    })
}

/// Dependent vowel sign; the second value is used at the end of a word.
fn vowel_sign(c: char) -> Option<(&'static str, &'static str)> {
    Some(match c {
        'ा' => ("aa", "a"),
        'ि' => ("i", "i"),
        'ी' => ("ee", "i"),
        'ु' => ("u", "u"),
        'ू' => ("oo", "oo"),
        'ृ' => ("ri", "ri"),
        'े' => ("e", "e"),
        'ै' => ("ai", "ai"),
        'ो' => ("o", "o"),
        'ौ' => ("au", "au"),
        'ॉ' => ("o", "o"),
        _ => return None,
    })
}

fn other_sign(c: char) -> Option<&'static str> {
    Some(match c {
        'ं' | 'ँ' => "n",
        'ः' => "h",
        '।' | '॥' => ".",
        '०' => "0",
        '१' => "1",
        '२' => "2",
        '३' => "3",
        '४' => "4",
        '५' => "5",
        '६' => "6",
        '७' => "7",
        '८' => "8",
        '९' => "9",
        _ => return None,
    })
}

/// Letters and marks that continue a word
fn continues_word(c: char) -> bool {
    ('\u{0900}'..='\u{0963}').contains(&c) || ('\u{0970}'..='\u{097F}').contains(&c)
}

fn romanize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    // a consonant was emitted and its inherent vowel is still undecided
    let mut pending = false;

    while let Some(c) = chars.next() {
        if let Some(base) = consonant(c) {
            if pending {
                out.push('a');
            }
            let base = if chars.peek() == Some(&NUKTA) {
                chars.next();
                nukta_form(c).unwrap_or(base)
            } else {
                base
            };
            out.push_str(base);
            pending = true;
            continue;
        }

        if let Some((mid, last)) = vowel_sign(c) {
            let at_end = !chars.peek().is_some_and(|n| continues_word(*n));
            out.push_str(if at_end { last } else { mid });
            pending = false;
            continue;
        }

        if c == VIRAMA || c == NUKTA {
            pending = false;
            continue;
        }

        if let Some(vowel) = independent_vowel(c) {
            if pending {
                out.push('a');
            }
            out.push_str(vowel);
            pending = false;
            continue;
        }

        if let Some(sign) = other_sign(c) {
            if pending && matches!(c, 'ं' | 'ँ' | 'ः') {
                out.push('a');
            }
            out.push_str(sign);
            pending = false;
            continue;
        }

        // anything else ends the word; the inherent vowel is dropped
        pending = false;
        out.push(c);
    }

    out
}

impl Transliterator for DevanagariRomanizer {
    fn name(&self) -> &'static str {
        "builtin"
    }

    fn transliterate(&self, text: &str, from: Scheme, to: Scheme) -> String {
        match (from, to) {
            (Scheme::Devanagari, Scheme::Roman) => romanize(text),
            _ => text.to_string(),
        }
    }
}
