//! Rule-based Indonesian affix stripping (Tala).
//!
//! The stemmer works without a dictionary. A word passes through ordered
//! stages: particle, possessive, first-order prefix, then a two-branch
//! suffix/second-order-prefix resolution. Every removal must leave a
//! plausible root behind (at least two characters and two vowels); if the
//! final candidate is not plausible the input word is returned untouched.
//!
//! All affix tables live in [`AffixRules`], which is plain immutable data
//! handed to [`TalaStemmer::new`]. Stemming never mutates shared state, so a
//! single stemmer can be used from any number of threads.

use serde::{Deserialize, Serialize};
use std::fmt;

const VOWELS: &[char] = &['a', 'e', 'i', 'o', 'u'];
const MIN_ROOT_CHARS: usize = 2;
const MIN_ROOT_VOWELS: usize = 2;

/// Abstract prefix family recorded when a prefix is removed. Suffix removal
/// consults it through [`AffixRules::suffixes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrefixClass {
    Meng,
    Peng,
    Di,
    Ter,
    Ke,
    Ber,
    Per,
}

impl fmt::Display for PrefixClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PrefixClass::Meng => "meng",
            PrefixClass::Peng => "peng",
            PrefixClass::Di => "di",
            PrefixClass::Ter => "ter",
            PrefixClass::Ke => "ke",
            PrefixClass::Ber => "ber",
            PrefixClass::Per => "per",
        };
        f.write_str(s)
    }
}

/// What must follow a prefix for the rule to fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Following {
    Any,
    Vowel,
    Consonant,
}

impl Following {
    fn admits(self, next: Option<char>) -> bool {
        match (self, next) {
            (Following::Any, _) => true,
            (Following::Vowel, Some(c)) => is_vowel(c),
            (Following::Consonant, Some(c)) => c.is_alphabetic() && !is_vowel(c),
            (_, None) => false,
        }
    }
}

/// A prefix pattern. When `replacement` is non-empty the prefix is swapped
/// for it instead of dropped (`meny` + vowel becomes `s` + vowel).
#[derive(Debug, Clone)]
pub struct PrefixRule {
    pub prefix: String,
    pub following: Following,
    pub replacement: String,
    pub class: PrefixClass,
}

impl PrefixRule {
    pub fn strip(prefix: &str, class: PrefixClass) -> Self {
        Self::new(prefix, Following::Any, "", class)
    }

    pub fn new(prefix: &str, following: Following, replacement: &str, class: PrefixClass) -> Self {
        Self {
            prefix: prefix.to_string(),
            following,
            replacement: replacement.to_string(),
            class,
        }
    }

    fn apply(&self, word: &str) -> Option<String> {
        let rest = word.strip_prefix(self.prefix.as_str())?;
        if !self.following.admits(rest.chars().next()) {
            return None;
        }
        let mut out = String::with_capacity(self.replacement.len() + rest.len());
        out.push_str(&self.replacement);
        out.push_str(rest);
        Some(out)
    }
}

/// A derivational suffix and the prefix classes it cannot combine with.
#[derive(Debug, Clone)]
pub struct SuffixRule {
    pub suffix: String,
    pub disallowed_after: Vec<PrefixClass>,
}

impl SuffixRule {
    pub fn new(suffix: &str, disallowed_after: &[PrefixClass]) -> Self {
        Self { suffix: suffix.to_string(), disallowed_after: disallowed_after.to_vec() }
    }

    fn compatible_with(&self, removed: &[PrefixClass]) -> bool {
        !removed.iter().any(|c| self.disallowed_after.contains(c))
    }
}

/// Whole-stem irregular forms handled before the generic second-order rules.
#[derive(Debug, Clone)]
pub struct Irregular {
    pub form: String,
    pub root: String,
    pub class: PrefixClass,
}

/// Affix tables consumed by [`TalaStemmer`]. Rules inside each table are
/// tried in order and the first one that leaves a plausible root wins.
#[derive(Debug, Clone)]
pub struct AffixRules {
    pub particles: Vec<String>,
    pub possessives: Vec<String>,
    pub first_order: Vec<PrefixRule>,
    pub second_order: Vec<PrefixRule>,
    pub irregulars: Vec<Irregular>,
    pub suffixes: Vec<SuffixRule>,
}

impl AffixRules {
    pub fn tala() -> Self {
        use Following::{Consonant, Vowel};
        use PrefixClass::*;

        let first_order = vec![
            PrefixRule::new("meny", Vowel, "s", Meng),
            PrefixRule::new("mem", Vowel, "p", Meng),
            PrefixRule::new("peny", Vowel, "s", Peng),
            PrefixRule::new("pem", Vowel, "p", Peng),
            PrefixRule::strip("meng", Meng),
            PrefixRule::strip("men", Meng),
            PrefixRule::new("mem", Consonant, "", Meng),
            PrefixRule::strip("me", Meng),
            PrefixRule::strip("peng", Peng),
            PrefixRule::strip("pen", Peng),
            PrefixRule::new("pem", Consonant, "", Peng),
            PrefixRule::strip("di", Di),
            PrefixRule::strip("ter", Ter),
            PrefixRule::strip("ke", Ke),
        ];
        // bel- and pel- only occur in the lexicalized forms below.
        let second_order = vec![
            PrefixRule::strip("ber", Ber),
            PrefixRule::strip("per", Per),
            PrefixRule::strip("be", Ber),
            PrefixRule::strip("pe", Per),
        ];
        let irregulars = vec![
            Irregular { form: "belajar".into(), root: "ajar".into(), class: Ber },
            Irregular { form: "pelajar".into(), root: "ajar".into(), class: Per },
        ];
        let suffixes = vec![
            SuffixRule::new("kan", &[Ke, Peng]),
            SuffixRule::new("an", &[Di, Meng, Ter]),
            SuffixRule::new("i", &[Ber, Ke, Peng]),
        ];

        Self {
            particles: vec!["lah".into(), "kah".into(), "pun".into()],
            possessives: vec!["nya".into(), "ku".into(), "mu".into()],
            first_order,
            second_order,
            irregulars,
            suffixes,
        }
    }
}

impl Default for AffixRules {
    fn default() -> Self {
        Self::tala()
    }
}

/// Everything the stemmer removed on the way to `root`. When the final
/// candidate fails the root check, all fields except `root` are empty and
/// `root` is the input word.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StemOutcome {
    pub root: String,
    pub particle: Option<String>,
    pub possessive: Option<String>,
    pub prefixes: Vec<PrefixClass>,
    pub suffix: Option<String>,
}

impl StemOutcome {
    fn unchanged(word: &str) -> Self {
        Self { root: word.to_string(), ..Self::default() }
    }

    pub fn is_unchanged(&self) -> bool {
        self.particle.is_none() && self.possessive.is_none() && self.prefixes.is_empty() && self.suffix.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TalaStemmer {
    rules: AffixRules,
}

impl TalaStemmer {
    pub fn new(rules: AffixRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &AffixRules {
        &self.rules
    }

    /// Reduce a lowercase, punctuation-free token to its root.
    pub fn stem(&self, word: &str) -> String {
        self.stem_detailed(word).root
    }

    /// Stem every token, dropping empty ones.
    pub fn stem_all(&self, tokens: &[String]) -> Vec<String> {
        tokens.iter().filter(|t| !t.is_empty()).map(|t| self.stem(t)).collect()
    }

    pub fn stem_detailed(&self, word: &str) -> StemOutcome {
        if word.chars().count() < MIN_ROOT_CHARS {
            return StemOutcome::unchanged(word);
        }

        let mut out = StemOutcome::default();
        let mut current = word.to_string();

        if let Some((rest, particle)) = strip_ending(&current, &self.rules.particles) {
            current = rest;
            out.particle = Some(particle);
        }
        if let Some((rest, possessive)) = strip_ending(&current, &self.rules.possessives) {
            current = rest;
            out.possessive = Some(possessive);
        }
        if let Some((rest, class)) = strip_prefix(&current, &self.rules.first_order) {
            current = rest;
            out.prefixes.push(class);
        }

        match self.strip_suffix(&current, &out.prefixes) {
            Some((rest, suffix)) => {
                current = rest;
                out.suffix = Some(suffix);
                if let Some((rest, class)) = self.strip_second_order(&current) {
                    current = rest;
                    out.prefixes.push(class);
                }
            }
            None => {
                if let Some((rest, class)) = self.strip_second_order(&current) {
                    current = rest;
                    out.prefixes.push(class);
                }
                if let Some((rest, suffix)) = self.strip_suffix(&current, &out.prefixes) {
                    current = rest;
                    out.suffix = Some(suffix);
                }
            }
        }

        if !is_plausible_root(&current) {
            return StemOutcome::unchanged(word);
        }
        out.root = current;
        out
    }

    fn strip_suffix(&self, word: &str, removed: &[PrefixClass]) -> Option<(String, String)> {
        self.rules.suffixes.iter().find_map(|rule| {
            let rest = word.strip_suffix(rule.suffix.as_str())?;
            (is_plausible_root(rest) && rule.compatible_with(removed)).then(|| (rest.to_string(), rule.suffix.clone()))
        })
    }

    fn strip_second_order(&self, word: &str) -> Option<(String, PrefixClass)> {
        if let Some(irr) = self.rules.irregulars.iter().find(|irr| irr.form == word) {
            return Some((irr.root.clone(), irr.class));
        }
        strip_prefix(word, &self.rules.second_order)
    }
}

fn strip_ending(word: &str, endings: &[String]) -> Option<(String, String)> {
    endings.iter().find_map(|ending| {
        let rest = word.strip_suffix(ending.as_str())?;
        is_plausible_root(rest).then(|| (rest.to_string(), ending.clone()))
    })
}

fn strip_prefix(word: &str, rules: &[PrefixRule]) -> Option<(String, PrefixClass)> {
    rules.iter().find_map(|rule| {
        let rest = rule.apply(word)?;
        is_plausible_root(&rest).then_some((rest, rule.class))
    })
}

#[inline]
fn is_vowel(c: char) -> bool {
    VOWELS.contains(&c)
}

/// At least two characters and two vowels, a cheap stand-in for "has two syllables".
pub fn is_plausible_root(word: &str) -> bool {
    word.chars().count() >= MIN_ROOT_CHARS && word.chars().filter(|c| is_vowel(*c)).count() >= MIN_ROOT_VOWELS
}
