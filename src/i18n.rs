//! Translation lookup
//!
//! Translation never fails: a missing key renders as its dotted key path.

use serde_json::Value;

/// Plural category of a count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluralForm {
    One,
    Few,
    Many,
    Other,
}

impl PluralForm {
    /// Category of `count` under the rules of `language`
    pub fn select(language: &str, count: i64) -> Self {
        let n = count.unsigned_abs();
        match language {
            "ru" | "uk" | "be" => {
                let (rem10, rem100) = (n % 10, n % 100);
                if rem10 == 1 && rem100 != 11 {
                    PluralForm::One
                } else if (2..=4).contains(&rem10) && !(12..=14).contains(&rem100) {
                    PluralForm::Few
                } else {
                    PluralForm::Many
                }
            }
            _ if n == 1 => PluralForm::One,
            _ => PluralForm::Other,
        }
    }

    fn key(self) -> &'static str {
        match self {
            PluralForm::One => "one",
            PluralForm::Few => "few",
            PluralForm::Many => "many",
            PluralForm::Other => "other",
        }
    }
}

pub trait Translator: Send + Sync {
    /// Translate the dotted `key` for `language`, selecting a plural form by
    /// `count` and substituting `{0}`, `{1}`, ... with `vars`
    fn translate(&self, language: Option<&str>, key: &str, count: Option<i64>, vars: &[String])
        -> String;
}

/// Replace `{i}` placeholders with `vars[i]`
pub fn substitute(template: &str, vars: &[String]) -> String {
    vars.iter()
        .enumerate()
        .fold(template.to_string(), |text, (i, var)| {
            text.replace(&format!("{{{i}}}"), var)
        })
}

/// Translator without a dictionary: every key renders as itself
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyPathTranslator;

impl Translator for KeyPathTranslator {
    fn translate(&self, _: Option<&str>, key: &str, _: Option<i64>, _: &[String]) -> String {
        key.to_string()
    }
}

/// Nested JSON dictionary whose leaves map language codes to strings or to
/// plural-form objects:
///
/// ```json
/// { "catalog": { "items": { "en": { "one": "{0} item", "other": "{0} items" } } } }
/// ```
#[derive(Debug, Clone)]
pub struct DictionaryTranslator {
    dictionary: Value,
    default_language: String,
}

impl DictionaryTranslator {
    pub fn new(dictionary: Value, default_language: impl Into<String>) -> Self {
        Self {
            dictionary,
            default_language: default_language.into(),
        }
    }

    pub fn from_json(json: &str, default_language: impl Into<String>) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(json)?, default_language))
    }

    fn lookup(&self, language: &str, key: &str, count: Option<i64>) -> Option<&str> {
        let leaf = key
            .split('.')
            .try_fold(&self.dictionary, |node, part| node.get(part))?;
        let entry = leaf.get(language)?;
        match entry {
            Value::String(text) => Some(text.as_str()),
            Value::Object(forms) => {
                let form = PluralForm::select(language, count.unwrap_or(1));
                forms
                    .get(form.key())
                    .or_else(|| forms.get("other"))
                    .and_then(Value::as_str)
            }
            _ => None,
        }
    }
}

impl Translator for DictionaryTranslator {
    fn translate(
        &self,
        language: Option<&str>,
        key: &str,
        count: Option<i64>,
        vars: &[String],
    ) -> String {
        let language = language.unwrap_or(&self.default_language);
        let found = self
            .lookup(language, key, count)
            .or_else(|| self.lookup(&self.default_language, key, count));
        match found {
            Some(template) => substitute(template, vars),
            None => {
                tracing::debug!(key, language, "Missing translation");
                key.to_string()
            }
        }
    }
}
