//! Metadata of a recipe

use std::{borrow::Cow, str::FromStr};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{convert::System, quantity::to_rounded_decimal};

/// Metadata of a recipe
///
/// You can use [`Metadata::get`] to get a value. The key can be a `&str`, a
/// [`StdKey`] or any [yaml value](serde_yaml::Value). Once you get a
/// [`serde_yaml::Value`], you can use any of it's methods to get your desired
/// type, or any of the [`CooklangValueExt`] which adds more ways to interpret
/// it.
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    /// All the raw key/value pairs from the recipe
    pub map: serde_yaml::Mapping,
}

/// Standard keys
///
/// To use them, use [`Metadata::get`]. Some keys are known by more than one
/// name, [`FromStr`] accepts all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StdKey {
    Title,
    Description,
    Tags,
    Author,
    Source,
    Servings,
    Locale,
    UnitSystem,
}

/// Names the servings can be written with, in lookup order
const SERVINGS_KEYS: &[&str] = &["servings", "serves", "yield"];
/// Names the unit system can be written with, in lookup order
const UNIT_SYSTEM_KEYS: &[&str] = &["unit system", "unit_system", "units"];

impl std::fmt::Display for StdKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

#[derive(Error, Debug, Clone)]
#[error("Failed to parse '{0}' as a standard key")]
pub struct StdKeyParseError(String);

impl FromStr for StdKey {
    type Err = StdKeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let k = match s {
            "title" => Self::Title,
            "description" | "introduction" => Self::Description,
            "tags" | "tag" => Self::Tags,
            "author" => Self::Author,
            "source" => Self::Source,
            "locale" => Self::Locale,
            s if SERVINGS_KEYS.contains(&s) => Self::Servings,
            s if UNIT_SYSTEM_KEYS.contains(&s) => Self::UnitSystem,
            _ => return Err(StdKeyParseError(s.to_string())),
        };
        Ok(k)
    }
}

impl AsRef<str> for StdKey {
    fn as_ref(&self) -> &str {
        match self {
            StdKey::Title => "title",
            StdKey::Description => "description",
            StdKey::Tags => "tags",
            StdKey::Author => "author",
            StdKey::Source => "source",
            StdKey::Servings => "servings",
            StdKey::Locale => "locale",
            StdKey::UnitSystem => "unit system",
        }
    }
}

/// Errors reading a YAML frontmatter
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[error("Metadata must be a mapping of keys and values")]
    NotAMapping,
}

impl Metadata {
    /// Parses a YAML document into the metadata map
    ///
    /// An empty document is an empty map. Anything that is not a mapping is
    /// an error.
    pub fn from_yaml(text: &str) -> Result<Self, MetadataError> {
        let value: serde_yaml::Value = serde_yaml::from_str(text)?;
        match value {
            serde_yaml::Value::Null => Ok(Self::default()),
            serde_yaml::Value::Mapping(map) => Ok(Self { map }),
            _ => Err(MetadataError::NotAMapping),
        }
    }

    pub fn get(&self, index: impl MetaIndex) -> Option<&serde_yaml::Value> {
        index.index_into(&self.map)
    }

    pub fn get_mut(&mut self, index: impl MetaIndex) -> Option<&mut serde_yaml::Value> {
        index.index_into_mut(&mut self.map)
    }

    /// Inserts a `key: value` entry as strings
    ///
    /// This is how `>> key: value` lines are stored.
    pub(crate) fn insert_str(&mut self, key: &str, value: &str) {
        self.map.insert(
            serde_yaml::Value::String(key.trim().to_string()),
            serde_yaml::Value::String(value.trim().to_string()),
        );
    }

    /// Iterates over all entries except the standard keys
    pub fn map_filtered(&self) -> impl Iterator<Item = (&serde_yaml::Value, &serde_yaml::Value)> {
        self.map.iter().filter(|(key, _)| {
            if let Some(key_t) = key.as_str() {
                StdKey::from_str(key_t).is_err()
            } else {
                true
            }
        })
    }

    /// Title of the recipe
    pub fn title(&self) -> Option<&str> {
        self.get(StdKey::Title).and_then(serde_yaml::Value::as_str)
    }

    /// Description of the recipe
    pub fn description(&self) -> Option<&str> {
        self.get(StdKey::Description)
            .and_then(serde_yaml::Value::as_str)
    }

    /// List of tags
    ///
    /// The `tags` key [`as_tags`](CooklangValueExt::as_tags)
    pub fn tags(&self) -> Option<Vec<Cow<str>>> {
        self.get(StdKey::Tags).and_then(CooklangValueExt::as_tags)
    }

    /// Author, as written
    pub fn author(&self) -> Option<Cow<str>> {
        self.get(StdKey::Author)
            .and_then(CooklangValueExt::as_str_like)
    }

    /// Source, as written
    pub fn source(&self) -> Option<Cow<str>> {
        self.get(StdKey::Source)
            .and_then(CooklangValueExt::as_str_like)
    }

    /// Servings the recipe is made for
    ///
    /// From the first of the `servings`, `serves` or `yield` keys. Only the
    /// leading number is used, so `4, about` is `4`.
    pub fn servings(&self) -> Option<f64> {
        SERVINGS_KEYS
            .iter()
            .find_map(|key| self.get_ignore_case(key))
            .and_then(CooklangValueExt::as_leading_number)
    }

    /// Regional system the recipe is written for
    pub fn unit_system(&self) -> Option<System> {
        UNIT_SYSTEM_KEYS
            .iter()
            .find_map(|key| self.get_ignore_case(key))
            .and_then(serde_yaml::Value::as_str)
            .and_then(|s| s.trim().parse().ok())
    }

    /// Recipe locale
    ///
    /// See [`CooklangValueExt::as_locale`].
    pub fn locale(&self) -> Option<(&str, Option<&str>)> {
        self.get(StdKey::Locale)
            .and_then(CooklangValueExt::as_locale)
    }

    /// Multiplies the leading number of every servings entry
    ///
    /// Numbers are replaced. For text, only the leading number changes and
    /// the rest is kept, so `4, about` scaled by 2 is `8, about`. Entries
    /// without a leading number are not changed.
    pub(crate) fn scale_servings(&mut self, factor: f64) {
        for key in SERVINGS_KEYS {
            let Some(key) = self.key_ignore_case(key) else {
                continue;
            };
            let Some(value) = self.map.get_mut(&key) else {
                continue;
            };
            let new = match value {
                serde_yaml::Value::Number(n) => n.as_f64().map(|old| yaml_number(old * factor)),
                serde_yaml::Value::String(s) => {
                    replace_leading_number(s, factor).map(serde_yaml::Value::String)
                }
                _ => None,
            };
            if let Some(new) = new {
                *value = new;
            }
        }
    }

    /// Sets the unit system entry
    pub(crate) fn set_unit_system(&mut self, system: System) {
        let key = UNIT_SYSTEM_KEYS
            .iter()
            .find_map(|key| self.key_ignore_case(key))
            .unwrap_or_else(|| serde_yaml::Value::String(UNIT_SYSTEM_KEYS[0].to_string()));
        self.map
            .insert(key, serde_yaml::Value::String(system.to_string()));
    }

    /// Key of the map equal to `name` ignoring case, the exact one first
    fn key_ignore_case(&self, name: &str) -> Option<serde_yaml::Value> {
        if self.map.contains_key(name) {
            return Some(serde_yaml::Value::String(name.to_string()));
        }
        self.map
            .keys()
            .find(|k| k.as_str().is_some_and(|k| k.trim().eq_ignore_ascii_case(name)))
            .cloned()
    }

    fn get_ignore_case(&self, name: &str) -> Option<&serde_yaml::Value> {
        self.map.get(self.key_ignore_case(name)?)
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{}", n as i64)
    } else {
        to_rounded_decimal(n, crate::quantity::DEFAULT_PRECISION).to_string()
    }
}

fn yaml_number(n: f64) -> serde_yaml::Value {
    if n.fract() == 0.0 {
        serde_yaml::Value::Number((n as i64).into())
    } else {
        serde_yaml::Value::Number(to_rounded_decimal(n, crate::quantity::DEFAULT_PRECISION).into())
    }
}

static LEADING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\s*)(\d+(?:\.\d+)?)(.*)$").expect("valid regex"));

fn replace_leading_number(s: &str, factor: f64) -> Option<String> {
    let caps = LEADING_NUMBER.captures(s)?;
    let n: f64 = caps[2].parse().ok()?;
    Some(format!("{}{}{}", &caps[1], format_number(n * factor), &caps[3]))
}

pub trait MetaIndex: private::Sealed {
    fn index_into<'a>(&self, m: &'a serde_yaml::Mapping) -> Option<&'a serde_yaml::Value>;
    fn index_into_mut<'a>(
        &self,
        m: &'a mut serde_yaml::Mapping,
    ) -> Option<&'a mut serde_yaml::Value>;
}

mod private {
    pub trait Sealed {}
    impl Sealed for super::StdKey {}
    impl<T> Sealed for T where T: serde_yaml::mapping::Index {}
}

impl MetaIndex for StdKey {
    #[inline]
    fn index_into<'a>(&self, m: &'a serde_yaml::Mapping) -> Option<&'a serde_yaml::Value> {
        m.get(self.as_ref())
    }

    #[inline]
    fn index_into_mut<'a>(
        &self,
        m: &'a mut serde_yaml::Mapping,
    ) -> Option<&'a mut serde_yaml::Value> {
        m.get_mut(self.as_ref())
    }
}

impl<T> MetaIndex for T
where
    T: serde_yaml::mapping::Index,
{
    #[inline]
    fn index_into<'a>(&self, m: &'a serde_yaml::Mapping) -> Option<&'a serde_yaml::Value> {
        m.get(self)
    }

    #[inline]
    fn index_into_mut<'a>(
        &self,
        m: &'a mut serde_yaml::Mapping,
    ) -> Option<&'a mut serde_yaml::Value> {
        m.get_mut(self)
    }
}

/// This trait is implemented for [`serde_yaml::Value`] and adds more ways to
/// transform the value from YAML.
pub trait CooklangValueExt: private::Sealed {
    /// Comma (',') separated string or YAML sequence of strings
    ///
    /// Duplicates and empty entries removed.
    fn as_tags(&self) -> Option<Vec<Cow<str>>>;

    /// String separated by `sep` or YAML sequence of strings and/or numbers
    fn as_string_list<'a>(&'a self, sep: &str) -> Option<Vec<Cow<'a, str>>>;

    /// A number, or the number at the start of a string
    ///
    /// ```
    /// # use cooklang_parser::metadata::CooklangValueExt;
    /// let v: serde_yaml::Value = serde_yaml::from_str("4, about").unwrap();
    /// assert_eq!(v.as_leading_number(), Some(4.0));
    /// ```
    fn as_leading_number(&self) -> Option<f64>;

    /// Locale string
    ///
    /// ISO 639 language code, then optionally an underscore and the ISO 3166
    /// alpha2 "country code" for dialect variants.
    ///
    /// **This only check that the value is a string and has the correct
    /// structure**.
    fn as_locale(&self) -> Option<(&str, Option<&str>)>;

    /// String or number as a string
    fn as_str_like(&self) -> Option<Cow<str>>;
}

impl CooklangValueExt for serde_yaml::Value {
    fn as_tags(&self) -> Option<Vec<Cow<str>>> {
        let entries: Vec<Cow<str>> = if let Some(s) = self.as_str() {
            s.split(',').map(|e| e.trim().into()).collect()
        } else if let Some(seq) = self.as_sequence() {
            seq.iter()
                .map(|val| val.as_str_like())
                .collect::<Option<Vec<_>>>()?
        } else {
            return None;
        };
        let mut tags = Vec::with_capacity(entries.len());
        for tag in entries {
            if tag.is_empty() || tags.contains(&tag) {
                continue;
            }
            tags.push(tag);
        }
        Some(tags)
    }

    fn as_string_list<'a>(&'a self, sep: &str) -> Option<Vec<Cow<'a, str>>> {
        if let Some(s) = self.as_str() {
            Some(s.split(sep).map(|e| e.trim().into()).collect())
        } else if let Some(seq) = self.as_sequence() {
            seq.iter().map(|e| e.as_str_like()).collect()
        } else {
            None
        }
    }

    fn as_leading_number(&self) -> Option<f64> {
        match self {
            serde_yaml::Value::Number(n) => n.as_f64(),
            serde_yaml::Value::String(s) => {
                let caps = LEADING_NUMBER.captures(s)?;
                caps[2].parse().ok()
            }
            _ => None,
        }
    }

    fn as_locale(&self) -> Option<(&str, Option<&str>)> {
        fn validate(s: &str) -> bool {
            s.len() == 2 && s.chars().all(|c| c.is_ascii_alphabetic())
        }

        let s = self.as_str()?;
        if let Some((lang, dial)) = s.split_once('_') {
            (validate(lang) && validate(dial)).then_some((lang, Some(dial)))
        } else {
            validate(s).then_some((s, None))
        }
    }

    fn as_str_like(&self) -> Option<Cow<str>> {
        if let Some(s) = self.as_str() {
            Some(Cow::from(s))
        } else if let serde_yaml::Value::Number(num) = self {
            Some(Cow::from(num.to_string()))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn meta(yaml: &str) -> Metadata {
        Metadata::from_yaml(yaml).unwrap()
    }

    #[test]
    fn special_keys() {
        let t = |k: StdKey| assert_eq!(k, StdKey::from_str(k.as_ref()).unwrap());
        t(StdKey::Title);
        t(StdKey::Description);
        t(StdKey::Tags);
        t(StdKey::Author);
        t(StdKey::Source);
        t(StdKey::Servings);
        t(StdKey::Locale);
        t(StdKey::UnitSystem);
        assert_eq!(StdKey::from_str("yield").unwrap(), StdKey::Servings);
    }

    #[test]
    fn frontmatter_documents() {
        assert_eq!(Metadata::from_yaml("").unwrap(), Metadata::default());
        assert!(matches!(
            Metadata::from_yaml("- a\n- b"),
            Err(MetadataError::NotAMapping)
        ));
        assert!(matches!(
            Metadata::from_yaml("a: [b"),
            Err(MetadataError::Yaml(_))
        ));
    }

    #[test_case("servings: 4" => Some(4.0); "number")]
    #[test_case("servings: 4, about" => Some(4.0); "suffix")]
    #[test_case("serves: 2.5 people" => Some(2.5); "serves")]
    #[test_case("yield: 12 cookies" => Some(12.0); "yield")]
    #[test_case("servings: a few" => None; "no number")]
    #[test_case("title: x" => None; "missing")]
    fn servings(yaml: &str) -> Option<f64> {
        meta(yaml).servings()
    }

    #[test]
    fn tags() {
        let m = meta("tags: [a, b, a]\nother: 'x, y, , x'");
        assert_eq!(m.tags().unwrap(), vec!["a", "b"]);
        assert_eq!(m.get("other").unwrap().as_tags().unwrap(), vec!["x", "y"]);
    }

    #[test]
    fn locale() {
        assert_eq!(meta("locale: en_GB").locale(), Some(("en", Some("GB"))));
        assert_eq!(meta("locale: es").locale(), Some(("es", None)));
        assert_eq!(meta("locale: english").locale(), None);
    }

    #[test]
    fn unit_system() {
        assert_eq!(meta("unit system: metric").unit_system(), Some(System::Metric));
        assert_eq!(meta("units: UK").unit_system(), Some(System::Uk));
        assert_eq!(meta("units: lots").unit_system(), None);
    }

    #[test]
    fn scale_servings_keeps_suffix() {
        let mut m = meta("servings: 4, about\nyield: 12 cookies\nserves: 2");
        m.scale_servings(1.5);
        assert_eq!(m.get("servings").unwrap().as_str(), Some("6, about"));
        assert_eq!(m.get("yield").unwrap().as_str(), Some("18 cookies"));
        assert_eq!(m.get("serves").unwrap().as_u64(), Some(3));

        let mut m = meta("servings: 3 people");
        m.scale_servings(0.5);
        assert_eq!(m.get("servings").unwrap().as_str(), Some("1.5 people"));

        let mut m = meta("servings: some");
        m.scale_servings(2.0);
        assert_eq!(m.get("servings").unwrap().as_str(), Some("some"));
    }

    #[test]
    fn std_keys_ignore_case() {
        let mut m = Metadata::default();
        m.insert_str("Servings", "4, about");
        m.insert_str("Unit System", "metric");
        assert_eq!(m.servings(), Some(4.0));
        assert_eq!(m.unit_system(), Some(System::Metric));

        m.scale_servings(2.0);
        assert_eq!(m.get("Servings").unwrap().as_str(), Some("8, about"));
        m.set_unit_system(System::Us);
        assert_eq!(m.get("Unit System").unwrap().as_str(), Some("us"));
        assert!(m.get("unit system").is_none());
    }

    #[test]
    fn old_style_entries_are_strings() {
        let mut m = Metadata::default();
        m.insert_str(" servings ", " 2 ");
        assert_eq!(m.get("servings").unwrap().as_str(), Some("2"));
        assert_eq!(m.servings(), Some(2.0));
    }
}
