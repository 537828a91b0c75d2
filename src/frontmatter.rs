//! Defines the [`FrontMatter`] record, the [`Date`] type, and the logic for
//! splitting a content file into its front-matter block and its Markdown body.
//!
//! A content file starts with a fence on its own line, either `---` (YAML) or
//! `+++` (TOML), followed by the metadata, a closing fence identical to the
//! opening one, and the body:
//!
//! ```md
//! ---
//! title: Hello, world!
//! date: 2021-04-16
//! tags: [greet]
//! ---
//! # Hello
//! ```

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

const YAML_FENCE: &str = "---";
const TOML_FENCE: &str = "+++";

/// The syntax of a front-matter block, determined by its fence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Toml,
}

impl Format {
    /// The fence line that opens and closes a block of this format.
    pub fn fence(self) -> &'static str {
        match self {
            Format::Yaml => YAML_FENCE,
            Format::Toml => TOML_FENCE,
        }
    }

    fn from_fence(line: &str) -> Option<Format> {
        match line.trim_end() {
            YAML_FENCE => Some(Format::Yaml),
            TOML_FENCE => Some(Format::Toml),
            _ => None,
        }
    }
}

/// The metadata of a content item. Recognized keys are validated eagerly;
/// anything else lands in `extra` and is written back out untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrontMatter {
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    pub date: Date,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Display order is kept; lookups ignore it.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub draft: bool,

    /// Replaces the last segment of the item's path when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl FrontMatter {
    /// Parses a front-matter block (without its fences) in the given format.
    pub fn parse(format: Format, text: &str) -> Result<FrontMatter> {
        match format {
            Format::Yaml => Ok(serde_yaml::from_str(text)?),
            Format::Toml => {
                let table: toml::Table = toml::from_str(text)?;
                let value = stringify_datetimes(toml::Value::Table(table));
                Ok(value.try_into()?)
            }
        }
    }

    /// Serializes the record as a fenced YAML block, ready to be followed by a
    /// body.
    pub fn to_yaml(&self) -> Result<String> {
        let yaml = serde_yaml::to_string(self)?;
        // serde_yaml emits a document marker, which doubles as our fence.
        let yaml = yaml.strip_prefix("---\n").unwrap_or(&yaml);
        Ok(fenced(Format::Yaml, yaml))
    }

    /// Serializes the record as a fenced TOML block. TOML has no null, so
    /// keys without a value are left out.
    pub fn to_toml(&self) -> Result<String> {
        let mut record = self.clone();
        record.extra = without_nulls(&self.extra);
        Ok(fenced(Format::Toml, &toml::to_string(&record)?))
    }
}

fn without_nulls(map: &BTreeMap<String, serde_yaml::Value>) -> BTreeMap<String, serde_yaml::Value> {
    map.iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.clone(), strip_nulls(v)))
        .collect()
}

fn strip_nulls(value: &serde_yaml::Value) -> serde_yaml::Value {
    use serde_yaml::Value as Yaml;
    match value {
        Yaml::Sequence(values) => Yaml::Sequence(
            values
                .iter()
                .filter(|v| !v.is_null())
                .map(strip_nulls)
                .collect(),
        ),
        Yaml::Mapping(m) => Yaml::Mapping(
            m.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), strip_nulls(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn fenced(format: Format, text: &str) -> String {
    let fence = format.fence();
    let newline = if text.ends_with('\n') { "" } else { "\n" };
    format!("{}\n{}{}{}\n", fence, text, newline, fence)
}

// TOML has a native datetime type that serde exposes as a private struct.
// Front-matter dates are parsed from strings, so flatten them first.
fn stringify_datetimes(value: toml::Value) -> toml::Value {
    match value {
        toml::Value::Datetime(dt) => toml::Value::String(dt.to_string()),
        toml::Value::Array(values) => {
            toml::Value::Array(values.into_iter().map(stringify_datetimes).collect())
        }
        toml::Value::Table(table) => toml::Value::Table(
            table
                .into_iter()
                .map(|(k, v)| (k, stringify_datetimes(v)))
                .collect(),
        ),
        other => other,
    }
}

/// Splits a content file into the format of its front-matter, the
/// front-matter text (fences excluded), and the body.
pub fn split(input: &str) -> Result<(Format, &str, &str)> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let (first, rest) = split_line(input);
    let format = Format::from_fence(first).ok_or(Error::MissingStartFence)?;

    let mut offset = 0;
    let mut remaining = rest;
    while !remaining.is_empty() {
        let (line, next) = split_line(remaining);
        if line.trim_end() == format.fence() {
            return Ok((format, &rest[..offset], next));
        }
        offset += remaining.len() - next.len();
        remaining = next;
    }
    Err(Error::MissingEndFence(format.fence()))
}

fn split_line(s: &str) -> (&str, &str) {
    match s.find('\n') {
        Some(i) => (&s[..i], &s[i + 1..]),
        None => (s, ""),
    }
}

/// A content timestamp. Comparison is by instant, so two dates written with
/// different offsets but naming the same moment are equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Date(DateTime<FixedOffset>);

impl Date {
    /// Formats the date for display (e.g. `2021-04-16`).
    pub fn format(&self, fmt: &str) -> String {
        self.0.format(fmt).to_string()
    }

    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }
}

impl From<DateTime<FixedOffset>> for Date {
    fn from(dt: DateTime<FixedOffset>) -> Date {
        Date(dt)
    }
}

impl std::str::FromStr for Date {
    type Err = Error;

    /// Tries RFC 3339 first, then the looser forms people actually type.
    /// Inputs without an offset are taken as UTC.
    fn from_str(s: &str) -> Result<Date> {
        let s = s.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(Date(dt));
        }
        if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f %z") {
            return Ok(Date(dt));
        }
        for fmt in &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                return Ok(Date(Utc.from_utc_datetime(&naive).into()));
            }
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| Date(Utc.from_utc_datetime(&naive).into()))
            .ok_or_else(|| Error::InvalidDate(s.to_owned()))
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for Date {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Date, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer)?
            .parse::<Date>()
            .map_err(|e| D::Error::custom(format!("{}", e)))
    }
}

impl Serialize for Date {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0.to_rfc3339())
    }
}

/// Represents the result of a front-matter operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error parsing or serializing front-matter.
#[derive(Debug, Error)]
pub enum Error {
    /// The file's first line is neither `---` nor `+++`.
    #[error("content must begin with a `---` or `+++` front-matter fence")]
    MissingStartFence,

    /// The opening fence was found but the closing one wasn't.
    #[error("missing closing `{0}` front-matter fence")]
    MissingEndFence(&'static str),

    #[error("invalid date `{0}`")]
    InvalidDate(String),

    #[error("invalid YAML front-matter")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid TOML front-matter")]
    TomlDe(#[from] toml::de::Error),

    #[error("serializing TOML front-matter")]
    TomlSer(#[from] toml::ser::Error),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_split_yaml() -> Result<()> {
        let (format, meta, body) = split("---\ntitle: A\n---\n# Body\n")?;
        assert_eq!(format, Format::Yaml);
        assert_eq!(meta, "title: A\n");
        assert_eq!(body, "# Body\n");
        Ok(())
    }

    #[test]
    fn test_split_toml_crlf() -> Result<()> {
        let (format, meta, body) = split("+++\r\ntitle = \"A\"\r\n+++\r\nbody")?;
        assert_eq!(format, Format::Toml);
        assert_eq!(meta, "title = \"A\"\r\n");
        assert_eq!(body, "body");
        Ok(())
    }

    #[test]
    fn test_split_ignores_dashes_inside_lines() -> Result<()> {
        let (_, meta, body) = split("---\ndescription: a --- b\n---\n")?;
        assert_eq!(meta, "description: a --- b\n");
        assert_eq!(body, "");
        Ok(())
    }

    #[test]
    fn test_split_missing_fences() {
        assert!(matches!(split("title: A\n"), Err(Error::MissingStartFence)));
        assert!(matches!(
            split("+++\ntitle = \"A\"\n---\n"),
            Err(Error::MissingEndFence("+++"))
        ));
    }

    #[test]
    fn test_date_formats() -> Result<()> {
        let want: Date = "2021-04-16T00:00:00Z".parse()?;
        assert_eq!("2021-04-16".parse::<Date>()?, want);
        assert_eq!("2021-04-16T00:00:00".parse::<Date>()?, want);
        assert_eq!("2021-04-16 00:00:00".parse::<Date>()?, want);
        assert_eq!("2021-04-16T02:00:00+02:00".parse::<Date>()?, want);
        assert_eq!("2021-04-16 02:00:00 +0200".parse::<Date>()?, want);
        assert!(matches!(
            "April 16th".parse::<Date>(),
            Err(Error::InvalidDate(_))
        ));
        Ok(())
    }

    #[test]
    fn test_parse_yaml_defaults() -> Result<()> {
        let fm = FrontMatter::parse(Format::Yaml, "title: Hello\ndate: 2021-04-16\n")?;
        assert_eq!(fm.title, "Hello");
        assert_eq!(fm.author, None);
        assert!(fm.tags.is_empty());
        assert!(!fm.draft);
        assert!(fm.extra.is_empty());
        Ok(())
    }

    #[test]
    fn test_parse_toml_native_date() -> Result<()> {
        let fm = FrontMatter::parse(
            Format::Toml,
            "title = \"Hello\"\ndate = 2021-04-16T09:30:00+02:00\ntags = [\"rust\"]\n",
        )?;
        assert_eq!(fm.date, "2021-04-16T07:30:00Z".parse()?);
        assert_eq!(fm.tags, vec!["rust".to_owned()]);
        Ok(())
    }

    #[test]
    fn test_parse_rejects_bad_date_and_missing_title() {
        assert!(FrontMatter::parse(Format::Yaml, "title: A\ndate: someday\n").is_err());
        assert!(FrontMatter::parse(Format::Yaml, "date: 2021-04-16\n").is_err());
    }

    #[test]
    fn test_yaml_round_trip() -> Result<()> {
        let source = "title: Hello\nauthor: Jo\ndate: 2021-04-16T09:30:00+02:00\n\
                      description: First post\ntags: [rust, blog]\ndraft: true\n\
                      slug: hi\nseries: basics\nweight: 3\n";
        let fm = FrontMatter::parse(Format::Yaml, source)?;
        assert_eq!(fm.extra.len(), 2);

        let written = fm.to_yaml()?;
        let (format, meta, body) = split(&written)?;
        assert_eq!(format, Format::Yaml);
        assert_eq!(body, "");
        assert_eq!(FrontMatter::parse(format, meta)?, fm);
        Ok(())
    }

    #[test]
    fn test_toml_round_trip() -> Result<()> {
        let fm = FrontMatter::parse(
            Format::Yaml,
            "title: Hello\ndate: 2021-04-16\ntags: [rust]\ncategories: [notes]\n",
        )?;
        let written = fm.to_toml()?;
        let (format, meta, _) = split(&written)?;
        assert_eq!(format, Format::Toml);
        assert_eq!(FrontMatter::parse(format, meta)?, fm);
        Ok(())
    }

    #[test]
    fn test_toml_leaves_out_empty_keys() -> Result<()> {
        let fm = FrontMatter::parse(
            Format::Yaml,
            "title: Hello\ndate: 2021-04-16\nseries:\nlinks: [a, ~]\nmeta:\n  note: ~\n  lang: en\n",
        )?;
        let written = fm.to_toml()?;
        let (format, meta, _) = split(&written)?;
        let back = FrontMatter::parse(format, meta)?;

        assert!(!back.extra.contains_key("series"));
        assert_eq!(back.extra["links"], serde_yaml::from_str::<serde_yaml::Value>("[a]")?);
        assert_eq!(back.extra["meta"], serde_yaml::from_str::<serde_yaml::Value>("lang: en")?);
        assert_eq!(back.title, fm.title);
        Ok(())
    }
}
