//! Conversions from the site model into template [`Value`]s.

use crate::config::{MenuEntry, SiteConfig};
use crate::content::ContentItem;
use crate::markdown;
use crate::taxonomy::Term;
use gtmpl_value::Value;
use std::collections::HashMap;

const DISPLAY_DATE: &str = "%Y-%m-%d";

/// Builds an object value from key/value pairs.
pub fn object<I>(fields: I) -> Value
where
    I: IntoIterator<Item = (&'static str, Value)>,
{
    Value::Object(
        fields
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v))
            .collect::<HashMap<String, Value>>(),
    )
}

pub fn string<S: Into<String>>(s: S) -> Value {
    Value::String(s.into())
}

pub fn optional<T, F>(opt: Option<T>, f: F) -> Value
where
    F: FnOnce(T) -> Value,
{
    opt.map(f).unwrap_or(Value::Nil)
}

pub fn number(n: usize) -> Value {
    Value::from(n as i64)
}

/// The `site` value every template receives.
pub fn site(config: &SiteConfig) -> Value {
    object(vec![
        ("title", string(config.title.as_str())),
        ("base_url", string(config.base_url.as_str())),
        ("language_code", optional(config.language_code.as_deref(), string)),
        (
            "menu",
            Value::Array(config.menu.iter().map(menu_entry).collect()),
        ),
        ("params", table(&config.params)),
    ])
}

fn menu_entry(entry: &MenuEntry) -> Value {
    object(vec![
        ("identifier", string(entry.identifier.as_str())),
        ("name", string(entry.name.as_str())),
        ("url", string(entry.url.as_str())),
        ("weight", Value::from(entry.weight)),
    ])
}

/// The public URL path of an item, relative to the site root.
pub fn item_path(item: &ContentItem) -> String {
    format!("{}/", item.path)
}

/// A full item value: metadata, rendered body, and rendered summary.
pub fn item(item: &ContentItem, config: &SiteConfig) -> Value {
    let mut value = summary(item, config);
    if let Value::Object(fields) = &mut value {
        fields.insert("content".to_owned(), string(markdown::to_html(&item.body)));
    }
    value
}

/// An item value for listing pages: everything but the full body.
pub fn summary(item: &ContentItem, config: &SiteConfig) -> Value {
    let fm = &item.front_matter;
    let (summary, folded) = item.summary();
    object(vec![
        ("path", string(item.path.as_str())),
        ("section", string(item.section.as_str())),
        ("url", string(config.permalink(&item_path(item)))),
        ("title", string(fm.title.as_str())),
        ("author", optional(fm.author.as_deref(), string)),
        ("description", optional(fm.description.as_deref(), string)),
        ("date", string(fm.date.format(DISPLAY_DATE))),
        ("date_iso", string(fm.date.to_rfc3339())),
        ("draft", Value::Bool(fm.draft)),
        ("tags", tags(item, config)),
        ("taxonomies", taxonomies(item, config)),
        ("summary", string(markdown::to_html(summary))),
        ("folded", Value::Bool(folded)),
        ("params", yaml_map(&fm.extra)),
    ])
}

fn tags(item: &ContentItem, config: &SiteConfig) -> Value {
    match config.taxonomies.values().any(|plural| plural == "tags") {
        true => item_terms(item, "tags", config),
        false => Value::Array(Vec::new()),
    }
}

// The item's terms for every configured taxonomy, keyed by plural.
fn taxonomies(item: &ContentItem, config: &SiteConfig) -> Value {
    Value::Object(
        config
            .taxonomies
            .values()
            .map(|plural| (plural.clone(), item_terms(item, plural, config)))
            .collect(),
    )
}

fn item_terms(item: &ContentItem, plural: &str, config: &SiteConfig) -> Value {
    let mut seen = Vec::new();
    let mut terms = Vec::new();
    for name in item.terms(plural) {
        let slug = slug::slugify(name);
        if slug.is_empty() || seen.contains(&slug) {
            continue;
        }
        terms.push(object(vec![
            ("name", string(name)),
            (
                "url",
                string(config.permalink(&format!("{}/{}/", plural, slug))),
            ),
            ("slug", string(slug.as_str())),
        ]));
        seen.push(slug);
    }
    Value::Array(terms)
}

/// A term value for the terms overview page.
pub fn term(term: &Term, plural: &str, config: &SiteConfig) -> Value {
    object(vec![
        ("name", string(term.name.as_str())),
        ("slug", string(term.slug.as_str())),
        (
            "url",
            string(config.permalink(&format!("{}/{}/", plural, term.slug))),
        ),
        ("count", number(term.items.len())),
    ])
}

fn table(table: &toml::Table) -> Value {
    Value::Object(
        table
            .iter()
            .map(|(k, v)| (k.clone(), toml_value(v)))
            .collect(),
    )
}

fn toml_value(value: &toml::Value) -> Value {
    match value {
        toml::Value::String(s) => string(s.as_str()),
        toml::Value::Integer(i) => Value::from(*i),
        toml::Value::Float(f) => Value::from(*f),
        toml::Value::Boolean(b) => Value::Bool(*b),
        toml::Value::Datetime(dt) => string(dt.to_string()),
        toml::Value::Array(values) => Value::Array(values.iter().map(toml_value).collect()),
        toml::Value::Table(t) => table(t),
    }
}

fn yaml_map(map: &std::collections::BTreeMap<String, serde_yaml::Value>) -> Value {
    Value::Object(
        map.iter()
            .map(|(k, v)| (k.clone(), yaml_value(v)))
            .collect(),
    )
}

fn yaml_value(value: &serde_yaml::Value) -> Value {
    use serde_yaml::Value as Yaml;
    match value {
        Yaml::Null => Value::Nil,
        Yaml::Bool(b) => Value::Bool(*b),
        Yaml::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Value::from(i),
            (None, Some(f)) => Value::from(f),
            (None, None) => string(n.to_string()),
        },
        Yaml::String(s) => string(s.as_str()),
        Yaml::Sequence(values) => Value::Array(values.iter().map(yaml_value).collect()),
        Yaml::Mapping(m) => Value::Object(
            m.iter()
                .filter_map(|(k, v)| Some((k.as_str()?.to_owned(), yaml_value(v))))
                .collect(),
        ),
    }
}
