//! Mapping of provider-specific items onto [`Record`].
//!
//! Both functions are total: missing or oddly shaped fields become `None`.

use crate::crossref::CrossrefItem;
use crate::record::{Record, Source};
use crate::sciencedirect::ScienceDirectEntry;
use serde_json::Value;

/// Map a ScienceDirect search entry.
pub fn entry_to_record(entry: &ScienceDirectEntry) -> Record {
    let url = link_by_rel(entry, "scidir").or_else(|| link_by_rel(entry, "self"));

    Record {
        source: Source::Sciencedirect,
        title: clean(entry.title.as_deref()),
        doi: clean(entry.doi.as_deref()),
        pii: clean(entry.pii.as_deref()),
        authors: entry.authors.as_ref().and_then(sciencedirect_authors),
        container_title: clean(entry.publication_name.as_deref()),
        published: clean(entry.cover_date.as_deref()),
        openaccess: entry.openaccess.as_ref().and_then(flag),
        url,
        abstract_text: None,
    }
}

/// Map a Crossref work, tagging it with the publisher-level `source`.
pub fn item_to_record(item: &CrossrefItem, source: Source) -> Record {
    let authors = item
        .author
        .iter()
        .filter_map(|a| {
            let full = format!(
                "{} {}",
                a.given.as_deref().unwrap_or_default(),
                a.family.as_deref().unwrap_or_default()
            );
            clean(Some(full.as_str())).or_else(|| clean(a.name.as_deref()))
        })
        .collect::<Vec<_>>()
        .join("; ");

    // Year only
    let published = item
        .issued
        .as_ref()
        .and_then(|d| d.date_parts.first())
        .and_then(|parts| parts.first().copied().flatten())
        .map(|year| year.to_string());

    let url = item
        .link
        .iter()
        .find(|l| l.intended_application.as_deref() == Some("text-mining"))
        .or_else(|| item.link.first())
        .and_then(|l| clean(l.url.as_deref()));

    Record {
        source,
        title: clean(item.title.first().map(String::as_str)),
        doi: clean(item.doi.as_deref()),
        pii: None,
        authors: clean(Some(authors.as_str())),
        container_title: clean(item.container_title.first().map(String::as_str)),
        published,
        openaccess: None,
        url,
        abstract_text: clean(item.abstract_text.as_deref()),
    }
}

fn clean(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn link_by_rel(entry: &ScienceDirectEntry, rel: &str) -> Option<String> {
    entry
        .link
        .iter()
        .find(|l| l.rel.as_deref() == Some(rel))
        .and_then(|l| clean(l.href.as_deref()))
}

/// `authors` is `{"author": [..]}` or `{"author": {..}}`; each has `authname`.
fn sciencedirect_authors(authors: &Value) -> Option<String> {
    let names: Vec<&str> = match authors.get("author") {
        Some(Value::Array(list)) => list.iter().filter_map(authname).collect(),
        Some(single @ Value::Object(_)) => authname(single).into_iter().collect(),
        _ => Vec::new(),
    };
    clean(Some(names.join("; ").as_str()))
}

fn authname(author: &Value) -> Option<&str> {
    author
        .get("authname")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|n| !n.is_empty())
}

fn flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sd_entry(value: Value) -> ScienceDirectEntry {
        serde_json::from_value(value).unwrap()
    }

    fn cr_item(value: Value) -> CrossrefItem {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_entry_to_record_full() {
        let entry = sd_entry(json!({
            "dc:title": "Graph Neural Networks",
            "prism:doi": "10.1016/j.neunet.2024.01.001",
            "pii": "S0893608024000011",
            "authors": { "author": [
                { "$": "1", "authname": "Ada Lovelace" },
                { "$": "2", "authname": "Alan Turing" }
            ] },
            "prism:publicationName": "Neural Networks",
            "prism:coverDate": "2024-03-01",
            "openaccess": "true",
            "link": [
                { "@ref": "self", "@href": "https://api.elsevier.com/content/article/pii/S0893608024000011" },
                { "@ref": "scidir", "@href": "https://www.sciencedirect.com/science/article/pii/S0893608024000011" }
            ]
        }));

        let r = entry_to_record(&entry);
        assert_eq!(r.source, Source::Sciencedirect);
        assert_eq!(r.title.as_deref(), Some("Graph Neural Networks"));
        assert_eq!(r.doi.as_deref(), Some("10.1016/j.neunet.2024.01.001"));
        assert_eq!(r.pii.as_deref(), Some("S0893608024000011"));
        assert_eq!(r.authors.as_deref(), Some("Ada Lovelace; Alan Turing"));
        assert_eq!(r.container_title.as_deref(), Some("Neural Networks"));
        assert_eq!(r.published.as_deref(), Some("2024-03-01"));
        assert_eq!(r.openaccess, Some(true));
        assert_eq!(
            r.url.as_deref(),
            Some("https://www.sciencedirect.com/science/article/pii/S0893608024000011")
        );
        assert_eq!(r.abstract_text, None);
    }

    #[test]
    fn test_entry_to_record_sparse() {
        let entry = sd_entry(json!({
            "authors": { "author": { "authname": "Solo Author" } },
            "openaccess": false,
            "link": [{ "@ref": "self", "@href": "https://api.elsevier.com/self" }]
        }));
        let r = entry_to_record(&entry);
        assert_eq!(r.authors.as_deref(), Some("Solo Author"));
        assert_eq!(r.openaccess, Some(false));
        assert_eq!(r.url.as_deref(), Some("https://api.elsevier.com/self"));
        assert_eq!(r.title, None);

        let empty = entry_to_record(&ScienceDirectEntry::default());
        assert_eq!(empty, Record::new(Source::Sciencedirect));

        let odd = sd_entry(json!({ "authors": "n/a", "openaccess": "maybe" }));
        let r = entry_to_record(&odd);
        assert_eq!(r.authors, None);
        assert_eq!(r.openaccess, None);
    }

    #[test]
    fn test_item_to_record_full() {
        let item = cr_item(json!({
            "DOI": "10.1177/0001",
            "title": ["Generative AI in Classrooms", "Subtitle"],
            "author": [
                { "given": "Grace", "family": "Hopper" },
                { "family": "Knuth" },
                { "name": "AI Consortium" }
            ],
            "container-title": ["Journal of Ed Tech"],
            "issued": { "date-parts": [[2023, 5, 2]] },
            "abstract": "<jats:p>Abstract</jats:p>",
            "link": [
                { "URL": "https://example.org/vor", "intended-application": "similarity-checking" },
                { "URL": "https://example.org/tdm", "intended-application": "text-mining" }
            ]
        }));

        let r = item_to_record(&item, Source::Sage);
        assert_eq!(r.source, Source::Sage);
        assert_eq!(r.title.as_deref(), Some("Generative AI in Classrooms"));
        assert_eq!(r.doi.as_deref(), Some("10.1177/0001"));
        assert_eq!(r.authors.as_deref(), Some("Grace Hopper; Knuth; AI Consortium"));
        assert_eq!(r.container_title.as_deref(), Some("Journal of Ed Tech"));
        assert_eq!(r.published.as_deref(), Some("2023"));
        assert_eq!(r.abstract_text.as_deref(), Some("<jats:p>Abstract</jats:p>"));
        assert_eq!(r.url.as_deref(), Some("https://example.org/tdm"));
        assert_eq!(r.pii, None);
        assert_eq!(r.openaccess, None);
    }

    #[test]
    fn test_item_to_record_fallbacks() {
        let item = cr_item(json!({
            "issued": { "date-parts": [[null]] },
            "link": [{ "URL": "https://example.org/first" }, { "URL": "https://example.org/second" }]
        }));
        let r = item_to_record(&item, Source::Acm);
        assert_eq!(r.url.as_deref(), Some("https://example.org/first"));
        assert_eq!(r.published, None);
        assert_eq!(r.authors, None);
        assert_eq!(r.title, None);

        let empty = item_to_record(&CrossrefItem::default(), Source::Acm);
        assert_eq!(empty, Record::new(Source::Acm));
    }
}
