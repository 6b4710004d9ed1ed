//! Collection operations shared by the store backends
//!
//! Each backend owns a `Vec<Document>` per collection and delegates the
//! actual matching, sorting and mutation here.

use super::{Document, Filter, FindOptions, SortOrder, UpdateOutcome, ID_FIELD};
use serde_json::Value;
use std::cmp::Ordering;
use uuid::Uuid;

/// Whether `doc` satisfies every equality condition in `filter`
pub(super) fn matches(doc: &Document, filter: &Filter) -> bool {
    filter
        .iter()
        .all(|(field, expected)| doc.get(field) == Some(expected))
}

/// Order two optional JSON values: missing first, then by type-aware comparison
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a, b) {
            (Value::Number(x), Value::Number(y)) => {
                let x = x.as_f64().unwrap_or(0.0);
                let y = y.as_f64().unwrap_or(0.0);
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
            (Value::String(x), Value::String(y)) => x.cmp(y),
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            _ => rank(a).cmp(&rank(b)),
        },
    }
}

fn rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn project(doc: &Document, fields: &[String]) -> Document {
    doc.iter()
        .filter(|(k, _)| fields.iter().any(|f| f == *k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

pub(super) fn find(docs: &[Document], filter: &Filter, options: &FindOptions) -> Vec<Document> {
    let mut found: Vec<&Document> = docs.iter().filter(|d| matches(d, filter)).collect();

    if let Some((field, order)) = &options.sort {
        // stable: ties keep insertion order
        found.sort_by(|a, b| {
            let ord = compare_values(a.get(field), b.get(field));
            match order {
                SortOrder::Ascending => ord,
                SortOrder::Descending => ord.reverse(),
            }
        });
    }

    let limit = options.limit.unwrap_or(usize::MAX);
    found
        .into_iter()
        .take(limit)
        .map(|d| match &options.projection {
            Some(fields) => project(d, fields),
            None => d.clone(),
        })
        .collect()
}

pub(super) fn count(docs: &[Document], filter: &Filter) -> u64 {
    docs.iter().filter(|d| matches(d, filter)).count() as u64
}

pub(super) fn insert(docs: &mut Vec<Document>, mut document: Document) {
    if !document.contains_key(ID_FIELD) {
        document.insert(
            ID_FIELD.to_string(),
            Value::String(Uuid::new_v4().to_string()),
        );
    }
    docs.push(document);
}

/// Apply `$set` fields, returning whether anything changed
fn apply_set(doc: &mut Document, set: &Document) -> bool {
    let mut changed = false;
    for (field, value) in set {
        if doc.get(field) != Some(value) {
            doc.insert(field.clone(), value.clone());
            changed = true;
        }
    }
    changed
}

pub(super) fn update_one(
    docs: &mut Vec<Document>,
    filter: &Filter,
    set: &Document,
    upsert: bool,
) -> UpdateOutcome {
    if let Some(doc) = docs.iter_mut().find(|d| matches(d, filter)) {
        let modified = apply_set(doc, set);
        return UpdateOutcome {
            matched: 1,
            modified: u64::from(modified),
            upserted: false,
        };
    }

    if !upsert {
        return UpdateOutcome::default();
    }

    let mut document = filter.clone();
    apply_set(&mut document, set);
    insert(docs, document);
    UpdateOutcome {
        matched: 0,
        modified: 0,
        upserted: true,
    }
}

pub(super) fn update_many(docs: &mut [Document], filter: &Filter, set: &Document) -> u64 {
    let mut matched = 0;
    for doc in docs.iter_mut().filter(|d| matches(d, filter)) {
        apply_set(doc, set);
        matched += 1;
    }
    matched
}

pub(super) fn delete_one(docs: &mut Vec<Document>, filter: &Filter) -> u64 {
    match docs.iter().position(|d| matches(d, filter)) {
        Some(idx) => {
            docs.remove(idx);
            1
        }
        None => 0,
    }
}

pub(super) fn delete_many(docs: &mut Vec<Document>, filter: &Filter) -> u64 {
    let before = docs.len();
    docs.retain(|d| !matches(d, filter));
    (before - docs.len()) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::filter;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn sample() -> Vec<Document> {
        vec![
            doc(json!({"name": "b", "size": 20, "at": "2024-01-02T00:00:00.000000Z"})),
            doc(json!({"name": "a", "size": 5, "at": "2024-01-01T00:00:00.000000Z"})),
            doc(json!({"name": "c", "size": 100})),
        ]
    }

    #[test]
    fn empty_filter_matches_everything() {
        let docs = sample();
        assert_eq!(count(&docs, &Filter::new()), 3);
    }

    #[test]
    fn sort_ascending_puts_missing_first() {
        let docs = sample();
        let found = find(&docs, &Filter::new(), &FindOptions::sort_asc("at"));
        let names: Vec<_> = found.iter().map(|d| d["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[test]
    fn sort_numbers_numerically_with_limit() {
        let docs = sample();
        let found = find(&docs, &Filter::new(), &FindOptions::sort_desc("size").limit(2));
        let sizes: Vec<_> = found.iter().map(|d| d["size"].as_u64().unwrap()).collect();
        assert_eq!(sizes, vec![100, 20]);
    }

    #[test]
    fn projection_keeps_only_requested_fields() {
        let docs = sample();
        let found = find(
            &docs,
            &filter([("name", "a")]),
            &FindOptions::default().project(["size"]),
        );
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].len(), 1);
        assert_eq!(found[0]["size"], 5);
    }

    #[test]
    fn insert_assigns_id() {
        let mut docs = Vec::new();
        insert(&mut docs, doc(json!({"name": "x"})));
        assert!(docs[0][ID_FIELD].is_string());
    }

    #[test]
    fn upsert_inserts_filter_and_set_fields() {
        let mut docs = Vec::new();
        let outcome = update_one(
            &mut docs,
            &filter([("uri", "file://h/a")]),
            &doc(json!({"type": "file"})),
            true,
        );
        assert!(outcome.upserted);
        assert_eq!(docs[0]["uri"], "file://h/a");
        assert_eq!(docs[0]["type"], "file");

        let again = update_one(
            &mut docs,
            &filter([("uri", "file://h/a")]),
            &doc(json!({"type": "file"})),
            true,
        );
        assert_eq!(again.matched, 1);
        assert_eq!(again.modified, 0);
        assert_eq!(docs.len(), 1);
    }

    #[test]
    fn update_without_upsert_is_noop_on_miss() {
        let mut docs = sample();
        let outcome = update_one(&mut docs, &filter([("name", "zzz")]), &Document::new(), false);
        assert_eq!(outcome, UpdateOutcome::default());
        assert_eq!(docs.len(), 3);
    }

    #[test]
    fn delete_one_and_many() {
        let mut docs = sample();
        docs.push(doc(json!({"name": "a"})));
        assert_eq!(delete_one(&mut docs, &filter([("name", "a")])), 1);
        assert_eq!(count(&docs, &filter([("name", "a")])), 1);
        assert_eq!(delete_many(&mut docs, &Filter::new()), 3);
        assert!(docs.is_empty());
    }

    #[test]
    fn update_many_counts_matches() {
        let mut docs = sample();
        let n = update_many(&mut docs, &Filter::new(), &doc(json!({"seen": true})));
        assert_eq!(n, 3);
        assert!(docs.iter().all(|d| d["seen"] == true));
    }
}
