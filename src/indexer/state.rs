//! The built index and its query path.

use std::collections::{HashMap, HashSet};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::documents::SourceDocument;
use super::normalize::{GRAM_LEN, normalize, unique_grams};
use crate::models::{IndexStats, SearchDocument, SearchHits};

/// Documents plus gram postings. Ordinals index into `docs`.
///
/// Built wholesale and owned by whoever queries it; nothing mutates it after
/// [`IndexState::finish`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexState {
    docs: Vec<SearchDocument>,
    postings: HashMap<String, Vec<u32>>,
}

impl IndexState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a complete document list.
    pub fn from_documents(documents: impl IntoIterator<Item = SourceDocument>) -> Self {
        let mut state = Self::new();
        for doc in documents {
            state.add(doc);
        }
        state.finish();
        state
    }

    /// Append one document and its grams to the postings.
    pub fn add(&mut self, source: SourceDocument) {
        let ordinal = self.docs.len() as u32;
        for gram in unique_grams(&normalize(&source.text)) {
            self.postings.entry(gram).or_default().push(ordinal);
        }
        self.docs.push(source.document);
    }

    /// Sort and deduplicate every postings list.
    pub fn finish(&mut self) {
        self.postings.par_iter_mut().for_each(|(_, list)| {
            list.sort_unstable();
            list.dedup();
        });
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats { doc_count: self.docs.len(), gram_count: self.postings.len() }
    }

    pub fn documents(&self) -> &[SearchDocument] {
        &self.docs
    }

    pub fn postings(&self, gram: &str) -> Option<&[u32]> {
        self.postings.get(gram).map(Vec::as_slice)
    }

    /// Owning entity ids of matching documents, grouped by kind.
    ///
    /// Queries shorter than three characters after normalization match by substring
    /// against document previews. Longer queries intersect the postings of those grams the
    /// index knows; grams absent from every document are ignored.
    /// Ids appear once per kind, in document order, at most `max_per_kind` of each.
    pub fn query(&self, text: &str, max_per_kind: usize) -> SearchHits {
        let query = normalize(text);
        let query = query.trim();
        if query.is_empty() {
            return SearchHits::default();
        }

        let ordinals = if query.chars().count() < GRAM_LEN {
            self.scan_previews(query)
        } else {
            self.intersect(query)
        };
        self.resolve(ordinals, max_per_kind)
    }

    fn scan_previews(&self, query: &str) -> Vec<u32> {
        self.docs
            .iter()
            .enumerate()
            .filter(|(_, doc)| normalize(&doc.preview_text).contains(query))
            .map(|(ordinal, _)| ordinal as u32)
            .collect()
    }

    fn intersect(&self, query: &str) -> Vec<u32> {
        let mut lists: Vec<&[u32]> = unique_grams(query)
            .iter()
            .filter_map(|gram| self.postings.get(gram).map(Vec::as_slice))
            .collect();
        lists.sort_by_key(|list| list.len());

        let Some((shortest, rest)) = lists.split_first() else {
            return Vec::new();
        };
        let mut candidates = shortest.to_vec();
        for list in rest {
            candidates.retain(|ordinal| list.binary_search(ordinal).is_ok());
            if candidates.is_empty() {
                break;
            }
        }
        candidates
    }

    fn resolve(&self, ordinals: Vec<u32>, max_per_kind: usize) -> SearchHits {
        let mut hits = SearchHits::default();
        let mut seen = HashSet::new();
        for ordinal in ordinals {
            let Some(doc) = self.docs.get(ordinal as usize) else {
                continue;
            };
            let ids = hits.ids_mut(doc.kind);
            if ids.len() >= max_per_kind || !seen.insert((doc.kind, doc.ref_id.as_str())) {
                continue;
            }
            ids.push(doc.ref_id.clone());
        }
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocKind;

    fn doc(kind: DocKind, id: &str, preview: &str, text: &str) -> SourceDocument {
        SourceDocument {
            document: SearchDocument {
                id: format!("{}:{}", kind.prefix(), id),
                kind,
                ref_id: id.to_string(),
                preview_text: preview.to_string(),
            },
            text: text.to_string(),
        }
    }

    fn hello_world() -> IndexState {
        IndexState::from_documents([
            doc(DocKind::Moment, "doc1", "first", "hello world"),
            doc(DocKind::Moment, "doc2", "second", "worldwide web"),
        ])
    }

    #[test]
    fn test_trigram_intersection() {
        let index = hello_world();
        assert_eq!(index.query("orl", 50).moments, vec!["doc1", "doc2"]);
        assert!(index.query("xyz", 50).is_empty());
        assert!(index.query("ab", 50).is_empty());
    }

    #[test]
    fn test_multi_gram_query_intersects_known_grams() {
        let index = hello_world();
        assert_eq!(index.query("hello wor", 50).moments, vec!["doc1"]);
        assert_eq!(index.query("wide", 50).moments, vec!["doc2"]);
        // "wor" and "orl" are present, "rlx" is not
        assert_eq!(index.query("worlx", 50).moments, vec!["doc1", "doc2"]);
        assert_eq!(index.query("hellzzz", 50).moments, vec!["doc1"]);
        // no gram known at all
        assert!(index.query("qqqzzz", 50).is_empty());
    }

    #[test]
    fn test_query_is_normalized() {
        let index = hello_world();
        assert_eq!(index.query("  ＷＯＲＬＤ  ", 50).total(), 2);
        assert!(index.query("   ", 50).is_empty());
    }

    #[test]
    fn test_short_query_scans_previews() {
        let index = hello_world();
        assert_eq!(index.query("se", 50).moments, vec!["doc2"]);
        assert_eq!(index.query("I", 50).moments, vec!["doc1"]);
        // body text is not scanned
        assert!(index.query("wo", 50).is_empty());
    }

    #[test]
    fn test_results_dedup_by_ref_and_cap_per_kind() {
        let mut docs = vec![
            doc(DocKind::Conversation, "c1", "t", "needle one"),
            doc(DocKind::Conversation, "c1", "t", "needle two"),
        ];
        for i in 0..5 {
            docs.push(doc(DocKind::Prompt, &format!("p{}", i), "p", "needle"));
        }
        let index = IndexState::from_documents(docs);

        let hits = index.query("needle", 3);
        assert_eq!(hits.conversations, vec!["c1"]);
        assert_eq!(hits.prompts, vec!["p0", "p1", "p2"]);
    }

    #[test]
    fn test_postings_sorted_and_unique() {
        let index = IndexState::from_documents([
            doc(DocKind::History, "a", "", "abcabc"),
            doc(DocKind::History, "b", "", "xabc"),
        ]);
        assert_eq!(index.postings("abc"), Some(&[0u32, 1][..]));
        assert_eq!(index.stats().doc_count, 2);
        assert!(index.postings("zzz").is_none());
    }
}
