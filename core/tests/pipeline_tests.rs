use searcher_core::indexer::DocumentIndexer;
use searcher_core::store::{open_stores, IndexStore, MemoryIndexStore};
use searcher_core::tokenizer::Tokenizer;
use searcher_core::{DocId, Document, QueryOptions, Searcher, SearcherConfig, TermWeight};
use std::fs;
use tempfile::{tempdir, TempDir};

fn config_for(datastore: &str, dir: &TempDir) -> SearcherConfig {
    let mut config = SearcherConfig { datastore: datastore.to_string(), ..Default::default() };
    config.sled.path = dir.path().join("searcher.sled");
    config.segment.path = dir.path().join("segment");
    config.sled.index_batch_size = 4;
    config.segment.index_batch_size = 4;
    config.memory.index_batch_size = 4;
    config
}

fn each_backend(check: impl Fn(Searcher)) {
    for datastore in ["sled", "segment", "memory"] {
        let dir = tempdir().unwrap();
        let mut searcher = Searcher::open(config_for(datastore, &dir)).unwrap();
        searcher.init(false).unwrap();
        check(searcher);
    }
}

fn ids(searcher: &Searcher, query: &str, limit: usize) -> Vec<DocId> {
    let options = QueryOptions { limit: Some(limit), ..Default::default() };
    searcher.query(query, &options).unwrap().document_ids
}

#[test]
fn indexed_words_are_found_and_unknown_words_are_not() {
    each_backend(|mut searcher| {
        let doc = searcher.register_documents(["alpha beta alpha"]).unwrap()[0];
        searcher.index().unwrap();
        assert_eq!(ids(&searcher, "alpha", 10), vec![doc]);
        assert_eq!(ids(&searcher, "ALPHA,", 10), vec![doc]);
        assert!(ids(&searcher, "gamma", 10).is_empty());
        assert!(ids(&searcher, "", 10).is_empty());
    });
}

#[test]
fn best_documents_come_first_and_limit_truncates() {
    each_backend(|mut searcher| {
        // "needle" makes up 1/1, 1/2, 1/3, 1/4 and 1/5 of these documents
        let docs = searcher
            .register_documents([
                "needle c d e",
                "needle",
                "needle a b",
                "needle x",
                "needle f g h i",
            ])
            .unwrap();
        searcher.index().unwrap();

        assert_eq!(ids(&searcher, "needle", 10), vec![docs[1], docs[3], docs[2], docs[0], docs[4]]);
        assert_eq!(ids(&searcher, "needle", 2), vec![docs[1], docs[3]]);
    });
}

#[test]
fn scores_aggregate_over_query_terms() {
    each_backend(|mut searcher| {
        // d1: cat = 1/2; d2: cat = 3/10, dog = 4/10
        let d1 = "cat mouse";
        let d2 = "cat cat cat dog dog dog dog bird fish eel";
        let docs = searcher.register_documents([d1, d2]).unwrap();
        searcher.index().unwrap();
        assert_eq!(ids(&searcher, "cat", 10), vec![docs[0], docs[1]]);
        assert_eq!(ids(&searcher, "cat dog", 10), vec![docs[1], docs[0]]);
    });
}

#[test]
fn previews_follow_ranking() {
    each_backend(|mut searcher| {
        searcher.register_documents(["Plot one\nzebra zebra", "Plot two\nzebra horse horse"]).unwrap();
        searcher.index().unwrap();
        let options = QueryOptions { limit: None, preview: true, measure: true };
        let response = searcher.query("zebra", &options).unwrap();
        assert_eq!(response.previews, vec!["Plot one".to_string(), "Plot two".to_string()]);
        assert!(response.took.is_some());
    });
}

#[test]
fn registering_a_directory_tree() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("docs");
    fs::create_dir_all(root.join("nested")).unwrap();
    fs::write(root.join("a.txt"), "first file about rust").unwrap();
    fs::write(root.join("nested/b.txt"), "second file about sled").unwrap();
    fs::write(root.join("nested/c.txt"), "").unwrap();

    let mut searcher = Searcher::open(config_for("segment", &dir)).unwrap();
    searcher.init(true).unwrap();
    assert_eq!(searcher.register_path(&root).unwrap(), 3);
    let stats = searcher.index().unwrap();
    assert_eq!(stats.documents, 3);
    assert_eq!(stats.empty_documents, 1);

    let hits = ids(&searcher, "sled", 10);
    assert_eq!(hits.len(), 1);
    assert_eq!(searcher.show(&hits, false).unwrap(), vec!["second file about sled".to_string()]);
}

#[test]
fn sled_index_survives_reopen_after_flush() {
    let dir = tempdir().unwrap();
    let config = config_for("sled", &dir);
    let doc = {
        let mut searcher = Searcher::open(config.clone()).unwrap();
        let doc = searcher.register_documents(["durable words here"]).unwrap()[0];
        searcher.index().unwrap();
        doc
    };
    let searcher = Searcher::open(config).unwrap();
    assert_eq!(ids(&searcher, "durable", 10), vec![doc]);
}

#[test]
fn weights_stay_within_unit_interval() {
    let tokenizer = Tokenizer::default();
    let doc = Document::new(1, "one two two three three three, four four four four!");
    let postings: Vec<TermWeight> = DocumentIndexer::index(&doc, &tokenizer).postings().collect();
    assert_eq!(postings.len(), 4);
    assert!(postings.iter().all(|p| p.weight > 0.0 && p.weight <= 1.0));
    let total: f32 = postings.iter().map(|p| p.weight).sum();
    assert!((total - 1.0).abs() < 1e-6);

    let single = Document::new(2, "same same SAME");
    let only: Vec<TermWeight> = DocumentIndexer::index(&single, &tokenizer).postings().collect();
    assert_eq!(only.len(), 1);
    assert_eq!(only[0].weight, 1.0);
}

#[test]
fn batches_are_retrievable_after_one_flush() {
    for datastore in ["sled", "segment", "memory"] {
        let dir = tempdir().unwrap();
        let (_, mut index) = open_stores(&config_for(datastore, &dir)).unwrap();
        index.init().unwrap();
        let mut postings = (1..=10).map(|d| TermWeight { doc_id: d, term: "w".into(), weight: d as f32 / 10.0 });
        index.register(&mut postings).unwrap();
        assert_eq!(index.unsaved_len(), 2, "{datastore}");
        index.flush().unwrap();
        let hits = index.find_by_term("w", None).unwrap();
        assert_eq!(hits.len(), 10, "{datastore}");
        assert_eq!(hits[0].doc_id, 10, "{datastore}");
        assert_eq!(index.find_by_term("w", Some(3)).unwrap().len(), 3, "{datastore}");
    }
}

#[test]
fn skipping_flush_loses_the_last_partial_batch() {
    let mut index = MemoryIndexStore::new(4);
    let mut postings = (1..=10).map(|d| TermWeight { doc_id: d, term: "w".into(), weight: 0.1 });
    index.register(&mut postings).unwrap();
    let persisted = index.persisted();
    drop(index);

    let reopened = MemoryIndexStore::with_persisted(4, persisted);
    let hits = reopened.find_by_term("w", None).unwrap();
    assert_eq!(hits.len(), 8);
    assert!(hits.iter().all(|p| p.doc_id <= 8));
}

#[test]
fn reindexing_without_clearing_duplicates_postings() {
    let dir = tempdir().unwrap();
    let mut searcher = Searcher::open(config_for("memory", &dir)).unwrap();
    searcher.register_documents(["twice"]).unwrap();
    searcher.index().unwrap();
    searcher.index().unwrap();
    assert_eq!(searcher.index_store().find_by_term("twice", None).unwrap().len(), 2);
}
