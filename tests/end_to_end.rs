use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use blockdex::{
    IndexBuilder, IndexSettings, MergeStrategy, QueryRunner, SearchIndex, SearchSettings,
};

struct Fixture {
    _tmp: TempDir,
    root: PathBuf,
    dictionary: PathBuf,
    postings: PathBuf,
}

fn write_docs(dir: &Path, docs: &[(u32, &str)]) {
    fs::create_dir_all(dir).unwrap();
    for (id, text) in docs {
        fs::write(dir.join(id.to_string()), text).unwrap();
    }
}

fn build_fixture(docs: &[(u32, &str)], settings: IndexSettings) -> Fixture {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();
    let input = root.join("docs");
    write_docs(&input, docs);

    let dictionary = root.join("dictionary.txt");
    let postings = root.join("postings.txt");
    IndexBuilder::new(settings)
        .unwrap()
        .build(&input, &dictionary, &postings)
        .unwrap();

    Fixture {
        _tmp: tmp,
        root,
        dictionary,
        postings,
    }
}

fn run_queries(fixture: &Fixture, queries: &str, settings: SearchSettings) -> String {
    let queries_path = fixture.root.join("queries.txt");
    let results_path = fixture.root.join("results.txt");
    fs::write(&queries_path, queries).unwrap();

    let index = SearchIndex::open(&fixture.dictionary, &fixture.postings).unwrap();
    QueryRunner::new(&index, settings)
        .unwrap()
        .run(&queries_path, &results_path)
        .unwrap();
    fs::read_to_string(results_path).unwrap()
}

fn small_corpus() -> Vec<(u32, &'static str)> {
    vec![(1, "cats dogs"), (2, "cats"), (3, "dogs birds")]
}

#[test]
fn boolean_queries_over_built_index() {
    let fixture = build_fixture(&small_corpus(), IndexSettings::default());

    let results = run_queries(
        &fixture,
        "cats AND dogs\ncats OR birds\nNOT cats\n",
        SearchSettings::default(),
    );
    let blocks: Vec<&str> = results.split('\n').collect();

    assert_eq!(blocks[0], "1");
    assert_eq!(blocks[1..4], ["1", "2", "3"]);
    assert_eq!(blocks[4], "3");
}

#[test]
fn blank_and_failing_lines_keep_alignment() {
    let fixture = build_fixture(&small_corpus(), IndexSettings::default());

    let results = run_queries(
        &fixture,
        "cats\n\n(cats AND\ncats AND NOT dogs\n",
        SearchSettings::default(),
    );

    // "cats" -> 1 2, blank -> empty, parse error -> empty, then 2
    assert_eq!(results, "1\n2\n\n\n2");
}

#[test]
fn not_covers_documents_without_terms() {
    // 2 has only numbers and 3 is empty; neither yields an index term
    let docs = [(1, "cats"), (2, "2024 42"), (3, ""), (4, "dogs")];
    let fixture = build_fixture(&docs, IndexSettings::default().with_block_size(2));

    let index = SearchIndex::open(&fixture.dictionary, &fixture.postings).unwrap();
    assert_eq!(index.universe(), &[1, 2, 3, 4]);

    let runner = QueryRunner::new(&index, SearchSettings::default()).unwrap();
    assert_eq!(runner.evaluate(1, "NOT cats").unwrap(), vec![2, 3, 4]);
    assert_eq!(runner.evaluate(2, "cats OR NOT cats").unwrap(), vec![1, 2, 3, 4]);
    assert_eq!(runner.evaluate(3, "NOT zebras").unwrap(), vec![1, 2, 3, 4]);
    assert_eq!(runner.evaluate(4, "dogs AND NOT cats").unwrap(), vec![4]);
}

#[test]
fn hyphenated_query_word_is_rejected() {
    let fixture = build_fixture(&[(1, "e-mail inbox"), (2, "mail")], IndexSettings::default());

    let results = run_queries(&fixture, "e-mail
e AND mail
", SearchSettings::default());
    assert_eq!(results, "\n1");
}

#[test]
fn missing_term_matches_nothing() {
    let fixture = build_fixture(&small_corpus(), IndexSettings::default());

    let results = run_queries(
        &fixture,
        "zebras\nzebras OR birds\nNOT zebras",
        SearchSettings::default(),
    );
    assert_eq!(results, "\n3\n1\n2\n3");
}

#[test]
fn block_size_does_not_change_output() {
    let docs = vec![
        (1, "The quick brown fox"),
        (2, "jumps over the lazy dog"),
        (3, "quick thinking"),
        (5, "A lazy afternoon, a brown dog."),
        (8, "a fox and two dogs"),
        (13, "nothing to see"),
        (21, "the fox, the dog, and the quick cat"),
    ];

    let whole = build_fixture(&docs, IndexSettings::default());
    let split = build_fixture(
        &docs,
        IndexSettings::default()
            .with_block_size(2)
            .with_workers(2)
            .with_merge_strategy(MergeStrategy::SmallestFirst),
    );

    assert_eq!(
        fs::read_to_string(&whole.dictionary).unwrap(),
        fs::read_to_string(&split.dictionary).unwrap()
    );
    assert_eq!(
        fs::read_to_string(&whole.postings).unwrap(),
        fs::read_to_string(&split.postings).unwrap()
    );

    let results = run_queries(&split, "fox AND dog", SearchSettings::default());
    assert_eq!(results, "8\n21");
}

#[test]
fn parallel_query_workers_match_sequential() {
    let fixture = build_fixture(&small_corpus(), IndexSettings::default());
    let queries = "cats\ndogs\n\nbirds OR cats\nNOT (cats OR birds)\ncats dogs\nNOT birds AND cats\n";

    let sequential = run_queries(&fixture, queries, SearchSettings::default());
    let parallel = run_queries(&fixture, queries, SearchSettings::default().with_workers(4));

    assert_eq!(sequential, parallel);
}

#[test]
fn search_rejects_mismatched_files() {
    let tmp = TempDir::new().unwrap();
    let dictionary = tmp.path().join("dictionary.txt");
    let postings = tmp.path().join("postings.txt");
    fs::write(&dictionary, "cat 0\ndog 1\n").unwrap();
    fs::write(&postings, "1 2\n1 2\n").unwrap();

    assert!(SearchIndex::open(&dictionary, &postings).is_err());
}
