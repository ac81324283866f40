use criterion::{black_box, criterion_group, criterion_main, Criterion};
use searcher_core::indexer::DocumentIndexer;
use searcher_core::tokenizer::{tokenize, Tokenizer};
use searcher_core::Document;

const SAMPLE: &str = "A young boy, Tom, lives with his aunt Polly on the banks of the \
Mississippi. Tom plays truant from school, fights with the new boy in town and \
whitewashes the fence, tricking his friends into doing the work for him.";

fn sample_text() -> String {
    std::iter::repeat(SAMPLE).take(200).collect::<Vec<_>>().join("\n")
}

fn bench_tokenize(c: &mut Criterion) {
    let text = sample_text();
    c.bench_function("tokenize_plain", |b| b.iter(|| tokenize(black_box(&text)).count()));

    let english = Tokenizer::from_name("english").expect("english stemmer");
    c.bench_function("tokenize_english", |b| b.iter(|| english.tokenize(black_box(&text)).count()));
}

fn bench_index_document(c: &mut Criterion) {
    let document = Document::new(1, sample_text());
    let tokenizer = Tokenizer::default();
    c.bench_function("index_document", |b| {
        b.iter(|| DocumentIndexer::index(black_box(&document), &tokenizer).postings().count())
    });
}

criterion_group!(benches, bench_tokenize, bench_index_document);
criterion_main!(benches);
