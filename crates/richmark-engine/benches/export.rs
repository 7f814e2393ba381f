use criterion::{Criterion, criterion_group, criterion_main};
use richmark_engine::document::Document;
use richmark_engine::export::{ExportSnapshot, canonicalize, serialize};

fn generate_editor_markup(sections: usize) -> String {
    let base = concat!(
        "<h2>Section</h2><p>Paragraph with <strong>bold</strong>, <em>italic</em> and ",
        r#"<a target="_blank" rel="noopener noreferrer nofollow" href="https://example.com">a link</a>.</p>"#,
        "<ul><li><p>Bullet point</p><ul><li><p>Nested item</p></li></ul></li></ul>",
        r#"<pre><code class="language-rust">fn example() {}</code></pre>"#,
        r#"<table style="min-width: 75px"><colgroup><col style="min-width: 25px"><col style="min-width: 25px"><col style="min-width: 25px"></colgroup><tbody>"#,
        r#"<tr><th colspan="1" rowspan="1"><p>A</p></th><th colspan="1" rowspan="1"><p>B</p></th><th colspan="1" rowspan="1"><p>C</p></th></tr>"#,
        r#"<tr><td colspan="1" rowspan="1"><p>1</p></td><td colspan="1" rowspan="1"><p>2</p></td><td colspan="1" rowspan="1"><p>3</p></td></tr>"#,
        "</tbody></table>"
    );
    base.repeat(sections)
}

fn bench_export(c: &mut Criterion) {
    let mut group = c.benchmark_group("export");
    group.sample_size(10);

    let raw = generate_editor_markup(100);
    let canonical = canonicalize(&raw);

    group.bench_function("canonicalize", |b| {
        b.iter(|| std::hint::black_box(canonicalize(&raw)));
    });

    group.bench_function("serialize", |b| {
        b.iter(|| std::hint::black_box(serialize(&canonical)));
    });

    group.bench_function("snapshot", |b| {
        b.iter(|| std::hint::black_box(ExportSnapshot::from_markup(&raw)));
    });

    let document = Document::from_markup(&raw);
    group.bench_function("document_to_markup", |b| {
        b.iter(|| std::hint::black_box(document.to_markup()));
    });

    group.finish();
}

criterion_group!(benches, bench_export);
criterion_main!(benches);
