use criterion::{Criterion, criterion_group, criterion_main};
use voxscript_engine::editing::{block::Block, commands::Cmd, document::Document};
use voxscript_engine::surface::Surface;
use voxscript_engine::surface::render::{read_back, render};
use voxscript_engine::surface::selection::{offset_in_root, resolve_offset};

fn generate_script(sections: usize) -> Vec<Block> {
    let mut blocks = Vec::with_capacity(sections * 3);
    for i in 0..sections {
        blocks.push(Block::text(format!(
            "narration section {i} with a handful of words in it "
        )));
        blocks.push(Block::pause(500));
        blocks.push(Block::alias(format!("term{i}"), format!("meaning {i}")));
    }
    blocks
}

fn bench_editing_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("editing");
    group.sample_size(10);

    let doc = Document::from_blocks(generate_script(100));

    group.bench_function("insert_break", |b| {
        b.iter(|| {
            let mut d = doc.clone();
            let patch = d.apply(Cmd::InsertBreak {
                at: std::hint::black_box(500),
                duration_ms: 500,
            });
            std::hint::black_box(patch)
        });
    });

    group.bench_function("render", |b| {
        let mut surface = Surface::new();
        b.iter(|| {
            render(&mut surface, &doc);
            std::hint::black_box(surface.children(surface.root()).len())
        });
    });

    group.bench_function("read_back", |b| {
        let mut surface = Surface::new();
        render(&mut surface, &doc);
        b.iter(|| std::hint::black_box(read_back(&surface)));
    });

    group.bench_function("mapper_round_trip", |b| {
        let mut surface = Surface::new();
        render(&mut surface, &doc);
        let total = doc.total_len();
        b.iter(|| {
            let point = resolve_offset(&surface, std::hint::black_box(total / 2)).unwrap();
            std::hint::black_box(offset_in_root(&surface, point.node, point.offset))
        });
    });

    group.finish();
}

criterion_group!(benches, bench_editing_operations);
criterion_main!(benches);
