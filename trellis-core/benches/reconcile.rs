//! Benchmarks for reconciliation

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use trellis_core::element::{Child, Element};
use trellis_core::host::MemoryHost;
use trellis_core::Root;

fn keyed_list(len: usize, reversed: bool) -> Child {
    let items: Vec<Child> = if reversed {
        (0..len).rev().map(item).collect()
    } else {
        (0..len).map(item).collect()
    };
    Element::host("ul").children(items).into()
}

fn item(i: usize) -> Child {
    Element::host("li").key(i).attr("data-index", i).child(i).into()
}

fn bench_mount(c: &mut Criterion) {
    c.bench_function("mount_keyed_list_1000", |b| {
        b.iter(|| {
            let host = MemoryHost::new();
            let container = host.create_container("root");
            let root = Root::new(host, container);
            root.render(black_box(keyed_list(1000, false))).unwrap();
        })
    });
}

fn bench_identical_rerender(c: &mut Criterion) {
    let host = MemoryHost::new();
    let container = host.create_container("root");
    let root = Root::new(host, container);
    root.render(keyed_list(1000, false)).unwrap();

    c.bench_function("rerender_identical_keyed_list_1000", |b| {
        b.iter(|| root.render(black_box(keyed_list(1000, false))).unwrap())
    });
}

fn bench_reverse(c: &mut Criterion) {
    let host = MemoryHost::new();
    let container = host.create_container("root");
    let root = Root::new(host.clone(), container);
    let mut reversed = false;

    c.bench_function("reverse_keyed_list_1000", |b| {
        b.iter(|| {
            reversed = !reversed;
            root.render(black_box(keyed_list(1000, reversed))).unwrap();
            host.take_ops();
        })
    });
}

criterion_group!(benches, bench_mount, bench_identical_rerender, bench_reverse);
criterion_main!(benches);
