//! Request matching benchmarks.
//!
//! Run with: cargo bench -p uf-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use uf_core::{Engine, Request, RequestType, RuleStorage, StringRuleList};

/// Synthetic list mixing host-anchored, token and regex rules.
fn generate_list(count: usize) -> String {
    let mut lines = Vec::with_capacity(count + 4);
    for i in 0..count {
        let line = match i % 5 {
            0 => format!("||tracker{i}.example.com^"),
            1 => format!("||ads{i}.example.net^$third-party,script"),
            2 => format!("/banner{i}/ads."),
            3 => format!("@@||cdn{i}.example.org^$image"),
            _ => format!("||site{i}.example.com^$cookie=uid{i}"),
        };
        lines.push(line);
    }
    lines.push("/ad[0-9]+x[0-9]+/".to_string());
    lines.push("||example.com^$csp=script-src 'self'".to_string());
    lines.join("\n")
}

fn generate_requests(count: usize) -> Vec<Request> {
    (0..count)
        .map(|i| {
            let url = match i % 4 {
                0 => format!("https://tracker{}.example.com/pixel.gif", i * 5),
                1 => format!("https://ads{}.example.net/ad.js", i * 5 + 1),
                2 => format!("https://static.example.com/banner{}/ads.png", i * 5 + 2),
                _ => format!("https://unknown{i}.nonexistent.org/index.html"),
            };
            Request::new(&url, "https://page.example.org/", RequestType::SCRIPT)
        })
        .collect()
}

fn engine(count: usize) -> Engine {
    let storage = RuleStorage::new(vec![StringRuleList::new(1, generate_list(count))]).unwrap();
    Engine::new(storage)
}

fn bench_engine_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_build");
    for size in [1_000usize, 10_000] {
        let list = generate_list(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &list, |b, list| {
            b.iter(|| {
                let storage = RuleStorage::new(vec![StringRuleList::new(1, list.clone())]).unwrap();
                black_box(Engine::new(storage))
            });
        });
    }
    group.finish();
}

fn bench_match_request(c: &mut Criterion) {
    let mut group = c.benchmark_group("match_request");
    for size in [1_000usize, 10_000] {
        let engine = engine(size);
        let requests = generate_requests(1_000);
        group.throughput(Throughput::Elements(requests.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &requests, |b, requests| {
            b.iter(|| {
                for request in requests {
                    black_box(engine.match_request(black_box(request)));
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_engine_build, bench_match_request);
criterion_main!(benches);
