//! Dispatcher benchmarks.
//!
//! Single-file traversal with every built-in rule, and a full pipeline run
//! over many in-memory units.
//! Run with: cargo bench -p aegis-analysis --bench dispatcher_bench

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use aegis_analysis::engine::{Dispatcher, ResolvedConfig};
use aegis_analysis::parsers::parse_source;
use aegis_analysis::patterns::PatternContext;
use aegis_analysis::pipeline::{MemoryProvider, ScanPipeline};
use aegis_analysis::rules::RuleRegistry;
use aegis_analysis::tree::Language;
use aegis_core::config::AegisConfig;
use aegis_core::traits::CancellationToken;

/// A route module with a little of everything the rules look at.
fn route_module(functions: usize) -> String {
    let mut source = String::from(
        "const express = require('express');\nconst jwt = require('jsonwebtoken');\nconst app = express();\n",
    );
    for i in 0..functions {
        source.push_str(&format!(
            "function getUser{i}Handler(req, res) {{\n  \
               const id = req.params.id;\n  \
               const token = jwt.sign({{ sub: id }}, process.env.SECRET, {{ expiresIn: '15m' }});\n  \
               return fetch(`https://api.example.com/users/${{id}}`).then(r => res.json({{ token, r }}));\n\
             }}\n\
             app.get('/users/{i}', getUser{i}Handler);\n"
        ));
    }
    source
}

fn dispatcher_single_file(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatcher_single_file");
    let registry = RuleRegistry::builtin();
    let resolved = ResolvedConfig::defaults(&registry);
    let patterns = PatternContext::new();
    let dispatcher = Dispatcher::new(&registry, &resolved, &patterns);
    let cancel = CancellationToken::new();

    for functions in [10, 100, 500] {
        let source = route_module(functions);
        let unit = parse_source("routes.js", Language::JavaScript, &source).unwrap();
        group.bench_with_input(BenchmarkId::new("functions", functions), &unit, |b, unit| {
            b.iter(|| dispatcher.run(unit, &cancel));
        });
    }
    group.finish();
}

fn pipeline_many_units(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_many_units");
    group.sample_size(10);
    let config = AegisConfig::default();

    for units in [100, 1000] {
        let provider = (0..units).fold(MemoryProvider::new(), |p, i| {
            p.with_source(&format!("src/m{i:04}.js"), Language::JavaScript, &route_module(5))
        });
        group.bench_with_input(BenchmarkId::new("units", units), &provider, |b, provider| {
            b.iter(|| {
                ScanPipeline::default()
                    .run(&config, provider, &CancellationToken::new())
                    .unwrap()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, dispatcher_single_file, pipeline_many_units);
criterion_main!(benches);
