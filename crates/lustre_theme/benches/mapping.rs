//! Benchmarks for selector parsing and mapping resolution.
//!
//! Run with: cargo bench -p lustre_theme

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use lustre_theme::{
    properties, ConflictStrategy, MappingEngine, PatternKind, PatternMatcher, Priority, Selector,
    WidgetSnapshot,
};

fn engine_with_rules(count: usize) -> MappingEngine {
    let engine = MappingEngine::new();
    for i in 0..count {
        let selector = match i % 3 {
            0 => format!(".class-{}", i % 10),
            1 => format!("Button.class-{}:enabled", i % 10),
            _ => "Button".to_string(),
        };
        engine
            .rule(selector)
            .priority(Priority((i % 4) as i32 * 25))
            .properties(properties! { format!("prop-{}", i % 17) => i as i64 })
            .add()
            .unwrap();
    }
    engine
}

// ============================================================================
// Parsing
// ============================================================================

fn bench_parse(c: &mut Criterion) {
    c.bench_function("parse_compound_selector", |b| {
        b.iter(|| Selector::parse(black_box("#dialog > Button.primary[role='ok']:enabled")).unwrap());
    });
}

// ============================================================================
// Mapping
// ============================================================================

fn bench_mapping(c: &mut Criterion) {
    let engine = engine_with_rules(100);
    let widget = WidgetSnapshot::new(1, "Button").with_class("class-3");

    c.bench_function("get_mapping_warm_100", |b| {
        b.iter(|| engine.get_mapping(black_box(&widget)));
    });

    c.bench_function("get_mapping_cold_100", |b| {
        b.iter(|| {
            engine.clear_caches();
            engine.get_mapping(black_box(&widget))
        });
    });

    let mut group = c.benchmark_group("strategies");
    for strategy in ConflictStrategy::ALL {
        group.bench_function(strategy.name(), |b| {
            b.iter(|| {
                engine.invalidate_cache();
                engine.get_mapping_with(black_box(&widget), strategy)
            });
        });
    }
    group.finish();
}

// ============================================================================
// Patterns
// ============================================================================

fn bench_patterns(c: &mut Criterion) {
    let matcher = PatternMatcher::new();
    for i in 0..50 {
        matcher
            .add_pattern(format!("Widget{}*", i), PatternKind::Glob, Priority::NORMAL)
            .unwrap();
        matcher
            .add_pattern(format!(r"^item_{}\d+$", i), PatternKind::Regex, Priority::LOW)
            .unwrap();
    }

    c.bench_function("match_patterns_cold_100", |b| {
        b.iter(|| {
            matcher.clear_cache();
            matcher.match_patterns(black_box("Widget42Primary"), None)
        });
    });

    c.bench_function("match_patterns_warm_100", |b| {
        b.iter(|| matcher.match_patterns(black_box("Widget42Primary"), None));
    });
}

criterion_group!(benches, bench_parse, bench_mapping, bench_patterns);
criterion_main!(benches);
