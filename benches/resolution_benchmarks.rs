//! Benchmarks for glob compilation and mode resolution.
//!
//! Run with: cargo bench

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use modekit_modes::property::{FILENAME_GLOB, FIRSTLINE_GLOB};
use modekit_modes::{GlobMatcher, LoadError, ModeDescriptor, ModeRegistry, Tokenizer, TokenizerLoader};

struct NoTokenizers;

impl TokenizerLoader for NoTokenizers {
    fn load_tokenizer(&self, mode: &ModeDescriptor) -> Result<Arc<dyn Tokenizer>, LoadError> {
        Err(LoadError::NoRuleFile(mode.name().to_string()))
    }
}

/// A registry with `count` modes, each owning one extension.
fn populated_registry(count: usize) -> ModeRegistry {
    let registry = ModeRegistry::new(NoTokenizers);
    for i in 0..count {
        let mode = Arc::new(ModeDescriptor::new(format!("mode{i}")));
        mode.set_property(FILENAME_GLOB, format!("*.{{ext{i},e{i}x}}"));
        if i % 10 == 0 {
            mode.set_property(FIRSTLINE_GLOB, format!("#!*interp{i}*"));
        }
        let _ = mode.init();
        registry.register(mode);
    }
    registry
}

/// Benchmarks translating and compiling globs.
fn bench_glob_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("glob_compile");

    for glob in ["*.rs", "*.{c,cc,cpp,h,hpp}", "src/**/*.{!test}rs", "(re).*\\.mk"] {
        group.bench_with_input(BenchmarkId::from_parameter(glob), glob, |b, glob| {
            b.iter(|| GlobMatcher::compile(black_box(glob), true))
        });
    }

    group.finish();
}

/// Benchmarks matching one compiled glob.
fn bench_glob_match(c: &mut Criterion) {
    let matcher = GlobMatcher::compile("*.{c,cc,cpp,h,hpp}", true).unwrap();

    c.bench_function("glob_match_path", |b| {
        b.iter(|| matcher.is_match(black_box("/home/user/project/src/engine/render.cpp")))
    });
}

/// Benchmarks best-match resolution across registry sizes.
fn bench_mode_for_file(c: &mut Criterion) {
    let mut group = c.benchmark_group("mode_for_file");

    for size in [10, 100, 500].iter() {
        let registry = populated_registry(*size);
        let last = format!("/src/file.ext{}", size - 1);

        group.bench_with_input(BenchmarkId::new("by_path", size), &last, |b, path| {
            b.iter(|| registry.mode_for_file(Some(black_box(path)), None, None))
        });

        group.bench_with_input(BenchmarkId::new("miss", size), size, |b, _| {
            b.iter(|| {
                registry.mode_for_file(
                    Some(black_box("/src/README")),
                    Some("README"),
                    Some("#!/usr/bin/env nothing"),
                )
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_glob_compile, bench_glob_match, bench_mode_for_file);
criterion_main!(benches);
