//! Performance benchmarks for Conductor.
//!
//! This module contains benchmarks for:
//! - Failure classification over short and long test output
//! - Branch naming and validation
//! - Plan construction for each template
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use conductor::git::{name_branch, validate_name, BranchKind, BranchSpec};
use conductor::workflow::{classify_failure, number_steps, template_steps, WorkflowRequest};

// ============================================================================
// Fixtures
// ============================================================================

mod fixtures {
    /// Test-runner output with `lines` passing lines and one failure at the end.
    pub fn test_output(lines: usize, failure: &str) -> String {
        let mut out = String::with_capacity(lines * 48);
        for i in 0..lines {
            out.push_str(&format!("test billing::tests::case_{i} ... ok\n"));
        }
        out.push_str(failure);
        out
    }

    pub const FAILURES: [(&str, &str); 5] = [
        ("interface", "assertion failed: POST /invoices endpoint returned 404"),
        ("markup", "template render error: missing element #total"),
        ("schema", "relation \"invoices\" does not exist (migration pending)"),
        ("authorization", "expected 200, got 403 forbidden for session user"),
        ("default", "expected 42, got 41 in compute_total"),
    ];
}

// ============================================================================
// Classification Benchmarks
// ============================================================================

fn bench_classify_failure(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify/bucket");

    for (bucket, failure) in fixtures::FAILURES {
        group.bench_with_input(BenchmarkId::from_parameter(bucket), &failure, |b, failure| {
            b.iter(|| classify_failure(black_box(failure)));
        });
    }

    group.finish();
}

fn bench_classify_long_output(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify/output_size");

    for lines in [10, 100, 1000, 5000].iter() {
        let output = fixtures::test_output(*lines, fixtures::FAILURES[4].1);
        group.throughput(Throughput::Bytes(output.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(lines), &output, |b, output| {
            b.iter(|| classify_failure(black_box(output)));
        });
    }

    group.finish();
}

// ============================================================================
// Branch Naming Benchmarks
// ============================================================================

fn bench_name_branch(c: &mut Criterion) {
    let mut group = c.benchmark_group("naming");

    let short = BranchSpec::feature("billing");
    let issue = BranchSpec::new(BranchKind::Bugfix, "Session leak on logout").with_issue("PROJ-1234");
    let long = BranchSpec::feature("a very long feature name ".repeat(10));

    for (label, spec) in [("short", &short), ("issue", &issue), ("truncated", &long)] {
        group.bench_with_input(BenchmarkId::new("name_branch", label), spec, |b, spec| {
            b.iter(|| name_branch(black_box(spec)));
        });
    }

    for name in ["feature/billing", "Feature/My Branch!", "release/2024-q3-cutover"] {
        group.bench_with_input(BenchmarkId::new("validate_name", name), name, |b, name| {
            b.iter(|| validate_name(black_box(name)));
        });
    }

    group.finish();
}

// ============================================================================
// Planning Benchmarks
// ============================================================================

fn bench_planning(c: &mut Criterion) {
    let mut group = c.benchmark_group("planning");

    let requests = [
        ("new_feature", WorkflowRequest::new_feature("billing")),
        ("analyze", WorkflowRequest::Analyze),
        ("generic", WorkflowRequest::from_text("tidy up the logging setup")),
    ];

    for (label, request) in &requests {
        group.bench_with_input(BenchmarkId::from_parameter(label), request, |b, request| {
            b.iter(|| number_steps(template_steps(black_box(request), None), Some("feature/billing")));
        });
    }

    group.bench_function("from_text", |b| {
        b.iter(|| WorkflowRequest::from_text(black_box("please create a new feature called invoices")));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_classify_failure,
    bench_classify_long_output,
    bench_name_branch,
    bench_planning,
);

criterion_main!(benches);
