use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use server_mocker::matchers::{header, method, path};
use server_mocker::{text, MockRegistry, Request};

fn registry_with(registrations: usize) -> MockRegistry {
    let registry = MockRegistry::new();
    for i in 0..registrations {
        registry
            .stub(method("GET"))
            .and(path(format!("/resource/{}", i)))
            .and(header("x-tenant", "acme"))
            .returns(text(i.to_string()));
    }
    registry
}

fn request(index: usize) -> Request {
    Request::new("GET".parse().unwrap(), format!("/resource/{}", index))
        .with_header("x-tenant", "acme")
}

// The request log grows with every handled request: each batch gets a fresh registry.
pub fn handle_newest_registration(c: &mut Criterion) {
    c.bench_function("MockRegistry::handle (newest of 200)", |b| {
        b.iter_batched(
            || (registry_with(200), request(199)),
            |(registry, request)| registry.handle(request),
            BatchSize::LargeInput,
        )
    });
}

pub fn handle_oldest_registration(c: &mut Criterion) {
    c.bench_function("MockRegistry::handle (oldest of 200)", |b| {
        b.iter_batched(
            || (registry_with(200), request(0)),
            |(registry, request)| registry.handle(request),
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(
    benches,
    handle_newest_registration,
    handle_oldest_registration
);
criterion_main!(benches);
