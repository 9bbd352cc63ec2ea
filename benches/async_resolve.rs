#![allow(dead_code)]

use criterion::{criterion_group, criterion_main, Criterion};
use injectum::{AsyncManaged, Container, Inject, InstantiateErrorKind, Scoped, Singleton};
use std::sync::Arc;

struct A(Arc<B>, Arc<C>);
struct B(i32);
struct C(Arc<CA>);
struct CA;

#[inline]
fn container_with_async_providers() -> Container {
    let container = Container::new();
    container
        .register_all([
            Scoped::async_resource(|| async {
                Ok::<_, InstantiateErrorKind>(AsyncManaged::new(CA, |_| async { Ok(()) }))
            }),
            Scoped::new_async(|Inject(ca): Inject<CA>| async move { Ok::<_, InstantiateErrorKind>(C(ca)) }),
            Singleton::new(|| Ok::<_, InstantiateErrorKind>(B(2))),
            Scoped::new(|Inject(b): Inject<B>, Inject(c): Inject<C>| Ok::<_, InstantiateErrorKind>(A(b, c))),
        ])
        .unwrap();
    container
}

fn criterion_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_multi_thread().build().unwrap();
    let container = container_with_async_providers();

    c.bench_function("async_context_resolve", |b| {
        b.to_async(&runtime).iter(|| async {
            let _ = container.context().resolve::<A>().await.unwrap();
        })
    })
    .bench_function("async_context_resolve_and_close", |b| {
        b.to_async(&runtime).iter(|| async {
            let context = container.context();
            let _ = context.resolve::<A>().await.unwrap();
            context.aclose().await.unwrap();
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
