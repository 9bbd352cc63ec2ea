#![allow(dead_code)]

use criterion::{criterion_group, criterion_main, Criterion};
use injectum::{Container, Inject, InstantiateErrorKind, Managed, Scoped, Singleton, Transient};
use std::sync::Arc;

struct A(Arc<B>, Arc<C>);
struct B(i32);
struct C(Arc<CA>);
struct CA(Arc<CAA>);
struct CAA(Arc<CAAA>);
struct CAAA(Arc<CAAAA>);
struct CAAAA(Arc<CAAAAA>);
struct CAAAAA;

#[inline]
fn container_with_chain() -> Container {
    let container = Container::new();
    container
        .register_all([
            Scoped::new(|| Ok::<_, InstantiateErrorKind>(CAAAAA)),
            Scoped::new(|Inject(caaaaa): Inject<CAAAAA>| Ok::<_, InstantiateErrorKind>(CAAAA(caaaaa))),
            Scoped::new(|Inject(caaaa): Inject<CAAAA>| Ok::<_, InstantiateErrorKind>(CAAA(caaaa))),
            Scoped::new(|Inject(caaa): Inject<CAAA>| Ok::<_, InstantiateErrorKind>(CAA(caaa))),
            Scoped::new(|Inject(caa): Inject<CAA>| Ok::<_, InstantiateErrorKind>(CA(caa))),
            Scoped::new(|Inject(ca): Inject<CA>| Ok::<_, InstantiateErrorKind>(C(ca))),
            Singleton::new(|| Ok::<_, InstantiateErrorKind>(B(2))),
            Transient::new(|Inject(b): Inject<B>, Inject(c): Inject<C>| Ok::<_, InstantiateErrorKind>(A(b, c))),
        ])
        .unwrap();
    container
}

#[inline]
fn container_with_resources() -> Container {
    let container = Container::new();
    container
        .register_all([
            Scoped::resource(|| Ok::<_, InstantiateErrorKind>(Managed::new(CAAAAA, |_| Ok(())))),
            Scoped::resource(|Inject(caaaaa): Inject<CAAAAA>| {
                Ok::<_, InstantiateErrorKind>(Managed::new(CAAAA(caaaaa), |_| Ok(())))
            }),
            Scoped::resource(|Inject(caaaa): Inject<CAAAA>| {
                Ok::<_, InstantiateErrorKind>(Managed::new(CAAA(caaaa), |_| Ok(())))
            }),
        ])
        .unwrap();
    container
}

#[inline]
fn context_resolve(container: &Container) {
    let _ = container.sync_context().resolve::<A>().unwrap();
}

#[inline]
fn context_close(container: &Container) {
    let context = container.sync_context();
    let _ = context.resolve::<CAAA>().unwrap();

    context.close().unwrap();
}

fn criterion_benchmark(c: &mut Criterion) {
    let container_1 = container_with_chain();
    let container_2 = container_with_resources();

    c.bench_function("container_new_with_providers", |b| b.iter(container_with_chain))
        .bench_function("context_new", |b| b.iter(|| container_1.sync_context()))
        .bench_function("context_resolve", |b| b.iter(|| context_resolve(&container_1)))
        .bench_function("context_resolve_with_cache", |b| {
            let context = container_1.sync_context();
            b.iter(|| context.resolve::<C>().unwrap())
        })
        .bench_function("context_close", |b| b.iter(|| context_close(&container_2)));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
