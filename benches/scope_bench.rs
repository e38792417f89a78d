#![allow(clippy::uninlined_format_args)]
//! 作业作用域的性能基准测试

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use jobscope::{
    BoxError, ContainerJobActivator, Dispose, JobActivator, ServiceContainer, ServiceLifetime,
};
use std::sync::Arc;

struct Settings {
    retries: u32,
}

struct Connection;

impl Dispose for Connection {
    fn dispose(&self) -> Result<(), BoxError> {
        Ok(())
    }
}

struct Job {
    settings: Arc<Settings>,
    connection: Arc<Connection>,
}

fn container() -> ServiceContainer {
    let container = ServiceContainer::new();
    container.register_singleton(|_| Ok(Settings { retries: 3 }));
    container.register_disposable(ServiceLifetime::Scoped, |_| Ok(Connection));
    container.register_transient(|r| {
        Ok(Job {
            settings: r.resolve_required::<Settings>()?,
            connection: r.resolve_required::<Connection>()?,
        })
    });
    container
}

/// 基准测试：单次作业的作用域生命周期（开启、解析、释放）
fn bench_scope_lifecycle(c: &mut Criterion) {
    let container = container();
    let activator = ContainerJobActivator::new(Some(Arc::new(container))).unwrap();

    c.bench_function("scope_lifecycle", |b| {
        b.iter(|| {
            let mut scope = activator.begin_scope().unwrap();
            let job = scope.resolve_as::<Job>().unwrap().unwrap();
            black_box(job.settings.retries);
            scope.dispose_scope().unwrap();
        })
    });
}

/// 基准测试：同一作用域内的多次解析
fn bench_resolutions_per_scope(c: &mut Criterion) {
    let container = container();
    let activator = ContainerJobActivator::new(Some(Arc::new(container))).unwrap();

    let mut group = c.benchmark_group("resolutions_per_scope");
    for resolutions in [1, 10, 100].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(resolutions),
            resolutions,
            |b, &resolutions| {
                b.iter(|| {
                    let mut scope = activator.begin_scope().unwrap();
                    for _ in 0..resolutions {
                        let job = scope.resolve_as::<Job>().unwrap().unwrap();
                        black_box(Arc::strong_count(&job.connection));
                    }
                    scope.dispose_scope().unwrap();
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_scope_lifecycle, bench_resolutions_per_scope);
criterion_main!(benches);
