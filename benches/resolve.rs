use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};

use pipeline_notify::{
    AppId, ClusterId, EnvId, EnvSentinel, EventTypeId, InMemorySubscriptionStore, PipelineId,
    PipelineType, ResolutionQuery, Subscription, SubscriptionId, SubscriptionResolver, TeamId,
};

const CANDIDATES: u64 = 1024;

fn make_resolver() -> SubscriptionResolver {
    let store = Arc::new(InMemorySubscriptionStore::new());

    // Spread candidates across the common shapes so every pass does real work.
    for i in 0..CANDIDATES {
        let b = Subscription::builder()
            .id(SubscriptionId::new(i + 1))
            .pipeline_type(PipelineType::Cd)
            .event_type(EventTypeId::FAIL);
        let b = match i % 6 {
            0 => b.app(AppId::new(i % 32)),
            1 => b.env(EnvId::new(i % 64)),
            2 => b.team(TeamId::new(i % 8)).env(EnvId::new(i % 64)),
            3 => b.team(TeamId::new(i % 8)).env(EnvSentinel::AllProd),
            4 => b.cluster(ClusterId::new(i % 4)),
            _ => b.pipeline(PipelineId::new(i % 128)),
        };
        let sub = b.build().expect("bench subscription");
        store.insert(sub).expect("seed insert");
    }

    SubscriptionResolver::new(store)
}

fn bench_resolve(c: &mut Criterion) {
    let resolver = make_resolver();
    let query = ResolutionQuery::builder(PipelineType::Cd, EventTypeId::FAIL)
        .team(TeamId::new(3))
        .app(AppId::new(6))
        .env(EnvId::new(11))
        .pipeline(PipelineId::new(17))
        .cluster(ClusterId::new(2))
        .is_prod_env(true)
        .fanout_envs([EnvId::new(12), EnvId::new(13)])
        .build();

    let mut group = c.benchmark_group("resolve");
    group.throughput(Throughput::Elements(CANDIDATES));
    group.bench_function("all_passes", |b| {
        b.iter(|| resolver.resolve(std::hint::black_box(&query)));
    });

    let base_only = ResolutionQuery::builder(PipelineType::Cd, EventTypeId::FAIL)
        .app(AppId::new(6))
        .env(EnvId::new(11))
        .build();
    group.bench_function("base_pass", |b| {
        b.iter(|| resolver.resolve(std::hint::black_box(&base_only)));
    });
    group.finish();
}

criterion_group!(benches, bench_resolve);
criterion_main!(benches);
