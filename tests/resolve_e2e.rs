use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;

use pipeline_notify::{
    AppId, ClusterId, DownstreamEnvironments, EnvId, EnvSentinel, EventTypeId, FanoutExpander,
    InMemorySubscriptionStore, NotifyError, PipelineId, PipelineType, ResolutionQuery,
    ResolutionQueryBuilder, ResolverConfig, StorageError, Subscription, SubscriptionId,
    SubscriptionResolver, SubscriptionRow, SubscriptionStore, TeamId,
};

fn cd_fail(id: u64) -> pipeline_notify::SubscriptionBuilder {
    Subscription::builder()
        .id(SubscriptionId::new(id))
        .pipeline_type(PipelineType::Cd)
        .event_type(EventTypeId::FAIL)
}

fn ids(raw: &[u64]) -> Vec<SubscriptionId> {
    raw.iter().copied().map(SubscriptionId::new).collect()
}

fn sorted(mut v: Vec<SubscriptionId>) -> Vec<SubscriptionId> {
    v.sort();
    v
}

#[test]
fn cd_failure_matches_app_and_team_env_subscriptions() {
    let store = Arc::new(InMemorySubscriptionStore::new());
    store
        .insert_all([
            cd_fail(1).app(AppId::new(10)).build().unwrap(),
            cd_fail(2).team(TeamId::new(5)).env(EnvId::new(20)).build().unwrap(),
            // Other app, other env: no shape applies.
            cd_fail(3).app(AppId::new(11)).build().unwrap(),
            cd_fail(4).env(EnvId::new(21)).build().unwrap(),
        ])
        .unwrap();
    let resolver = SubscriptionResolver::new(store);

    let q = ResolutionQuery::builder(PipelineType::Cd, EventTypeId::FAIL)
        .app(AppId::new(10))
        .env(EnvId::new(20))
        .team(TeamId::new(5))
        .build();
    let res = resolver.resolve(&q).unwrap();
    assert_eq!(sorted(res.ids()), ids(&[1, 2]));
}

#[test]
fn ci_trigger_reaches_downstream_env_subscription() {
    let store = Arc::new(InMemorySubscriptionStore::new());
    store
        .insert(
            Subscription::builder()
                .id(SubscriptionId::new(3))
                .env(EnvId::new(20))
                .pipeline_type(PipelineType::Ci)
                .event_type(EventTypeId::TRIGGER)
                .build()
                .unwrap(),
        )
        .unwrap();
    let resolver = SubscriptionResolver::new(store);

    let q = ResolutionQuery::builder(PipelineType::Ci, EventTypeId::TRIGGER)
        .app(AppId::new(10))
        .pipeline(PipelineId::new(7))
        .fanout_envs([EnvId::new(20), EnvId::new(21)])
        .build();
    assert_eq!(resolver.resolve(&q).unwrap().ids(), ids(&[3]));

    let without_fanout = ResolutionQuery::builder(PipelineType::Ci, EventTypeId::TRIGGER)
        .app(AppId::new(10))
        .pipeline(PipelineId::new(7))
        .build();
    assert!(resolver.resolve(&without_fanout).unwrap().is_empty());
}

#[test]
fn fanout_expander_feeds_the_resolver() {
    struct Topology(HashMap<PipelineId, Vec<EnvId>>);

    impl DownstreamEnvironments for Topology {
        fn downstream_env_ids(&self, ci: PipelineId) -> Result<Vec<EnvId>, StorageError> {
            Ok(self.0.get(&ci).cloned().unwrap_or_default())
        }
    }

    let store = Arc::new(InMemorySubscriptionStore::new());
    store
        .insert(
            Subscription::builder()
                .id(SubscriptionId::new(8))
                .app(AppId::new(10))
                .env(EnvId::new(42))
                .pipeline_type(PipelineType::Ci)
                .event_type(EventTypeId::FAIL)
                .build()
                .unwrap(),
        )
        .unwrap();
    let resolver = SubscriptionResolver::new(store);

    let mut topology = HashMap::new();
    topology.insert(PipelineId::new(7), vec![EnvId::new(42)]);
    let expander = FanoutExpander::new(Topology(topology));

    // The CI run itself happens in env 1; the subscription targets env 42.
    let q = ResolutionQuery::builder(PipelineType::Ci, EventTypeId::FAIL)
        .app(AppId::new(10))
        .env(EnvId::new(1))
        .pipeline(PipelineId::new(7))
        .build();
    assert!(resolver.resolve(&q).unwrap().is_empty());

    let expanded = expander.expand(&q).unwrap();
    assert_eq!(resolver.resolve(&expanded).unwrap().ids(), ids(&[8]));
}

#[test]
fn zero_event_type_is_empty_not_an_error() {
    let store = Arc::new(InMemorySubscriptionStore::new());
    store
        .insert(
            Subscription::builder()
                .id(SubscriptionId::new(1))
                .app(AppId::new(10))
                .pipeline_type(PipelineType::Cd)
                .event_type(EventTypeId::new(0))
                .build()
                .unwrap(),
        )
        .unwrap();
    let resolver = SubscriptionResolver::new(store);

    let q = ResolutionQuery::builder(PipelineType::Cd, EventTypeId::new(0))
        .app(AppId::new(10))
        .build();
    let res = resolver.resolve(&q).unwrap();
    assert!(res.is_empty());
    assert!(res.classified().is_none());

    let empty_type = PipelineType::parse_optional("").unwrap();
    let q = ResolutionQueryBuilder::new(empty_type, EventTypeId::FAIL)
        .app(AppId::new(10))
        .build();
    assert!(resolver.resolve(&q).unwrap().is_empty());
}

#[test]
fn blocked_auto_trigger_resolves_like_failure() {
    let store = Arc::new(InMemorySubscriptionStore::new());
    store
        .insert_all([
            cd_fail(1).app(AppId::new(10)).build().unwrap(),
            cd_fail(2).env(EnvSentinel::AllProd).build().unwrap(),
            cd_fail(3).team(TeamId::new(5)).cluster(ClusterId::new(40)).build().unwrap(),
        ])
        .unwrap();
    let resolver = SubscriptionResolver::new(store);

    let base = |event: EventTypeId| {
        ResolutionQuery::builder(PipelineType::Cd, event)
            .team(TeamId::new(5))
            .app(AppId::new(10))
            .env(EnvId::new(20))
            .cluster(ClusterId::new(40))
            .is_prod_env(true)
            .build()
    };

    let failed = resolver.resolve(&base(EventTypeId::FAIL)).unwrap();
    let blocked = resolver.resolve(&base(EventTypeId::BLOCKED_AUTO_TRIGGER)).unwrap();
    assert_eq!(sorted(failed.ids()), ids(&[1, 2, 3]));
    assert_eq!(sorted(blocked.ids()), sorted(failed.ids()));
}

#[test]
fn configuration_cannot_separate_blocked_from_failed() {
    let store = Arc::new(InMemorySubscriptionStore::new());
    store.insert(cd_fail(1).app(AppId::new(10)).build().unwrap()).unwrap();

    let config: ResolverConfig = serde_json::from_str(r#"{"event_remaps": []}"#).unwrap();
    let resolver = SubscriptionResolver::with_config(store, &config);

    let q = |event: EventTypeId| {
        ResolutionQuery::builder(PipelineType::Cd, event)
            .app(AppId::new(10))
            .build()
    };
    let failed = resolver.resolve(&q(EventTypeId::FAIL)).unwrap().ids();
    let blocked = resolver.resolve(&q(EventTypeId::BLOCKED_AUTO_TRIGGER)).unwrap().ids();
    assert_eq!(failed, ids(&[1]));
    assert_eq!(blocked, failed);
}

#[test]
fn prod_sentinel_follows_the_env_flag() {
    let store = Arc::new(InMemorySubscriptionStore::new());
    store
        .insert_all([
            cd_fail(1).env(EnvSentinel::AllProd).build().unwrap(),
            cd_fail(2).env(EnvSentinel::AllNonProd).build().unwrap(),
            cd_fail(3).app(AppId::new(10)).env(EnvSentinel::AllProd).build().unwrap(),
        ])
        .unwrap();
    let resolver = SubscriptionResolver::new(store);

    let q = |prod: Option<bool>| {
        let b = ResolutionQuery::builder(PipelineType::Cd, EventTypeId::FAIL)
            .app(AppId::new(10))
            .env(EnvId::new(99));
        match prod {
            Some(p) => b.is_prod_env(p).build(),
            None => b.build(),
        }
    };

    assert_eq!(sorted(resolver.resolve(&q(Some(true))).unwrap().ids()), ids(&[1, 3]));
    assert_eq!(resolver.resolve(&q(Some(false))).unwrap().ids(), ids(&[2]));
    assert!(resolver.resolve(&q(None)).unwrap().is_empty());
}

#[test]
fn resolution_is_idempotent() {
    let store = Arc::new(InMemorySubscriptionStore::new());
    store
        .insert_all((1..=20).map(|i| {
            cd_fail(i)
                .app(AppId::new(i % 3))
                .env(EnvId::new(i % 4))
                .build()
                .unwrap()
        }))
        .unwrap();
    let resolver = SubscriptionResolver::new(store);

    let q = ResolutionQuery::builder(PipelineType::Cd, EventTypeId::FAIL)
        .app(AppId::new(1))
        .env(EnvId::new(1))
        .build();
    let first = resolver.resolve(&q).unwrap();
    let second = resolver.resolve(&q).unwrap();
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn store_timeout_fails_the_whole_resolution() {
    struct SlowStore;

    impl SubscriptionStore for SlowStore {
        fn list_subscriptions(
            &self,
            _: PipelineType,
            _: EventTypeId,
        ) -> Result<Vec<Subscription>, StorageError> {
            Err(StorageError::Timeout { duration_ms: 500 })
        }
    }

    let resolver = SubscriptionResolver::new(Arc::new(SlowStore));
    let q = ResolutionQuery::builder(PipelineType::Cd, EventTypeId::FAIL)
        .app(AppId::new(10))
        .build();
    let err = resolver.resolve(&q).unwrap_err();
    assert!(matches!(
        err,
        NotifyError::Storage(StorageError::Timeout { duration_ms: 500 })
    ));
    assert!(err.is_retryable());
}

#[test]
fn concurrent_resolutions_are_independent() {
    let store = Arc::new(InMemorySubscriptionStore::new());
    store
        .insert_all((1..=8).map(|i| cd_fail(i).app(AppId::new(i)).build().unwrap()))
        .unwrap();
    let resolver = SubscriptionResolver::new(store);

    std::thread::scope(|s| {
        for i in 1..=8u64 {
            let resolver = &resolver;
            s.spawn(move || {
                let q = ResolutionQuery::builder(PipelineType::Cd, EventTypeId::FAIL)
                    .app(AppId::new(i))
                    .build();
                for _ in 0..50 {
                    assert_eq!(resolver.resolve(&q).unwrap().ids(), ids(&[i]));
                }
            });
        }
    });
}

#[test]
fn persisted_rows_resolve_after_decoding() {
    let rows = vec![
        SubscriptionRow {
            id: 1,
            team_id: Some(5),
            env_id: Some(-1),
            pipeline_type: "CD".to_string(),
            event_type_id: 3,
            config: json!([{"dest": "ses", "recipient": "ops@example.com"}]).to_string(),
            ..SubscriptionRow::default()
        },
        SubscriptionRow {
            id: 2,
            cluster_id: Some(40),
            pipeline_type: "CD".to_string(),
            event_type_id: 3,
            ..SubscriptionRow::default()
        },
    ];

    let store = Arc::new(InMemorySubscriptionStore::new());
    for row in rows {
        store.insert(Subscription::try_from(row).unwrap()).unwrap();
    }
    let resolver = SubscriptionResolver::new(store);

    let q = ResolutionQuery::builder(PipelineType::Cd, EventTypeId::FAIL)
        .team(TeamId::new(5))
        .env(EnvId::new(20))
        .cluster(ClusterId::new(40))
        .is_prod_env(false)
        .build();
    let res = resolver.resolve(&q).unwrap();
    assert_eq!(sorted(res.ids()), ids(&[1, 2]));

    let ses = res
        .subscriptions()
        .iter()
        .find(|s| s.id == SubscriptionId::new(1))
        .unwrap();
    assert_eq!(ses.channel_entries().unwrap()[0].recipient, "ops@example.com");
}
