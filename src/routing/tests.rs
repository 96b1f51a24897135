//! Routing Module Tests
//!
//! Validates shard resolution, name encoding and replica ordering without any network.
//!
//! ## Test Scopes
//! - **Resolver**: deterministic hashing, write-weighted tables, memoization on the event.
//! - **Codec**: encode/decode round trips and every malformed-prefix rejection.
//! - **Selector**: weighting, zero-weight exclusion, failure windows and fallback order.
//! - **Health**: time-based recovery and concurrent recording.

#[cfg(test)]
mod tests {
    use crate::config::Topology;
    use crate::error::RouterError;
    use crate::routing::codec;
    use crate::routing::{
        BucketMap, HealthTracker, ReplicaSelector, RequestEvent, ShardResolver, Verb,
    };
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use serde_json::{Value, json};
    use std::collections::{BTreeSet, HashMap};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn config(encode_name: bool, cluster: Option<usize>) -> Value {
        let mut replicas = serde_json::Map::new();
        for id in [
            "000", "001", "002", "010", "011", "012", "100", "101", "102", "110", "111", "112",
        ] {
            replicas.insert(
                id.to_string(),
                json!({"ip": "127.0.0.1", "port": 9000, "read_weight": 1}),
            );
        }

        let mut value = json!({
            "clusters": [
                [
                    {"write_weight": 1, "replicas": ["000", "001", "002"]},
                    {"write_weight": 1, "replicas": ["010", "011", "012"]}
                ],
                [
                    {"write_weight": 1, "replicas": ["100", "101", "102"]},
                    {"write_weight": 1, "replicas": ["110", "111", "112"]}
                ]
            ],
            "replicas": replicas,
            "encode_name": encode_name,
            "replica_retry": 60,
            "ttl": null
        });
        if let Some(cluster) = cluster {
            value["cluster"] = json!(cluster);
        }
        value
    }

    fn topology(encode_name: bool, cluster: Option<usize>) -> Arc<Topology> {
        Arc::new(Topology::from_value(config(encode_name, cluster)).unwrap())
    }

    fn weighted_topology(read_weights: &[(&str, u32)], write_weights: (u32, u32)) -> Arc<Topology> {
        let mut replicas: serde_json::Map<String, Value> = read_weights
            .iter()
            .map(|(id, weight)| {
                (
                    id.to_string(),
                    json!({"ip": "127.0.0.1", "port": 9000, "read_weight": weight}),
                )
            })
            .collect();
        replicas.insert(
            "spare".to_string(),
            json!({"ip": "127.0.0.1", "port": 9001, "read_weight": 1}),
        );
        let ids: Vec<&str> = read_weights.iter().map(|(id, _)| *id).collect();

        Arc::new(
            Topology::from_value(json!({
                "clusters": [[
                    {"write_weight": write_weights.0, "replicas": ids},
                    {"write_weight": write_weights.1, "replicas": ["spare"]}
                ]],
                "replicas": replicas,
                "encode_name": false,
                "replica_retry": 60,
                "ttl": null
            }))
            .unwrap(),
        )
    }

    fn ids(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn bucket_map(pairs: &[(usize, usize)]) -> BucketMap {
        pairs.iter().copied().collect()
    }

    // ============================================================
    // RESOLVER TESTS
    // ============================================================

    #[test]
    fn test_hash_resolution_is_fixed() {
        let resolver = ShardResolver::new(topology(false, Some(0)));

        assert_eq!(resolver.hash_buckets("1"), bucket_map(&[(0, 0), (1, 1)]));
        // Same answer on every call and from a fresh resolver.
        assert_eq!(resolver.hash_buckets("1"), resolver.hash_buckets("1"));
        let other = ShardResolver::new(topology(false, None));
        assert_eq!(other.hash_buckets("1"), resolver.hash_buckets("1"));
    }

    #[test]
    fn test_hash_name_is_salted_by_cluster() {
        assert_eq!(ShardResolver::hash_name(0, "1"), ShardResolver::hash_name(0, "1"));
        assert_ne!(ShardResolver::hash_name(0, "1"), ShardResolver::hash_name(1, "1"));
    }

    #[test]
    fn test_weighted_table_layout() {
        let topology = weighted_topology(&[("a", 1)], (3, 1));
        let resolver = ShardResolver::new(topology);

        assert_eq!(resolver.table(0), &[0, 0, 0, 1]);
    }

    #[test]
    fn test_assignment_follows_write_weight() {
        let topology = weighted_topology(&[("a", 1)], (3, 1));
        let resolver = ShardResolver::new(topology);

        let mut counts: HashMap<usize, usize> = HashMap::new();
        for i in 0..8000 {
            let buckets = resolver.hash_buckets(&format!("object-{}", i));
            *counts.entry(buckets[&0]).or_insert(0) += 1;
        }

        let heavy = counts.get(&0).copied().unwrap_or(0) as f64 / 8000.0;
        assert!(
            (0.70..0.80).contains(&heavy),
            "bucket 0 should own ~75% of names, got {:.3}",
            heavy
        );
    }

    #[test]
    fn test_resolve_memoizes_on_event() {
        let resolver = ShardResolver::new(topology(false, None));
        let mut event = RequestEvent::new("1", Verb::Get).unwrap();

        let first = resolver.resolve(&mut event).unwrap();
        assert_eq!(event.resolved_buckets(), Some(&first));

        // A later name change within the same call does not trigger a new resolution.
        event.name = "something-else".to_string();
        assert_eq!(resolver.resolve(&mut event).unwrap(), first);
    }

    #[test]
    fn test_resolve_decodes_encoded_names() {
        let resolver = ShardResolver::new(topology(true, Some(0)));
        let mut event = RequestEvent::new("00001_1", Verb::Get)
            .unwrap()
            .with_encoded(true);

        assert_eq!(
            resolver.resolve(&mut event).unwrap(),
            bucket_map(&[(0, 0), (1, 1)])
        );
    }

    #[test]
    fn test_resolve_hashes_when_encode_mode_off() {
        let resolver = ShardResolver::new(topology(false, None));
        let mut event = RequestEvent::new("00101_1", Verb::Get)
            .unwrap()
            .with_encoded(true);

        assert_eq!(
            resolver.resolve(&mut event).unwrap(),
            resolver.hash_buckets("00101_1")
        );
    }

    #[test]
    fn test_encode_rewrites_event_name() {
        let resolver = ShardResolver::new(topology(true, None));
        let mut event = RequestEvent::new("1", Verb::Put).unwrap();

        resolver.encode(&mut event).unwrap();
        assert_eq!(event.name, "00001_1");
        assert!(event.encoded);

        // Already encoded: untouched.
        resolver.encode(&mut event).unwrap();
        assert_eq!(event.name, "00001_1");
    }

    #[test]
    fn test_encode_is_noop_when_mode_off() {
        let resolver = ShardResolver::new(topology(false, None));
        let mut event = RequestEvent::new("1", Verb::Put).unwrap();

        resolver.encode(&mut event).unwrap();
        assert_eq!(event.name, "1");
        assert!(!event.encoded);
    }

    // ============================================================
    // CODEC TESTS
    // ============================================================

    #[test]
    fn test_codec_round_trip_every_bucket_map() {
        let topology = topology(true, None);
        for b0 in 0..2 {
            for b1 in 0..2 {
                let buckets = bucket_map(&[(0, b0), (1, b1)]);
                for name in ["1", "photo.jpg", "with_underscore", "ünïcode"] {
                    let encoded = codec::encode(&buckets, name).unwrap();
                    let (decoded, tail) = codec::decode(&encoded, topology.clusters()).unwrap();
                    assert_eq!(decoded, buckets);
                    assert_eq!(tail, name);
                }
            }
        }
    }

    #[test]
    fn test_codec_encodes_wide_bucket_indices() {
        let buckets = bucket_map(&[(0, 61), (1, 62)]);
        assert_eq!(codec::encode(&buckets, "x").unwrap(), "00Z10_x");

        let too_wide = bucket_map(&[(0, 62 * 62)]);
        assert!(matches!(
            codec::encode(&too_wide, "x"),
            Err(RouterError::NameFormat(_))
        ));
    }

    #[test]
    fn test_decode_rejects_odd_length_prefix() {
        let topology = topology(true, None);
        assert!(matches!(
            codec::decode("0001_x", topology.clusters()),
            Err(RouterError::NameFormat(_))
        ));
    }

    #[test]
    fn test_decode_rejects_out_of_range_bucket() {
        let topology = topology(true, None);
        match codec::decode("00002_x", topology.clusters()) {
            Err(RouterError::BucketRange { value, name }) => {
                assert_eq!(value, 2);
                assert_eq!(name, "00002_x");
            }
            other => panic!("expected bucket range error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_missing_separator() {
        let topology = topology(true, None);
        assert!(matches!(
            codec::decode("00001x", topology.clusters()),
            Err(RouterError::NameFormat(_))
        ));
    }

    #[test]
    fn test_decode_rejects_reserved_prefix_without_payload() {
        let topology = topology(true, None);
        for name in ["_x", "0_x", "_00001_x"] {
            assert!(
                matches!(
                    codec::decode(name, topology.clusters()),
                    Err(RouterError::NameFormat(_))
                ),
                "{} should not decode",
                name
            );
        }
    }

    #[test]
    fn test_decode_rejects_bad_digits_version_and_arity() {
        let topology = topology(true, None);
        for name in ["00-01_x", "10001_x", "001_x", "0000000_x"] {
            assert!(
                matches!(
                    codec::decode(name, topology.clusters()),
                    Err(RouterError::NameFormat(_))
                ),
                "{} should not decode",
                name
            );
        }
    }

    // ============================================================
    // SELECTOR TESTS
    // ============================================================

    #[test]
    fn test_replica_set_respects_cluster_restriction() {
        let health = Arc::new(HealthTracker::new(Duration::from_secs(60)));
        let buckets = bucket_map(&[(0, 0), (1, 1)]);

        let restricted = ReplicaSelector::new(topology(false, Some(0)), health.clone());
        assert_eq!(restricted.replica_set(&buckets), ids(&["000", "001", "002"]));

        let second = ReplicaSelector::new(topology(false, Some(1)), health.clone());
        assert_eq!(second.replica_set(&buckets), ids(&["110", "111", "112"]));

        let all = ReplicaSelector::new(topology(false, None), health);
        assert_eq!(
            all.replica_set(&buckets),
            ids(&["000", "001", "002", "110", "111", "112"])
        );
    }

    #[test]
    fn test_replica_ids_memoized_on_event() {
        let topology = topology(false, Some(0));
        let resolver = ShardResolver::new(topology.clone());
        let selector = ReplicaSelector::new(topology, Arc::new(HealthTracker::new(Duration::from_secs(60))));
        let mut event = RequestEvent::new("1", Verb::Get).unwrap();

        let first = selector.replica_ids(&resolver, &mut event).unwrap();
        assert_eq!(first, ids(&["000", "001", "002"]));
        assert!(event.replicas.is_some());
        assert_eq!(selector.replica_ids(&resolver, &mut event).unwrap(), first);
    }

    #[test]
    fn test_order_contains_every_healthy_replica_once() {
        let topology = topology(false, None);
        let selector = ReplicaSelector::new(topology, Arc::new(HealthTracker::new(Duration::from_secs(60))));
        let set = ids(&["000", "001", "002"]);
        let mut rng = StdRng::seed_from_u64(7);

        for verb in [Verb::Get, Verb::Put, Verb::Delete] {
            let ordered = selector.order(&set, verb, Instant::now(), &mut rng);
            let seen: BTreeSet<String> = ordered.iter().map(|r| r.id.clone()).collect();
            assert_eq!(ordered.len(), 3);
            assert_eq!(seen, set);
        }
    }

    #[test]
    fn test_zero_read_weight_excluded_from_reads_only() {
        let topology = weighted_topology(&[("a", 0), ("b", 2)], (1, 1));
        let selector = ReplicaSelector::new(topology, Arc::new(HealthTracker::new(Duration::from_secs(60))));
        let set = ids(&["a", "b"]);
        let mut rng = StdRng::seed_from_u64(1);

        let reads = selector.order(&set, Verb::Get, Instant::now(), &mut rng);
        assert_eq!(reads.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["b"]);

        let writes = selector.order(&set, Verb::Put, Instant::now(), &mut rng);
        assert_eq!(writes.len(), 2);
    }

    #[test]
    fn test_zero_weight_replica_never_tried_even_when_failed() {
        let topology = weighted_topology(&[("a", 0), ("b", 1)], (1, 1));
        let health = Arc::new(HealthTracker::new(Duration::from_secs(60)));
        let selector = ReplicaSelector::new(topology, health.clone());
        let now = Instant::now();
        health.record_failure_at("a", now);

        let reads = selector.order(&ids(&["a", "b"]), Verb::Get, now, &mut StdRng::seed_from_u64(3));
        assert_eq!(reads.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn test_failed_replicas_go_last_oldest_failure_first() {
        let topology = topology(false, None);
        let health = Arc::new(HealthTracker::new(Duration::from_secs(60)));
        let selector = ReplicaSelector::new(topology, health.clone());
        let base = Instant::now();
        health.record_failure_at("000", base + Duration::from_secs(20));
        health.record_failure_at("001", base + Duration::from_secs(10));

        let now = base + Duration::from_secs(30);
        let ordered = selector.order(
            &ids(&["000", "001", "002"]),
            Verb::Get,
            now,
            &mut StdRng::seed_from_u64(11),
        );

        assert_eq!(
            ordered.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
            vec!["002", "001", "000"]
        );
    }

    #[test]
    fn test_failed_replica_returns_after_retry_window() {
        let topology = topology(false, None);
        let health = Arc::new(HealthTracker::new(Duration::from_secs(60)));
        let selector = ReplicaSelector::new(topology, health.clone());
        let failed_at = Instant::now();
        health.record_failure_at("000", failed_at);
        let set = ids(&["000", "001"]);

        // Inside the window the failed replica is always last.
        for seed in 0..20 {
            let ordered = selector.order(
                &set,
                Verb::Put,
                failed_at + Duration::from_secs(59),
                &mut StdRng::seed_from_u64(seed),
            );
            assert_eq!(ordered[1].id, "000");
        }

        // Once the window has elapsed it competes again and sometimes comes first.
        let first_count = (0..200)
            .filter(|seed| {
                let ordered = selector.order(
                    &set,
                    Verb::Put,
                    failed_at + Duration::from_secs(60),
                    &mut StdRng::seed_from_u64(*seed),
                );
                ordered[0].id == "000"
            })
            .count();
        assert!(first_count > 0 && first_count < 200);
    }

    #[test]
    fn test_read_order_approximates_weights() {
        let topology = weighted_topology(&[("light", 1), ("heavy", 3)], (1, 1));
        let selector = ReplicaSelector::new(topology, Arc::new(HealthTracker::new(Duration::from_secs(60))));
        let set = ids(&["light", "heavy"]);
        let mut rng = StdRng::seed_from_u64(42);

        let trials = 4000;
        let heavy_first = (0..trials)
            .filter(|_| selector.order(&set, Verb::Get, Instant::now(), &mut rng)[0].id == "heavy")
            .count();

        let ratio = heavy_first as f64 / trials as f64;
        assert!(
            (0.70..0.80).contains(&ratio),
            "heavy replica should lead ~75% of the time, got {:.3}",
            ratio
        );
    }

    #[test]
    fn test_write_order_is_uniform() {
        let topology = weighted_topology(&[("light", 1), ("heavy", 9)], (1, 1));
        let selector = ReplicaSelector::new(topology, Arc::new(HealthTracker::new(Duration::from_secs(60))));
        let set = ids(&["light", "heavy"]);
        let mut rng = StdRng::seed_from_u64(5);

        let trials = 4000;
        let heavy_first = (0..trials)
            .filter(|_| selector.order(&set, Verb::Put, Instant::now(), &mut rng)[0].id == "heavy")
            .count();

        let ratio = heavy_first as f64 / trials as f64;
        assert!((0.45..0.55).contains(&ratio), "got {:.3}", ratio);
    }

    // ============================================================
    // HEALTH TRACKER TESTS
    // ============================================================

    #[test]
    fn test_health_window_boundaries() {
        let health = HealthTracker::new(Duration::from_secs(60));
        let failed_at = Instant::now();
        health.record_failure_at("000", failed_at);

        assert!(health.is_recently_failed("000", failed_at));
        assert!(health.is_recently_failed("000", failed_at + Duration::from_secs(59)));
        assert!(!health.is_recently_failed("000", failed_at + Duration::from_secs(60)));
        assert!(!health.is_recently_failed("001", failed_at));
        // Recovery is by time only; the record itself stays.
        assert_eq!(health.last_failed_at("000"), Some(failed_at));
    }

    #[test]
    fn test_health_snapshot_lists_recent_failures() {
        let health = HealthTracker::new(Duration::from_secs(60));
        health.record_failure("000");

        let snapshot = health.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot["000"] < Duration::from_secs(60));
    }

    #[test]
    fn test_health_concurrent_recording() {
        let health = Arc::new(HealthTracker::new(Duration::from_secs(60)));

        std::thread::scope(|scope| {
            for t in 0..8 {
                let health = health.clone();
                scope.spawn(move || {
                    for i in 0..100 {
                        health.record_failure(&format!("replica-{}", (t * 100 + i) % 50));
                    }
                });
            }
        });

        assert_eq!(health.snapshot().len(), 50);
    }
}
