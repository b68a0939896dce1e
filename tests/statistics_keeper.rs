//! Keeper behaviour, run against both accumulator variants.

use statistics_keeper::statistics::{ItemType, ItemValue, MapValue};
use statistics_keeper::{Action, BasicsKind, StatisticsConfig, StatisticsKeeper};

fn keepers() -> Vec<StatisticsKeeper> {
    BasicsKind::ALL
        .iter()
        .map(|&kind| StatisticsKeeper::with_basics("test", kind).unwrap())
        .collect()
}

fn value_by_name(keeper: &StatisticsKeeper, name: &str) -> f64 {
    let idx = keeper.item_index(name).unwrap();
    keeper.item_value(idx).unwrap().unwrap().as_f64()
}

fn interval_value(keeper: &StatisticsKeeper, idx: usize) -> Option<ItemValue> {
    keeper.interval_item_value(idx).unwrap()
}

fn assert_close(actual: f64, expected: f64, tolerance: f64, what: &str) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "{what}: expected {expected} ± {tolerance}, got {actual}"
    );
}

#[test]
fn linear_sequence() {
    for sk in keepers() {
        for i in 0..100 {
            sk.add_value(i);
        }

        let state = sk.cumulative();
        assert_eq!(state.count, 100);
        assert_eq!(state.min, Some(0));
        assert_eq!(state.max, Some(99));
        assert_eq!(state.sum, 4950);
        assert_eq!(state.sum_square, 328_350);
        assert_close(state.avg().unwrap(), 49.5, 0.001, "avg");
        assert_close(state.variance().unwrap(), 841.0, 0.001, "variance");
        assert_close(state.std_dev().unwrap(), 29.0, 0.001, "stdDev");

        assert_close(value_by_name(&sk, "p50"), 49.5, 0.5, "p50");
        assert_close(value_by_name(&sk, "p95"), 94.5, 1.5, "p95");
        assert_close(value_by_name(&sk, "p98"), 97.5, 2.5, "p98");
    }
}

#[test]
fn interval_follows_marks() {
    for sk in keepers() {
        let empty = [
            Some(ItemValue::Integer(0)), // count
            None,                        // min
            None,                        // max
            None,                        // avg
            Some(ItemValue::Integer(0)), // sum
            Some(ItemValue::Integer(0)), // sumSq
        ];
        for (idx, expected) in empty.iter().enumerate() {
            assert_eq!(&interval_value(&sk, idx), expected, "{}", sk.interval_item_name(idx).unwrap());
        }

        for i in 0..100 {
            sk.add_value(i);
        }
        let first = [
            Some(ItemValue::Integer(100)),
            Some(ItemValue::Integer(0)),
            Some(ItemValue::Integer(99)),
            Some(ItemValue::Number(49.5)),
            Some(ItemValue::Integer(4950)),
            Some(ItemValue::Integer(328_350)),
        ];
        for (idx, expected) in first.iter().enumerate() {
            assert_eq!(&interval_value(&sk, idx), expected, "{}", sk.interval_item_name(idx).unwrap());
        }

        let closed = sk.perform_action(Action::MarkFull);
        assert_eq!(closed.count, 100);
        for (idx, expected) in empty.iter().enumerate() {
            assert_eq!(&interval_value(&sk, idx), expected, "{}", sk.interval_item_name(idx).unwrap());
        }
        assert_eq!(sk.cumulative().count, 100);

        for i in 200..300 {
            sk.add_value(i);
        }
        let state = sk.cumulative();
        assert_eq!(state.count, 200);
        assert_eq!(state.min, Some(0));
        assert_eq!(state.max, Some(299));
        assert_close(state.avg().unwrap(), 149.5, 0.001, "avg");
        assert_eq!(state.sum, 29_900);
        assert_close(state.variance().unwrap(), 10_887.0, 0.001, "variance");

        let second = [
            Some(ItemValue::Integer(100)),
            Some(ItemValue::Integer(200)),
            Some(ItemValue::Integer(299)),
            Some(ItemValue::Number(249.5)),
            Some(ItemValue::Integer(24_950)),
            Some(ItemValue::Integer(6_308_350)),
        ];
        for (idx, expected) in second.iter().enumerate() {
            assert_eq!(&interval_value(&sk, idx), expected, "{}", sk.interval_item_name(idx).unwrap());
        }

        // interval distribution only holds the 200..300 run
        let p50 = sk.interval_item_value(sk.item_index("p50").unwrap()).unwrap().unwrap();
        assert_close(p50.as_f64(), 249.5, 0.5, "interval p50");
        let below_100 = sk.interval_item_value(sk.item_index("100ms").unwrap()).unwrap();
        assert_eq!(below_100, Some(ItemValue::Percentage(0.0)));
    }
}

#[test]
fn display_map() {
    for sk in keepers() {
        for i in 0..100 {
            sk.add_value(i * 100);
        }

        let map = sk.as_map();
        let rendered = |key: &str| map[key].to_string();
        assert_eq!(rendered("name"), "test");
        assert_eq!(rendered("count"), "100");
        assert_eq!(rendered("min"), "0");
        assert_eq!(rendered("max"), "9900");
        assert_eq!(rendered("avg"), "4950.0");
        assert_eq!(rendered("stdDev"), "2901.1");
        assert_eq!(rendered("100ms"), "1.0");
        assert_eq!(rendered("1000ms"), "10.0");
        assert_eq!(rendered("2000ms"), "20.0");
        assert_eq!(rendered("10000ms"), "100.0");

        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(keys, StatisticsKeeper::labels());
    }
}

#[test]
fn display_map_uses_configured_unit() {
    let config = StatisticsConfig {
        boundaries: vec![250, 500],
        unit: "us".into(),
        ..StatisticsConfig::default()
    };
    let sk = StatisticsKeeper::new("custom", &config).unwrap();
    sk.add_value(300);
    let map = sk.as_map();
    assert_eq!(map["250us"], MapValue::Percentage(0.0));
    assert_eq!(map["500us"], MapValue::Percentage(100.0));
    let schema: Vec<_> = StatisticsKeeper::map_schema(&config)
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    assert_eq!(schema, map.keys().cloned().collect::<Vec<_>>());
}

#[test]
fn labels_and_types() {
    let labels = StatisticsKeeper::labels();
    let types = StatisticsKeeper::types();

    assert_eq!(labels.len(), types.len());
    assert_eq!(labels[0], "name");
    assert_eq!(types[0], ItemType::String);
    assert_eq!(labels[1], "count");
    assert_eq!(types[1], ItemType::Integer);
    assert_eq!(types[1].to_string(), "INTEGER");
    assert_eq!(*types.last().unwrap(), ItemType::Percentage);
}

#[test]
fn reads_are_idempotent() {
    for sk in keepers() {
        for v in [5, 150, 1500, 15_000] {
            sk.add_value(v);
        }
        let first_map = sk.as_map();
        let first_snapshot = sk.snapshot();
        let first_items: Vec<_> = (0..sk.items().len()).map(|i| sk.item_value(i).unwrap()).collect();

        assert_eq!(sk.as_map(), first_map);
        assert_eq!(sk.snapshot(), first_snapshot);
        let again: Vec<_> = (0..sk.items().len()).map(|i| sk.item_value(i).unwrap()).collect();
        assert_eq!(again, first_items);
    }
}

#[test]
fn empty_keeper_has_no_derived_values() {
    for sk in keepers() {
        let snapshot = sk.snapshot();
        assert_eq!(snapshot.cumulative.avg, None);
        assert_eq!(snapshot.cumulative.std_dev, None);
        assert!(snapshot.cumulative.percentiles.iter().all(|p| p.value.is_none()));
        assert_eq!(sk.item_value(sk.item_index("p50").unwrap()).unwrap(), None);
        assert_eq!(sk.item_value(sk.item_index("100ms").unwrap()).unwrap(), None);
    }
}

#[test]
fn mark_on_empty_keeper_is_harmless() {
    for sk in keepers() {
        let closed = sk.perform_action(Action::MarkFull);
        assert_eq!(closed.count, 0);
        assert_eq!(closed.min, None);
        sk.add_value(7);
        assert_eq!(sk.interval().min, Some(7));
    }
}

#[test]
fn snapshot_serializes() {
    let sk = StatisticsKeeper::with_basics("json", BasicsKind::Direct).unwrap();
    sk.add_value(12);
    let json = serde_json::to_value(sk.snapshot()).unwrap();
    assert_eq!(json["name"], "json");
    assert_eq!(json["cumulative"]["count"], 1);
    assert_eq!(json["cumulative"]["min"], 12);
    assert_eq!(json["interval"]["buckets"][0]["cumulative_count"], 1);
}
