//! Property-based tests for the task data model.
//!
//! Uses proptest to verify:
//! 1. Date auto-correction always lands on a real calendar date for
//!    numeric day/month/year input, clamping month and day.
//! 2. Auto-correcting an already valid display date leaves it unchanged.
//! 3. Random bytes never cause a panic in the decoders.
//! 4. Collection decoding keeps valid records and reports the rest.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use chrono::Datelike;
use join_proto::date::TaskDate;
use join_proto::task::{self, TaskStatus};
use proptest::prelude::*;
use serde_json::{Map, Value, json};

fn arb_status() -> impl Strategy<Value = TaskStatus> {
    prop::sample::select(TaskStatus::ALL.to_vec())
}

/// A record value that decodes, or one that does not.
fn arb_record_value() -> impl Strategy<Value = (Value, bool)> {
    prop_oneof![
        (
            any::<u32>(),
            arb_status(),
            proptest::option::of(any::<u32>()),
            "[a-zA-Z ]{0,20}",
        )
            .prop_map(|(id, status, sequence, title)| {
                let record = json!({
                    "addTaskId": id,
                    "status": status,
                    "sequence": sequence,
                    "title": title,
                });
                (record, true)
            }),
        any::<i64>().prop_map(|n| (json!(n), false)),
        "[a-z]{0,8}".prop_map(|s| (json!({"addTaskId": s, "status": "todo"}), false)),
        Just((json!({"addTaskId": 1, "status": "archived"}), false)),
    ]
}

proptest! {
    #[test]
    fn autocorrect_always_yields_valid_date(
        day in 0u32..100,
        month in 0u32..100,
        year in 0u32..10_000,
    ) {
        let input = format!("{day}/{month}/{year}");
        let date = TaskDate::autocorrect(&input).unwrap().as_naive();

        let expected_year = if year < 100 { 2000 + year } else { year };
        prop_assert_eq!(date.year(), i32::try_from(expected_year).unwrap());
        prop_assert_eq!(date.month(), month.clamp(1, 12));
        prop_assert!(date.day() <= day.max(1));
        if (1..=28).contains(&day) {
            prop_assert_eq!(date.day(), day);
        }
    }

    #[test]
    fn autocorrect_keeps_valid_dates(days in 0i64..36_500) {
        let base = chrono::NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        let date = TaskDate::new(base + chrono::Duration::days(days));
        prop_assert_eq!(TaskDate::autocorrect(&date.to_string()), Some(date));
        prop_assert_eq!(TaskDate::parse(&date.to_string()).unwrap(), date);
    }

    #[test]
    fn random_bytes_never_panic(data in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = task::decode_collection(&data);
        let _ = task::decode_record(&data);
    }

    #[test]
    fn collection_decoding_splits_good_and_bad(
        records in prop::collection::btree_map("[a-z0-9]{1,12}", arb_record_value(), 0..16),
    ) {
        let good = records.values().filter(|(_, ok)| *ok).count();
        let body: Map<String, Value> = records
            .iter()
            .map(|(key, (value, _))| (key.clone(), value.clone()))
            .collect();
        let bytes = serde_json::to_vec(&Value::Object(body)).unwrap();

        let (tasks, rejected) = task::decode_collection(&bytes).unwrap();
        prop_assert_eq!(tasks.len(), good);
        prop_assert_eq!(rejected.len(), records.len() - good);
        for bad in &rejected {
            prop_assert!(!records[bad.key.as_str()].1);
        }
    }
}
