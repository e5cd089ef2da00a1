//! End-to-end tests for the sifting pipeline.

use chrono::{Duration, TimeZone, Utc};
use log_sifter::{
    detect_bursts, Criteria, DetectedSignal, Evaluator, Event, EventGroup, EventGrouper,
    GroupMember, GroupingRule, SifterConfig, SignalDetector, Sifter, Symptom, Timestamp,
};
use std::sync::Arc;

fn base() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 5, 20, 9, 0, 0).unwrap()
}

/// One event per tag, one second apart
fn events(tags: &[&str]) -> Vec<Event> {
    tags.iter()
        .enumerate()
        .map(|(i, tag)| Event::new(*tag, base() + Duration::seconds(i as i64)))
        .collect()
}

/// Events at explicit second offsets
fn timed(points: &[(&str, i64)]) -> Vec<Event> {
    points
        .iter()
        .map(|(tag, s)| Event::new(*tag, base() + Duration::seconds(*s)))
        .collect()
}

#[test]
fn interleaved_sequences_pair_first_in_first_out() {
    let output = EventGrouper::new(vec![GroupingRule::new("dog", ["D", "O", "G"])])
        .group(&events(&["D", "D", "O", "O", "G", "G"]));

    assert_eq!(output.groups.len(), 2);
    let starts: Vec<Timestamp> = output
        .groups
        .iter()
        .map(|g| g.first_trigger().timestamp)
        .collect();
    assert_eq!(starts, vec![base(), base() + Duration::seconds(1)]);
}

#[test]
fn context_events_join_only_later_groups() {
    let rule = GroupingRule::new("dog", ["D", "O", "G"]).with_context(["X", "Y"]);
    let stream = events(&["Y", "D", "X", "O", "G", "D", "O", "G"]);
    let output = EventGrouper::new(vec![rule]).group(&stream);

    assert_eq!(output.groups.len(), 2);
    for group in &output.groups {
        assert_eq!(group.event_count(), 4);
        assert_eq!(group.context_events().count(), 1);
        let triggers: Vec<&str> = group.trigger_events().map(|e| e.tag.as_str()).collect();
        assert_eq!(triggers, vec!["D", "O", "G"]);
    }
    assert_eq!(output.groups[0].context_events().next().unwrap().tag, "Y");
    assert_eq!(output.groups[1].context_events().next().unwrap().tag, "X");
}

#[test]
fn independent_sequences_round_trip() {
    let stages = ["boot", "scan", "ready", "scan"];
    let n = 5;
    let tags: Vec<&str> = (0..n).flat_map(|_| stages.iter().copied()).collect();
    let output =
        EventGrouper::new(vec![GroupingRule::new("startup", stages)]).group(&events(&tags));

    assert_eq!(output.groups.len(), n);
    for group in &output.groups {
        let triggers: Vec<&str> = group.trigger_events().map(|e| e.tag.as_str()).collect();
        assert_eq!(triggers, stages.to_vec());
    }
}

#[test]
fn interleaved_instances_keep_their_own_context() {
    let rule = GroupingRule::new("xfer", ["req", "ack"]).with_context(["note"]);
    let stream = events(&["note", "req", "note", "req", "ack", "ack"]);
    let output = EventGrouper::new(vec![rule]).group(&stream);

    assert_eq!(output.groups.len(), 2);
    let context_times = |i: usize| -> Vec<Timestamp> {
        output.groups[i].context_events().map(|e| e.timestamp).collect()
    };
    let first_ctx = context_times(0);
    let second_ctx = context_times(1);
    assert_eq!(first_ctx, vec![base()]);
    assert_eq!(second_ctx, vec![base() + Duration::seconds(2)]);
}

#[test]
fn repeat_and_existence_counts() {
    let groups: Vec<Arc<EventGroup>> = (0..4)
        .map(|i| {
            let event = Event::new("t", base() + Duration::minutes(i));
            let members = vec![GroupMember::Trigger(event)];
            Arc::new(EventGroup::from_members("tick", members).unwrap())
        })
        .collect();

    assert_eq!(SignalDetector::repeat_group("r", "tick").detect(&groups).len(), 3);
    let existence = SignalDetector::existence("e", "tick").detect(&groups);
    assert_eq!(existence.len(), 4);
    assert!(existence.iter().all(|s| s.interval.is_none()));
}

#[test]
fn burst_scenario_splits_on_innocents_and_tag_changes() {
    let signals: Vec<DetectedSignal> = ["A", "A", "A", "B", "C", "C", "A", "A"]
        .iter()
        .enumerate()
        .map(|(i, tag)| {
            let event = Event::new("e", base() + Duration::seconds(i as i64));
            let members = vec![GroupMember::Trigger(event)];
            let group = Arc::new(EventGroup::from_members("g", members).unwrap());
            DetectedSignal::single(*tag, None, group)
        })
        .collect();
    let confirmed: Vec<usize> = (0..signals.len()).filter(|&i| signals[i].tag != "B").collect();
    let symptoms: Vec<Symptom> = confirmed
        .iter()
        .map(|&i| Symptom::new(signals[i].tag.clone(), "Investigate.", signals[i].clone()))
        .collect();

    let summary = detect_bursts(&signals, &confirmed, &symptoms);

    assert_eq!(summary.burst_dict["A"].len(), 2);
    assert_eq!(summary.burst_dict["C"].len(), 1);
    assert_eq!(summary.burst_dict["A"][0].symptom_count, 3);
    assert_eq!(summary.burst_dict["A"][1].symptom_count, 2);
}

#[test]
fn rescan_loop_end_to_end() {
    let sifter = Sifter::builder()
        .declare_event_tags(["hotplug", "start_rescan", "finish_rescan"])
        .add_grouping_rule(
            GroupingRule::new("platform_rescan", ["start_rescan", "finish_rescan"])
                .with_context(["hotplug"]),
        )
        .add_criteria(Criteria::new(
            "Rescan Loop Mode",
            SignalDetector::repeat_group("platform_rescan_signal", "platform_rescan"),
            Evaluator::LessThan(Duration::seconds(5)),
            "Please contact hardware maintainer.",
        ))
        .config(SifterConfig::new().with_statistics(true))
        .build()
        .unwrap();

    // Three quick rescans, a long pause, then two more quick ones
    let stream = timed(&[
        ("hotplug", 0),
        ("start_rescan", 1),
        ("finish_rescan", 2),
        ("start_rescan", 4),
        ("finish_rescan", 5),
        ("start_rescan", 7),
        ("finish_rescan", 8),
        ("start_rescan", 60),
        ("finish_rescan", 61),
        ("start_rescan", 63),
        ("finish_rescan", 64),
    ]);
    let report = sifter.sift(&stream);

    assert_eq!(report.group_count, 5);
    assert_eq!(report.symptoms.len(), 3);
    assert_eq!(report.bursts.len(), 2);
    assert_eq!(report.bursts[0].symptom_count, 2);
    assert_eq!(report.bursts[1].symptom_count, 1);
    assert_eq!(report.bursts[0].burst_start_timestamp, base() + Duration::seconds(1));

    let stats = &report.statistics["platform_rescan_signal"];
    assert_eq!(stats.intervals.unwrap().max, 52.0);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["symptom_bursts"].as_array().unwrap().len(), 2);
    assert!(json["statistics"]["platform_rescan_signal"]["hourly_rate"].is_number());
}
