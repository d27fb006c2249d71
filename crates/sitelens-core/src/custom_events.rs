//! Custom event deduplication and listing.
//!
//! Every non-system event is reduced to a signature of its type and
//! properties; occurrences with the same signature share one aggregate row.
//! Listings group those rows back by `(event_type, sample_properties)`.

use std::cmp::Ordering;
use std::collections::HashMap;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::error::{CoreError, Result};
use crate::event::{is_system_event, Event, Properties};
use crate::signature::event_signature;
use crate::store::{AggregateMerge, AggregateRow};

/// Maximum rows returned by either custom-event listing.
pub const TOP_EVENTS_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomEventStat {
    pub event_type: String,
    pub count: i64,
    pub sample_properties: Properties,
    pub common_properties: Properties,
}

/// Build the merge for one incoming event observed at `now`.
///
/// Returns `Ok(None)` for system events, which are never aggregated.
pub fn merge_for_event(event: &Event, now: DateTime<Utc>) -> Result<Option<AggregateMerge>> {
    event.validate()?;
    if is_system_event(&event.event_type) {
        return Ok(None);
    }

    let signature = event_signature(&event.event_type, &event.properties);
    let sample_properties = serde_json::to_string(&event.properties)
        .context("failed to serialize event properties")
        .map_err(CoreError::Persistence)?;

    Ok(Some(AggregateMerge {
        website_id: event.website_id.clone(),
        event_type: event.event_type.clone(),
        signature,
        sample_properties,
        seen_at: now,
    }))
}

/// Group aggregate rows into the top custom events by total count.
///
/// Rows whose stored sample cannot be decoded are skipped.
pub fn top_event_stats(rows: Vec<AggregateRow>) -> Vec<CustomEventStat> {
    let mut groups: HashMap<(String, String), CustomEventStat> = HashMap::new();

    for row in rows {
        let signature = row.signature.clone();
        let aggregate = match row.decode() {
            Ok(aggregate) => aggregate,
            Err(err) => {
                warn!(signature = %signature, error = %err, "Skipping custom event aggregate with undecodable sample");
                continue;
            }
        };
        // BTreeMap serialization is canonical, so equal samples share a key.
        let sample_key = serde_json::to_string(&aggregate.sample_properties).unwrap_or_default();
        groups
            .entry((aggregate.event_type.clone(), sample_key))
            .and_modify(|stat| stat.count += aggregate.count)
            .or_insert_with(|| CustomEventStat {
                event_type: aggregate.event_type,
                count: aggregate.count,
                common_properties: common_properties(&aggregate.sample_properties),
                sample_properties: aggregate.sample_properties,
            });
    }

    rank(groups.into_values().collect())
}

/// Count non-system events per type straight from the event source.
///
/// The sample is the newest non-empty property set of each type.
pub fn event_type_stats(events: &[Event]) -> Vec<CustomEventStat> {
    struct TypeTally<'a> {
        count: i64,
        sample: Option<(&'a Properties, DateTime<Utc>)>,
    }

    let mut tallies: HashMap<&str, TypeTally<'_>> = HashMap::new();
    for event in events.iter().filter(|e| !is_system_event(&e.event_type)) {
        let tally = tallies.entry(event.event_type.as_str()).or_insert(TypeTally {
            count: 0,
            sample: None,
        });
        tally.count += 1;
        if event.properties.is_empty() {
            continue;
        }
        let newer = match tally.sample {
            Some((_, seen)) => event.created_at > seen,
            None => true,
        };
        if newer {
            tally.sample = Some((&event.properties, event.created_at));
        }
    }

    let stats = tallies
        .into_iter()
        .map(|(event_type, tally)| {
            let sample = tally.sample.map(|(p, _)| p.clone()).unwrap_or_default();
            CustomEventStat {
                event_type: event_type.to_string(),
                count: tally.count,
                common_properties: common_properties(&sample),
                sample_properties: sample,
            }
        })
        .collect();
    rank(stats)
}

// Properties shared across samples of a type are not analysed yet; the
// single stored sample stands in for them.
fn common_properties(sample: &Properties) -> Properties {
    sample.clone()
}

fn rank(mut stats: Vec<CustomEventStat>) -> Vec<CustomEventStat> {
    stats.sort_by(|a, b| match b.count.cmp(&a.count) {
        Ordering::Equal => a.event_type.cmp(&b.event_type),
        other => other,
    });
    stats.truncate(TOP_EVENTS_LIMIT);
    stats
}
