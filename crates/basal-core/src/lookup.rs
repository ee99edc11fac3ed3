//! Date resolution for schedule queries.
//!
//! A query date resolves to a stored schedule in three tiers, stopping at the
//! first that yields a result:
//!
//! 1. a schedule dated exactly on the target;
//! 2. the most recent schedule dated on or before the target;
//! 3. the earliest schedule in the store, when the target precedes them all.
//!
//! Storage backends implement [`ScheduleLookup`]; [`resolve`] owns the policy.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// How a resolved schedule relates to the requested date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// The schedule is dated on the requested day.
    Exact,
    /// The closest schedule dated before the requested day.
    Prior,
    /// Nothing precedes the requested day; this is the earliest schedule.
    Earliest,
}

impl MatchKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Prior => "prior",
            Self::Earliest => "earliest",
        }
    }

    pub const fn is_fallback(self) -> bool {
        !matches!(self, Self::Exact)
    }
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lookup result tagged with how it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<T> {
    pub entry: T,
    pub kind: MatchKind,
}

impl<T> Resolved<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resolved<U> {
        Resolved {
            entry: f(self.entry),
            kind: self.kind,
        }
    }
}

/// Date-keyed queries a schedule store answers.
///
/// Implementations pick the newest entry when several share a date.
pub trait ScheduleLookup {
    type Entry;
    type Error;

    fn find_exact(&self, date: NaiveDate) -> Result<Option<Self::Entry>, Self::Error>;

    fn find_latest_on_or_before(&self, date: NaiveDate)
    -> Result<Option<Self::Entry>, Self::Error>;

    fn find_earliest(&self) -> Result<Option<Self::Entry>, Self::Error>;
}

/// Resolves `target` to a schedule entry.
///
/// Returns `Ok(None)` only when the store holds no schedules at all.
pub fn resolve<L>(lookup: &L, target: NaiveDate) -> Result<Option<Resolved<L::Entry>>, L::Error>
where
    L: ScheduleLookup + ?Sized,
{
    if let Some(entry) = lookup.find_exact(target)? {
        return Ok(Some(Resolved {
            entry,
            kind: MatchKind::Exact,
        }));
    }
    if let Some(entry) = lookup.find_latest_on_or_before(target)? {
        tracing::debug!(%target, "no exact schedule, using closest prior");
        return Ok(Some(Resolved {
            entry,
            kind: MatchKind::Prior,
        }));
    }
    if let Some(entry) = lookup.find_earliest()? {
        tracing::debug!(%target, "target precedes all schedules, using earliest");
        return Ok(Some(Resolved {
            entry,
            kind: MatchKind::Earliest,
        }));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::convert::Infallible;

    use super::*;

    struct MemoryIndex(BTreeMap<NaiveDate, &'static str>);

    impl ScheduleLookup for MemoryIndex {
        type Entry = &'static str;
        type Error = Infallible;

        fn find_exact(&self, date: NaiveDate) -> Result<Option<Self::Entry>, Self::Error> {
            Ok(self.0.get(&date).copied())
        }

        fn find_latest_on_or_before(
            &self,
            date: NaiveDate,
        ) -> Result<Option<Self::Entry>, Self::Error> {
            Ok(self.0.range(..=date).next_back().map(|(_, v)| *v))
        }

        fn find_earliest(&self) -> Result<Option<Self::Entry>, Self::Error> {
            Ok(self.0.values().next().copied())
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn two_schedules() -> MemoryIndex {
        MemoryIndex(BTreeMap::from([
            (date("2024-01-01"), "new-year"),
            (date("2024-01-10"), "tenth"),
        ]))
    }

    #[test]
    fn exact_date_wins() {
        let resolved = resolve(&two_schedules(), date("2024-01-10")).unwrap().unwrap();
        assert_eq!(resolved.entry, "tenth");
        assert_eq!(resolved.kind, MatchKind::Exact);
        assert!(!resolved.kind.is_fallback());
    }

    #[test]
    fn falls_back_to_closest_prior() {
        let resolved = resolve(&two_schedules(), date("2024-01-05")).unwrap().unwrap();
        assert_eq!(resolved.entry, "new-year");
        assert_eq!(resolved.kind, MatchKind::Prior);
    }

    #[test]
    fn future_date_uses_latest() {
        let resolved = resolve(&two_schedules(), date("2025-06-01")).unwrap().unwrap();
        assert_eq!(resolved.entry, "tenth");
        assert_eq!(resolved.kind, MatchKind::Prior);
    }

    #[test]
    fn date_before_everything_uses_earliest() {
        let resolved = resolve(&two_schedules(), date("2023-01-01")).unwrap().unwrap();
        assert_eq!(resolved.entry, "new-year");
        assert_eq!(resolved.kind, MatchKind::Earliest);
        assert!(resolved.kind.is_fallback());
    }

    #[test]
    fn empty_store_resolves_to_none() {
        let empty = MemoryIndex(BTreeMap::new());
        assert_eq!(resolve(&empty, date("2024-01-01")).unwrap(), None);
    }

    #[test]
    fn match_kind_display_and_map() {
        assert_eq!(MatchKind::Earliest.to_string(), "earliest");
        let resolved = Resolved {
            entry: 1,
            kind: MatchKind::Prior,
        }
        .map(|id| id * 10);
        assert_eq!(resolved.entry, 10);
        assert_eq!(resolved.kind, MatchKind::Prior);
    }
}
