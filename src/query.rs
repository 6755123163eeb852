use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

use crate::models::{CityOrigin, EventQueryIntent, QueryParameters, QueryScope};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
const JUST_ANNOUNCED_WINDOW_DAYS: i64 = 7;
const WEEKEND_SORT: &str = "date,asc";

/// Builds the intent-specific search parameters.
///
/// Search always targets its own city text. The other intents target
/// `scope`; without one they carry no location filter at all. Classification
/// and page size are added by the fetcher.
pub fn build_params(
    intent: &EventQueryIntent,
    scope: Option<&QueryScope>,
    now: DateTime<Utc>,
) -> QueryParameters {
    let params = match (intent, scope) {
        (EventQueryIntent::Search { city }, _) => {
            return scoped(&QueryScope::Searched(city.clone()))
        }
        (_, Some(scope)) => scoped(scope),
        (_, None) => QueryParameters::new(CityOrigin::Detected),
    };

    match intent {
        EventQueryIntent::Featured | EventQueryIntent::Search { .. } => params,
        EventQueryIntent::JustAnnounced => {
            params.with("publicVisibilityStartDateTime", just_announced_since(now))
        }
        EventQueryIntent::ThisWeekend => {
            let friday = next_friday(now.date_naive());
            let sunday = friday + Duration::days(2);
            params
                .with("startDateTime", format!("{}T00:00:00Z", friday.format("%Y-%m-%d")))
                .with("endDateTime", format!("{}T23:59:59Z", sunday.format("%Y-%m-%d")))
                .with("sort", WEEKEND_SORT)
        }
    }
}

fn scoped(scope: &QueryScope) -> QueryParameters {
    match scope {
        QueryScope::Detected(city) => {
            QueryParameters::new(CityOrigin::Detected).with("city", city.as_str())
        }
        QueryScope::Searched(city) => {
            QueryParameters::new(CityOrigin::Searched).with("city", city.as_str())
        }
        QueryScope::Market(dma) => QueryParameters::new(CityOrigin::Market).with("dmaId", *dma),
    }
}

/// The coming Friday, or `today` itself when it is a Friday.
pub fn next_friday(today: NaiveDate) -> NaiveDate {
    let weekday = i64::from(today.weekday().num_days_from_sunday());
    let offset = ((7 - weekday) % 7 + 5) % 7;
    today + Duration::days(offset)
}

/// Start of the "just announced" window, formatted without fractional seconds.
pub fn just_announced_since(now: DateTime<Utc>) -> String {
    (now - Duration::days(JUST_ANNOUNCED_WINDOW_DAYS))
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::models::ParamValue;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 15, 42, 7)
            .single()
            .expect("valid test datetime")
            + Duration::milliseconds(861)
    }

    fn text(params: &QueryParameters, key: &str) -> Option<String> {
        params.get(key).map(ToString::to_string)
    }

    fn detected(city: &str) -> QueryScope {
        QueryScope::Detected(city.to_string())
    }

    #[test]
    fn featured_only_carries_city() {
        let params = build_params(&EventQueryIntent::Featured, Some(&detected("Boise")), at(2025, 10, 8));
        assert_eq!(params.len(), 1);
        assert_eq!(text(&params, "city").as_deref(), Some("Boise"));
        assert_eq!(params.origin, CityOrigin::Detected);
    }

    #[test]
    fn just_announced_strips_sub_second_precision() {
        let params = build_params(
            &EventQueryIntent::JustAnnounced,
            Some(&detected("Boise")),
            at(2025, 10, 8),
        );
        assert_eq!(
            text(&params, "publicVisibilityStartDateTime").as_deref(),
            Some("2025-10-01T15:42:07Z")
        );
        assert_eq!(text(&params, "city").as_deref(), Some("Boise"));
    }

    #[test]
    fn next_friday_offsets_match_weekday_table() {
        // 2025-10-05 is a Sunday.
        let expected = [5, 4, 3, 2, 1, 0, 6];
        for (i, offset) in expected.iter().enumerate() {
            let today = NaiveDate::from_ymd_opt(2025, 10, 5 + i as u32).expect("valid date");
            let friday = next_friday(today);
            assert_eq!((friday - today).num_days(), *offset, "weekday index {i}");
            assert_eq!(friday.weekday(), chrono::Weekday::Fri);
        }
    }

    #[test]
    fn this_weekend_from_wednesday() {
        let params = build_params(
            &EventQueryIntent::ThisWeekend,
            Some(&detected("Boise")),
            at(2025, 10, 8),
        );
        assert_eq!(text(&params, "startDateTime").as_deref(), Some("2025-10-10T00:00:00Z"));
        assert_eq!(text(&params, "endDateTime").as_deref(), Some("2025-10-12T23:59:59Z"));
        assert_eq!(text(&params, "sort").as_deref(), Some("date,asc"));
    }

    #[test]
    fn this_weekend_on_friday_starts_today() {
        let params = build_params(
            &EventQueryIntent::ThisWeekend,
            Some(&detected("Boise")),
            at(2025, 10, 10),
        );
        assert_eq!(text(&params, "startDateTime").as_deref(), Some("2025-10-10T00:00:00Z"));
        assert_eq!(text(&params, "endDateTime").as_deref(), Some("2025-10-12T23:59:59Z"));
    }

    #[test]
    fn this_weekend_rolls_over_month_end() {
        // Saturday 2025-11-29 -> Friday 2025-12-05.
        let params = build_params(
            &EventQueryIntent::ThisWeekend,
            Some(&detected("Boise")),
            at(2025, 11, 29),
        );
        assert_eq!(text(&params, "startDateTime").as_deref(), Some("2025-12-05T00:00:00Z"));
        assert_eq!(text(&params, "endDateTime").as_deref(), Some("2025-12-07T23:59:59Z"));
    }

    #[test]
    fn search_ignores_detected_scope() {
        let intent = EventQueryIntent::Search {
            city: "Portland".to_string(),
        };
        let params = build_params(&intent, Some(&detected("Boise")), at(2025, 10, 8));
        assert_eq!(params.origin, CityOrigin::Searched);
        assert_eq!(text(&params, "city").as_deref(), Some("Portland"));
        assert_eq!(params.len(), 1);

        let without_scope = build_params(&intent, None, at(2025, 10, 8));
        assert_eq!(without_scope, params);
    }

    #[test]
    fn market_scope_uses_dma_id() {
        let params = build_params(
            &EventQueryIntent::JustAnnounced,
            Some(&QueryScope::Market(222)),
            at(2025, 10, 8),
        );
        assert_eq!(params.origin, CityOrigin::Market);
        assert_eq!(params.get("dmaId"), Some(&ParamValue::Number(222)));
        assert!(!params.contains("city"));
    }

    #[test]
    fn build_is_deterministic_for_fixed_now() {
        let now = at(2025, 10, 8);
        let scope = detected("Boise");
        for intent in [
            EventQueryIntent::Featured,
            EventQueryIntent::JustAnnounced,
            EventQueryIntent::ThisWeekend,
            EventQueryIntent::Search {
                city: "Boise".to_string(),
            },
        ] {
            assert_eq!(
                build_params(&intent, Some(&scope), now),
                build_params(&intent, Some(&scope), now)
            );
        }
    }
}
