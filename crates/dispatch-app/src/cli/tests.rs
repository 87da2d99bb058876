use chrono_tz::Tz;
use clap::Parser;
use dispatch_core::types::DateKey;

use super::{Cli, Command, DateArg};

#[test_log::test]
fn date_arg_keywords() {
    assert_eq!("today".parse::<DateArg>(), Ok(DateArg::Today));
    assert_eq!("Tomorrow".parse::<DateArg>(), Ok(DateArg::Tomorrow));
    assert_eq!("all".parse::<DateArg>(), Ok(DateArg::All));
}

#[test_log::test]
fn date_arg_explicit_day() {
    let parsed = "2025-01-01".parse::<DateArg>();
    assert_eq!(
        parsed,
        Ok(DateArg::Day(DateKey::parse("2025-01-01").expect("date")))
    );
    assert!("2025-1-1".parse::<DateArg>().is_err());
    assert!("yesterday".parse::<DateArg>().is_err());
}

#[test_log::test]
fn all_resolves_to_aggregate_partition() {
    assert!(matches!(DateArg::All.resolve(Tz::Asia__Tokyo), Ok(None)));
}

#[test_log::test]
fn tomorrow_is_the_day_after_today() {
    let today = DateArg::Today
        .resolve(Tz::Asia__Tokyo)
        .expect("today")
        .expect("dated");
    let tomorrow = DateArg::Tomorrow
        .resolve(Tz::Asia__Tokyo)
        .expect("tomorrow")
        .expect("dated");

    // Midnight may pass between the two calls.
    assert!(tomorrow > today);
    assert!(tomorrow <= today.succ().and_then(DateKey::succ).expect("in range"));
}

#[test_log::test]
fn parses_assign_command() {
    let cli = Cli::try_parse_from([
        "dispatch",
        "assign",
        "2025-01-01",
        "--shop",
        "s1",
        "--cast-id",
        "c1",
        "--cast-name",
        "Aoi",
        "--rate",
        "1500",
        "--order",
        "o1",
    ])
    .expect("valid command line");

    assert_eq!(
        cli.command,
        Command::Assign {
            date: DateArg::Day(DateKey::parse("2025-01-01").expect("date")),
            shop: "s1".to_string(),
            cast_id: Some("c1".to_string()),
            cast_code: String::new(),
            cast_name: "Aoi".to_string(),
            rate: 1500.0,
            note: None,
            order: Some("o1".to_string()),
        }
    );
}

#[test_log::test]
fn assign_requires_rate() {
    let result = Cli::try_parse_from(["dispatch", "assign", "today", "--shop", "s1"]);
    assert!(result.is_err());
}

#[test_log::test]
fn invalid_date_is_a_usage_error() {
    let result = Cli::try_parse_from(["dispatch", "show", "01/01/2025"]);
    assert!(result.is_err());
}

#[test_log::test]
fn date_arg_round_trips_through_display() {
    for raw in ["today", "tomorrow", "all", "2025-01-01"] {
        let parsed: DateArg = raw.parse().expect("valid date argument");
        assert_eq!(parsed.to_string(), raw);
    }
}
