use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Candle widths accepted by the klines endpoints.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Timeframe {
    #[serde(rename = "1s")]
    OneSecond,
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "3m")]
    ThreeMinutes,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "2h")]
    TwoHours,
    #[serde(rename = "4h")]
    FourHours,
    #[serde(rename = "8h")]
    EightHours,
    #[serde(rename = "12h")]
    TwelveHours,
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "3d")]
    ThreeDays,
    #[serde(rename = "1w")]
    OneWeek,
    #[serde(rename = "1M")]
    OneMonth,
}

impl Timeframe {
    pub const ALL: [Timeframe; 15] = [
        Timeframe::OneSecond,
        Timeframe::OneMinute,
        Timeframe::ThreeMinutes,
        Timeframe::FiveMinutes,
        Timeframe::FifteenMinutes,
        Timeframe::ThirtyMinutes,
        Timeframe::OneHour,
        Timeframe::TwoHours,
        Timeframe::FourHours,
        Timeframe::EightHours,
        Timeframe::TwelveHours,
        Timeframe::OneDay,
        Timeframe::ThreeDays,
        Timeframe::OneWeek,
        Timeframe::OneMonth,
    ];

    /// Width of one candle in seconds. A month is counted as 30 days.
    pub const fn duration_seconds(self) -> i64 {
        match self {
            Timeframe::OneSecond => 1,
            Timeframe::OneMinute => 60,
            Timeframe::ThreeMinutes => 180,
            Timeframe::FiveMinutes => 300,
            Timeframe::FifteenMinutes => 900,
            Timeframe::ThirtyMinutes => 1_800,
            Timeframe::OneHour => 3_600,
            Timeframe::TwoHours => 7_200,
            Timeframe::FourHours => 14_400,
            Timeframe::EightHours => 28_800,
            Timeframe::TwelveHours => 43_200,
            Timeframe::OneDay => 86_400,
            Timeframe::ThreeDays => 259_200,
            Timeframe::OneWeek => 604_800,
            Timeframe::OneMonth => 2_592_000,
        }
    }

    pub const fn duration_millis(self) -> i64 {
        self.duration_seconds() * 1_000
    }

    pub const fn label(self) -> &'static str {
        match self {
            Timeframe::OneSecond => "1s",
            Timeframe::OneMinute => "1m",
            Timeframe::ThreeMinutes => "3m",
            Timeframe::FiveMinutes => "5m",
            Timeframe::FifteenMinutes => "15m",
            Timeframe::ThirtyMinutes => "30m",
            Timeframe::OneHour => "1h",
            Timeframe::TwoHours => "2h",
            Timeframe::FourHours => "4h",
            Timeframe::EightHours => "8h",
            Timeframe::TwelveHours => "12h",
            Timeframe::OneDay => "1d",
            Timeframe::ThreeDays => "3d",
            Timeframe::OneWeek => "1w",
            Timeframe::OneMonth => "1M",
        }
    }
}

impl FromStr for Timeframe {
    type Err = Error;

    fn from_str(label: &str) -> Result<Self> {
        // "1m" and "1M" differ only by case, so no case folding here
        Timeframe::ALL
            .into_iter()
            .find(|tf| tf.label() == label)
            .ok_or_else(|| Error::UnknownTimeframe(label.to_string()))
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Look up the duration of a timeframe label.
pub fn duration_seconds(label: &str) -> Result<i64> {
    label.parse::<Timeframe>().map(Timeframe::duration_seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_label_round_trips() {
        for tf in Timeframe::ALL {
            assert_eq!(tf.label().parse::<Timeframe>().unwrap(), tf);
            assert_eq!(tf.to_string(), tf.label());
            assert!(tf.duration_seconds() > 0);
        }
    }

    #[test]
    fn durations_match_registry() {
        assert_eq!(duration_seconds("1s").unwrap(), 1);
        assert_eq!(duration_seconds("1h").unwrap(), 3_600);
        assert_eq!(duration_seconds("12h").unwrap(), 43_200);
        assert_eq!(duration_seconds("1w").unwrap(), 7 * 86_400);
        assert_eq!(duration_seconds("1M").unwrap(), 30 * 86_400);
    }

    #[test]
    fn minute_and_month_are_distinct() {
        assert_eq!("1m".parse::<Timeframe>().unwrap(), Timeframe::OneMinute);
        assert_eq!("1M".parse::<Timeframe>().unwrap(), Timeframe::OneMonth);
    }

    #[test]
    fn unknown_label_is_rejected() {
        for label in ["6h", "", "1H", "2d"] {
            match duration_seconds(label) {
                Err(Error::UnknownTimeframe(l)) => assert_eq!(l, label),
                other => panic!("expected UnknownTimeframe for {label:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn serde_uses_labels() {
        let json = serde_json::to_string(&Timeframe::FifteenMinutes).unwrap();
        assert_eq!(json, "\"15m\"");
        let tf: Timeframe = serde_json::from_str("\"1M\"").unwrap();
        assert_eq!(tf, Timeframe::OneMonth);
    }
}
