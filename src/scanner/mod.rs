// 52-week new-high / new-low scanner
//
// Lists flagged instruments that actually traded, biggest companies first.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{CrossSection, ExtremeFlags, ExtremeKind, GroupMembership, InstrumentSeries};

const VOLUME_LOOKBACK: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScannerRow {
    pub instrument_id: String,
    pub name: String,
    pub close: f64,
    pub change_pct: Option<f64>,
    pub volume: f64,
    pub market_cap: Option<f64>,
    pub sector: Option<String>,
    /// Today's volume over the mean of up to 20 prior trading sessions
    pub vol_ratio: Option<f64>,
}

/// Today's volume relative to the preceding trading sessions
pub fn volume_ratio(series: &InstrumentSeries, date: NaiveDate, lookback: usize) -> Option<f64> {
    let positions = series.trading_positions();
    let idx = series.trading_index_of(date)?;
    let prior = &positions[idx.saturating_sub(lookback)..idx];
    if prior.is_empty() {
        return None;
    }

    let bars = series.bars();
    let avg = prior.iter().map(|&p| bars[p].volume).sum::<f64>() / prior.len() as f64;
    Some(bars[positions[idx]].volume / avg)
}

/// Rows for every trading instrument flagged with `kind`, sorted by market
/// cap descending (missing caps last, ties in cross-section order)
pub fn scan(
    kind: ExtremeKind,
    cross_section: &CrossSection,
    flags: &ExtremeFlags,
    sectors: &GroupMembership,
    series: &[InstrumentSeries],
) -> Vec<ScannerRow> {
    let series_by_id: HashMap<&str, &InstrumentSeries> =
        series.iter().map(|s| (s.instrument_id(), s)).collect();

    let mut rows: Vec<ScannerRow> = cross_section
        .rows
        .iter()
        .filter(|r| r.is_trading() && flags.contains(&r.instrument_id, kind))
        .map(|r| ScannerRow {
            instrument_id: r.instrument_id.clone(),
            name: r.name.clone(),
            close: r.close,
            change_pct: r.change_pct(),
            volume: r.volume,
            market_cap: r.market_cap,
            sector: sectors.group_of(&r.instrument_id).map(str::to_string),
            vol_ratio: series_by_id
                .get(r.instrument_id.as_str())
                .and_then(|s| volume_ratio(s, cross_section.date, VOLUME_LOOKBACK)),
        })
        .collect();

    rows.sort_by(|a, b| match (a.market_cap, b.market_cap) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });

    tracing::debug!(?kind, count = rows.len(), "scanner rows built");
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Bar, CrossSectionRow};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, day).unwrap()
    }

    fn row(id: &str, cap: Option<f64>, volume: f64) -> CrossSectionRow {
        CrossSectionRow {
            instrument_id: id.to_string(),
            name: id.to_lowercase(),
            close: 110.0,
            volume,
            prior_close: Some(100.0),
            ma20: None,
            history_days: 30,
            market_cap: cap,
        }
    }

    #[test]
    fn test_volume_ratio_uses_prior_sessions() {
        let bars = [(2, 100.0), (3, 0.0), (4, 300.0), (5, 400.0)]
            .iter()
            .map(|&(day, volume)| Bar {
                instrument_id: "A".to_string(),
                date: date(day),
                open: 1.0,
                high: 1.0,
                low: 1.0,
                close: 1.0,
                volume,
            })
            .collect();
        let series = InstrumentSeries::new("A", "", bars).unwrap();

        // Halted session skipped: 400 / mean(100, 300)
        assert_eq!(volume_ratio(&series, date(5), 20), Some(2.0));
        assert_eq!(volume_ratio(&series, date(2), 20), None);
        assert_eq!(volume_ratio(&series, date(3), 20), None);
        assert_eq!(volume_ratio(&series, date(5), 1), Some(400.0 / 300.0));
        assert_eq!(volume_ratio(&series, date(9), 20), None);
    }

    #[test]
    fn test_scan_filters_and_orders_by_cap() {
        let cs = CrossSection::new(
            date(11),
            vec![
                row("NOCAP", None, 10.0),
                row("SMALL", Some(10.0), 10.0),
                row("HALT", Some(999.0), 0.0),
                row("BIG", Some(500.0), 10.0),
                row("LOW", Some(800.0), 10.0),
            ],
        );
        let flags: ExtremeFlags = vec![
            ("NOCAP".to_string(), ExtremeKind::High),
            ("SMALL".to_string(), ExtremeKind::High),
            ("HALT".to_string(), ExtremeKind::High),
            ("BIG".to_string(), ExtremeKind::High),
            ("LOW".to_string(), ExtremeKind::Low),
        ]
        .into_iter()
        .collect();
        let mut sectors = GroupMembership::new();
        sectors.insert("Semis", vec!["BIG"]);

        let highs = scan(ExtremeKind::High, &cs, &flags, &sectors, &[]);
        let ids: Vec<&str> = highs.iter().map(|r| r.instrument_id.as_str()).collect();

        assert_eq!(ids, vec!["BIG", "SMALL", "NOCAP"]);
        assert_eq!(highs[0].sector.as_deref(), Some("Semis"));
        assert!((highs[0].change_pct.unwrap() - 10.0).abs() < 1e-9);
        assert_eq!(highs[0].vol_ratio, None);

        let lows = scan(ExtremeKind::Low, &cs, &flags, &sectors, &[]);
        assert_eq!(lows.len(), 1);
    }
}
