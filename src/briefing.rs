use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Local};
use error_stack::{Report, ResultExt, bail};
use tracing::{error, info, warn};

use crate::error::{BriefingError, IndicatorError};
use crate::indicator::change::change_percent;
use crate::indicator::rsi::Rsi;
use crate::market::MarketData;
use crate::model::{Currency, HistoryPeriod, PortfolioEntry, PriceSeries};
use crate::notifier::{Notifier, deliver};
use crate::status::RsiStatus;

/// Indicator snapshot for one portfolio entry.
#[derive(Debug, Clone)]
pub struct EntryReport {
    pub name: String,
    pub symbol: String,
    pub currency: Currency,
    pub close: f64,
    pub change_pct: f64,
    pub rsi: f64,
    pub status: RsiStatus,
}

impl EntryReport {
    pub fn message(&self) -> String {
        let icon = if self.change_pct > 0.0 { "📈" } else { "📉" };
        format!(
            "📊 {}\n💰 {} ({:.2}% {})\n🔥 RSI: {:.1} | {}",
            self.name,
            self.currency.format_price(self.close),
            self.change_pct,
            icon,
            self.rsi,
            self.status,
        )
    }
}

pub type EntryOutcome = Result<EntryReport, Report<BriefingError>>;

/// Compute the report for `entry` from an already fetched series.
pub fn analyze(entry: &PortfolioEntry, series: &PriceSeries, rsi: &Rsi) -> EntryOutcome {
    let closes = series.closes();

    let Some(latest_rsi) = rsi.latest(&closes) else {
        bail!(BriefingError::InsufficientData {
            required: rsi.required_points(),
            available: closes.len(),
        });
    };

    let change_pct = change_percent(&closes).map_err(|e| {
        let context = match e.current_context() {
            IndicatorError::InsufficientData {
                required,
                available,
            } => BriefingError::InsufficientData {
                required: *required,
                available: *available,
            },
            _ => BriefingError::Analysis {
                symbol: entry.symbol.clone(),
            },
        };
        e.change_context(context)
    })?;

    let close = series
        .latest()
        .map(|p| p.close)
        .ok_or_else(|| {
            Report::new(BriefingError::InsufficientData {
                required: 1,
                available: 0,
            })
        })?;

    Ok(EntryReport {
        name: entry.name.clone(),
        symbol: entry.symbol.clone(),
        currency: entry.currency,
        close,
        change_pct,
        rsi: latest_rsi,
        status: RsiStatus::classify(latest_rsi),
    })
}

/// Render any per-entry outcome as the chat message for that entry.
pub fn render_outcome(entry: &PortfolioEntry, outcome: &EntryOutcome) -> String {
    match outcome {
        Ok(report) => report.message(),
        Err(e) => match e.current_context() {
            BriefingError::InsufficientData { .. } => {
                format!("⚠️ {}: not enough price history.", entry.name)
            }
            other => format!("❌ Error while analyzing {}: {}", entry.name, other),
        },
    }
}

pub fn opening_message(started_at: &DateTime<Local>) -> String {
    format!(
        "☀️ Good morning!\nStarting the portfolio briefing as of {}.",
        started_at.format("%Y-%m-%d %H:%M")
    )
}

pub fn closing_message() -> String {
    "🏁 That concludes today's briefing. Happy investing!".into()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BriefingSummary {
    pub reported: usize,
    pub insufficient: usize,
    pub failed: usize,
}

impl BriefingSummary {
    fn record(&mut self, outcome: &EntryOutcome) {
        match outcome {
            Ok(_) => self.reported += 1,
            Err(e) if matches!(e.current_context(), BriefingError::InsufficientData { .. }) => {
                self.insufficient += 1
            }
            Err(_) => self.failed += 1,
        }
    }
}

impl fmt::Display for BriefingSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} reported, {} insufficient, {} failed",
            self.reported, self.insufficient, self.failed
        )
    }
}

/// One sequential briefing run over a portfolio.
pub struct Briefing<'a> {
    market: &'a dyn MarketData,
    notifier: &'a dyn Notifier,
    rsi: Rsi,
    period: HistoryPeriod,
    send_interval: Duration,
}

impl<'a> Briefing<'a> {
    pub fn new(
        market: &'a dyn MarketData,
        notifier: &'a dyn Notifier,
        rsi: Rsi,
        period: HistoryPeriod,
        send_interval: Duration,
    ) -> Self {
        Self {
            market,
            notifier,
            rsi,
            period,
            send_interval,
        }
    }

    /// Fetch and analyze a single entry.
    pub async fn evaluate(&self, entry: &PortfolioEntry) -> EntryOutcome {
        let series = self
            .market
            .fetch_history(&entry.symbol, self.period)
            .await
            .change_context(BriefingError::Fetch {
                symbol: entry.symbol.clone(),
            })?;
        analyze(entry, &series, &self.rsi)
    }

    /// Send the opening message, one message per entry, then the closing
    /// message. Per-entry failures are reported and never stop the run.
    pub async fn run(
        &self,
        entries: &[PortfolioEntry],
        started_at: DateTime<Local>,
    ) -> BriefingSummary {
        info!(
            entries = entries.len(),
            source = self.market.name(),
            channel = self.notifier.channel(),
            "briefing started"
        );
        deliver(self.notifier, &opening_message(&started_at)).await;

        let mut summary = BriefingSummary::default();
        for (i, entry) in entries.iter().enumerate() {
            info!(entry = %entry.name, symbol = %entry.symbol, "analyzing entry");

            let outcome = self.evaluate(entry).await;
            match &outcome {
                Ok(report) => info!(
                    symbol = %report.symbol,
                    close = report.close,
                    change_pct = report.change_pct,
                    rsi = report.rsi,
                    status = ?report.status,
                    "entry analyzed"
                ),
                Err(e) if matches!(e.current_context(), BriefingError::InsufficientData { .. }) => {
                    warn!(symbol = %entry.symbol, error = %e.current_context(), "skipping entry");
                }
                Err(e) => error!(symbol = %entry.symbol, error = ?e, "entry analysis failed"),
            }
            summary.record(&outcome);

            deliver(self.notifier, &render_outcome(entry, &outcome)).await;

            if i + 1 < entries.len() && !self.send_interval.is_zero() {
                tokio::time::sleep(self.send_interval).await;
            }
        }

        deliver(self.notifier, &closing_message()).await;
        info!(%summary, "briefing complete");
        summary
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use futures::future::BoxFuture;

    use super::*;
    use crate::error::{FetchError, NotifyError};
    use crate::model::PricePoint;

    fn series(closes: &[f64]) -> PriceSeries {
        let start = Utc.with_ymd_and_hms(2026, 7, 1, 0, 0, 0).unwrap();
        PriceSeries::new(
            closes
                .iter()
                .enumerate()
                .map(|(i, &close)| PricePoint {
                    timestamp: start + ChronoDuration::days(i as i64),
                    close,
                })
                .collect(),
        )
        .unwrap()
    }

    fn entry(name: &str, symbol: &str) -> PortfolioEntry {
        PortfolioEntry {
            name: name.into(),
            symbol: symbol.into(),
            currency: Currency::infer(symbol),
        }
    }

    fn rsi() -> Rsi {
        Rsi::new(14).unwrap()
    }

    fn started_at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 10, 18, 8, 30, 0).unwrap()
    }

    /// Serves canned closes per symbol; unknown symbols fail like a 404.
    struct FakeMarket {
        closes: HashMap<String, Vec<f64>>,
    }

    impl FakeMarket {
        fn new(data: &[(&str, Vec<f64>)]) -> Self {
            Self {
                closes: data
                    .iter()
                    .map(|(s, c)| ((*s).to_owned(), c.clone()))
                    .collect(),
            }
        }
    }

    impl MarketData for FakeMarket {
        fn name(&self) -> &str {
            "fake"
        }

        fn fetch_history(
            &self,
            symbol: &str,
            _period: HistoryPeriod,
        ) -> BoxFuture<'_, Result<PriceSeries, Report<FetchError>>> {
            let result = match self.closes.get(symbol) {
                Some(closes) => Ok(series(closes)),
                None => Err(Report::new(FetchError::NotFound {
                    symbol: symbol.to_owned(),
                })),
            };
            Box::pin(async move { result })
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingNotifier {
        fn messages(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl Notifier for RecordingNotifier {
        fn channel(&self) -> &str {
            "recording"
        }

        fn send<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<(), Report<NotifyError>>> {
            Box::pin(async move {
                self.sent.lock().unwrap().push(text.to_owned());
                if self.fail {
                    return Err(Report::new(NotifyError::Transport {
                        channel: "recording".into(),
                    }));
                }
                Ok(())
            })
        }
    }

    fn rising(len: usize) -> Vec<f64> {
        (0..len).map(|i| 100.0 + i as f64).collect()
    }

    #[test]
    fn flat_history_reports_neutral_midpoint() {
        let report = analyze(&entry("A", "A"), &series(&[50.0; 20]), &rsi()).unwrap();
        assert_eq!(report.rsi, 50.0);
        assert_eq!(report.status, RsiStatus::Neutral);
        assert_eq!(report.change_pct, 0.0);
        assert_eq!(report.close, 50.0);
    }

    #[test]
    fn rising_history_is_overbought() {
        let report = analyze(&entry("T", "TQQQ"), &series(&rising(30)), &rsi()).unwrap();
        assert_eq!(report.rsi, 100.0);
        assert_eq!(report.status, RsiStatus::Overbought);
        assert!(report.change_pct > 0.0);
    }

    #[test]
    fn falling_history_is_oversold() {
        let closes: Vec<f64> = rising(30).into_iter().rev().collect();
        let report = analyze(&entry("T", "TQQQ"), &series(&closes), &rsi()).unwrap();
        assert!(report.rsi.abs() < 1e-9);
        assert_eq!(report.status, RsiStatus::Oversold);
    }

    #[test]
    fn short_history_is_insufficient() {
        for len in [0, 1, 10, 14] {
            let err = analyze(&entry("S", "S"), &series(&rising(len)), &rsi()).unwrap_err();
            assert!(
                matches!(
                    err.current_context(),
                    BriefingError::InsufficientData { required: 15, available } if *available == len
                ),
                "len {len}"
            );
        }
    }

    #[test]
    fn report_message_usd() {
        let report = EntryReport {
            name: "TQQQ 🇺🇸".into(),
            symbol: "TQQQ".into(),
            currency: Currency::Usd,
            close: 52.104,
            change_pct: 1.234,
            rsi: 65.43,
            status: RsiStatus::Neutral,
        };
        assert_eq!(
            report.message(),
            "📊 TQQQ 🇺🇸\n💰 $52.10 (1.23% 📈)\n🔥 RSI: 65.4 | ⚪ Neutral"
        );
    }

    #[test]
    fn report_message_krw_falling() {
        let report = EntryReport {
            name: "Kakao".into(),
            symbol: "035720.KS".into(),
            currency: Currency::Krw,
            close: 41_250.0,
            change_pct: -2.5,
            rsi: 28.0,
            status: RsiStatus::Oversold,
        };
        assert_eq!(
            report.message(),
            "📊 Kakao\n💰 ₩41,250 (-2.50% 📉)\n🔥 RSI: 28.0 | 🟢 Oversold (opportunity)"
        );
    }

    #[test]
    fn insufficient_outcome_renders_notice() {
        let e = entry("SGOV", "SGOV");
        let outcome: EntryOutcome = Err(Report::new(BriefingError::InsufficientData {
            required: 15,
            available: 3,
        }));
        assert_eq!(render_outcome(&e, &outcome), "⚠️ SGOV: not enough price history.");
    }

    #[test]
    fn failed_outcome_names_entry() {
        let e = entry("SGOV", "SGOV");
        let outcome: EntryOutcome = Err(Report::new(BriefingError::Fetch {
            symbol: "SGOV".into(),
        }));
        let text = render_outcome(&e, &outcome);
        assert!(text.starts_with("❌"));
        assert!(text.contains("SGOV"));
    }

    #[test]
    fn opening_message_carries_start_time() {
        assert!(opening_message(&started_at()).contains("2026-10-18 08:30"));
    }

    #[tokio::test]
    async fn failed_fetch_does_not_abort_batch() {
        let market = FakeMarket::new(&[
            ("A", rising(20)),
            ("C", vec![50.0; 20]),
            ("D", rising(20)),
        ]);
        let notifier = RecordingNotifier::default();
        let briefing = Briefing::new(
            &market,
            &notifier,
            rsi(),
            HistoryPeriod::Month3,
            Duration::ZERO,
        );
        let entries = [
            entry("A", "A"),
            entry("B", "B"),
            entry("C", "C"),
            entry("D", "D"),
        ];

        let summary = briefing.run(&entries, started_at()).await;

        assert_eq!(
            summary,
            BriefingSummary {
                reported: 3,
                insufficient: 0,
                failed: 1
            }
        );
        let messages = notifier.messages();
        assert_eq!(messages.len(), 6);
        assert!(messages[0].starts_with("☀️"));
        assert!(messages[1].starts_with("📊 A"));
        assert!(messages[2].starts_with("❌") && messages[2].contains("B"));
        assert!(messages[3].starts_with("📊 C"));
        assert!(messages[4].starts_with("📊 D"));
        assert_eq!(messages[5], closing_message());
    }

    #[tokio::test]
    async fn insufficient_entry_is_skipped_with_notice() {
        let market = FakeMarket::new(&[("A", rising(5)), ("B", rising(20))]);
        let notifier = RecordingNotifier::default();
        let briefing = Briefing::new(
            &market,
            &notifier,
            rsi(),
            HistoryPeriod::Month3,
            Duration::ZERO,
        );

        let summary = briefing
            .run(&[entry("A", "A"), entry("B", "B")], started_at())
            .await;

        assert_eq!(summary.insufficient, 1);
        assert_eq!(summary.reported, 1);
        let messages = notifier.messages();
        assert_eq!(messages[1], "⚠️ A: not enough price history.");
        assert!(messages[2].starts_with("📊 B"));
    }

    #[tokio::test]
    async fn notifier_failures_do_not_stop_run() {
        let market = FakeMarket::new(&[("A", rising(20)), ("B", rising(20))]);
        let notifier = RecordingNotifier {
            fail: true,
            ..Default::default()
        };
        let briefing = Briefing::new(
            &market,
            &notifier,
            rsi(),
            HistoryPeriod::Month3,
            Duration::ZERO,
        );

        let summary = briefing
            .run(&[entry("A", "A"), entry("B", "B")], started_at())
            .await;

        assert_eq!(summary.reported, 2);
        assert_eq!(notifier.messages().len(), 4);
    }

    #[tokio::test]
    async fn empty_portfolio_still_opens_and_closes() {
        let market = FakeMarket::new(&[]);
        let notifier = RecordingNotifier::default();
        let briefing = Briefing::new(
            &market,
            &notifier,
            rsi(),
            HistoryPeriod::Month3,
            Duration::ZERO,
        );

        let summary = briefing.run(&[], started_at()).await;

        assert_eq!(summary, BriefingSummary::default());
        assert_eq!(notifier.messages().len(), 2);
    }

    #[tokio::test]
    async fn send_interval_paces_entries() {
        let market = FakeMarket::new(&[("A", rising(20)), ("B", rising(20))]);
        let notifier = RecordingNotifier::default();
        let briefing = Briefing::new(
            &market,
            &notifier,
            rsi(),
            HistoryPeriod::Month3,
            Duration::from_millis(50),
        );

        let start = std::time::Instant::now();
        briefing
            .run(&[entry("A", "A"), entry("B", "B")], started_at())
            .await;

        // One pause between two entries, none after the last.
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
