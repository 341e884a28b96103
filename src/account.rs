use crate::cashflow::{match_ledger, partition_by_year, CashFlows, YearlyCashFlows};
use crate::ledger::{load_paths, Broker, Ledger};
use crate::rates::{ExchangeRates, NbpRates, RateCache, RateError, RateSource};
use crate::report::{ReportError, ReportKind, Table};
use crate::warnings::Warnings;
use anyhow::Context;
use std::path::{Path, PathBuf};

/// A brokerage account: its ledger, the cash flows matched from it and the
/// warnings raised along the way.
#[derive(Debug)]
pub struct Account {
    broker: Broker,
    ledger: Ledger,
    cash_flows: CashFlows,
    warnings: Warnings,
}

impl Account {
    pub fn new(broker: Broker) -> Self {
        Account {
            broker,
            ledger: Ledger::default(),
            cash_flows: CashFlows::new(),
            warnings: Warnings::default(),
        }
    }

    pub fn from_ledger(broker: Broker, ledger: Ledger) -> Self {
        Account {
            ledger,
            ..Self::new(broker)
        }
    }

    /// Adds the broker exports at `paths` (files or directories) to the ledger.
    pub fn load(&mut self, paths: &[PathBuf]) -> anyhow::Result<()> {
        let ledger = load_paths(paths, self.broker.format(), &mut self.warnings)?;
        self.ledger.extend(ledger);
        if self.ledger.is_empty() {
            log::warn!("No transactions found in {} input(s)", paths.len());
        }
        log::info!(
            "Loaded {} symbol(s) from {} input(s)",
            self.ledger.symbols().count(),
            paths.len()
        );
        Ok(())
    }

    pub fn compute<R>(&mut self, rates: &mut R) -> Result<&CashFlows, RateError>
    where
        R: ExchangeRates + ?Sized,
    {
        self.cash_flows = match_ledger(&self.ledger, rates, &mut self.warnings)?;
        Ok(&self.cash_flows)
    }

    /// Computes the cash flows with rates from `source`, reading and then
    /// updating the rate cache at `cache_path`. Rates fetched before a failed
    /// lookup are still saved.
    pub fn compute_with_cache<S: RateSource>(
        &mut self,
        source: S,
        cache_path: &Path,
    ) -> anyhow::Result<()> {
        let mut rates = NbpRates::new(source, RateCache::load(cache_path));
        let result = self.compute(&mut rates).map(|_| ());
        rates
            .cache()
            .save()
            .with_context(|| format!("saving rate cache {}", cache_path.display()))?;
        result.context("computing cash flows")
    }

    pub fn cash_flows(&self) -> &CashFlows {
        &self.cash_flows
    }

    pub fn yearly_cash_flows(&self) -> YearlyCashFlows {
        partition_by_year(&self.cash_flows)
    }

    pub fn warnings(&self) -> &Warnings {
        &self.warnings
    }

    pub fn report(&self, kind: ReportKind) -> Result<Table, ReportError> {
        kind.build(&self.cash_flows)
    }

    /// Year-keyed report, optionally limited to one calendar year.
    pub fn report_by_year(&self, kind: ReportKind, year: Option<i32>) -> Result<Table, ReportError> {
        let mut yearly = self.yearly_cash_flows();
        if let Some(year) = year {
            yearly.retain(|y, _| *y == year);
        }
        kind.build_by_year(&yearly)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::parse_rows;
    use crate::rates::FixedRate;
    use crate::report::Cell;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn exante_rows() -> Vec<Vec<String>> {
        [
            ["1", "", "ABC", "ISIN", "TRADE", "2020-01-01 00:00:00", "150", "ABC"],
            ["2", "", "ABC", "None", "TRADE", "2020-01-01 00:00:00", "-1500", "USD"],
            ["3", "", "ABC", "None", "COMMISSION", "2020-01-01 00:00:00", "-3.0", "USD"],
            ["4", "", "ABC", "ISIN", "TRADE", "2020-02-01 00:00:00", "-50", "ABC"],
            ["5", "", "ABC", "None", "TRADE", "2020-02-01 00:00:00", "1000", "USD"],
            ["6", "", "ABC", "None", "COMMISSION", "2020-02-01 00:00:00", "-3.0", "USD"],
            ["7", "", "XYZ", "ISIN", "TRADE", "2021-01-01 00:00:00", "10", "XYZ"],
            ["8", "", "XYZ", "None", "TRADE", "2021-01-01 00:00:00", "-100", "USD"],
            ["9", "", "XYZ", "None", "COMMISSION", "2021-01-01 00:00:00", "-1", "USD"],
            ["10", "", "XYZ", "ISIN", "TRADE", "2021-01-02 00:00:00", "-10", "XYZ"],
            ["11", "", "XYZ", "None", "TRADE", "2021-01-02 00:00:00", "100", "USD"],
            ["12", "", "XYZ", "None", "COMMISSION", "2021-01-02 00:00:00", "-1", "USD"],
            ["13", "", "QQQ", "None", "DIVIDEND", "2020-03-01 00:00:00", "60.10", "USD"],
            ["14", "", "QQQ", "None", "TAX", "2020-03-01 00:00:00", "-2.2", "USD"],
            ["15", "", "SHORT", "ISIN", "TRADE", "2020-03-01 00:00:00", "-5", "SHORT"],
            ["16", "", "SHORT", "None", "TRADE", "2020-03-01 00:00:00", "50", "USD"],
            ["17", "", "SHORT", "None", "COMMISSION", "2020-03-01 00:00:00", "-1", "USD"],
        ]
        .iter()
        .map(|row| row.iter().map(|f| f.to_string()).collect())
        .collect()
    }

    fn account() -> Account {
        let mut warnings = Warnings::default();
        let ledger = parse_rows(exante_rows(), Broker::Exante.format(), &mut warnings);
        assert!(warnings.is_empty());
        let mut account = Account::from_ledger(Broker::Exante, ledger);
        account.compute(&mut FixedRate(dec!(2))).unwrap();
        account
    }

    fn amounts(row: &[Cell]) -> Vec<Decimal> {
        row.iter().filter_map(Cell::as_decimal).collect()
    }

    #[test]
    fn trade_reports() {
        let account = account();

        let foreign = account.report(ReportKind::Foreign).unwrap();
        assert_eq!(foreign.rows.len(), 2);
        assert_eq!(amounts(&foreign.rows[0]), vec![dec!(1000), dec!(504), dec!(496), dec!(4)]);
        assert_eq!(amounts(&foreign.rows[1]), vec![dec!(100), dec!(102), dec!(-2), dec!(2)]);

        let total = account.report(ReportKind::Total).unwrap();
        assert_eq!(amounts(&total.rows[0]), vec![dec!(2200), dec!(1212), dec!(988)]);
    }

    #[test]
    fn dividend_reports() {
        let account = account();
        let home = account.report(ReportKind::DividendHome).unwrap();
        assert_eq!(
            amounts(&home.rows[0]),
            vec![dec!(120.20), dec!(4.40), dec!(4), dec!(22.84), dec!(18)]
        );
    }

    #[test]
    fn sell_only_symbol_is_warned_about() {
        let account = account();
        assert!(!account.cash_flows().contains_key("SHORT"));
        let messages: Vec<_> = account.warnings().iter().map(|w| w.to_string()).collect();
        assert_eq!(messages, vec!["No BUY transactions for symbol: SHORT."]);
    }

    #[test]
    fn year_filter() {
        let account = account();

        let all = account.report_by_year(ReportKind::Total, None).unwrap();
        assert_eq!(all.rows.len(), 2);

        let only = account.report_by_year(ReportKind::Total, Some(2021)).unwrap();
        assert_eq!(only.rows.len(), 1);
        assert_eq!(only.rows[0][0], Cell::Text("2021".to_string()));
        assert_eq!(amounts(&only.rows[0]), vec![dec!(200), dec!(204), dec!(-4)]);
    }

    #[test]
    fn cache_is_saved_after_compute() {
        struct Offline;

        impl RateSource for Offline {
            fn fetch(
                &self,
                _currency: &str,
                _date: chrono::NaiveDate,
            ) -> Result<Option<Decimal>, RateError> {
                Ok(Some(dec!(3.8986)))
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join(".cache");
        let mut account = account();
        account.compute_with_cache(Offline, &cache_path).unwrap();

        let cache = RateCache::load(&cache_path);
        // one entry per distinct transaction date
        assert_eq!(cache.len(), 5);
        let income: Decimal = amounts(&account.report(ReportKind::Total).unwrap().rows[0])[0];
        assert_eq!(income, dec!(4288.46));
    }
}
