//! Report command - cash flows of a brokerage account as tax tables

use crate::account::Account;
use crate::ledger::Broker;
use crate::rates::NbpClient;
use crate::report::display::{write_reports, OutputFormat};
use crate::report::ReportKind;
use clap::Args;
use std::io;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ReportCommand {
    /// Broker export file or a directory of them, may be repeated
    #[arg(short, long, required = true)]
    input: Vec<PathBuf>,

    /// Format of the input files
    #[arg(short, long, value_enum)]
    broker: Broker,

    /// File the exchange rates are cached in
    #[arg(long, default_value_os_t = super::default_cache())]
    cache: PathBuf,

    /// Split every report by calendar year
    #[arg(long)]
    by_year: bool,

    /// Only report this calendar year (implies --by-year)
    #[arg(short, long)]
    year: Option<i32>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Reports to print, in order
    #[arg(value_enum, required = true)]
    reports: Vec<ReportKind>,
}

impl ReportCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let mut account = Account::new(self.broker);
        account.load(&self.input)?;
        account.compute_with_cache(NbpClient::new()?, &self.cache)?;

        let by_year = self.by_year || self.year.is_some();
        let mut tables = Vec::new();
        for kind in &self.reports {
            let table = if by_year {
                account.report_by_year(*kind, self.year)?
            } else {
                account.report(*kind)?
            };
            tables.push((kind.title(), table));
        }
        write_reports(&tables, self.format, io::stdout().lock())?;

        if !account.warnings().is_empty() {
            log::info!("{} warning(s) raised", account.warnings().len());
        }
        Ok(())
    }
}
