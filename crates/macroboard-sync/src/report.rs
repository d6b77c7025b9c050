use crate::endp::monday::Item;
use colored::Colorize;

/// One row that could not be synced, with enough context to act on from the
/// summary alone.
#[derive(Debug)]
pub struct RowFailure {
    pub name: String,
    pub symbol: String,
    pub item_id: String,
    pub error: String,
}

/// Counters for one run; built fresh every time, printed, thrown away.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub updated: usize,
    pub skipped: usize,
    pub failures: Vec<RowFailure>,
}

impl RunSummary {
    pub fn record_update(&mut self) {
        self.updated += 1;
    }

    pub fn record_skip(&mut self) {
        self.skipped += 1;
    }

    pub fn record_failure(&mut self, item: &Item, symbol: &str, error: &anyhow::Error) {
        self.failures.push(RowFailure {
            name: item.name.clone(),
            symbol: symbol.to_string(),
            item_id: item.id.clone(),
            error: format!("{error:#}"),
        });
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Console report; the run's only output artifact besides the board
    /// mutations themselves.
    pub fn print(&self) {
        println!();
        println!(
            "{} updated | {} skipped | {} failed",
            self.updated.to_string().green(),
            self.skipped.to_string().yellow(),
            self.failed().to_string().red(),
        );

        if !self.failures.is_empty() {
            println!("{}", "failures:".red());
            for failure in &self.failures {
                println!(
                    "  [{}] {} ({}): {}",
                    failure.symbol, failure.name, failure.item_id, failure.error
                );
            }
        }
    }
}
