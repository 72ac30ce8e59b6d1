/// Report generation for SvcProbe
///
/// Aggregates the scan records into the final text table or JSON document
/// and handles report file output.

pub mod json;
pub mod table;

use crate::config::ScanConfig;
use crate::detection::ServiceRecord;
use crate::error::{ScanError, ScanResult};
use crate::output;
use crate::timer::Timer;
use tracing::info;

/// App title line used in banners and saved reports
pub fn app_title() -> String {
    format!("{} ({})", crate::NAME, crate::REPOSITORY)
}

/// Builder over the aggregated scan records
///
/// Records are sorted by ascending port number on construction; every
/// rendering below observes the same order.
pub struct ReportBuilder<'a> {
    config: &'a ScanConfig,
    timer: &'a Timer,
    records: Vec<ServiceRecord>,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(config: &'a ScanConfig, timer: &'a Timer, mut records: Vec<ServiceRecord>) -> Self {
        records.sort_by_key(|record| record.port);

        Self {
            config,
            timer,
            records,
        }
    }

    /// The sorted records backing this report
    pub fn records(&self) -> &[ServiceRecord] {
        &self.records
    }

    /// Render the text service table
    pub fn text_table(&self) -> String {
        table::render(&self.config.target, &self.records)
    }

    /// Render the JSON report document
    pub fn json_string(&self) -> String {
        json::render(self.config, self.timer, &self.records)
    }

    /// Render the scan summary block
    pub fn summary(&self, colorize: bool) -> String {
        let mut block = output::header("Scan Summary", colorize);

        block.push('\n');
        block.push_str(&output::field(
            "Duration  ",
            &self.timer.elapsed_str(),
            colorize,
        ));
        block.push('\n');
        block.push_str(&output::field(
            "Start Time",
            &self.timer.beg_timestamp(),
            colorize,
        ));
        block.push('\n');
        block.push_str(&output::field(
            "End Time  ",
            &self.timer.end_timestamp(),
            colorize,
        ));

        if self.config.out_path.is_some() {
            block.push('\n');
            block.push_str(&output::field(
                "Report    ",
                &self.config.quoted_out_path(),
                colorize,
            ));
        }

        block
    }

    /// Save the report to the configured output path
    pub fn save(&self) -> ScanResult<()> {
        let path = match &self.config.out_path {
            Some(path) => path,
            None => return Ok(()),
        };

        let content = if self.config.out_json {
            format!("{}\n", self.json_string())
        } else {
            format!(
                "{}\n\n{}\n\n{}",
                output::header(&app_title(), false),
                self.summary(false),
                self.text_table()
            )
        };

        std::fs::write(path, content).map_err(|e| {
            ScanError::file_path(path.display().to_string(), e.to_string())
        })?;

        info!("Scan report saved to '{}'", path.display());
        Ok(())
    }
}
