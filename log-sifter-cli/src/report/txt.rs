//! Terminal text report

use super::{format_duration, Verbosity};
use log_sifter::{SiftReport, StatisticsSummary, SymptomBurst};
use std::fmt::{self, Write};

const RULE: &str = "------------------------------------";

/// Render the report at the requested verbosity
pub fn render(report: &SiftReport, verbosity: Verbosity) -> Result<String, fmt::Error> {
    let mut out = String::new();
    if report.is_empty() {
        writeln!(out, "No symptoms detected.")?;
        return Ok(out);
    }

    match verbosity {
        Verbosity::Low => render_tags(&mut out, report)?,
        Verbosity::Medium => {
            for burst in &report.bursts {
                render_burst(&mut out, burst)?;
            }
        }
        Verbosity::High => {
            for burst in &report.bursts {
                render_burst(&mut out, burst)?;
                render_symptoms(&mut out, burst)?;
            }
            for summary in report.statistics.values() {
                render_statistics(&mut out, summary)?;
            }
        }
    }
    Ok(out)
}

fn render_tags(out: &mut String, report: &SiftReport) -> fmt::Result {
    for (tag, bursts) in &report.burst_dict {
        let Some(first) = bursts.first() else {
            continue;
        };
        writeln!(out, "\n{}", tag)?;
        writeln!(out, "{}", RULE)?;
        writeln!(out, "{} symptom detected.", tag)?;
        writeln!(out, "{}", first.action_msg)?;
        writeln!(out, "{}", RULE)?;
    }
    Ok(())
}

fn render_burst(out: &mut String, burst: &SymptomBurst) -> fmt::Result {
    writeln!(out, "\n{} Burst", burst.tag)?;
    writeln!(out, "{}", RULE)?;
    writeln!(out, "{}", burst.burst_start_timestamp)?;
    writeln!(out, "({}) {} symptoms detected.", burst.symptom_count, burst.tag)?;
    writeln!(out, "Burst duration: {}", format_duration(&burst.duration))?;
    writeln!(out, "{}", burst.action_msg)?;
    writeln!(out, "{}", RULE)
}

fn render_symptoms(out: &mut String, burst: &SymptomBurst) -> fmt::Result {
    for (i, symptom) in burst.symptoms.iter().enumerate() {
        writeln!(
            out,
            "  #{} {} (duration {})",
            i + 1,
            symptom.start_timestamp,
            format_duration(&symptom.duration)
        )?;
    }
    Ok(())
}

fn render_statistics(out: &mut String, summary: &StatisticsSummary) -> fmt::Result {
    writeln!(out, "\n{} Statistics", summary.signal_tag)?;
    writeln!(out, "{}", RULE)?;
    writeln!(out, "Hourly rate: {:.3}", summary.hourly_rate)?;
    for (hour, count) in &summary.hourly_counts {
        writeln!(out, "  {:02}:00  {}", hour, count)?;
    }
    let d = &summary.durations;
    writeln!(
        out,
        "Durations (s): mean {:.3} std {:.3} min {:.3} max {:.3}",
        d.mean, d.std, d.min, d.max
    )?;
    match &summary.intervals {
        Some(i) => writeln!(
            out,
            "Intervals (s): mean {:.3} std {:.3} min {:.3} max {:.3}",
            i.mean, i.std, i.min, i.max
        )?,
        None => writeln!(out, "Intervals (s): none")?,
    }
    writeln!(out, "{}", RULE)
}
