//! Output formatting for campaign reports

use anyhow::Result;
use serde_json::json;
use vigil_common::{CampaignReport, ProbeOutcome, ProbeStatus};
use vigil_orchestrator::format_duration;

use crate::args::OutputFormat;

/// Print the final report in the requested format.
///
/// In text mode the per-probe lines and sweep summaries were already
/// streamed by the collector, so only the campaign totals remain.
pub fn print_report(report: &CampaignReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", render_json(report)?),
        OutputFormat::Csv => print!("{}", render_csv(report)),
        OutputFormat::Text => println!("{}", render_totals(report)),
    }
    Ok(())
}

fn render_totals(report: &CampaignReport) -> String {
    let totals = report.totals();
    let mut out = String::new();
    out.push_str(&format!("\n{:-<60}\n", ""));
    out.push_str("📊 Campaign Summary:\n");
    out.push_str(&format!("  Sweeps: {}\n", report.sweeps.len()));
    out.push_str(&format!("  Total probed: {}\n", totals.completed()));
    out.push_str(&format!("  ✅ Succeeded: {}\n", totals.succeeded));
    out.push_str(&format!("  ❌ Failed: {}\n", totals.failed));
    for (kind, count) in &totals.failures_by_kind {
        out.push_str(&format!("       {}: {}\n", kind, count));
    }
    out.push_str(&format!("  ⏰ Timed out: {}\n", totals.timed_out));
    out.push_str(&format!("  ⏱️  Duration: {}\n", format_duration(report.elapsed)));
    if report.interrupted {
        out.push_str("  🛑 Interrupted before completion\n");
    } else {
        out.push_str("\n✅ All concurrent tasks completed.\n");
    }
    out
}

/// Human-readable detail of an outcome, without the marker.
fn detail(outcome: &ProbeOutcome) -> String {
    match &outcome.status {
        ProbeStatus::Success { payload } => payload.to_string(),
        ProbeStatus::Failure { kind, message } => format!("{}: {}", kind, message),
        ProbeStatus::Timeout => "timed out".to_string(),
    }
}

fn render_json(report: &CampaignReport) -> Result<String> {
    let sweeps: Vec<serde_json::Value> = report
        .sweeps
        .iter()
        .map(|sweep| {
            let outcomes: Vec<serde_json::Value> = sweep
                .outcomes
                .iter()
                .map(|o| {
                    json!({
                        "target": o.target,
                        "kind": o.kind,
                        "status": o.status.label(),
                        "detail": detail(o),
                        "result": o.status,
                        "elapsed_ms": o.elapsed.as_secs_f64() * 1000.0,
                        "finished_at": o.finished_at,
                    })
                })
                .collect();
            json!({
                "kind": sweep.kind,
                "stats": sweep.stats,
                "outcomes": outcomes,
            })
        })
        .collect();

    let output = json!({
        "campaign": {
            "id": report.id,
            "duration_seconds": report.elapsed.as_secs_f64(),
            "duration_formatted": format_duration(report.elapsed),
            "interrupted": report.interrupted,
            "totals": report.totals(),
        },
        "sweeps": sweeps,
    });

    Ok(serde_json::to_string_pretty(&output)?)
}

fn render_csv(report: &CampaignReport) -> String {
    let mut csv = String::from("kind,target,status,detail,elapsed_ms\n");
    for sweep in &report.sweeps {
        for o in &sweep.outcomes {
            let escaped = detail(o).replace('"', "\"\"").replace('\n', " ").replace('\r', "");
            csv.push_str(&format!(
                "{},\"{}\",{},\"{}\",{}\n",
                o.kind,
                o.target.as_str().replace('"', "\"\""),
                o.status.label(),
                escaped,
                o.elapsed.as_millis()
            ));
        }
    }
    csv
}
