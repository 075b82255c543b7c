//! Text rendering for fieldpulsectl. ASCII only; color marks status.

use std::fmt::Write;

use chrono::Month;
use fieldpulse_shared::{
    AttentionItem, Dataset, NodeRollup, SalesRhythm, StatusLabel, VisitActivity, VisitAssignment,
    VisitEvent,
};
use owo_colors::OwoColorize;

pub const THIN_SEPARATOR: &str = "------------------------------------------------------------";

fn status(label: StatusLabel) -> String {
    match label {
        StatusLabel::OnTrack => label.to_string().bright_green().to_string(),
        StatusLabel::AtRisk => label.to_string().yellow().to_string(),
        StatusLabel::Behind => label.to_string().bright_red().to_string(),
    }
}

fn month_abbrev(month: u32) -> String {
    u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .map(|m| m.name()[..3].to_string())
        .unwrap_or_else(|| format!("M{}", month))
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

fn product_name(dataset: &Dataset, id: u64) -> String {
    dataset
        .products
        .iter()
        .find(|p| p.id == id)
        .map(|p| p.name.clone())
        .unwrap_or_else(|| format!("product {}", id))
}

fn doctor_name(dataset: &Dataset, id: u64) -> String {
    dataset
        .doctors
        .iter()
        .find(|d| d.id == id)
        .map(|d| d.name.clone())
        .unwrap_or_else(|| format!("doctor {}", id))
}

fn write_visits(out: &mut String, v: &VisitActivity) {
    let _ = writeln!(out, "[VISITS]");
    let _ = writeln!(out, "  Return Index   {}%  {}", v.return_index, status(v.status));
    let _ = writeln!(out, "  YTD visits     {} / {} expected", v.ytd_visits, v.expected_visits);
    let months: Vec<String> = v
        .monthly_visit_counts
        .iter()
        .enumerate()
        .map(|(i, n)| format!("{} {}", month_abbrev(i as u32 + 1), n))
        .collect();
    let _ = writeln!(out, "  Monthly        {}", months.join("  "));
    let _ = writeln!(
        out,
        "  Last 3 months  {} / {} / {}",
        v.recent.second_previous, v.recent.previous, v.recent.current
    );
    let _ = writeln!(
        out,
        "  Today          {} recorded, can record: {}",
        v.visits_today,
        yes_no(v.can_record_today)
    );
    let _ = writeln!(out, "  Month target   {}", if v.monthly_target_met { "met" } else { "not met" });
}

fn write_sales(out: &mut String, s: &SalesRhythm) {
    let _ = writeln!(out, "[SALES]");
    let _ = writeln!(out, "  Annual target  {}", s.annual_target);
    let _ = writeln!(
        out,
        "  YTD            {} / {} ({}%)  {}",
        s.ytd_achieved,
        s.ytd_target,
        s.achievement_rate,
        status(s.status)
    );
    let _ = writeln!(out, "  Gap            {} over {} month(s)", s.gap, s.remaining_months);
    let _ = writeln!(out, "  Rhythm         {}", s.recruitment_rhythm);
}

pub fn render_rollup(rollup: &NodeRollup, dataset: &Dataset) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "[NODE] {} ({} #{}) as of {}",
        rollup.name.bold(),
        rollup.role,
        rollup.node_id,
        rollup.visits.as_of
    );
    let _ = writeln!(
        out,
        "  Subtree        {} node(s), {} visit assignment(s), {} sales assignment(s)",
        rollup.nodes, rollup.visit_assignments, rollup.sales_assignments
    );
    let _ = writeln!(out);
    write_visits(&mut out, &rollup.visits);
    let _ = writeln!(out);
    write_sales(&mut out, &rollup.sales);

    if !rollup.by_product.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "[BY PRODUCT]");
        for (product, s) in &rollup.by_product {
            let _ = writeln!(
                out,
                "  {:<20} {} / {} ({}%)  rhythm {}  {}",
                product_name(dataset, *product),
                s.ytd_achieved,
                s.ytd_target,
                s.achievement_rate,
                s.recruitment_rhythm,
                status(s.status)
            );
        }
    }

    if !rollup.members.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "[MEMBERS]");
        for m in &rollup.members {
            let _ = writeln!(
                out,
                "  {:<20} #{:<6} RI {:>3}%  {:<9}  rate {:>3}%  rhythm {}",
                m.name,
                m.delegate_id,
                m.visits.return_index,
                status(m.visits.status),
                m.sales.achievement_rate,
                m.sales.recruitment_rhythm
            );
        }
    }
    out
}

pub fn render_assignment(assignment: &VisitAssignment, activity: &VisitActivity, dataset: &Dataset) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "[ASSIGNMENT] #{} {} ({}x per month) as of {}",
        assignment.id,
        doctor_name(dataset, assignment.doctor_id),
        assignment.monthly_frequency.visits(),
        activity.as_of
    );
    let _ = writeln!(out);
    write_visits(&mut out, activity);
    out
}

pub fn render_sales(id: u64, product: &str, rhythm: &SalesRhythm) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "[SALES ASSIGNMENT] #{} {} through {}", id, product, month_abbrev(rhythm.as_of_month));
    let _ = writeln!(out);
    write_sales(&mut out, rhythm);

    let schedule = rhythm.ramp_schedule();
    if rhythm.recruitment_rhythm > 0 && !schedule.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "[RAMP]");
        for (month, amount) in schedule {
            let _ = writeln!(out, "  {}  {}", month_abbrev(month), amount);
        }
        let _ = writeln!(out, "  {}", THIN_SEPARATOR.dimmed());
        let _ = writeln!(out, "  total {} for a gap of {}", rhythm.ramp_total(), rhythm.gap);
    }
    out
}

pub fn render_attention(node: &str, items: &[AttentionItem]) -> String {
    let mut out = String::new();
    if items.is_empty() {
        let _ = writeln!(out, "[ATTENTION] {}: every assignment visited recently", node);
        return out;
    }
    let _ = writeln!(out, "[ATTENTION] {}: {} assignment(s)", node, items.len());
    for item in items {
        let _ = writeln!(
            out,
            "  #{:<6} delegate #{:<6} {:<24} {} / {} / {}  {}",
            item.assignment_id,
            item.delegate_id,
            item.doctor_name,
            item.recent.second_previous,
            item.recent.previous,
            item.recent.current,
            status(item.status)
        );
    }
    out
}

pub fn render_recorded(event: &VisitEvent, activity: &VisitActivity) -> String {
    format!(
        "[OK] Visit recorded for assignment #{} on {} ({} visit(s) this year, Return Index {}%)\n",
        event.assignment_id,
        event.date,
        activity.ytd_visits,
        activity.return_index
    )
}

/// Display an error
pub fn display_error(message: &str) {
    eprintln!("[ERROR] {}", message.red());
}
