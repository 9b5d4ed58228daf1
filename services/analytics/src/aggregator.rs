//! Derived analytics
//!
//! [`compute`] turns raw invoices, payments and products into an
//! [`AnalyticsSnapshot`]. It is a pure function of its arguments: the
//! reference date anchoring the monthly window is passed in, never read from
//! the clock, and every grouping goes through ordered maps so identical inputs
//! serialize to identical bytes. It never fails. Empty inputs produce zeroes
//! and non-finite amounts count as zero.

use chrono::{Datelike, NaiveDate};
use common::models::{Invoice, Payment, Product};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::time_range::TimeRange;

pub const COMPLETED: &str = "completed";
pub const PAID: &str = "paid";
pub const LOW_STOCK: &str = "low-stock";
pub const LOW_STOCK_THRESHOLD: i64 = 10;

/// Share of the price reported as margin. Illustrative only, not financial data.
const MARGIN_ESTIMATE: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRevenue {
    /// `YYYY-MM`
    pub month: String,
    /// Short month name
    pub label: String,
    /// Completed payments received in the month
    pub revenue: f64,
    /// Invoices raised in the month, any status
    pub target: f64,
    pub growth: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerSegment {
    pub name: String,
    /// Percentage of all invoiced value
    pub value: i64,
    pub customers: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPerformance {
    pub name: String,
    pub category: String,
    /// Current stock, standing in for units sold
    pub sales: i64,
    pub margin: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthIndicators {
    pub revenue_growth: i64,
    pub invoice_growth: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    pub conversion_rate: f64,
    pub average_order_value: f64,
    pub customer_lifetime_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusBreakdown {
    pub status: String,
    pub label: String,
    pub count: usize,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventorySummary {
    pub total_products: usize,
    pub active_products: usize,
    pub low_stock_products: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    pub time_range: TimeRange,
    pub reference_date: NaiveDate,
    pub total_revenue: f64,
    pub invoice_count: usize,
    pub payment_count: usize,
    /// Invoices still awaiting payment (`sent` or `overdue`)
    pub pending_invoices: usize,
    pub monthly_revenue: Vec<MonthlyRevenue>,
    pub customer_segments: Vec<CustomerSegment>,
    pub product_performance: Vec<ProductPerformance>,
    pub growth: GrowthIndicators,
    pub kpis: Kpis,
    pub invoice_status: Vec<StatusBreakdown>,
    pub inventory: InventorySummary,
}

fn finite(x: f64) -> f64 {
    if x.is_finite() { x } else { 0.0 }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Percent change with the previous value floored at 1.
///
/// The floor only keeps the division defined; growth from zero is therefore
/// reported as the new value times 100 rather than infinity.
pub fn growth_percent(previous: f64, current: f64) -> i64 {
    (100.0 * (current - previous) / previous.max(1.0)).round() as i64
}

fn ratio(numerator: f64, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        round2(numerator / denominator as f64)
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Months as `year * 12 + month0`
fn month_index(date: NaiveDate) -> i32 {
    date.year() * 12 + date.month0() as i32
}

fn monthly_series(
    invoices: &[Invoice],
    payments: &[Payment],
    range: TimeRange,
    reference: NaiveDate,
) -> Vec<MonthlyRevenue> {
    let last = month_index(reference);
    let first = last - range.months() as i32 + 1;

    let mut revenue: BTreeMap<i32, f64> = (first..=last).map(|m| (m, 0.0)).collect();
    let mut target = revenue.clone();

    for payment in payments.iter().filter(|p| p.status == COMPLETED) {
        if let Some(sum) = revenue.get_mut(&month_index(payment.payment_date)) {
            *sum += finite(payment.amount);
        }
    }
    for invoice in invoices {
        if let Some(sum) = target.get_mut(&month_index(invoice.created_at.date_naive())) {
            *sum += finite(invoice.total_amount);
        }
    }

    let mut previous: Option<f64> = None;
    (first..=last)
        .map(|m| {
            let (year, month) = (m.div_euclid(12), m.rem_euclid(12) as u32 + 1);
            let current = revenue.get(&m).copied().unwrap_or_default();
            let growth = previous.map_or(0, |p| growth_percent(p, current));
            previous = Some(current);

            MonthlyRevenue {
                month: format!("{:04}-{:02}", year, month),
                label: NaiveDate::from_ymd_opt(year, month, 1)
                    .map(|d| d.format("%b").to_string())
                    .unwrap_or_default(),
                revenue: current,
                target: target.get(&m).copied().unwrap_or_default(),
                growth,
            }
        })
        .collect()
}

/// Rank customers by lifetime invoiced value and split the ranking 20/40/40.
///
/// Boundaries are rounded up: with `n` customers the first `ceil(n/5)` are
/// Enterprise and ranks up to `ceil(3n/5)` are SMB. All three segments are
/// reported, possibly with zero value, unless nothing was invoiced at all.
/// A customer whose credits outweigh their invoices counts as zero.
fn customer_segments(invoices: &[Invoice]) -> Vec<CustomerSegment> {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    let mut gross = 0.0;
    for invoice in invoices {
        let amount = finite(invoice.total_amount);
        gross += amount.abs();
        *totals.entry(invoice.customer_name.as_str()).or_default() += amount;
    }
    for total in totals.values_mut() {
        *total = total.max(0.0);
    }

    // Amounts that cancel out leave rounding residue, not revenue.
    let grand_total: f64 = totals.values().sum();
    if grand_total <= f64::EPSILON * gross {
        return Vec::new();
    }

    let mut ranked: Vec<(&str, f64)> = totals.into_iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let n = ranked.len();
    let enterprise_end = n.div_ceil(5);
    let smb_end = (3 * n).div_ceil(5);

    [
        ("Enterprise", 0, enterprise_end),
        ("SMB", enterprise_end, smb_end),
        ("Individual", smb_end, n),
    ]
    .into_iter()
    .map(|(name, start, end)| {
        let members = &ranked[start..end];
        let sum: f64 = members.iter().map(|(_, total)| total).sum();
        CustomerSegment {
            name: name.to_string(),
            value: (100.0 * sum / grand_total).round() as i64,
            customers: members.len(),
        }
    })
    .collect()
}

fn product_performance(products: &[Product]) -> Vec<ProductPerformance> {
    products
        .iter()
        .map(|p| ProductPerformance {
            name: p.name.clone(),
            category: p.category.clone(),
            sales: p.stock,
            margin: (finite(p.price) * MARGIN_ESTIMATE).round() as i64,
        })
        .collect()
}

fn invoice_status(invoices: &[Invoice]) -> Vec<StatusBreakdown> {
    let mut by_status: BTreeMap<&str, (usize, f64)> = BTreeMap::new();
    for invoice in invoices {
        let entry = by_status.entry(invoice.status.as_str()).or_default();
        entry.0 += 1;
        entry.1 += finite(invoice.total_amount);
    }

    by_status
        .into_iter()
        .map(|(status, (count, amount))| StatusBreakdown {
            status: status.to_string(),
            label: capitalize(status),
            count,
            amount,
        })
        .collect()
}

fn inventory(products: &[Product]) -> InventorySummary {
    InventorySummary {
        total_products: products.len(),
        active_products: products.iter().filter(|p| p.status == "active").count(),
        low_stock_products: products
            .iter()
            .filter(|p| p.status == LOW_STOCK || p.stock <= LOW_STOCK_THRESHOLD)
            .count(),
    }
}

/// Compute the analytics snapshot for one reporting window ending in the
/// month of `reference`.
pub fn compute(
    invoices: &[Invoice],
    payments: &[Payment],
    products: &[Product],
    range: TimeRange,
    reference: NaiveDate,
) -> AnalyticsSnapshot {
    let total_revenue: f64 = payments
        .iter()
        .filter(|p| p.status == COMPLETED)
        .map(|p| finite(p.amount))
        .sum();
    let paid_invoices = invoices.iter().filter(|i| i.status == PAID).count();
    let customers: BTreeSet<&str> = invoices.iter().map(|i| i.customer_name.as_str()).collect();

    let monthly_revenue = monthly_series(invoices, payments, range, reference);
    let growth = match monthly_revenue.as_slice() {
        [.., previous, last] => GrowthIndicators {
            revenue_growth: last.growth,
            invoice_growth: growth_percent(previous.target, last.target),
        },
        _ => GrowthIndicators {
            revenue_growth: 0,
            invoice_growth: 0,
        },
    };

    AnalyticsSnapshot {
        time_range: range,
        reference_date: reference,
        total_revenue,
        invoice_count: invoices.len(),
        payment_count: payments.len(),
        pending_invoices: invoices
            .iter()
            .filter(|i| i.status == "sent" || i.status == "overdue")
            .count(),
        customer_segments: customer_segments(invoices),
        product_performance: product_performance(products),
        growth,
        kpis: Kpis {
            conversion_rate: ratio(100.0 * paid_invoices as f64, invoices.len()),
            average_order_value: ratio(total_revenue, paid_invoices),
            customer_lifetime_value: ratio(total_revenue, customers.len()),
        },
        invoice_status: invoice_status(invoices),
        inventory: inventory(products),
        monthly_revenue,
    }
}
