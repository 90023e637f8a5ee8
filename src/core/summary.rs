//! Spending breakdown derived from the materialized expense list.
//!
//! Everything here is a pure function of its input. Category ranking is
//! stable: categories with equal totals keep the order in which they first
//! appear in the list.

use crate::core::models::expense::Expense;
use serde::Serialize;
use std::collections::HashMap;

/// Number of categories kept for the chart breakdown.
pub const TOP_CATEGORY_LIMIT: usize = 8;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub amount: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CategoryShare {
    pub category: String,
    pub amount: f64,
    pub percentage: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Breakdown {
    pub total_count: usize,
    /// Sum over the whole list, including categories outside the top ranks.
    pub total_amount: f64,
    pub categories: Vec<CategoryShare>,
    pub top_category: CategoryShare,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum SpendingSummary {
    NoData,
    Breakdown(Breakdown),
}

impl SpendingSummary {
    pub fn breakdown(&self) -> Option<&Breakdown> {
        match self {
            SpendingSummary::NoData => None,
            SpendingSummary::Breakdown(b) => Some(b),
        }
    }
}

pub fn total_amount(expenses: &[Expense]) -> f64 {
    expenses.iter().map(|e| e.amount).sum()
}

/// Per-category sums in order of first occurrence.
pub fn category_totals(expenses: &[Expense]) -> Vec<CategoryTotal> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut totals: Vec<CategoryTotal> = Vec::new();
    for expense in expenses {
        match index.get(expense.category.as_str()) {
            Some(&i) => totals[i].amount += expense.amount,
            None => {
                index.insert(expense.category.as_str(), totals.len());
                totals.push(CategoryTotal {
                    category: expense.category.clone(),
                    amount: expense.amount,
                });
            }
        }
    }
    totals
}

pub fn rank_categories(mut totals: Vec<CategoryTotal>) -> Vec<CategoryTotal> {
    // sort_by is stable, which preserves first-occurrence order among ties
    totals.sort_by(|a, b| b.amount.total_cmp(&a.amount));
    totals
}

pub fn summarize(expenses: &[Expense]) -> SpendingSummary {
    if expenses.is_empty() {
        return SpendingSummary::NoData;
    }

    let total = total_amount(expenses);
    let categories: Vec<CategoryShare> = rank_categories(category_totals(expenses))
        .into_iter()
        .take(TOP_CATEGORY_LIMIT)
        .map(|c| CategoryShare {
            percentage: percentage_of(c.amount, total),
            category: c.category,
            amount: c.amount,
        })
        .collect();

    match categories.first().cloned() {
        Some(top_category) => SpendingSummary::Breakdown(Breakdown {
            total_count: expenses.len(),
            total_amount: total,
            categories,
            top_category,
        }),
        None => SpendingSummary::NoData,
    }
}

fn percentage_of(amount: f64, total: f64) -> f64 {
    if total == 0.0 { 0.0 } else { amount / total * 100.0 }
}
