//! Daily and whole-run trading statistics.
//!
//! [`DailyAggregator`] accumulates the day in progress and freezes it into
//! history at end of day. [`rollup`] folds any slice of frozen days into
//! an [`OverallStats`].

use crate::{
    error::{SimError, SimResult},
    purchase::Transaction,
    types::{DayNumber, EntityId, ItemId},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Checkout with the highest profit seen so far.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MostProfitable {
    pub customer_id:   EntityId,
    pub customer_name: String,
    pub profit:        f64,
    pub value:         f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyStats {
    pub day_number:                  DayNumber,
    pub customer_count:              u32,
    pub purchasing_customer_count:   u32,
    pub revenue:                     f64,
    pub expenses:                    f64,
    /// Sales margin only. See [`DailyStats::net`] for revenue minus spend.
    pub profit:                      f64,
    pub item_sales:                  BTreeMap<ItemId, u32>,
    pub shelved_quantities:          BTreeMap<ItemId, u32>,
    pub most_profitable_transaction: Option<MostProfitable>,
    pub highest_transaction_value:   f64,
    pub satisfaction:                f64,
    pub reputation:                  f64,
    /// Customers who left with at least one desired item unmet.
    pub stock_shortage_per_customer: u32,
    /// Desired items left unmet, summed over customers.
    pub stock_shortage_per_item:     u32,
}

impl DailyStats {
    pub fn new(day_number: DayNumber, satisfaction: f64, reputation: f64) -> Self {
        Self {
            day_number,
            customer_count: 0,
            purchasing_customer_count: 0,
            revenue: 0.0,
            expenses: 0.0,
            profit: 0.0,
            item_sales: BTreeMap::new(),
            shelved_quantities: BTreeMap::new(),
            most_profitable_transaction: None,
            highest_transaction_value: 0.0,
            satisfaction,
            reputation,
            stock_shortage_per_customer: 0,
            stock_shortage_per_item: 0,
        }
    }

    pub fn net(&self) -> f64 {
        self.revenue - self.expenses
    }

    pub fn units_sold(&self) -> u32 {
        self.item_sales.values().sum()
    }

    pub fn most_popular_item(&self) -> Option<ItemId> {
        most_popular(&self.item_sales)
    }

    pub fn least_popular_item(&self) -> Option<ItemId> {
        least_popular(&self.item_sales, &self.shelved_quantities)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OverallStats {
    pub days:                              u32,
    pub total_customers:                   u32,
    pub total_purchasing_customers:        u32,
    pub total_revenue:                     f64,
    pub total_expenses:                    f64,
    pub total_profit:                      f64,
    pub average_satisfaction:              f64,
    pub total_stock_shortage_per_customer: u32,
    pub total_stock_shortage_per_item:     u32,
    pub most_popular_item:                 Option<ItemId>,
    pub least_popular_item:                Option<ItemId>,
    pub highest_transaction_value:         f64,
    pub most_profitable_transaction:       Option<MostProfitable>,
}

/// Fold frozen days into run-wide totals. Item popularity is judged on
/// sales and shelved quantities summed across all days.
pub fn rollup(days: &[DailyStats]) -> OverallStats {
    let mut sales: BTreeMap<ItemId, u32> = BTreeMap::new();
    let mut shelved: BTreeMap<ItemId, u32> = BTreeMap::new();
    let mut overall = OverallStats { days: days.len() as u32, ..Default::default() };

    for day in days {
        overall.total_customers += day.customer_count;
        overall.total_purchasing_customers += day.purchasing_customer_count;
        overall.total_revenue += day.revenue;
        overall.total_expenses += day.expenses;
        overall.total_profit += day.profit;
        overall.total_stock_shortage_per_customer += day.stock_shortage_per_customer;
        overall.total_stock_shortage_per_item += day.stock_shortage_per_item;
        overall.highest_transaction_value =
            overall.highest_transaction_value.max(day.highest_transaction_value);

        if let Some(best) = &day.most_profitable_transaction {
            let beats = overall
                .most_profitable_transaction
                .as_ref()
                .map_or(true, |current| best.profit > current.profit);
            if beats {
                overall.most_profitable_transaction = Some(best.clone());
            }
        }
        for (item, qty) in &day.item_sales {
            *sales.entry(item.clone()).or_insert(0) += qty;
        }
        for (item, qty) in &day.shelved_quantities {
            *shelved.entry(item.clone()).or_insert(0) += qty;
        }
    }

    if !days.is_empty() {
        overall.average_satisfaction =
            days.iter().map(|d| d.satisfaction).sum::<f64>() / days.len() as f64;
    }
    overall.most_popular_item = most_popular(&sales);
    overall.least_popular_item = least_popular(&sales, &shelved);
    overall
}

/// Highest count; ties go to the alphabetically first item.
fn most_popular(sales: &BTreeMap<ItemId, u32>) -> Option<ItemId> {
    sales
        .iter()
        .filter(|(_, &n)| n > 0)
        .fold(None::<(&ItemId, u32)>, |best, (item, &n)| match best {
            Some((_, m)) if m >= n => best,
            _ => Some((item, n)),
        })
        .map(|(item, _)| item.clone())
}

/// Lowest sales among items sold or shelved. An item nobody bought but
/// plenty of which sat on the shelf ranks below one with little shelf
/// exposure; remaining ties go to the alphabetically first item.
fn least_popular(
    sales:   &BTreeMap<ItemId, u32>,
    shelved: &BTreeMap<ItemId, u32>,
) -> Option<ItemId> {
    let mut candidates: Vec<(&ItemId, u32, u32)> = sales
        .keys()
        .chain(shelved.keys())
        .map(|item| {
            (
                item,
                sales.get(item).copied().unwrap_or(0),
                shelved.get(item).copied().unwrap_or(0),
            )
        })
        .collect();
    candidates.sort_by(|a, b| a.1.cmp(&b.1).then(b.2.cmp(&a.2)).then(a.0.cmp(b.0)));
    candidates.first().map(|(item, _, _)| (*item).clone())
}

/// Accumulates the current trading day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyAggregator {
    current: DailyStats,
    history: Vec<DailyStats>,
}

impl DailyAggregator {
    pub fn new(satisfaction: f64, reputation: f64) -> Self {
        Self { current: DailyStats::new(1, satisfaction, reputation), history: Vec::new() }
    }

    pub fn current(&self) -> &DailyStats {
        &self.current
    }

    pub fn current_day(&self) -> DayNumber {
        self.current.day_number
    }

    pub fn history(&self) -> &[DailyStats] {
        &self.history
    }

    /// Frozen stats for a past day, by 1-based day number.
    pub fn day(&self, day_number: DayNumber) -> Option<&DailyStats> {
        self.history.iter().find(|d| d.day_number == day_number)
    }

    pub fn register_customer_entry(&mut self) {
        self.current.customer_count += 1;
    }

    pub fn register_transaction(&mut self, tx: &Transaction) {
        let day = &mut self.current;
        for (item, qty) in &tx.items {
            *day.item_sales.entry(item.clone()).or_insert(0) += qty;
        }
        day.purchasing_customer_count += 1;
        day.revenue += tx.total_revenue;
        day.profit += tx.total_profit;
        day.highest_transaction_value = day.highest_transaction_value.max(tx.total_revenue);

        let beats = day
            .most_profitable_transaction
            .as_ref()
            .map_or(true, |best| tx.total_profit > best.profit);
        if beats {
            day.most_profitable_transaction = Some(MostProfitable {
                customer_id:   tx.customer_id.clone(),
                customer_name: tx.customer_name.clone(),
                profit:        tx.total_profit,
                value:         tx.total_revenue,
            });
        }
    }

    /// One customer left with `items_not_found` desired items unmet.
    pub fn register_shortage(&mut self, items_not_found: u32) {
        if items_not_found == 0 {
            return;
        }
        self.current.stock_shortage_per_customer += 1;
        self.current.stock_shortage_per_item += items_not_found;
    }

    pub fn register_expense(&mut self, amount: f64) {
        self.current.expenses += amount;
    }

    pub fn register_shelved(&mut self, item_id: &str, quantity: u32) {
        *self.current.shelved_quantities.entry(item_id.to_string()).or_insert(0) += quantity;
    }

    pub fn set_satisfaction(&mut self, value: f64) {
        self.current.satisfaction = value;
    }

    pub fn set_reputation(&mut self, value: f64) {
        self.current.reputation = value;
    }

    /// Freeze today's stats and open the next day. Refused while anyone is
    /// still in the shop. Only satisfaction and reputation carry forward.
    pub fn end_of_day(&mut self, active_customers: usize) -> SimResult<DailyStats> {
        if active_customers > 0 {
            return Err(SimError::CustomersStillActive { active: active_customers });
        }
        let next = DailyStats::new(
            self.current.day_number + 1,
            self.current.satisfaction,
            self.current.reputation,
        );
        let finished = std::mem::replace(&mut self.current, next);
        self.history.push(finished.clone());
        Ok(finished)
    }

    pub fn overall(&self) -> OverallStats {
        rollup(&self.history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::customer::BasketLine;

    fn tx(customer: &str, lines: &[(&str, f64, f64)]) -> Transaction {
        let mut items = BTreeMap::new();
        let basket: Vec<BasketLine> = lines
            .iter()
            .map(|(item, price, cost)| {
                *items.entry(item.to_string()).or_insert(0) += 1;
                BasketLine { item_id: item.to_string(), price: *price, cost: *cost, profit: price - cost }
            })
            .collect();
        Transaction {
            customer_id:   format!("id-{customer}"),
            customer_name: customer.into(),
            items,
            total_revenue: basket.iter().map(|l| l.price).sum(),
            total_cost:    basket.iter().map(|l| l.cost).sum(),
            total_profit:  basket.iter().map(|l| l.profit).sum(),
            lines:         basket,
        }
    }

    #[test]
    fn transactions_accumulate() {
        let mut agg = DailyAggregator::new(100.0, 5.0);
        agg.register_customer_entry();
        agg.register_customer_entry();
        agg.register_transaction(&tx("A. Lee", &[("Bread", 1.20, 1.00), ("Milk", 1.00, 0.80)]));
        agg.register_transaction(&tx("B. Cole", &[("Bread", 1.25, 1.00)]));
        agg.register_expense(10.0);

        let day = agg.current();
        assert_eq!(day.customer_count, 2);
        assert_eq!(day.purchasing_customer_count, 2);
        assert_eq!(day.item_sales["Bread"], 2);
        assert_eq!(day.units_sold(), 3);
        assert!((day.revenue - 3.45).abs() < 1e-9);
        assert!((day.profit - 0.65).abs() < 1e-9);
        assert!((day.net() - (3.45 - 10.0)).abs() < 1e-9);
        assert!((day.highest_transaction_value - 2.20).abs() < 1e-9);
        assert_eq!(day.most_profitable_transaction.as_ref().unwrap().customer_name, "A. Lee");
    }

    #[test]
    fn most_profitable_keeps_first_on_tie() {
        let mut agg = DailyAggregator::new(100.0, 5.0);
        agg.register_transaction(&tx("First", &[("Tea", 2.00, 1.50)]));
        agg.register_transaction(&tx("Second", &[("Tea", 2.00, 1.50)]));
        let best = agg.current().most_profitable_transaction.clone().unwrap();
        assert_eq!(best.customer_name, "First");
    }

    #[test]
    fn end_of_day_refused_with_customers_inside() {
        let mut agg = DailyAggregator::new(100.0, 5.0);
        let err = agg.end_of_day(3).unwrap_err();
        assert!(matches!(err, SimError::CustomersStillActive { active: 3 }));
        assert!(agg.history().is_empty());
        assert_eq!(agg.current_day(), 1);
    }

    #[test]
    fn end_of_day_carries_only_satisfaction_and_reputation() {
        let mut agg = DailyAggregator::new(100.0, 5.0);
        agg.register_customer_entry();
        agg.register_expense(4.0);
        agg.set_satisfaction(87.5);
        agg.set_reputation(6.2);

        let frozen = agg.end_of_day(0).unwrap();
        assert_eq!(frozen.day_number, 1);
        assert_eq!(frozen.customer_count, 1);

        let today = agg.current();
        assert_eq!(today.day_number, 2);
        assert_eq!(today.customer_count, 0);
        assert_eq!(today.expenses, 0.0);
        assert_eq!(today.satisfaction, 87.5);
        assert_eq!(today.reputation, 6.2);
        assert_eq!(agg.day(1), Some(&frozen));
    }

    #[test]
    fn shortage_counts_customers_and_items() {
        let mut agg = DailyAggregator::new(100.0, 5.0);
        agg.register_shortage(3);
        agg.register_shortage(0);
        agg.register_shortage(1);
        assert_eq!(agg.current().stock_shortage_per_customer, 2);
        assert_eq!(agg.current().stock_shortage_per_item, 4);
    }

    #[test]
    fn popularity_tie_breaks() {
        let mut day = DailyStats::new(1, 100.0, 5.0);
        day.item_sales.insert("Milk".into(), 3);
        day.item_sales.insert("Bread".into(), 3);
        day.item_sales.insert("Tea".into(), 1);
        day.shelved_quantities.insert("Coffee".into(), 10);
        day.shelved_quantities.insert("Rice".into(), 2);

        assert_eq!(day.most_popular_item().as_deref(), Some("Bread"));
        // Coffee and Rice both sold nothing; Coffee had more on the shelf.
        assert_eq!(day.least_popular_item().as_deref(), Some("Coffee"));
    }

    #[test]
    fn rollup_sums_days() {
        let mut agg = DailyAggregator::new(100.0, 5.0);
        agg.register_transaction(&tx("A", &[("Bread", 1.20, 1.00)]));
        agg.set_satisfaction(90.0);
        agg.end_of_day(0).unwrap();
        agg.register_transaction(&tx("B", &[("Milk", 1.00, 0.80), ("Milk", 1.00, 0.80)]));
        agg.register_expense(5.0);
        agg.set_satisfaction(80.0);
        agg.end_of_day(0).unwrap();

        let overall = agg.overall();
        assert_eq!(overall.days, 2);
        assert!((overall.total_revenue - 3.20).abs() < 1e-9);
        assert!((overall.total_expenses - 5.0).abs() < 1e-9);
        assert!((overall.average_satisfaction - 85.0).abs() < 1e-9);
        assert_eq!(overall.most_popular_item.as_deref(), Some("Milk"));
        assert_eq!(overall.least_popular_item.as_deref(), Some("Bread"));
        assert_eq!(overall.most_profitable_transaction.unwrap().customer_name, "B");
    }

    #[test]
    fn rollup_of_nothing_is_empty() {
        let overall = rollup(&[]);
        assert_eq!(overall, OverallStats::default());
    }
}
