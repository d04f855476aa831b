use std::collections::BTreeMap;

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use sonic_rs::Value;

/// A decimal figure. The API sends decimals as strings, numbers or `null`;
/// anything that does not parse to a finite number counts as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Amount(pub f64);

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
            Other(IgnoredAny),
        }

        let value = match Option::<Raw>::deserialize(deserializer)? {
            Some(Raw::Number(number)) => number,
            Some(Raw::Text(text)) => text.trim().parse().unwrap_or(0.0),
            Some(Raw::Other(_)) | None => 0.0,
        };
        Ok(Amount(if value.is_finite() { value } else { 0.0 }))
    }
}

/// An id the API sends either as a number or as a numeric string.
fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
        Other(IgnoredAny),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Number(id)) => Some(id),
        Some(Raw::Text(text)) => text.trim().parse().ok(),
        Some(Raw::Other(_)) | None => None,
    })
}

/// Schedule rows list staff either as bare ids or as assignment objects.
fn staff_ids<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<i64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StaffRef {
        Id(i64),
        Assignment { employee: i64 },
    }

    let refs = Option::<Vec<StaffRef>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(refs
        .into_iter()
        .map(|staff| match staff {
            StaffRef::Id(id) | StaffRef::Assignment { employee: id } => id,
        })
        .collect())
}

/// A POS staff member, as listed by `GET /api/employees/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub poster_id: i64,
    pub name: String,
    #[serde(default)]
    pub role_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub last_in: String,
}

/// A staff member known to the salary engine (`GET /api/auth/employee/`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffMember {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub role: Option<i64>,
    #[serde(default)]
    pub role_name: Option<String>,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
}

fn active_by_default() -> bool {
    true
}

/// A pay rule attached to a role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryRule {
    pub id: i64,
    #[serde(default)]
    pub role: Option<i64>,
    #[serde(default)]
    pub role_name: Option<String>,
    #[serde(default)]
    pub category_name: Option<String>,
    /// Share of revenue, as the decimal string the API sends.
    #[serde(default)]
    pub percent: Option<String>,
    #[serde(default)]
    pub fixed_per_shift: Option<String>,
    #[serde(default)]
    pub fixed_per_item: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub workshops: Vec<i64>,
}

/// One scheduled day of the month and the staff ids working it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledDay {
    pub date: String,
    #[serde(default, deserialize_with = "staff_ids")]
    pub employees: Vec<i64>,
}

/// How a day's salary was made up.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SalaryDetails {
    #[serde(default)]
    pub fixed: Amount,
    #[serde(default)]
    pub percent: Amount,
    #[serde(default)]
    pub bonus: Amount,
    #[serde(default)]
    pub write_off: Amount,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub bonus_breakdown: Option<Value>,
}

/// The salary of one employee on one day, as computed by the salary engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SalaryCell {
    #[serde(default)]
    pub total_salary: Amount,
    #[serde(default)]
    pub details: Option<SalaryDetails>,
}

/// Monthly salary table: employee id → day of month → cell.
pub type SalaryRecords = BTreeMap<String, BTreeMap<String, SalaryCell>>;

/// Month totals of one employee's salary row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MonthSummary {
    pub days_worked: usize,
    pub total_fixed: f64,
    pub total_percent: f64,
    pub total_bonus: f64,
    pub total_write_off: f64,
    pub grand_total: f64,
}

/// The salary screen: the raw table and one summary per employee.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalaryTable {
    pub records: SalaryRecords,
    pub summaries: BTreeMap<String, MonthSummary>,
}

/// A closed cash-register shift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashShift {
    pub date_start: String,
    pub date_end: String,
    #[serde(default)]
    pub amount_start: Amount,
    #[serde(default)]
    pub amount_end: Amount,
    #[serde(default)]
    pub amount_debit: Amount,
    #[serde(default)]
    pub amount_sell_cash: Amount,
    #[serde(default)]
    pub amount_sell_card: Amount,
    #[serde(default)]
    pub amount_credit: Amount,
    #[serde(default)]
    pub amount_collection: Amount,
    #[serde(default)]
    pub user_id_start: Option<String>,
    #[serde(default)]
    pub user_id_end: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Sums over the cash shifts of the selected range. Revenue is cash plus card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CashShiftTotals {
    pub revenue: f64,
    pub cash: f64,
    pub card: f64,
    pub credit: f64,
    pub collection: f64,
}

/// The cash-shift screen, newest shift first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CashShiftReport {
    pub shifts: Vec<CashShift>,
    pub totals: CashShiftTotals,
}

/// One product line sold during a shift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftSaleItem {
    #[serde(default)]
    pub product_id: Option<i64>,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub count: Amount,
    #[serde(default)]
    pub product_sum: Amount,
    #[serde(default)]
    pub payed_sum: Amount,
    #[serde(default)]
    pub profit: Amount,
    #[serde(default, deserialize_with = "lenient_id")]
    pub workshop: Option<i64>,
    #[serde(default)]
    pub delivery_service: Option<String>,
    #[serde(default)]
    pub tips: Amount,
}

/// Product sales of one shift, split by channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftSales {
    #[serde(default, deserialize_with = "lenient_id")]
    pub shift_id: Option<i64>,
    #[serde(default)]
    pub regular: Vec<ShiftSaleItem>,
    #[serde(default)]
    pub delivery: Vec<ShiftSaleItem>,
    #[serde(default)]
    pub difference: Amount,
    #[serde(default)]
    pub tips: Amount,
    #[serde(default)]
    pub tips_by_service: BTreeMap<String, Amount>,
}

impl ShiftSales {
    pub fn is_empty(&self) -> bool {
        self.regular.is_empty() && self.delivery.is_empty()
    }
}

/// The shift-sales endpoint answers a list of shifts, a map keyed by shift id,
/// or a single shift.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum ShiftSalesPayload {
    List(Vec<ShiftSales>),
    Keyed(BTreeMap<String, ShiftSales>),
    Single(ShiftSales),
}

impl ShiftSalesPayload {
    pub(crate) fn into_shifts(self) -> Vec<ShiftSales> {
        match self {
            ShiftSalesPayload::List(shifts) => shifts,
            ShiftSalesPayload::Keyed(shifts) => shifts.into_values().collect(),
            ShiftSalesPayload::Single(shift) => vec![shift],
        }
    }
}

/// Which sales channel a line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Regular,
    Delivery,
}

/// Sales of one workshop (bar, kitchen, hookah) in one channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkshopTotals {
    pub channel: Channel,
    pub workshop: i64,
    pub name: &'static str,
    pub payed_sum: f64,
    pub profit: f64,
}

/// Totals over every shift of the selected day.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ShiftSalesSummary {
    pub total_profit: f64,
    pub total_payed_sum: f64,
    pub total_difference: f64,
    pub tips_by_service: BTreeMap<String, f64>,
    pub workshops: Vec<WorkshopTotals>,
}

/// The shift-sales screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShiftSalesReport {
    pub shifts: Vec<ShiftSales>,
    pub summary: ShiftSalesSummary,
}

/// Aggregated analytics rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub data: Vec<Value>,
}

/// The statistics endpoint answers either `{type, data}` or a bare array.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum StatisticsPayload {
    Wrapped(Statistics),
    Rows(Vec<Value>),
}

impl StatisticsPayload {
    pub(crate) fn into_statistics(self, kind: &str) -> Statistics {
        match self {
            StatisticsPayload::Wrapped(stats) => stats,
            StatisticsPayload::Rows(data) => Statistics {
                kind: kind.to_string(),
                data,
            },
        }
    }
}
