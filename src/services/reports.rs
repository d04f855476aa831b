use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::report::{
    CashShift, CashShiftReport, CashShiftTotals, Channel, Employee, MonthSummary, SalaryCell,
    SalaryRecords, SalaryRule, SalaryTable, ScheduledDay, ShiftSales, ShiftSalesPayload,
    ShiftSalesReport, ShiftSalesSummary, StaffMember, Statistics, StatisticsPayload,
    WorkshopTotals,
};
use crate::models::session::SessionId;
use crate::services::api_client::{ApiRequest, SessionClient};
use crate::services::views::{Screen, ViewGenerations};
use crate::validation::reports::{
    resolve_month, resolve_range, validate_interpolation, validate_metrics,
};

pub const EMPLOYEES_PATH: &str = "/api/employees/";
pub const STAFF_PATH: &str = "/api/auth/employee/";
pub const SALARY_RULES_PATH: &str = "/api/salary_rules/";
pub const SHIFTS_PATH: &str = "/api/shifts/";
pub const SALARY_RECORDS_PATH: &str = "/api/salary_records/";
pub const CASH_SHIFTS_PATH: &str = "/api/cash_shifts/";
pub const SHIFT_SALES_PATH: &str = "/api/shift_sales/";
pub const STATISTICS_PATH: &str = "/api/statistics/";

/// What a report screen displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "lowercase")]
pub enum ScreenView<T> {
    /// Data arrived and has something to show.
    Loaded(T),
    /// Nothing to show, either because the API had no rows or because it failed.
    Empty,
    /// A newer fetch of the same screen started; this answer must not be shown.
    Superseded,
}

/// Whether a payload has nothing to display.
pub trait Blank {
    fn is_blank(&self) -> bool;
}

impl<T> Blank for Vec<T> {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

impl Blank for SalaryTable {
    fn is_blank(&self) -> bool {
        self.records.is_empty()
    }
}

impl Blank for CashShiftReport {
    fn is_blank(&self) -> bool {
        self.shifts.is_empty()
    }
}

impl Blank for ShiftSalesReport {
    fn is_blank(&self) -> bool {
        self.shifts.iter().all(ShiftSales::is_empty)
    }
}

impl Blank for Statistics {
    fn is_blank(&self) -> bool {
        self.data.is_empty()
    }
}

/// Month selector of the salary and schedule tables.
#[derive(Debug, Default, Deserialize)]
pub struct MonthQuery {
    pub month: Option<u32>,
    pub year: Option<i32>,
}

/// Filter of the cash-shift screen.
#[derive(Debug, Default, Deserialize)]
pub struct CashShiftQuery {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub spot_id: Option<i64>,
}

/// Filter of the shift-sales screen.
#[derive(Debug, Default, Deserialize)]
pub struct ShiftSalesQuery {
    pub date: Option<NaiveDate>,
    pub spot_id: Option<i64>,
}

fn default_kind() -> String {
    "finance".to_string()
}

fn default_select() -> String {
    "revenue,profit".to_string()
}

fn default_interpolate() -> String {
    "day".to_string()
}

fn default_business_day() -> bool {
    true
}

/// Filter of the statistics screen.
#[derive(Debug, Deserialize)]
pub struct StatisticsQuery {
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    #[serde(default = "default_select")]
    pub select: String,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    #[serde(default = "default_interpolate")]
    pub interpolate: String,
    #[serde(default = "default_business_day")]
    pub business_day: bool,
}

impl Default for StatisticsQuery {
    fn default() -> Self {
        Self {
            kind: default_kind(),
            select: default_select(),
            date_from: None,
            date_to: None,
            interpolate: default_interpolate(),
            business_day: default_business_day(),
        }
    }
}

/// Cash-shift dates travel as `YYYYMMDD`.
pub fn compact_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Statistics and shift-sales dates travel as `YYYY-MM-DD`.
pub fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn employees_request() -> ApiRequest {
    ApiRequest::get(EMPLOYEES_PATH)
}

pub fn staff_request() -> ApiRequest {
    ApiRequest::get(STAFF_PATH)
}

pub fn salary_rules_request() -> ApiRequest {
    ApiRequest::get(SALARY_RULES_PATH)
}

pub fn schedule_request(query: &MonthQuery, today: NaiveDate) -> Result<ApiRequest> {
    let (month, year) = resolve_month(query.month, query.year, today)?;
    Ok(ApiRequest::get(SHIFTS_PATH)
        .with_query("month", month)
        .with_query("year", year))
}

pub fn salary_records_request(query: &MonthQuery, today: NaiveDate) -> Result<ApiRequest> {
    let (month, year) = resolve_month(query.month, query.year, today)?;
    Ok(ApiRequest::get(SALARY_RECORDS_PATH)
        .with_query("month", month)
        .with_query("year", year))
}

pub fn cash_shifts_request(query: &CashShiftQuery, today: NaiveDate) -> Result<ApiRequest> {
    let (from, to) = resolve_range(query.date_from, query.date_to, today)?;
    let mut request = ApiRequest::get(CASH_SHIFTS_PATH)
        .with_query("dateFrom", compact_date(from))
        .with_query("dateTo", compact_date(to));
    if let Some(spot_id) = query.spot_id {
        request = request.with_query("spot_id", spot_id);
    }
    Ok(request)
}

/// Without a date the previous day is shown, the last one whose shifts are closed.
pub fn shift_sales_request(query: &ShiftSalesQuery, today: NaiveDate) -> ApiRequest {
    let date = query
        .date
        .or_else(|| today.checked_sub_days(Days::new(1)))
        .unwrap_or(today);
    let mut request = ApiRequest::get(SHIFT_SALES_PATH).with_query("date", iso_date(date));
    if let Some(spot_id) = query.spot_id {
        request = request.with_query("spot_id", spot_id);
    }
    request
}

pub fn statistics_request(query: &StatisticsQuery, today: NaiveDate) -> Result<ApiRequest> {
    let (from, to) = resolve_range(query.date_from, query.date_to, today)?;
    validate_interpolation(&query.interpolate)?;
    validate_metrics(&query.select)?;

    Ok(ApiRequest::get(STATISTICS_PATH)
        .with_query("type", &query.kind)
        .with_query("select", &query.select)
        .with_query("dateFrom", iso_date(from))
        .with_query("dateTo", iso_date(to))
        .with_query("interpolate", &query.interpolate)
        .with_query("business_day", query.business_day))
}

/// Fetches the statistics screen, accepting both answer shapes of the API.
/// A bare array is labelled with `kind`.
pub async fn fetch_statistics(
    client: &SessionClient,
    session: SessionId,
    request: &ApiRequest,
    kind: &str,
) -> Result<Statistics> {
    let payload: StatisticsPayload = client.get_json(session, request).await?;
    Ok(payload.into_statistics(kind))
}

/// Month totals of one employee's salary row. Every cell is a worked day; the
/// component sums only see cells that carry details.
pub fn summarize_month(days: &BTreeMap<String, SalaryCell>) -> MonthSummary {
    days.values().fold(
        MonthSummary {
            days_worked: days.len(),
            ..MonthSummary::default()
        },
        |mut summary, cell| {
            if let Some(details) = &cell.details {
                summary.total_fixed += details.fixed.0;
                summary.total_percent += details.percent.0;
                summary.total_bonus += details.bonus.0;
                summary.total_write_off += details.write_off.0;
            }
            summary.grand_total += cell.total_salary.0;
            summary
        },
    )
}

pub fn salary_table(records: SalaryRecords) -> SalaryTable {
    let summaries = records
        .iter()
        .map(|(employee, days)| (employee.clone(), summarize_month(days)))
        .collect();
    SalaryTable { records, summaries }
}

pub fn cash_shift_totals(shifts: &[CashShift]) -> CashShiftTotals {
    shifts
        .iter()
        .fold(CashShiftTotals::default(), |mut totals, shift| {
            totals.revenue += shift.amount_sell_cash.0 + shift.amount_sell_card.0;
            totals.cash += shift.amount_sell_cash.0;
            totals.card += shift.amount_sell_card.0;
            totals.credit += shift.amount_credit.0;
            totals.collection += shift.amount_collection.0;
            totals
        })
}

pub fn cash_shift_report(mut shifts: Vec<CashShift>) -> CashShiftReport {
    shifts.sort_by(|a, b| b.date_start.cmp(&a.date_start));
    let totals = cash_shift_totals(&shifts);
    CashShiftReport { shifts, totals }
}

/// Delivery lines without a service are grouped under this name.
pub const OTHER_DELIVERY_SERVICE: &str = "Другое";

/// Workshops with their own sales block. Hookah is not sold for delivery.
const WORKSHOPS: [(i64, &str, bool); 3] = [(1, "Бар", true), (2, "Кухня", true), (3, "Кальян", false)];

pub fn summarize_shift_sales(shifts: &[ShiftSales]) -> ShiftSalesSummary {
    let mut summary = ShiftSalesSummary::default();

    for shift in shifts {
        summary.total_difference += shift.difference.0;
        for (service, tips) in &shift.tips_by_service {
            *summary.tips_by_service.entry(service.clone()).or_insert(0.0) += tips.0;
        }
        for item in shift.regular.iter().chain(&shift.delivery) {
            summary.total_profit += item.profit.0;
            summary.total_payed_sum += item.payed_sum.0;
        }
    }

    for channel in [Channel::Regular, Channel::Delivery] {
        for (workshop, name, delivered) in WORKSHOPS {
            if channel == Channel::Delivery && !delivered {
                continue;
            }
            let lines = shifts
                .iter()
                .flat_map(|shift| match channel {
                    Channel::Regular => shift.regular.iter(),
                    Channel::Delivery => shift.delivery.iter(),
                })
                .filter(|item| item.workshop == Some(workshop));

            let (payed_sum, profit) = lines.fold((0.0, 0.0), |(payed, profit), item| {
                (payed + item.payed_sum.0, profit + item.profit.0)
            });
            summary.workshops.push(WorkshopTotals {
                channel,
                workshop,
                name,
                payed_sum,
                profit,
            });
        }
    }

    summary
}

pub fn shift_sales_report(mut shifts: Vec<ShiftSales>) -> ShiftSalesReport {
    for item in shifts.iter_mut().flat_map(|shift| shift.delivery.iter_mut()) {
        if item.delivery_service.as_deref().is_none_or(str::is_empty) {
            item.delivery_service = Some(OTHER_DELIVERY_SERVICE.to_string());
        }
    }
    let summary = summarize_shift_sales(&shifts);
    ShiftSalesReport { shifts, summary }
}

/// Fetches a screen under the stale-response guard.
///
/// Session loss and invalid filters propagate; any other failure is logged and
/// degrades to `ScreenView::Empty`.
///
/// # Arguments
///
/// * `views` - The generation counters.
/// * `session` - The browser session.
/// * `screen` - The screen being fetched.
/// * `fetch` - The upstream call.
///
/// # Returns
///
/// The view to display, or `Superseded` when a newer fetch started meanwhile.
pub async fn load_screen<T, F>(
    views: &ViewGenerations,
    session: SessionId,
    screen: Screen,
    fetch: F,
) -> Result<ScreenView<T>>
where
    T: Blank,
    F: Future<Output = Result<T>>,
{
    let ticket = views.begin(session, screen);
    let outcome = fetch.await;

    if !views.is_current(&ticket) {
        tracing::debug!(
            "Dropping superseded {:?} response (generation {})",
            screen,
            ticket.generation()
        );
        return Ok(ScreenView::Superseded);
    }

    match outcome {
        Ok(data) if data.is_blank() => Ok(ScreenView::Empty),
        Ok(data) => Ok(ScreenView::Loaded(data)),
        Err(e) if e.is_session_loss() => {
            views.forget(session);
            Err(e)
        }
        Err(e @ AppError::Validation(_)) => Err(e),
        Err(e) => {
            tracing::error!("Failed to load {:?}: {}", screen, e);
            Ok(ScreenView::Empty)
        }
    }
}

/// Loads the POS staff list.
pub async fn employees(
    client: &SessionClient,
    views: &ViewGenerations,
    session: SessionId,
) -> Result<ScreenView<Vec<Employee>>> {
    load_screen(views, session, Screen::Employees, async {
        client.get_json(session, &employees_request()).await
    })
    .await
}

/// Loads the staff known to the salary engine.
pub async fn staff(
    client: &SessionClient,
    views: &ViewGenerations,
    session: SessionId,
) -> Result<ScreenView<Vec<StaffMember>>> {
    load_screen(views, session, Screen::Staff, async {
        client.get_json(session, &staff_request()).await
    })
    .await
}

/// Loads the pay rules.
pub async fn salary_rules(
    client: &SessionClient,
    views: &ViewGenerations,
    session: SessionId,
) -> Result<ScreenView<Vec<SalaryRule>>> {
    load_screen(views, session, Screen::SalaryRules, async {
        client.get_json(session, &salary_rules_request()).await
    })
    .await
}

/// Loads the shift schedule of a month.
pub async fn schedule(
    client: &SessionClient,
    views: &ViewGenerations,
    session: SessionId,
    query: &MonthQuery,
    today: NaiveDate,
) -> Result<ScreenView<Vec<ScheduledDay>>> {
    let request = schedule_request(query, today)?;
    load_screen(views, session, Screen::Schedule, async {
        client.get_json(session, &request).await
    })
    .await
}

/// Loads the salary table of a month with per-employee totals.
pub async fn salaries(
    client: &SessionClient,
    views: &ViewGenerations,
    session: SessionId,
    query: &MonthQuery,
    today: NaiveDate,
) -> Result<ScreenView<SalaryTable>> {
    let request = salary_records_request(query, today)?;
    load_screen(views, session, Screen::Salaries, async {
        let records: SalaryRecords = client.get_json(session, &request).await?;
        Ok(salary_table(records))
    })
    .await
}

/// Loads cash-register shifts of a date range with their totals.
pub async fn cash_shifts(
    client: &SessionClient,
    views: &ViewGenerations,
    session: SessionId,
    query: &CashShiftQuery,
    today: NaiveDate,
) -> Result<ScreenView<CashShiftReport>> {
    let request = cash_shifts_request(query, today)?;
    load_screen(views, session, Screen::CashShifts, async {
        let shifts: Vec<CashShift> = client.get_json(session, &request).await?;
        Ok(cash_shift_report(shifts))
    })
    .await
}

/// Loads product sales of every shift of a day with their totals.
pub async fn shift_sales(
    client: &SessionClient,
    views: &ViewGenerations,
    session: SessionId,
    query: &ShiftSalesQuery,
    today: NaiveDate,
) -> Result<ScreenView<ShiftSalesReport>> {
    let request = shift_sales_request(query, today);
    load_screen(views, session, Screen::ShiftSales, async {
        let payload: ShiftSalesPayload = client.get_json(session, &request).await?;
        Ok(shift_sales_report(payload.into_shifts()))
    })
    .await
}

/// Loads aggregated analytics.
pub async fn statistics(
    client: &SessionClient,
    views: &ViewGenerations,
    session: SessionId,
    query: &StatisticsQuery,
    today: NaiveDate,
) -> Result<ScreenView<Statistics>> {
    let request = statistics_request(query, today)?;
    load_screen(views, session, Screen::Statistics, async {
        fetch_statistics(client, session, &request, &query.kind).await
    })
    .await
}
