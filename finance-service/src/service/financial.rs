use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{Datelike, Utc};
use std::sync::Arc;
use tracing::info;

use crate::{
    models::{
        financial::{
            DebtLiquidityData, FinancialMetrics, FinancialMetricsResponse, FinancialQuery,
            FinancialRequest, GrowthData,
        },
        metrics::RatioSet,
    },
    AppState,
};

use super::common::AppError;
use super::ratio_service::RatioService;
use super::ratios::{calculate_ratios, AccountBook, Period};
use super::statement_service::StatementService;

pub(crate) async fn financial(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FinancialQuery>,
    Json(request): Json<FinancialRequest>,
) -> impl IntoResponse {
    let year = query.year.unwrap_or_else(|| Utc::now().year() - 1);

    match company_financials(&state, &request.company_name, year).await {
        Ok(response) => response.into_response(),
        Err(e) => e.into_response(),
    }
}

async fn company_financials(
    state: &AppState,
    company_name: &str,
    year: i32,
) -> Result<FinancialMetricsResponse, AppError> {
    let bsns_year = year.to_string();
    let statements = StatementService::new(&state.db.pool, state.dart.as_ref());

    let company = statements.find_company(company_name).await?;
    let rows = statements
        .ensure_statements(&company.corp_code, &bsns_year)
        .await?;

    RatioService::new(&state.db.pool)
        .calculate_and_save(&company.corp_code, &bsns_year)
        .await?;

    let book = AccountBook::from_statements(&rows)?;
    info!(
        "Serving financials of {} ({}) for {bsns_year}",
        company.corp_name, company.corp_code
    );
    Ok(build_response(&company.corp_name, year, &book))
}

fn years(periods: &[(String, RatioSet)]) -> Vec<String> {
    periods.iter().map(|(year, _)| year.clone()).collect()
}

/// Chart series over the three periods of one filing, oldest first.
/// Growth needs a prior period, so its series skips the oldest year.
pub(crate) fn build_response(
    company_name: &str,
    year: i32,
    book: &AccountBook,
) -> FinancialMetricsResponse {
    let per_period: Vec<(String, RatioSet)> = Period::ALL
        .iter()
        .map(|period| (period.fiscal_year(year).to_string(), calculate_ratios(book, *period)))
        .collect();
    let growth_periods = &per_period[1..];

    FinancialMetricsResponse {
        company_name: company_name.to_string(),
        financial_metrics: FinancialMetrics {
            operating_margin: per_period.iter().map(|(_, r)| r.operating_profit_ratio).collect(),
            net_margin: per_period.iter().map(|(_, r)| r.net_profit_ratio).collect(),
            roe: per_period.iter().map(|(_, r)| r.roe).collect(),
            roa: per_period.iter().map(|(_, r)| r.roa).collect(),
            years: years(&per_period),
        },
        growth_data: GrowthData {
            revenue_growth: growth_periods.iter().map(|(_, r)| r.sales_growth).collect(),
            net_income_growth: growth_periods.iter().map(|(_, r)| r.eps_growth).collect(),
            years: years(growth_periods),
        },
        debt_liquidity_data: DebtLiquidityData {
            debt_ratio: per_period.iter().map(|(_, r)| r.debt_ratio).collect(),
            current_ratio: per_period.iter().map(|(_, r)| r.current_ratio).collect(),
            years: years(&per_period),
        },
    }
}
