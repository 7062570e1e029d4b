//! Ratio and growth arithmetic over one filing's account amounts.
//!
//! A filing carries three periods per account line: the fiscal year it
//! reports on (`thstrm`), the year before (`frmtrm`) and the year before
//! that (`bfefrmtrm`). Ratios divide with a zero guard and are reported in
//! percent; an account missing from the filing counts as zero.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

use crate::models::{metrics::RatioSet, statement::RawFinancialStatement};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed amount {raw:?} for account {account}")]
pub(crate) struct CalculationError {
    pub account: String,
    pub raw: String,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Period {
    Current,
    Previous,
    BeforePrevious,
}

impl Period {
    /// Oldest first
    pub const ALL: [Period; 3] = [Period::BeforePrevious, Period::Previous, Period::Current];

    pub fn prior(self) -> Option<Period> {
        match self {
            Period::Current => Some(Period::Previous),
            Period::Previous => Some(Period::BeforePrevious),
            Period::BeforePrevious => None,
        }
    }

    /// Fiscal year of this period for a filing on `year`
    pub fn fiscal_year(self, year: i32) -> i32 {
        match self {
            Period::Current => year,
            Period::Previous => year - 1,
            Period::BeforePrevious => year - 2,
        }
    }
}

/// Accounts the ratios are built from, with the labels filings use for them
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Account {
    TotalAssets,
    TotalLiabilities,
    TotalEquity,
    CurrentAssets,
    CurrentLiabilities,
    Revenue,
    OperatingProfit,
    NetIncome,
}

impl Account {
    fn labels(self) -> &'static [&'static str] {
        match self {
            Account::TotalAssets => &["자산총계"],
            Account::TotalLiabilities => &["부채총계"],
            Account::TotalEquity => &["자본총계"],
            Account::CurrentAssets => &["유동자산"],
            Account::CurrentLiabilities => &["유동부채"],
            Account::Revenue => &["매출액", "수익(매출액)", "영업수익", "매출"],
            Account::OperatingProfit => &["영업이익", "영업이익(손실)"],
            Account::NetIncome => &["당기순이익", "당기순이익(손실)", "당기순손익"],
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub(crate) struct PeriodAmounts {
    pub current: Decimal,
    pub previous: Decimal,
    pub before_previous: Decimal,
}

impl PeriodAmounts {
    pub fn get(&self, period: Period) -> Decimal {
        match period {
            Period::Current => self.current,
            Period::Previous => self.previous,
            Period::BeforePrevious => self.before_previous,
        }
    }
}

fn normalize(label: &str) -> String {
    label.chars().filter(|c| !c.is_whitespace()).collect()
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Integer part with or without thousands separators: "1234", "1,234"
fn grouped_digits(int_part: &str) -> Option<String> {
    if !int_part.contains(',') {
        return is_digits(int_part).then(|| int_part.to_string());
    }

    let mut groups = int_part.split(',');
    let lead = groups.next()?;
    if !is_digits(lead) || lead.len() > 3 {
        return None;
    }
    let mut digits = lead.to_string();
    for group in groups {
        if !is_digits(group) || group.len() != 3 {
            return None;
        }
        digits.push_str(group);
    }
    Some(digits)
}

/// Parses a filed amount such as "1,234,567", "-3,000" or "+12.5". Blank
/// and "-" mean the line has no value for the period and read as zero.
pub(crate) fn parse_amount(account: &str, raw: &str) -> Result<Decimal, CalculationError> {
    let malformed = || CalculationError {
        account: account.to_string(),
        raw: raw.to_string(),
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return Ok(Decimal::ZERO);
    }

    let (sign, unsigned) = match trimmed.as_bytes()[0] {
        b'-' => ("-", &trimmed[1..]),
        b'+' => ("", &trimmed[1..]),
        _ => ("", trimmed),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (unsigned, None),
    };

    let mut cleaned = format!("{sign}{}", grouped_digits(int_part).ok_or_else(malformed)?);
    if let Some(frac_part) = frac_part {
        if !is_digits(frac_part) {
            return Err(malformed());
        }
        cleaned.push('.');
        cleaned.push_str(frac_part);
    }

    Decimal::from_str(&cleaned).map_err(|_| malformed())
}

/// Account name to per-period amounts for one (corporation, fiscal year)
#[derive(Debug, Clone, Default)]
pub(crate) struct AccountBook {
    accounts: HashMap<String, PeriodAmounts>,
}

impl AccountBook {
    /// Builds the book from balance-sheet and income-statement lines; other
    /// divisions are skipped. The first line wins when a label repeats.
    pub fn from_statements(rows: &[RawFinancialStatement]) -> Result<Self, CalculationError> {
        let mut book = AccountBook::default();
        for row in rows.iter().filter(|row| row.sj_div.is_ratio_source()) {
            let account = row.account_nm.as_str();
            let amounts = PeriodAmounts {
                current: parse_amount(account, &row.thstrm_amount)?,
                previous: parse_amount(account, &row.frmtrm_amount)?,
                before_previous: parse_amount(
                    account,
                    row.bfefrmtrm_amount.as_deref().unwrap_or_default(),
                )?,
            };
            book.accounts.entry(normalize(account)).or_insert(amounts);
        }
        Ok(book)
    }

    #[cfg(test)]
    pub fn insert(&mut self, label: &str, amounts: PeriodAmounts) {
        self.accounts.insert(normalize(label), amounts);
    }

    pub fn amount(&self, account: Account, period: Period) -> Decimal {
        account
            .labels()
            .iter()
            .find_map(|label| self.accounts.get(&normalize(label)))
            .map(|amounts| amounts.get(period))
            .unwrap_or(Decimal::ZERO)
    }
}

/// Falls back to f64 arithmetic when the quotient leaves the Decimal range.
/// Callers guarantee a non-zero denominator.
fn percent(numerator: Decimal, denominator: Decimal) -> Option<f64> {
    match numerator.checked_div(denominator) {
        Some(quotient) => match quotient.checked_mul(Decimal::ONE_HUNDRED) {
            Some(scaled) => scaled.to_f64(),
            None => Some(quotient.to_f64()? * 100.0),
        },
        None => Some(numerator.to_f64()? / denominator.to_f64()? * 100.0),
    }
}

/// `numerator / denominator × 100`, undefined when the denominator is zero
pub(crate) fn safe_ratio(numerator: Decimal, denominator: Decimal) -> Option<f64> {
    if denominator.is_zero() {
        return None;
    }
    percent(numerator, denominator)
}

/// `(current − previous) / |previous| × 100`. A zero previous value gives
/// exactly 0, whatever the current value.
pub(crate) fn growth_rate(current: Decimal, previous: Decimal) -> Option<f64> {
    if previous.is_zero() {
        return Some(0.0);
    }
    match current.checked_sub(previous) {
        Some(change) => percent(change, previous.abs()),
        None => Some((current.to_f64()? - previous.to_f64()?) / previous.abs().to_f64()? * 100.0),
    }
}

/// Ratios for `period`. Growth compares against the period before it, so
/// the oldest period of a filing has no growth values.
pub(crate) fn calculate_ratios(book: &AccountBook, period: Period) -> RatioSet {
    let amount = |account| book.amount(account, period);
    let growth = |account| {
        period
            .prior()
            .and_then(|prior| growth_rate(amount(account), book.amount(account, prior)))
    };

    let total_assets = amount(Account::TotalAssets);
    let total_liabilities = amount(Account::TotalLiabilities);
    let total_equity = amount(Account::TotalEquity);
    let revenue = amount(Account::Revenue);
    let net_income = amount(Account::NetIncome);

    RatioSet {
        debt_ratio: safe_ratio(total_liabilities, total_equity),
        current_ratio: safe_ratio(
            amount(Account::CurrentAssets),
            amount(Account::CurrentLiabilities),
        ),
        debt_dependency: safe_ratio(total_liabilities, total_assets),
        operating_profit_ratio: safe_ratio(amount(Account::OperatingProfit), revenue),
        net_profit_ratio: safe_ratio(net_income, revenue),
        roe: safe_ratio(net_income, total_equity),
        roa: safe_ratio(net_income, total_assets),
        sales_growth: growth(Account::Revenue),
        operating_profit_growth: growth(Account::OperatingProfit),
        // The major-accounts filing has no per-share line; net income stands in.
        eps_growth: growth(Account::NetIncome),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::tests::statement_row;
    use rust_decimal_macros::dec;

    fn amounts(current: Decimal, previous: Decimal, before_previous: Decimal) -> PeriodAmounts {
        PeriodAmounts {
            current,
            previous,
            before_previous,
        }
    }

    #[test]
    fn test_growth_rate_known_values() {
        assert_eq!(growth_rate(dec!(120), dec!(100)), Some(20.0));
        assert_eq!(growth_rate(dec!(80), dec!(100)), Some(-20.0));
    }

    #[test]
    fn test_growth_rate_uses_absolute_previous() {
        assert_eq!(growth_rate(dec!(-50), dec!(-100)), Some(50.0));
        assert_eq!(growth_rate(dec!(100), dec!(-100)), Some(200.0));
    }

    #[test]
    fn test_growth_rate_zero_previous_is_zero() {
        for current in [dec!(0), dec!(1), dec!(-250), dec!(1000000000)] {
            assert_eq!(growth_rate(current, Decimal::ZERO), Some(0.0));
        }
    }

    #[test]
    fn test_safe_ratio_zero_denominator_is_undefined() {
        assert_eq!(safe_ratio(dec!(10), Decimal::ZERO), None);
        assert_eq!(safe_ratio(Decimal::ZERO, Decimal::ZERO), None);
        assert_eq!(safe_ratio(Decimal::ZERO, dec!(10)), Some(0.0));
    }

    #[test]
    fn test_debt_ratio() {
        let mut book = AccountBook::default();
        book.insert("부채총계", amounts(dec!(50), dec!(40), dec!(30)));
        book.insert("자본총계", amounts(dec!(100), dec!(0), dec!(60)));

        assert_eq!(calculate_ratios(&book, Period::Current).debt_ratio, Some(50.0));
        assert_eq!(calculate_ratios(&book, Period::Previous).debt_ratio, None);
        assert_eq!(calculate_ratios(&book, Period::BeforePrevious).debt_ratio, Some(50.0));
    }

    #[test]
    fn test_every_ratio_undefined_for_empty_book() {
        let ratios = calculate_ratios(&AccountBook::default(), Period::Current);
        assert_eq!(ratios.debt_ratio, None);
        assert_eq!(ratios.current_ratio, None);
        assert_eq!(ratios.debt_dependency, None);
        assert_eq!(ratios.operating_profit_ratio, None);
        assert_eq!(ratios.net_profit_ratio, None);
        assert_eq!(ratios.roe, None);
        assert_eq!(ratios.roa, None);
        assert_eq!(ratios.sales_growth, Some(0.0));
        assert_eq!(ratios.operating_profit_growth, Some(0.0));
        assert_eq!(ratios.eps_growth, Some(0.0));
    }

    #[test]
    fn test_full_ratio_set() {
        let mut book = AccountBook::default();
        book.insert("자산총계", amounts(dec!(400), dec!(300), dec!(0)));
        book.insert("부채총계", amounts(dec!(100), dec!(100), dec!(0)));
        book.insert("자본총계", amounts(dec!(300), dec!(200), dec!(0)));
        book.insert("유동자산", amounts(dec!(150), dec!(90), dec!(0)));
        book.insert("유동부채", amounts(dec!(50), dec!(60), dec!(0)));
        book.insert("매출액", amounts(dec!(1200), dec!(1000), dec!(0)));
        book.insert("영업이익", amounts(dec!(120), dec!(150), dec!(0)));
        book.insert("당기순이익", amounts(dec!(60), dec!(50), dec!(0)));

        let ratios = calculate_ratios(&book, Period::Current);
        assert_eq!(ratios.debt_ratio.map(|v| (v * 1e6).round() / 1e6), Some(33.333333));
        assert_eq!(ratios.current_ratio, Some(300.0));
        assert_eq!(ratios.debt_dependency, Some(25.0));
        assert_eq!(ratios.operating_profit_ratio, Some(10.0));
        assert_eq!(ratios.net_profit_ratio, Some(5.0));
        assert_eq!(ratios.roe, Some(20.0));
        assert_eq!(ratios.roa, Some(15.0));
        assert_eq!(ratios.sales_growth, Some(20.0));
        assert_eq!(ratios.operating_profit_growth, Some(-20.0));
        assert_eq!(ratios.eps_growth, Some(20.0));
    }

    #[test]
    fn test_oldest_period_has_no_growth() {
        let mut book = AccountBook::default();
        book.insert("매출액", amounts(dec!(120), dec!(100), dec!(90)));

        let ratios = calculate_ratios(&book, Period::BeforePrevious);
        assert_eq!(ratios.sales_growth, None);
        assert_eq!(ratios.eps_growth, None);

        let previous = calculate_ratios(&book, Period::Previous);
        assert_eq!(previous.sales_growth.map(|v| (v * 100.0).round() / 100.0), Some(11.11));
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("매출액", "1,234,567").unwrap(), dec!(1234567));
        assert_eq!(parse_amount("매출액", "-3,000").unwrap(), dec!(-3000));
        assert_eq!(parse_amount("매출액", " 12.5 ").unwrap(), dec!(12.5));
        assert_eq!(parse_amount("매출액", "").unwrap(), Decimal::ZERO);
        assert_eq!(parse_amount("매출액", "-").unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_parse_amount_rejects_malformed() {
        let err = parse_amount("매출액", "12a4").unwrap_err();
        assert_eq!(err.account, "매출액");
        assert_eq!(err.raw, "12a4");
        assert!(parse_amount("매출액", "1.2.3").is_err());
        assert!(parse_amount("매출액", "--5").is_err());
        assert!(parse_amount("매출액", "+-5").is_err());
        assert!(parse_amount("매출액", "12.").is_err());
    }

    #[test]
    fn test_parse_amount_sign_and_separators() {
        assert_eq!(parse_amount("매출액", "+1,234").unwrap(), dec!(1234));
        assert_eq!(parse_amount("매출액", "+0.75").unwrap(), dec!(0.75));
        assert_eq!(parse_amount("매출액", "999,999.5").unwrap(), dec!(999999.5));
        for misplaced in ["1,2,3", "1234,567", ",123", "1,234,", "1,23", "12,345.6,7"] {
            assert!(parse_amount("매출액", misplaced).is_err(), "{misplaced}");
        }
    }

    #[test]
    fn test_ratio_beyond_decimal_range_is_defined() {
        // Quotient fits, quotient × 100 does not
        let ratio = safe_ratio(Decimal::MAX, Decimal::ONE).unwrap();
        assert!(ratio > 7.9e30);

        // Quotient itself overflows
        let ratio = safe_ratio(Decimal::MAX, dec!(0.5)).unwrap();
        assert!(ratio > 1.5e31);

        assert_eq!(growth_rate(Decimal::MAX, Decimal::MIN), Some(200.0));
    }

    #[test]
    fn test_book_from_statements() {
        let rows = vec![
            statement_row("00126380", "BS", "부채총계", "50", "40"),
            statement_row("00126380", "BS", "자본총계", "100", "80"),
            statement_row("00126380", "IS", "당기순이익(손실)", "10", "8"),
            statement_row("00126380", "CF", "자본총계", "999", "999"),
        ];
        let book = AccountBook::from_statements(&rows).unwrap();

        assert_eq!(book.amount(Account::TotalEquity, Period::Current), dec!(100));
        assert_eq!(book.amount(Account::NetIncome, Period::Previous), dec!(8));
        assert_eq!(book.amount(Account::NetIncome, Period::BeforePrevious), Decimal::ZERO);
        assert_eq!(book.amount(Account::Revenue, Period::Current), Decimal::ZERO);
        assert_eq!(calculate_ratios(&book, Period::Current).debt_ratio, Some(50.0));
    }

    #[test]
    fn test_book_matches_labels_ignoring_spaces() {
        let rows = vec![statement_row("00126380", "IS", "영업 이익", "30", "20")];
        let book = AccountBook::from_statements(&rows).unwrap();
        assert_eq!(book.amount(Account::OperatingProfit, Period::Current), dec!(30));
    }

    #[test]
    fn test_book_from_statements_reports_malformed_amount() {
        let rows = vec![statement_row("00126380", "BS", "자산총계", "1,000", "n/a")];
        let err = AccountBook::from_statements(&rows).unwrap_err();
        assert_eq!(err.account, "자산총계");
        assert_eq!(err.raw, "n/a");
    }
}
