//! Public-holiday collaborator.
//!
//! Holidays only enrich the generation prompt. `HolidayCalendar` is the seam;
//! `NagerHolidayCalendar` reads the public Nager.Date API.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::config::HolidayConfig;
use crate::error::HolidayError;
use crate::program::days::{date_for_day, day_of_week, week_end_friday};
use crate::types::WeekHoliday;

/// One public holiday as returned by the calendar service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicHoliday {
    pub date: NaiveDate,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_name: Option<String>,
}

#[async_trait]
pub trait HolidayCalendar: Send + Sync {
    async fn holidays_for_year(&self, year: i32) -> Result<Vec<PublicHoliday>, HolidayError>;
}

pub struct NagerHolidayCalendar {
    client: reqwest::Client,
    base_url: String,
    country_code: String,
}

impl NagerHolidayCalendar {
    pub fn new(config: &HolidayConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            country_code: config.country_code.clone(),
        }
    }
}

#[async_trait]
impl HolidayCalendar for NagerHolidayCalendar {
    async fn holidays_for_year(&self, year: i32) -> Result<Vec<PublicHoliday>, HolidayError> {
        let url = format!(
            "{}/api/v3/PublicHolidays/{}/{}",
            self.base_url, year, self.country_code
        );
        let resp = self.client.get(&url).send().await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(HolidayError::Api { status, body });
        }

        Ok(resp.json().await?)
    }
}

/// Holidays falling on Monday–Friday of the week starting at `week_start`.
pub fn holidays_in_week(holidays: &[PublicHoliday], week_start: NaiveDate) -> Vec<WeekHoliday> {
    let week_end = week_end_friday(week_start);
    let mut found: Vec<WeekHoliday> = holidays
        .iter()
        .filter(|h| h.date >= week_start && h.date <= week_end)
        .map(|h| WeekHoliday {
            day_of_week: day_of_week(h.date),
            date: h.date,
            name: h.name.clone(),
        })
        .collect();
    found.sort_by_key(|h| h.date);
    found.dedup_by(|a, b| a.date == b.date && a.name == b.name);
    found
}

/// Fetch the holidays for a school week, querying both years when the week
/// crosses New Year.
pub async fn lookup_week_holidays(
    calendar: &dyn HolidayCalendar,
    week_start: NaiveDate,
) -> Result<Vec<WeekHoliday>, HolidayError> {
    let first_year = week_start.year();
    let last_year = date_for_day(week_start, 5).year();

    let mut holidays = calendar.holidays_for_year(first_year).await?;
    if last_year != first_year {
        holidays.extend(calendar.holidays_for_year(last_year).await?);
    }

    let week = holidays_in_week(&holidays, week_start);
    log::debug!(
        "{} public holiday(s) in week of {}",
        week.len(),
        week_start
    );
    Ok(week)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn holiday(d: &str, name: &str) -> PublicHoliday {
        PublicHoliday {
            date: date(d),
            name: name.to_string(),
            local_name: None,
        }
    }

    struct FakeCalendar {
        years: Mutex<Vec<i32>>,
        holidays: Vec<PublicHoliday>,
    }

    #[async_trait]
    impl HolidayCalendar for FakeCalendar {
        async fn holidays_for_year(&self, year: i32) -> Result<Vec<PublicHoliday>, HolidayError> {
            self.years.lock().unwrap().push(year);
            Ok(self
                .holidays
                .iter()
                .filter(|h| h.date.year() == year)
                .cloned()
                .collect())
        }
    }

    #[test]
    fn test_holidays_in_week_filters_to_weekdays() {
        let holidays = vec![
            holiday("2025-03-21", "Human Rights Day"),
            holiday("2025-03-22", "Saturday thing"),
            holiday("2025-03-14", "Last week"),
        ];
        let week = holidays_in_week(&holidays, date("2025-03-17"));
        assert_eq!(
            week,
            vec![WeekHoliday {
                day_of_week: 5,
                date: date("2025-03-21"),
                name: "Human Rights Day".to_string(),
            }]
        );
    }

    #[test]
    fn test_parses_nager_payload() {
        let body = r#"[{"date":"2025-04-28","localName":"Freedom Day","name":"Freedom Day","countryCode":"ZA","fixed":false,"global":true,"counties":null,"launchYear":null,"types":["Public"]}]"#;
        let parsed: Vec<PublicHoliday> = serde_json::from_str(body).unwrap();
        assert_eq!(parsed[0].date, date("2025-04-28"));
        assert_eq!(parsed[0].local_name.as_deref(), Some("Freedom Day"));
    }

    #[tokio::test]
    async fn test_lookup_queries_both_years_across_new_year() {
        let calendar = FakeCalendar {
            years: Mutex::new(Vec::new()),
            holidays: vec![
                holiday("2025-12-31", "Not a holiday but fine"),
                holiday("2026-01-01", "New Year's Day"),
            ],
        };
        // Monday 2025-12-29 to Friday 2026-01-02.
        let week = lookup_week_holidays(&calendar, date("2025-12-29")).await.unwrap();
        assert_eq!(*calendar.years.lock().unwrap(), vec![2025, 2026]);
        assert_eq!(week.len(), 2);
        assert_eq!(week[1].day_of_week, 4);
    }

    #[tokio::test]
    async fn test_lookup_single_year() {
        let calendar = FakeCalendar {
            years: Mutex::new(Vec::new()),
            holidays: vec![holiday("2025-04-28", "Freedom Day")],
        };
        let week = lookup_week_holidays(&calendar, date("2025-04-28")).await.unwrap();
        assert_eq!(*calendar.years.lock().unwrap(), vec![2025]);
        assert_eq!(week[0].day_of_week, 1);
    }
}
