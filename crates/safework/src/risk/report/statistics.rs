use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use tracing::{debug, warn};

use super::super::classification::{
    ImprovementStatus, InterventionType, ManagementLevel, RiskCategory,
};
use super::super::domain::{AtRiskEmployee, RiskIntervention, RiskMonitoring};
use super::super::repository::{
    EmployeeFilter, InterventionFilter, MonitoringFilter, Page, ReminderScheduler,
    RiskRepository, StatisticsCache,
};
use super::super::service::{RiskManagementService, RiskServiceError};
use super::views::{CategoryCount, InterventionTypeCount, ManagementLevelCount, RiskStatistics};

/// Inclusive date range covered by a statistics request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportingPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ReportingPeriod {
    /// A calendar month, or the whole year when `month` is `None`.
    pub fn new(year: i32, month: Option<u32>) -> Option<Self> {
        match month {
            Some(month) => {
                let start = NaiveDate::from_ymd_opt(year, month, 1)?;
                let next = if month == 12 {
                    NaiveDate::from_ymd_opt(year + 1, 1, 1)?
                } else {
                    NaiveDate::from_ymd_opt(year, month + 1, 1)?
                };
                Some(Self {
                    start,
                    end: next.pred_opt()?,
                })
            }
            None => Some(Self {
                start: NaiveDate::from_ymd_opt(year, 1, 1)?,
                end: NaiveDate::from_ymd_opt(year, 12, 31)?,
            }),
        }
    }

    pub fn month_of(date: NaiveDate) -> Option<Self> {
        Self::new(date.year(), Some(date.month()))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Whether an employee's management interval overlaps the period.
    pub fn overlaps(&self, employee: &AtRiskEmployee) -> bool {
        employee.registration_date <= self.end
            && employee
                .resolution_date
                .map_or(true, |resolved| resolved >= self.start)
    }
}

pub fn statistics_cache_key(year: i32, month: Option<u32>) -> String {
    match month {
        Some(month) => format!("risk_statistics:{year}:{month}"),
        None => format!("risk_statistics:{year}:all"),
    }
}

pub(crate) fn category_breakdown<'a>(
    employees: impl IntoIterator<Item = &'a AtRiskEmployee>,
) -> Vec<CategoryCount> {
    let mut counts: HashMap<RiskCategory, usize> = HashMap::new();
    for employee in employees {
        for category in &employee.risk_categories {
            *counts.entry(*category).or_default() += 1;
        }
    }

    RiskCategory::ordered()
        .into_iter()
        .filter_map(|category| {
            counts.get(&category).map(|count| CategoryCount {
                category,
                label: category.label().to_string(),
                count: *count,
            })
        })
        .collect()
}

pub(crate) fn level_breakdown<'a>(
    employees: impl IntoIterator<Item = &'a AtRiskEmployee>,
) -> Vec<ManagementLevelCount> {
    let mut counts: HashMap<ManagementLevel, usize> = HashMap::new();
    for employee in employees {
        *counts.entry(employee.management_level).or_default() += 1;
    }

    ManagementLevel::ordered()
        .into_iter()
        .filter_map(|level| {
            counts.get(&level).map(|count| ManagementLevelCount {
                level,
                label: level.label().to_string(),
                count: *count,
            })
        })
        .collect()
}

fn intervention_breakdown(interventions: &[&RiskIntervention]) -> Vec<InterventionTypeCount> {
    let mut counts: HashMap<InterventionType, usize> = HashMap::new();
    for intervention in interventions {
        *counts.entry(intervention.intervention_type).or_default() += 1;
    }

    InterventionType::ordered()
        .into_iter()
        .filter_map(|kind| {
            counts.get(&kind).map(|count| InterventionTypeCount {
                intervention_type: kind,
                label: kind.label().to_string(),
                count: *count,
            })
        })
        .collect()
}

pub(crate) fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Pure statistics over already-loaded records. Records outside the period are ignored.
pub fn build_statistics(
    year: i32,
    month: Option<u32>,
    period: ReportingPeriod,
    employees: &[AtRiskEmployee],
    interventions: &[RiskIntervention],
    monitoring: &[RiskMonitoring],
) -> RiskStatistics {
    let in_period: Vec<&AtRiskEmployee> = employees
        .iter()
        .filter(|employee| period.overlaps(employee))
        .collect();
    let active: Vec<&AtRiskEmployee> = in_period
        .iter()
        .copied()
        .filter(|employee| employee.is_active)
        .collect();

    let new_registrations = in_period
        .iter()
        .filter(|employee| period.contains(employee.registration_date))
        .count();
    let resolved_employees = in_period
        .iter()
        .filter(|employee| {
            employee
                .resolution_date
                .map_or(false, |resolved| period.contains(resolved))
        })
        .count();

    let interventions: Vec<&RiskIntervention> = interventions
        .iter()
        .filter(|intervention| period.contains(intervention.intervention_date.date()))
        .collect();
    let monitoring: Vec<&RiskMonitoring> = monitoring
        .iter()
        .filter(|record| period.contains(record.monitoring_date))
        .collect();
    let improved_monitoring = monitoring
        .iter()
        .filter(|record| record.improvement_status == Some(ImprovementStatus::Improved))
        .count();
    let improvement_rate = if monitoring.is_empty() {
        0.0
    } else {
        round_one_decimal(improved_monitoring as f64 / monitoring.len() as f64 * 100.0)
    };

    RiskStatistics {
        year,
        month,
        total_employees: in_period.len(),
        active_employees: active.len(),
        new_registrations,
        resolved_employees,
        by_category: category_breakdown(active.iter().copied()),
        by_management_level: level_breakdown(active.iter().copied()),
        total_interventions: interventions.len(),
        interventions_by_type: intervention_breakdown(&interventions),
        total_monitoring: monitoring.len(),
        improved_monitoring,
        improvement_rate,
    }
}

impl<R, N, C> RiskManagementService<R, N, C>
where
    R: RiskRepository + 'static,
    N: ReminderScheduler + 'static,
    C: StatisticsCache + 'static,
{
    /// Statistics for a month or a whole year, served from the cache while fresh.
    ///
    /// Cache failures are logged and otherwise ignored.
    pub fn compute_statistics(
        &self,
        year: i32,
        month: Option<u32>,
    ) -> Result<RiskStatistics, RiskServiceError> {
        let period = ReportingPeriod::new(year, month)
            .ok_or(RiskServiceError::InvalidPeriod { year, month })?;
        let key = statistics_cache_key(year, month);

        match self.cache.get(&key) {
            Ok(Some(cached)) => {
                debug!(%key, "statistics cache hit");
                return Ok(cached);
            }
            Ok(None) => {}
            Err(err) => warn!(%key, error = %err, "statistics cache read failed"),
        }

        let employees = self.repository.list_employees(
            &EmployeeFilter {
                registered_to: Some(period.end),
                ..EmployeeFilter::default()
            },
            Page::all(),
        )?;
        let interventions = self.repository.list_interventions(
            &InterventionFilter {
                from: Some(period.start),
                to: Some(period.end),
                ..InterventionFilter::default()
            },
            Page::all(),
        )?;
        let monitoring = self.repository.list_monitoring(
            &MonitoringFilter {
                from: Some(period.start),
                to: Some(period.end),
                ..MonitoringFilter::default()
            },
            Page::all(),
        )?;

        let statistics = build_statistics(
            year,
            month,
            period,
            &employees,
            &interventions,
            &monitoring,
        );

        if let Err(err) = self
            .cache
            .set(&key, statistics.clone(), self.config.statistics_cache_ttl)
        {
            warn!(%key, error = %err, "statistics cache write failed");
        }
        Ok(statistics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_period_covers_whole_month() {
        let february = ReportingPeriod::new(2024, Some(2)).expect("valid");
        assert_eq!(february.start, NaiveDate::from_ymd_opt(2024, 2, 1).expect("valid"));
        assert_eq!(february.end, NaiveDate::from_ymd_opt(2024, 2, 29).expect("valid"));

        let december = ReportingPeriod::new(2023, Some(12)).expect("valid");
        assert_eq!(december.end, NaiveDate::from_ymd_opt(2023, 12, 31).expect("valid"));

        let year = ReportingPeriod::new(2023, None).expect("valid");
        assert!(year.contains(NaiveDate::from_ymd_opt(2023, 7, 4).expect("valid")));
    }

    #[test]
    fn invalid_months_have_no_period() {
        assert!(ReportingPeriod::new(2024, Some(0)).is_none());
        assert!(ReportingPeriod::new(2024, Some(13)).is_none());
    }

    #[test]
    fn cache_keys_separate_months_from_years() {
        assert_eq!(statistics_cache_key(2024, Some(3)), "risk_statistics:2024:3");
        assert_eq!(statistics_cache_key(2024, None), "risk_statistics:2024:all");
    }
}
