use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Health or exposure finding that puts an employee under risk management.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskCategory {
    #[serde(rename = "고혈압")]
    Hypertension,
    #[serde(rename = "당뇨")]
    Diabetes,
    #[serde(rename = "심혈관질환")]
    Cardiovascular,
    #[serde(rename = "청력이상")]
    HearingAbnormality,
    #[serde(rename = "근골격계질환")]
    Musculoskeletal,
    #[serde(rename = "호흡기질환")]
    Respiratory,
    #[serde(rename = "간질환")]
    Liver,
    #[serde(rename = "직무스트레스")]
    JobStress,
    #[serde(rename = "화학물질노출")]
    ChemicalExposure,
    #[serde(rename = "기타")]
    Other,
}

impl RiskCategory {
    pub const fn ordered() -> [Self; 10] {
        [
            Self::Hypertension,
            Self::Diabetes,
            Self::Cardiovascular,
            Self::HearingAbnormality,
            Self::Musculoskeletal,
            Self::Respiratory,
            Self::Liver,
            Self::JobStress,
            Self::ChemicalExposure,
            Self::Other,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Hypertension => "고혈압",
            Self::Diabetes => "당뇨",
            Self::Cardiovascular => "심혈관질환",
            Self::HearingAbnormality => "청력이상",
            Self::Musculoskeletal => "근골격계질환",
            Self::Respiratory => "호흡기질환",
            Self::Liver => "간질환",
            Self::JobStress => "직무스트레스",
            Self::ChemicalExposure => "화학물질노출",
            Self::Other => "기타",
        }
    }
}

/// Intensity of oversight applied to an at-risk employee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ManagementLevel {
    #[serde(rename = "관찰")]
    Observation,
    #[serde(rename = "집중관리")]
    Intensive,
    #[serde(rename = "의료관리")]
    MedicalCare,
    #[serde(rename = "작업제한")]
    WorkRestriction,
}

impl ManagementLevel {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::Observation,
            Self::Intensive,
            Self::MedicalCare,
            Self::WorkRestriction,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Observation => "관찰",
            Self::Intensive => "집중관리",
            Self::MedicalCare => "의료관리",
            Self::WorkRestriction => "작업제한",
        }
    }

    /// Medical care and work restriction share the top rank.
    pub const fn intensity(self) -> u8 {
        match self {
            Self::Observation => 0,
            Self::Intensive => 1,
            Self::MedicalCare | Self::WorkRestriction => 2,
        }
    }

    pub fn transition_to(self, next: Self) -> LevelChange {
        match next.intensity().cmp(&self.intensity()) {
            std::cmp::Ordering::Greater => LevelChange::Escalated,
            std::cmp::Ordering::Less => LevelChange::DeEscalated,
            std::cmp::Ordering::Equal if next == self => LevelChange::Unchanged,
            std::cmp::Ordering::Equal => LevelChange::Lateral,
        }
    }
}

/// Direction of a management level update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelChange {
    Escalated,
    DeEscalated,
    Lateral,
    Unchanged,
}

impl LevelChange {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Escalated => "escalated",
            Self::DeEscalated => "de-escalated",
            Self::Lateral => "lateral",
            Self::Unchanged => "unchanged",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterventionType {
    #[serde(rename = "상담")]
    Consultation,
    #[serde(rename = "의료기관의뢰")]
    MedicalReferral,
    #[serde(rename = "작업환경개선")]
    EnvironmentChange,
    #[serde(rename = "보호구지급")]
    ProtectiveEquipment,
    #[serde(rename = "직무순환")]
    JobRotation,
    #[serde(rename = "작업제한")]
    WorkRestriction,
    #[serde(rename = "보건교육")]
    HealthEducation,
    #[serde(rename = "생활습관개선")]
    LifestyleCoaching,
    #[serde(rename = "스트레스관리")]
    StressManagement,
    #[serde(rename = "재활치료")]
    Rehabilitation,
}

impl InterventionType {
    pub const fn ordered() -> [Self; 10] {
        [
            Self::Consultation,
            Self::MedicalReferral,
            Self::EnvironmentChange,
            Self::ProtectiveEquipment,
            Self::JobRotation,
            Self::WorkRestriction,
            Self::HealthEducation,
            Self::LifestyleCoaching,
            Self::StressManagement,
            Self::Rehabilitation,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Consultation => "상담",
            Self::MedicalReferral => "의료기관의뢰",
            Self::EnvironmentChange => "작업환경개선",
            Self::ProtectiveEquipment => "보호구지급",
            Self::JobRotation => "직무순환",
            Self::WorkRestriction => "작업제한",
            Self::HealthEducation => "보건교육",
            Self::LifestyleCoaching => "생활습관개선",
            Self::StressManagement => "스트레스관리",
            Self::Rehabilitation => "재활치료",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngagementLevel {
    #[serde(rename = "높음")]
    High,
    #[serde(rename = "보통")]
    Medium,
    #[serde(rename = "낮음")]
    Low,
}

/// Qualitative flag used for work performance and PPE compliance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualitativeRating {
    #[serde(rename = "양호")]
    Good,
    #[serde(rename = "보통")]
    Fair,
    #[serde(rename = "불량")]
    Poor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImprovementStatus {
    #[serde(rename = "개선")]
    Improved,
    #[serde(rename = "유지")]
    Maintained,
    #[serde(rename = "악화")]
    Worsened,
}

impl ImprovementStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Improved => "개선",
            Self::Maintained => "유지",
            Self::Worsened => "악화",
        }
    }
}

/// Trend derived from the two most recent monitoring records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImprovementTrend {
    #[serde(rename = "개선중")]
    Improving,
    #[serde(rename = "악화")]
    Worsening,
    #[serde(rename = "정체")]
    Plateaued,
    #[serde(rename = "평가중")]
    Evaluating,
}

impl ImprovementTrend {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Improving => "개선중",
            Self::Worsening => "악화",
            Self::Plateaued => "정체",
            Self::Evaluating => "평가중",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Active,
    Completed,
    Revised,
}

impl PlanStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Revised => "revised",
        }
    }
}

pub const SEVERITY_MIN: f64 = 1.0;
pub const SEVERITY_MAX: f64 = 10.0;

/// Contract violations in classification inputs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClassificationError {
    #[error("at least one risk category is required")]
    EmptyCategorySet,
    #[error("primary risk category {} is not among the registered categories", .0.label())]
    PrimaryNotInSet(RiskCategory),
    #[error("severity score must be between 1 and 10 (found {0})")]
    SeverityOutOfRange(f64),
    #[error("goal achievement must be between 0 and 100 (found {0})")]
    GoalAchievementOutOfRange(f64),
    #[error("symptom severity must be between 1 and 10 (found {0})")]
    SymptomSeverityOutOfRange(u8),
}

pub fn validate_categories(
    categories: &BTreeSet<RiskCategory>,
    primary: RiskCategory,
) -> Result<(), ClassificationError> {
    if categories.is_empty() {
        return Err(ClassificationError::EmptyCategorySet);
    }
    if !categories.contains(&primary) {
        return Err(ClassificationError::PrimaryNotInSet(primary));
    }
    Ok(())
}

pub fn validate_severity(score: f64) -> Result<(), ClassificationError> {
    if score.is_finite() && (SEVERITY_MIN..=SEVERITY_MAX).contains(&score) {
        Ok(())
    } else {
        Err(ClassificationError::SeverityOutOfRange(score))
    }
}

pub fn validate_goal_achievement(percent: f64) -> Result<(), ClassificationError> {
    if percent.is_finite() && (0.0..=100.0).contains(&percent) {
        Ok(())
    } else {
        Err(ClassificationError::GoalAchievementOutOfRange(percent))
    }
}

pub fn validate_symptom_severity(severity: u8) -> Result<(), ClassificationError> {
    if (1..=10).contains(&severity) {
        Ok(())
    } else {
        Err(ClassificationError::SymptomSeverityOutOfRange(severity))
    }
}
