use serde::{Deserialize, Serialize};

use crate::error::ScoringError;

/// Number of features the trained pipeline expects.
pub const FEATURE_COUNT: usize = 20;

/// Column order of the trained pipeline.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "AMT_ANNUITY",
    "AMT_CREDIT",
    "AMT_GOODS_PRICE",
    "AMT_INCOME_TOTAL",
    "AMT_REQ_CREDIT_BUREAU_QRT",
    "AMT_REQ_CREDIT_BUREAU_YEAR",
    "CODE_GENDER_F",
    "DAYS_BIRTH",
    "DAYS_EMPLOYED",
    "DAYS_ID_PUBLISH",
    "DAYS_LAST_PHONE_CHANGE",
    "DAYS_REGISTRATION",
    "EXT_SOURCE_1",
    "EXT_SOURCE_2",
    "EXT_SOURCE_3",
    "HOUR_APPR_PROCESS_START",
    "NAME_CONTRACT_TYPE",
    "OWN_CAR_AGE",
    "REGION_POPULATION_RELATIVE",
    "TOTALAREA_MODE",
];

/// One loan application, as posted to `/predict`.
///
/// Every field is required. Serde rejects missing keys, `null` and values of
/// the wrong JSON type, so a value of this type is already schema-valid;
/// [`CreditApplication::validate`] adds the range checks.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct CreditApplication {
    pub amt_annuity: f64,
    pub amt_credit: f64,
    pub amt_goods_price: f64,
    pub amt_income_total: f64,

    pub amt_req_credit_bureau_qrt: f64,
    pub amt_req_credit_bureau_year: f64,

    pub code_gender_f: i64,

    pub days_birth: f64,
    pub days_employed: f64,
    pub days_id_publish: f64,
    pub days_last_phone_change: f64,
    pub days_registration: f64,

    pub ext_source_1: f64,
    pub ext_source_2: f64,
    pub ext_source_3: f64,

    pub hour_appr_process_start: i64,
    pub name_contract_type: i64,
    pub own_car_age: f64,
    pub region_population_relative: f64,
    pub totalarea_mode: f64,
}

impl CreditApplication {
    pub fn validate(&self) -> Result<(), ScoringError> {
        // Checked on the f32 row: values past f32::MAX become infinite there.
        let row = self.to_f64_array();
        for ((name, value), cast) in FEATURE_NAMES.iter().zip(row).zip(self.to_array()) {
            if !cast.is_finite() {
                return Err(ScoringError::validation(format!(
                    "{} must be a finite single-precision number (value: {})",
                    name, value
                )));
            }
        }

        if !matches!(self.code_gender_f, 0 | 1) {
            return Err(ScoringError::validation(format!(
                "CODE_GENDER_F must be 0 or 1 (value: {})",
                self.code_gender_f
            )));
        }

        if !(0..=23).contains(&self.hour_appr_process_start) {
            return Err(ScoringError::validation(format!(
                "HOUR_APPR_PROCESS_START must be between 0 and 23 (value: {})",
                self.hour_appr_process_start
            )));
        }

        let scores = [
            ("EXT_SOURCE_1", self.ext_source_1),
            ("EXT_SOURCE_2", self.ext_source_2),
            ("EXT_SOURCE_3", self.ext_source_3),
        ];
        for (name, value) in scores.iter() {
            if !(0.0..=1.0).contains(value) {
                return Err(ScoringError::validation(format!(
                    "{} must be between 0 and 1 (value: {})",
                    name, value
                )));
            }
        }

        Ok(())
    }

    fn to_f64_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.amt_annuity,
            self.amt_credit,
            self.amt_goods_price,
            self.amt_income_total,
            self.amt_req_credit_bureau_qrt,
            self.amt_req_credit_bureau_year,
            self.code_gender_f as f64,
            self.days_birth,
            self.days_employed,
            self.days_id_publish,
            self.days_last_phone_change,
            self.days_registration,
            self.ext_source_1,
            self.ext_source_2,
            self.ext_source_3,
            self.hour_appr_process_start as f64,
            self.name_contract_type as f64,
            self.own_car_age,
            self.region_population_relative,
            self.totalarea_mode,
        ]
    }

    /// Single model row, in [`FEATURE_NAMES`] order.
    pub fn to_array(&self) -> [f32; FEATURE_COUNT] {
        self.to_f64_array().map(|v| v as f32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Refuse,
}

impl From<Decision> for u8 {
    fn from(decision: Decision) -> u8 {
        match decision {
            Decision::Approve => 0,
            Decision::Refuse => 1,
        }
    }
}

/// Business cutoff on the probability of default. Pinned per deployment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threshold(f64);

impl Threshold {
    pub fn new(value: f64) -> Result<Self, String> {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(format!("threshold must be within [0, 1] (value: {})", value));
        }
        Ok(Threshold(value))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Refuse at or above the threshold, approve below it.
    pub fn decide(&self, probability: f64) -> Decision {
        if probability >= self.0 {
            Decision::Refuse
        } else {
            Decision::Approve
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ScoringResult {
    pub probability: f64,
    pub decision: u8,
    pub threshold: f64,
}

impl ScoringResult {
    pub fn new(probability: f64, threshold: Threshold) -> Self {
        ScoringResult {
            probability,
            decision: threshold.decide(probability).into(),
            threshold: threshold.value(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HealthStatus {
    pub message: String,
    pub model_loaded: bool,
    pub nb_features: usize,
    pub threshold: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ModelInfo {
    pub model_loaded: bool,
    pub artifact: String,
    pub output: String,
    pub input_shape: Vec<usize>,
    pub features: Vec<String>,
    pub threshold: f64,
    pub version: String,
    pub unavailable_reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ErrorBody {
    pub error: String,
    pub detail: String,
    pub timestamp: String,
}

impl ErrorBody {
    pub fn new(kind: &str, detail: &str) -> Self {
        ErrorBody {
            error: kind.to_string(),
            detail: detail.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
