//! Scheduler configuration.
//!
//! The numeric knobs of the scheduling engine. A `SchedulerConfig` is built once
//! (from defaults or the `scheduler` section of the config file), validated, and
//! then passed by reference into every engine call.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ReviewrError};

/// Lowest ease factor any card can reach.
pub const MIN_EASE: f64 = 1.3;

/// Scheduling parameters for learning steps, graduation, reviews and lapses.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Delay before each successive Good press while learning.
    #[serde(rename = "learning-steps-minutes")]
    pub learning_steps_minutes: Vec<u32>,

    /// Interval assigned when a card leaves learning via Good.
    #[serde(rename = "graduating-interval-days")]
    pub graduating_interval_days: u32,

    /// Interval for Easy graduation, and the extra days added on Easy reviews.
    /// Zero falls back to `graduating_interval_days` on graduation.
    #[serde(rename = "easy-bonus-days")]
    pub easy_bonus_days: u32,

    /// Floor for Hard intervals.
    #[serde(rename = "hard-min-days")]
    pub hard_min_days: u32,

    /// Multiplier on the current interval for Hard reviews.
    #[serde(rename = "hard-interval-factor")]
    pub hard_interval_factor: f64,

    /// Extra multiplier on top of ease for Easy reviews.
    #[serde(rename = "easy-interval-factor")]
    pub easy_interval_factor: f64,

    /// Multiplier on the graduating interval when Hard graduates a first-step card.
    #[serde(rename = "hard-graduating-interval-factor")]
    pub hard_graduating_interval_factor: f64,

    /// Ease assigned to brand-new cards.
    #[serde(rename = "initial-ease")]
    pub initial_ease: f64,

    /// Delay applied after a lapse and while relearning.
    #[serde(rename = "lapse-step-minutes")]
    pub lapse_step_minutes: u32,

    /// Lapse count at which a card gets the leech tag.
    #[serde(rename = "leech-threshold")]
    pub leech_threshold: u32,

    /// Suppress siblings of cards already studied today.
    #[serde(rename = "bury-siblings")]
    pub bury_siblings: bool,

    /// Hour (UTC) at which a new study day begins.
    #[serde(rename = "day-cutoff-hour")]
    pub day_cutoff_hour: u32,

    /// Cap on new cards considered by the queue selector.
    #[serde(rename = "new-limit")]
    pub new_limit: u32,

    /// Cap on due review cards considered by the queue selector.
    #[serde(rename = "review-limit")]
    pub review_limit: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            learning_steps_minutes: vec![1, 10],
            graduating_interval_days: 1,
            easy_bonus_days: 4,
            hard_min_days: 1,
            hard_interval_factor: 1.2,
            easy_interval_factor: 1.3,
            hard_graduating_interval_factor: 1.2,
            initial_ease: 2.5,
            lapse_step_minutes: 10,
            leech_threshold: 8,
            bury_siblings: true,
            day_cutoff_hour: 4,
            new_limit: 20,
            review_limit: 200,
        }
    }
}

impl SchedulerConfig {
    /// Validate and return the configuration.
    ///
    /// Use this at construction time; an invalid config is fatal to startup.
    pub fn validated(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.learning_steps_minutes.is_empty() {
            return Err(invalid("learning-steps-minutes must not be empty"));
        }
        if self.learning_steps_minutes.contains(&0) {
            return Err(invalid("learning-steps-minutes must all be > 0"));
        }
        if self.graduating_interval_days == 0 {
            return Err(invalid("graduating-interval-days must be >= 1"));
        }
        if self.hard_min_days == 0 {
            return Err(invalid("hard-min-days must be >= 1"));
        }
        for (name, factor) in [
            ("hard-interval-factor", self.hard_interval_factor),
            ("easy-interval-factor", self.easy_interval_factor),
            ("hard-graduating-interval-factor", self.hard_graduating_interval_factor),
        ] {
            if !factor.is_finite() || factor <= 0.0 {
                return Err(invalid(&format!("{} must be > 0, got {}", name, factor)));
            }
        }
        if !self.initial_ease.is_finite() || self.initial_ease < MIN_EASE {
            return Err(invalid(&format!(
                "initial-ease must be >= {}, got {}",
                MIN_EASE, self.initial_ease
            )));
        }
        if self.lapse_step_minutes == 0 {
            return Err(invalid("lapse-step-minutes must be >= 1"));
        }
        if self.leech_threshold == 0 {
            return Err(invalid("leech-threshold must be >= 1"));
        }
        if self.day_cutoff_hour > 23 {
            return Err(invalid(&format!(
                "day-cutoff-hour must be in 0..=23, got {}",
                self.day_cutoff_hour
            )));
        }
        Ok(())
    }

    /// Number of learning steps.
    pub fn step_count(&self) -> usize {
        self.learning_steps_minutes.len()
    }

    /// Delay of the given learning step, clamped into the step range.
    pub fn step_minutes(&self, index: usize) -> u32 {
        let last = self.learning_steps_minutes.len().saturating_sub(1);
        self.learning_steps_minutes.get(index.min(last)).copied().unwrap_or(1)
    }

    /// Days used when a learning card graduates via Easy.
    pub fn easy_graduating_days(&self) -> u32 {
        if self.easy_bonus_days == 0 {
            self.graduating_interval_days
        } else {
            self.easy_bonus_days
        }
    }
}

fn invalid(msg: &str) -> ReviewrError {
    ReviewrError::Config(msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SchedulerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.learning_steps_minutes, vec![1, 10]);
        assert_eq!(config.initial_ease, 2.5);
        assert_eq!(config.leech_threshold, 8);
    }

    #[test]
    fn test_empty_steps_rejected() {
        let config = SchedulerConfig {
            learning_steps_minutes: vec![],
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ReviewrError::Config(_)));
        assert!(err.to_string().contains("learning-steps-minutes"));
    }

    #[test]
    fn test_zero_step_rejected() {
        let config = SchedulerConfig {
            learning_steps_minutes: vec![1, 0],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_positive_factor_rejected() {
        let config = SchedulerConfig {
            easy_interval_factor: 0.0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("easy-interval-factor"));

        let config = SchedulerConfig {
            hard_interval_factor: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_leech_threshold_rejected() {
        let config = SchedulerConfig {
            leech_threshold: 0,
            ..Default::default()
        };
        assert!(config.validated().is_err());
    }

    #[test]
    fn test_initial_ease_below_floor_rejected() {
        let config = SchedulerConfig {
            initial_ease: 1.1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_day_cutoff_out_of_range_rejected() {
        let config = SchedulerConfig {
            day_cutoff_hour: 24,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_step_minutes_clamps_index() {
        let config = SchedulerConfig::default();
        assert_eq!(config.step_minutes(0), 1);
        assert_eq!(config.step_minutes(1), 10);
        assert_eq!(config.step_minutes(5), 10);
    }

    #[test]
    fn test_easy_graduating_days_falls_back() {
        let config = SchedulerConfig::default();
        assert_eq!(config.easy_graduating_days(), 4);

        let config = SchedulerConfig {
            easy_bonus_days: 0,
            graduating_interval_days: 3,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.easy_graduating_days(), 3);
    }

    #[test]
    fn test_parse_yaml_partial() {
        let yaml = r#"
learning-steps-minutes: [1, 5, 15]
leech-threshold: 4
"#;
        let config: SchedulerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.learning_steps_minutes, vec![1, 5, 15]);
        assert_eq!(config.leech_threshold, 4);
        assert_eq!(config.graduating_interval_days, 1);
        assert!(config.bury_siblings);
    }
}
