//! Experience points and levels for learners.
//!
//! `Progress` is plain data owned by the caller (a session, a saved file);
//! nothing here is global. Awarding an activity is a state transition on the
//! caller's value that reports what changed.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const POINTS_PER_LEVEL: u32 = 100;
pub const MAX_LEVEL: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    SampleData,
    Upload,
    BasicStats,
    Distribution,
    Correlation,
    TimeSeries,
}

impl Activity {
    pub fn points(self) -> u32 {
        match self {
            Activity::SampleData => 20,
            Activity::Upload => 30,
            Activity::BasicStats => 50,
            Activity::Distribution => 40,
            Activity::Correlation => 60,
            Activity::TimeSeries => 70,
        }
    }

    pub fn achievement(self) -> &'static str {
        match self {
            Activity::SampleData => "First data generated",
            Activity::Upload => "File upload complete",
            Activity::BasicStats => "Basic statistics complete",
            Activity::Distribution => "Distribution analysis complete",
            Activity::Correlation => "Correlation master",
            Activity::TimeSeries => "Time series expert",
        }
    }
}

/// Level reached with `experience` points, capped at [`MAX_LEVEL`].
pub fn level_for(experience: u32) -> u32 {
    (1 + experience / POINTS_PER_LEVEL).min(MAX_LEVEL)
}

pub fn level_title(level: u32) -> &'static str {
    match level {
        2 => "Weather Beginner",
        3 => "Cloud Watcher",
        4 => "Rainfall Master",
        5 => "Temperature Analyst",
        6 => "Statistics Detective",
        7 => "Data Wizard",
        8 => "Forecast Expert",
        9 => "Weather Maestro",
        10 => "Weather Master",
        _ => "Weather Apprentice",
    }
}

/// Outcome of one award.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Award {
    pub points: u32,
    pub level_up: Option<u32>,
    pub new_achievement: Option<&'static str>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    experience: u32,
    achievements: Vec<String>,
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads saved progress, starting fresh when `path` does not exist yet.
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }

    /// Writes progress as pretty JSON, replacing any previous file.
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn experience(&self) -> u32 {
        self.experience
    }

    pub fn level(&self) -> u32 {
        level_for(self.experience)
    }

    pub fn title(&self) -> &'static str {
        level_title(self.level())
    }

    /// Points earned inside the current level.
    pub fn experience_in_level(&self) -> u32 {
        self.experience % POINTS_PER_LEVEL
    }

    pub fn achievements(&self) -> &[String] {
        &self.achievements
    }

    /// Adds the activity's points; each achievement is recorded once.
    pub fn award(&mut self, activity: Activity) -> Award {
        let before = self.level();
        let points = activity.points();
        self.experience = self.experience.saturating_add(points);
        let after = self.level();

        let label = activity.achievement();
        let new_achievement = if self.achievements.iter().any(|a| a == label) {
            None
        } else {
            self.achievements.push(label.to_string());
            Some(label)
        };

        Award {
            points,
            level_up: (after > before).then_some(after),
            new_achievement,
        }
    }
}
