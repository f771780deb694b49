use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const DAY_ORDER: [&str; 7] = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingService {
    pub id: String,
    pub name: String,
    pub duration_minutes: u32,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvailabilityWindow {
    pub start_time: String,
    pub end_time: String,
}

/// Weekly opening windows keyed by lowercase weekday (`mon`..`sun`).
///
/// Informational only: nothing checks bookings against these windows.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct WeeklyAvailability(pub BTreeMap<String, Vec<AvailabilityWindow>>);

impl WeeklyAvailability {
    pub fn windows_for(&self, date: NaiveDate) -> &[AvailabilityWindow] {
        let weekday = date.format("%a").to_string().to_lowercase();
        self.0.get(&weekday).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }

    pub fn to_human_readable(&self) -> String {
        let mut days: Vec<(&String, &Vec<AvailabilityWindow>)> =
            self.0.iter().filter(|(_, w)| !w.is_empty()).collect();
        days.sort_by_key(|(day, _)| {
            DAY_ORDER
                .iter()
                .position(|d| *d == day.to_lowercase())
                .unwrap_or(DAY_ORDER.len())
        });

        days.iter()
            .map(|(day, windows)| {
                let ranges = windows
                    .iter()
                    .map(|w| format!("{}-{}", w.start_time, w.end_time))
                    .collect::<Vec<_>>()
                    .join(" / ");
                format!("{}: {ranges}", capitalize(day))
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn validate(&self) -> anyhow::Result<()> {
        for (day, windows) in &self.0 {
            parse_weekday(day)?;
            for window in windows {
                let start = parse_time(&window.start_time)?;
                let end = parse_time(&window.end_time)?;
                if start >= end {
                    anyhow::bail!(
                        "window {}-{} on {day} ends before it starts",
                        window.start_time,
                        window.end_time
                    );
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingSettings {
    pub enabled: bool,
    #[serde(default)]
    pub allow_professional_selection: bool,
    #[serde(default)]
    pub services: Vec<BookingService>,
    #[serde(default)]
    pub availability: WeeklyAvailability,
}

impl BookingSettings {
    pub fn from_json(s: &str) -> anyhow::Result<Self> {
        let settings: BookingSettings = serde_json::from_str(s)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks the owner-authored document before it is stored.
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut seen = HashSet::new();
        for service in &self.services {
            if service.id.trim().is_empty() {
                anyhow::bail!("service id must not be empty");
            }
            if !seen.insert(service.id.as_str()) {
                anyhow::bail!("duplicate service id: {}", service.id);
            }
            if service.duration_minutes == 0 {
                anyhow::bail!("service {} must last at least one minute", service.id);
            }
            if service.price.is_some_and(|p| p < 0.0 || !p.is_finite()) {
                anyhow::bail!("service {} has an invalid price", service.id);
            }
        }
        self.availability.validate()
    }

    pub fn service(&self, id: &str) -> Option<&BookingService> {
        self.services.iter().find(|s| s.id == id)
    }
}

fn capitalize(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        None => String::new(),
        Some(f) => f.to_uppercase().to_string() + &c.as_str().to_lowercase(),
    }
}

fn parse_weekday(s: &str) -> anyhow::Result<()> {
    if DAY_ORDER.contains(&s.to_lowercase().as_str()) {
        Ok(())
    } else {
        Err(anyhow::anyhow!("invalid weekday: {s}"))
    }
}

fn parse_time(s: &str) -> anyhow::Result<(u32, u32)> {
    let (hour, minute) = s
        .split_once(':')
        .ok_or_else(|| anyhow::anyhow!("invalid time format: {s}"))?;
    let hour: u32 = hour
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid hour in: {s}"))?;
    let minute: u32 = minute
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid minute in: {s}"))?;
    if hour > 23 || minute > 59 {
        return Err(anyhow::anyhow!("time out of range: {s}"));
    }
    Ok((hour, minute))
}
