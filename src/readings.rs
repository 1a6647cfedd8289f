//! Readings gathered while monitoring, and how they are reported.

use core::fmt;

/// Most readings any one section of a report can hold.
pub const MAX_READINGS: usize = 16;

/// A single named value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    Float(f32),
    Bool(bool),
}

impl From<f32> for Reading {
    fn from(value: f32) -> Self {
        Reading::Float(value)
    }
}

impl From<bool> for Reading {
    fn from(value: bool) -> Self {
        Reading::Bool(value)
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::Float(value) => write!(f, "{value}"),
            // 0 or 1 rather than true or false, so bools can be plotted.
            Reading::Bool(value) => write!(f, "{}", *value as u8),
        }
    }
}

/// An ordered set of named readings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Readings(heapless::Vec<(&'static str, Reading), MAX_READINGS>);

impl Readings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a reading, replacing any existing one of the same name.
    pub fn insert(&mut self, name: &'static str, value: impl Into<Reading>) {
        let value = value.into();
        if let Some(entry) = self.0.iter_mut().find(|(existing, _)| *existing == name) {
            entry.1 = value;
        } else if self.0.push((name, value)).is_err() {
            tracing::warn!("Too many readings, dropped {name}");
        }
    }

    /// Builder style version of [`Self::insert`].
    pub fn with(mut self, name: &'static str, value: impl Into<Reading>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<Reading> {
        self.0
            .iter()
            .find(|(existing, _)| *existing == name)
            .map(|(_, value)| *value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Reading)> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Running maximum, minimum and average of a quantity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aggregate {
    pub max: f32,
    pub min: f32,
    /// Only valid after [`Aggregate::finalise`].
    pub average: f32,
    sum: f32,
    count: u32,
}

impl Default for Aggregate {
    fn default() -> Self {
        Self {
            max: f32::NEG_INFINITY,
            min: f32::INFINITY,
            average: 0.0,
            sum: 0.0,
            count: 0,
        }
    }
}

impl Aggregate {
    pub fn record(&mut self, value: f32) {
        self.max = self.max.max(value);
        self.min = self.min.min(value);
        self.sum += value;
        self.count += 1;
    }

    /// Compute the average of everything recorded since the last clear.
    ///
    /// The average is always derived from the running sum, so calling this more than once
    /// gives the same result.
    pub fn finalise(&mut self) {
        if self.count > 0 {
            self.average = self.sum / self.count as f32;
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

/// One tick's worth of board level measurements.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorSample {
    pub voltage_in: f32,
    pub voltage_out: f32,
    pub current: f32,
    pub temperature: f32,
}

/// Aggregates of the board level measurements.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoardReadings {
    pub voltage_in: Aggregate,
    pub voltage_out: Aggregate,
    pub current: Aggregate,
    pub temperature: Aggregate,
}

impl BoardReadings {
    pub fn record(&mut self, sample: &MonitorSample) {
        self.voltage_in.record(sample.voltage_in);
        self.voltage_out.record(sample.voltage_out);
        self.current.record(sample.current);
        self.temperature.record(sample.temperature);
    }

    pub fn finalise(&mut self) {
        self.aggregates_mut().into_iter().for_each(Aggregate::finalise);
    }

    pub fn clear(&mut self) {
        self.aggregates_mut().into_iter().for_each(Aggregate::clear);
    }

    fn aggregates_mut(&mut self) -> [&mut Aggregate; 4] {
        [
            &mut self.voltage_in,
            &mut self.voltage_out,
            &mut self.current,
            &mut self.temperature,
        ]
    }

    pub fn to_readings(&self) -> Readings {
        const NAMES: [[&str; 3]; 4] = [
            ["Vi_max", "Vi_min", "Vi_avg"],
            ["Vo_max", "Vo_min", "Vo_avg"],
            ["C_max", "C_min", "C_avg"],
            ["T_max", "T_min", "T_avg"],
        ];

        let mut readings = Readings::new();
        let aggregates = [
            &self.voltage_in,
            &self.voltage_out,
            &self.current,
            &self.temperature,
        ];
        for ([max, min, avg], aggregate) in NAMES.into_iter().zip(aggregates) {
            readings.insert(max, aggregate.max);
            readings.insert(min, aggregate.min);
            readings.insert(avg, aggregate.average);
        }
        readings
    }
}

/// Selects which readings make it into a report.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadingsFilter<'a> {
    /// If set, only these names are reported.
    pub allowed: Option<&'a [&'a str]>,
    /// If set, these names are never reported.
    pub excluded: Option<&'a [&'a str]>,
    /// Whether module sections follow the board section.
    pub exclude_modules: bool,
}

impl<'a> ReadingsFilter<'a> {
    pub fn allowing(mut self, names: &'a [&'a str]) -> Self {
        self.allowed = Some(names);
        self
    }

    pub fn excluding(mut self, names: &'a [&'a str]) -> Self {
        self.excluded = Some(names);
        self
    }

    pub fn board_only(mut self) -> Self {
        self.exclude_modules = true;
        self
    }

    pub fn accepts(&self, name: &str) -> bool {
        self.allowed.is_none_or(|allowed| allowed.contains(&name))
            && !self.excluded.is_some_and(|excluded| excluded.contains(&name))
    }
}

/// Write one section of a report, e.g. `[Yukon] Vi_max = 12.1, Vi_min = 11.9, `.
///
/// Nothing is written for an empty set of readings.
pub fn format_section<W: fmt::Write>(
    out: &mut W,
    section: impl fmt::Display,
    readings: &Readings,
    filter: &ReadingsFilter<'_>,
) -> fmt::Result {
    if readings.is_empty() {
        return Ok(());
    }
    write!(out, "{section} ")?;
    for (name, value) in readings.iter().filter(|(name, _)| filter.accepts(name)) {
        write!(out, "{name} = {value}, ")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_tracks_extremes_and_average() {
        let mut aggregate = Aggregate::default();
        for value in [12.0, 11.0, 13.0] {
            aggregate.record(value);
        }
        aggregate.finalise();
        assert_eq!(aggregate.max, 13.0);
        assert_eq!(aggregate.min, 11.0);
        assert_eq!(aggregate.average, 12.0);
        assert_eq!(aggregate.count(), 3);
    }

    #[test]
    fn finalising_twice_gives_the_same_average() {
        let mut readings = BoardReadings::default();
        readings.record(&MonitorSample {
            voltage_in: 12.0,
            voltage_out: 11.9,
            current: 1.0,
            temperature: 30.0,
        });
        readings.record(&MonitorSample {
            voltage_in: 14.0,
            voltage_out: 13.9,
            current: 3.0,
            temperature: 32.0,
        });

        readings.finalise();
        let first = readings;
        readings.finalise();
        assert_eq!(readings, first);
        assert_eq!(readings.voltage_in.average, 13.0);
        assert_eq!(readings.current.average, 2.0);
    }

    #[test]
    fn clearing_resets_to_empty() {
        let mut aggregate = Aggregate::default();
        aggregate.record(5.0);
        aggregate.finalise();
        aggregate.clear();
        assert_eq!(aggregate, Aggregate::default());
        assert_eq!(aggregate.max, f32::NEG_INFINITY);
        assert_eq!(aggregate.min, f32::INFINITY);
    }

    #[test]
    fn insert_replaces_existing_names() {
        let mut readings = Readings::new().with("Fault", false).with("C_avg", 1.5);
        readings.insert("Fault", true);
        assert_eq!(readings.len(), 2);
        assert_eq!(readings.get("Fault"), Some(Reading::Bool(true)));
        assert_eq!(readings.get("missing"), None);
    }

    #[test]
    fn board_reading_names_are_in_report_order() {
        let names: Vec<_> = BoardReadings::default()
            .to_readings()
            .iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(
            names,
            [
                "Vi_max", "Vi_min", "Vi_avg", "Vo_max", "Vo_min", "Vo_avg", "C_max", "C_min",
                "C_avg", "T_max", "T_min", "T_avg"
            ]
        );
    }

    #[test]
    fn section_formatting_and_filters() {
        let readings = Readings::new()
            .with("Fault", true)
            .with("C_avg", 1.5)
            .with("T_avg", 30.0);

        let mut text = String::new();
        format_section(&mut text, "[Slot3]", &readings, &ReadingsFilter::default()).unwrap();
        assert_eq!(text, "[Slot3] Fault = 1, C_avg = 1.5, T_avg = 30, ");

        let mut text = String::new();
        let filter = ReadingsFilter::default()
            .allowing(&["C_avg", "T_avg"])
            .excluding(&["T_avg"]);
        format_section(&mut text, "[Slot3]", &readings, &filter).unwrap();
        assert_eq!(text, "[Slot3] C_avg = 1.5, ");

        let mut text = String::new();
        format_section(&mut text, "[Slot3]", &Readings::new(), &filter).unwrap();
        assert!(text.is_empty());
    }
}
