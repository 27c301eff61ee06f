//! Named load profiles.
//!
//! Every test type maps to exactly one [`Scenario`]. Lookup is total: names
//! that are not recognised resolve to [`TestType::Smoke`].

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TestType {
    #[default]
    Smoke,
    AverageLoad,
    Stress,
    Spike,
    Soak,
    Breakpoint,
}

impl TestType {
    pub const ALL: [TestType; 6] = [
        TestType::Smoke,
        TestType::AverageLoad,
        TestType::Stress,
        TestType::Spike,
        TestType::Soak,
        TestType::Breakpoint,
    ];

    /// Resolve an optional external selector. Absent or unknown names give smoke.
    pub fn resolve(name: Option<&str>) -> Self {
        name.map(TestType::from).unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TestType::Smoke => "smoke",
            TestType::AverageLoad => "average_load",
            TestType::Stress => "stress",
            TestType::Spike => "spike",
            TestType::Soak => "soak",
            TestType::Breakpoint => "breakpoint",
        }
    }

    pub fn scenario(&self) -> Scenario {
        let (executor, tag) = match self {
            TestType::Smoke => (
                Executor::ConstantVus {
                    vus: 1,
                    duration: secs(30),
                },
                "minimal load sanity check",
            ),
            TestType::AverageLoad => (
                Executor::RampingVus {
                    start_vus: 10,
                    stages: vec![
                        Stage::new(secs(30), 50),
                        Stage::new(mins(5), 50),
                        Stage::new(secs(30), 0),
                    ],
                },
                "typical production traffic",
            ),
            TestType::Stress => (
                Executor::RampingVus {
                    start_vus: 10,
                    stages: vec![
                        Stage::new(mins(1), 200),
                        Stage::new(mins(5), 200),
                        Stage::new(mins(1), 0),
                    ],
                },
                "above-average sustained traffic",
            ),
            TestType::Spike => (
                Executor::RampingVus {
                    start_vus: 10,
                    stages: vec![
                        Stage::new(secs(30), 1000),
                        Stage::new(mins(1), 1000),
                        Stage::new(secs(30), 10),
                        Stage::new(secs(30), 0),
                    ],
                },
                "sudden burst of traffic",
            ),
            TestType::Soak => (
                Executor::RampingVus {
                    start_vus: 10,
                    stages: vec![
                        Stage::new(mins(2), 100),
                        Stage::new(mins(30), 100),
                        Stage::new(mins(2), 0),
                    ],
                },
                "long running average traffic",
            ),
            TestType::Breakpoint => (
                Executor::RampingVus {
                    start_vus: 10,
                    stages: vec![Stage::new(mins(10), 2000)],
                },
                "ramp until the system breaks",
            ),
        };

        Scenario {
            name: *self,
            executor,
            tag,
        }
    }
}

impl From<&str> for TestType {
    fn from(name: &str) -> Self {
        match name.trim() {
            "average_load" => TestType::AverageLoad,
            "stress" => TestType::Stress,
            "spike" => TestType::Spike,
            "soak" => TestType::Soak,
            "breakpoint" => TestType::Breakpoint,
            _ => TestType::Smoke,
        }
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TestType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One step of a staged ramp: reach `target` concurrent users over `duration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    pub duration: Duration,
    pub target: u32,
}

impl Stage {
    pub const fn new(duration: Duration, target: u32) -> Self {
        Self { duration, target }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Executor {
    ConstantVus { vus: u32, duration: Duration },
    /// Stages are applied in order without any monotonicity requirement.
    RampingVus { start_vus: u32, stages: Vec<Stage> },
}

impl Executor {
    pub fn kind(&self) -> &'static str {
        match self {
            Executor::ConstantVus { .. } => "constant-vus",
            Executor::RampingVus { .. } => "ramping-vus",
        }
    }

    pub fn initial_vus(&self) -> u32 {
        match self {
            Executor::ConstantVus { vus, .. } => *vus,
            Executor::RampingVus { start_vus, .. } => *start_vus,
        }
    }

    pub fn peak_vus(&self) -> u32 {
        match self {
            Executor::ConstantVus { vus, .. } => *vus,
            Executor::RampingVus { start_vus, stages } => stages
                .iter()
                .map(|s| s.target)
                .fold(*start_vus, u32::max),
        }
    }

    pub fn total_duration(&self) -> Duration {
        match self {
            Executor::ConstantVus { duration, .. } => *duration,
            Executor::RampingVus { stages, .. } => stages.iter().map(|s| s.duration).sum(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub name: TestType,
    pub executor: Executor,
    pub tag: &'static str,
}

impl Scenario {
    /// Scenario entry in the external engine's options format.
    pub fn to_options(&self) -> Value {
        let mut entry = match &self.executor {
            Executor::ConstantVus { vus, duration } => json!({
                "executor": self.executor.kind(),
                "vus": vus,
                "duration": format_duration(*duration),
            }),
            Executor::RampingVus { start_vus, stages } => json!({
                "executor": self.executor.kind(),
                "startVUs": start_vus,
                "stages": stages
                    .iter()
                    .map(|s| json!({ "duration": format_duration(s.duration), "target": s.target }))
                    .collect::<Vec<_>>(),
            }),
        };
        entry["tags"] = json!({ "test_type": self.name.as_str(), "description": self.tag });
        entry
    }
}

/// Render a duration the way the load engine writes them: `30s`, `5m`, `1m30s`, `2h`.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    if total == 0 {
        return "0s".to_string();
    }
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    let mut out = String::new();
    if h > 0 {
        out.push_str(&format!("{h}h"));
    }
    if m > 0 {
        out.push_str(&format!("{m}m"));
    }
    if s > 0 {
        out.push_str(&format!("{s}s"));
    }
    out
}

/// Parse `30s`, `5m`, `1m30s`, `2h` or a bare number of seconds.
pub fn parse_duration(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<u64>() {
        return Ok(secs(n));
    }
    let mut total = 0u64;
    let mut digits = String::new();
    for c in raw.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let unit = match c {
            'h' => 3600,
            'm' => 60,
            's' => 1,
            _ => return Err(format!("invalid duration `{raw}`: unexpected `{c}`")),
        };
        let n: u64 = digits
            .parse()
            .map_err(|_| format!("invalid duration `{raw}`: missing number before `{c}`"))?;
        total += n * unit;
        digits.clear();
    }
    if !digits.is_empty() || raw.is_empty() {
        return Err(format!("invalid duration `{raw}`: missing unit"));
    }
    Ok(secs(total))
}

const fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

const fn mins(n: u64) -> Duration {
    Duration::from_secs(n * 60)
}
