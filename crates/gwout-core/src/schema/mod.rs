//! Run schedule and output options needed to interpret the engine's output
//! stream: how many instances each field holds per stress period and which
//! budget terms every budget instance carries.

mod catalog;

pub use catalog::{ActivePackageSet, BudgetTermCatalog, ConstantHeadPresence, Package};

use crate::domain::{FieldKind, OutputError, OutputResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StressPeriod {
    pub length: f64,
    pub num_steps: usize,
    pub multiplier: f64,
}

impl StressPeriod {
    pub const fn new(length: f64, num_steps: usize, multiplier: f64) -> Self {
        Self {
            length,
            num_steps,
            multiplier,
        }
    }

    fn validate(&self, period: usize) -> OutputResult<()> {
        let reason = if !(self.length.is_finite() && self.length > 0.0) {
            format!("length must be positive, got {}", self.length)
        } else if self.num_steps == 0 {
            "step count must be at least 1".to_string()
        } else if !(self.multiplier.is_finite() && self.multiplier > 0.0) {
            format!("step multiplier must be positive, got {}", self.multiplier)
        } else {
            return Ok(());
        };
        Err(OutputError::InvalidStressPeriod { period, reason })
    }

    /// Lengths of the individual time steps, growing geometrically by the
    /// multiplier.
    ///
    /// Step weights are scaled so the largest one is 1, which keeps every
    /// length finite for any step count. Steps far below the largest may
    /// round to zero.
    pub fn step_lengths(&self) -> Vec<f64> {
        let steps = self.num_steps;
        if (self.multiplier - 1.0).abs() <= f64::EPSILON {
            return vec![self.length / steps as f64; steps];
        }

        let largest = if self.multiplier > 1.0 {
            steps.saturating_sub(1)
        } else {
            0
        };
        let weights: Vec<f64> = (0..steps)
            .map(|step| self.multiplier.powf(step as f64 - largest as f64))
            .collect();
        let total: f64 = weights.iter().sum();
        weights
            .into_iter()
            .map(|weight| self.length * weight / total)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OutputFrequency {
    #[default]
    Disabled,
    PerStep,
    PerPeriod,
}

impl OutputFrequency {
    pub fn from_flag(field: FieldKind, value: i64) -> OutputResult<Self> {
        match value {
            0 => Ok(Self::Disabled),
            1 => Ok(Self::PerStep),
            2 => Ok(Self::PerPeriod),
            _ => Err(OutputError::InvalidOutputFrequency { field, value }),
        }
    }

    pub const fn flag(self) -> u8 {
        match self {
            Self::Disabled => 0,
            Self::PerStep => 1,
            Self::PerPeriod => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct OutputFrequencies {
    pub head: OutputFrequency,
    pub drawdown: OutputFrequency,
    pub flow: OutputFrequency,
    pub budget: OutputFrequency,
}

impl OutputFrequencies {
    pub const fn for_field(&self, field: FieldKind) -> OutputFrequency {
        match field {
            FieldKind::Head => self.head,
            FieldKind::Drawdown => self.drawdown,
            FieldKind::Flow => self.flow,
            FieldKind::Budget => self.budget,
        }
    }

    pub fn with(mut self, field: FieldKind, frequency: OutputFrequency) -> Self {
        match field {
            FieldKind::Head => self.head = frequency,
            FieldKind::Drawdown => self.drawdown = frequency,
            FieldKind::Flow => self.flow = frequency,
            FieldKind::Budget => self.budget = frequency,
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationKind {
    #[default]
    Steady,
    Transient,
}

/// Elapsed simulation time at one stored output instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InstanceTime {
    pub period: usize,
    pub step: usize,
    pub time: f64,
}

/// Immutable description of one run's output schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSchema {
    periods: Vec<StressPeriod>,
    frequencies: OutputFrequencies,
    packages: ActivePackageSet,
    simulation: SimulationKind,
    constant_head: ConstantHeadPresence,
    catalog: BudgetTermCatalog,
}

impl RunSchema {
    pub fn new(
        periods: Vec<StressPeriod>,
        frequencies: OutputFrequencies,
        packages: ActivePackageSet,
        simulation: SimulationKind,
        constant_head: ConstantHeadPresence,
    ) -> OutputResult<Self> {
        if periods.is_empty() {
            return Err(OutputError::EmptySchedule);
        }
        for (index, period) in periods.iter().enumerate() {
            period.validate(index)?;
        }

        let catalog = BudgetTermCatalog::build(simulation, constant_head, &packages);
        Ok(Self {
            periods,
            frequencies,
            packages,
            simulation,
            constant_head,
            catalog,
        })
    }

    pub fn periods(&self) -> &[StressPeriod] {
        &self.periods
    }

    pub fn period_count(&self) -> usize {
        self.periods.len()
    }

    pub const fn frequencies(&self) -> OutputFrequencies {
        self.frequencies
    }

    pub const fn frequency(&self, field: FieldKind) -> OutputFrequency {
        self.frequencies.for_field(field)
    }

    pub fn is_produced(&self, field: FieldKind) -> bool {
        self.frequency(field) != OutputFrequency::Disabled
    }

    pub fn packages(&self) -> &ActivePackageSet {
        &self.packages
    }

    pub const fn simulation(&self) -> SimulationKind {
        self.simulation
    }

    pub const fn constant_head(&self) -> ConstantHeadPresence {
        self.constant_head
    }

    pub fn budget_term_catalog(&self) -> &BudgetTermCatalog {
        &self.catalog
    }

    /// Number of stored instances of `field` within one stress period.
    ///
    /// Out-of-range periods hold no instances.
    pub fn instance_count(&self, field: FieldKind, period: usize) -> usize {
        let Some(stress_period) = self.periods.get(period) else {
            return 0;
        };
        match self.frequency(field) {
            OutputFrequency::Disabled => 0,
            OutputFrequency::PerStep => stress_period.num_steps,
            OutputFrequency::PerPeriod => 1,
        }
    }

    /// Instances of `field` stored before the first one of `period`.
    pub fn instances_before(&self, field: FieldKind, period: usize) -> usize {
        (0..period.min(self.periods.len()))
            .map(|index| self.instance_count(field, index))
            .sum()
    }

    pub fn total_instances(&self, field: FieldKind) -> usize {
        self.instances_before(field, self.periods.len())
    }

    /// Elapsed time at the end of every stored instance of `field`, in stream order.
    pub fn instance_times(&self, field: FieldKind) -> Vec<InstanceTime> {
        let frequency = self.frequency(field);
        let mut elapsed = 0.0;
        let mut times = Vec::with_capacity(self.total_instances(field));

        for (period, stress_period) in self.periods.iter().enumerate() {
            match frequency {
                OutputFrequency::Disabled => {}
                OutputFrequency::PerStep => {
                    let mut step_end = elapsed;
                    for (step, length) in stress_period.step_lengths().into_iter().enumerate() {
                        step_end += length;
                        times.push(InstanceTime {
                            period,
                            step,
                            time: step_end,
                        });
                    }
                }
                OutputFrequency::PerPeriod => times.push(InstanceTime {
                    period,
                    step: 0,
                    time: elapsed + stress_period.length,
                }),
            }
            elapsed += stress_period.length;
        }

        times
    }
}
