use super::SimulationKind;
use crate::common::constants::CONSTANT_HEAD_CODE;
use crate::domain::{OutputError, OutputResult};
use crate::grid::GridGeometry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Package {
    Recharge,
    GeneralHead,
    Drain,
    SpecifiedHead,
    Well,
    Evapotranspiration,
    River,
    Stream,
    StreamWaterUse,
    StreamWaterDrain,
    Reservoir,
    Lake,
    InterbedStorage,
    Subsidence,
}

impl Package {
    /// Packages contributing exactly one budget term each, in catalog order.
    pub const SINGLE_TERM_ORDER: [Package; 7] = [
        Self::Recharge,
        Self::GeneralHead,
        Self::Drain,
        Self::SpecifiedHead,
        Self::Well,
        Self::Evapotranspiration,
        Self::River,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Recharge => "RCH",
            Self::GeneralHead => "GHB",
            Self::Drain => "DRN",
            Self::SpecifiedHead => "CHD",
            Self::Well => "WEL",
            Self::Evapotranspiration => "EVT",
            Self::River => "RIV",
            Self::Stream => "STR",
            Self::StreamWaterUse => "STR-WU",
            Self::StreamWaterDrain => "STR-WD",
            Self::Reservoir => "RES",
            Self::Lake => "LAK",
            Self::InterbedStorage => "IBS",
            Self::Subsidence => "SUB",
        }
    }

    const fn budget_labels(self) -> &'static [&'static str] {
        match self {
            Self::Recharge => &["RECHARGE"],
            Self::GeneralHead => &["HEAD DEP BOUNDS"],
            Self::Drain => &["DRAINS"],
            Self::SpecifiedHead => &["SPECIFIED HEAD"],
            Self::Well => &["WELLS"],
            Self::Evapotranspiration => &["ET"],
            Self::River => &["RIVER LEAKAGE"],
            Self::Stream => &["STREAM LEAKAGE"],
            Self::StreamWaterUse => &["STREAM WATER USE"],
            Self::StreamWaterDrain => &["STREAM DRAIN"],
            Self::Reservoir => &["RESERV. LEAKAGE", "RESERV. INFLOW", "RESERV. STORAGE"],
            Self::Lake => &["LAKE SEEPAGE", "LAKE INFLOW", "LAKE STORAGE"],
            Self::InterbedStorage => &["INTERBED STORAGE"],
            Self::Subsidence => &["SUBSIDENCE", "COMPACTION"],
        }
    }
}

impl Display for Package {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ActivePackageSet {
    packages: BTreeSet<Package>,
}

impl ActivePackageSet {
    pub fn new(packages: impl IntoIterator<Item = Package>) -> Self {
        Self {
            packages: packages.into_iter().collect(),
        }
    }

    pub fn contains(&self, package: Package) -> bool {
        self.packages.contains(&package)
    }

    pub fn iter(&self) -> impl Iterator<Item = Package> + '_ {
        self.packages.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

impl FromIterator<Package> for ActivePackageSet {
    fn from_iter<I: IntoIterator<Item = Package>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Constant-head cells found in the loaded boundary codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConstantHeadPresence {
    rows_with_constant_head: usize,
}

impl ConstantHeadPresence {
    pub const fn none() -> Self {
        Self {
            rows_with_constant_head: 0,
        }
    }

    pub const fn from_row_count(rows_with_constant_head: usize) -> Self {
        Self {
            rows_with_constant_head,
        }
    }

    /// Scans layer-major, row-major boundary codes for the constant-head marker.
    pub fn from_boundary_codes(geometry: &GridGeometry, codes: &[i32]) -> OutputResult<Self> {
        let expected = geometry.layers() * geometry.cell_count();
        if codes.len() != expected {
            return Err(OutputError::BoundaryShapeMismatch {
                expected,
                actual: codes.len(),
            });
        }

        let rows_with_constant_head = codes
            .chunks(geometry.cols())
            .filter(|row| row.contains(&CONSTANT_HEAD_CODE))
            .count();
        Ok(Self {
            rows_with_constant_head,
        })
    }

    pub const fn rows_with_constant_head(&self) -> usize {
        self.rows_with_constant_head
    }

    pub const fn any(&self) -> bool {
        self.rows_with_constant_head > 0
    }
}

/// Ordered names of the terms the engine writes into every budget instance.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct BudgetTermCatalog {
    terms: Vec<String>,
}

impl BudgetTermCatalog {
    pub fn build(
        simulation: SimulationKind,
        constant_head: ConstantHeadPresence,
        packages: &ActivePackageSet,
    ) -> Self {
        let mut terms = Vec::new();
        if simulation == SimulationKind::Transient {
            terms.push("STORAGE".to_string());
        }
        terms.push("FLOW BALANCE".to_string());

        // One term per row holding a constant-head cell, not one per run.
        terms.extend(
            std::iter::repeat_n("CONSTANT HEAD", constant_head.rows_with_constant_head())
                .map(str::to_string),
        );

        for package in Package::SINGLE_TERM_ORDER {
            if packages.contains(package) {
                push_labels(&mut terms, package);
            }
        }

        if packages.contains(Package::Stream) {
            push_labels(&mut terms, Package::Stream);
            if packages.contains(Package::StreamWaterUse) {
                push_labels(&mut terms, Package::StreamWaterUse);
            }
            if packages.contains(Package::StreamWaterDrain) {
                push_labels(&mut terms, Package::StreamWaterDrain);
            }
        } else {
            for orphan in [Package::StreamWaterUse, Package::StreamWaterDrain] {
                if packages.contains(orphan) {
                    warn!(package = %orphan, "ignoring stream option without the stream package");
                }
            }
        }

        for package in [
            Package::Reservoir,
            Package::Lake,
            Package::InterbedStorage,
            Package::Subsidence,
        ] {
            if packages.contains(package) {
                push_labels(&mut terms, package);
            }
        }

        Self { terms }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.terms
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(String::as_str)
    }
}

fn push_labels(terms: &mut Vec<String>, package: Package) {
    terms.extend(package.budget_labels().iter().map(|label| label.to_string()));
}
