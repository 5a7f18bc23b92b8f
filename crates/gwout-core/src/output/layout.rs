use crate::common::constants::{FLOW_COMPONENTS, GROUP_PREAMBLE_BYTES, LAYER_PREAMBLE_BYTES};
use crate::domain::{FieldKind, OutputError, OutputResult};
use crate::grid::GridGeometry;
use crate::schema::RunSchema;

/// Byte shape of one stored instance of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordLayout {
    /// Every layer carries its own preamble (head, drawdown).
    PerLayerPreamble { field: FieldKind },
    /// One preamble per group (flow direction or budget term), followed by
    /// all layers back to back.
    PerGroupPreamble { field: FieldKind, groups: usize },
}

impl RecordLayout {
    pub fn for_field(field: FieldKind, schema: &RunSchema) -> Self {
        match field {
            FieldKind::Head | FieldKind::Drawdown => Self::PerLayerPreamble { field },
            FieldKind::Flow => Self::PerGroupPreamble {
                field,
                groups: FLOW_COMPONENTS,
            },
            FieldKind::Budget => Self::PerGroupPreamble {
                field,
                groups: schema.budget_term_catalog().len(),
            },
        }
    }

    pub const fn field(&self) -> FieldKind {
        match self {
            Self::PerLayerPreamble { field } | Self::PerGroupPreamble { field, .. } => *field,
        }
    }

    pub const fn preamble_bytes(&self) -> u64 {
        match self {
            Self::PerLayerPreamble { .. } => LAYER_PREAMBLE_BYTES as u64,
            Self::PerGroupPreamble { .. } => GROUP_PREAMBLE_BYTES as u64,
        }
    }

    /// Bytes of one group: its preamble plus every layer payload.
    pub const fn group_bytes(&self, geometry: &GridGeometry) -> u64 {
        GROUP_PREAMBLE_BYTES as u64 + geometry.layers() as u64 * geometry.grid_bytes()
    }

    /// Bytes of one whole instance. Fails when the record count pushes the
    /// size past a `u64` offset.
    pub fn instance_bytes(&self, geometry: &GridGeometry) -> OutputResult<u64> {
        let (records, record_bytes) = match self {
            Self::PerLayerPreamble { .. } => (geometry.layers(), geometry.layer_block_bytes()),
            Self::PerGroupPreamble { groups, .. } => (*groups, self.group_bytes(geometry)),
        };
        u64::try_from(records)
            .ok()
            .and_then(|records| records.checked_mul(record_bytes))
            .ok_or(OutputError::LayoutOverflow {
                field: self.field(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::RecordLayout;
    use crate::domain::{FieldKind, OutputError};
    use crate::grid::GridGeometry;
    use crate::schema::{
        ActivePackageSet, ConstantHeadPresence, OutputFrequencies, Package, RunSchema,
        SimulationKind, StressPeriod,
    };

    fn schema() -> RunSchema {
        RunSchema::new(
            vec![StressPeriod::new(1.0, 1, 1.0)],
            OutputFrequencies::default(),
            ActivePackageSet::new([Package::Well]),
            SimulationKind::Transient,
            ConstantHeadPresence::none(),
        )
        .expect("schema should build")
    }

    #[test]
    fn layered_fields_repeat_the_preamble_per_layer() {
        let geometry = GridGeometry::new(3, 2, 2).expect("geometry");
        let layout = RecordLayout::for_field(FieldKind::Drawdown, &schema());

        assert_eq!(layout, RecordLayout::PerLayerPreamble { field: FieldKind::Drawdown });
        assert_eq!(layout.preamble_bytes(), 44);
        assert_eq!(layout.instance_bytes(&geometry).expect("size"), 3 * (44 + 16));
    }

    #[test]
    fn flow_instances_hold_three_component_groups() {
        let geometry = GridGeometry::new(3, 2, 2).expect("geometry");
        let layout = RecordLayout::for_field(FieldKind::Flow, &schema());

        assert_eq!(layout.preamble_bytes(), 36);
        assert_eq!(layout.group_bytes(&geometry), 36 + 3 * 16);
        assert_eq!(layout.instance_bytes(&geometry).expect("size"), 3 * (36 + 3 * 16));
    }

    #[test]
    fn budget_instances_hold_one_group_per_catalog_term() {
        let geometry = GridGeometry::new(2, 1, 3).expect("geometry");
        let layout = RecordLayout::for_field(FieldKind::Budget, &schema());

        // storage, residual, wells
        assert_eq!(
            layout,
            RecordLayout::PerGroupPreamble {
                field: FieldKind::Budget,
                groups: 3
            }
        );
        assert_eq!(layout.instance_bytes(&geometry).expect("size"), 3 * (36 + 2 * 12));
        assert_eq!(layout.field(), FieldKind::Budget);
    }

    #[test]
    fn oversized_group_counts_fail_instead_of_wrapping() {
        let geometry = GridGeometry::new(2, 2, 2).expect("geometry");
        let layout = RecordLayout::PerGroupPreamble {
            field: FieldKind::Budget,
            groups: usize::MAX,
        };

        let error = layout
            .instance_bytes(&geometry)
            .expect_err("instance size should overflow");
        assert!(matches!(
            error,
            OutputError::LayoutOverflow {
                field: FieldKind::Budget
            }
        ));
        assert_eq!(error.placeholder(), "INPUT.LAYOUT_SIZE");
    }
}
