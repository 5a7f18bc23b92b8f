//! Byte sizes of the fixed units in the engine's binary output records.

pub const FLOAT_BYTES: usize = 4;
pub const INT_BYTES: usize = 4;

/// Width of the space-padded text label carried by every preamble.
pub const LABEL_BYTES: usize = 16;

/// step, period (i32), period time, total time (f32), label, cols, rows, layer (i32).
pub const LAYER_PREAMBLE_BYTES: usize =
    2 * INT_BYTES + 2 * FLOAT_BYTES + LABEL_BYTES + 3 * INT_BYTES;

/// step, period (i32), label, cols, rows, layers (i32).
pub const GROUP_PREAMBLE_BYTES: usize = 2 * INT_BYTES + LABEL_BYTES + 3 * INT_BYTES;

/// Flow records carry one group per face direction.
pub const FLOW_COMPONENTS: usize = 3;

/// Boundary code marking a cell whose head is fixed for the run.
pub const CONSTANT_HEAD_CODE: i32 = -1;

#[cfg(test)]
mod tests {
    use super::{GROUP_PREAMBLE_BYTES, LAYER_PREAMBLE_BYTES};

    #[test]
    fn preamble_sizes_match_wire_format() {
        assert_eq!(LAYER_PREAMBLE_BYTES, 44);
        assert_eq!(GROUP_PREAMBLE_BYTES, 36);
    }
}
