//! Debug assertion macros for transform and export invariants.
//!
//! Only active in debug builds, so release builds carry no overhead.

// =============================================================================
// INV-XFORM-01: Non-zero Identifiers
// =============================================================================

/// Assert that a span carries valid (non-zero) trace and span ids.
///
/// **Invariant**: `trace_id != 0 ∧ span_id != 0`
///
/// A zero id means the span producer is broken; there is nothing sensible to
/// send to the collector.
///
/// Used in: `transform()` before encoding identifiers
macro_rules! debug_assert_valid_ids {
    ($trace_id:expr, $span_id:expr) => {
        debug_assert!(
            $trace_id != 0 && $span_id != 0,
            "INV-XFORM-01 violated: invalid ids trace_id={:032x} span_id={:016x}",
            $trace_id,
            $span_id
        )
    };
}

// =============================================================================
// INV-XFORM-02: Fixed-width Identifier Encoding
// =============================================================================

/// Assert that an encoded id has the expected hex width.
///
/// **Invariant**: `len(trace_id_hex) == 32 ∧ len(span_id_hex) == 16`
///
/// Used in: `transform()` after encoding identifiers
macro_rules! debug_assert_hex_width {
    ($encoded:expr, $width:expr) => {
        debug_assert!(
            $encoded.len() == $width,
            "INV-XFORM-02 violated: encoded id {:?} is not {} hex chars",
            $encoded,
            $width
        )
    };
}

// =============================================================================
// INV-EXP-01: Batch Order Preservation
// =============================================================================

/// Assert that a transformed batch has one entry per input span.
///
/// **Invariant**: `len(wire_batch) == len(spans)`
///
/// Used in: `ZipkinExporter::export()` after transforming the batch
macro_rules! debug_assert_batch_complete {
    ($input_len:expr, $output_len:expr) => {
        debug_assert!(
            $input_len == $output_len,
            "INV-EXP-01 violated: transformed {} spans from {} inputs",
            $output_len,
            $input_len
        )
    };
}

// =============================================================================
// Re-exports for crate-internal use
// =============================================================================

pub(crate) use debug_assert_batch_complete;
pub(crate) use debug_assert_hex_width;
pub(crate) use debug_assert_valid_ids;
