/// Block audio processor.
///
/// Units are parameterized at construction from a `ProcessingSettings`
/// snapshot and keep their internal state (delay lines, filter history)
/// across blocks. All units must be Send so a render job can run on a worker
/// thread. Processing must not allocate per block.
pub trait Effect: Send {
    /// Process interleaved samples in-place.
    ///
    /// `buffer` holds `buffer.len() / channels` complete frames; the frame
    /// count stays unchanged (length-changing stages live outside this
    /// trait).
    fn process(&mut self, buffer: &mut [f32], channels: usize, sample_rate: u32);

    /// Clear internal state (delay lines, filter history, tails).
    fn reset(&mut self);

    /// Effect name for diagnostics.
    fn name(&self) -> &str;
}
