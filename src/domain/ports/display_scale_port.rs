//! Port exposing the display resolution images are prepared for.

/// Supplies the largest useful pixel dimension of the current display.
pub trait DisplayScalePort: Send + Sync {
    /// Longest side, in pixels, an image needs to have.
    fn max_dimension(&self) -> u32;
}
