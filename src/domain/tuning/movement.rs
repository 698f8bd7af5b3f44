/// Gameplay tuning for square movement and the update pulse.
///
/// Keep this separate from runtime/server configuration (ports, tick rates, buffer sizes).

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementTuning {
    /// Distance the destination moves per tick for each active flag.
    pub step: u16,

    /// Lower world bound on both axes.
    pub min: u16,

    /// Upper world bound on both axes.
    pub max: u16,

    /// Alpha written on every update so the square visibly flashes.
    pub pulse_alpha: f32,

    /// Alpha gained per rendered frame while interpolating toward the destination.
    pub interpolation_step: f32,
}

impl Default for MovementTuning {
    fn default() -> Self {
        Self {
            step: 2,
            min: 0,
            max: 400,
            pulse_alpha: 0.05,
            interpolation_step: 0.05,
        }
    }
}
