use znprims_frame::MAX_PAYLOAD;

/// Controls how the registry validates and encodes commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Largest payload a definition may need and an encoded command may
    /// produce. Default: 250.
    pub max_payload_size: usize,
    /// When true, a length or count field left out of the field map is filled
    /// from the buffer or list it describes.
    pub autofill_lengths: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_payload_size: MAX_PAYLOAD,
            autofill_lengths: true,
        }
    }
}
