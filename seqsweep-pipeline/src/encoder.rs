//! Scalar encoder: a contiguous run of `w` active bits out of `n`.

use seqsweep_core::error::PipelineError;
use seqsweep_core::structure::{EncoderSettings, Stage};

#[derive(Debug, Clone)]
pub struct ScalarEncoder {
    minval: f64,
    maxval: f64,
    n: usize,
    w: usize,
}

impl ScalarEncoder {
    pub fn new(settings: &EncoderSettings) -> Result<Self, PipelineError> {
        if settings.minval.is_nan() || settings.maxval.is_nan() || settings.maxval <= settings.minval {
            return Err(PipelineError::stage(
                Stage::Sensor,
                format!(
                    "encoder range [{}, {}] is empty",
                    settings.minval, settings.maxval
                ),
            ));
        }
        if settings.w == 0 || settings.w > settings.n {
            return Err(PipelineError::stage(
                Stage::Sensor,
                format!("encoder width {} does not fit in {} bits", settings.w, settings.n),
            ));
        }
        Ok(Self {
            minval: settings.minval,
            maxval: settings.maxval,
            n: settings.n,
            w: settings.w,
        })
    }

    /// Output width in bits.
    pub fn width(&self) -> usize {
        self.n
    }

    /// Active bit indices for `value`, clipped to the encoder range.
    pub fn encode(&self, value: f64) -> Vec<usize> {
        let clipped = value.clamp(self.minval, self.maxval);
        let buckets = (self.n - self.w) as f64;
        let start = ((clipped - self.minval) / (self.maxval - self.minval) * buckets).round() as usize;
        (start..start + self.w).collect()
    }
}
