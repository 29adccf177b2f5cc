//! Synthetic sensor data: labelled periodic signals separated by noise.
//!
//! Each phase repeats every category `num_reps` times. A category is one
//! `sequence_length`-point window of the signal shape at `category` cycles per
//! window, followed by a noise segment whose length cycles through
//! `noise_lengths`. Signal points are labelled `1..=num_categories`, noise
//! points `0`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use std::path::{Path, PathBuf};

use seqsweep_core::error::PipelineError;
use seqsweep_core::pipeline::{GeneratedData, SignalGenerator, SignalRequest};
use seqsweep_core::structure::Stage;

/// Label carried by noise points.
pub const NOISE_CATEGORY: u32 = 0;

/// Supported periodic signal shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalShape {
    Binary,
    Sine,
    Triangle,
    Sawtooth,
}

impl SignalShape {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "binary" => Some(Self::Binary),
            "sine" => Some(Self::Sine),
            "triangle" => Some(Self::Triangle),
            "sawtooth" => Some(Self::Sawtooth),
            _ => None,
        }
    }

    /// Value in `[-1, 1]` at `phase`, measured in cycles.
    fn sample(self, phase: f64) -> f64 {
        let frac = phase.fract();
        match self {
            Self::Binary => {
                if frac < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Self::Sine => (2.0 * PI * phase).sin(),
            Self::Triangle => 1.0 - 4.0 * (frac - 0.5).abs(),
            Self::Sawtooth => 2.0 * frac - 1.0,
        }
    }
}

/// File-backed generator writing `x,y,label` CSV files.
#[derive(Debug, Clone)]
pub struct SyntheticSensorData {
    pub sequence_length: usize,
    pub seed: u64,
}

impl SyntheticSensorData {
    pub fn new(sequence_length: usize, seed: u64) -> Self {
        Self {
            sequence_length,
            seed,
        }
    }

    /// Generate the labelled points of `request` without touching disk.
    pub fn points(&self, request: &SignalRequest) -> Result<Vec<(f64, u32)>, PipelineError> {
        let shape = SignalShape::parse(&request.signal_type).ok_or_else(|| {
            PipelineError::stage(
                Stage::Sensor,
                format!("unknown signal type '{}'", request.signal_type),
            )
        })?;
        if self.sequence_length == 0 {
            return Err(PipelineError::stage(
                Stage::Sensor,
                "sequence length must be positive",
            ));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let noise = |rng: &mut StdRng| {
            if request.noise_amplitude > 0.0 {
                request.noise_amplitude * rng.gen_range(-1.0..1.0)
            } else {
                0.0
            }
        };

        let mut points = Vec::new();
        let mut segment = 0usize;
        for _phase in 0..request.num_phases {
            for _rep in 0..request.num_reps {
                for category in 1..=request.num_categories {
                    for t in 0..self.sequence_length {
                        let phase = category as f64 * t as f64 / self.sequence_length as f64;
                        let y = request.signal_mean
                            + request.signal_amplitude * shape.sample(phase)
                            + noise(&mut rng);
                        points.push((y, category as u32));
                    }

                    let gap = match request.noise_lengths.as_slice() {
                        [] => 0,
                        lengths => lengths[segment % lengths.len()],
                    };
                    segment += 1;
                    for _ in 0..gap {
                        let y = request.signal_mean + noise(&mut rng);
                        points.push((y, NOISE_CATEGORY));
                    }
                }
            }
        }
        Ok(points)
    }

    fn file_name(request: &SignalRequest) -> String {
        let lengths = request
            .noise_lengths
            .iter()
            .map(|l| l.to_string())
            .collect::<Vec<_>>()
            .join("-");
        format!(
            "{}_ph{}_reps{}_cat{}_noise{}_mean{}_amp{}_gaps{}.csv",
            request.signal_type,
            request.num_phases,
            request.num_reps,
            request.num_categories,
            request.noise_amplitude,
            request.signal_mean,
            request.signal_amplitude,
            if lengths.is_empty() { "0".to_string() } else { lengths },
        )
    }
}

impl SignalGenerator for SyntheticSensorData {
    fn generate(&self, request: &SignalRequest, out_dir: &Path) -> Result<GeneratedData, PipelineError> {
        let points = self.points(request)?;

        let mut csv = String::from("x,y,label\n");
        for (x, (y, label)) in points.iter().enumerate() {
            csv.push_str(&format!("{x},{y},{label}\n"));
        }

        std::fs::create_dir_all(out_dir)?;
        let input_file: PathBuf = out_dir.join(Self::file_name(request));
        std::fs::write(&input_file, csv)?;

        tracing::debug!(
            path = %input_file.display(),
            num_points = points.len(),
            "Generated sensor data"
        );
        Ok(GeneratedData {
            input_file,
            num_points: points.len(),
            sequence_length: self.sequence_length,
        })
    }
}
