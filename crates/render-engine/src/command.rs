//! Render command: the complete instruction set handed to the engine.

use std::path::{Path, PathBuf};

use serde::Serialize;

use clipforge_common::{ClipforgeError, ClipforgeResult};
use clipforge_project_model::ElementId;

use crate::assets::AssetSource;
use crate::graph::{FilterGraph, PadLabel};

/// One numbered engine input.
#[derive(Debug, Clone, Serialize)]
pub struct RenderInput {
    /// Position in the `-i` list.
    pub index: usize,
    /// Clip this input feeds.
    pub clip_id: ElementId,
    /// File name used when the asset is staged locally, e.g. `input0.mp4`.
    pub local_name: String,
    pub mime: String,
    /// Still images are looped for `hold_duration_secs`.
    pub is_still_image: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hold_duration_secs: Option<f64>,
    #[serde(skip)]
    pub source: AssetSource,
}

/// Which graph pads become the output streams.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputMap {
    pub video: PadLabel,
    pub audio: Option<PadLabel>,
}

/// Encoder configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodeParams {
    pub video_codec: String,
    pub profile: String,
    pub level: String,
    pub pixel_format: String,
    pub preset: String,
    pub crf: u8,
    pub frame_rate: u32,
    pub audio_codec: Option<String>,
    pub audio_bitrate_kbps: Option<u32>,
    pub audio_sample_rate: Option<u32>,
    pub total_duration_secs: f64,
    pub output_container_hint: String,
}

/// A compiled, validated render job.
#[derive(Debug, Clone, Serialize)]
pub struct RenderCommand {
    pub inputs: Vec<RenderInput>,
    pub filter_graph: FilterGraph,
    pub output_map: OutputMap,
    pub encode_params: EncodeParams,
}

impl RenderCommand {
    /// Build the ffmpeg argument vector.
    ///
    /// `input_paths[i]` is the readable location of `inputs[i]`.
    pub fn to_ffmpeg_args(
        &self,
        input_paths: &[PathBuf],
        output: &Path,
    ) -> ClipforgeResult<Vec<String>> {
        if input_paths.len() != self.inputs.len() {
            return Err(ClipforgeError::render(format!(
                "expected {} input paths, got {}",
                self.inputs.len(),
                input_paths.len()
            )));
        }

        let mut args: Vec<String> = [
            "-y",
            "-hide_banner",
            "-loglevel",
            "error",
            "-nostats",
            "-progress",
            "pipe:1",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        for (input, path) in self.inputs.iter().zip(input_paths) {
            if input.is_still_image {
                args.push("-loop".to_string());
                args.push("1".to_string());
                if let Some(hold) = input.hold_duration_secs {
                    args.push("-t".to_string());
                    args.push(format!("{hold:.6}"));
                }
            }
            args.push("-i".to_string());
            args.push(path.display().to_string());
        }

        args.push("-filter_complex".to_string());
        args.push(self.filter_graph.to_filter_complex());
        args.push("-map".to_string());
        args.push(self.output_map.video.to_string());
        if let Some(audio) = &self.output_map.audio {
            args.push("-map".to_string());
            args.push(audio.to_string());
        }

        args.append(&mut self.codec_args());
        args.push(output.display().to_string());
        Ok(args)
    }

    fn codec_args(&self) -> Vec<String> {
        let p = &self.encode_params;
        let mut args = vec![
            "-c:v".to_string(),
            p.video_codec.clone(),
            "-profile:v".to_string(),
            p.profile.clone(),
            "-level".to_string(),
            p.level.clone(),
            "-pix_fmt".to_string(),
            p.pixel_format.clone(),
            "-preset".to_string(),
            p.preset.clone(),
            "-crf".to_string(),
            p.crf.to_string(),
            "-r".to_string(),
            p.frame_rate.to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
            "-t".to_string(),
            format!("{:.6}", p.total_duration_secs),
        ];

        match (&self.output_map.audio, &p.audio_codec) {
            (Some(_), Some(codec)) => {
                args.push("-c:a".to_string());
                args.push(codec.clone());
                if let Some(bitrate) = p.audio_bitrate_kbps {
                    args.push("-b:a".to_string());
                    args.push(format!("{bitrate}k"));
                }
                if let Some(rate) = p.audio_sample_rate {
                    args.push("-ar".to_string());
                    args.push(rate.to_string());
                }
            }
            _ => args.push("-an".to_string()),
        }
        args
    }

    /// Short human-readable summary, used for logs and the debug report.
    pub fn summary(&self) -> String {
        format!(
            "inputs={}\nchains={}\nvideo_pad={}\naudio_pad={}\nduration_secs={:.3}\npreset={}\ncrf={}\nfilter_len={}\n",
            self.inputs.len(),
            self.filter_graph.chains.len(),
            self.output_map.video,
            self.output_map
                .audio
                .as_ref()
                .map(|a| a.to_string())
                .unwrap_or_else(|| "none".to_string()),
            self.encode_params.total_duration_secs,
            self.encode_params.preset,
            self.encode_params.crf,
            self.filter_graph.to_filter_complex().len(),
        )
    }
}
