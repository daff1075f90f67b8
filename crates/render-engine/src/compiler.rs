//! Render compiler: turns a timeline snapshot into a [`RenderCommand`].
//!
//! # Graph shape
//!
//! ```text
//! color(black) ─[base]─┐
//! [i:v] trim → retime → crop → scale/pad → rotate → shift → alpha ─[vN]─┤ overlay (z order)
//!                                                       ... ─[ovN]─┤
//!                                                 drawtext (z order) ─┤
//!                                                   format=yuv420p ─[outv]
//!
//! [i:a] atrim → asetpts → atempo → adelay → volume ─[aN]─ amix ─[outa]
//! ```
//!
//! Compilation is all-or-nothing: every clip is validated before any graph
//! node is built, and the graph is checked before it is returned.

use clipforge_project_model::{
    extension_for_mime, ElementId, ExportSettings, MediaClip, MediaKind, TextOverlay, Timeline,
};

use crate::assets::{AssetStore, ResolvedAsset};
use crate::command::{EncodeParams, OutputMap, RenderCommand, RenderInput};
use crate::graph::{
    escape_option_value, FilterChain, FilterGraph, FilterStage, GraphError, PadLabel, PadRef,
    StreamKind,
};

/// Compilation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileOptions {
    /// Compile an empty timeline to a black frame instead of failing.
    pub allow_empty: bool,
    pub preset: String,
    pub crf: u8,
    pub audio_bitrate_kbps: u32,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self::from_settings(&ExportSettings::default())
    }
}

impl CompileOptions {
    pub fn from_settings(settings: &ExportSettings) -> Self {
        Self {
            allow_empty: false,
            preset: settings.speed.preset().to_string(),
            crf: settings.quality.crf(),
            audio_bitrate_kbps: settings.audio_bitrate_kbps,
        }
    }
}

/// Reasons compilation aborts. No partial command is produced.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error("timeline has no clips or text overlays")]
    EmptyTimeline,

    #[error("asset {asset_ref} for clip {clip_id} could not be resolved")]
    AssetUnresolved { clip_id: ElementId, asset_ref: String },

    #[error("clip {clip_id} uses unsupported media type {mime}")]
    UnsupportedCodec { clip_id: ElementId, mime: String },

    #[error("invalid duration {duration} for {element}")]
    InvalidDuration { element: String, duration: f64 },

    #[error("invalid filter graph: {0}")]
    InvalidGraph(#[from] GraphError),
}

impl From<CompileError> for clipforge_common::ClipforgeError {
    fn from(err: CompileError) -> Self {
        Self::compile(err.to_string())
    }
}

const AAC_SAMPLE_RATE: u32 = 44_100;

/// Format seconds compactly: `5`, `2.5`, `0.333333`.
pub(crate) fn fmt_num(value: f64) -> String {
    let s = format!("{value:.6}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" || s.is_empty() {
        "0".to_string()
    } else {
        s.to_string()
    }
}

/// A clip paired with its resolved asset and engine input index.
struct PlannedClip<'a> {
    clip: &'a MediaClip,
    asset: ResolvedAsset,
    input: usize,
}

/// Compile a timeline snapshot.
pub fn compile(
    timeline: &Timeline,
    assets: &dyn AssetStore,
    options: &CompileOptions,
) -> Result<RenderCommand, CompileError> {
    if timeline.is_empty() && !options.allow_empty {
        return Err(CompileError::EmptyTimeline);
    }

    let total = timeline.total_duration();
    if !(total.is_finite() && total > 0.0) {
        return Err(CompileError::InvalidDuration {
            element: "timeline".to_string(),
            duration: total,
        });
    }

    // Stable sort: equal z-indices keep storage order.
    let mut ordered: Vec<&MediaClip> = timeline.clips.iter().collect();
    ordered.sort_by_key(|c| c.z_index);

    let mut planned = Vec::with_capacity(ordered.len());
    let mut inputs = Vec::with_capacity(ordered.len());
    for (index, clip) in ordered.into_iter().enumerate() {
        let asset = validate_clip(clip, assets)?;
        let ext = extension_for_mime(&asset.mime).ok_or_else(|| CompileError::UnsupportedCodec {
            clip_id: clip.id,
            mime: asset.mime.clone(),
        })?;
        let is_still_image = clip.media_kind == MediaKind::Image;
        inputs.push(RenderInput {
            index,
            clip_id: clip.id,
            local_name: format!("input{index}.{ext}"),
            mime: asset.mime.clone(),
            is_still_image,
            hold_duration_secs: is_still_image.then(|| clip.timeline_span()),
            source: asset.source.clone(),
        });
        planned.push(PlannedClip {
            clip,
            asset,
            input: index,
        });
    }

    for overlay in &timeline.overlays {
        validate_overlay(overlay)?;
    }

    let mut graph = FilterGraph::new();
    let base = PadLabel::fixed("base");
    graph.push(
        FilterChain::new(vec![], base.clone()).stage(
            FilterStage::new("color")
                .arg("c", "black")
                .arg("s", format!("{}x{}", timeline.canvas.width, timeline.canvas.height))
                .arg("r", timeline.frame_rate)
                .arg("d", fmt_num(total)),
        ),
    );

    let mut current = base;
    let visual: Vec<&PlannedClip> = planned
        .iter()
        .filter(|p| p.clip.media_kind.is_visual())
        .collect();
    for (n, plan) in visual.iter().enumerate() {
        let clip_label = PadLabel::indexed("v", n);
        graph.push(video_chain(plan, clip_label.clone()));

        let composited = PadLabel::indexed("ov", n);
        graph.push(
            FilterChain::new(vec![current.into(), clip_label.into()], composited.clone()).stage(
                FilterStage::new("overlay")
                    .arg("x", fmt_num(plan.clip.x))
                    .arg("y", fmt_num(plan.clip.y))
                    .arg("eof_action", "pass")
                    .expr("enable", enable_window(plan.clip.timeline_start, plan.clip.timeline_end)),
            ),
        );
        current = composited;
    }

    let mut overlays: Vec<&TextOverlay> = timeline.overlays.iter().collect();
    overlays.sort_by_key(|t| t.z_index);
    for (n, overlay) in overlays.into_iter().enumerate() {
        let label = PadLabel::indexed("txt", n);
        graph.push(FilterChain::new(vec![current.into()], label.clone()).stage(drawtext(overlay)));
        current = label;
    }

    let video_out = PadLabel::fixed("outv");
    graph.push(
        FilterChain::new(vec![current.into()], video_out.clone())
            .stage(FilterStage::new("format").arg("pix_fmts", "yuv420p"))
            .stage(FilterStage::new("setsar").positional(1)),
    );

    let audio_sources: Vec<&PlannedClip> = planned
        .iter()
        .filter(|p| carries_audio(p.clip, &p.asset))
        .collect();
    let audio_out = if audio_sources.is_empty() {
        None
    } else {
        let mut mix_inputs = Vec::with_capacity(audio_sources.len());
        for (n, plan) in audio_sources.iter().enumerate() {
            let label = PadLabel::indexed("a", n);
            graph.push(audio_chain(plan, label.clone()));
            mix_inputs.push(PadRef::Label(label));
        }
        let out = PadLabel::fixed("outa");
        let count = mix_inputs.len();
        graph.push(
            FilterChain::new(mix_inputs, out.clone()).stage(
                FilterStage::new("amix")
                    .arg("inputs", count)
                    .arg("duration", "longest")
                    .arg("normalize", 1),
            ),
        );
        Some(out)
    };

    let mut terminals = vec![&video_out];
    if let Some(audio) = &audio_out {
        terminals.push(audio);
    }
    graph.validate(inputs.len(), &terminals)?;

    Ok(RenderCommand {
        inputs,
        filter_graph: graph,
        output_map: OutputMap {
            video: video_out,
            audio: audio_out.clone(),
        },
        encode_params: EncodeParams {
            video_codec: "libx264".to_string(),
            profile: "main".to_string(),
            level: "4.0".to_string(),
            pixel_format: "yuv420p".to_string(),
            preset: options.preset.clone(),
            crf: options.crf,
            frame_rate: timeline.frame_rate,
            audio_codec: audio_out.as_ref().map(|_| "aac".to_string()),
            audio_bitrate_kbps: audio_out.as_ref().map(|_| options.audio_bitrate_kbps),
            audio_sample_rate: audio_out.as_ref().map(|_| AAC_SAMPLE_RATE),
            total_duration_secs: total,
            output_container_hint: "mp4".to_string(),
        },
    })
}

/// Audio-kind clips always reach the mix, whatever the asset record says.
fn carries_audio(clip: &MediaClip, asset: &ResolvedAsset) -> bool {
    clip.media_kind == MediaKind::Audio || (clip.media_kind.can_carry_audio() && asset.has_audio)
}

fn validate_overlay(overlay: &TextOverlay) -> Result<(), CompileError> {
    let span = overlay.timeline_span();
    if span.is_finite() && span > 0.0 {
        Ok(())
    } else {
        Err(CompileError::InvalidDuration {
            element: format!("text {}", overlay.id),
            duration: span,
        })
    }
}

fn validate_clip(clip: &MediaClip, assets: &dyn AssetStore) -> Result<ResolvedAsset, CompileError> {
    let asset = assets
        .resolve(&clip.asset_ref)
        .ok_or_else(|| CompileError::AssetUnresolved {
            clip_id: clip.id,
            asset_ref: clip.asset_ref.to_string(),
        })?;

    for span in [clip.timeline_span(), clip.source_span()] {
        if !(span.is_finite() && span > 0.0) {
            return Err(CompileError::InvalidDuration {
                element: format!("clip {}", clip.id),
                duration: span,
            });
        }
    }
    Ok(asset)
}

fn enable_window(start: f64, end: f64) -> String {
    format!("between(t,{},{})", fmt_num(start), fmt_num(end))
}

fn video_chain(plan: &PlannedClip<'_>, output: PadLabel) -> FilterChain {
    let clip = plan.clip;
    let input = PadRef::Input {
        index: plan.input,
        stream: StreamKind::Video,
    };
    let mut chain = FilterChain::new(vec![input], output);

    // Looped stills are already cut to their hold duration.
    if clip.media_kind != MediaKind::Image {
        chain = chain.stage(
            FilterStage::new("trim")
                .arg("start", fmt_num(clip.source_in))
                .arg("end", fmt_num(clip.source_out)),
        );
    }
    let speed = clip.speed_factor();
    let retime = if clip.media_kind != MediaKind::Image && (speed - 1.0).abs() > 1e-9 {
        format!("(PTS-STARTPTS)/{}", fmt_num(speed))
    } else {
        "PTS-STARTPTS".to_string()
    };
    chain = chain.stage(FilterStage::new("setpts").positional(retime));

    if let Some(crop) = clip.crop_rect {
        chain = chain.stage(
            FilterStage::new("crop")
                .arg("w", fmt_num(crop.width.round()))
                .arg("h", fmt_num(crop.height.round()))
                .arg("x", fmt_num(crop.x.round()))
                .arg("y", fmt_num(crop.y.round())),
        );
    }

    let width = (clip.width.round() as i64).max(2);
    let height = (clip.height.round() as i64).max(2);
    chain = chain
        .stage(
            FilterStage::new("scale")
                .arg("w", width)
                .arg("h", height)
                .arg("force_original_aspect_ratio", "decrease"),
        )
        .stage(
            FilterStage::new("pad")
                .arg("w", width)
                .arg("h", height)
                .arg("x", "(ow-iw)/2")
                .arg("y", "(oh-ih)/2")
                .arg("color", "black"),
        )
        .stage(FilterStage::new("format").arg("pix_fmts", "yuva420p"));

    if clip.rotation_deg.abs() > 1e-9 {
        chain = chain.stage(
            FilterStage::new("rotate")
                .arg("a", format!("{}*PI/180", fmt_num(clip.rotation_deg)))
                .arg("c", "none"),
        );
    }

    chain
        .stage(
            FilterStage::new("setpts").positional(format!(
                "PTS+{}/TB",
                fmt_num(clip.timeline_start)
            )),
        )
        .stage(
            FilterStage::new("colorchannelmixer")
                .arg("aa", fmt_num(clip.opacity_percent / 100.0)),
        )
}

/// Split a tempo factor into `atempo` steps within its accepted 0.5..=2 range.
fn atempo_steps(speed: f64) -> Vec<f64> {
    let mut steps = vec![];
    let mut remaining = speed;
    while remaining > 2.0 {
        steps.push(2.0);
        remaining /= 2.0;
    }
    while remaining < 0.5 {
        steps.push(0.5);
        remaining /= 0.5;
    }
    if (remaining - 1.0).abs() > 1e-9 {
        steps.push(remaining);
    }
    steps
}

fn audio_chain(plan: &PlannedClip<'_>, output: PadLabel) -> FilterChain {
    let clip = plan.clip;
    let input = PadRef::Input {
        index: plan.input,
        stream: StreamKind::Audio,
    };
    let mut chain = FilterChain::new(vec![input], output)
        .stage(
            FilterStage::new("atrim")
                .arg("start", fmt_num(clip.source_in))
                .arg("end", fmt_num(clip.source_out)),
        )
        .stage(FilterStage::new("asetpts").positional("PTS-STARTPTS"));

    for step in atempo_steps(clip.speed_factor()) {
        chain = chain.stage(FilterStage::new("atempo").positional(fmt_num(step)));
    }

    let delay_ms = (clip.timeline_start * 1000.0).round().max(0.0) as u64;
    chain
        .stage(
            FilterStage::new("adelay")
                .arg("delays", delay_ms)
                .arg("all", 1),
        )
        .stage(FilterStage::new("volume").arg("volume", fmt_num(clip.volume_percent / 100.0)))
}

fn drawtext(overlay: &TextOverlay) -> FilterStage {
    let alpha = overlay.color.alpha() * (overlay.opacity_percent / 100.0).clamp(0.0, 1.0);
    FilterStage::new("drawtext")
        .arg("font", escape_option_value(&overlay.font_family))
        .arg("text", escape_option_value(&overlay.text))
        .arg("expansion", "none")
        .arg("fontsize", fmt_num(overlay.font_size_px))
        .arg(
            "fontcolor",
            format!("{}@{}", overlay.color.hex_rgb(), fmt_num(alpha)),
        )
        .arg("x", fmt_num(overlay.x))
        .arg("y", fmt_num(overlay.y))
        .expr("enable", enable_window(overlay.timeline_start, overlay.timeline_end))
}
