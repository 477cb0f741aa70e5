//! 流水线编排
//!
//! analyzing -> detecting -> assigning -> generating -> (quality_check) -> complete，
//! 任意阶段失败或被取消进入 error。
//!
//! 同一实例同时只允许一个运行。每次运行有一个代号（generation），
//! 状态写入只在代号仍为活动运行时生效：被取消的运行即使仍在等待外部调用，
//! 返回后也无法覆盖取消状态，新运行可以在取消后立即开始。

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use chrono::Utc;

use super::options::{AudioOutput, ProcessOptions};
use super::status::{Checkpoint, ProcessingStatus, Stage};
use crate::application::error::ApplicationError;
use crate::application::ports::SpeechSynthesisPort;
use crate::domain::narrative::{CharacterExtractor, Segmenter};
use crate::domain::quality::QualityAnalyzer;
use crate::domain::voice::{VoiceAssigner, VoiceProfile};

/// 合并分段音频时的进度
const COMBINE_PROGRESS: u8 = 90;
/// 音频优化时的进度
const OPTIMIZE_PROGRESS: u8 = 95;
/// 生成阶段占用的进度区间 [40, 85]
const GENERATING_SPAN: usize = 45;

#[derive(Debug, Default)]
struct RunState {
    in_flight: bool,
    generation: u64,
    active: Option<u64>,
    status: ProcessingStatus,
}

/// 一次已被接受、尚未执行的运行
#[derive(Debug)]
pub struct RunTicket {
    run_id: u64,
    text: String,
    options: ProcessOptions,
    accepted_at: Instant,
}

impl RunTicket {
    pub fn run_id(&self) -> u64 {
        self.run_id
    }
}

/// 流水线编排器
pub struct PipelineOrchestrator {
    segmenter: Arc<Segmenter>,
    extractor: Arc<CharacterExtractor>,
    assigner: Arc<VoiceAssigner>,
    analyzer: Arc<QualityAnalyzer>,
    synthesizer: Arc<dyn SpeechSynthesisPort>,
    state: Mutex<RunState>,
}

impl PipelineOrchestrator {
    pub fn new(
        segmenter: Arc<Segmenter>,
        extractor: Arc<CharacterExtractor>,
        assigner: Arc<VoiceAssigner>,
        analyzer: Arc<QualityAnalyzer>,
        synthesizer: Arc<dyn SpeechSynthesisPort>,
    ) -> Self {
        Self {
            segmenter,
            extractor,
            assigner,
            analyzer,
            synthesizer,
            state: Mutex::new(RunState::default()),
        }
    }

    pub fn synthesizer(&self) -> &Arc<dyn SpeechSynthesisPort> {
        &self.synthesizer
    }

    /// 当前状态快照
    pub fn status(&self) -> ProcessingStatus {
        self.lock().status.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.lock().in_flight
    }

    /// 处理一篇故事
    pub async fn process_story(
        &self,
        text: &str,
        options: ProcessOptions,
    ) -> Result<AudioOutput, ApplicationError> {
        let ticket = self.begin(text, options)?;
        self.run(ticket).await
    }

    /// 接受一次运行
    ///
    /// 忙碌或输入无效时立即失败，且不改动任何状态
    pub fn begin(
        &self,
        text: &str,
        options: ProcessOptions,
    ) -> Result<RunTicket, ApplicationError> {
        let mut state = self.lock();
        if state.in_flight {
            return Err(ApplicationError::busy("A story is already being processed"));
        }
        if text.trim().is_empty() {
            return Err(ApplicationError::validation("Story text is empty"));
        }
        if !self.synthesizer.supports_format(options.output_format) {
            return Err(ApplicationError::validation(format!(
                "Provider '{}' does not support {} output",
                self.synthesizer.name(),
                options.output_format
            )));
        }

        state.generation += 1;
        let run_id = state.generation;
        state.active = Some(run_id);
        state.in_flight = true;
        state.status = ProcessingStatus::new(Stage::Analyzing, 0, "Starting story processing");

        tracing::info!(
            run_id,
            chars = text.chars().count(),
            format = %options.output_format,
            provider = self.synthesizer.name(),
            "Story processing accepted"
        );

        Ok(RunTicket {
            run_id,
            text: text.to_string(),
            options,
            accepted_at: Instant::now(),
        })
    }

    /// 执行已接受的运行
    pub async fn run(&self, ticket: RunTicket) -> Result<AudioOutput, ApplicationError> {
        let result = self.execute(&ticket).await;
        let run_id = ticket.run_id;

        let mut state = self.lock();
        if state.active != Some(run_id) {
            tracing::info!(run_id, "Run finished after cancellation");
            return Err(ApplicationError::Cancelled);
        }
        state.active = None;
        state.in_flight = false;

        match result {
            Ok(output) => {
                state.status = ProcessingStatus::new(Stage::Complete, 100, "Processing complete");
                tracing::info!(
                    run_id,
                    stage = %Stage::Complete,
                    segments = output.segment_count,
                    characters = output.character_count,
                    duration_ms = output.duration_ms,
                    processing_time_ms = output.processing_time_ms,
                    "Story processing complete"
                );
                Ok(output)
            }
            Err(e) => {
                tracing::error!(run_id, failed_stage = %state.status.stage, error = %e, "Story processing failed");
                state.status = ProcessingStatus::error(e.to_string());
                Err(e)
            }
        }
    }

    /// 取消当前运行
    ///
    /// 取消是协作式的，正在进行的外部调用不会被中断
    pub fn cancel(&self) -> Result<(), ApplicationError> {
        let mut state = self.lock();
        if !state.in_flight {
            return Err(ApplicationError::invalid_state("No processing in progress"));
        }
        let run_id = state.active.take();
        state.in_flight = false;
        state.status = ProcessingStatus::cancelled();
        tracing::info!(run_id = ?run_id, "Processing cancelled");
        Ok(())
    }

    async fn execute(&self, ticket: &RunTicket) -> Result<AudioOutput, ApplicationError> {
        let run_id = ticket.run_id;
        let text = ticket.text.as_str();
        let options = &ticket.options;
        let format = options.output_format;

        self.enter(run_id, Stage::Analyzing, "Analyzing text structure")?;
        let segments = self.segmenter.parse(text)?;

        self.enter(run_id, Stage::Detecting, "Detecting characters")?;
        let characters = self.extractor.detect(&segments);

        self.enter(run_id, Stage::Assigning, "Assigning voices")?;
        let mut assignments = self.assigner.assign(&characters)?;
        if options.enable_manual_correction && !options.voice_overrides.is_empty() {
            assignments = self
                .assigner
                .apply_overrides(assignments, &options.voice_overrides)?;
        }
        let voices: HashMap<&str, &VoiceProfile> = assignments
            .iter()
            .map(|a| (a.character.as_str(), &a.voice))
            .collect();

        self.enter(run_id, Stage::Generating, "Generating audio")?;
        let total = segments.len();
        let mut clips = Vec::with_capacity(total);
        for (i, segment) in segments.iter().enumerate() {
            let progress = Stage::Generating.milestone() + (GENERATING_SPAN * i / total.max(1)) as u8;
            self.checkpoint(
                run_id,
                Checkpoint::BeforeSegment(i),
                ProcessingStatus::new(
                    Stage::Generating,
                    progress,
                    format!("Generating audio {}/{}", i + 1, total),
                )
                .with_item(segment.id.clone()),
            )?;

            let voice = voices.get(segment.speaker.as_str()).ok_or_else(|| {
                ApplicationError::resolution(format!(
                    "No voice assigned for speaker: {}",
                    segment.speaker
                ))
            })?;
            let clip = self
                .synthesizer
                .generate_segment_audio(segment, voice, format)
                .await?;
            tracing::debug!(
                run_id,
                segment_id = %segment.id,
                voice_id = %voice.id,
                duration_ms = clip.duration_ms,
                "Segment synthesized"
            );
            clips.push(clip);
        }

        self.report(
            run_id,
            ProcessingStatus::new(Stage::Generating, COMBINE_PROGRESS, "Combining audio segments"),
        );
        let combined = self.synthesizer.combine_audio_segments(clips, format).await?;

        self.report(
            run_id,
            ProcessingStatus::new(Stage::Generating, OPTIMIZE_PROGRESS, "Optimizing audio"),
        );
        let audio = match self
            .synthesizer
            .optimize_audio(combined.data.clone(), format)
            .await
        {
            Ok(optimized) => optimized,
            Err(e) => {
                tracing::warn!(run_id, error = %e, "Audio optimization failed, using original audio");
                combined.data
            }
        };

        let quality_report = if options.include_quality_analysis {
            self.enter(run_id, Stage::QualityCheck, "Analyzing writing quality")?;
            match self.analyzer.generate_report(text).await {
                Ok(report) => Some(report),
                Err(e) => {
                    tracing::warn!(run_id, error = %e, "Quality analysis failed");
                    None
                }
            }
        } else {
            None
        };

        Ok(AudioOutput {
            audio,
            format,
            duration_ms: combined.duration_ms,
            segment_count: segments.len(),
            character_count: characters.len(),
            processing_time_ms: ticket.accepted_at.elapsed().as_millis() as u64,
            completed_at: Utc::now(),
            segments,
            characters,
            assignments,
            quality_report,
        })
    }

    fn enter(&self, run_id: u64, stage: Stage, message: &str) -> Result<(), ApplicationError> {
        self.checkpoint(
            run_id,
            Checkpoint::StageEntry(stage),
            ProcessingStatus::new(stage, stage.milestone(), message),
        )?;
        tracing::info!(run_id, stage = %stage, "{}", message);
        Ok(())
    }

    /// 检查取消并写入新状态
    fn checkpoint(
        &self,
        run_id: u64,
        checkpoint: Checkpoint,
        status: ProcessingStatus,
    ) -> Result<(), ApplicationError> {
        let mut state = self.lock();
        if state.active != Some(run_id) {
            tracing::debug!(run_id, checkpoint = ?checkpoint, "Cancellation observed");
            return Err(ApplicationError::Cancelled);
        }
        state.status = status;
        Ok(())
    }

    /// 不检查取消的进度更新
    fn report(&self, run_id: u64, status: ProcessingStatus) {
        let mut state = self.lock();
        if state.active == Some(run_id) {
            state.status = status;
        }
    }

    fn lock(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
