use std::f32::consts::TAU;
use std::path::Path;
use std::time::{Duration, Instant};

use fx_backend::{
    AudioFile, AudioProcessor, AudioWriter, ProcessError, ProcessingSettings, ProcessorEvent,
    RenderState, SourceFormat,
};

const SAMPLE_RATE: u32 = 44_100;

/// Write a sine fixture as 16-bit WAV, identical on every channel.
fn write_sine_wav(path: &Path, freq: f32, seconds: f32, channels: u16) {
    let spec = hound::WavSpec {
        channels,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    let frames = (seconds * SAMPLE_RATE as f32) as usize;
    for i in 0..frames {
        let value = (TAU * freq * i as f32 / SAMPLE_RATE as f32).sin() * 0.5;
        let pcm = (value * 32767.0) as i16;
        for _ in 0..channels {
            writer.write_sample(pcm).unwrap();
        }
    }
    writer.finalize().unwrap();
}

fn rms(samples: &[f32]) -> f32 {
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

#[test]
fn test_neutral_settings_reproduce_the_source() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("sine.wav");
    write_sine_wav(&source, 440.0, 1.0, 1);

    let mut processor = AudioProcessor::with_output_dir(dir.path().join("out"));
    let output = processor
        .process_file(&source, ProcessingSettings::default())
        .unwrap();
    assert_eq!(processor.render_state(), RenderState::Done);

    let input = AudioFile::load(&source).unwrap();
    let rendered = AudioFile::load(&output).unwrap();

    assert_eq!(rendered.sample_rate, input.sample_rate);
    assert_eq!(rendered.channels, input.channels);
    assert_eq!(rendered.frames, input.frames);

    let input_rms = rms(&input.data);
    let output_rms = rms(&rendered.data);
    assert!(
        (output_rms - input_rms).abs() / input_rms < 0.01,
        "RMS must match within 1%: in={input_rms} out={output_rms}"
    );
}

#[test]
fn test_double_rate_halves_the_duration() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("sine.wav");
    write_sine_wav(&source, 440.0, 1.0, 1);

    let settings = ProcessingSettings {
        play_rate: 2.0,
        ..Default::default()
    };

    let mut processor = AudioProcessor::with_output_dir(dir.path().join("out"));
    let output = processor.process_file(&source, settings).unwrap();

    let rendered = AudioFile::load(&output).unwrap();
    let expected = SAMPLE_RATE as i64 / 2;
    assert!(
        (rendered.frames as i64 - expected).abs() <= 4096,
        "expected about {expected} frames, got {}",
        rendered.frames
    );
}

#[test]
fn test_active_effects_keep_format_and_length() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("sine.wav");
    write_sine_wav(&source, 330.0, 1.0, 2);

    let settings = ProcessingSettings {
        reverb_mix: 40.0,
        delay_mix: 35.0,
        delay_time_ms: 200.0,
        delay_feedback: 50.0,
        delay_low_pass_cutoff: 8_000.0,
        distortion_mix: 20.0,
        distortion_pre_gain_db: 0.0,
        ..Default::default()
    };

    let mut processor = AudioProcessor::with_output_dir(dir.path().join("out"));
    let output = processor.process_file(&source, settings).unwrap();

    let input = AudioFile::load(&source).unwrap();
    let rendered = AudioFile::load(&output).unwrap();

    // No varispeed: the rendered frame count tracks the source exactly.
    assert_eq!(rendered.frames, input.frames);
    assert_eq!(rendered.sample_rate, input.sample_rate);
    assert_eq!(rendered.channels, 2);
    assert!(rendered.data.iter().all(|s| s.is_finite()));
    assert!(rms(&rendered.data) > 0.0);
}

#[test]
fn test_writer_round_trip_preserves_the_format() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roundtrip.wav");

    let format = SourceFormat {
        sample_rate: 48_000,
        channels: 2,
        bits_per_sample: 16,
        float: false,
    };

    let block: Vec<f32> = (0..4096 * 2)
        .map(|i| (TAU * 220.0 * (i / 2) as f32 / 48_000.0).sin() * 0.25)
        .collect();

    let mut writer = AudioWriter::create(&path, format).unwrap();
    writer.write_block(&block).unwrap();
    writer.write_block(&block).unwrap();
    assert_eq!(writer.frames_written(), 8192);
    writer.finalize().unwrap();

    let decoded = AudioFile::load(&path).unwrap();
    assert_eq!(decoded.sample_rate, 48_000);
    assert_eq!(decoded.channels, 2);
    assert_eq!(decoded.frames, 8192);
    assert_eq!(decoded.source_format(), format);
}

#[test]
fn test_unreadable_source_leaves_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let mut processor = AudioProcessor::with_output_dir(dir.path().join("out"));

    let result = processor.process_file(
        dir.path().join("does-not-exist.wav"),
        ProcessingSettings::default(),
    );

    assert!(matches!(result, Err(ProcessError::FileAccess { .. })));
    assert_eq!(processor.render_state(), RenderState::Failed);
    assert!(!processor.output_path().exists());
}

#[test]
fn test_garbage_input_is_an_unsupported_format() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("noise.bin");
    std::fs::write(&source, vec![0x42u8; 4096]).unwrap();

    let mut processor = AudioProcessor::with_output_dir(dir.path().join("out"));
    let result = processor.process_file(&source, ProcessingSettings::default());

    assert!(matches!(result, Err(ProcessError::UnsupportedFormat(_))));
    assert!(!processor.output_path().exists());
}

#[test]
fn test_file_sample_rate_probe() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("sine.wav");
    write_sine_wav(&source, 440.0, 0.25, 1);

    let processor = AudioProcessor::with_output_dir(dir.path().join("out"));
    assert_eq!(processor.file_sample_rate(&source).unwrap(), SAMPLE_RATE);
    assert!(processor.file_sample_rate("/no/such/file.wav").is_err());
}

#[test]
fn test_second_render_overwrites_the_first() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("sine.wav");
    write_sine_wav(&source, 440.0, 0.5, 1);

    let mut processor = AudioProcessor::with_output_dir(dir.path().join("out"));

    let first = processor
        .process_file(&source, ProcessingSettings::default())
        .unwrap();

    let settings = ProcessingSettings {
        play_rate: 2.0,
        ..Default::default()
    };
    let second = processor.process_file(&source, settings).unwrap();

    assert_eq!(first, second, "one fixed output path per processor");
    let rendered = AudioFile::load(&second).unwrap();
    assert!(
        (rendered.frames as i64 - SAMPLE_RATE as i64 / 4).abs() <= 4096,
        "the second render's content must win, got {} frames",
        rendered.frames
    );
}

#[test]
fn test_in_flight_render_rejects_a_second_job() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("long.wav");
    // Ten seconds with the phase vocoder active keeps the worker busy long
    // enough for the rejection to be observable.
    write_sine_wav(&source, 440.0, 10.0, 2);

    let settings = ProcessingSettings {
        reverb_mix: 50.0,
        pitch_cents: 300.0,
        ..Default::default()
    };

    let mut processor = AudioProcessor::with_output_dir(dir.path().join("out"));
    processor
        .process_file_in_background(&source, settings)
        .unwrap();
    assert_eq!(processor.render_state(), RenderState::Rendering);

    let rejected = processor.process_file(&source, ProcessingSettings::default());
    assert!(matches!(rejected, Err(ProcessError::Busy)));

    // Completion arrives exactly once.
    let deadline = Instant::now() + Duration::from_secs(60);
    let mut finished = 0;
    while Instant::now() < deadline {
        for event in processor.poll_events() {
            if let ProcessorEvent::RenderFinished(result) = event {
                assert!(result.is_ok(), "render failed: {result:?}");
                finished += 1;
            }
        }
        if finished > 0 {
            break;
        }
        std::thread::sleep(Duration::from_millis(25));
    }

    assert_eq!(finished, 1);
    assert_eq!(processor.render_state(), RenderState::Done);
    assert!(processor.output_path().exists());

    // And the slot is free again.
    let rerun = processor.process_file(&source, ProcessingSettings::default());
    assert!(rerun.is_ok());
}
