//! echoline-cli — real-time host for the echoline effect engine.
//!
//! Two modes:
//! - `--effect=echo`  (default): microphone → feedback delay → speakers,
//!   wired through a lock-free SPSC ring between the two cpal callbacks.
//! - `--effect=noise`: generator only, straight to the output device.
//!
//! While audio runs, a stdin loop writes parameters by label into the live
//! engine (`set feedback 65`), exercising the concurrent control path.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::Sample;
use echoline_engine::{Echo, Engine, Noise, ParameterStore};
use std::cell::UnsafeCell;
use std::error::Error;
use std::io::BufRead;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default)]
struct Args {
    list_devices: bool,
    input_name: Option<String>,
    output_name: Option<String>,
    sample_rate: Option<u32>,
    channels: Option<u16>,
    duration_sec: Option<u64>,
    effect: Option<String>,
    feedback: Option<f32>,
    millisecond: Option<f32>,
    volume: Option<f32>,
}

fn parse_args() -> Args {
    let mut a = Args::default();
    for s in std::env::args().skip(1) {
        if s == "--list-devices" { a.list_devices = true; continue; }
        if let Some(rest) = s.strip_prefix("--input=")       { a.input_name  = Some(rest.to_string()); continue; }
        if let Some(rest) = s.strip_prefix("--device=")      { a.output_name = Some(rest.to_string()); continue; }
        if let Some(rest) = s.strip_prefix("--sample-rate=") { a.sample_rate = rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--channels=")    { a.channels    = rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--duration=")    { a.duration_sec= rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--effect=")      { a.effect      = Some(rest.to_string()); continue; }
        if let Some(rest) = s.strip_prefix("--feedback=")    { a.feedback    = rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--millisecond=") { a.millisecond = rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--volume=")      { a.volume      = rest.parse().ok();      continue; }
        eprintln!("[warn] unknown arg: {s}");
    }
    a
}

fn list_devices() -> Result<(), Box<dyn Error>> {
    let host = cpal::default_host();
    println!("Output devices:");
    for dev in host.output_devices()? {
        println!("- {}", dev.name()?);
    }
    println!("Input devices:");
    for dev in host.input_devices()? {
        println!("- {}", dev.name()?);
    }
    Ok(())
}

fn pick_output_device(name: Option<&str>) -> Result<cpal::Device, Box<dyn Error>> {
    let host = cpal::default_host();
    if let Some(name) = name {
        for d in host.output_devices()? {
            if d.name()? == *name { return Ok(d); }
        }
        return Err(format!("requested output device not found: {name}").into());
    }
    host.default_output_device()
        .ok_or_else(|| "no default output device".into())
}

fn pick_input_device(name: Option<&str>) -> Result<cpal::Device, Box<dyn Error>> {
    let host = cpal::default_host();
    if let Some(name) = name {
        for d in host.input_devices()? {
            if d.name()? == *name { return Ok(d); }
        }
        return Err(format!("requested input device not found: {name}").into());
    }
    host.default_input_device()
        .ok_or_else(|| "no default input device".into())
}

fn choose_output_config(
    device: &cpal::Device,
    req_sr: Option<u32>,
    req_ch: Option<u16>,
) -> Result<cpal::SupportedStreamConfig, Box<dyn Error>> {
    // If nothing requested, default is already concrete.
    if req_sr.is_none() && req_ch.is_none() {
        return Ok(device.default_output_config()?);
    }

    // Pick a SupportedStreamConfigRange first.
    let mut best: Option<(u64, cpal::SupportedStreamConfigRange)> = None;
    for range in device.supported_output_configs()? {
        let ch     = range.channels();
        let sr_min = range.min_sample_rate().0;
        let sr_max = range.max_sample_rate().0;

        let ch_pen = match req_ch { Some(c) => (i64::from(ch) - i64::from(c)).unsigned_abs(), None => 0 };
        let sr_pen = match req_sr {
            Some(sr) => if (sr_min..=sr_max).contains(&sr) { 0 } else { u64::from(sr_min.abs_diff(sr).min(sr_max.abs_diff(sr))) },
            None => 0,
        };

        let score = sr_pen.saturating_mul(1000) + ch_pen;
        if best.as_ref().map(|(s, _)| *s).map_or(true, |s| score < s) {
            best = Some((score, range));
        }
    }

    let (_, range) = best.ok_or_else(|| "no supported output configs".to_string())?;

    let pick_sr = match req_sr {
        Some(sr) => {
            let lo = range.min_sample_rate().0;
            let hi = range.max_sample_rate().0;
            cpal::SampleRate(sr.clamp(lo, hi))
        }
        None => range.max_sample_rate(),
    };

    Ok(range.with_sample_rate(pick_sr))
}

/* ---------- lock-free SPSC ring between the two cpal callbacks ---------- */

/// Single-producer/single-consumer mono sample queue, power-of-two capacity.
/// The input callback is the only pusher, the output callback the only popper.
struct MonoRing {
    slots: UnsafeCell<Box<[f32]>>,
    mask: usize,
    head: AtomicUsize, // producer cursor, logical (unbounded)
    tail: AtomicUsize, // consumer cursor, logical (unbounded)
}

// Safety: SPSC discipline is upheld by construction; the producer only writes
// slots in [tail+len, tail+cap) and only the producer advances `head`, the
// consumer only reads [tail, head) and advances `tail`.
unsafe impl Send for MonoRing {}
unsafe impl Sync for MonoRing {}

impl MonoRing {
    fn new(min_capacity: usize) -> Self {
        let cap = min_capacity.max(2).next_power_of_two();
        Self {
            slots: UnsafeCell::new(vec![0.0f32; cap].into_boxed_slice()),
            mask: cap - 1,
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    /// Producer: enqueue the whole slice, or nothing if it would overflow.
    fn push(&self, data: &[f32]) -> bool {
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Relaxed);
        let cap = self.mask + 1;
        if cap - head.wrapping_sub(tail) < data.len() {
            return false;
        }
        let slots = unsafe { &mut *self.slots.get() };
        for (i, &v) in data.iter().enumerate() {
            slots[head.wrapping_add(i) & self.mask] = v;
        }
        self.head.store(head.wrapping_add(data.len()), Ordering::Release);
        true
    }

    /// Consumer: dequeue exactly `out.len()` samples, or nothing if short.
    fn pop(&self, out: &mut [f32]) -> bool {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Relaxed);
        if head.wrapping_sub(tail) < out.len() {
            return false;
        }
        let slots = unsafe { &*self.slots.get() };
        for (i, o) in out.iter_mut().enumerate() {
            *o = slots[tail.wrapping_add(i) & self.mask];
        }
        self.tail.store(tail.wrapping_add(out.len()), Ordering::Release);
        true
    }
}

/* ---------- stream builders ---------- */

const SCRATCH_FRAMES: usize = 8192;

/// Fold channel 0 of an interleaved slab into `mono`. The slab is at most
/// `SCRATCH_FRAMES` frames, so a `mono` built with that capacity never grows.
fn downmix_channel0<T>(slab: &[T], channels: usize, mono: &mut Vec<f32>)
where
    T: cpal::Sample,
    f32: cpal::FromSample<T>,
{
    mono.clear();
    for frame in slab.chunks(channels) {
        mono.push(f32::from_sample(frame[0]));
    }
}

fn build_echo_input_stream<T>(
    device: &cpal::Device,
    cfg: &cpal::StreamConfig,
    mut engine: Engine<Echo>,
    ring: Arc<MonoRing>,
) -> Result<cpal::Stream, Box<dyn Error>>
where
    T: cpal::Sample + cpal::SizedSample + Send + 'static,
    f32: cpal::FromSample<T>,
{
    let channels = cfg.channels as usize;
    // Scratch buffers reused every callback. Callbacks larger than
    // SCRATCH_FRAMES are processed in slabs, so these never reallocate.
    let mut mono_in: Vec<f32> = Vec::with_capacity(SCRATCH_FRAMES);
    let mut mono_out: Vec<f32> = Vec::with_capacity(SCRATCH_FRAMES);

    let stream = device.build_input_stream(
        cfg,
        move |data: &[T], _| {
            for slab in data.chunks(channels * SCRATCH_FRAMES) {
                // Channel 0 only; the effect is mono.
                downmix_channel0(slab, channels, &mut mono_in);
                mono_out.clear();
                mono_out.resize(mono_in.len(), 0.0);
                engine.compute(&[&mono_in], &mut [&mut mono_out]);
                if !ring.push(&mono_out) {
                    eprintln!("[warn] ring overrun, dropping a block");
                }
            }
        },
        move |err| eprintln!("[cpal] input stream error: {err}"),
        None,
    )?;
    Ok(stream)
}

fn build_echo_output_stream<T>(
    device: &cpal::Device,
    cfg: &cpal::StreamConfig,
    ring: Arc<MonoRing>,
) -> Result<cpal::Stream, Box<dyn Error>>
where
    T: cpal::Sample + cpal::SizedSample + cpal::FromSample<f32> + Send + 'static,
{
    let channels = cfg.channels as usize;
    let mut mono: Vec<f32> = Vec::with_capacity(SCRATCH_FRAMES);

    let stream = device.build_output_stream(
        cfg,
        move |output: &mut [T], _| {
            for slab in output.chunks_mut(channels * SCRATCH_FRAMES) {
                let frames = slab.len() / channels;
                mono.clear();
                mono.resize(frames, 0.0);
                if !ring.pop(&mut mono) {
                    // Underrun (startup or input stall): play silence.
                    mono.fill(0.0);
                }
                for (frame, &s) in slab.chunks_mut(channels).zip(mono.iter()) {
                    let v: T = T::from_sample(s.clamp(-1.0, 1.0));
                    for ch in frame.iter_mut() {
                        *ch = v;
                    }
                }
            }
        },
        move |err| eprintln!("[cpal] output stream error: {err}"),
        None,
    )?;
    Ok(stream)
}

fn build_noise_stream<T>(
    device: &cpal::Device,
    cfg: &cpal::StreamConfig,
    mut engine: Engine<Noise>,
) -> Result<cpal::Stream, Box<dyn Error>>
where
    T: cpal::Sample + cpal::SizedSample + cpal::FromSample<f32> + Send + 'static,
{
    let channels = cfg.channels as usize;
    let mut mono: Vec<f32> = Vec::with_capacity(SCRATCH_FRAMES);

    // ~1 second peak meter at the configured rate
    let meter_interval = cfg.sample_rate.0.max(1) as usize;
    let mut meter_count: usize = 0;
    let mut meter_peak: f32 = 0.0;

    let stream = device.build_output_stream(
        cfg,
        move |output: &mut [T], _| {
            for slab in output.chunks_mut(channels * SCRATCH_FRAMES) {
                let frames = slab.len() / channels;
                mono.clear();
                mono.resize(frames, 0.0);
                engine.compute(&[], &mut [&mut mono]);

                for (frame, &s) in slab.chunks_mut(channels).zip(mono.iter()) {
                    let v: T = T::from_sample(s.clamp(-1.0, 1.0));
                    for ch in frame.iter_mut() {
                        *ch = v;
                    }
                    let a = s.abs();
                    if a > meter_peak { meter_peak = a; }
                    meter_count += 1;
                    if meter_count >= meter_interval {
                        eprintln!("[meter] peak ~ {:.3}", meter_peak);
                        meter_peak = 0.0;
                        meter_count = 0;
                    }
                }
            }
        },
        move |err| eprintln!("[cpal] stream error: {err}"),
        None,
    )?;
    Ok(stream)
}

/* ---------- control loop ---------- */

fn print_params(params: &ParameterStore) {
    for (id, label, spec) in params.iter() {
        println!(
            "  {label:<12} = {:<10} [{}, {}] step {} ({:?})",
            params.get(id),
            spec.min,
            spec.max,
            spec.step,
            spec.kind
        );
    }
}

/// Blocking stdin loop driving by-label parameter writes while audio runs.
/// With `--duration=` we just sleep instead, for scripted runs.
fn control_loop(params: &ParameterStore, duration_sec: Option<u64>) {
    if let Some(d) = duration_sec {
        std::thread::sleep(Duration::from_secs(d));
        return;
    }

    println!("Commands: set <label> <value> | get <label> | list | quit");
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        let mut words = line.split_whitespace();
        match (words.next(), words.next(), words.next()) {
            (Some("set"), Some(label), Some(value)) => match value.parse::<f32>() {
                Ok(v) => {
                    if !params.set_by_label(label, v) {
                        eprintln!("[warn] unknown parameter: {label}");
                    }
                }
                Err(_) => eprintln!("[warn] not a number: {value}"),
            },
            (Some("get"), Some(label), None) => match params.get_by_label(label) {
                Some(v) => println!("{label} = {v}"),
                None => eprintln!("[warn] unknown parameter: {label}"),
            },
            (Some("list"), None, None) => print_params(params),
            (Some("quit"), _, _) | (Some("exit"), _, _) => break,
            (None, _, _) => {}
            _ => eprintln!("[warn] unrecognized command: {line}"),
        }
    }
}

/* ---------- effect runners ---------- */

fn run_echo(args: &Args) -> Result<(), Box<dyn Error>> {
    let out_dev = pick_output_device(args.output_name.as_deref())?;
    let in_dev = pick_input_device(args.input_name.as_deref())?;

    let out_sup = choose_output_config(&out_dev, args.sample_rate, args.channels)?;
    let out_format = out_sup.sample_format();
    let out_cfg = out_sup.config();

    let in_sup = in_dev.default_input_config()?;
    let in_format = in_sup.sample_format();
    let mut in_cfg = in_sup.config();
    // The ring carries raw samples, so both sides must agree on the rate.
    in_cfg.sample_rate = out_cfg.sample_rate;

    let sr = out_cfg.sample_rate.0;
    let mut engine = Engine::new(Echo::new());
    engine.init(sr)?;
    let params = engine.params();
    if let Some(fb) = args.feedback {
        params.set(params.require("feedback")?, fb);
    }
    if let Some(ms) = args.millisecond {
        params.set(params.require("millisecond")?, ms);
    }

    println!("Output device: {}", out_dev.name()?);
    println!("Input device:  {}", in_dev.name()?);
    println!("Stream config: {:?} (sample_format: {:?})", out_cfg, out_format);
    println!("Echo at {sr} Hz:");
    print_params(&params);

    let ring = Arc::new(MonoRing::new(4 * SCRATCH_FRAMES));

    let input_stream = match in_format {
        cpal::SampleFormat::F32 => build_echo_input_stream::<f32>(&in_dev, &in_cfg, engine, Arc::clone(&ring))?,
        cpal::SampleFormat::I16 => build_echo_input_stream::<i16>(&in_dev, &in_cfg, engine, Arc::clone(&ring))?,
        cpal::SampleFormat::U16 => build_echo_input_stream::<u16>(&in_dev, &in_cfg, engine, Arc::clone(&ring))?,
        other => return Err(format!("unsupported input sample format: {other:?}").into()),
    };
    let output_stream = match out_format {
        cpal::SampleFormat::F32 => build_echo_output_stream::<f32>(&out_dev, &out_cfg, Arc::clone(&ring))?,
        cpal::SampleFormat::I16 => build_echo_output_stream::<i16>(&out_dev, &out_cfg, Arc::clone(&ring))?,
        cpal::SampleFormat::U16 => build_echo_output_stream::<u16>(&out_dev, &out_cfg, Arc::clone(&ring))?,
        other => return Err(format!("unsupported output sample format: {other:?}").into()),
    };

    input_stream.play()?;
    output_stream.play()?;
    control_loop(&params, args.duration_sec);
    Ok(())
}

fn run_noise(args: &Args) -> Result<(), Box<dyn Error>> {
    let out_dev = pick_output_device(args.output_name.as_deref())?;
    let out_sup = choose_output_config(&out_dev, args.sample_rate, args.channels)?;
    let out_format = out_sup.sample_format();
    let out_cfg = out_sup.config();

    let sr = out_cfg.sample_rate.0;
    let mut engine = Engine::new(Noise::new());
    engine.init(sr)?;
    let params = engine.params();
    if let Some(v) = args.volume {
        params.set(params.require("volume")?, v);
    }

    println!("Output device: {}", out_dev.name()?);
    println!("Stream config: {:?} (sample_format: {:?})", out_cfg, out_format);
    println!("Noise at {sr} Hz:");
    print_params(&params);

    let stream = match out_format {
        cpal::SampleFormat::F32 => build_noise_stream::<f32>(&out_dev, &out_cfg, engine)?,
        cpal::SampleFormat::I16 => build_noise_stream::<i16>(&out_dev, &out_cfg, engine)?,
        cpal::SampleFormat::U16 => build_noise_stream::<u16>(&out_dev, &out_cfg, engine)?,
        other => return Err(format!("unsupported output sample format: {other:?}").into()),
    };

    stream.play()?;
    control_loop(&params, args.duration_sec);
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = parse_args();

    if args.list_devices {
        return list_devices();
    }

    println!("echoline-cli — real-time echo/noise host\n");

    match args.effect.as_deref().unwrap_or("echo") {
        "noise" => run_noise(&args),
        "echo" => run_echo(&args),
        other => Err(format!("unknown effect: {other} (expected echo or noise)").into()),
    }
}
