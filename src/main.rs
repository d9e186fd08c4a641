use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use herald::voice::{
    AudioCapture, AudioPlayback, ConsoleTransport, MicrophoneTransport, SAMPLE_RATE, rms,
    select_voice,
};
use herald::{
    CommandInterpreter, Config, Daemon, GeminiClient, HostActions, RecordingActions,
    SystemOpener, UtteranceTransport,
};

/// Herald - voice-driven conversational assistant
#[derive(Parser)]
#[command(name = "herald", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Config file (defaults to ~/.config/herald/config.toml)
    #[arg(short, long, env = "HERALD_CONFIG")]
    config: Option<PathBuf>,

    /// Type instead of speaking (no audio hardware needed)
    #[arg(long)]
    text: bool,

    /// Preferred voice name
    #[arg(long, env = "HERALD_VOICE")]
    voice: Option<String>,

    /// Exit after the first answered turn
    #[arg(long)]
    once: bool,

    /// Print host actions instead of opening them
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve one request and print the reply
    Ask {
        /// What to ask
        #[arg(required = true, num_args = 1..)]
        prompt: Vec<String>,
    },
    /// List available voices
    Voices,
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn,herald=info",
        1 => "info,herald=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    tracing::debug!(
        model = %config.assistant.model,
        voice_enabled = config.voice.enabled,
        "loaded configuration"
    );

    let console = cli.text || !config.voice.enabled;
    let preferred = cli
        .voice
        .clone()
        .unwrap_or_else(|| config.voice.tts_voice.clone());
    let actions: Arc<dyn HostActions> = if cli.dry_run {
        Arc::new(RecordingActions::new())
    } else {
        Arc::new(SystemOpener::new())
    };

    // Handle subcommands
    if let Some(cmd) = cli.command {
        return match cmd {
            Command::Ask { prompt } => ask(&config, actions.as_ref(), &prompt.join(" ")).await,
            Command::Voices => list_voices(&config, console, &preferred),
            Command::TestMic { duration } => test_mic(duration).await,
            Command::TestSpeaker => test_speaker(),
            Command::TestTts { text } => test_tts(&config, &text).await,
        };
    }

    let interpreter = Arc::new(build_interpreter(&config)?);

    if console {
        tracing::info!("herald ready - type a request, Ctrl-D to quit");
        let daemon = Daemon::new(interpreter, ConsoleTransport::stdin(), actions);
        run_daemon(daemon, &preferred, cli.once).await
    } else {
        let transport =
            MicrophoneTransport::open(config.speech_to_text()?, config.text_to_speech()?)?;
        tracing::info!("herald ready - speak after the prompt, Ctrl-C to stop");
        let daemon = Daemon::new(interpreter, transport, actions);
        run_daemon(daemon, &preferred, cli.once).await
    }
}

fn build_interpreter(config: &Config) -> anyhow::Result<CommandInterpreter> {
    let client = GeminiClient::new(config.gemini_config()?)?;
    tracing::debug!(model = client.model(), "assistant client ready");
    Ok(CommandInterpreter::new(Arc::new(client)).with_locale(config.locale.clone()))
}

/// Run the conversation loop; Ctrl-C deactivates, a second Ctrl-C exits
#[allow(clippy::future_not_send)]
async fn run_daemon<T: UtteranceTransport>(
    daemon: Daemon<T>,
    preferred: &str,
    once: bool,
) -> anyhow::Result<()> {
    let daemon = daemon
        .with_preferred_voice(Some(preferred))
        .render_transcript(true)
        .once(once);

    let handle = daemon.handle();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            handle.interrupt();
        }
    });

    let transcript = daemon.run(true).await?;
    tracing::info!(entries = transcript.len(), "conversation ended");
    Ok(())
}

/// Resolve one request outside the conversation loop
async fn ask(config: &Config, actions: &dyn HostActions, prompt: &str) -> anyhow::Result<()> {
    let interpreter = build_interpreter(config)?;
    let resolution = interpreter.resolve(prompt).await;

    println!("{}", resolution.response_text);
    if !resolution.citations.is_empty() {
        println!("\nSources:");
        for citation in &resolution.citations {
            println!("  - {} <{}>", citation.title, citation.uri);
        }
    }
    if let Some(action) = &resolution.action {
        println!("\n-> {}", action.target());
        actions.perform(action)?;
    }

    if resolution.unrecoverable {
        anyhow::bail!("assistant request failed");
    }
    Ok(())
}

/// List voices, marking the one that would be used
fn list_voices(config: &Config, console: bool, preferred: &str) -> anyhow::Result<()> {
    let voices = if console {
        ConsoleTransport::voices()
    } else {
        config.text_to_speech()?.voices()
    };
    let selected = select_voice(&voices, Some(preferred));

    for voice in &voices {
        let marker = if selected.as_ref() == Some(voice) { "*" } else { " " };
        println!("{marker} {:<10} {}", voice.name, voice.lang);
    }
    Ok(())
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = AudioCapture::open()?;
    capture.start()?;

    println!("Device: {}", capture.device_name());
    println!("Sample rate: {SAMPLE_RATE} Hz");
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.peek_buffer();
        let energy = rms(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        // Visual meter
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "#".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!("[{:2}s] RMS: {energy:.4} | Peak: {peak:.4} | [{meter}]", i + 1);

        capture.clear_buffer();
    }

    capture.stop();

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Run: arecord -l (to list devices)");

    Ok(())
}

/// Test speaker output with a sine wave
fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let playback = AudioPlayback::open()?;

    let sample_rate = 24000_u16;
    let frequency = 440.0_f32;
    let num_samples = usize::from(sample_rate) * 2;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / f32::from(sample_rate);
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3
        })
        .collect();

    println!("Playing {} samples at {sample_rate} Hz...", samples.len());
    playback.play(samples)?;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");
    println!("If not, run: pactl list sinks short");

    Ok(())
}

/// Test TTS output
async fn test_tts(config: &Config, text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let tts = config.text_to_speech()?;

    println!("Synthesizing speech...");
    let mp3_data = tts.synthesize(text, None).await?;
    println!("Got {} bytes of audio data", mp3_data.len());

    println!("Playing audio...");
    let playback = AudioPlayback::open()?;
    playback.play_mp3(&mp3_data)?;

    println!("\n---");
    println!("If you heard the speech, TTS is working!");

    Ok(())
}
