use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use egress::subsystems::{
    FontRenderer, GraphicsDriver, PlatformLayer, RecordingService, ScriptHost,
    TranslationService, WorldStore,
};
use egress::{coordinator, EgressConfig, MixerState, ShutdownSession};

#[derive(Parser, Debug)]
#[command(name = "egress")]
#[command(about = "Game-runtime termination protocol demo host")]
#[command(version)]
#[command(long_about = "Hosts the engine termination protocol against a demo set of \
subsystems: classifies an encoded quit reason, drives the fixed teardown order, and \
exits. Reason prefixes: '|' normal exit, '!|' player abort, '!?' script-raised fatal, \
'!' script error, '%' warning treated as error; anything else is an internal error.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "egress.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Encoded quit reason to terminate with
    #[arg(short, long, default_value = "|Thanks for playing!", help = "Encoded quit reason string")]
    reason: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without running")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    init_logging(&args)?;

    info!("Starting egress demo host v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let config = match EgressConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if args.validate_config {
        match config.validate() {
            Ok(()) => {
                println!("✓ Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                eprintln!("✗ Configuration validation failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    config.validate().map_err(|e| {
        error!("Configuration validation failed: {}", e);
        e
    })?;

    let session = demo_session(config);
    info!(reason = args.reason.as_str(), "terminating demo engine");

    // Never returns; all teardown and the alert happen inside.
    coordinator::terminate(session, &args.reason)
}

/// A session wired to demo subsystems: everything logs what shutdown asks
/// of it, the platform "dialog" goes to stderr, and the audio mixer runs a
/// real decode worker thread so the stop-then-release path is exercised.
fn demo_session(config: EgressConfig) -> ShutdownSession {
    struct DemoRecording;
    impl RecordingService for DemoRecording {
        fn stop(&mut self) {
            info!("input recording stopped");
        }
    }

    struct DemoScripts;
    impl ScriptHost for DemoScripts {
        fn release_all_objects(&mut self) {
            info!("script-visible objects released");
        }
        fn call_stack(&self, max_frames: usize) -> String {
            let frames = [
                "in \"room2.asc\" line 40",
                "from \"globalscript.asc\" line 12",
            ];
            frames[..frames.len().min(max_frames)].join("\n")
        }
    }

    struct DemoPlatform;
    impl PlatformLayer for DemoPlatform {
        fn about_to_quit(&mut self) {
            info!("platform notified of imminent exit");
        }
        fn shutdown_plugins(&mut self) {
            info!("plugins released");
        }
        fn finished_using_graphics_mode(&mut self) {
            info!("graphics mode handed back to the platform");
        }
        fn shutdown_cd_player(&mut self) {
            info!("cd player hardware stopped");
        }
        fn post_exit_hook(&mut self) {
            info!("platform post-exit hook ran");
        }
        fn display_alert(&mut self, text: &str) {
            eprintln!("----------------------------------------");
            eprintln!("{text}");
            eprintln!("----------------------------------------");
        }
    }

    struct DemoFonts;
    impl FontRenderer for DemoFonts {
        fn shutdown(&mut self) {
            info!("font renderer shut down");
        }
    }

    struct DemoTranslation;
    impl TranslationService for DemoTranslation {
        fn close(&mut self) {
            info!("translation service closed");
        }
    }

    struct DemoGraphics;
    impl GraphicsDriver for DemoGraphics {
        fn restore_prior_surface(&mut self) {
            info!("prior display surface restored");
        }
        fn release_display_mode(&mut self) {
            info!("display mode released");
        }
    }

    struct DemoWorld;
    impl WorldStore for DemoWorld {
        fn reset_all(&mut self) {
            info!("room state wiped");
        }
    }

    ShutdownSession::new(config)
        .with_recording(Box::new(DemoRecording))
        .with_scripts(Box::new(DemoScripts))
        .with_platform(Box::new(DemoPlatform))
        .with_audio(Box::new(MixerState::new()))
        .with_fonts(Box::new(DemoFonts))
        .with_translation(Box::new(DemoTranslation))
        .with_graphics(Box::new(DemoGraphics))
        .with_world(Box::new(DemoWorld))
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("egress={}", log_level)));

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();

    Ok(())
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# Egress Configuration File");
    println!("# Default configuration with all available options");
    println!();
    println!("{}", EgressConfig::default().to_toml()?);
    Ok(())
}
